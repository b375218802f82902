mod common;

use std::time::Duration;

use serde_json::json;

use clinica::error::{AppError, CONNECTION_ERROR};
use clinica::notify::NoticeKind;
use clinica::pages::auth::LoginPage;
use clinica::pages::doctors::DoctorsPage;
use clinica::pages::patients::PatientsPage;
use clinica::{ClientConfig, PageContext};
use common::{doctor, patient, query_param, FakeApi};

/// Puerto sin servidor escuchando
fn unreachable_context() -> PageContext {
    PageContext::new(ClientConfig::new("http://127.0.0.1:1")).expect("page context")
}

#[tokio::test]
async fn login_without_a_server_reports_the_connection() {
    let mut page = LoginPage::new(unreachable_context());
    page.identificador = "admin".into();
    page.password = "Segura#2024".into();

    let err = page.submit().await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
    let message = page.state.message.as_ref().unwrap();
    assert_eq!(message.kind, NoticeKind::Danger);
    assert_eq!(message.text, CONNECTION_ERROR);
    assert!(!page.state.submit.is_busy());
}

#[tokio::test]
async fn doctor_list_without_a_server_shows_the_error_row() {
    let mut page = DoctorsPage::new(unreachable_context());
    page.load().await;

    assert!(page.doctors().is_empty());
    assert_eq!(
        page.notifier.last().unwrap().message,
        "Error al cargar la lista de médicos"
    );
    assert!(page.view().table_body.contains("Error al cargar la lista de médicos"));
}

#[tokio::test]
async fn malformed_success_body_falls_back_to_the_generic_notice() {
    let api = FakeApi::start().await;
    api.ok("GET", "/api/medicos", json!([doctor(1, "Dra. Elena Mora", "A")]))
        .ok("GET", "/api/medicos/1", doctor(1, "Dra. Elena Mora", "A"))
        .respond_raw("PUT", "/api/medicos/1", 200, "<html>Bad gateway</html>");

    let mut page = DoctorsPage::new(api.context());
    page.open_edit(1).await.unwrap();
    let err = page.submit().await.unwrap_err();

    assert!(matches!(err, AppError::Decode(_)));
    let notice = page.notifier.last().unwrap();
    assert_eq!(notice.kind, NoticeKind::Danger);
    assert_eq!(notice.message, "Error al guardar el médico");
    assert!(page.form.is_some());
}

#[tokio::test]
async fn malformed_edit_record_keeps_the_modal_closed() {
    let api = FakeApi::start().await;
    api.respond_raw("GET", "/api/medicos/3", 200, "{\"id_medico\": ");

    let mut page = DoctorsPage::new(api.context());
    assert!(page.open_edit(3).await.is_err());
    assert!(page.form.is_none());
    assert_eq!(
        page.notifier.last().unwrap().message,
        "Error al cargar datos del médico"
    );
}

#[tokio::test]
async fn rapid_typing_sends_one_search_with_the_last_text() {
    let api = FakeApi::start().await;
    api.ok("GET", "/api/user-data", json!({}))
        .ok("GET", "/api/pacientes/detallados", json!([patient(1, "Ana Pérez", "A")]))
        .ok("GET", "/api/pacientes/stats", json!({ "active": 1, "total": 1 }));

    let mut config = api.config();
    config.search_debounce = Duration::from_millis(30);
    let mut page = PatientsPage::new(PageContext::new(config).expect("page context"));
    page.init().await;
    api.clear_requests();

    page.type_search("an");
    page.type_search("ana");
    page.type_search("ana pé");
    assert!(page.flush_search().await);

    let searches = api.requests_to("GET", "/api/pacientes/detallados");
    assert_eq!(searches.len(), 1);
    assert_eq!(query_param(&searches[0], "search").as_deref(), Some("ana pé"));
    assert_eq!(page.filters().search, "ana pé");
}

#[tokio::test]
async fn missing_session_keeps_the_default_header_quietly() {
    let api = FakeApi::start().await;
    api.ok("GET", "/api/medicos", json!([]))
        .respond("GET", "/api/user-data", 401, json!({ "error": "No autorizado" }));

    let mut page = DoctorsPage::new(api.context());
    page.init().await;
    assert!(page.view().header.contains("Administrador"));
    assert!(page.notifier.notices().is_empty());
}
