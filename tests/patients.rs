mod common;

use serde_json::json;

use clinica::notify::NoticeKind;
use clinica::pages::patients::{PatientFilterChange, PatientsPage};
use common::{patient, query_param, FakeApi};

async fn patients_api() -> FakeApi {
    let api = FakeApi::start().await;
    api.ok("GET", "/api/user-data", json!({ "nombre": "Marta Ruiz", "rol": "Recepción" }))
        .ok(
            "GET",
            "/api/pacientes/detallados",
            json!([patient(1, "Ana Pérez", "A"), patient(2, "Luis Gómez", "I")]),
        )
        .ok(
            "GET",
            "/api/pacientes/stats",
            json!({ "active": 1, "total": 2, "new_this_month": 1 }),
        );
    api
}

#[tokio::test]
async fn creating_a_patient_posts_once_and_reloads_the_list() {
    let api = patients_api().await;
    api.ok("POST", "/api/pacientes", json!({ "message": "Paciente creado" }));

    let mut page = PatientsPage::new(api.context());
    page.init().await;
    assert_eq!(page.patients().len(), 2);
    assert_eq!(page.stats().total, 2);
    assert!(page.view().header.contains("Marta Ruiz"));
    api.clear_requests();

    page.open_create();
    let form = page.form.as_mut().unwrap();
    form.fields.nombre_completo = "  Carla Díaz ".into();
    form.fields.cedula = "23456789".into();
    form.fields.telefono = "04141234567".into();
    page.submit().await.unwrap();

    let posts = api.requests_to("POST", "/api/pacientes");
    assert_eq!(posts.len(), 1);
    let body = posts[0].body.clone().unwrap();
    assert_eq!(body["nombre_completo"], "Carla Díaz");
    assert_eq!(body["estado"], "A");
    assert_eq!(body["correo"], serde_json::Value::Null);
    assert_eq!(api.requests_to("GET", "/api/pacientes/detallados").len(), 1);

    assert!(page.form.is_none());
    let notice = page.notifier.last().unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert!(notice.message.contains("creado exitosamente"));
}

#[tokio::test]
async fn invalid_form_sends_nothing() {
    let api = patients_api().await;
    let mut page = PatientsPage::new(api.context());
    page.open_create();
    let form = page.form.as_mut().unwrap();
    form.fields.nombre_completo = "Carla Díaz".into();
    form.fields.cedula = "123".into();

    assert!(page.submit().await.is_err());
    assert!(api.requests_to("POST", "/api/pacientes").is_empty());
    let form = page.form.as_ref().unwrap();
    assert!(form.errors.contains_key("cedula"));
}

#[tokio::test]
async fn editing_a_missing_patient_reports_an_error() {
    let api = patients_api().await;
    let mut page = PatientsPage::new(api.context());

    assert!(page.open_edit(99).await.is_err());
    assert!(page.form.is_none());
    let notice = page.notifier.last().unwrap();
    assert_eq!(notice.kind, NoticeKind::Danger);
    assert_eq!(notice.message, "Error al cargar los datos del paciente");
}

#[tokio::test]
async fn status_change_sends_the_opposite_of_what_was_shown() {
    let api = patients_api().await;
    api.ok("PATCH", "/api/pacientes/1/status", json!({ "message": "Paciente inactivado" }));

    let mut page = PatientsPage::new(api.context());
    page.load().await;
    assert!(page.request_status_change(1));
    assert!(page.confirm.is_pending());
    page.confirm_action().await.unwrap();

    let patches = api.requests_to("PATCH", "/api/pacientes/1/status");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, Some(json!({ "estado": "I" })));
    assert_eq!(page.notifier.last().unwrap().message, "Paciente inactivado");
}

#[tokio::test]
async fn cancelled_confirmation_sends_nothing() {
    let api = patients_api().await;
    let mut page = PatientsPage::new(api.context());
    page.load().await;
    assert!(page.request_status_change(2));
    page.cancel_action();
    page.confirm_action().await.unwrap();
    assert!(api.requests_to("PATCH", "/api/pacientes/2/status").is_empty());
}

#[tokio::test]
async fn filters_are_sent_as_query_parameters() {
    let api = patients_api().await;
    let mut page = PatientsPage::new(api.context());
    page.filter(PatientFilterChange::ToggleInactive).await;
    page.filter(PatientFilterChange::DateFrom("2024-01-01".into())).await;

    let last = api
        .requests_to("GET", "/api/pacientes/detallados")
        .pop()
        .unwrap();
    assert_eq!(query_param(&last, "estado").as_deref(), Some("A"));
    assert_eq!(query_param(&last, "fecha_desde").as_deref(), Some("2024-01-01"));
    assert_eq!(query_param(&last, "search").as_deref(), Some(""));
}

#[tokio::test]
async fn stale_list_response_is_discarded() {
    let api = patients_api().await;
    let mut page = PatientsPage::new(api.context());

    let (first, first_result) = page.fetch_list().await;
    let (second, second_result) = page.fetch_list().await;
    assert!(page.apply_list(second, second_result));
    assert!(!page.apply_list(first, first_result));
    assert_eq!(page.patients().len(), 2);
}
