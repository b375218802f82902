//! API clínica falsa para las pruebas de integración.
//!
//! Sirve respuestas JSON preparadas por `(método, ruta)` y registra cada
//! petición recibida.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    Router,
};
use serde_json::{json, Value};

use clinica::{ClientConfig, PageContext};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    routes: HashMap<(String, String), (u16, String)>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
    pub base_url: String,
}

impl FakeApi {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake api");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake api server");
        });
        Self {
            state,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) -> &Self {
        self.respond_raw(method, path, status, &body.to_string())
    }

    /// Cuerpo literal, aunque no sea JSON válido
    pub fn respond_raw(&self, method: &str, path: &str, status: u16, body: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    pub fn ok(&self, method: &str, path: &str, body: Value) -> &Self {
        self.respond(method, path, 200, body)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }

    pub fn context(&self) -> PageContext {
        PageContext::new(self.config()).expect("page context")
    }
}

async fn handle(
    State(state): State<Arc<Mutex<FakeState>>>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        body: serde_json::from_str(&body).ok(),
    });
    let (status, body) = match state.routes.get(&(method.to_string(), uri.path().to_string())) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            json!({ "error": "Recurso no encontrado" }).to_string(),
        ),
    };
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Valor de un parámetro de la query registrada
pub fn query_param(request: &RecordedRequest, key: &str) -> Option<String> {
    url::form_urlencoded::parse(request.query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn patient(id: i64, name: &str, estado: &str) -> Value {
    json!({
        "id_paciente": id,
        "nombre_completo": name,
        "cedula": "12345678",
        "fecha_nacimiento": "1990-04-12",
        "genero": "F",
        "telefono": "04121234567",
        "correo": null,
        "direccion": null,
        "estado": estado,
        "tipo_sangre": "O+",
        "observaciones": null,
        "fecha_creacion": "2024-01-10 09:30:00"
    })
}

pub fn doctor(id: i64, name: &str, estado: &str) -> Value {
    json!({
        "id_medico": id,
        "nombre_completo": name,
        "especialidad": "Cardiología",
        "telefono": "02121234567",
        "correo": "medico@clinica.com",
        "estado": estado
    })
}

pub fn user(id: i64, name: &str, activo: bool) -> Value {
    json!({
        "id_usuario": id,
        "nombre_completo": name,
        "usuario_login": format!("user{}", id),
        "cedula": "87654321",
        "telefono": null,
        "gmail": null,
        "id_rol": 2,
        "activo": activo
    })
}
