use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Mensaje genérico para fallos de transporte
pub const CONNECTION_ERROR: &str = "Error de conexión con el servidor";

/// Errores por campo (id del campo -> mensaje)
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Cuerpo de error devuelto por la API en respuestas no-2xx
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = self
            .error
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("sin detalle");
        f.write_str(detail)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Api { status: StatusCode, body: ApiErrorBody },

    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    /// Mensaje para el usuario: `error`, luego `message`, luego `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::Api { body, .. } => body
                .error
                .clone()
                .or_else(|| body.message.clone())
                .unwrap_or_else(|| fallback.to_string()),
            AppError::Network(_) => CONNECTION_ERROR.to_string(),
            AppError::Custom(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            AppError::Network(e) => e.status(),
            _ => None,
        }
    }

    pub fn api_code(&self) -> Option<&str> {
        match self {
            AppError::Api { body, .. } => body.code.as_deref(),
            _ => None,
        }
    }

    pub fn server_field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            AppError::Api { body, .. } if !body.errors.is_empty() => Some(&body.errors),
            _ => None,
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(body: ApiErrorBody) -> AppError {
        AppError::Api {
            status: StatusCode::BAD_REQUEST,
            body,
        }
    }

    #[test]
    fn user_message_prefers_error_then_message() {
        let err = api_error(ApiErrorBody {
            error: Some("La cédula ya está registrada".into()),
            message: Some("ignorado".into()),
            ..Default::default()
        });
        assert_eq!(err.user_message("x"), "La cédula ya está registrada");

        let err = api_error(ApiErrorBody {
            message: Some("Sólo message".into()),
            ..Default::default()
        });
        assert_eq!(err.user_message("x"), "Sólo message");
    }

    #[test]
    fn user_message_falls_back_when_body_is_empty() {
        let err = api_error(ApiErrorBody::default());
        assert_eq!(err.user_message("Error al guardar"), "Error al guardar");

        let err = AppError::Decode(serde_json::from_str::<u8>("{").unwrap_err());
        assert_eq!(err.user_message("Error al guardar"), "Error al guardar");
    }

    #[test]
    fn error_body_parses_field_errors() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":"Datos inválidos","errors":{"cedula":"Formato incorrecto"}}"#,
        )
        .unwrap();
        let err = api_error(body);
        let fields = err.server_field_errors().unwrap();
        assert_eq!(fields.get("cedula").unwrap(), "Formato incorrecto");
    }

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::Custom("boom".into());
        assert_eq!(serde_json::to_string(&err).unwrap(), "\"boom\"");
    }
}
