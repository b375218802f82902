//! Controladores de página.
//!
//! Cada página guarda su estado explícito, la vista renderizada (fragmentos
//! HTML) y un `Notifier`; los eventos de la interfaz son métodos `async`.

pub mod appointments;
pub mod auth;
pub mod dashboard;
pub mod doctors;
pub mod patients;
pub mod schedules;
pub mod users;

use std::time::Duration;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::AppResult;
use crate::models::SessionUser;
use crate::notify::Notifier;
use crate::render::escape_html;

/// Navegación pendiente, opcionalmente diferida
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub delay: Duration,
}

impl Redirect {
    pub fn now(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(location: impl Into<String>, delay: Duration) -> Self {
        Self {
            location: location.into(),
            delay,
        }
    }
}

/// Dependencias comunes de todas las páginas
#[derive(Clone)]
pub struct PageContext {
    pub api: ApiClient,
    pub config: ClientConfig,
}

impl PageContext {
    pub fn new(config: ClientConfig) -> AppResult<Self> {
        Ok(Self {
            api: ApiClient::new(&config)?,
            config,
        })
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.config.notice_ttl)
    }
}

/// Cabecera con el usuario de la sesión
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHeader {
    pub name: String,
    pub role: String,
}

impl Default for SessionHeader {
    fn default() -> Self {
        Self {
            name: "Administrador".to_string(),
            role: "Admin".to_string(),
        }
    }
}

impl SessionHeader {
    pub fn render(&self) -> String {
        format!(
            r#"<span id="userName">{}</span> <small id="userRole" class="text-muted">{}</small>"#,
            escape_html(&self.name),
            escape_html(&self.role)
        )
    }
}

/// Carga `/api/user-data`; un fallo deja los valores por defecto
pub async fn load_session_header(api: &ApiClient) -> SessionHeader {
    match api.get::<SessionUser>("/api/user-data").await {
        Ok(user) => {
            let defaults = SessionHeader::default();
            SessionHeader {
                name: user.nombre.filter(|n| !n.is_empty()).unwrap_or(defaults.name),
                role: user.rol.filter(|r| !r.is_empty()).unwrap_or(defaults.role),
            }
        }
        // La cabecera por defecto basta; no se notifica al usuario
        Err(e) => {
            log::warn!("Could not load session header: {}", e);
            SessionHeader::default()
        }
    }
}

/// Valor decodificado de `key` en la query de la URL de la página
pub fn page_query_param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_constructors() {
        assert_eq!(Redirect::now("/login").delay, Duration::ZERO);
        let r = Redirect::after("/dashboard", Duration::from_millis(1500));
        assert_eq!(r.location, "/dashboard");
        assert_eq!(r.delay.as_millis(), 1500);
    }

    #[test]
    fn session_header_defaults() {
        let header = SessionHeader::default();
        assert!(header.render().contains("Administrador"));
        assert!(header.render().contains("Admin"));
    }

    #[test]
    fn page_query_values_are_decoded() {
        assert_eq!(
            page_query_param("?token=abc%2Bdef%3D", "token").as_deref(),
            Some("abc+def=")
        );
        assert_eq!(page_query_param("a=1&b=x+y", "b").as_deref(), Some("x y"));
        assert_eq!(page_query_param("?a=1", "b"), None);
    }
}
