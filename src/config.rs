//! Configuración del cliente HTTP y de las páginas.

use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Configuración compartida por todas las páginas
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origen de la API (sin barra final)
    pub base_url: String,
    /// `None` = sin timeout
    pub timeout: Option<Duration>,
    pub users_per_page: u32,
    pub search_debounce: Duration,
    /// Tiempo de vida de las notificaciones transitorias
    pub notice_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            users_per_page: 10,
            search_debounce: Duration::from_millis(500),
            notice_ttl: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            ..Self::default()
        }
    }

    /// Lee `CLINICA_API_URL`, `CLINICA_HTTP_TIMEOUT_SECS` y `CLINICA_USERS_PER_PAGE`.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CLINICA_API_URL") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AppError::Config(format!("CLINICA_API_URL inválida: {}", url)));
            }
            config.base_url = normalize_base_url(url);
        }

        if let Some(secs) = lookup("CLINICA_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("CLINICA_HTTP_TIMEOUT_SECS inválido: {}", secs)))?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(per_page) = lookup("CLINICA_USERS_PER_PAGE") {
            config.users_per_page = match per_page.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::Config(format!(
                        "CLINICA_USERS_PER_PAGE inválido: {}",
                        per_page
                    )))
                }
            };
        }

        log::debug!("Client config loaded: base_url={}", config.base_url);
        Ok(config)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
