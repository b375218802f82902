//! Capa cliente de la API de gestión clínica: médicos, pacientes, usuarios,
//! citas y horarios.

pub mod api;
pub mod config;
pub mod confirm;
pub mod debounce;
pub mod error;
pub mod form;
pub mod models;
pub mod notify;
pub mod pages;
pub mod render;
pub mod validation;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{AppError, AppResult};
pub use pages::{PageContext, Redirect};

/// Inicializa `env_logger` (nivel `info` salvo que `RUST_LOG` diga otra cosa).
/// Llamadas repetidas no tienen efecto.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
