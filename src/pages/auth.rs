//! Formularios de autenticación: login, registro, alta de usuario y
//! recuperación de contraseña.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::error::{AppError, AppResult, CONNECTION_ERROR};
use crate::form::{optional, SubmitButton};
use crate::models::{ApiMessage, Role};
use crate::notify::{NoticeKind, Notifier};
use crate::pages::{page_query_param, PageContext, Redirect};
use crate::render::{escape_html, select_options};
use crate::validation::{digits_only, is_email, is_national_id, is_phone, PasswordStrength, MIN_PASSWORD_LEN};

pub const INVALID_TOKEN: &str =
    "El enlace de recuperación ha expirado o es inválido. Por favor solicite uno nuevo.";

/// Mensaje general del formulario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
    pub kind: NoticeKind,
    pub text: String,
}

impl FormMessage {
    pub fn render(&self) -> String {
        let (class, icon) = match self.kind {
            NoticeKind::Success => ("success", "fa-check-circle"),
            _ => ("error", "fa-exclamation-circle"),
        };
        format!(
            r#"<div class="message {}"><i class="fas {}"></i> {}</div>"#,
            class,
            icon,
            escape_html(&self.text)
        )
    }
}

/// Estado común: errores por elemento (`*_error`), mensaje y botón
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFormState {
    pub errors: BTreeMap<String, String>,
    pub message: Option<FormMessage>,
    pub submit: SubmitButton,
}

impl AuthFormState {
    fn new(idle: &'static str, busy: &'static str) -> Self {
        Self {
            errors: BTreeMap::new(),
            message: None,
            submit: SubmitButton::new(idle, busy),
        }
    }

    fn reset(&mut self) {
        self.errors.clear();
        self.message = None;
    }

    fn field_error(&mut self, id: &str, message: &str) {
        self.errors
            .entry(id.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    fn success(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        self.message = Some(FormMessage {
            kind: NoticeKind::Success,
            text,
        });
    }

    fn failure(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::error!("{}", text);
        self.message = Some(FormMessage {
            kind: NoticeKind::Danger,
            text,
        });
    }

    /// Corta el envío si hay errores de validación
    fn ensure_valid(&self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            log::warn!("Form blocked by validation: {:?}", self.errors);
            Err(AppError::Custom(
                self.errors.values().next().cloned().unwrap_or_default(),
            ))
        }
    }
}

fn network_aware(e: &AppError, connection: &str, fallback: &str) -> String {
    match e {
        AppError::Network(_) => connection.to_string(),
        _ => e.user_message(fallback),
    }
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    identificador: &'a str,
    #[serde(rename = "contraseña")]
    password: &'a str,
}

pub struct LoginPage {
    ctx: PageContext,
    pub identificador: String,
    pub password: String,
    pub state: AuthFormState,
}

impl LoginPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            identificador: String::new(),
            password: String::new(),
            state: AuthFormState::new("Ingresar", "Ingresando..."),
        }
    }

    pub async fn submit(&mut self) -> AppResult<Redirect> {
        self.state.reset();
        let identificador = self.identificador.trim().to_string();
        if identificador.is_empty() {
            self.state.field_error("identificador_error", "Ingrese su usuario o cédula");
        } else if self.password.is_empty() {
            self.state.field_error("password_error", "Ingrese su contraseña");
        }
        self.state.ensure_valid()?;

        self.state.submit.begin();
        let payload = LoginPayload {
            identificador: &identificador,
            password: &self.password,
        };
        let result: AppResult<ApiMessage> = self.ctx.api.post("/api/login", &payload).await;
        self.state.submit.finish();

        match result {
            Ok(data) => {
                self.state.success("Inicio de sesión exitoso. Redirigiendo...");
                Ok(Redirect::after(
                    data.redirect.unwrap_or_else(|| "/dashboard".to_string()),
                    Duration::from_millis(1500),
                ))
            }
            Err(e) => {
                self.state.failure(network_aware(
                    &e,
                    CONNECTION_ERROR,
                    "Credenciales incorrectas. Por favor intente nuevamente.",
                ));
                Err(e)
            }
        }
    }
}

pub fn role_description(id_rol: &str) -> Option<&'static str> {
    match id_rol {
        "1" => Some("Acceso completo al sistema con capacidades de administración y configuración del sistema."),
        "2" => Some("Acceso completo a historiales médicos, programación de citas y registros clínicos de pacientes."),
        "3" => Some("Acceso especializado según área médica con capacidades extendidas para especialistas."),
        "4" => Some("Acceso a registros de pacientes, administración de medicamentos y funciones de enfermería."),
        "5" => Some("Acceso a programación de citas, registro de pacientes y funciones administrativas básicas."),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegisterPayload {
    pub nombre_completo: String,
    pub usuario_login: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub gmail: Option<String>,
    #[serde(rename = "contraseña")]
    pub password: String,
    pub id_rol: String,
}

/// Auto-registro público
pub struct RegisterPage {
    ctx: PageContext,
    pub nombre_completo: String,
    pub usuario_login: String,
    cedula: String,
    telefono: String,
    pub gmail: String,
    pub password: String,
    pub confirm_password: String,
    pub id_rol: String,
    pub state: AuthFormState,
}

impl RegisterPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            nombre_completo: String::new(),
            usuario_login: String::new(),
            cedula: String::new(),
            telefono: String::new(),
            gmail: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            id_rol: String::new(),
            state: AuthFormState::new("Registrarse", "Registrando..."),
        }
    }

    /// Sólo dígitos, máximo 8
    pub fn set_cedula(&mut self, input: &str) {
        self.cedula = digits_only(input, 8);
        self.state.errors.remove("cedula_error");
    }

    /// Sólo dígitos, máximo 12
    pub fn set_telefono(&mut self, input: &str) {
        self.telefono = digits_only(input, 12);
        self.state.errors.remove("telefono_error");
    }

    pub fn cedula(&self) -> &str {
        &self.cedula
    }

    pub fn telefono(&self) -> &str {
        &self.telefono
    }

    pub fn role_description(&self) -> Option<&'static str> {
        role_description(&self.id_rol)
    }

    /// `None` mientras la contraseña esté vacía
    pub fn strength(&self) -> Option<PasswordStrength> {
        (!self.password.is_empty()).then(|| PasswordStrength::evaluate(&self.password))
    }

    fn validate(&mut self) {
        let state = &mut self.state;
        if self.nombre_completo.chars().count() < 5 {
            state.field_error("nombre_error", "El nombre completo debe tener al menos 5 caracteres");
        }
        if self.usuario_login.chars().count() < 4 {
            state.field_error("usuario_error", "El nombre de usuario debe tener al menos 4 caracteres");
        }
        if !is_national_id(&self.cedula) {
            state.field_error("cedula_error", "La cédula debe tener exactamente 8 dígitos numéricos");
        }
        if !self.telefono.is_empty() && !is_phone(&self.telefono) {
            state.field_error("telefono_error", "El teléfono debe tener entre 7 y 12 dígitos");
        }
        let gmail = self.gmail.trim();
        if !gmail.is_empty() && !is_email(gmail) {
            state.field_error("gmail_error", "Por favor ingrese un correo electrónico válido");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            state.field_error("password_error", "La contraseña debe tener al menos 8 caracteres");
        }
        if !self.password.is_empty()
            && !self.confirm_password.is_empty()
            && self.password != self.confirm_password
        {
            state.field_error("confirm_error", "Las contraseñas no coinciden. Por favor verifique.");
        }
        if self.id_rol.trim().is_empty() {
            state.field_error("rol_error", "Por favor seleccione un rol del sistema");
        }
    }

    pub async fn submit(&mut self) -> AppResult<Redirect> {
        self.state.reset();
        self.validate();
        self.state.ensure_valid()?;

        let payload = RegisterPayload {
            nombre_completo: self.nombre_completo.trim().to_string(),
            usuario_login: self.usuario_login.trim().to_string(),
            cedula: self.cedula.clone(),
            telefono: optional(&self.telefono),
            gmail: optional(&self.gmail),
            password: self.password.clone(),
            id_rol: self.id_rol.trim().to_string(),
        };
        self.state.submit.begin();
        let result: AppResult<ApiMessage> = self.ctx.api.post("/api/users", &payload).await;
        self.state.submit.finish();

        match result {
            Ok(data) => {
                self.state.success(
                    data.message
                        .unwrap_or_else(|| "¡Registro exitoso! Redirigiendo al sistema...".to_string()),
                );
                Ok(Redirect::after(
                    data.redirect.unwrap_or_else(|| "/login".to_string()),
                    Duration::from_secs(2),
                ))
            }
            Err(e) => {
                self.state.failure(network_aware(
                    &e,
                    "Error de conexión con el servidor. Por favor intente más tarde.",
                    "Error en el registro. Por favor verifique los datos e intente nuevamente.",
                ));
                if let Some(fields) = e.server_field_errors() {
                    for (field, message) in fields {
                        self.state
                            .errors
                            .insert(format!("{}_error", field), message.clone());
                    }
                }
                Err(e)
            }
        }
    }
}

#[derive(Serialize)]
struct NewUserPayload<'a> {
    nombre_completo: &'a str,
    usuario_login: &'a str,
    #[serde(rename = "contraseña")]
    password: &'a str,
    id_rol: u32,
}

/// Alta de usuario desde el panel de administración
pub struct NewUserPage {
    ctx: PageContext,
    roles: Vec<Role>,
    pub nombre_completo: String,
    pub usuario_login: String,
    pub password: String,
    pub confirm_password: String,
    pub id_rol: Option<u32>,
    pub state: AuthFormState,
    pub notifier: Notifier,
}

impl NewUserPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        Self {
            ctx,
            roles: Vec::new(),
            nombre_completo: String::new(),
            usuario_login: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            id_rol: None,
            state: AuthFormState::new("Guardar Usuario", "Guardando..."),
            notifier,
        }
    }

    /// Carga `/api/roles`; un fallo sólo se registra
    pub async fn init(&mut self) {
        match self.ctx.api.get::<Vec<Role>>("/api/roles").await {
            Ok(roles) => self.roles = roles,
            Err(e) => log::error!("Error al cargar roles: {}", e),
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn role_options(&self) -> String {
        let selected = self.id_rol.map(|r| r.to_string());
        select_options(
            "Seleccione un rol",
            self.roles
                .iter()
                .map(|r| (r.id_rol.to_string(), r.nombre_rol.clone())),
            selected.as_deref(),
        )
    }

    pub fn strength(&self) -> PasswordStrength {
        PasswordStrength::evaluate(&self.password)
    }

    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }

    pub async fn submit(&mut self) -> AppResult<()> {
        self.state.reset();
        if self.nombre_completo.trim().is_empty() {
            self.state.field_error("nombre_completo", "Ingrese el nombre completo");
        }
        if self.usuario_login.trim().is_empty() {
            self.state.field_error("usuario_login", "Ingrese el usuario");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            self.state
                .field_error("contraseña", "La contraseña debe tener al menos 8 caracteres");
        }
        if !self.passwords_match() {
            self.state
                .field_error("confirmar_contraseña", "Las contraseñas no coinciden");
        }
        if self.id_rol.is_none() {
            self.state.field_error("id_rol", "Seleccione un rol");
        }
        self.state.ensure_valid()?;

        let payload = NewUserPayload {
            nombre_completo: self.nombre_completo.trim(),
            usuario_login: self.usuario_login.trim(),
            password: &self.password,
            id_rol: self.id_rol.unwrap_or_default(),
        };
        self.state.submit.begin();
        let result: AppResult<ApiMessage> = self.ctx.api.post("/api/users", &payload).await;
        self.state.submit.finish();

        match result {
            Ok(data) => {
                let message = data
                    .message
                    .unwrap_or_else(|| "El usuario ha sido registrado exitosamente.".to_string());
                self.notifier.show_modal(NoticeKind::Success, "Éxito", message);
                self.nombre_completo.clear();
                self.usuario_login.clear();
                self.password.clear();
                self.confirm_password.clear();
                self.id_rol = None;
                Ok(())
            }
            Err(e) => {
                self.notifier.show_modal(
                    NoticeKind::Danger,
                    "Error",
                    e.user_message("Error al registrar el usuario. Por favor, intente nuevamente."),
                );
                Err(e)
            }
        }
    }

    /// Cierra el modal; tras un alta exitosa navega al panel
    pub fn acknowledge(&mut self) -> Option<Redirect> {
        match self.notifier.dismiss_modal() {
            Some(modal) if modal.kind == NoticeKind::Success => Some(Redirect::now("/admin_dashboard")),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct RecoveryPayload<'a> {
    identificador: &'a str,
}

pub struct PasswordRecoveryPage {
    ctx: PageContext,
    pub identificador: String,
    pub state: AuthFormState,
}

impl PasswordRecoveryPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            identificador: String::new(),
            state: AuthFormState::new("Enviar Instrucciones", "Enviando..."),
        }
    }

    pub async fn submit(&mut self) -> AppResult<Redirect> {
        self.state.reset();
        let identificador = self.identificador.trim().to_string();
        if identificador.is_empty() {
            self.state.field_error("identificador_error", "Ingrese su usuario o email");
        }
        self.state.ensure_valid()?;

        self.state.submit.begin();
        let result: AppResult<ApiMessage> = self
            .ctx
            .api
            .post(
                "/api/password-recovery",
                &RecoveryPayload {
                    identificador: &identificador,
                },
            )
            .await;
        self.state.submit.finish();

        match result {
            Ok(_) => {
                self.identificador.clear();
                self.state.success(
                    "Se han enviado instrucciones a su email registrado. Por favor revise su bandeja de entrada.",
                );
                Ok(Redirect::after("/login", Duration::from_secs(5)))
            }
            Err(e) => {
                self.state
                    .failure(network_aware(&e, CONNECTION_ERROR, "Error al procesar la solicitud"));
                Err(e)
            }
        }
    }
}

/// Token de recuperación de la URL (`?token=...`)
pub fn token_from_query(query: &str) -> Option<String> {
    page_query_param(query, "token").filter(|value| !value.is_empty())
}

#[derive(Serialize)]
struct ResetPayload<'a> {
    token: &'a str,
    #[serde(rename = "nueva_contraseña")]
    new_password: &'a str,
}

/// Mensaje para un fallo del restablecimiento
pub fn reset_error_message(e: &AppError) -> String {
    match e {
        _ if e.api_code() == Some("invalid_token") => INVALID_TOKEN.to_string(),
        AppError::Api { status, .. } if *status == StatusCode::BAD_REQUEST => {
            "Datos inválidos enviados al servidor".to_string()
        }
        AppError::Network(_) => CONNECTION_ERROR.to_string(),
        _ => e.user_message("Error al actualizar la contraseña"),
    }
}

pub struct PasswordResetPage {
    ctx: PageContext,
    token: Option<String>,
    pub password: String,
    pub confirm_password: String,
    pub state: AuthFormState,
}

impl PasswordResetPage {
    /// `page_query` es la query string de la URL de la página
    pub fn new(ctx: PageContext, page_query: &str) -> Self {
        Self {
            ctx,
            token: token_from_query(page_query),
            password: String::new(),
            confirm_password: String::new(),
            state: AuthFormState::new("Guardar Contraseña", "Procesando..."),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn submit(&mut self) -> AppResult<Redirect> {
        self.state.reset();
        if self.token.is_none() {
            self.state.failure("Token de recuperación no válido");
        }
        if self.password.is_empty() {
            self.state.field_error("password_error", "Ingrese una contraseña");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            self.state
                .field_error("password_error", "La contraseña debe tener al menos 8 caracteres");
        }
        if self.confirm_password.is_empty() {
            self.state.field_error("confirm_error", "Confirme su contraseña");
        } else if self.password != self.confirm_password {
            self.state.field_error("confirm_error", "Las contraseñas no coinciden");
        }
        let Some(token) = self.token.clone() else {
            return Err(AppError::Custom("Token de recuperación no válido".to_string()));
        };
        self.state.ensure_valid()?;

        self.state.submit.begin();
        let result: AppResult<ApiMessage> = self
            .ctx
            .api
            .post(
                "/api/reset-password",
                &ResetPayload {
                    token: &token,
                    new_password: &self.password,
                },
            )
            .await;
        self.state.submit.finish();

        match result {
            Ok(_) => {
                self.password.clear();
                self.confirm_password.clear();
                self.state
                    .success("¡Contraseña actualizada correctamente! Redirigiendo al login...");
                Ok(Redirect::after("/login", Duration::from_secs(2)))
            }
            Err(e) => {
                self.state.failure(reset_error_message(&e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorBody;

    #[test]
    fn reads_token_from_query() {
        assert_eq!(token_from_query("?token=abc123"), Some("abc123".to_string()));
        assert_eq!(token_from_query("?token="), None);
        assert_eq!(token_from_query("x=1"), None);
        assert_eq!(
            token_from_query("?token=abc%2Bdef%3D"),
            Some("abc+def=".to_string())
        );
    }

    #[test]
    fn reset_errors_map_invalid_token_first() {
        let invalid = AppError::Api {
            status: StatusCode::BAD_REQUEST,
            body: ApiErrorBody {
                error: Some("Token inválido".into()),
                code: Some("invalid_token".into()),
                ..Default::default()
            },
        };
        assert_eq!(reset_error_message(&invalid), INVALID_TOKEN);

        let bad_request = AppError::Api {
            status: StatusCode::BAD_REQUEST,
            body: ApiErrorBody {
                error: Some("Falta el token".into()),
                ..Default::default()
            },
        };
        assert_eq!(
            reset_error_message(&bad_request),
            "Datos inválidos enviados al servidor"
        );

        let server = AppError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ApiErrorBody::default(),
        };
        assert_eq!(reset_error_message(&server), "Error al actualizar la contraseña");
    }

    #[test]
    fn role_descriptions_cover_five_roles() {
        for id in ["1", "2", "3", "4", "5"] {
            assert!(role_description(id).is_some());
        }
        assert!(role_description("6").is_none());
        assert!(role_description("").is_none());
    }

    #[test]
    fn form_message_renders_kind() {
        let ok = FormMessage {
            kind: NoticeKind::Success,
            text: "Listo".into(),
        };
        assert!(ok.render().contains("message success"));
        let err = FormMessage {
            kind: NoticeKind::Danger,
            text: "<x>".into(),
        };
        assert!(err.render().contains("message error"));
        assert!(err.render().contains("&lt;x&gt;"));
    }
}
