//! Administración de usuarios con paginación en el servidor.

use serde::Serialize;

use crate::api::{RequestSequencer, Ticket};
use crate::confirm::ConfirmGate;
use crate::debounce::Debouncer;
use crate::error::{AppError, AppResult};
use crate::form::{optional, FormTarget, ModalForm, SubmitButton};
use crate::models::{ApiMessage, User, UserPage};
use crate::notify::Notifier;
use crate::pages::{load_session_header, PageContext, SessionHeader};
use crate::render::{escape_html, loading_row, message_row};
use crate::validation::{is_email, is_national_id, is_phone, Validator, MIN_PASSWORD_LEN};

const USERS_PATH: &str = "/api/users";
const COLUMNS: usize = 7;
const MAX_PAGE_LINKS: u32 = 5;

pub fn role_label(id_rol: u32) -> &'static str {
    match id_rol {
        1 => "Administrador",
        2 => "Médico",
        3 => "Enfermería",
        4 => "Recepción",
        _ => "Desconocido",
    }
}

pub fn role_badge_class(id_rol: u32) -> &'static str {
    match id_rol {
        1 => "badge-admin",
        2 => "badge-medico",
        3 => "badge-enfermeria",
        4 => "badge-recepcion",
        _ => "bg-secondary",
    }
}

/// Estado de la consulta paginada
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: String,
    pub role_id: Option<u32>,
    /// `Some(true)` sólo activos, `Some(false)` sólo inactivos
    pub status: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsersQueryChange {
    Search(String),
    Role(Option<u32>),
    Status(Option<bool>),
    Page(u32),
}

impl UsersQuery {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            search: String::new(),
            role_id: None,
            status: None,
        }
    }

    /// Cambiar búsqueda o filtros vuelve a la primera página
    pub fn apply(&mut self, change: UsersQueryChange) {
        match change {
            UsersQueryChange::Search(s) => {
                self.search = s.trim().to_string();
                self.page = 1;
            }
            UsersQueryChange::Role(r) => {
                self.role_id = r;
                self.page = 1;
            }
            UsersQueryChange::Status(s) => {
                self.status = s;
                self.page = 1;
            }
            UsersQueryChange::Page(p) => self.page = p.max(1),
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("search", self.search.clone()),
            ("role_id", self.role_id.map(|r| r.to_string()).unwrap_or_default()),
            (
                "status",
                self.status
                    .map(|active| if active { "1" } else { "0" }.to_string())
                    .unwrap_or_default(),
            ),
        ]
    }
}

/// Páginas visibles: como máximo cinco, centradas en la actual
pub fn page_window(current: u32, total_pages: u32) -> Vec<u32> {
    if total_pages == 0 {
        return Vec::new();
    }
    // el total puede encogerse por debajo de la página actual
    let current = current.clamp(1, total_pages);
    let mut start = current.saturating_sub(MAX_PAGE_LINKS / 2).max(1);
    let end = (start + MAX_PAGE_LINKS - 1).min(total_pages);
    if end - start + 1 < MAX_PAGE_LINKS {
        start = (end + 1).saturating_sub(MAX_PAGE_LINKS).max(1);
    }
    (start..=end).collect()
}

pub fn render_pagination(current: u32, total_pages: u32) -> String {
    if total_pages <= 1 {
        return String::new();
    }
    let current = current.clamp(1, total_pages);
    let item = |label: String, page: u32, disabled: bool, active: bool| {
        let mut class = String::from("page-item");
        if disabled {
            class.push_str(" disabled");
        }
        if active {
            class.push_str(" active");
        }
        format!(
            r##"<li class="{}"><a class="page-link" href="#" data-page="{}">{}</a></li>"##,
            class, page, label
        )
    };

    let mut html = item("&laquo;".into(), current.saturating_sub(1), current == 1, false);
    for page in page_window(current, total_pages) {
        html.push_str(&item(page.to_string(), page, false, page == current));
    }
    html.push_str(&item("&raquo;".into(), current + 1, current == total_pages, false));
    html
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFormFields {
    pub id: Option<i64>,
    pub nombre_completo: String,
    pub usuario_login: String,
    pub cedula: String,
    pub telefono: String,
    pub gmail: String,
    pub id_rol: Option<u32>,
    pub activo: bool,
    pub password: String,
    pub confirm_password: String,
}

impl From<&User> for UserFormFields {
    fn from(u: &User) -> Self {
        Self {
            id: Some(u.id_usuario),
            nombre_completo: u.nombre_completo.clone(),
            usuario_login: u.usuario_login.clone(),
            cedula: u.cedula.clone(),
            telefono: u.telefono.clone().unwrap_or_default(),
            gmail: u.gmail.clone().unwrap_or_default(),
            id_rol: Some(u.id_rol),
            activo: u.activo,
            password: String::new(),
            confirm_password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserPayload {
    pub nombre_completo: String,
    pub usuario_login: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub gmail: Option<String>,
    pub id_rol: u32,
    pub activo: bool,
    #[serde(rename = "contraseña", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserFormFields {
    fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn validate(&self) -> AppResult<()> {
        let is_new = self.is_new();
        let password_given = !self.password.is_empty();
        Validator::new()
            .required("nombre_completo", &self.nombre_completo, "Ingrese el nombre completo")
            .max_len("nombre_completo", &self.nombre_completo, 100, "Máximo 100 caracteres")
            .required("usuario_login", &self.usuario_login, "Ingrese el usuario")
            .max_len("usuario_login", &self.usuario_login, 50, "Máximo 50 caracteres")
            .check(
                "cedula",
                is_national_id(self.cedula.trim()),
                "La cédula debe tener 8 dígitos numéricos",
            )
            .optional_format("telefono", &self.telefono, is_phone, "El teléfono debe tener entre 7 y 12 dígitos")
            .optional_format("gmail", &self.gmail, is_email, "Ingrese un email válido")
            .check("id_rol", self.id_rol.is_some(), "Seleccione un rol")
            .check(
                "confirm_password",
                !(is_new || password_given) || self.password == self.confirm_password,
                "Las contraseñas no coinciden",
            )
            .check(
                "contraseña",
                !is_new || self.password.chars().count() >= MIN_PASSWORD_LEN,
                "La contraseña debe tener al menos 8 caracteres",
            )
            .finish()
    }

    pub fn payload(&self) -> UserPayload {
        UserPayload {
            nombre_completo: self.nombre_completo.trim().to_string(),
            usuario_login: self.usuario_login.trim().to_string(),
            cedula: self.cedula.trim().to_string(),
            telefono: optional(&self.telefono),
            gmail: optional(&self.gmail),
            id_rol: self.id_rol.unwrap_or_default(),
            activo: self.activo,
            password: (!self.password.is_empty()).then(|| self.password.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct StatusPayload {
    activo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Delete { id: i64 },
    /// `shown_active` es el estado mostrado en la fila al pedir el cambio
    ToggleStatus { id: i64, shown_active: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsersView {
    pub header: String,
    pub table_body: String,
    pub user_count: String,
    pub pagination: String,
    pub alerts: String,
}

pub struct UsersPage {
    ctx: PageContext,
    query: UsersQuery,
    data: UserPage,
    loading: bool,
    load_error: Option<String>,
    sequencer: RequestSequencer,
    search: Debouncer<String>,
    header: SessionHeader,
    pub notifier: Notifier,
    pub form: Option<ModalForm<UserFormFields>>,
    pub confirm: ConfirmGate<UserAction>,
    pub confirm_button: SubmitButton,
}

impl UsersPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        let search = Debouncer::new(ctx.config.search_debounce);
        let query = UsersQuery::new(ctx.config.users_per_page);
        Self {
            ctx,
            query,
            data: UserPage::default(),
            loading: false,
            load_error: None,
            sequencer: RequestSequencer::new(),
            search,
            header: SessionHeader::default(),
            notifier,
            form: None,
            confirm: ConfirmGate::default(),
            confirm_button: SubmitButton::new("Confirmar", "Procesando..."),
        }
    }

    pub async fn init(&mut self) {
        self.header = load_session_header(&self.ctx.api).await;
        self.load().await;
    }

    pub fn query(&self) -> &UsersQuery {
        &self.query
    }

    pub fn users(&self) -> &[User] {
        &self.data.users
    }

    pub fn total_pages(&self) -> u32 {
        self.data.total_pages
    }

    pub async fn fetch_page(&self) -> (Ticket, AppResult<UserPage>) {
        let ticket = self.sequencer.issue();
        let params = self.query.params();
        (ticket, self.ctx.api.get_query(USERS_PATH, &params).await)
    }

    pub fn apply_page(&mut self, ticket: Ticket, result: AppResult<UserPage>) -> bool {
        if !self.sequencer.is_latest(ticket) {
            log::debug!("Discarding stale users response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.data = page;
                self.load_error = None;
            }
            Err(e) => {
                log::error!("Error al cargar usuarios: {}", e);
                self.data = UserPage::default();
                self.load_error = Some("Error al cargar usuarios".to_string());
            }
        }
        true
    }

    pub async fn load(&mut self) {
        self.loading = true;
        let (ticket, result) = self.fetch_page().await;
        self.apply_page(ticket, result);
    }

    pub async fn change(&mut self, change: UsersQueryChange) {
        self.query.apply(change);
        self.load().await;
    }

    /// Búsqueda inmediata (botón o Enter)
    pub async fn search(&mut self, text: impl Into<String>) {
        self.search.cancel();
        self.change(UsersQueryChange::Search(text.into())).await;
    }

    pub fn type_search(&mut self, text: impl Into<String>) {
        self.search.push(text.into());
    }

    pub async fn flush_search(&mut self) -> bool {
        match self.search.settled().await {
            Some(text) => {
                self.change(UsersQueryChange::Search(text)).await;
                true
            }
            None => false,
        }
    }

    /// Enlaces deshabilitados (anterior en la primera, siguiente en la última) no hacen nada
    pub async fn go_to_page(&mut self, page: u32) -> bool {
        if page < 1 || page > self.data.total_pages {
            return false;
        }
        self.change(UsersQueryChange::Page(page)).await;
        true
    }

    pub async fn previous_page(&mut self) -> bool {
        let page = self.query.page.saturating_sub(1);
        self.go_to_page(page).await
    }

    pub async fn next_page(&mut self) -> bool {
        let page = self.query.page + 1;
        self.go_to_page(page).await
    }

    pub fn open_create(&mut self) {
        self.form = Some(ModalForm::new(
            "Nuevo Usuario",
            UserFormFields {
                activo: true,
                ..Default::default()
            },
            SubmitButton::new("Guardar Usuario", "Guardando..."),
        ));
    }

    pub async fn open_edit(&mut self, id: i64) -> AppResult<()> {
        match self.ctx.api.get::<User>(&format!("{}/{}", USERS_PATH, id)).await {
            Ok(user) => {
                self.form = Some(ModalForm::new(
                    "Editar Usuario",
                    UserFormFields::from(&user),
                    SubmitButton::new("Guardar Usuario", "Guardando..."),
                ));
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Error al cargar los datos del usuario");
                Err(e)
            }
        }
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    pub async fn submit(&mut self) -> AppResult<()> {
        let Some(form) = self.form.as_mut() else {
            return Err(AppError::Custom("No hay formulario abierto".to_string()));
        };
        form.errors.clear();
        if let Err(e) = form.fields.validate() {
            if let AppError::Validation(errors) = &e {
                for key in ["confirm_password", "contraseña"] {
                    if let Some(message) = errors.get(key) {
                        self.notifier.error(message.clone());
                    }
                }
                form.errors = errors.clone();
            }
            log::warn!("User form blocked by validation: {}", e);
            return Err(e);
        }

        let target = FormTarget::for_record(USERS_PATH, form.fields.id);
        let payload = form.fields.payload();
        form.submit.begin();
        let result: AppResult<ApiMessage> = self
            .ctx
            .api
            .send(target.method(), target.path(), Some(&payload))
            .await;
        form.submit.finish();

        match result {
            Ok(_) => {
                let message = if target.is_update() {
                    "Usuario actualizado exitosamente"
                } else {
                    "Usuario creado exitosamente"
                };
                self.form = None;
                self.notifier.success(message);
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al guardar el usuario"));
                Err(e)
            }
        }
    }

    pub fn request_delete(&mut self, id: i64) -> bool {
        let Some(user) = self.data.users.iter().find(|u| u.id_usuario == id) else {
            return false;
        };
        let message = format!(
            "¿Está seguro que desea eliminar al usuario {}?",
            user.nombre_completo
        );
        self.confirm
            .request("Confirmar acción", message, "Confirmar", UserAction::Delete { id });
        true
    }

    pub fn request_toggle(&mut self, id: i64) -> bool {
        let Some(user) = self.data.users.iter().find(|u| u.id_usuario == id) else {
            return false;
        };
        let verb = if user.activo { "desactivar" } else { "activar" };
        let message = format!(
            "¿Está seguro que desea {} al usuario {}?",
            verb, user.nombre_completo
        );
        let shown_active = user.activo;
        self.confirm.request(
            "Confirmar acción",
            message,
            "Confirmar",
            UserAction::ToggleStatus { id, shown_active },
        );
        true
    }

    pub fn cancel_action(&mut self) {
        self.confirm.cancel();
    }

    pub async fn confirm_action(&mut self) -> AppResult<()> {
        let Some(action) = self.confirm.confirm() else {
            return Ok(());
        };
        self.confirm_button.begin();
        let result: AppResult<ApiMessage> = match action {
            UserAction::Delete { id } => self.ctx.api.delete(&format!("{}/{}", USERS_PATH, id)).await,
            UserAction::ToggleStatus { id, shown_active } => {
                let body = StatusPayload {
                    activo: !shown_active,
                };
                self.ctx
                    .api
                    .put(&format!("{}/{}/status", USERS_PATH, id), &body)
                    .await
            }
        };
        self.confirm_button.finish();

        match result {
            Ok(_) => {
                log::info!("User action completed: {:?}", action);
                self.notifier.success("Acción realizada exitosamente");
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al realizar la acción"));
                Err(e)
            }
        }
    }

    pub fn view(&self) -> UsersView {
        let table_body = if self.loading {
            loading_row(COLUMNS)
        } else if let Some(error) = &self.load_error {
            message_row(COLUMNS, "text-danger", error)
        } else {
            render_rows(&self.data.users)
        };
        UsersView {
            header: self.header.render(),
            table_body,
            user_count: self.data.total.to_string(),
            pagination: render_pagination(self.query.page, self.data.total_pages),
            alerts: self.notifier.render(),
        }
    }
}

pub fn render_rows(users: &[User]) -> String {
    if users.is_empty() {
        return message_row(COLUMNS, "text-muted", "No se encontraron usuarios");
    }
    users.iter().map(render_row).collect::<Vec<_>>().join("\n")
}

fn render_row(u: &User) -> String {
    format!(
        r#"<tr data-id="{id}">
    <td>{id}</td>
    <td><img src="https://ui-avatars.com/api/?name={avatar}&background=random" class="user-avatar" alt="{name}"> {login}</td>
    <td>{name}</td>
    <td>{cedula}</td>
    <td><span class="badge {role_class} role-badge">{role}</span></td>
    <td><span class="badge {status_class}">{status}</span></td>
    <td class="action-btns">
        <button class="btn btn-sm btn-outline-primary edit-btn" data-id="{id}"><i class="fas fa-edit"></i></button>
        <button class="btn btn-sm btn-outline-danger delete-btn" data-id="{id}"><i class="fas fa-trash-alt"></i></button>
        <button class="btn btn-sm btn-outline-secondary status-btn" data-id="{id}"><i class="fas fa-power-off"></i></button>
    </td>
</tr>"#,
        id = u.id_usuario,
        avatar = urlencoding::encode(&u.nombre_completo),
        name = escape_html(&u.nombre_completo),
        login = escape_html(&u.usuario_login),
        cedula = escape_html(&u.cedula),
        role_class = role_badge_class(u.id_rol),
        role = role_label(u.id_rol),
        status_class = if u.activo { "bg-success" } else { "bg-secondary" },
        status = if u.activo { "Activo" } else { "Inactivo" },
    )
}
