//! Administración de pacientes.

use serde::Serialize;

use crate::api::{RequestSequencer, Ticket};
use crate::confirm::ConfirmGate;
use crate::debounce::Debouncer;
use crate::error::{AppError, AppResult};
use crate::form::{optional, FormTarget, ModalForm, SubmitButton};
use crate::models::{ApiMessage, CedulaCheck, Patient, PatientStats, Status};
use crate::notify::Notifier;
use crate::pages::{load_session_header, PageContext, SessionHeader};
use crate::render::{
    email_link, escape_html, format_date_es, initials, loading_row, message_row, or_placeholder,
    phone_link, status_badge,
};
use crate::validation::{is_email, is_national_id, is_phone, Validator};

const PATIENTS_PATH: &str = "/api/pacientes";
const LIST_PATH: &str = "/api/pacientes/detallados";
const STATS_PATH: &str = "/api/pacientes/stats";
const COLUMNS: usize = 9;

pub const DUPLICATE_CEDULA: &str = "Esta cédula ya está registrada";

/// Filtros enviados al servidor con cada carga del listado
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFilters {
    pub estado: Option<Status>,
    pub search: String,
    pub fecha_desde: String,
    pub fecha_hasta: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientFilterChange {
    Status(Option<Status>),
    Search(String),
    DateFrom(String),
    DateTo(String),
    /// Alterna entre sólo activos y todos
    ToggleInactive,
    Clear,
}

impl PatientFilters {
    pub fn apply(&mut self, change: PatientFilterChange) {
        match change {
            PatientFilterChange::Status(s) => self.estado = s,
            PatientFilterChange::Search(s) => self.search = s,
            PatientFilterChange::DateFrom(d) => self.fecha_desde = d,
            PatientFilterChange::DateTo(d) => self.fecha_hasta = d,
            PatientFilterChange::ToggleInactive => {
                self.estado = match self.estado {
                    None => Some(Status::Active),
                    Some(_) => None,
                }
            }
            PatientFilterChange::Clear => *self = Self::default(),
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("estado", self.estado.map(|s| s.code().to_string()).unwrap_or_default()),
            ("search", self.search.clone()),
            ("fecha_desde", self.fecha_desde.clone()),
            ("fecha_hasta", self.fecha_hasta.clone()),
        ]
    }

    /// Etiqueta del botón mostrar/ocultar inactivos
    pub fn inactive_toggle_label(&self) -> &'static str {
        if self.estado.is_none() {
            "Ocultar inactivos"
        } else {
            "Mostrar inactivos"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFormFields {
    pub id: Option<i64>,
    pub nombre_completo: String,
    pub cedula: String,
    pub fecha_nacimiento: String,
    pub genero: String,
    pub telefono: String,
    pub correo: String,
    pub direccion: String,
    pub estado: Status,
    pub tipo_sangre: String,
    pub observaciones: String,
}

impl Default for PatientFormFields {
    fn default() -> Self {
        Self {
            id: None,
            nombre_completo: String::new(),
            cedula: String::new(),
            fecha_nacimiento: String::new(),
            genero: String::new(),
            telefono: String::new(),
            correo: String::new(),
            direccion: String::new(),
            estado: Status::Active,
            tipo_sangre: String::new(),
            observaciones: String::new(),
        }
    }
}

impl From<&Patient> for PatientFormFields {
    fn from(p: &Patient) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            id: Some(p.id_paciente),
            nombre_completo: p.nombre_completo.clone(),
            cedula: text(&p.cedula),
            fecha_nacimiento: text(&p.fecha_nacimiento),
            genero: text(&p.genero),
            telefono: text(&p.telefono),
            correo: text(&p.correo),
            direccion: text(&p.direccion),
            estado: p.estado,
            tipo_sangre: text(&p.tipo_sangre),
            observaciones: text(&p.observaciones),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatientPayload {
    pub nombre_completo: String,
    pub cedula: String,
    pub fecha_nacimiento: Option<String>,
    pub genero: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub direccion: Option<String>,
    pub estado: Status,
    pub tipo_sangre: Option<String>,
    pub observaciones: Option<String>,
}

impl PatientFormFields {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("nombre_completo", &self.nombre_completo, "Ingrese el nombre completo")
            .required("cedula", &self.cedula, "Ingrese la cédula")
            .check(
                "cedula",
                is_national_id(self.cedula.trim()),
                "La cédula debe tener 8 dígitos numéricos",
            )
            .optional_format("telefono", &self.telefono, is_phone, "El teléfono debe tener entre 7 y 12 dígitos")
            .optional_format("correo", &self.correo, is_email, "Ingrese un email válido")
            .finish()
    }

    pub fn payload(&self) -> PatientPayload {
        PatientPayload {
            nombre_completo: self.nombre_completo.trim().to_string(),
            cedula: self.cedula.trim().to_string(),
            fecha_nacimiento: optional(&self.fecha_nacimiento),
            genero: optional(&self.genero),
            telefono: optional(&self.telefono),
            correo: optional(&self.correo),
            direccion: optional(&self.direccion),
            estado: self.estado,
            tipo_sangre: optional(&self.tipo_sangre),
            observaciones: optional(&self.observaciones),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct StatusPayload {
    estado: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientAction {
    SetStatus { id: i64, shown: Status },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientsView {
    pub header: String,
    pub table_body: String,
    pub count_active: u64,
    pub count_total: u64,
    pub count_new: u64,
    pub inactive_toggle: String,
    pub alerts: String,
}

pub struct PatientsPage {
    ctx: PageContext,
    patients: Vec<Patient>,
    stats: PatientStats,
    loading: bool,
    load_error: Option<String>,
    filters: PatientFilters,
    sequencer: RequestSequencer,
    search: Debouncer<String>,
    header: SessionHeader,
    pub notifier: Notifier,
    pub form: Option<ModalForm<PatientFormFields>>,
    pub confirm: ConfirmGate<PatientAction>,
}

impl PatientsPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        let search = Debouncer::new(ctx.config.search_debounce);
        Self {
            ctx,
            patients: Vec::new(),
            stats: PatientStats::default(),
            loading: false,
            load_error: None,
            filters: PatientFilters::default(),
            sequencer: RequestSequencer::new(),
            search,
            header: SessionHeader::default(),
            notifier,
            form: None,
            confirm: ConfirmGate::default(),
        }
    }

    pub async fn init(&mut self) {
        self.header = load_session_header(&self.ctx.api).await;
        self.load().await;
    }

    pub async fn fetch_list(&self) -> (Ticket, AppResult<Vec<Patient>>) {
        let ticket = self.sequencer.issue();
        let query = self.filters.query();
        (ticket, self.ctx.api.get_query(LIST_PATH, &query).await)
    }

    pub fn apply_list(&mut self, ticket: Ticket, result: AppResult<Vec<Patient>>) -> bool {
        if !self.sequencer.is_latest(ticket) {
            log::debug!("Discarding stale patients response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(patients) => {
                self.patients = patients;
                self.load_error = None;
            }
            Err(e) => {
                let message = "Error al cargar los datos de pacientes";
                log::error!("{}: {}", message, e);
                self.patients.clear();
                self.load_error = Some(message.to_string());
                self.notifier.error(message);
            }
        }
        true
    }

    /// Recarga el listado con los filtros actuales y los contadores
    pub async fn load(&mut self) {
        self.loading = true;
        let (ticket, result) = self.fetch_list().await;
        if self.apply_list(ticket, result) {
            self.refresh_stats().await;
        }
    }

    async fn refresh_stats(&mut self) {
        match self.ctx.api.get::<PatientStats>(STATS_PATH).await {
            Ok(stats) => self.stats = stats,
            Err(e) => log::error!("Error al obtener estadísticas: {}", e),
        }
    }

    pub async fn refresh(&mut self) {
        self.load().await;
        if self.load_error.is_none() {
            self.notifier.success("Datos actualizados correctamente");
        }
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn stats(&self) -> &PatientStats {
        &self.stats
    }

    pub fn filters(&self) -> &PatientFilters {
        &self.filters
    }

    /// Cambia un filtro y recarga desde el servidor
    pub async fn filter(&mut self, change: PatientFilterChange) {
        self.filters.apply(change);
        self.load().await;
    }

    /// Texto de búsqueda tecleado; se aplica cuando el intervalo vence
    pub fn type_search(&mut self, text: impl Into<String>) {
        self.search.push(text.into());
    }

    pub async fn flush_search(&mut self) -> bool {
        match self.search.settled().await {
            Some(text) => {
                self.filter(PatientFilterChange::Search(text)).await;
                true
            }
            None => false,
        }
    }

    pub fn open_create(&mut self) {
        self.form = Some(ModalForm::new(
            "Nuevo Paciente",
            PatientFormFields::default(),
            SubmitButton::new("Guardar", "Guardando..."),
        ));
    }

    pub async fn open_edit(&mut self, id: i64) -> AppResult<()> {
        match self.ctx.api.get::<Patient>(&format!("{}/{}", PATIENTS_PATH, id)).await {
            Ok(patient) => {
                self.form = Some(ModalForm::new(
                    "Editar Paciente",
                    PatientFormFields::from(&patient),
                    SubmitButton::new("Guardar", "Guardando..."),
                ));
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Error al cargar los datos del paciente");
                Err(e)
            }
        }
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Comprueba al salir del campo que la cédula no esté registrada
    pub async fn check_cedula(&mut self) -> AppResult<bool> {
        let Some(form) = self.form.as_mut() else {
            return Ok(false);
        };
        let cedula = form.fields.cedula.trim().to_string();
        if cedula.is_empty() {
            return Ok(false);
        }
        let mut query = vec![("cedula", cedula)];
        if let Some(id) = form.fields.id {
            query.push(("exclude", id.to_string()));
        }
        let check: CedulaCheck = match self
            .ctx
            .api
            .get_query("/api/pacientes/check-cedula", &query)
            .await
        {
            Ok(check) => check,
            Err(e) => {
                log::error!("Error al verificar cédula: {}", e);
                return Err(e);
            }
        };
        if check.exists {
            form.errors.insert("cedula", DUPLICATE_CEDULA.to_string());
        } else if form.errors.get("cedula").map(String::as_str) == Some(DUPLICATE_CEDULA) {
            form.errors.remove("cedula");
        }
        Ok(check.exists)
    }

    pub async fn submit(&mut self) -> AppResult<()> {
        let Some(form) = self.form.as_mut() else {
            return Err(AppError::Custom("No hay formulario abierto".to_string()));
        };
        form.errors.clear();
        if let Err(e) = form.fields.validate() {
            if let AppError::Validation(errors) = &e {
                form.errors = errors.clone();
            }
            log::warn!("Patient form blocked by validation: {}", e);
            return Err(e);
        }

        let target = FormTarget::for_record(PATIENTS_PATH, form.fields.id);
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
                    "Paciente actualizado exitosamente"
                } else {
                    "Paciente creado exitosamente"
                };
                self.form = None;
                self.notifier.success(message);
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al guardar el paciente"));
                Err(e)
            }
        }
    }

    pub fn view_details(&mut self, _id: i64) {
        self.notifier.info("Funcionalidad de vista detallada en desarrollo");
    }

    pub fn request_status_change(&mut self, id: i64) -> bool {
        let Some(patient) = self.patients.iter().find(|p| p.id_paciente == id) else {
            return false;
        };
        let shown = patient.estado;
        let (title, message, label) = if shown.is_active() {
            (
                "Inactivar Paciente",
                "¿Está seguro que desea inactivar este paciente? El paciente no podrá agendar nuevas citas mientras esté inactivo.",
                "Inactivar",
            )
        } else {
            (
                "Activar Paciente",
                "¿Está seguro que desea activar este paciente?",
                "Activar",
            )
        };
        self.confirm
            .request(title, message, label, PatientAction::SetStatus { id, shown });
        true
    }

    pub fn cancel_action(&mut self) {
        self.confirm.cancel();
    }

    pub async fn confirm_action(&mut self) -> AppResult<()> {
        let Some(PatientAction::SetStatus { id, shown }) = self.confirm.confirm() else {
            return Ok(());
        };
        let body = StatusPayload {
            estado: shown.toggled(),
        };
        match self
            .ctx
            .api
            .patch::<_, ApiMessage>(&format!("{}/{}/status", PATIENTS_PATH, id), &body)
            .await
        {
            Ok(response) => {
                log::info!("Patient {} set to {}", id, body.estado.code());
                self.notifier.success(
                    response
                        .message
                        .unwrap_or_else(|| "Estado del paciente actualizado".to_string()),
                );
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al actualizar estado"));
                Err(e)
            }
        }
    }

    pub fn view(&self) -> PatientsView {
        let table_body = if self.loading {
            loading_row(COLUMNS)
        } else if let Some(error) = &self.load_error {
            message_row(COLUMNS, "text-danger", error)
        } else {
            render_rows(&self.patients)
        };
        PatientsView {
            header: self.header.render(),
            table_body,
            count_active: self.stats.active,
            count_total: self.stats.total,
            count_new: self.stats.new_this_month,
            inactive_toggle: self.filters.inactive_toggle_label().to_string(),
            alerts: self.notifier.render(),
        }
    }
}

pub fn render_rows(patients: &[Patient]) -> String {
    if patients.is_empty() {
        return message_row(COLUMNS, "text-muted", "No se encontraron pacientes");
    }
    patients.iter().map(render_row).collect::<Vec<_>>().join("\n")
}

fn render_row(p: &Patient) -> String {
    let active = p.estado.is_active();
    format!(
        r#"<tr data-id="{id}">
    <td><div class="patient-avatar bg-primary text-white fw-bold">{initials}</div></td>
    <td><span class="fw-semibold">{name}</span></td>
    <td>{cedula}</td>
    <td>{phone}</td>
    <td>{email}</td>
    <td>{birth}</td>
    <td>{status}</td>
    <td>{created}</td>
    <td>
        <button class="btn btn-sm btn-outline-primary action-btn edit-btn" data-id="{id}" title="Editar"><i class="fas fa-edit"></i></button>
        <button class="btn btn-sm btn-outline-info action-btn view-btn" data-id="{id}" title="Ver detalles"><i class="fas fa-eye"></i></button>
        <button class="btn btn-sm btn-outline-{btn} action-btn status-btn" data-id="{id}" data-estado="{code}" title="{title}"><i class="fas {icon}"></i></button>
    </td>
</tr>"#,
        id = p.id_paciente,
        initials = escape_html(&initials(&p.nombre_completo)),
        name = escape_html(&p.nombre_completo),
        cedula = or_placeholder(p.cedula.as_deref(), "No registrada"),
        phone = phone_link(p.telefono.as_deref(), "No registrado"),
        email = email_link(p.correo.as_deref(), "No registrado"),
        birth = format_date_es(p.fecha_nacimiento.as_deref(), "No registrada"),
        status = status_badge(p.estado),
        created = format_date_es(p.fecha_creacion.as_deref(), "No registrada"),
        btn = if active { "danger" } else { "success" },
        code = p.estado.code(),
        title = if active { "Inactivar" } else { "Activar" },
        icon = if active { "fa-user-slash" } else { "fa-user-check" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> Patient {
        Patient {
            id_paciente: 3,
            nombre_completo: "María José Pérez".into(),
            cedula: None,
            fecha_nacimiento: Some("1990-03-07".into()),
            genero: None,
            telefono: None,
            correo: Some("mj@correo.com".into()),
            direccion: None,
            estado: Status::Inactive,
            tipo_sangre: None,
            observaciones: None,
            fecha_creacion: None,
        }
    }

    #[test]
    fn filter_reducer_toggles_inactive() {
        let mut filters = PatientFilters::default();
        assert_eq!(filters.inactive_toggle_label(), "Ocultar inactivos");
        filters.apply(PatientFilterChange::ToggleInactive);
        assert_eq!(filters.estado, Some(Status::Active));
        assert_eq!(filters.inactive_toggle_label(), "Mostrar inactivos");
        filters.apply(PatientFilterChange::ToggleInactive);
        assert_eq!(filters.estado, None);

        filters.apply(PatientFilterChange::Search("ana".into()));
        filters.apply(PatientFilterChange::DateFrom("2024-01-01".into()));
        let query = filters.query();
        assert_eq!(query[0], ("estado", String::new()));
        assert_eq!(query[1], ("search", "ana".to_string()));
        assert_eq!(query[2], ("fecha_desde", "2024-01-01".to_string()));

        filters.apply(PatientFilterChange::Clear);
        assert_eq!(filters, PatientFilters::default());
    }

    #[test]
    fn validation_requires_eight_digit_cedula() {
        let mut fields = PatientFormFields {
            nombre_completo: "Ana".into(),
            cedula: "1234".into(),
            ..Default::default()
        };
        match fields.validate() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors["cedula"], "La cédula debe tener 8 dígitos numéricos")
            }
            other => panic!("unexpected: {:?}", other),
        }
        fields.cedula = "12345678".into();
        assert!(fields.validate().is_ok());

        let payload = serde_json::to_value(fields.payload()).unwrap();
        assert_eq!(payload["fecha_nacimiento"], serde_json::Value::Null);
        assert_eq!(payload["observaciones"], serde_json::Value::Null);
        assert_eq!(payload["estado"], "A");
    }

    #[test]
    fn rows_show_avatar_dates_and_placeholders() {
        let html = render_rows(&[patient()]);
        assert!(html.contains(">MJ<"));
        assert!(html.contains("07/03/1990"));
        assert!(html.contains("No registrada"));
        assert!(html.contains("No registrado"));
        assert!(html.contains("mailto:mj@correo.com"));
        assert!(html.contains(r#"data-estado="I""#));
        assert!(html.contains("btn-outline-success"));
    }
}
