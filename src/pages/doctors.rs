//! Administración de médicos.

use serde::Serialize;

use crate::api::{RequestSequencer, Ticket};
use crate::confirm::ConfirmGate;
use crate::error::{AppError, AppResult};
use crate::form::{optional, FormTarget, ModalForm, SubmitButton};
use crate::models::{ApiMessage, Doctor, Status};
use crate::notify::Notifier;
use crate::pages::{load_session_header, PageContext, Redirect, SessionHeader};
use crate::render::{email_link, escape_html, loading_row, message_row, phone_link, status_badge};
use crate::validation::{is_email, is_phone, Validator};

const DOCTORS_PATH: &str = "/api/medicos";
const COLUMNS: usize = 7;

/// Filtros del listado (se aplican en el cliente)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorFilters {
    pub specialty: String,
    pub status: Option<Status>,
    pub search: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Specialty(String),
    Status(Option<Status>),
    Search(String),
    Clear,
}

impl DoctorFilters {
    pub fn apply(&mut self, change: FilterChange) {
        match change {
            FilterChange::Specialty(s) => self.specialty = s,
            FilterChange::Status(s) => self.status = s,
            FilterChange::Search(s) => self.search = s,
            FilterChange::Clear => *self = Self::default(),
        }
    }

    pub fn matches(&self, doctor: &Doctor) -> bool {
        let specialty_ok = self.specialty.is_empty()
            || doctor
                .especialidad
                .as_deref()
                .is_some_and(|e| contains_ci(e, &self.specialty));
        let status_ok = self.status.map_or(true, |s| doctor.estado == s);
        let search_ok = self.search.trim().is_empty() || {
            let needle = self.search.trim();
            contains_ci(&doctor.id_medico.to_string(), needle)
                || contains_ci(&doctor.nombre_completo, needle)
                || [&doctor.especialidad, &doctor.telefono, &doctor.correo]
                    .iter()
                    .any(|f| f.as_deref().is_some_and(|v| contains_ci(v, needle)))
        };
        specialty_ok && status_ok && search_ok
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Campos del modal de médico
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorFormFields {
    pub id: Option<i64>,
    pub nombre_completo: String,
    pub especialidad: String,
    pub telefono: String,
    pub correo: String,
    pub estado: Status,
}

impl Default for DoctorFormFields {
    fn default() -> Self {
        Self {
            id: None,
            nombre_completo: String::new(),
            especialidad: String::new(),
            telefono: String::new(),
            correo: String::new(),
            estado: Status::Active,
        }
    }
}

impl From<&Doctor> for DoctorFormFields {
    fn from(d: &Doctor) -> Self {
        Self {
            id: Some(d.id_medico),
            nombre_completo: d.nombre_completo.clone(),
            especialidad: d.especialidad.clone().unwrap_or_default(),
            telefono: d.telefono.clone().unwrap_or_default(),
            correo: d.correo.clone().unwrap_or_default(),
            estado: d.estado,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorPayload {
    pub nombre_completo: String,
    pub especialidad: String,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub estado: Status,
}

impl DoctorFormFields {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("nombre_completo", &self.nombre_completo, "Ingrese el nombre completo")
            .required("especialidad", &self.especialidad, "Seleccione una especialidad")
            .optional_format("telefono", &self.telefono, is_phone, "El teléfono debe tener entre 7 y 12 dígitos")
            .optional_format("correo", &self.correo, is_email, "Ingrese un email válido")
            .finish()
    }

    pub fn payload(&self) -> DoctorPayload {
        DoctorPayload {
            nombre_completo: self.nombre_completo.trim().to_string(),
            especialidad: self.especialidad.trim().to_string(),
            telefono: optional(&self.telefono),
            correo: optional(&self.correo),
            estado: self.estado,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorAction {
    /// Estado mostrado en la fila al pedir el cambio
    ToggleStatus { id: i64, shown: Status },
}

/// Vista renderizada de la página
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorsView {
    pub header: String,
    pub table_body: String,
    pub total_label: String,
    pub alerts: String,
}

pub struct DoctorsPage {
    ctx: PageContext,
    doctors: Vec<Doctor>,
    loading: bool,
    load_error: Option<String>,
    filters: DoctorFilters,
    sequencer: RequestSequencer,
    header: SessionHeader,
    pub notifier: Notifier,
    pub form: Option<ModalForm<DoctorFormFields>>,
    pub confirm: ConfirmGate<DoctorAction>,
}

impl DoctorsPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        Self {
            ctx,
            doctors: Vec::new(),
            loading: false,
            load_error: None,
            filters: DoctorFilters::default(),
            sequencer: RequestSequencer::new(),
            header: SessionHeader::default(),
            notifier,
            form: None,
            confirm: ConfirmGate::default(),
        }
    }

    /// Carga de la página: cabecera de sesión y listado
    pub async fn init(&mut self) {
        self.header = load_session_header(&self.ctx.api).await;
        self.load().await;
    }

    pub async fn fetch_list(&self) -> (Ticket, AppResult<Vec<Doctor>>) {
        let ticket = self.sequencer.issue();
        (ticket, self.ctx.api.get(DOCTORS_PATH).await)
    }

    /// Aplica una respuesta del listado; `false` si llegó tarde y se descartó
    pub fn apply_list(&mut self, ticket: Ticket, result: AppResult<Vec<Doctor>>) -> bool {
        if !self.sequencer.is_latest(ticket) {
            log::debug!("Discarding stale doctors response");
            return false;
        }
        self.loading = false;
        match result {
            Ok(doctors) => {
                self.doctors = doctors;
                self.load_error = None;
            }
            Err(e) => {
                let message = "Error al cargar la lista de médicos";
                log::error!("{}: {}", message, e);
                self.doctors.clear();
                self.load_error = Some(message.to_string());
                self.notifier.error(message);
            }
        }
        true
    }

    pub async fn load(&mut self) {
        self.loading = true;
        let (ticket, result) = self.fetch_list().await;
        self.apply_list(ticket, result);
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn filters(&self) -> &DoctorFilters {
        &self.filters
    }

    pub fn filter(&mut self, change: FilterChange) {
        self.filters.apply(change);
    }

    pub fn visible(&self) -> Vec<&Doctor> {
        self.doctors.iter().filter(|d| self.filters.matches(d)).collect()
    }

    /// Especialidades presentes en el listado, para el filtro
    pub fn specialties(&self) -> Vec<String> {
        let mut list: Vec<String> = self
            .doctors
            .iter()
            .filter_map(|d| d.especialidad.clone())
            .filter(|e| !e.is_empty())
            .collect();
        list.sort();
        list.dedup();
        list
    }

    pub fn open_create(&mut self) {
        self.form = Some(ModalForm::new(
            "Nuevo Médico",
            DoctorFormFields::default(),
            SubmitButton::new("Guardar", "Guardando..."),
        ));
    }

    /// Carga el médico y abre el modal de edición; si falla el modal no se abre
    pub async fn open_edit(&mut self, id: i64) -> AppResult<()> {
        match self.ctx.api.get::<Doctor>(&format!("{}/{}", DOCTORS_PATH, id)).await {
            Ok(doctor) => {
                self.form = Some(ModalForm::new(
                    "Editar Médico",
                    DoctorFormFields::from(&doctor),
                    SubmitButton::new("Guardar", "Guardando..."),
                ));
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    AppError::Api { .. } => "Médico no encontrado",
                    _ => "Error al cargar datos del médico",
                };
                self.notifier.error(message);
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
                form.errors = errors.clone();
            }
            log::warn!("Doctor form blocked by validation: {}", e);
            return Err(e);
        }

        let target = FormTarget::for_record(DOCTORS_PATH, form.fields.id);
        let payload = form.fields.payload();
        form.submit.begin();
        let result: AppResult<ApiMessage> = self
            .ctx
            .api
            .send(target.method(), target.path(), Some(&payload))
            .await;
        form.submit.finish();

        match result {
            Ok(response) => {
                let default = if target.is_update() {
                    "Médico actualizado exitosamente"
                } else {
                    "Médico creado exitosamente"
                };
                self.form = None;
                self.notifier.success(response.message.unwrap_or_else(|| default.to_string()));
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al guardar el médico"));
                Err(e)
            }
        }
    }

    /// Pide confirmación para activar/desactivar usando el estado de la fila
    pub fn request_toggle(&mut self, id: i64) -> bool {
        let Some(doctor) = self.doctors.iter().find(|d| d.id_medico == id) else {
            return false;
        };
        let verb = toggle_verb(doctor.estado);
        self.confirm.request(
            "Confirmar acción",
            format!("¿Está seguro que desea {} este médico?", verb),
            "Confirmar",
            DoctorAction::ToggleStatus {
                id,
                shown: doctor.estado,
            },
        );
        true
    }

    pub fn cancel_action(&mut self) {
        self.confirm.cancel();
    }

    pub async fn confirm_action(&mut self) -> AppResult<()> {
        let Some(DoctorAction::ToggleStatus { id, shown }) = self.confirm.confirm() else {
            return Ok(());
        };
        let verb = toggle_verb(shown);
        match self
            .ctx
            .api
            .delete::<ApiMessage>(&format!("{}/{}", DOCTORS_PATH, id))
            .await
        {
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| format!("Médico {}do correctamente", verb.trim_end_matches('r')));
                log::info!("Doctor {} status changed from {}", id, shown.code());
                self.notifier.success(message);
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al cambiar estado del médico"));
                Err(e)
            }
        }
    }

    /// Navega al editor de horarios; no hace ninguna petición
    pub fn manage_schedule(&self, id: i64) -> Redirect {
        Redirect::now(format!("horarios.html?id={}", urlencoding::encode(&id.to_string())))
    }

    pub fn view(&self) -> DoctorsView {
        let visible = self.visible();
        let table_body = if self.loading {
            loading_row(COLUMNS)
        } else if let Some(error) = &self.load_error {
            message_row(COLUMNS, "text-danger", error)
        } else {
            render_rows(&visible)
        };
        DoctorsView {
            header: self.header.render(),
            table_body,
            total_label: format!("{} médicos", visible.len()),
            alerts: self.notifier.render(),
        }
    }
}

fn toggle_verb(shown: Status) -> &'static str {
    if shown.is_active() {
        "desactivar"
    } else {
        "activar"
    }
}

pub fn render_rows(doctors: &[&Doctor]) -> String {
    if doctors.is_empty() {
        return message_row(COLUMNS, "text-muted", "No se encontraron médicos");
    }
    doctors.iter().map(|d| render_row(d)).collect::<Vec<_>>().join("\n")
}

fn render_row(d: &Doctor) -> String {
    let (toggle_title, toggle_icon) = if d.estado.is_active() {
        ("Desactivar", "fa-user-slash")
    } else {
        ("Activar", "fa-user-check")
    };
    format!(
        r#"<tr data-id="{id}">
    <td class="fw-bold">{id}</td>
    <td><span class="fw-semibold">{name}</span></td>
    <td>{specialty}</td>
    <td>{phone}</td>
    <td>{email}</td>
    <td>{status}</td>
    <td>
        <div class="btn-group" role="group">
            <button class="btn btn-sm btn-outline-primary action-btn edit-btn" data-id="{id}" title="Editar"><i class="fas fa-edit"></i></button>
            <button class="btn btn-sm btn-outline-success action-btn schedule-btn" data-id="{id}" title="Gestionar horario"><i class="fas fa-calendar-alt"></i></button>
            <button class="btn btn-sm btn-outline-danger action-btn delete-btn" data-id="{id}" data-estado="{code}" title="{toggle_title}"><i class="fas {toggle_icon}"></i></button>
        </div>
    </td>
</tr>"#,
        id = d.id_medico,
        name = escape_html(&d.nombre_completo),
        specialty = escape_html(d.especialidad.as_deref().unwrap_or("")),
        phone = phone_link(d.telefono.as_deref(), "No registrado"),
        email = email_link(d.correo.as_deref(), "No registrado"),
        status = status_badge(d.estado),
        code = d.estado.code(),
        toggle_title = toggle_title,
        toggle_icon = toggle_icon,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: i64, name: &str, specialty: &str, estado: Status) -> Doctor {
        Doctor {
            id_medico: id,
            nombre_completo: name.to_string(),
            especialidad: Some(specialty.to_string()),
            telefono: None,
            correo: None,
            estado,
        }
    }

    #[test]
    fn filters_combine_specialty_status_and_search() {
        let a = doctor(1, "Ana Pérez", "Cardiología", Status::Active);
        let b = doctor(2, "Luis Gómez", "Pediatría", Status::Inactive);

        let mut filters = DoctorFilters::default();
        assert!(filters.matches(&a) && filters.matches(&b));

        filters.apply(FilterChange::Specialty("cardio".into()));
        assert!(filters.matches(&a));
        assert!(!filters.matches(&b));

        filters.apply(FilterChange::Clear);
        filters.apply(FilterChange::Status(Some(Status::Inactive)));
        assert!(!filters.matches(&a));
        assert!(filters.matches(&b));

        filters.apply(FilterChange::Status(None));
        filters.apply(FilterChange::Search("gómez".into()));
        assert!(filters.matches(&b));
        assert!(!filters.matches(&a));
    }

    #[test]
    fn form_validation_and_null_optionals() {
        let mut fields = DoctorFormFields {
            nombre_completo: "Ana Pérez".into(),
            especialidad: "Cardiología".into(),
            telefono: "12".into(),
            ..Default::default()
        };
        match fields.validate() {
            Err(AppError::Validation(errors)) => assert!(errors.contains_key("telefono")),
            other => panic!("unexpected: {:?}", other),
        }

        fields.telefono = " ".into();
        assert!(fields.validate().is_ok());
        let payload = serde_json::to_value(fields.payload()).unwrap();
        assert_eq!(payload["telefono"], serde_json::Value::Null);
        assert_eq!(payload["correo"], serde_json::Value::Null);
        assert_eq!(payload["estado"], "A");
    }

    #[test]
    fn rows_carry_ids_and_placeholders() {
        let d = doctor(9, "Ana <b>", "Cardiología", Status::Active);
        let html = render_rows(&[&d]);
        assert!(html.contains(r#"data-id="9""#));
        assert!(html.contains("No registrado"));
        assert!(html.contains("Ana &lt;b&gt;"));
        assert!(html.contains("Activo"));
        assert!(render_rows(&[]).contains("No se encontraron médicos"));
    }
}
