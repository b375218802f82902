//! Programación de citas: selección de médico, fecha y horario.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::api::{RequestSequencer, Ticket};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{AppointmentCreated, AvailableDoctor, PatientOption};
use crate::notify::Notifier;
use crate::pages::PageContext;
use crate::render::{escape_html, select_options};

pub const DEFAULT_WORKING_DAYS: &str = "1,2,3,4,5";
pub const DEFAULT_WORKING_HOURS: &str = "09:00-17:00";

/// Días laborales del médico (0 = domingo .. 6 = sábado)
pub fn working_days(doctor: &AvailableDoctor) -> Vec<u32> {
    doctor
        .dias_laborales
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_WORKING_DAYS)
        .split(',')
        .filter_map(|d| d.trim().parse().ok())
        .collect()
}

pub fn works_on(doctor: &AvailableDoctor, date: NaiveDate) -> bool {
    working_days(doctor).contains(&date.weekday().num_days_from_sunday())
}

/// Contenido del panel de horarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPanel {
    Prompt,
    SelectDoctorFirst,
    WrongDay,
    Loading,
    Slots(Vec<String>),
    Empty,
    Error(String),
}

impl SlotPanel {
    pub fn render(&self, selected: Option<&str>) -> String {
        match self {
            SlotPanel::Prompt => r#"<div class="info-message">Seleccione un médico y una fecha para ver los horarios disponibles</div>"#.to_string(),
            SlotPanel::SelectDoctorFirst => r#"<div class="alert alert-info"><i class="fas fa-info-circle me-2"></i>Seleccione un médico primero</div>"#.to_string(),
            SlotPanel::WrongDay => r#"<div class="alert alert-warning"><i class="fas fa-calendar-times me-2"></i>Seleccione otra fecha</div>"#.to_string(),
            SlotPanel::Loading => r#"<div class="d-flex justify-content-center align-items-center py-3"><div class="loading-spinner me-2"></div><span>Cargando horarios disponibles...</span></div>"#.to_string(),
            SlotPanel::Empty => r#"<div class="alert alert-warning"><i class="fas fa-calendar-times me-2"></i>No hay horarios disponibles para esta fecha</div>"#.to_string(),
            SlotPanel::Error(message) => format!(
                r#"<div class="alert alert-danger"><i class="fas fa-exclamation-triangle me-2"></i>{}</div>"#,
                escape_html(message)
            ),
            SlotPanel::Slots(times) => times
                .iter()
                .map(|t| {
                    let class = if selected == Some(t.as_str()) {
                        "time-range-bar selected"
                    } else {
                        "time-range-bar"
                    };
                    format!(
                        r#"<div class="time-range"><div class="time-range-label">{t}</div><div class="{class}" data-time="{t}">{t}</div></div>"#,
                        t = escape_html(t),
                        class = class
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentForm {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub date: Option<NaiveDate>,
    /// Horario elegido, tal como lo devolvió la API
    pub time: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppointmentPayload {
    pub id_medico: i64,
    pub id_paciente: i64,
    pub fecha_cita: String,
    pub hora_cita: String,
    pub motivo_consulta: String,
}

/// Confirmación mostrada tras crear la cita
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentConfirmation {
    pub cita_id: String,
    pub date: String,
    pub time: String,
    pub doctor: String,
    pub patient: String,
    pub reason: String,
}

impl AppointmentConfirmation {
    pub fn render(&self) -> String {
        format!(
            r#"<div id="confirmationMessage"><strong>Cita programada exitosamente</strong><br>ID de cita: {id}</div>
<div id="citaDetails"><strong>Detalles:</strong><br>Fecha: {date}<br>Hora: {time}<br>Médico: {doctor}<br>Paciente: {patient}<br>Motivo: {reason}</div>"#,
            id = escape_html(&self.cita_id),
            date = escape_html(&self.date),
            time = escape_html(&self.time),
            doctor = escape_html(&self.doctor),
            patient = escape_html(&self.patient),
            reason = escape_html(&self.reason),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentsView {
    pub doctor_options: String,
    pub patient_options: String,
    pub slots: String,
    pub date_error: String,
    pub slot_error: String,
    pub submit_enabled: bool,
    pub confirmation: Option<String>,
    pub messages: String,
}

pub struct AppointmentsPage {
    ctx: PageContext,
    doctors: Vec<AvailableDoctor>,
    patients: Vec<PatientOption>,
    pub form: AppointmentForm,
    panel: SlotPanel,
    date_error: Option<String>,
    slot_error: Option<String>,
    submit_enabled: bool,
    slot_sequencer: RequestSequencer,
    confirmation: Option<AppointmentConfirmation>,
    pub notifier: Notifier,
}

impl AppointmentsPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        Self {
            ctx,
            doctors: Vec::new(),
            patients: Vec::new(),
            form: AppointmentForm::default(),
            panel: SlotPanel::Prompt,
            date_error: None,
            slot_error: None,
            submit_enabled: true,
            slot_sequencer: RequestSequencer::new(),
            confirmation: None,
            notifier,
        }
    }

    pub async fn init(&mut self) {
        self.load_options().await;
    }

    /// Carga los selectores de médicos y pacientes
    pub async fn load_options(&mut self) {
        match self.ctx.api.get::<Vec<AvailableDoctor>>("/api/medicos/disponibles").await {
            Ok(doctors) => self.doctors = doctors,
            Err(e) => {
                log::error!("Error al cargar médicos: {}", e);
                self.notifier.error("Error al cargar la lista de médicos");
            }
        }
        match self.ctx.api.get::<Vec<PatientOption>>("/api/pacientes").await {
            Ok(patients) => self.patients = patients,
            Err(e) => {
                log::error!("Error al cargar pacientes: {}", e);
                self.notifier.error("Error al cargar la lista de pacientes");
            }
        }
    }

    pub fn doctors(&self) -> &[AvailableDoctor] {
        &self.doctors
    }

    pub fn patients(&self) -> &[PatientOption] {
        &self.patients
    }

    pub fn panel(&self) -> &SlotPanel {
        &self.panel
    }

    pub fn date_error(&self) -> Option<&str> {
        self.date_error.as_deref()
    }

    pub fn slot_error(&self) -> Option<&str> {
        self.slot_error.as_deref()
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn confirmation(&self) -> Option<&AppointmentConfirmation> {
        self.confirmation.as_ref()
    }

    fn selected_doctor(&self) -> Option<&AvailableDoctor> {
        let id = self.form.doctor_id?;
        self.doctors.iter().find(|d| d.id_medico == id)
    }

    /// Descarta el horario elegido; el envío queda bloqueado hasta elegir otro
    fn clear_slot_choice(&mut self) {
        self.form.time = None;
        self.slot_error = None;
        self.submit_enabled = false;
    }

    pub async fn select_doctor(&mut self, doctor_id: Option<i64>) {
        self.form.doctor_id = doctor_id;
        if doctor_id.is_none() {
            self.clear_slot_choice();
            self.date_error = None;
            self.panel = if self.form.date.is_some() {
                SlotPanel::SelectDoctorFirst
            } else {
                SlotPanel::Prompt
            };
            return;
        }
        if self.form.date.is_some() {
            self.refresh_slots().await;
        }
    }

    pub async fn select_date(&mut self, date: NaiveDate) {
        self.form.date = Some(date);
        self.date_error = None;
        if self.form.doctor_id.is_none() {
            self.clear_slot_choice();
            self.panel = SlotPanel::SelectDoctorFirst;
            return;
        }
        self.refresh_slots().await;
    }

    pub fn select_patient(&mut self, patient_id: Option<i64>) {
        self.form.patient_id = patient_id;
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.form.reason = reason.into();
    }

    /// Comprueba el día y, si es laborable, pide los horarios una sola vez
    async fn refresh_slots(&mut self) {
        let (Some(date), Some(doctor)) = (self.form.date, self.selected_doctor()) else {
            self.clear_slot_choice();
            self.panel = SlotPanel::Prompt;
            return;
        };
        let doctor_id = doctor.id_medico;
        if !works_on(doctor, date) {
            log::warn!(
                "Doctor {} does not work on {} (weekday {})",
                doctor_id,
                date,
                date.weekday().num_days_from_sunday()
            );
            self.clear_slot_choice();
            self.date_error = Some("El médico no trabaja este día".to_string());
            self.panel = SlotPanel::WrongDay;
            return;
        }
        let (ticket, result) = self.fetch_slots(doctor_id, date).await;
        self.apply_slots(ticket, result);
    }

    pub async fn fetch_slots(&mut self, doctor_id: i64, date: NaiveDate) -> (Ticket, AppResult<Vec<String>>) {
        self.slot_error = None;
        self.form.time = None;
        self.submit_enabled = false;
        self.panel = SlotPanel::Loading;
        let ticket = self.slot_sequencer.issue();
        let fecha = date.format("%Y-%m-%d").to_string();
        let result = self
            .ctx
            .api
            .get_query(&format!("/api/medicos/{}/horarios", doctor_id), &[("fecha", fecha)])
            .await;
        (ticket, result)
    }

    pub fn apply_slots(&mut self, ticket: Ticket, result: AppResult<Vec<String>>) -> bool {
        if !self.slot_sequencer.is_latest(ticket) {
            log::debug!("Discarding stale slots response");
            return false;
        }
        self.panel = match result {
            Ok(slots) if slots.is_empty() => SlotPanel::Empty,
            Ok(slots) => SlotPanel::Slots(slots),
            Err(e) => SlotPanel::Error(
                e.user_message("El médico no trabaja este día o no hay horarios disponibles"),
            ),
        };
        true
    }

    /// Selección exclusiva de un horario mostrado
    pub fn select_slot(&mut self, time: &str) -> bool {
        let SlotPanel::Slots(slots) = &self.panel else {
            return false;
        };
        if !slots.iter().any(|s| s == time) {
            return false;
        }
        self.form.time = Some(time.to_string());
        self.slot_error = None;
        self.submit_enabled = true;
        true
    }

    fn validate(&self) -> AppResult<AppointmentPayload> {
        let mut errors = FieldErrors::new();
        if self.form.doctor_id.is_none() {
            errors.insert("id_medico", "Seleccione un médico".to_string());
        }
        if self.form.patient_id.is_none() {
            errors.insert("id_paciente", "Seleccione un paciente".to_string());
        }
        if self.form.date.is_none() {
            errors.insert("fecha_cita", "Seleccione una fecha".to_string());
        } else if let Some(error) = &self.date_error {
            errors.insert("fecha_cita", error.clone());
        }
        if self.form.time.is_none() {
            errors.insert("hora_cita", "Por favor seleccione un horario para la cita".to_string());
        }
        match (self.form.doctor_id, self.form.patient_id, self.form.date, &self.form.time) {
            (Some(id_medico), Some(id_paciente), Some(date), Some(time)) if errors.is_empty() => {
                Ok(AppointmentPayload {
                    id_medico,
                    id_paciente,
                    fecha_cita: date.format("%Y-%m-%d").to_string(),
                    hora_cita: time.clone(),
                    motivo_consulta: self.form.reason.clone(),
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }

    pub async fn submit(&mut self) -> AppResult<()> {
        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(e) => {
                if let AppError::Validation(errors) = &e {
                    self.slot_error = errors.get("hora_cita").cloned();
                }
                log::warn!("Appointment blocked by validation: {}", e);
                return Err(e);
            }
        };

        self.submit_enabled = false;
        let result: AppResult<AppointmentCreated> = self.ctx.api.post("/api/citas", &payload).await;
        match result {
            Ok(created) => {
                let doctor = self
                    .doctors
                    .iter()
                    .find(|d| d.id_medico == payload.id_medico)
                    .map(|d| d.nombre_completo.clone())
                    .unwrap_or_default();
                let patient = self
                    .patients
                    .iter()
                    .find(|p| p.id_paciente == payload.id_paciente)
                    .map(|p| p.nombre_completo.clone())
                    .unwrap_or_default();
                log::info!("Appointment {} created", created.cita_id_display());
                self.confirmation = Some(AppointmentConfirmation {
                    cita_id: created.cita_id_display(),
                    date: payload.fecha_cita,
                    time: payload.hora_cita,
                    doctor,
                    patient,
                    reason: payload.motivo_consulta,
                });
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message("Error al programar la cita"));
                self.submit_enabled = true;
                Err(e)
            }
        }
    }

    /// Cerrar la confirmación reinicia el formulario y recarga los selectores
    pub async fn dismiss_confirmation(&mut self) {
        if self.confirmation.take().is_none() {
            return;
        }
        self.form = AppointmentForm::default();
        self.panel = SlotPanel::Prompt;
        self.date_error = None;
        self.slot_error = None;
        self.submit_enabled = true;
        self.load_options().await;
    }

    pub fn view(&self) -> AppointmentsView {
        let selected_doctor = self.form.doctor_id.map(|id| id.to_string());
        let selected_patient = self.form.patient_id.map(|id| id.to_string());
        AppointmentsView {
            doctor_options: select_options(
                "Seleccionar médico...",
                self.doctors.iter().map(|d| {
                    (
                        d.id_medico.to_string(),
                        format!(
                            "{} - {}",
                            d.nombre_completo,
                            d.especialidad.as_deref().unwrap_or("")
                        ),
                    )
                }),
                selected_doctor.as_deref(),
            ),
            patient_options: select_options(
                "Seleccionar paciente...",
                self.patients
                    .iter()
                    .map(|p| (p.id_paciente.to_string(), p.nombre_completo.clone())),
                selected_patient.as_deref(),
            ),
            slots: self.panel.render(self.form.time.as_deref()),
            date_error: self.date_error.clone().unwrap_or_default(),
            slot_error: self.slot_error.clone().unwrap_or_default(),
            submit_enabled: self.submit_enabled,
            confirmation: self.confirmation.as_ref().map(AppointmentConfirmation::render),
            messages: self.notifier.render(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(days: Option<&str>) -> AvailableDoctor {
        AvailableDoctor {
            id_medico: 1,
            nombre_completo: "Ana Pérez".into(),
            especialidad: Some("Cardiología".into()),
            dias_laborales: days.map(str::to_string),
            horario_laboral: None,
        }
    }

    #[test]
    fn default_working_days_are_weekdays() {
        let d = doctor(None);
        assert_eq!(working_days(&d), vec![1, 2, 3, 4, 5]);
        // 2024-06-09 es domingo, 2024-06-10 lunes
        assert!(!works_on(&d, NaiveDate::from_ymd_opt(2024, 6, 9).unwrap()));
        assert!(works_on(&d, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()));
    }

    #[test]
    fn custom_working_days_include_weekend() {
        let d = doctor(Some("0, 6"));
        assert!(works_on(&d, NaiveDate::from_ymd_opt(2024, 6, 9).unwrap()));
        assert!(!works_on(&d, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()));
    }

    #[test]
    fn slot_panel_marks_selected_block() {
        let panel = SlotPanel::Slots(vec!["08:00".into(), "08:30".into()]);
        let html = panel.render(Some("08:30"));
        assert!(html.contains(r#"class="time-range-bar selected" data-time="08:30""#));
        assert!(html.contains(r#"class="time-range-bar" data-time="08:00""#));
        assert!(SlotPanel::Empty
            .render(None)
            .contains("No hay horarios disponibles para esta fecha"));
    }

    #[test]
    fn confirmation_lists_details() {
        let c = AppointmentConfirmation {
            cita_id: "42".into(),
            date: "2024-06-10".into(),
            time: "08:30".into(),
            doctor: "Ana Pérez".into(),
            patient: "Luis".into(),
            reason: "Control".into(),
        };
        let html = c.render();
        assert!(html.contains("ID de cita: 42"));
        assert!(html.contains("Médico: Ana Pérez"));
        assert!(html.contains("Motivo: Control"));
    }
}
