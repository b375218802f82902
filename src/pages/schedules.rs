//! Editor de horarios de atención por médico.

use serde::Serialize;

use crate::api::{RequestSequencer, Ticket};
use crate::confirm::ConfirmGate;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{day_name, parse_time, ApiMessage, Doctor, ScheduleEntry, SlotPreview, WeeklySchedule};
use crate::notify::Notifier;
use crate::pages::{page_query_param, PageContext};
use crate::render::{escape_html, message_row, select_options};
use crate::validation::time_range_is_valid;

const SCHEDULES_PATH: &str = "/api/horarios";

/// Id del médico en la URL de la página (`horarios.html?id=12`)
pub fn doctor_from_query(query: &str) -> Option<i64> {
    page_query_param(query, "id").and_then(|value| value.trim().parse().ok())
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeeklyState {
    NoDoctor,
    Loading,
    Loaded(WeeklySchedule),
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotsState {
    Idle,
    Loading,
    Slots(Vec<String>),
    Message(String),
}

/// Datos de un horario nuevo o editado
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleDraft {
    pub day: Option<u8>,
    pub start: String,
    pub end: String,
}

impl ScheduleDraft {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if self.day.is_none() || self.start.trim().is_empty() || self.end.trim().is_empty() {
            errors.insert("horario", "Por favor complete todos los campos".to_string());
        } else if !time_range_is_valid(&self.start, &self.end) {
            errors.insert(
                "horario",
                "La hora de inicio debe ser anterior a la hora de fin".to_string(),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct NewSchedulePayload<'a> {
    id_medico: i64,
    dia_semana: u8,
    hora_inicio: &'a str,
    hora_fin: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ScheduleUpdatePayload<'a> {
    dia_semana: u8,
    hora_inicio: &'a str,
    hora_fin: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEdit {
    pub id: i64,
    pub draft: ScheduleDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    Delete { id: i64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulesView {
    pub doctor_options: String,
    pub weekly: String,
    pub list: String,
    pub slots: String,
    pub alerts: String,
}

pub struct SchedulesPage {
    ctx: PageContext,
    doctors: Vec<Doctor>,
    doctor_id: Option<i64>,
    weekly: WeeklyState,
    list: Option<Vec<ScheduleEntry>>,
    slots: SlotsState,
    weekly_seq: RequestSequencer,
    list_seq: RequestSequencer,
    pub notifier: Notifier,
    pub edit: Option<ScheduleEdit>,
    pub confirm: ConfirmGate<ScheduleAction>,
}

impl SchedulesPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        Self {
            ctx,
            doctors: Vec::new(),
            doctor_id: None,
            weekly: WeeklyState::NoDoctor,
            list: None,
            slots: SlotsState::Idle,
            weekly_seq: RequestSequencer::new(),
            list_seq: RequestSequencer::new(),
            notifier,
            edit: None,
            confirm: ConfirmGate::default(),
        }
    }

    /// Carga los médicos y, si la URL trae `?id=`, preselecciona ese médico
    pub async fn init(&mut self, page_query: &str) {
        self.load_doctors().await;
        if let Some(id) = doctor_from_query(page_query) {
            self.select_doctor(Some(id)).await;
        }
    }

    pub async fn load_doctors(&mut self) {
        match self.ctx.api.get::<Vec<Doctor>>("/api/medicos").await {
            Ok(doctors) => self.doctors = doctors,
            Err(e) => {
                log::error!("Error al cargar médicos: {}", e);
                self.notifier.error("Error al cargar la lista de médicos");
            }
        }
    }

    pub fn doctor_id(&self) -> Option<i64> {
        self.doctor_id
    }

    pub fn weekly(&self) -> &WeeklyState {
        &self.weekly
    }

    pub fn entries(&self) -> Option<&[ScheduleEntry]> {
        self.list.as_deref()
    }

    pub fn slots(&self) -> &SlotsState {
        &self.slots
    }

    pub async fn select_doctor(&mut self, doctor_id: Option<i64>) {
        self.doctor_id = doctor_id;
        self.slots = SlotsState::Idle;
        match doctor_id {
            Some(id) => self.reload(id).await,
            None => {
                self.weekly = WeeklyState::NoDoctor;
                self.list = None;
            }
        }
    }

    /// Vuelve a pedir la vista semanal y la lista, de forma independiente
    async fn reload(&mut self, doctor_id: i64) {
        let (weekly_ticket, weekly) = self.fetch_weekly(doctor_id).await;
        self.apply_weekly(weekly_ticket, weekly);
        let (list_ticket, list) = self.fetch_list(doctor_id).await;
        self.apply_list(list_ticket, list);
    }

    pub async fn fetch_weekly(&mut self, doctor_id: i64) -> (Ticket, AppResult<WeeklySchedule>) {
        self.weekly = WeeklyState::Loading;
        let ticket = self.weekly_seq.issue();
        let result = self
            .ctx
            .api
            .get(&format!("{}/{}/semanal", SCHEDULES_PATH, doctor_id))
            .await;
        (ticket, result)
    }

    pub fn apply_weekly(&mut self, ticket: Ticket, result: AppResult<WeeklySchedule>) -> bool {
        if !self.weekly_seq.is_latest(ticket) {
            log::debug!("Discarding stale weekly schedule response");
            return false;
        }
        match result {
            Ok(weekly) => self.weekly = WeeklyState::Loaded(weekly),
            Err(e) => {
                log::error!("Error al cargar horario semanal: {}", e);
                self.weekly = WeeklyState::Failed;
                self.notifier.error("Error al cargar horario semanal");
            }
        }
        true
    }

    pub async fn fetch_list(&mut self, doctor_id: i64) -> (Ticket, AppResult<Vec<ScheduleEntry>>) {
        let ticket = self.list_seq.issue();
        let result = self
            .ctx
            .api
            .get(&format!("{}/{}", SCHEDULES_PATH, doctor_id))
            .await;
        (ticket, result)
    }

    pub fn apply_list(&mut self, ticket: Ticket, result: AppResult<Vec<ScheduleEntry>>) -> bool {
        if !self.list_seq.is_latest(ticket) {
            log::debug!("Discarding stale schedule list response");
            return false;
        }
        match result {
            Ok(mut entries) => {
                sort_entries(&mut entries);
                self.list = Some(entries);
            }
            Err(e) => {
                log::error!("Error al cargar lista de horarios: {}", e);
                self.list = None;
                self.notifier.error("Error al cargar lista de horarios");
            }
        }
        true
    }

    /// Vista previa de turnos para un día y una duración en minutos
    pub async fn check_slots(&mut self, day: u8, duration_minutes: u32) -> AppResult<()> {
        let Some(doctor_id) = self.doctor_id else {
            self.notifier.error("Por favor seleccione un médico primero");
            return Err(AppError::Custom("Por favor seleccione un médico primero".to_string()));
        };
        self.slots = SlotsState::Loading;
        let query = [("dia_semana", day.to_string()), ("duracion", duration_minutes.to_string())];
        let result: AppResult<SlotPreview> = self
            .ctx
            .api
            .get_query(&format!("{}/{}/slots", SCHEDULES_PATH, doctor_id), &query)
            .await;
        match result {
            Ok(preview) => {
                let times = preview.times();
                self.slots = if times.is_empty() {
                    SlotsState::Message("No hay horarios disponibles para este día".to_string())
                } else {
                    SlotsState::Slots(times)
                };
                Ok(())
            }
            Err(AppError::Api { status, body }) if body.error.is_some() => {
                let message = body.error.clone().unwrap_or_default();
                self.slots = SlotsState::Message(message);
                Err(AppError::Api { status, body })
            }
            Err(e) => {
                self.slots = SlotsState::Idle;
                log::error!("Error al cargar slots disponibles: {}", e);
                self.notifier.error("Error al cargar slots disponibles");
                Err(e)
            }
        }
    }

    fn reject(&mut self, e: AppError) -> AppResult<()> {
        if let AppError::Validation(errors) = &e {
            for message in errors.values() {
                self.notifier.error(message.clone());
            }
        }
        log::warn!("Schedule blocked by validation: {}", e);
        Err(e)
    }

    pub async fn add_schedule(&mut self, draft: &ScheduleDraft) -> AppResult<()> {
        let Some(doctor_id) = self.doctor_id else {
            self.notifier.error("Por favor seleccione un médico primero");
            return Err(AppError::Custom("Por favor seleccione un médico primero".to_string()));
        };
        if let Err(e) = draft.validate() {
            return self.reject(e);
        }
        let payload = NewSchedulePayload {
            id_medico: doctor_id,
            dia_semana: draft.day.unwrap_or_default(),
            hora_inicio: draft.start.trim(),
            hora_fin: draft.end.trim(),
        };
        let result: AppResult<ApiMessage> = self.ctx.api.post(SCHEDULES_PATH, &payload).await;
        self.finish_mutation(doctor_id, result, "Horario agregado exitosamente", "Error al agregar horario")
            .await
    }

    /// Abre la edición con los datos de la fila
    pub fn open_edit(&mut self, id: i64) -> bool {
        let Some(entry) = self.list.as_ref().and_then(|l| l.iter().find(|e| e.id_horario == id)) else {
            return false;
        };
        self.edit = Some(ScheduleEdit {
            id,
            draft: ScheduleDraft {
                day: entry.day_number(),
                start: entry.hora_inicio.clone(),
                end: entry.hora_fin.clone(),
            },
        });
        true
    }

    pub fn close_edit(&mut self) {
        self.edit = None;
    }

    pub async fn save_edit(&mut self) -> AppResult<()> {
        let (Some(edit), Some(doctor_id)) = (self.edit.clone(), self.doctor_id) else {
            return Err(AppError::Custom("No hay horario en edición".to_string()));
        };
        if let Err(e) = edit.draft.validate() {
            return self.reject(e);
        }
        let payload = ScheduleUpdatePayload {
            dia_semana: edit.draft.day.unwrap_or_default(),
            hora_inicio: edit.draft.start.trim(),
            hora_fin: edit.draft.end.trim(),
        };
        let result: AppResult<ApiMessage> = self
            .ctx
            .api
            .put(&format!("{}/{}", SCHEDULES_PATH, edit.id), &payload)
            .await;
        if result.is_ok() {
            self.edit = None;
        }
        self.finish_mutation(doctor_id, result, "Horario actualizado exitosamente", "Error al actualizar horario")
            .await
    }

    pub fn request_delete(&mut self, id: i64) {
        self.confirm.request(
            "Eliminar horario",
            "¿Está seguro de que desea eliminar este horario?",
            "Eliminar",
            ScheduleAction::Delete { id },
        );
    }

    pub fn cancel_action(&mut self) {
        self.confirm.cancel();
    }

    pub async fn confirm_action(&mut self) -> AppResult<()> {
        let Some(ScheduleAction::Delete { id }) = self.confirm.confirm() else {
            return Ok(());
        };
        let Some(doctor_id) = self.doctor_id else {
            return Ok(());
        };
        let result: AppResult<ApiMessage> = self
            .ctx
            .api
            .delete(&format!("{}/{}", SCHEDULES_PATH, id))
            .await;
        self.finish_mutation(doctor_id, result, "Horario eliminado exitosamente", "Error al eliminar horario")
            .await
    }

    async fn finish_mutation(
        &mut self,
        doctor_id: i64,
        result: AppResult<ApiMessage>,
        success: &str,
        fallback: &str,
    ) -> AppResult<()> {
        match result {
            Ok(_) => {
                self.notifier.success(success);
                self.reload(doctor_id).await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.user_message(fallback));
                Err(e)
            }
        }
    }

    pub fn view(&self) -> SchedulesView {
        let selected = self.doctor_id.map(|id| id.to_string());
        SchedulesView {
            doctor_options: select_options(
                "-- Seleccione un médico --",
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
                selected.as_deref(),
            ),
            weekly: render_weekly(&self.weekly),
            list: match &self.list {
                Some(entries) => render_list(entries),
                None => String::new(),
            },
            slots: render_slots(&self.slots),
            alerts: self.notifier.render(),
        }
    }
}

/// Orden por día y luego por hora de inicio
pub fn sort_entries(entries: &mut [ScheduleEntry]) {
    entries.sort_by_key(|e| (e.day_number().unwrap_or(u8::MAX), parse_time(&e.hora_inicio)));
}

pub fn render_weekly(state: &WeeklyState) -> String {
    let weekly = match state {
        WeeklyState::NoDoctor => {
            return r#"<div class="col-12 no-schedules">Seleccione un médico para ver sus horarios</div>"#.to_string()
        }
        WeeklyState::Loading => {
            return r#"<div class="col-12 text-center"><div class="spinner-border text-primary"></div></div>"#.to_string()
        }
        WeeklyState::Failed => return String::new(),
        WeeklyState::Loaded(weekly) => weekly,
    };
    if weekly.is_empty() {
        return r#"<div class="col-12 no-schedules">No hay horarios registrados para este médico</div>"#.to_string();
    }

    (1..=7u8)
        .map(|day| {
            let body = match weekly.get(&day) {
                Some(slots) if !slots.is_empty() => slots
                    .iter()
                    .map(|s| {
                        format!(
                            r#"<div class="time-slot"><span class="time"><i class="bi bi-clock me-1"></i>{} - {}</span><div class="btn-group"><button class="btn btn-sm btn-outline-primary edit-btn" data-id="{id}" title="Editar"><i class="bi bi-pencil"></i></button><button class="btn btn-sm btn-outline-danger delete-btn" data-id="{id}" title="Eliminar"><i class="bi bi-trash"></i></button></div></div>"#,
                            escape_html(&s.hora_inicio),
                            escape_html(&s.hora_fin),
                            id = s.id_horario
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(""),
                _ => r#"<div class="no-schedules">Sin horarios este día</div>"#.to_string(),
            };
            format!(
                r#"<div class="col-md-6 col-lg-4 col-xl-3 mb-4"><div class="card day-card h-100"><div class="card-header day-header"><i class="bi bi-calendar-day me-2"></i>{}</div><div class="card-body">{}</div></div></div>"#,
                day_name(day),
                body
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_list(entries: &[ScheduleEntry]) -> String {
    if entries.is_empty() {
        return message_row(5, "no-schedules", "No hay horarios registrados");
    }
    entries
        .iter()
        .map(|e| {
            format!(
                r#"<tr data-id="{id}"><td class="fw-bold">{id}</td><td>{day}</td><td><i class="bi bi-clock me-1"></i>{start}</td><td><i class="bi bi-clock me-1"></i>{end}</td><td class="text-end"><div class="btn-group"><button class="btn btn-sm btn-outline-primary me-1 edit-btn" data-id="{id}"><i class="bi bi-pencil"></i> Editar</button><button class="btn btn-sm btn-outline-danger delete-btn" data-id="{id}"><i class="bi bi-trash"></i></button></div></td></tr>"#,
                id = e.id_horario,
                day = e.day_number().map(day_name).unwrap_or("Desconocido"),
                start = escape_html(&e.hora_inicio),
                end = escape_html(&e.hora_fin),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_slots(state: &SlotsState) -> String {
    match state {
        SlotsState::Idle => String::new(),
        SlotsState::Loading => r#"<div class="spinner-border spinner-border-sm text-primary"></div>"#.to_string(),
        SlotsState::Message(message) => {
            format!(r#"<div id="noSlotsMessage">{}</div>"#, escape_html(message))
        }
        SlotsState::Slots(times) => times
            .iter()
            .map(|t| {
                format!(
                    r#"<span class="slot-badge"><i class="bi bi-clock me-1"></i>{}</span>"#,
                    escape_html(t)
                )
            })
            .collect::<Vec<_>>()
            .join(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayValue, WeeklySlot};

    fn entry(id: i64, day: u8, start: &str) -> ScheduleEntry {
        ScheduleEntry {
            id_horario: id,
            id_medico: Some(1),
            dia_semana: Some(DayValue::Name(day_name(day).to_string())),
            dia_semana_num: Some(day),
            hora_inicio: start.to_string(),
            hora_fin: "18:00".to_string(),
        }
    }

    #[test]
    fn reads_doctor_id_from_query() {
        assert_eq!(doctor_from_query("?id=12"), Some(12));
        assert_eq!(doctor_from_query("tab=list&id=7"), Some(7));
        assert_eq!(doctor_from_query("?id=abc"), None);
        assert_eq!(doctor_from_query(""), None);
        assert_eq!(doctor_from_query("?id=%31%32"), Some(12));
    }

    #[test]
    fn draft_validation_messages() {
        let draft = ScheduleDraft {
            day: Some(1),
            start: "10:00".into(),
            end: "09:00".into(),
        };
        match draft.validate() {
            Err(AppError::Validation(errors)) => assert_eq!(
                errors["horario"],
                "La hora de inicio debe ser anterior a la hora de fin"
            ),
            other => panic!("unexpected: {:?}", other),
        }
        let draft = ScheduleDraft {
            day: None,
            ..draft
        };
        match draft.validate() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors["horario"], "Por favor complete todos los campos")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn entries_sort_by_day_then_start() {
        let mut entries = vec![entry(1, 3, "08:00"), entry(2, 1, "14:00:00"), entry(3, 1, "08:00")];
        sort_entries(&mut entries);
        let ids: Vec<i64> = entries.iter().map(|e| e.id_horario).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        let html = render_list(&entries);
        assert!(html.contains("<td>Lunes</td>"));
        assert!(html.contains("<td>Miércoles</td>"));
        assert!(render_list(&[]).contains("No hay horarios registrados"));
    }

    #[test]
    fn weekly_grid_placeholders() {
        let empty = WeeklySchedule::new();
        assert!(render_weekly(&WeeklyState::Loaded(empty))
            .contains("No hay horarios registrados para este médico"));

        let mut weekly = WeeklySchedule::new();
        weekly.insert(
            2,
            vec![WeeklySlot {
                id_horario: 8,
                hora_inicio: "08:00".into(),
                hora_fin: "12:00".into(),
            }],
        );
        let html = render_weekly(&WeeklyState::Loaded(weekly));
        assert_eq!(html.matches("day-card").count(), 7);
        assert_eq!(html.matches("Sin horarios este día").count(), 6);
        assert!(html.contains("08:00 - 12:00"));
        assert!(html.contains("Domingo"));
    }
}
