use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Estado de un registro: `A` activo, cualquier otro valor inactivo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn code(self) -> &'static str {
        match self {
            Status::Active => "A",
            Status::Inactive => "I",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Status::Active => Status::Inactive,
            Status::Inactive => Status::Active,
        }
    }

    pub fn is_active(self) -> bool {
        self == Status::Active
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Active => "Activo",
            Status::Inactive => "Inactivo",
        }
    }
}

impl From<String> for Status {
    fn from(code: String) -> Self {
        if code.trim() == "A" {
            Status::Active
        } else {
            Status::Inactive
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.code().to_string()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Active
    }
}

/// Médico (`/api/medicos`, `/api/medicos/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id_medico: i64,
    pub nombre_completo: String,
    pub especialidad: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub estado: Status,
}

/// Médico activo para el selector de citas (`/api/medicos/disponibles`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AvailableDoctor {
    pub id_medico: i64,
    pub nombre_completo: String,
    pub especialidad: Option<String>,
    pub dias_laborales: Option<String>,
    pub horario_laboral: Option<String>,
}

/// Opción mínima de paciente (`/api/pacientes`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatientOption {
    pub id_paciente: i64,
    pub nombre_completo: String,
}

/// Paciente con todos sus datos (`/api/pacientes/detallados`, `/api/pacientes/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id_paciente: i64,
    pub nombre_completo: String,
    pub cedula: Option<String>,
    pub fecha_nacimiento: Option<String>, // YYYY-MM-DD
    pub genero: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub direccion: Option<String>,
    pub estado: Status,
    pub tipo_sangre: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_creacion: Option<String>, // YYYY-MM-DD HH:MM:SS
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PatientStats {
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub new_this_month: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CedulaCheck {
    pub exists: bool,
}

/// Cuenta de usuario (`/api/users/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id_usuario: i64,
    pub nombre_completo: String,
    pub usuario_login: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub gmail: Option<String>,
    pub id_rol: u32,
    pub activo: bool,
}

/// Página de usuarios (`/api/users?page=..`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Role {
    pub id_rol: u32,
    pub nombre_rol: String,
}

/// Día de la semana tal como llega: número o nombre
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DayValue {
    Number(u8),
    Name(String),
}

pub const DAY_NAMES: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

/// Nombre del día (1 = Lunes .. 7 = Domingo)
pub fn day_name(day: u8) -> &'static str {
    match day {
        1..=7 => DAY_NAMES[(day - 1) as usize],
        _ => "Desconocido",
    }
}

fn day_number_from_name(name: &str) -> Option<u8> {
    DAY_NAMES
        .iter()
        .position(|d| d.eq_ignore_ascii_case(name.trim()))
        .map(|i| i as u8 + 1)
}

/// Horario de un médico (`/api/horarios/{doctorId}`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleEntry {
    pub id_horario: i64,
    pub id_medico: Option<i64>,
    pub dia_semana: Option<DayValue>,
    pub dia_semana_num: Option<u8>,
    pub hora_inicio: String,
    pub hora_fin: String,
}

impl ScheduleEntry {
    pub fn day_number(&self) -> Option<u8> {
        if let Some(n) = self.dia_semana_num {
            return Some(n);
        }
        match &self.dia_semana {
            Some(DayValue::Number(n)) => Some(*n),
            Some(DayValue::Name(name)) => name
                .trim()
                .parse::<u8>()
                .ok()
                .or_else(|| day_number_from_name(name)),
            None => None,
        }
    }
}

/// Bloque dentro de la vista semanal
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeeklySlot {
    pub id_horario: i64,
    pub hora_inicio: String,
    pub hora_fin: String,
}

/// Vista semanal (`/api/horarios/{doctorId}/semanal`), claves "1".."7"
pub type WeeklySchedule = BTreeMap<u8, Vec<WeeklySlot>>;

/// Respuesta de `/api/horarios/{doctorId}/slots`: lista directa o envuelta
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SlotPreview {
    Wrapped { slots_disponibles: Vec<SlotItem> },
    List(Vec<SlotItem>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SlotItem {
    Time(String),
    Object { hora: String },
}

impl SlotItem {
    pub fn time(&self) -> &str {
        match self {
            SlotItem::Time(t) => t,
            SlotItem::Object { hora } => hora,
        }
    }
}

impl SlotPreview {
    pub fn times(&self) -> Vec<String> {
        let items = match self {
            SlotPreview::Wrapped { slots_disponibles } => slots_disponibles,
            SlotPreview::List(items) => items,
        };
        items.iter().map(|s| s.time().to_string()).collect()
    }
}

/// Acepta `HH:MM` y `HH:MM:SS`
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Respuesta de `POST /api/citas`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppointmentCreated {
    pub message: Option<String>,
    pub cita_id: serde_json::Value,
}

impl AppointmentCreated {
    pub fn cita_id_display(&self) -> String {
        match &self.cita_id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
                _ => n.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Respuesta genérica de mutaciones y formularios de autenticación
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiMessage {
    pub message: Option<String>,
    pub redirect: Option<String>,
}

/// Datos de la sesión actual (`/api/user-data`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionUser {
    pub nombre: Option<String>,
    pub rol: Option<String>,
}

/// Estadísticas del panel (`/api/admin/stats`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub doctors: u64,
    #[serde(default)]
    pub patients: u64,
    #[serde(default)]
    pub appointments: u64,
    #[serde(default)]
    pub users: u64,
}

/// Registro de actividad reciente (`/api/admin/recent-activity`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivityItem {
    pub id: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub date: String,
    pub status: Option<String>,
}

impl fmt::Display for Doctor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.especialidad {
            Some(esp) => write!(f, "{} - {}", self.nombre_completo, esp),
            None => f.write_str(&self.nombre_completo),
        }
    }
}
