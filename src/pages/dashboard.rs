//! Panel de administración.

use crate::models::{ActivityItem, AdminStats};
use crate::notify::Notifier;
use crate::pages::{load_session_header, PageContext, Redirect, SessionHeader};
use crate::render::{escape_html, format_date_es, message_row};

const ACTIVITY_COLUMNS: usize = 4;

/// Accesos rápidos del panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Patients,
    NewAppointment,
    NewUser,
}

impl QuickAction {
    pub fn location(self) -> &'static str {
        match self {
            QuickAction::Patients => "/pacientes",
            QuickAction::NewAppointment => "/nueva_cita",
            QuickAction::NewUser => "/nuevo_usuario",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub header: String,
    pub stats: String,
    pub activity: String,
    pub alerts: String,
}

pub struct DashboardPage {
    ctx: PageContext,
    header: SessionHeader,
    stats: Option<AdminStats>,
    activity: Vec<ActivityItem>,
    activity_error: Option<String>,
    pub notifier: Notifier,
}

impl DashboardPage {
    pub fn new(ctx: PageContext) -> Self {
        let notifier = ctx.notifier();
        Self {
            ctx,
            header: SessionHeader::default(),
            stats: None,
            activity: Vec::new(),
            activity_error: None,
            notifier,
        }
    }

    pub async fn init(&mut self) {
        self.header = load_session_header(&self.ctx.api).await;
        self.load_stats().await;
        self.load_activity().await;
    }

    pub async fn load_stats(&mut self) {
        match self.ctx.api.get::<AdminStats>("/api/admin/stats").await {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => {
                log::error!("Error loading dashboard stats: {}", e);
                self.notifier
                    .error(e.user_message("Error al cargar las estadísticas"));
            }
        }
    }

    pub async fn load_activity(&mut self) {
        match self
            .ctx
            .api
            .get::<Vec<ActivityItem>>("/api/admin/recent-activity")
            .await
        {
            Ok(items) => {
                self.activity = items;
                self.activity_error = None;
            }
            Err(e) => {
                log::error!("Error loading recent activity: {}", e);
                self.activity_error = Some(e.user_message("Error al cargar la actividad reciente"));
            }
        }
    }

    pub fn stats(&self) -> Option<&AdminStats> {
        self.stats.as_ref()
    }

    pub fn quick_action(&self, action: QuickAction) -> Redirect {
        Redirect::now(action.location())
    }

    pub fn view(&self) -> DashboardView {
        let activity = match &self.activity_error {
            Some(error) => message_row(ACTIVITY_COLUMNS, "text-danger", error),
            None => render_activity(&self.activity),
        };
        DashboardView {
            header: self.header.render(),
            stats: render_stats(&self.stats.clone().unwrap_or_default()),
            activity,
            alerts: self.notifier.render(),
        }
    }
}

pub fn render_stats(stats: &AdminStats) -> String {
    [
        ("Médicos", stats.doctors, "fa-user-md", "/medicos"),
        ("Pacientes", stats.patients, "fa-users", "/pacientes"),
        ("Citas Hoy", stats.appointments, "fa-calendar-check", "/citas"),
        ("Usuarios", stats.users, "fa-user-shield", "/users"),
    ]
    .iter()
    .map(|(title, count, icon, href)| {
        format!(
            r#"<div class="col-md-3"><div class="card stat-card"><div class="card-body"><i class="fas {}"></i><h5>{}</h5><h2>{}</h2><a href="{}" class="small">Ver detalles</a></div></div></div>"#,
            icon, title, count, href
        )
    })
    .collect()
}

fn activity_badge(status: Option<&str>) -> &'static str {
    if status == Some("completed") {
        r#"<span class="badge bg-success">Completado</span>"#
    } else {
        r#"<span class="badge bg-warning">Pendiente</span>"#
    }
}

pub fn render_activity(items: &[ActivityItem]) -> String {
    if items.is_empty() {
        return message_row(ACTIVITY_COLUMNS, "text-muted", "No hay actividad reciente");
    }
    items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&item.kind),
                escape_html(&item.name),
                format_date_es(Some(&item.date), &item.date),
                activity_badge(item.status.as_deref())
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(status: Option<&str>) -> ActivityItem {
        serde_json::from_value(json!({
            "id": 3,
            "type": "Cita",
            "name": "Ana <Pérez>",
            "date": "2024-03-05",
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn stat_cards_link_to_sections() {
        let html = render_stats(&AdminStats {
            doctors: 4,
            patients: 120,
            appointments: 7,
            users: 3,
        });
        for label in ["Médicos", "Pacientes", "Citas Hoy", "Usuarios"] {
            assert!(html.contains(label));
        }
        assert!(html.contains(r#"href="/citas""#));
        assert!(html.contains("<h2>120</h2>"));
    }

    #[test]
    fn activity_badges_and_escaping() {
        let html = render_activity(&[item(Some("completed")), item(None)]);
        assert!(html.contains("Completado"));
        assert!(html.contains("Pendiente"));
        assert!(html.contains("Ana &lt;Pérez&gt;"));
        assert!(html.contains("05/03/2024"));
        assert!(render_activity(&[]).contains("No hay actividad reciente"));
    }

    #[test]
    fn quick_actions_map_to_routes() {
        assert_eq!(QuickAction::Patients.location(), "/pacientes");
        assert_eq!(QuickAction::NewAppointment.location(), "/nueva_cita");
        assert_eq!(QuickAction::NewUser.location(), "/nuevo_usuario");
    }
}
