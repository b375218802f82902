//! Avisos al usuario: transitorios con vencimiento y modales bloqueantes.

use std::time::{Duration, Instant};

use crate::render::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Danger,
    Warning,
    Info,
}

impl NoticeKind {
    pub fn css(self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Danger => "danger",
            NoticeKind::Warning => "warning",
            NoticeKind::Info => "info",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            NoticeKind::Success => "bi-check-circle",
            NoticeKind::Danger => "bi-exclamation-triangle",
            NoticeKind::Warning => "bi-exclamation-circle",
            NoticeKind::Info => "bi-info-circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Mensaje modal que exige confirmación del usuario
#[derive(Debug, Clone, PartialEq)]
pub struct ModalMessage {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    next_id: u64,
    notices: Vec<Notice>,
    modal: Option<ModalMessage>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            notices: Vec::new(),
            modal: None,
        }
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let message = message.into();
        match kind {
            NoticeKind::Danger => log::error!("{}", message),
            NoticeKind::Warning => log::warn!("{}", message),
            _ => log::info!("{}", message),
        }
        let id = self.next_id;
        self.next_id += 1;
        self.notices.push(Notice {
            id,
            kind,
            message,
            expires_at: Instant::now() + self.ttl,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Danger, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Info, message)
    }

    pub fn dismiss(&mut self, id: u64) {
        self.notices.retain(|n| n.id != id);
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }

    /// Elimina los avisos vencidos a `now`
    pub fn prune_at(&mut self, now: Instant) {
        self.notices.retain(|n| n.expires_at > now);
    }

    pub fn prune(&mut self) {
        self.prune_at(Instant::now());
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn show_modal(&mut self, kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) {
        let modal = ModalMessage {
            kind,
            title: title.into(),
            message: message.into(),
        };
        if kind == NoticeKind::Danger {
            log::error!("{}: {}", modal.title, modal.message);
        }
        self.modal = Some(modal);
    }

    pub fn modal(&self) -> Option<&ModalMessage> {
        self.modal.as_ref()
    }

    pub fn dismiss_modal(&mut self) -> Option<ModalMessage> {
        self.modal.take()
    }

    pub fn render(&self) -> String {
        self.notices
            .iter()
            .map(|n| {
                format!(
                    r#"<div class="alert alert-{kind} alert-dismissible fade show" role="alert" data-notice="{id}">
    <i class="bi {icon} me-2"></i>{message}
    <button type="button" class="btn-close" data-bs-dismiss="alert"></button>
</div>"#,
                    kind = n.kind.css(),
                    id = n.id,
                    icon = n.kind.icon(),
                    message = escape_html(&n.message),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
