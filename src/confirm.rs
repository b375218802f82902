//! Confirmación previa a acciones destructivas.
//!
//! La acción queda retenida en `Pending` hasta que el usuario confirma o cancela;
//! sólo `confirm` la entrega al llamador.

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmPrompt<A> {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub action: A,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfirmGate<A> {
    #[default]
    Idle,
    Pending(ConfirmPrompt<A>),
}

impl<A> ConfirmGate<A> {
    /// Abre el diálogo; una petición anterior sin responder se descarta
    pub fn request(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_label: impl Into<String>,
        action: A,
    ) {
        *self = ConfirmGate::Pending(ConfirmPrompt {
            title: title.into(),
            message: message.into(),
            confirm_label: confirm_label.into(),
            action,
        });
    }

    pub fn prompt(&self) -> Option<&ConfirmPrompt<A>> {
        match self {
            ConfirmGate::Pending(prompt) => Some(prompt),
            ConfirmGate::Idle => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ConfirmGate::Pending(_))
    }

    /// Devuelve la acción retenida y vuelve a `Idle`
    pub fn confirm(&mut self) -> Option<A> {
        match std::mem::take(self) {
            ConfirmGate::Pending(prompt) => Some(prompt.action),
            ConfirmGate::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = ConfirmGate::Idle;
    }
}
