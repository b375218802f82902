//! Utilidades comunes a los formularios modales.

use std::fmt::Display;

use reqwest::Method;

use crate::error::FieldErrors;

/// Destino de un envío: crear (POST a la colección) o actualizar (PUT al recurso)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormTarget {
    Create { path: String },
    Update { path: String },
}

impl FormTarget {
    /// La presencia del id decide entre crear y actualizar
    pub fn for_record<I: Display>(collection: &str, id: Option<I>) -> Self {
        match id {
            Some(id) => FormTarget::Update {
                path: format!("{}/{}", collection, id),
            },
            None => FormTarget::Create {
                path: collection.to_string(),
            },
        }
    }

    pub fn method(&self) -> Method {
        match self {
            FormTarget::Create { .. } => Method::POST,
            FormTarget::Update { .. } => Method::PUT,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FormTarget::Create { path } | FormTarget::Update { path } => path,
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, FormTarget::Update { .. })
    }
}

/// Botón de envío con estado ocupado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    idle_label: &'static str,
    busy_label: &'static str,
    busy: bool,
}

impl SubmitButton {
    pub fn new(idle_label: &'static str, busy_label: &'static str) -> Self {
        Self {
            idle_label,
            busy_label,
            busy: false,
        }
    }

    pub fn begin(&mut self) {
        self.busy = true;
    }

    pub fn finish(&mut self) {
        self.busy = false;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn label(&self) -> &'static str {
        if self.busy {
            self.busy_label
        } else {
            self.idle_label
        }
    }

    pub fn render(&self) -> String {
        if self.busy {
            format!(
                r#"<button type="submit" class="btn btn-primary" disabled><span class="spinner-border spinner-border-sm me-2"></span>{}</button>"#,
                self.busy_label
            )
        } else {
            format!(
                r#"<button type="submit" class="btn btn-primary">{}</button>"#,
                self.idle_label
            )
        }
    }
}

/// Campo opcional: vacío se envía como `null`
pub fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Formulario modal abierto sobre una página
#[derive(Debug, Clone, PartialEq)]
pub struct ModalForm<F> {
    pub title: String,
    pub fields: F,
    pub submit: SubmitButton,
    /// Errores en línea por campo
    pub errors: FieldErrors,
}

impl<F> ModalForm<F> {
    pub fn new(title: impl Into<String>, fields: F, submit: SubmitButton) -> Self {
        Self {
            title: title.into(),
            fields,
            submit,
            errors: FieldErrors::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_presence_selects_method_and_path() {
        let create = FormTarget::for_record::<i64>("/api/medicos", None);
        assert_eq!(create.method(), Method::POST);
        assert_eq!(create.path(), "/api/medicos");

        let update = FormTarget::for_record("/api/medicos", Some(7));
        assert_eq!(update.method(), Method::PUT);
        assert_eq!(update.path(), "/api/medicos/7");
        assert!(update.is_update());
    }

    #[test]
    fn submit_button_restores_label() {
        let mut button = SubmitButton::new("Guardar", "Guardando...");
        button.begin();
        assert!(button.is_busy());
        assert_eq!(button.label(), "Guardando...");
        assert!(button.render().contains("disabled"));
        button.finish();
        assert_eq!(button.label(), "Guardar");
    }

    #[test]
    fn empty_optional_is_none() {
        assert_eq!(optional("   "), None);
        assert_eq!(optional(" 0412 "), Some("0412".to_string()));
    }
}
