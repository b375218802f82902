//! Fragmentos HTML compartidos por las páginas.

use chrono::NaiveDate;

use crate::models::Status;

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn status_badge(status: Status) -> String {
    let class = if status.is_active() {
        "bg-success"
    } else {
        "bg-secondary"
    };
    format!(r#"<span class="badge {}">{}</span>"#, class, status.label())
}

pub fn placeholder(text: &str) -> String {
    format!(r#"<span class="text-muted">{}</span>"#, escape_html(text))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Valor escapado o el texto de reemplazo en gris
pub fn or_placeholder(value: Option<&str>, fallback: &str) -> String {
    match present(value) {
        Some(v) => escape_html(v),
        None => placeholder(fallback),
    }
}

pub fn phone_link(value: Option<&str>, fallback: &str) -> String {
    match present(value) {
        Some(v) => format!(r#"<a href="tel:{0}">{0}</a>"#, escape_html(v)),
        None => placeholder(fallback),
    }
}

pub fn email_link(value: Option<&str>, fallback: &str) -> String {
    match present(value) {
        Some(v) => format!(r#"<a href="mailto:{0}">{0}</a>"#, escape_html(v)),
        None => placeholder(fallback),
    }
}

/// Fila que ocupa toda la tabla (carga, vacío o error)
pub fn message_row(colspan: usize, class: &str, message: &str) -> String {
    format!(
        r#"<tr><td colspan="{}" class="text-center {}">{}</td></tr>"#,
        colspan,
        class,
        escape_html(message)
    )
}

pub fn loading_row(colspan: usize) -> String {
    format!(
        r#"<tr><td colspan="{}" class="text-center"><div class="spinner-border text-primary" role="status"><span class="visually-hidden">Cargando...</span></div></td></tr>"#,
        colspan
    )
}

/// `YYYY-MM-DD[...]` a `dd/mm/yyyy`
pub fn format_date_es(value: Option<&str>, fallback: &str) -> String {
    let Some(value) = present(value) else {
        return placeholder(fallback);
    };
    match value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => escape_html(value),
    }
}

/// Iniciales de las dos primeras palabras
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Opciones de un `<select>` con una opción vacía inicial
pub fn select_options<I>(placeholder_label: &str, options: I, selected: Option<&str>) -> String
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut html = format!(r#"<option value="">{}</option>"#, escape_html(placeholder_label));
    for (value, label) in options {
        let sel = if selected == Some(value.as_str()) { " selected" } else { "" };
        html.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            escape_html(&value),
            sel,
            escape_html(&label)
        ));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">O'Neil & co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#39;Neil &amp; co&lt;/a&gt;"
        );
    }

    #[test]
    fn contact_links_fall_back_to_placeholder() {
        assert_eq!(
            phone_link(Some("04125551234"), "No registrado"),
            r#"<a href="tel:04125551234">04125551234</a>"#
        );
        assert!(email_link(Some("  "), "No registrado").contains("text-muted"));
        assert!(email_link(Some("a@b.co"), "x").contains("mailto:a@b.co"));
    }

    #[test]
    fn formats_dates_day_first() {
        assert_eq!(format_date_es(Some("1990-03-07"), "No registrada"), "07/03/1990");
        assert_eq!(
            format_date_es(Some("2024-11-02 10:15:00"), "No registrada"),
            "02/11/2024"
        );
        assert!(format_date_es(None, "No registrada").contains("No registrada"));
    }

    #[test]
    fn initials_use_first_two_words() {
        assert_eq!(initials("maría josé pérez"), "MJ");
        assert_eq!(initials("Ana"), "A");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn status_badges() {
        assert!(status_badge(Status::Active).contains("bg-success"));
        assert!(status_badge(Status::Inactive).contains("Inactivo"));
    }

    #[test]
    fn select_marks_selected_option() {
        let html = select_options(
            "Seleccione",
            vec![("1".to_string(), "Uno".to_string()), ("2".to_string(), "Dos".to_string())],
            Some("2"),
        );
        assert!(html.contains(r#"<option value="2" selected>Dos</option>"#));
        assert!(html.starts_with(r#"<option value="">Seleccione</option>"#));
    }
}
