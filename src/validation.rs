//! Reglas de validación de formularios.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::parse_time;

static NATIONAL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{7,12}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static UPPERCASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").unwrap());
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());
static SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());

pub const MIN_PASSWORD_LEN: usize = 8;

/// Cédula: exactamente 8 dígitos
pub fn is_national_id(value: &str) -> bool {
    NATIONAL_ID.is_match(value)
}

/// Teléfono: entre 7 y 12 dígitos
pub fn is_phone(value: &str) -> bool {
    PHONE.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Deja sólo dígitos, truncando a `max`
pub fn digits_only(value: &str, max: usize) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).take(max).collect()
}

/// `true` si `start` es estrictamente anterior a `end`
pub fn time_range_is_valid(start: &str, end: &str) -> bool {
    match (parse_time(start), parse_time(end)) {
        (Some(s), Some(e)) => s < e,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthLevel {
    Weak,
    Medium,
    Strong,
}

/// Indicador de fortaleza de contraseña
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordStrength {
    pub length: bool,
    pub uppercase: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordStrength {
    pub fn evaluate(password: &str) -> Self {
        Self {
            length: password.chars().count() >= MIN_PASSWORD_LEN,
            uppercase: UPPERCASE.is_match(password),
            digit: DIGIT.is_match(password),
            special: SPECIAL.is_match(password),
        }
    }

    pub fn score(&self) -> u8 {
        [self.length, self.uppercase, self.digit, self.special]
            .iter()
            .filter(|c| **c)
            .count() as u8
    }

    /// 0..=100 en pasos de 25
    pub fn percent(&self) -> u8 {
        self.score() * 25
    }

    pub fn level(&self) -> StrengthLevel {
        match self.score() {
            0 | 1 => StrengthLevel::Weak,
            2 | 3 => StrengthLevel::Medium,
            _ => StrengthLevel::Strong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.level() {
            StrengthLevel::Weak => "Débil",
            StrengthLevel::Medium => "Media",
            StrengthLevel::Strong => "Fuerte",
        }
    }

    /// Clase de la barra: rojo < 50, amarillo < 75, verde
    pub fn bar_class(&self) -> &'static str {
        match self.percent() {
            p if p < 50 => "bg-danger",
            p if p < 75 => "bg-warning",
            _ => "bg-success",
        }
    }
}

/// Acumula errores por campo; el primero de cada campo gana
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &'static str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors
                .entry(field)
                .or_insert_with(|| message.to_string());
        }
        self
    }

    pub fn required(&mut self, field: &'static str, value: &str, message: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), message)
    }

    /// Sólo valida el formato si hay valor
    pub fn optional_format(
        &mut self,
        field: &'static str,
        value: &str,
        valid: fn(&str) -> bool,
        message: &str,
    ) -> &mut Self {
        let value = value.trim();
        self.check(field, value.is_empty() || valid(value), message)
    }

    pub fn max_len(&mut self, field: &'static str, value: &str, max: usize, message: &str) -> &mut Self {
        self.check(field, value.chars().count() <= max, message)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(&mut self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_id_and_phone_formats() {
        assert!(is_national_id("12345678"));
        assert!(!is_national_id("1234567"));
        assert!(!is_national_id("1234567a"));
        assert!(is_phone("0412555"));
        assert!(is_phone("041255512345"));
        assert!(!is_phone("041255"));
        assert!(!is_phone("0412555123456"));
    }

    #[test]
    fn email_format() {
        assert!(is_email("ana@clinica.com"));
        assert!(!is_email("ana@clinica"));
        assert!(!is_email("ana clinica@x.com"));
    }

    #[test]
    fn digits_only_truncates() {
        assert_eq!(digits_only("12.345.678-9", 8), "12345678");
        assert_eq!(digits_only("(0412) 555", 12), "0412555");
    }

    #[test]
    fn time_range_requires_start_before_end() {
        assert!(time_range_is_valid("08:00", "12:00"));
        assert!(!time_range_is_valid("12:00", "12:00"));
        assert!(!time_range_is_valid("14:00", "12:00:00"));
        assert!(!time_range_is_valid("", "12:00"));
    }

    #[test]
    fn password_strength_levels() {
        let weak = PasswordStrength::evaluate("abc");
        assert_eq!(weak.level(), StrengthLevel::Weak);
        assert_eq!(weak.bar_class(), "bg-danger");

        let medium = PasswordStrength::evaluate("abcdefgh1");
        assert_eq!(medium.score(), 2);
        assert_eq!(medium.level(), StrengthLevel::Medium);
        assert_eq!(medium.bar_class(), "bg-warning");

        let strong = PasswordStrength::evaluate("Abcdefg1!");
        assert_eq!(strong.percent(), 100);
        assert_eq!(strong.level(), StrengthLevel::Strong);
        assert_eq!(strong.bar_class(), "bg-success");
    }

    #[test]
    fn validator_keeps_first_error_per_field() {
        let mut v = Validator::new();
        v.required("cedula", "", "Requerido")
            .optional_format("cedula", "12", is_national_id, "Formato")
            .optional_format("telefono", "", is_phone, "Teléfono");
        match v.finish() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors["cedula"], "Requerido");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
