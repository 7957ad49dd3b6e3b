// Field-level validation shared by the serializers of every resource.
//
// Errors are collected per field so a single response reports every
// problem in the payload, keyed the way clients submitted them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const REQUIRED: &str = "Este campo é obrigatório.";
pub const BLANK: &str = "Este campo não pode estar em branco.";

/// Brazilian landline or mobile number, masked or bare:
/// `(11)99999-9999`, `(11) 3333-4444`, `11987654321`
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\d{2}\)?\s?9?\d{4}-?\d{4}$").expect("phone pattern compiles")
});

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Key for errors that involve more than one field
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Record the outcome of a single-field check
    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Run `check` on a value that must be present, recording
    /// `REQUIRED` when it is missing
    pub fn require<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        check: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        match value {
            Some(value) => self.optional(field, Some(value), check),
            None => {
                self.add(field, REQUIRED);
                None
            }
        }
    }

    /// Run `check` only when the value was submitted
    pub fn optional<T>(
        &mut self,
        field: &str,
        value: Option<&str>,
        check: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        match check(value?) {
            Ok(cleaned) => Some(cleaned),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`)
/// in partial updates. Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trimmed value that must not be blank and must fit `max_len` characters
pub fn non_blank(value: &str, max_len: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BLANK.to_string());
    }
    max_length(trimmed, max_len)?;
    Ok(trimmed.to_string())
}

pub fn max_length(value: &str, max_len: usize) -> Result<(), String> {
    if value.chars().count() > max_len {
        return Err(format!(
            "Certifique-se de que este campo não tenha mais de {} caracteres.",
            max_len
        ));
    }
    Ok(())
}

pub fn phone(value: &str) -> Result<String, String> {
    let trimmed = non_blank(value, 20)?;
    if !PHONE_PATTERN.is_match(&trimmed) {
        return Err("Telefone inválido. Use o formato (XX)XXXXX-XXXX.".to_string());
    }
    Ok(trimmed)
}

pub fn email(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BLANK.to_string());
    }
    max_length(trimmed, 254)?;

    let invalid = || "Insira um endereço de email válido.".to_string();
    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || trimmed.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

pub fn username(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BLANK.to_string());
    }
    max_length(trimmed, 150)?;
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(
            "Informe um nome de usuário válido. Este valor pode conter apenas letras, números e os caracteres @/./+/-/_."
                .to_string(),
        );
    }
    Ok(trimmed.to_string())
}
