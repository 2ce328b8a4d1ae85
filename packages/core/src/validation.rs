// ABOUTME: Field-level input validation
// ABOUTME: Collects structured errors that the HTTP layer reports as a 400 list

use serde::Serialize;
use std::fmt;

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Accumulates validation errors across the fields of one request
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank string no longer than `max_len` characters
    pub fn required_text(&mut self, field: &str, value: &str, max_len: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "is required");
        } else if value.chars().count() > max_len {
            self.push(field, format!("must be at most {} characters", max_len));
        }
        self
    }

    /// Optional string; when present it must not be blank or too long
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) -> &mut Self {
        if let Some(value) = value {
            self.required_text(field, value, max_len);
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, value: Option<i64>) -> &mut Self {
        if matches!(value, Some(v) if v < 0) {
            self.push(field, "must not be negative");
        }
        self
    }

    pub fn check(&mut self, condition: bool, field: &str, message: &str) -> &mut Self {
        if !condition {
            self.push(field, message);
        }
        self
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError::new(field, message));
    }

    /// Ok when no field failed, otherwise the full list of failures
    pub fn finish(&mut self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}
