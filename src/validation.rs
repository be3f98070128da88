//! Rule helpers the per-type validators are built from.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::{error::FieldError, repository::Document};

/// Whether a payload is a full record or a partial patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Rules
///
/// Accumulates field errors over one payload. On create, required fields must be
/// present; on update only the fields present in the patch are checked.
pub struct Rules<'a> {
    doc: &'a Document,
    mode: ValidationMode,
    errors: Vec<FieldError>,
}

impl<'a> Rules<'a> {
    pub fn new(doc: &'a Document, mode: ValidationMode) -> Self {
        Self {
            doc,
            mode,
            errors: Vec::new(),
        }
    }

    /// Value to check, with explicit `null` on an optional field treated as absent.
    fn value(&self, field: &str) -> Option<&'a Value> {
        self.doc.get(field).filter(|v| !v.is_null())
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Required fields must be present on create and non-null whenever present.
    fn required_value(&mut self, field: &str) -> Option<&'a Value> {
        match self.doc.get(field) {
            Some(Value::Null) => {
                self.fail(field, "must not be null");
                None
            }
            Some(value) => Some(value),
            None => {
                if self.mode == ValidationMode::Create {
                    self.fail(field, "is required");
                }
                None
            }
        }
    }

    fn check_text(&mut self, field: &str, value: &Value, max_len: usize, required: bool) {
        match value.as_str() {
            None => self.fail(field, "must be a string"),
            Some(text) if required && text.trim().is_empty() => {
                self.fail(field, "must not be empty")
            }
            Some(text) if text.chars().count() > max_len => {
                self.fail(field, format!("must be at most {max_len} characters"))
            }
            Some(_) => {}
        }
    }

    pub fn required_text(mut self, field: &str, max_len: usize) -> Self {
        if let Some(value) = self.required_value(field) {
            self.check_text(field, value, max_len, true);
        }
        self
    }

    pub fn optional_text(mut self, field: &str, max_len: usize) -> Self {
        if let Some(value) = self.value(field) {
            self.check_text(field, value, max_len, false);
        }
        self
    }

    /// URL slug: lowercase ASCII letters, digits and single hyphens.
    pub fn slug(mut self, field: &str) -> Self {
        if let Some(value) = self.required_value(field) {
            match value.as_str() {
                Some(slug) if is_slug(slug) => {}
                Some(_) => self.fail(
                    field,
                    "must contain only lowercase letters, digits and hyphens",
                ),
                None => self.fail(field, "must be a string"),
            }
        }
        self
    }

    pub fn one_of(mut self, field: &str, allowed: &[&str]) -> Self {
        if let Some(value) = self.value(field) {
            match value.as_str() {
                Some(choice) if allowed.contains(&choice) => {}
                _ => self.fail(field, format!("must be one of: {}", allowed.join(", "))),
            }
        }
        self
    }

    pub fn text_list(mut self, field: &str) -> Self {
        if let Some(value) = self.value(field) {
            let valid = value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string));
            if !valid {
                self.fail(field, "must be a list of strings");
            }
        }
        self
    }

    pub fn boolean(mut self, field: &str) -> Self {
        if let Some(value) = self.value(field) {
            if !value.is_boolean() {
                self.fail(field, "must be true or false");
            }
        }
        self
    }

    pub fn integer_between(mut self, field: &str, min: i64, max: i64) -> Self {
        if let Some(value) = self.value(field) {
            match value.as_i64() {
                Some(n) if (min..=max).contains(&n) => {}
                Some(_) => self.fail(field, format!("must be between {min} and {max}")),
                None => self.fail(field, "must be an integer"),
            }
        }
        self
    }

    pub fn non_negative_number(mut self, field: &str) -> Self {
        if let Some(value) = self.value(field) {
            match value.as_f64() {
                Some(n) if n >= 0.0 => {}
                Some(_) => self.fail(field, "must not be negative"),
                None => self.fail(field, "must be a number"),
            }
        }
        self
    }

    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
    pub fn date(mut self, field: &str) -> Self {
        if let Some(value) = self.value(field) {
            if !value.as_str().is_some_and(is_date) {
                self.fail(field, "must be an RFC 3339 timestamp or YYYY-MM-DD date");
            }
        }
        self
    }

    pub fn finish(self) -> Vec<FieldError> {
        self.errors
    }
}

pub fn is_slug(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= 128
        && !candidate.starts_with('-')
        && !candidate.ends_with('-')
        && !candidate.contains("--")
        && candidate
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub fn is_date(candidate: &str) -> bool {
    parse_day_bounds(candidate).is_some()
}

/// The instant range a date value covers: a single point for an RFC 3339
/// timestamp, the whole UTC day for `YYYY-MM-DD`.
pub fn parse_day_bounds(candidate: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let candidate = candidate.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(candidate) {
        let instant = instant.with_timezone(&Utc);
        return Some((instant, instant));
    }
    let day = NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok()?;
    let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)?;
    Some((
        day.and_time(NaiveTime::MIN).and_utc(),
        day.and_time(end_of_day).and_utc(),
    ))
}

/// Fixed-width UTC form (`2024-03-01T08:00:00.000000Z`) shared by stored
/// timestamps and date filters, so string order is time order.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Canonical stored form of a date value; a plain day becomes its UTC midnight.
pub fn normalize_date(candidate: &str) -> Option<String> {
    parse_day_bounds(candidate).map(|(start, _)| format_instant(start))
}
