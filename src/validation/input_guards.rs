//! Field-level guards for request bodies.
//!
//! Each guard inspects one JSON value and reports problems into a
//! [`ValidationErrors`] accumulator instead of returning early, so a single
//! response can list every violated constraint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Pattern a repository URL must match. Scheme is optional, a dotted host is
/// required, and path/query/fragment characters may follow.
pub const URL_PATTERN: &str = r"^(?:https?://)?[A-Za-z0-9_.\-]+(?:\.[A-Za-z0-9_.\-]+)+[A-Za-z0-9_\-.\~:/?\#\[\]@!$\&'()*+,;=]+$";

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(URL_PATTERN).expect("URL_PATTERN is a valid regex"));

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Violation {
    /// Dotted path of the offending value (`techs.1` for an array item).
    key: String,
    message: String,
}

/// Every constraint a request body violated, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            key: key.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Keys of the violated fields, without duplicates.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(self.violations.len());
        for violation in &self.violations {
            if !keys.contains(&violation.key.as_str()) {
                keys.push(&violation.key);
            }
        }
        keys
    }

    /// Converts the accumulator into a result, failing when anything was recorded.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self
            .violations
            .iter()
            .map(|violation| violation.message.as_str())
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join(". "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn is_valid_url(value: &str) -> bool {
    URL_REGEX.is_match(value)
}

/// Rejects anything that is not a JSON string, and the empty string.
pub fn check_text(errors: &mut ValidationErrors, key: &str, label: &str, value: &Value) -> bool {
    match value {
        Value::String(text) if text.is_empty() => {
            errors.push(key, format!("\"{label}\" is not allowed to be empty"));
            false
        }
        Value::String(_) => true,
        _ => {
            errors.push(key, format!("\"{label}\" must be a string"));
            false
        }
    }
}

pub fn check_url(errors: &mut ValidationErrors, key: &str, value: &Value) {
    if !check_text(errors, key, key, value) {
        return;
    }
    if let Some(text) = value.as_str() {
        if !is_valid_url(text) {
            errors.push(
                key,
                format!("\"{key}\" with value \"{text}\" fails to match the required pattern"),
            );
        }
    }
}

/// Checks an array of strings, reporting each bad item under `key.<index>`.
pub fn check_text_list(errors: &mut ValidationErrors, key: &str, value: &Value) {
    let Some(items) = value.as_array() else {
        errors.push(key, format!("\"{key}\" must be an array"));
        return;
    };
    for (index, item) in items.iter().enumerate() {
        check_text(
            errors,
            &format!("{key}.{index}"),
            &format!("{key}[{index}]"),
            item,
        );
    }
}

/// Largest integer a double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Accepts JSON numbers and strings that parse as a finite number, within
/// `±MAX_SAFE_INTEGER`.
pub fn check_number(errors: &mut ValidationErrors, key: &str, value: &Value) {
    match as_number(value) {
        None => errors.push(key, format!("\"{key}\" must be a number")),
        Some(number) if number.abs() > MAX_SAFE_INTEGER => {
            errors.push(key, format!("\"{key}\" must be a safe number"));
        }
        Some(_) => {}
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
