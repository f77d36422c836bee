//! Error types for manifest loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Discovery errors
    #[error("flux.yaml not found in {} or any parent directory", .0.display())]
    NotFound(PathBuf),

    // Parsing errors
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    // Validation errors
    #[error("missing required field '{field}'{}", hint_suffix(.hint))]
    MissingField { field: String, hint: Option<String> },

    #[error("invalid value for '{field}': {value}{}", hint_suffix(.hint))]
    InvalidValue {
        field: String,
        value: String,
        hint: Option<String>,
    },
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" (hint: {hint})"),
        None => String::new(),
    }
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: impl ToString, hint: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            hint: Some(hint.into()),
        }
    }
}
