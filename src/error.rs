//! Error types for slotkit
//!
//! Rendering itself never fails: malformed templates and odd page data
//! degrade to literal text or empty strings. These errors cover the edges
//! that touch the outside world (files, config, input bundles) and the
//! template checker.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error in {file} at line {line}: {message}")]
    Template { file: String, line: usize, message: String },

    #[error("Context error: {message}")]
    Context { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, SlotError>;

impl SlotError {
    pub fn template(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Template {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = SlotError::template("header.hbs", 3, "unmatched {{/if}}");
        assert_eq!(
            err.to_string(),
            "Template error in header.hbs at line 3: unmatched {{/if}}"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: SlotError = parse.unwrap_err().into();
        assert!(matches!(err, SlotError::Json(_)));
    }
}
