//! Error handling module for the setup wizard
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Only programming errors of the surrounding driver end up here: connectivity
//! failures are absorbed by the probe and user input problems are reported as
//! page-level validation messages, never as `SetupError`.

use crate::pages::PageId;
use thiserror::Error;

/// Main error type for the setup wizard
#[derive(Error, Debug)]
pub enum SetupError {
    /// IO errors (token file, configuration directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A plan was requested before a mandatory answer was recorded
    #[error("Missing answer for page {page}: {reason}")]
    MissingAnswer { page: PageId, reason: String },

    /// Navigation left the page ordering or exceeded the skip guard
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Session state errors (record submitted for the wrong page, finishing too early)
    #[error("State error: {0}")]
    State(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, SetupError>;

// Convenient error constructors
impl SetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing answer error
    pub fn missing_answer(page: PageId, reason: impl Into<String>) -> Self {
        Self::MissingAnswer {
            page,
            reason: reason.into(),
        }
    }

    /// Create a navigation error
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::config("probe timeout must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: probe timeout must be positive"
        );

        let err = SetupError::missing_answer(PageId::GeneralConfig, "no record");
        assert_eq!(
            err.to_string(),
            "Missing answer for page setup_general_config: no record"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SetupError = io_err.into();
        assert!(matches!(err, SetupError::Io(_)));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            SetupError::navigation("ran off the end"),
            SetupError::Navigation(_)
        ));
        assert!(matches!(SetupError::state("wrong page"), SetupError::State(_)));
    }
}
