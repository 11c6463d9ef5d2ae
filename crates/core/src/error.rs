//! Error types for e
//! 
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for e
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Index {index} out of range for sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("No free timer ids left")]
    TimerIdsExhausted,

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for e operations
pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EditorError::OutOfRange { .. } | EditorError::TimerIdsExhausted
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            EditorError::Io(e) => format!("File operation failed: {}", e),
            EditorError::Config(msg) => format!("Configuration error: {}", msg),
            EditorError::OutOfRange { index, len } => {
                format!("Line {} does not exist (buffer has {} lines)", index, len)
            }
            EditorError::Terminal(msg) => format!("Terminal unavailable: {}", msg),
            _ => self.to_string(),
        }
    }
}

/// Failure raised by a script callback.
///
/// These never abort the reactor; they are logged against the timer or
/// event that triggered the callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
