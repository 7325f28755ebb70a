//! Error types and handling for Solarlog
//!
//! This module defines the error taxonomy shared by the portal client, the
//! normalizers, the database writer and the scheduler loop. The scheduler
//! uses [`SolarlogError::is_fatal`] and [`SolarlogError::is_session_expired`]
//! to decide between a state transition and process termination.

use thiserror::Error;

/// Result type alias for Solarlog operations
pub type Result<T> = std::result::Result<T, SolarlogError>;

/// Main error type for Solarlog
#[derive(Debug, Error)]
pub enum SolarlogError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Bad credentials or an unrecoverable login failure
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// The portal no longer accepts the current session
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    /// Network, timeout or server-side failures; retried on the next cycle
    #[error("Transient error: {message}")]
    Transient { message: String },

    /// Portal payload did not have the expected shape
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Local database failures
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl SolarlogError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SolarlogError::Config {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        SolarlogError::Auth {
            message: message.into(),
        }
    }

    /// Create a new session-expired error
    pub fn session_expired<S: Into<String>>(message: S) -> Self {
        SolarlogError::SessionExpired {
            message: message.into(),
        }
    }

    /// Create a new transient error
    pub fn transient<S: Into<String>>(message: S) -> Self {
        SolarlogError::Transient {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        SolarlogError::Parse {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        SolarlogError::Storage {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SolarlogError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SolarlogError::Io {
            message: message.into(),
        }
    }

    /// Only authentication failures end the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, SolarlogError::Auth { .. })
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, SolarlogError::SessionExpired { .. })
    }

    /// Short machine-friendly label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            SolarlogError::Config { .. } => "config",
            SolarlogError::Auth { .. } => "auth",
            SolarlogError::SessionExpired { .. } => "session_expired",
            SolarlogError::Transient { .. } => "transient",
            SolarlogError::Parse { .. } => "parse",
            SolarlogError::Storage { .. } => "storage",
            SolarlogError::Serialization { .. } => "serialization",
            SolarlogError::Io { .. } => "io",
            SolarlogError::Validation { .. } => "validation",
        }
    }

    /// Process exit code for an error that terminated the program
    pub fn exit_code(&self) -> u8 {
        match self {
            SolarlogError::Auth { .. } | SolarlogError::SessionExpired { .. } => 2,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for SolarlogError {
    fn from(err: std::io::Error) -> Self {
        SolarlogError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SolarlogError {
    fn from(err: serde_yaml::Error) -> Self {
        SolarlogError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SolarlogError {
    fn from(err: serde_json::Error) -> Self {
        SolarlogError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SolarlogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SolarlogError::transient(format!("request timed out: {}", err))
        } else {
            SolarlogError::transient(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for SolarlogError {
    fn from(err: rusqlite::Error) -> Self {
        SolarlogError::storage(err.to_string())
    }
}

impl From<chrono::ParseError> for SolarlogError {
    fn from(err: chrono::ParseError) -> Self {
        SolarlogError::validation("datetime", &err.to_string())
    }
}
