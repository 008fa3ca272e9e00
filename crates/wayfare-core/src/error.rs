//! Error types for Wayfare.
//!
//! Cache failures are returned as values; `ResponseCache::fetch_through`
//! downgrades them to warnings. Validation and provider errors reach the
//! caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Wayfare library.
#[derive(Debug, Error)]
pub enum WayfareError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Provider {endpoint} failed{}: {message}", status_suffix(.status))]
    Provider {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}

/// Result type alias for Wayfare operations.
pub type Result<T> = std::result::Result<T, WayfareError>;

impl From<std::io::Error> for WayfareError {
    fn from(err: std::io::Error) -> Self {
        WayfareError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for WayfareError {
    fn from(err: serde_json::Error) -> Self {
        WayfareError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for WayfareError {
    fn from(err: rusqlite::Error) -> Self {
        WayfareError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for WayfareError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WayfareError::Timeout(std::time::Duration::from_secs(0))
        } else {
            WayfareError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl WayfareError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        WayfareError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a database error for a poisoned connection lock.
    pub(crate) fn lock_poisoned(err: impl std::fmt::Display) -> Self {
        WayfareError::Database {
            message: format!("Failed to lock database: {}", err),
            source: None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32000: Network / provider error
    /// - -32602: Invalid params
    /// - -32603: Internal error (store, IO, serialization)
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            WayfareError::Network { .. }
            | WayfareError::Timeout(_)
            | WayfareError::Provider { .. } => -32000,

            WayfareError::Validation { .. } | WayfareError::InvalidParams { .. } => -32602,

            _ => -32603,
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            WayfareError::Network { .. } | WayfareError::Timeout(_) => true,
            WayfareError::Provider {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
