//! Error types for Harvest Migrate.
//!
//! Errors fall into two families: transport failures (network, auth, API
//! status) that abort a migration run, and local failures (configuration,
//! token store, prompt input). Business-rule outcomes such as an unmapped
//! task or a rejected submission are not errors; see
//! [`crate::migration::EntryOutcome`].

use crate::config::AccountRole;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Harvest Migrate.
#[derive(Debug, Error)]
pub enum MigrateError {
    // Transport errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited by {service}, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Harvest rejected credentials for the {role} account: {message}")]
    Unauthorized { role: AccountRole, message: String },

    #[error("Harvest API error: {message}")]
    Api { message: String, status_code: Option<u16> },

    #[error("OAuth error: {message}")]
    OAuth { message: String },

    // Directory lookups
    #[error("Source {entity} {id} not found")]
    EntityNotFound { entity: &'static str, id: u64 },

    #[error("No active {entity}s found in destination account")]
    EmptyDestinationSet { entity: &'static str },

    #[error("The {role} account is not configured")]
    NotConfigured { role: AccountRole },

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

    #[error("Prompt input closed")]
    PromptClosed,

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Harvest Migrate operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// The client's timeout is unknown here; `HttpClient::execute` reports it.
impl From<reqwest::Error> for MigrateError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out: {}", err)
        } else {
            err.to_string()
        };
        MigrateError::Network {
            message,
            cause: err.url().map(|u| u.to_string()),
        }
    }
}

impl MigrateError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MigrateError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error came from talking to Harvest.
    ///
    /// Transport failures are never handled by the migration runner; they
    /// stop the whole batch.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MigrateError::Network { .. }
                | MigrateError::Timeout(_)
                | MigrateError::RateLimited { .. }
                | MigrateError::Unauthorized { .. }
                | MigrateError::Api { .. }
                | MigrateError::OAuth { .. }
        )
    }

    /// Check if this error should trigger a retry inside the HTTP client.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MigrateError::RateLimited { .. })
    }

    /// Process exit code for the CLI.
    ///
    /// - 1: configuration or local failure
    /// - 2: lookup failure while building the mapping
    /// - 3: transport failure
    /// - 4: operator input closed
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::EntityNotFound { .. } | MigrateError::EmptyDestinationSet { .. } => 2,
            MigrateError::PromptClosed => 4,
            e if e.is_transport() => 3,
            _ => 1,
        }
    }
}
