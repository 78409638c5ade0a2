//! Server error types.

use thiserror::Error;

use crate::config::ConfigError;

/// A specialized Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Top-level errors that can take the daemon down.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Tracing initialization failed.
    #[error(transparent)]
    Tracing(#[from] upnext_core::TracingError),

    /// The health endpoint could not be started.
    #[error("failed to start health endpoint: {message}")]
    Http { message: String },

    /// HTTP clients for fetching or delivery could not be built.
    #[error("initialization failed: {message}")]
    Init { message: String },
}

impl ServerError {
    /// Creates an HTTP server error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Creates an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }
}
