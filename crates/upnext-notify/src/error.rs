//! Error types for webhook delivery.

use thiserror::Error;

/// A specialized Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// An error that occurred while delivering a digest to a webhook.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Failed to construct the HTTP client.
    #[error("failed to create HTTP client: {message}")]
    Client { message: String },

    /// Network-level failure talking to the webhook endpoint.
    #[error("{target} webhook request failed: {message}")]
    Request { target: String, message: String },

    /// The endpoint responded with an unexpected status.
    #[error("{target} webhook returned HTTP {status}")]
    Status { target: String, status: u16 },
}

impl DeliveryError {
    /// Creates a client construction error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
        }
    }

    /// Creates a request error for the given target.
    pub fn request(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates a status error for the given target.
    pub fn status(target: impl Into<String>, status: u16) -> Self {
        Self::Status {
            target: target.into(),
            status,
        }
    }

    /// Returns the delivery target this error relates to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Client { .. } => None,
            Self::Request { target, .. } | Self::Status { target, .. } => Some(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_target_context() {
        let err = DeliveryError::status("discord", 429);
        assert_eq!(err.target(), Some("discord"));
        assert!(err.to_string().contains("429"));

        let err = DeliveryError::request("slack", "connection reset");
        assert!(err.to_string().contains("slack"));
        assert!(err.to_string().contains("connection reset"));
    }
}
