//! Error types for calendar source operations.
//!
//! Every variant carries the source URL so a failed feed can be identified
//! in the logs without additional context.

use thiserror::Error;

/// A specialized Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// An error that occurred while fetching or decoding a calendar source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to construct the HTTP client.
    #[error("failed to create HTTP client: {message}")]
    Client { message: String },

    /// Network-level fetch failure (connection, DNS, timeout).
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The feed responded with a non-success status.
    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    /// The feed body was not valid iCalendar data.
    #[error("failed to parse ICS from {url}: {message}")]
    Parse { url: String, message: String },
}

impl SourceError {
    /// Creates a client construction error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
        }
    }

    /// Creates a fetch error for the given source URL.
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a status error for the given source URL.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a parse error for the given source URL.
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the source URL this error relates to, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Client { .. } => None,
            Self::Fetch { url, .. } | Self::Status { url, .. } | Self::Parse { url, .. } => {
                Some(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_url_context() {
        let err = SourceError::fetch("https://example.com/cal.ics", "connection refused");
        assert_eq!(err.url(), Some("https://example.com/cal.ics"));
        assert!(err.to_string().contains("https://example.com/cal.ics"));
        assert!(err.to_string().contains("connection refused"));

        let err = SourceError::status("https://example.com/cal.ics", 503);
        assert!(err.to_string().contains("503"));

        let err = SourceError::client("bad TLS config");
        assert_eq!(err.url(), None);
    }
}
