//! HTTP fetching of ICS feeds.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::source::CalendarSource;

/// Default request timeout when `HTTP_TIMEOUT` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for building an [`IcsFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header sent to feed servers.
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("upnext/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client for downloading calendar feeds.
pub struct IcsFetcher {
    client: Client,
}

impl IcsFetcher {
    /// Creates a fetcher with the given options.
    pub fn new(options: FetchOptions) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(&options.user_agent)
            .build()
            .map_err(|e| SourceError::client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Downloads a single feed body.
    pub async fn fetch(&self, source: &CalendarSource) -> SourceResult<String> {
        let url = source.url.as_str();
        debug!(%url, kind = source.kind.as_str(), "Fetching calendar feed");

        let response = self
            .client
            .get(source.url.clone())
            .send()
            .await
            .map_err(|e| SourceError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::fetch(url, e.to_string()))?;

        debug!(%url, bytes = body.len(), "Fetched calendar feed");
        Ok(body)
    }

    /// Downloads all feeds concurrently.
    ///
    /// One failed feed does not abort the rest; each source is returned with
    /// its own result so the pipeline can proceed with whatever succeeded.
    pub async fn fetch_all(
        &self,
        sources: &[CalendarSource],
    ) -> Vec<(CalendarSource, SourceResult<String>)> {
        let fetches = sources.iter().map(|source| async {
            let result = self.fetch(source).await;
            if let Err(ref e) = result {
                warn!(url = %source.url, error = %e, "Calendar feed fetch failed");
            }
            (source.clone(), result)
        });

        join_all(fetches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::CalendarKind;
    use url::Url;

    #[test]
    fn default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert!(options.user_agent.starts_with("upnext/"));
    }

    #[tokio::test]
    async fn fetch_reports_connection_errors() {
        let fetcher = IcsFetcher::new(FetchOptions {
            timeout: Duration::from_millis(200),
            ..Default::default()
        })
        .unwrap();

        // Reserved TEST-NET-1 address, nothing listens there.
        let source = CalendarSource::new(
            Url::parse("http://192.0.2.1:9/cal.ics").unwrap(),
            CalendarKind::Tv,
        );

        let results = fetcher.fetch_all(std::slice::from_ref(&source)).await;
        assert_eq!(results.len(), 1);
        let (returned, result) = &results[0];
        assert_eq!(returned, &source);
        assert!(matches!(result, Err(SourceError::Fetch { .. })));
    }
}
