//! Calendar source definitions and `CALENDAR_URLS` parsing.

use serde::Deserialize;
use tracing::warn;
use upnext_core::CalendarKind;
use url::Url;

/// A single calendar feed to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSource {
    /// Feed URL (http or https).
    pub url: Url,
    /// Which section events from this feed land in.
    pub kind: CalendarKind,
}

impl CalendarSource {
    pub fn new(url: Url, kind: CalendarKind) -> Self {
        Self { url, kind }
    }
}

impl std::fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.url, self.kind.as_str())
    }
}

/// Wire shape of one `CALENDAR_URLS` entry.
#[derive(Debug, Deserialize)]
struct SourceEntry {
    url: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Parses the `CALENDAR_URLS` JSON array.
///
/// Invalid entries are skipped with a warning rather than failing the whole
/// list; only malformed top-level JSON is an error. Returns the valid sources
/// plus one message per rejected entry so the caller can decide whether an
/// empty result is fatal.
pub fn parse_calendar_urls(json: &str) -> Result<(Vec<CalendarSource>, Vec<String>), String> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| format!("CALENDAR_URLS is not a JSON array: {e}"))?;

    let mut sources = Vec::new();
    let mut rejected = Vec::new();

    for (index, value) in entries.into_iter().enumerate() {
        match parse_entry(&value) {
            Ok(source) => sources.push(source),
            Err(reason) => {
                warn!(index, %reason, "Skipping invalid CALENDAR_URLS entry");
                rejected.push(format!("entry {index}: {reason}"));
            }
        }
    }

    Ok((sources, rejected))
}

fn parse_entry(value: &serde_json::Value) -> Result<CalendarSource, String> {
    let entry: SourceEntry =
        serde_json::from_value(value.clone()).map_err(|e| format!("invalid entry shape: {e}"))?;

    let url = Url::parse(&entry.url).map_err(|e| format!("invalid url {:?}: {e}", entry.url))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported url scheme {:?}", url.scheme()));
    }

    let kind = entry.kind.parse::<CalendarKind>()?;

    Ok(CalendarSource::new(url, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_sources() {
        let json = r#"[
            {"url": "https://sonarr.example.com/feed/calendar/sonarr.ics", "type": "tv"},
            {"url": "https://radarr.example.com/feed/calendar/radarr.ics", "type": "movie"}
        ]"#;

        let (sources, rejected) = parse_calendar_urls(json).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(rejected.is_empty());
        assert_eq!(sources[0].kind, CalendarKind::Tv);
        assert_eq!(sources[1].kind, CalendarKind::Movie);
        assert_eq!(sources[0].url.host_str(), Some("sonarr.example.com"));
    }

    #[test]
    fn skips_invalid_entries_keeps_valid() {
        let json = r#"[
            {"url": "not a url", "type": "tv"},
            {"url": "https://ok.example.com/cal.ics", "type": "tv"},
            {"url": "https://bad-kind.example.com/cal.ics", "type": "sports"},
            {"missing": true}
        ]"#;

        let (sources, rejected) = parse_calendar_urls(json).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(rejected.len(), 3);
        assert_eq!(sources[0].url.host_str(), Some("ok.example.com"));
    }

    #[test]
    fn rejects_non_array_json() {
        assert!(parse_calendar_urls(r#"{"url": "x"}"#).is_err());
        assert!(parse_calendar_urls("not json").is_err());
    }

    #[test]
    fn rejects_file_scheme() {
        let json = r#"[{"url": "file:///etc/passwd", "type": "tv"}]"#;
        let (sources, rejected) = parse_calendar_urls(json).unwrap();
        assert!(sources.is_empty());
        assert_eq!(rejected.len(), 1);
    }
}
