//! RSS 2.0 source over HTTP.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{DataSource, FeedItem};
use crate::error::FetchError;

/// Upper bound on one fetch, connect and body included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Polls a single RSS feed with a blocking [`reqwest`] client.
pub struct RssSource {
    url: String,
    label: String,
    client: reqwest::blocking::Client,
}

impl RssSource {
    /// Create a source for `url` with the default [`FETCH_TIMEOUT`].
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            url: url.into(),
            label: label.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Convert an already-parsed channel into [`FeedItem`]s.
    ///
    /// Pure (no I/O) so the mapping can be tested without a network.
    pub fn parse_channel(channel: &rss::Channel) -> Vec<FeedItem> {
        channel
            .items()
            .iter()
            .map(|item| {
                // RFC 2822 dates; unparseable dates become None.
                let published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                    .map(|dt| dt.with_timezone(&Utc));

                FeedItem {
                    title: item.title().unwrap_or("(untitled)").to_string(),
                    link: item.link().map(String::from),
                    summary: item.description().unwrap_or_default().to_string(),
                    published,
                }
            })
            .collect()
    }

    /// Parse a raw feed document.
    pub fn parse_document(body: &[u8]) -> Result<Vec<FeedItem>, FetchError> {
        let channel = rss::Channel::read_from(body)?;
        Ok(Self::parse_channel(&channel))
    }
}

impl DataSource for RssSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch(&self) -> Result<Vec<FeedItem>, FetchError> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes()?;
        Self::parse_document(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_extracts_items_in_feed_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Plugin Deals</title>
    <item>
      <title>Big Sale on Synths</title>
      <link>https://example.com/1</link>
      <pubDate>Tue, 02 Jan 2024 12:00:00 +0000</pubDate>
      <description>Half price this week</description>
    </item>
    <item>
      <title>Reverb Bundle</title>
      <link>https://example.com/2</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

        let items = RssSource::parse_document(xml.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Big Sale on Synths");
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(items[0].summary, "Half price this week");
        assert_eq!(
            items[0].published,
            Some("2024-01-02T12:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );

        assert_eq!(items[1].title, "Reverb Bundle");
        assert_eq!(items[1].summary, "", "missing description is empty");
    }

    #[test]
    fn handles_missing_title() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <link>https://example.com/x</link>
    </item>
  </channel>
</rss>"#;

        let items = RssSource::parse_document(xml.as_bytes()).unwrap();

        assert_eq!(items[0].title, "(untitled)");
    }

    #[test]
    fn handles_invalid_date() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>Bad Date</title>
      <pubDate>not-a-date</pubDate>
    </item>
  </channel>
</rss>"#;

        let items = RssSource::parse_document(xml.as_bytes()).unwrap();

        assert!(items[0].published.is_none());
    }

    #[test]
    fn empty_channel_yields_no_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Empty</title>
  </channel>
</rss>"#;

        let items = RssSource::parse_document(xml.as_bytes()).unwrap();

        assert!(items.is_empty());
    }

    #[test]
    fn malformed_document_is_a_fetch_error() {
        let result = RssSource::parse_document(b"<html><body>502 Bad Gateway</body></html>");

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[test]
    fn new_source_keeps_url_and_label() {
        let source = RssSource::new("https://example.com/rss.php", "Deals").unwrap();

        assert_eq!(source.url(), "https://example.com/rss.php");
        assert_eq!(source.name(), "Deals");
    }
}
