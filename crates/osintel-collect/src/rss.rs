//! RSS feed collector.
//!
//! Fetches each configured feed and turns its `<item>` elements into
//! `article` items. Descriptions are stripped of HTML before storage.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::CollectError;
use crate::types::{HttpSettings, NewItem};
use crate::Collector;

#[derive(Debug, Deserialize)]
struct RssConfig {
    feeds: Vec<String>,
}

pub struct RssCollector {
    client: reqwest::Client,
    feeds: Vec<String>,
}

impl RssCollector {
    /// Build a collector from a source's JSON config.
    ///
    /// Expected shape: `{"feeds": ["https://...", ...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::InvalidConfig`] when the config does not match
    /// that shape or lists no feeds.
    pub fn from_config(config: &Value, settings: &HttpSettings) -> Result<Self, CollectError> {
        let parsed: RssConfig = serde_json::from_value(config.clone())
            .map_err(|e| CollectError::InvalidConfig(format!("rss config: {e}")))?;
        if parsed.feeds.is_empty() {
            return Err(CollectError::InvalidConfig(
                "rss config: at least one feed URL is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            feeds: parsed.feeds,
        })
    }

    async fn fetch_feed(&self, feed_url: &str) -> Result<Vec<NewItem>, CollectError> {
        let body = self
            .client
            .get(feed_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_feed(&body, feed_url)
    }
}

impl Collector for RssCollector {
    fn test_connection(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let Some(first) = self.feeds.first() else {
                return false;
            };
            match self.client.get(first).send().await {
                Ok(response) if response.status().is_success() => true,
                Ok(response) => {
                    tracing::error!(feed = first, status = %response.status(), "feed probe failed");
                    false
                }
                Err(e) => {
                    tracing::error!(feed = first, error = %e, "feed probe failed");
                    false
                }
            }
        })
    }

    fn collect(&self) -> BoxFuture<'_, Result<Vec<NewItem>, CollectError>> {
        Box::pin(async move {
            let mut items = Vec::new();

            for feed_url in &self.feeds {
                tracing::info!(feed = feed_url, "collecting feed");
                // One unreachable feed must not sink the rest.
                match self.fetch_feed(feed_url).await {
                    Ok(mut feed_items) => items.append(&mut feed_items),
                    Err(e) => {
                        tracing::error!(feed = feed_url, error = %e, "error collecting feed");
                    }
                }
            }

            tracing::info!(count = items.len(), "rss collection finished");
            Ok(items)
        })
    }
}

/// Parse an RSS XML body into `article` items.
///
/// # Errors
///
/// Returns [`CollectError::Xml`] if the XML is malformed.
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<NewItem>, CollectError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut description = String::new();
    let mut guid = String::new();
    let mut author = String::new();
    let mut pub_date = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("").to_string();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    description.clear();
                    guid.clear();
                    author.clear();
                    pub_date.clear();
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("");
                if name == "item" && in_item {
                    in_item = false;
                    if !link.is_empty() {
                        items.push(feed_item(
                            feed_url,
                            &title,
                            &link,
                            &description,
                            &guid,
                            &author,
                            &pub_date,
                        ));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    assign_field(
                        &current_tag,
                        text,
                        &mut title,
                        &mut link,
                        &mut description,
                        &mut guid,
                        &mut author,
                        &mut pub_date,
                    );
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    assign_field(
                        &current_tag,
                        text,
                        &mut title,
                        &mut link,
                        &mut description,
                        &mut guid,
                        &mut author,
                        &mut pub_date,
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CollectError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

#[allow(clippy::too_many_arguments)]
fn assign_field(
    tag: &str,
    text: String,
    title: &mut String,
    link: &mut String,
    description: &mut String,
    guid: &mut String,
    author: &mut String,
    pub_date: &mut String,
) {
    match tag {
        "title" => *title = text,
        "link" => *link = text,
        "description" => *description = strip_html(&text),
        "guid" => *guid = text,
        "author" | "dc:creator" => *author = text,
        "pubDate" => *pub_date = text,
        _ => {}
    }
}

fn feed_item(
    feed_url: &str,
    title: &str,
    link: &str,
    description: &str,
    guid: &str,
    author: &str,
    pub_date: &str,
) -> NewItem {
    let external_id = if guid.is_empty() {
        link_digest(link)
    } else {
        guid.to_string()
    };
    let published_at = DateTime::parse_from_rfc2822(pub_date)
        .ok()
        .map(|d| d.with_timezone(&Utc));

    NewItem {
        item_type: "article".to_string(),
        external_id: Some(external_id),
        title: (!title.is_empty()).then(|| title.to_string()),
        content: if description.is_empty() {
            title.to_string()
        } else {
            description.to_string()
        },
        metadata: json!({ "feed": feed_url }),
        url: Some(link.to_string()),
        author: (!author.is_empty()).then(|| author.to_string()),
        published_at,
    }
}

/// Stable fallback id for feeds whose items carry no `<guid>`.
fn link_digest(link: &str) -> String {
    let digest = Sha256::digest(link.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Strip HTML tags from a string and normalize whitespace.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Security Wire</title>
    <item>
      <title>New botnet campaign observed</title>
      <link>https://example.com/botnet</link>
      <guid>wire-001</guid>
      <description>&lt;p&gt;Researchers report a &lt;b&gt;large&lt;/b&gt; campaign.&lt;/p&gt;</description>
      <author>reporter@example.com</author>
      <pubDate>Fri, 28 Aug 2026 09:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Patch Tuesday roundup</title>
      <link>https://example.com/patches</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_with_guid_and_date() {
        let items = parse_feed(SAMPLE_FEED, "https://example.com/rss").expect("valid feed");
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.item_type, "article");
        assert_eq!(first.external_id.as_deref(), Some("wire-001"));
        assert_eq!(first.title.as_deref(), Some("New botnet campaign observed"));
        assert_eq!(first.content, "Researchers report a large campaign.");
        assert_eq!(first.author.as_deref(), Some("reporter@example.com"));
        assert!(first.published_at.is_some());
        assert_eq!(first.metadata["feed"], "https://example.com/rss");
    }

    #[test]
    fn guidless_item_gets_link_digest_id() {
        let items = parse_feed(SAMPLE_FEED, "https://example.com/rss").expect("valid feed");
        let second = &items[1];
        let id = second.external_id.as_deref().expect("digest id");
        assert_eq!(id.len(), 64);
        assert_eq!(id, link_digest("https://example.com/patches"));
        // No description: title doubles as content.
        assert_eq!(second.content, "Patch Tuesday roundup");
        assert!(second.published_at.is_none());
    }

    #[test]
    fn empty_feed_yields_no_items() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let items = parse_feed(xml, "https://example.com/rss").expect("empty feed");
        assert!(items.is_empty());
    }

    #[test]
    fn item_without_link_is_skipped() {
        let xml = r#"<rss><channel><item><title>No link here</title></item></channel></rss>"#;
        let items = parse_feed(xml, "https://example.com/rss").expect("feed");
        assert!(items.is_empty());
    }

    #[test]
    fn strips_nested_html_tags() {
        assert_eq!(
            strip_html("<p>Hello <b>world</b>,\n  again</p>"),
            "Hello world, again"
        );
    }

    #[test]
    fn rejects_config_without_feeds() {
        let settings = HttpSettings::default();
        assert!(matches!(
            RssCollector::from_config(&json!({"feeds": []}), &settings),
            Err(CollectError::InvalidConfig(_))
        ));
        assert!(matches!(
            RssCollector::from_config(&json!({}), &settings),
            Err(CollectError::InvalidConfig(_))
        ));
    }
}
