//! Google News RSS provider.

use async_trait::async_trait;
use mentions_core::TrackedBrand;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::json;

use crate::error::AggregatorError;
use crate::traits::Provider;
use crate::types::{RawMention, RawTimestamp};

use super::{or_query, strip_html};

pub const GOOGLE_NEWS_PLATFORM: &str = "google_news";
const DEFAULT_BASE_URL: &str = "https://news.google.com";

/// Searches the Google News RSS endpoint for a target's name and keywords.
#[derive(Debug, Clone)]
pub struct GoogleNewsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleNewsProvider {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Point the provider at a different host; used by tests.
    #[must_use]
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Provider for GoogleNewsProvider {
    fn platform(&self) -> &str {
        GOOGLE_NEWS_PLATFORM
    }

    async fn fetch_mentions(
        &self,
        brand: &TrackedBrand,
    ) -> Result<Vec<RawMention>, AggregatorError> {
        let query = or_query(brand);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let encoded = utf8_percent_encode(&query, NON_ALPHANUMERIC).to_string();
        let url = format!(
            "{}/rss/search?q={encoded}&hl=en-US&gl=US&ceid=US:en",
            self.base_url
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AggregatorError::provider(
                GOOGLE_NEWS_PLATFORM,
                format!("search failed with status {}", response.status()),
            ));
        }
        let body = response.text().await?;
        let items = parse_rss_items(&body)?;
        tracing::debug!(query = %query, items = items.len(), "fetched Google News RSS");
        Ok(items)
    }
}

#[derive(Debug, Default)]
struct ItemFields {
    guid: String,
    title: String,
    link: String,
    description: String,
    pub_date: String,
    source: String,
}

impl ItemFields {
    fn set(&mut self, tag: &str, text: String) {
        let slot = match tag {
            "guid" => &mut self.guid,
            "title" => &mut self.title,
            "link" => &mut self.link,
            "pubDate" => &mut self.pub_date,
            "source" => &mut self.source,
            "description" => {
                self.description = strip_html(&text);
                return;
            }
            _ => return,
        };
        *slot = text.trim().to_string();
    }

    fn into_raw(self) -> RawMention {
        let payload = json!({
            "guid": self.guid,
            "title": self.title,
            "link": self.link,
            "description": self.description,
            "pubDate": self.pub_date,
            "source": self.source,
        });
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        RawMention {
            id: non_empty(self.guid),
            title: non_empty(self.title),
            body: non_empty(self.description),
            author: non_empty(self.source),
            url: non_empty(self.link),
            published: non_empty(self.pub_date).map(RawTimestamp::Text),
            synthetic: false,
            payload,
        }
    }
}

/// Parse RSS `<item>` elements into raw mentions.
///
/// Items with neither a title nor a link are skipped.
///
/// # Errors
///
/// Returns [`AggregatorError::Xml`] if the document is malformed.
pub fn parse_rss_items(xml: &str) -> Result<Vec<RawMention>, AggregatorError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemFields> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    current = Some(ItemFields::default());
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(fields) = current.take() {
                        if !fields.title.is_empty() || !fields.link.is_empty() {
                            items.push(fields.into_raw());
                        }
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(fields) = current.as_mut() {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    fields.set(&current_tag, text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(fields) = current.as_mut() {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    fields.set(&current_tag, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AggregatorError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"Globex" - Google News</title>
    <item>
      <title>Globex launches new product</title>
      <link>https://example.com/globex-launch</link>
      <guid isPermaLink="false">CBMiK2h0dHBz</guid>
      <pubDate>Tue, 14 Nov 2023 22:13:20 GMT</pubDate>
      <description><![CDATA[<a href="https://example.com">Globex</a> unveils a <b>new</b> gadget]]></description>
      <source url="https://example.com">Example Times</source>
    </item>
    <item>
      <title>Markets wrap</title>
      <link>https://example.com/markets</link>
      <description>Stocks &amp; bonds</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_into_raw_mentions() {
        let items = parse_rss_items(SAMPLE_RSS).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.id.as_deref(), Some("CBMiK2h0dHBz"));
        assert_eq!(first.title.as_deref(), Some("Globex launches new product"));
        assert_eq!(first.body.as_deref(), Some("Globex unveils a new gadget"));
        assert_eq!(first.author.as_deref(), Some("Example Times"));
        assert_eq!(
            first.published,
            Some(RawTimestamp::Text("Tue, 14 Nov 2023 22:13:20 GMT".to_string()))
        );
        assert_eq!(first.payload["link"], "https://example.com/globex-launch");

        let second = &items[1];
        assert!(second.id.is_none());
        assert_eq!(second.body.as_deref(), Some("Stocks & bonds"));
        assert!(second.published.is_none());
    }

    #[test]
    fn channel_title_is_not_an_item() {
        let xml = r#"<rss><channel><title>Only a channel</title></channel></rss>"#;
        assert!(parse_rss_items(xml).unwrap().is_empty());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = "<rss><channel><item><title>Broken</link></item></channel></rss>";
        assert!(matches!(parse_rss_items(xml), Err(AggregatorError::Xml(_))));
    }
}
