use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::feeds::{NewsItem, NewsProvider};
use crate::core::fetch::ProviderError;
use crate::providers::util::{endpoint, read_text};

const DEFAULT_TITLE: &str = "No Title";
const DEFAULT_LINK: &str = "#";
const DEFAULT_SOURCE: &str = "Google News";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<RssSource>,
}

#[derive(Debug, Deserialize)]
struct RssSource {
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<RssItem> for NewsItem {
    fn from(item: RssItem) -> Self {
        NewsItem {
            title: non_empty(item.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            link: non_empty(item.link).unwrap_or_else(|| DEFAULT_LINK.to_string()),
            date: non_empty(item.pub_date).unwrap_or_default(),
            source: non_empty(item.source.and_then(|s| s.name))
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        }
    }
}

fn parse_feed(xml: &str, limit: usize) -> Result<Vec<NewsItem>, ProviderError> {
    let rss: Rss = quick_xml::de::from_str(xml)
        .map_err(|e| ProviderError::Malformed(format!("Failed to parse RSS feed: {e}")))?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .take(limit)
        .map(NewsItem::from)
        .collect())
}

/// Google News RSS search, Korean edition.
pub struct GoogleNewsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleNewsProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        GoogleNewsProvider {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl NewsProvider for GoogleNewsProvider {
    #[instrument(name = "NewsFetch", skip(self))]
    async fn fetch_news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, ProviderError> {
        let url = endpoint(&self.base_url, "/rss/search");
        debug!(query, "Requesting news feed from {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("hl", "ko"), ("gl", "KR"), ("ceid", "KR:ko")])
            .send()
            .await?;
        let xml = read_text(response, "news feed").await?;
        parse_feed(&xml, limit)
    }
}
