//! Market side feeds: sentiment, large transfers and news.

use crate::core::fetch::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedIndex {
    pub value: u32,
    pub value_classification: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhaleAlert {
    pub coin: String,
    pub amount: f64,
    pub sender: String,
    pub receiver: String,
    pub value_usd: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub date: String,
    pub source: String,
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn fetch_fear_greed(&self) -> Result<FearGreedIndex, ProviderError>;
}

#[async_trait]
pub trait TransferFeed: Send + Sync {
    async fn recent_transfers(&self, limit: usize) -> Result<Vec<WhaleAlert>, ProviderError>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_news(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, ProviderError>;
}
