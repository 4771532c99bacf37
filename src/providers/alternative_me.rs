use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::feeds::{FearGreedIndex, SentimentProvider};
use crate::core::fetch::ProviderError;
use crate::providers::util::{endpoint, read_json};

#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngRow>,
}

#[derive(Debug, Deserialize)]
struct FngRow {
    value: String,
    value_classification: String,
    timestamp: String,
}

/// Crypto fear & greed index from alternative.me.
pub struct AlternativeMeProvider {
    client: reqwest::Client,
    base_url: String,
}

impl AlternativeMeProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        AlternativeMeProvider {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl SentimentProvider for AlternativeMeProvider {
    #[instrument(name = "FearGreedFetch", skip(self))]
    async fn fetch_fear_greed(&self) -> Result<FearGreedIndex, ProviderError> {
        let url = endpoint(&self.base_url, "/fng/");
        debug!("Requesting fear & greed index from {}", url);
        let response = self.client.get(&url).send().await?;
        let body: FngResponse = read_json(response, "fear & greed index").await?;

        let row = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed("Fear & greed response has no data".into()))?;

        let parse = |field: &str, raw: &str| {
            raw.trim().parse::<i64>().map_err(|e| {
                ProviderError::Malformed(format!("Invalid fear & greed {field} {raw:?}: {e}"))
            })
        };
        let value = parse("value", &row.value)?;
        let value = u32::try_from(value)
            .map_err(|_| ProviderError::Malformed(format!("Fear & greed value out of range: {value}")))?;

        Ok(FearGreedIndex {
            value,
            value_classification: row.value_classification,
            timestamp: parse("timestamp", &row.timestamp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_with(body: &str) -> (MockServer, AlternativeMeProvider) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fng/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        let provider = AlternativeMeProvider::new(reqwest::Client::new(), &server.uri());
        (server, provider)
    }

    #[tokio::test]
    async fn test_first_row_is_parsed() {
        let (_server, provider) = provider_with(
            r#"{
                "name": "Fear and Greed Index",
                "data": [
                    {"value": "72", "value_classification": "Greed", "timestamp": "1718064000", "time_until_update": "3600"},
                    {"value": "10", "value_classification": "Extreme Fear", "timestamp": "1717977600"}
                ],
                "metadata": {"error": null}
            }"#,
        )
        .await;

        let index = provider.fetch_fear_greed().await.unwrap();
        assert_eq!(
            index,
            FearGreedIndex {
                value: 72,
                value_classification: "Greed".to_string(),
                timestamp: 1718064000,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_data_is_malformed() {
        let (_server, provider) = provider_with(r#"{"data": []}"#).await;
        assert!(matches!(
            provider.fetch_fear_greed().await,
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_non_numeric_value_is_malformed() {
        let (_server, provider) = provider_with(
            r#"{"data": [{"value": "high", "value_classification": "Greed", "timestamp": "1"}]}"#,
        )
        .await;
        let err = provider.fetch_fear_greed().await.unwrap_err();
        assert!(err.to_string().contains("Invalid fear & greed value"));
    }
}
