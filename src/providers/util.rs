use crate::core::config::HttpConfig;
use crate::core::fetch::ProviderError;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Builds the single HTTP client shared by every adapter.
pub fn http_client(http: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(http.user_agent.as_str())
        .timeout(http.timeout())
        .build()
}

/// Joins a configured base URL and an absolute endpoint path.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Rejects non-2xx responses as transport failures and returns the body.
pub async fn read_text(response: reqwest::Response, context: &str) -> Result<String, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Transport(format!(
            "HTTP error: {status} for {context}"
        )));
    }

    let text = response.text().await?;
    debug!(context, bytes = text.len(), "Received response body");
    Ok(text)
}

pub async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, ProviderError> {
    let text = read_text(response, context).await?;
    serde_json::from_str(&text).map_err(|e| {
        ProviderError::Malformed(format!("Failed to parse JSON response for {context}: {e}"))
    })
}

/// Exchanges encode most amounts as decimal strings; accept either form.
pub fn number_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid number {text:?}: {e}"))),
    }
}

/// Like [`number_from_any`], mapping `null`, missing and empty values to `None`.
pub fn optional_number_from_any<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid number {text:?}: {e}"))),
    }
}
