//! Adapter boundary. Every provider call is reduced to either a value or an
//! explicit absence; nothing past this point sees a transport error.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Network failure or non-2xx status.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Upstream answered with a payload we could not understand.
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// Authenticated adapter without credentials; no request was made.
    #[error("Missing credentials for {0}")]
    MissingCredential(&'static str),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Transport(_) | ProviderError::Timeout(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}

/// Result of a single adapter call as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Present(T),
    Absent(ProviderError),
}

impl<T> Fetched<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Fetched::Present(value) => Some(value),
            Fetched::Absent(_) => None,
        }
    }

    pub fn as_present(&self) -> Option<&T> {
        match self {
            Fetched::Present(value) => Some(value),
            Fetched::Absent(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Fetched::Absent(_))
    }

    pub fn absent_reason(&self) -> Option<&ProviderError> {
        match self {
            Fetched::Present(_) => None,
            Fetched::Absent(err) => Some(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Present(value) => Fetched::Present(f(value)),
            Fetched::Absent(err) => Fetched::Absent(err),
        }
    }
}

impl<T> From<Result<T, ProviderError>> for Fetched<T> {
    fn from(result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(value) => Fetched::Present(value),
            Err(err) => Fetched::Absent(err),
        }
    }
}

/// Runs one adapter call under `deadline`, single attempt, and converts any
/// failure into [`Fetched::Absent`].
pub async fn guarded<T, F>(source: &str, deadline: Duration, call: F) -> Fetched<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let outcome = match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline)),
    };

    match outcome {
        Ok(value) => {
            debug!(source, "Provider returned data");
            Fetched::Present(value)
        }
        Err(ProviderError::MissingCredential(exchange)) => {
            debug!(source, exchange, "Skipping authenticated call without credentials");
            Fetched::Absent(ProviderError::MissingCredential(exchange))
        }
        Err(err) => {
            warn!(source, error = %err, "Provider degraded to absent");
            Fetched::Absent(err)
        }
    }
}
