//! Lazily filled lookup tables for slow-changing market metadata.
//!
//! The [`ReferenceCache`] is created once at startup and handed to the
//! providers that need it. Each provider owns a [`Namespace`]; the first
//! lookup in a namespace triggers one bulk fetch that fills the whole table,
//! and every later lookup is served from memory for the rest of the process.
//! Concurrent first lookups wait on the same in-flight fetch. A failed fill is
//! not memoized: the caller gets a fallback built from the key and the next
//! lookup tries again.

use crate::core::cache::Cache;
use crate::core::fetch::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Localized and English display name for one market identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNames {
    pub local: String,
    pub english: String,
}

impl DisplayNames {
    pub fn new(local: impl Into<String>, english: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            english: english.into(),
        }
    }

    /// Both names set to the key itself.
    pub fn fallback(key: &str) -> Self {
        Self::new(key, key)
    }
}

/// Keyspace owned by a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Namespace(&'static str);

impl Namespace {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

pub type NameTable = HashMap<String, DisplayNames>;

#[async_trait]
pub trait ReferenceSource: Send + Sync {
    fn namespace(&self) -> Namespace;

    /// Fetches every entry of the namespace in one call.
    async fn fetch_all(&self) -> Result<NameTable, ProviderError>;
}

type TableCell = Arc<OnceCell<Arc<NameTable>>>;

#[derive(Clone)]
pub struct ReferenceCache {
    tables: Cache<Namespace, TableCell>,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self {
            tables: Cache::new("reference"),
        }
    }

    async fn table(&self, source: &dyn ReferenceSource) -> Option<Arc<NameTable>> {
        let namespace = source.namespace();
        let cell = self
            .tables
            .get_or_insert_with(namespace, || Arc::new(OnceCell::new()))
            .await;

        let filled = cell
            .get_or_try_init(|| async {
                debug!(%namespace, "Filling reference table");
                let table = source.fetch_all().await?;
                debug!(%namespace, entries = table.len(), "Reference table filled");
                Ok::<_, ProviderError>(Arc::new(table))
            })
            .await;

        match filled {
            Ok(table) => Some(Arc::clone(table)),
            Err(err) => {
                warn!(%namespace, error = %err, "Reference table unavailable, using fallback names");
                None
            }
        }
    }

    pub async fn resolve(&self, source: &dyn ReferenceSource, key: &str) -> DisplayNames {
        self.table(source)
            .await
            .and_then(|table| table.get(key).cloned())
            .unwrap_or_else(|| DisplayNames::fallback(key))
    }

    /// Resolves a batch of keys against a single table lookup.
    pub async fn resolve_all<'a, I>(&self, source: &dyn ReferenceSource, keys: I) -> Vec<DisplayNames>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let table = self.table(source).await;
        keys.into_iter()
            .map(|key| {
                table
                    .as_ref()
                    .and_then(|t| t.get(key).cloned())
                    .unwrap_or_else(|| DisplayNames::fallback(key))
            })
            .collect()
    }

    /// Keeps the keys the namespace table lists, in order. Every key is kept
    /// when the table cannot be filled, since nothing can be ruled out then.
    pub async fn retain_listed(&self, source: &dyn ReferenceSource, keys: Vec<String>) -> Vec<String> {
        match self.table(source).await {
            Some(table) => keys.into_iter().filter(|key| table.contains_key(key)).collect(),
            None => keys,
        }
    }

    pub async fn is_populated(&self, namespace: Namespace) -> bool {
        self.tables
            .get(&namespace)
            .await
            .is_some_and(|cell| cell.initialized())
    }
}
