use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Process-lifetime in-memory map shared between clones. Entries are never
/// evicted, so it only suits keyspaces that stay small.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    /// `name` only labels log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let value = self.inner.lock().await.get(key).cloned();
        debug!(cache = self.name, ?key, hit = value.is_some(), "Cache lookup");
        value
    }

    /// Returns the value for `key`, inserting `init()` first if absent.
    /// The check and the insert happen under one lock.
    pub async fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut entries = self.inner.lock().await;
        if !entries.contains_key(&key) {
            debug!(cache = self.name, ?key, "Cache insert");
        }
        entries.entry(key).or_insert_with(init).clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
