use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use prometheus::IntGauge;
use tokio::sync::RwLock;

use crate::cache::token::RelayToken;

/// Process-local token store: token value -> {session id, expiry}.
///
/// Cloning is cheap and every clone shares the same map. Each operation takes
/// the lock once, so issue, sweep and consume are atomic with respect to each
/// other. The size gauge is written while the lock is held.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<HashMap<String, RelayToken>>>,
    size_gauge: Option<IntGauge>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), size_gauge: None }
    }

    /// Store that keeps `gauge` equal to the number of held tokens.
    pub fn with_size_gauge(gauge: IntGauge) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), size_gauge: Some(gauge) }
    }

    /// Insert a token. Returns false and leaves the store untouched if the value is already taken.
    pub async fn insert(&self, value: String, token: RelayToken) -> bool {
        let mut map = self.inner.write().await;
        if map.contains_key(&value) {
            return false;
        }
        map.insert(value, token);
        self.report_size(&map);
        true
    }

    /// Remove the token and return it if it was still valid.
    ///
    /// The entry is deleted whether or not it had expired, so a token can be
    /// consumed at most once.
    pub async fn consume(&self, value: &str) -> Option<RelayToken> {
        let removed = {
            let mut map = self.inner.write().await;
            let removed = map.remove(value);
            self.report_size(&map);
            removed
        };
        removed.filter(|token| !token.is_expired())
    }

    /// Delete every expired entry. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, token| !token.is_expired_at(now));
        self.report_size(&map);
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn contains(&self, value: &str) -> bool {
        self.inner.read().await.contains_key(value)
    }

    // caller holds the write lock
    fn report_size(&self, map: &HashMap<String, RelayToken>) {
        if let Some(gauge) = &self.size_gauge {
            gauge.set(map.len() as i64);
        }
    }
}
