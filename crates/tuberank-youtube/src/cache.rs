//! Short-lived memoization of API responses.
//!
//! Keys are a deterministic serialization of endpoint plus sorted
//! parameters; TTLs are chosen by endpoint class. Expired entries are
//! evicted lazily on read. A miss only costs an extra network call, never
//! incorrect behavior.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// TTL for list/search endpoints (results churn quickly).
const LIST_TTL: Duration = Duration::from_secs(5 * 60);

/// TTL for single-channel lookups (metadata is comparatively stable).
const CHANNEL_TTL: Duration = Duration::from_secs(30 * 60);

/// Fallback TTL for everything else.
const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

struct CachedResponse {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-memory response cache.
#[derive(Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

/// Build a cache key from an endpoint and its parameters.
///
/// Parameters are sorted so equivalent calls hash to the same key
/// regardless of argument order.
pub fn cache_key(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort();

    let mut key = String::from(endpoint);
    for (name, value) in sorted {
        key.push('&');
        key.push_str(name);
        key.push('=');
        key.push_str(&urlencoding::encode(value));
    }
    key
}

/// TTL for the given endpoint class.
pub fn ttl_for(endpoint: &str) -> Duration {
    match endpoint {
        "search" | "playlistItems" => LIST_TTL,
        "channels" => CHANNEL_TTL,
        _ => DEFAULT_TTL,
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached response. Expired entries count as misses and are
    /// removed on the spot.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(cached) if cached.expires_at > Instant::now() => {
                    debug!(key, "Response cache hit");
                    return Some(cached.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but expired: evict under the write lock.
        let mut entries = self.entries.write().await;
        if let Some(cached) = entries.get(key) {
            if cached.expires_at > Instant::now() {
                return Some(cached.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Store a response with the given TTL.
    pub async fn insert(&self, key: impl Into<String>, value: serde_json::Value, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CachedResponse {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of entries currently held (including not-yet-evicted expired ones).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_is_order_insensitive() {
        let a = cache_key("videos", &[("id", "a,b"), ("part", "snippet")]);
        let b = cache_key("videos", &[("part", "snippet"), ("id", "a,b")]);
        assert_eq!(a, b);

        let c = cache_key("videos", &[("id", "a,c"), ("part", "snippet")]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ttl_classes() {
        assert_eq!(ttl_for("search"), Duration::from_secs(300));
        assert_eq!(ttl_for("playlistItems"), Duration::from_secs(300));
        assert_eq!(ttl_for("channels"), Duration::from_secs(1800));
        assert_eq!(ttl_for("videos"), Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_misses() {
        let cache = ResponseCache::new();
        cache
            .insert("k", json!({"x": 1}), Duration::from_secs(10))
            .await;

        assert_eq!(cache.get("k").await, Some(json!({"x": 1})));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("k").await, None);
        // Lazy eviction removed the stale entry.
        assert_eq!(cache.len().await, 0);
    }
}
