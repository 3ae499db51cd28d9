//! Time-bounded result cache for rendered listings.

use std::{future::Future, sync::RwLock, time::Duration};

use bytes::Bytes;
use lru::LruCache;
use metrics::{counter, gauge};
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::Fingerprint;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A rendered listing response, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Memoizes rendered artifacts per [`Fingerprint`] for a fixed lifetime.
///
/// Entries expire a fixed time after they were written; reads never extend
/// them. Writes to the underlying store do not touch the cache, only expiry
/// and [`ResultCache::invalidate_all`] do. No lock is held while computing,
/// so concurrent misses on one fingerprint may each compute and the last
/// write wins.
pub struct ResultCache<V = RenderedPage> {
    enabled: bool,
    entries: RwLock<LruCache<Fingerprint, Entry<V>>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the live entry for `fingerprint`, dropping it if expired.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<V> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let now = Instant::now();
        match entries.get(fingerprint) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(fingerprint);
                gauge!("tidings_cache_entries").set(entries.len() as f64);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, fingerprint: Fingerprint, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut entries = rw_write(&self.entries, SOURCE, "insert");
        match entries.push(fingerprint.clone(), entry) {
            Some((evicted, _)) if evicted != fingerprint => {
                counter!("tidings_cache_evict_total", "view" => evicted.view().as_str())
                    .increment(1);
            }
            _ => {}
        }
        gauge!("tidings_cache_entries").set(entries.len() as f64);
    }

    /// Return the cached artifact for `fingerprint`, or run `compute` and
    /// store its successful result for `ttl`.
    ///
    /// Errors from `compute` are returned as-is and never cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        fingerprint: Fingerprint,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !self.enabled {
            return compute().await;
        }

        let view = fingerprint.view().as_str();
        if let Some(value) = self.get(&fingerprint) {
            counter!("tidings_cache_hit_total", "view" => view).increment(1);
            debug!(cache = "result", outcome = "hit", key = %fingerprint, "serving cached render");
            return Ok(value);
        }

        counter!("tidings_cache_miss_total", "view" => view).increment(1);
        debug!(cache = "result", outcome = "miss", key = %fingerprint, "computing render");

        let value = compute().await?;
        self.insert(fingerprint, value.clone(), ttl);
        Ok(value)
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_all");
        let dropped = entries.len();
        entries.clear();
        counter!("tidings_cache_invalidate_total").increment(1);
        gauge!("tidings_cache_entries").set(0.0);
        dropped
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
