//! Result cache configuration.
//!
//! Populated from the `[cache]` section of `tidings.toml` or `TIDINGS__CACHE__*`.

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 20;
const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_VIEWER_TOKEN_COOKIE: &str = "sessionid";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve cache-eligible listings from memory.
    pub enabled: bool,
    /// Lifetime of a cached render, measured from when it was stored.
    pub ttl_seconds: u64,
    /// Maximum number of cached renders before least-recently-used eviction.
    pub capacity: usize,
    /// Partition cached renders by the viewer token cookie.
    pub vary_on_viewer_token: bool,
    /// Name of the cookie carrying the viewer token.
    pub viewer_token_cookie: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            capacity: DEFAULT_CAPACITY,
            vary_on_viewer_token: true,
            viewer_token_cookie: DEFAULT_VIEWER_TOKEN_COOKIE.to_string(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl_seconds: settings.ttl.as_secs(),
            capacity: settings.capacity.get(),
            vary_on_viewer_token: settings.vary_on_viewer_token,
            viewer_token_cookie: settings.viewer_token_cookie.clone(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
