//! Result cache for rendered listings.
//!
//! Only cache-eligible listings are stored, keyed by a [`Fingerprint`] that
//! captures everything the render depends on. Entries live for a fixed TTL
//! from the moment they are written and are otherwise dropped only by an
//! explicit [`ResultCache::invalidate_all`].
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! capacity = 256
//! vary_on_viewer_token = true
//! viewer_token_cookie = "sessionid"
//! ```

mod config;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{Fingerprint, ViewKind, ViewerVariant};
pub use store::{RenderedPage, ResultCache};
