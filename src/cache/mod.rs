//! Socialcache cache system
//!
//! Holds denormalized posts, comments grouped by post, and user sessions in
//! front of an authoritative store the cache never owns:
//!
//! - [`MapCache`]: the indexes and the algorithms that keep them coherent
//! - [`MeteredCache`]: a decorator timing every operation of an inner cache
//! - [`NoopCache`]: what callers get when caching is switched off
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! metrics = true
//! metrics_label = "map_cache"
//! group_replace_policy = "retain" # or "purge"
//! ```

mod config;
mod lock;
pub mod metered;
mod service;
mod store;

use std::sync::Arc;

use tracing::info;

pub(crate) use config::DEFAULT_METRICS_LABEL;
pub use config::{CacheConfig, GroupReplacePolicy};
pub use metered::{METRIC_CACHE_OP_MS, MeteredCache};
pub use service::{CacheOp, CachingService, NoopCache};
pub use store::{CacheStats, MapCache};

/// The cache a process runs with, plus direct access to the backing store
/// for inspection.
pub struct CacheHandle {
    pub store: Option<Arc<MapCache>>,
    pub service: Arc<dyn CachingService>,
}

/// Builds the cache stack described by `config`.
pub fn build(config: &CacheConfig) -> CacheHandle {
    if !config.enabled {
        info!("cache disabled; every read falls through to the store");
        return CacheHandle {
            store: None,
            service: Arc::new(NoopCache),
        };
    }

    let store = Arc::new(MapCache::from_config(config));
    let service: Arc<dyn CachingService> = if config.metrics {
        Arc::new(MeteredCache::with_label(
            Arc::clone(&store),
            config.metrics_label.clone(),
        ))
    } else {
        store.clone()
    };

    info!(
        metrics = config.metrics,
        label = %config.metrics_label,
        policy = ?config.group_replace_policy,
        "cache ready"
    );

    CacheHandle {
        store: Some(store),
        service,
    }
}
