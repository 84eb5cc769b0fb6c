//! Cache configuration.
//!
//! Controls whether caching is on, whether it is instrumented, and how a
//! comment-group replacement treats comments the new group no longer lists.

use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_METRICS_LABEL: &str = "map_cache";

/// What `put_comments_for_post` does with ids dropped from a replaced group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupReplacePolicy {
    /// Dropped comments stay retrievable by id until they are removed or
    /// their post is.
    #[default]
    Retain,
    /// Dropped comments are evicted from the comment-by-id index as well.
    Purge,
}

impl std::str::FromStr for GroupReplacePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "purge" => Ok(Self::Purge),
            other => Err(format!("unknown group replace policy `{other}`")),
        }
    }
}

/// Cache configuration from `socialcache.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the in-memory cache; when off every read misses.
    pub enabled: bool,
    /// Wrap the cache in the latency-recording decorator.
    pub metrics: bool,
    /// `cache` label attached to every latency timer.
    pub metrics_label: String,
    pub group_replace_policy: GroupReplacePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics: true,
            metrics_label: DEFAULT_METRICS_LABEL.to_string(),
            group_replace_policy: GroupReplacePolicy::Retain,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            metrics: settings.metrics,
            metrics_label: settings.metrics_label.clone(),
            group_replace_policy: settings.group_replace_policy,
        }
    }
}
