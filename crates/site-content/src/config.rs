//! Slot configuration

use crate::key::ContentKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How live updates and saves reconcile against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Every valid push and every settled save overwrites the shown value
    #[default]
    LastWriteWins,
    /// Values older than the one shown (by `updated_at`) are ignored
    NewestTimestamp,
}

/// Configuration shared by slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// How long the syncing indicator stays up after a push, in milliseconds
    pub sync_indicator_ms: u64,
    /// Prefix for local cache entries
    pub cache_prefix: String,
    /// Push / save reconciliation
    pub conflict_policy: ConflictPolicy,
}

impl ContentConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With syncing indicator duration
    #[inline]
    #[must_use]
    pub fn with_sync_indicator(mut self, duration: Duration) -> Self {
        self.sync_indicator_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With cache prefix
    #[inline]
    #[must_use]
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// With conflict policy
    #[inline]
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Syncing indicator duration
    #[inline]
    #[must_use]
    pub fn sync_indicator(&self) -> Duration {
        Duration::from_millis(self.sync_indicator_ms)
    }

    /// Local cache key for a slot
    #[inline]
    #[must_use]
    pub fn cache_key(&self, key: &ContentKey) -> String {
        format!("{}{}", self.cache_prefix, key)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            sync_indicator_ms: 1_000,
            cache_prefix: "content_".to_string(),
            conflict_policy: ConflictPolicy::LastWriteWins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ContentConfig::new();
        assert_eq!(config.sync_indicator(), Duration::from_secs(1));
        assert_eq!(config.conflict_policy, ConflictPolicy::LastWriteWins);

        let key = ContentKey::new("hero-title").unwrap();
        assert_eq!(config.cache_key(&key), "content_hero-title");
    }

    #[test]
    fn builders() {
        let config = ContentConfig::new()
            .with_sync_indicator(Duration::from_millis(250))
            .with_cache_prefix("site:")
            .with_conflict_policy(ConflictPolicy::NewestTimestamp);

        let key = ContentKey::new("k").unwrap();
        assert_eq!(config.sync_indicator_ms, 250);
        assert_eq!(config.cache_key(&key), "site:k");
        assert_eq!(config.conflict_policy, ConflictPolicy::NewestTimestamp);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ContentConfig =
            serde_json::from_str(r#"{"conflict_policy": "newest_timestamp"}"#).unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::NewestTimestamp);
        assert_eq!(config.cache_prefix, "content_");
    }
}
