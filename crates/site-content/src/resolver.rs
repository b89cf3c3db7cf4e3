//! Content resolution: remote store, then local cache, then default

use crate::key::ContentKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use site_backend::{decode, tables, Filter, LocalCache, RecordStore, SiteContentRecord};
use std::sync::Arc;

/// Where the shown value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Flattened fallback content
    #[default]
    Default,
    /// Local cache entry
    Cache,
    /// Persisted store
    Remote,
    /// Push notification
    Live,
}

/// Outcome of resolving a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Value to show
    pub value: String,
    /// Where it came from
    pub source: ContentSource,
    /// Store timestamp, when the value came from the store
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resolution {
    fn new(value: String, source: ContentSource) -> Self {
        Self {
            value,
            source,
            updated_at: None,
        }
    }
}

/// Resolves a slot's value by strict precedence
///
/// 1. store row for the key with non-empty content (clears the cache entry)
/// 2. local cache entry
/// 3. the default text
///
/// A failing store falls through to 2 and 3 without surfacing an error.
#[derive(Clone)]
pub struct ContentResolver {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn LocalCache>,
    cache_prefix: String,
}

impl ContentResolver {
    /// Create resolver
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn LocalCache>,
        cache_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            cache_prefix: cache_prefix.into(),
        }
    }

    /// Resolve the value for `key`
    pub async fn resolve(&self, key: &ContentKey, default_value: &str) -> Resolution {
        let cache_key = format!("{}{}", self.cache_prefix, key);

        if let Some(record) = self.remote(key).await {
            self.cache.remove(&cache_key).await;
            return Resolution {
                updated_at: record.updated_at,
                ..Resolution::new(record.content, ContentSource::Remote)
            };
        }

        match self.cache.get(&cache_key).await {
            Some(cached) if !cached.is_empty() => {
                tracing::debug!(%key, "using cached content");
                Resolution::new(cached, ContentSource::Cache)
            }
            _ => {
                tracing::debug!(%key, "using default content");
                Resolution::new(default_value.to_string(), ContentSource::Default)
            }
        }
    }

    async fn remote(&self, key: &ContentKey) -> Option<SiteContentRecord> {
        let filter = Filter::eq(tables::CONTENT_CONFLICT_KEY, key.as_str());
        let row = match self.store.query_one(tables::SITE_CONTENT, &filter).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                tracing::debug!(%key, "no stored content");
                return None;
            }
            Err(err) => {
                tracing::debug!(%key, %err, "database unavailable, trying local cache");
                return None;
            }
        };

        match decode::<SiteContentRecord>(row) {
            Ok(record) if !record.content.is_empty() => Some(record),
            Ok(_) => {
                tracing::debug!(%key, "stored content is empty");
                None
            }
            Err(err) => {
                tracing::warn!(%key, %err, "ignoring malformed content row");
                None
            }
        }
    }
}

impl std::fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentResolver")
            .field("cache_prefix", &self.cache_prefix)
            .finish_non_exhaustive()
    }
}
