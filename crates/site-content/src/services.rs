//! Injected collaborator handles
//!
//! Built once at the composition root and cloned into every slot.

use site_backend::{ChangeFeed, LocalCache, RecordStore, SessionProvider};
use std::fmt;
use std::sync::Arc;

/// Backend collaborators used by content slots
#[derive(Clone)]
pub struct ContentServices {
    /// Viewer session source
    pub sessions: Arc<dyn SessionProvider>,
    /// Persisted content and profiles
    pub store: Arc<dyn RecordStore>,
    /// Push notifications for content rows
    pub feed: Arc<dyn ChangeFeed>,
    /// Viewer-local fallback copy
    pub cache: Arc<dyn LocalCache>,
}

impl ContentServices {
    /// Assemble from individual ports
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn ChangeFeed>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        Self {
            sessions,
            store,
            feed,
            cache,
        }
    }

    /// Use one backend for sessions, rows and change feed
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>, cache: Arc<dyn LocalCache>) -> Self
    where
        B: SessionProvider + RecordStore + ChangeFeed + 'static,
    {
        Self {
            sessions: backend.clone(),
            store: backend.clone(),
            feed: backend,
            cache,
        }
    }
}

impl fmt::Debug for ContentServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentServices").finish_non_exhaustive()
    }
}
