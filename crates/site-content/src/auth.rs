//! Authorization gate: may the current viewer edit content?
//!
//! The gate never fails outward. A missing session, a missing profile and
//! any backend error all resolve to "not an editor".

use serde::{Deserialize, Serialize};
use site_backend::{decode, tables, BackendError, Filter, ProfileRecord, RecordStore, SessionProvider};
use std::sync::Arc;

/// Per-mount authorization state
///
/// Starts unresolved and resolves exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ViewerAuthorization {
    /// Whether the check has completed
    pub resolved: bool,
    /// Whether the viewer may write
    pub is_editor: bool,
}

impl ViewerAuthorization {
    /// Check not yet completed
    #[inline]
    #[must_use]
    pub const fn unresolved() -> Self {
        Self {
            resolved: false,
            is_editor: false,
        }
    }

    /// Check completed with the given outcome
    #[inline]
    #[must_use]
    pub const fn resolved(is_editor: bool) -> Self {
        Self {
            resolved: true,
            is_editor,
        }
    }

    /// Resolved editor
    #[inline]
    #[must_use]
    pub const fn editor() -> Self {
        Self::resolved(true)
    }

    /// Resolved non-editor
    #[inline]
    #[must_use]
    pub const fn viewer() -> Self {
        Self::resolved(false)
    }

    /// True only once resolved positively
    #[inline]
    #[must_use]
    pub const fn can_edit(&self) -> bool {
        self.resolved && self.is_editor
    }
}

/// Resolves whether the current viewer is an editor
#[derive(Clone)]
pub struct AuthorizationGate {
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn RecordStore>,
}

impl AuthorizationGate {
    /// Create gate over a session source and the profile store
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self { sessions, store }
    }

    /// Run the check; always returns a resolved authorization
    pub async fn check(&self) -> ViewerAuthorization {
        match self.lookup().await {
            Ok(is_editor) => {
                tracing::debug!(is_editor, "authorization resolved");
                ViewerAuthorization::resolved(is_editor)
            }
            Err(err) => {
                tracing::warn!(%err, "authorization check failed, treating viewer as non-editor");
                ViewerAuthorization::viewer()
            }
        }
    }

    async fn lookup(&self) -> Result<bool, BackendError> {
        let Some(session) = self.sessions.current_session().await? else {
            tracing::debug!("no session, viewer is not an editor");
            return Ok(false);
        };

        let filter = Filter::eq(tables::PROFILE_ID, session.user_id.as_str());
        match self.store.query_one(tables::PROFILES, &filter).await? {
            Some(row) => Ok(decode::<ProfileRecord>(row)?.is_editor()),
            None => {
                tracing::debug!(user = %session.user_id, "no profile row, viewer is not an editor");
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate").finish_non_exhaustive()
    }
}
