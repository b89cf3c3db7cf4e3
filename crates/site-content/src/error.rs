//! Error types for content slots
//!
//! Content loading and authorization never fail outward; they degrade to
//! cache/default and non-editor respectively. The errors here cover invalid
//! input, rejected push payloads and illegal edit transitions.

use site_backend::BackendError;

/// Content error
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Slot key failed validation
    #[error("invalid content key {key:?}: {reason}")]
    InvalidKey {
        /// Offending key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Push payload was not a usable content row for this slot
    #[error("rejected change payload: {0}")]
    RejectedPayload(String),

    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl ContentError {
    /// Create invalid key error
    #[inline]
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason,
        }
    }

    /// Create rejected payload error
    #[inline]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::RejectedPayload(reason.into())
    }
}

/// Illegal edit-session transition
///
/// Apart from `Interrupted`, none of these change slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Viewer is not (or not yet known to be) an editor
    #[error("viewer is not authorized to edit")]
    NotAuthorized,

    /// Stored content has not been resolved yet
    #[error("content is still loading")]
    NotLoaded,

    /// No edit session is open
    #[error("no edit in progress")]
    NotEditing,

    /// An edit session is already open
    #[error("already editing")]
    AlreadyEditing,

    /// A save is in flight
    #[error("save in progress")]
    SaveInProgress,

    /// Draft is empty after trimming
    #[error("draft is empty")]
    EmptyDraft,

    /// Save task stopped before settling; the slot is back in viewing
    #[error("save interrupted")]
    Interrupted,
}
