//! Edit session: Viewing → Editing → Saving → Viewing
//!
//! Transitions are plain functions over [`SlotSnapshot`] so the slot handle
//! can apply them atomically. Persisting a save lives in [`EditSession`].

use crate::config::ConflictPolicy;
use crate::error::EditError;
use crate::key::ContentKey;
use crate::resolver::ContentSource;
use crate::state::SlotSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use site_backend::{tables, BackendError, LocalCache, RecordStore, SiteContentRecord};
use std::sync::Arc;

/// Edit session state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditState {
    /// Showing the resolved value
    #[default]
    Viewing,
    /// Draft open for changes
    Editing {
        /// Working copy
        draft: String,
    },
    /// Save in flight; always settles back to `Viewing`
    Saving {
        /// Draft being saved
        draft: String,
    },
}

impl EditState {
    /// Current draft, if any
    #[inline]
    #[must_use]
    pub fn draft(&self) -> Option<&str> {
        match self {
            Self::Viewing => None,
            Self::Editing { draft } | Self::Saving { draft } => Some(draft),
        }
    }

    /// Whether a draft is open for changes
    #[inline]
    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing { .. })
    }

    /// Whether a save is in flight
    #[inline]
    #[must_use]
    pub fn is_saving(&self) -> bool {
        matches!(self, Self::Saving { .. })
    }
}

/// How a save settled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Stored remotely; local copy cleared
    Persisted,
    /// Store failed; draft kept in the local cache
    SavedLocally {
        /// Message for the editor
        advisory: String,
    },
}

/// Trimmed draft captured when a save starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingSave {
    pub(crate) content: String,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Viewing → Editing, only for resolved editors once content has loaded
///
/// A draft seeded before resolution would hold the fallback and overwrite
/// the stored row on save.
pub(crate) fn begin_edit(state: &mut SlotSnapshot) -> Result<(), EditError> {
    if !state.authorization.can_edit() {
        return Err(EditError::NotAuthorized);
    }
    if !state.loaded {
        return Err(EditError::NotLoaded);
    }
    match state.edit {
        EditState::Viewing => {
            state.edit = EditState::Editing {
                draft: state.resolved_value.clone(),
            };
            state.advisory = None;
            Ok(())
        }
        EditState::Editing { .. } => Err(EditError::AlreadyEditing),
        EditState::Saving { .. } => Err(EditError::SaveInProgress),
    }
}

/// Editing → Editing with a new draft
pub(crate) fn update_draft(state: &mut SlotSnapshot, text: String) -> Result<(), EditError> {
    match &mut state.edit {
        EditState::Editing { draft } => {
            *draft = text;
            Ok(())
        }
        EditState::Saving { .. } => Err(EditError::SaveInProgress),
        EditState::Viewing => Err(EditError::NotEditing),
    }
}

/// Editing → Viewing, discarding the draft
pub(crate) fn cancel_edit(state: &mut SlotSnapshot) -> Result<(), EditError> {
    match state.edit {
        EditState::Editing { .. } => {
            state.edit = EditState::Viewing;
            state.advisory = None;
            Ok(())
        }
        EditState::Saving { .. } => Err(EditError::SaveInProgress),
        EditState::Viewing => Err(EditError::NotEditing),
    }
}

/// Editing → Saving; an all-whitespace draft is rejected with no change
pub(crate) fn prepare_save(
    state: &mut SlotSnapshot,
    now: DateTime<Utc>,
) -> Result<PendingSave, EditError> {
    let draft = match &state.edit {
        EditState::Editing { draft } => draft.clone(),
        EditState::Saving { .. } => return Err(EditError::SaveInProgress),
        EditState::Viewing => return Err(EditError::NotEditing),
    };

    let content = draft.trim();
    if content.is_empty() {
        return Err(EditError::EmptyDraft);
    }

    let pending = PendingSave {
        content: content.to_string(),
        updated_at: now,
    };
    state.edit = EditState::Saving { draft };
    Ok(pending)
}

/// Saving → Viewing, adopting the saved text as the new baseline
///
/// Under [`ConflictPolicy::NewestTimestamp`] a push newer than the save
/// that arrived while it was in flight keeps its value.
pub(crate) fn finish_save(
    state: &mut SlotSnapshot,
    pending: &PendingSave,
    outcome: &SaveOutcome,
    policy: ConflictPolicy,
) {
    state.edit = EditState::Viewing;

    let superseded = policy == ConflictPolicy::NewestTimestamp
        && state.version.is_some_and(|shown| shown > pending.updated_at);
    if superseded {
        tracing::debug!(key = %state.key, "newer push arrived during save, keeping it");
    } else {
        state.resolved_value.clone_from(&pending.content);
        state.version = Some(pending.updated_at);
        state.source = match outcome {
            SaveOutcome::Persisted => ContentSource::Remote,
            SaveOutcome::SavedLocally { .. } => ContentSource::Cache,
        };
    }

    state.advisory = match outcome {
        SaveOutcome::Persisted => None,
        SaveOutcome::SavedLocally { advisory } => Some(advisory.clone()),
    };
}

/// Message shown when a save only reached the local cache
#[must_use]
pub fn advisory_for(err: &BackendError) -> String {
    if err.is_unavailable() {
        "Saved locally only. Database connection failed.".to_string()
    } else {
        "Saved locally. Database may not be available.".to_string()
    }
}

/// Writes a slot's saved text through to the store, falling back to the cache
#[derive(Clone)]
pub struct EditSession {
    key: ContentKey,
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn LocalCache>,
    cache_key: String,
}

impl EditSession {
    /// Create session writer for a slot
    #[must_use]
    pub fn new(
        key: ContentKey,
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn LocalCache>,
        cache_key: String,
    ) -> Self {
        Self {
            key,
            store,
            cache,
            cache_key,
        }
    }

    /// Upsert `content`; on failure keep it in the local cache instead
    pub async fn persist(&self, content: &str, updated_at: DateTime<Utc>) -> SaveOutcome {
        let record = SiteContentRecord::new(self.key.as_str(), content).with_updated_at(updated_at);
        let result = match record.into_record() {
            Ok(row) => {
                self.store
                    .upsert(tables::SITE_CONTENT, row, tables::CONTENT_CONFLICT_KEY)
                    .await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                self.cache.remove(&self.cache_key).await;
                tracing::info!(key = %self.key, "content saved");
                SaveOutcome::Persisted
            }
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "database save failed, keeping local copy");
                self.cache.set(&self.cache_key, content).await;
                SaveOutcome::SavedLocally {
                    advisory: advisory_for(&err),
                }
            }
        }
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("key", &self.key)
            .field("cache_key", &self.cache_key)
            .finish_non_exhaustive()
    }
}
