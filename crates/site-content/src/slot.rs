//! Mounted editable content slot
//!
//! [`EditableContent`] is the handle a page holds for one slot. Mounting
//! starts three things concurrently:
//!
//! 1. the authorization check
//! 2. initial content resolution
//! 3. the live update listener, when the change feed accepts a subscription
//!
//! Each runs as a task bound to the handle. Dropping the handle (or calling
//! [`EditableContent::unmount`]) aborts them and releases the subscription;
//! anything that completes afterwards is ignored.

use crate::auth::AuthorizationGate;
use crate::config::{ConflictPolicy, ContentConfig};
use crate::error::EditError;
use crate::fallback::FallbackNode;
use crate::key::ContentKey;
use crate::listener::LiveUpdateListener;
use crate::resolver::ContentResolver;
use crate::services::ContentServices;
use crate::session::{self, EditSession, EditState, SaveOutcome};
use crate::state::{SlotShared, SlotSnapshot};
use crate::view::SlotView;
use chrono::Utc;
use parking_lot::Mutex;
use site_backend::{tables, Filter, SubscriptionGuard};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// Handle to one mounted content slot
pub struct EditableContent {
    key: ContentKey,
    fallback: FallbackNode,
    shared: Arc<SlotShared>,
    session: EditSession,
    policy: ConflictPolicy,
    guard: Option<SubscriptionGuard>,
    tasks: Vec<JoinHandle<()>>,
    save_task: Mutex<Option<AbortHandle>>,
}

impl EditableContent {
    /// Mount a slot and start loading it
    ///
    /// Until authorization resolves the slot renders its fallback. A feed
    /// that refuses the subscription only costs live updates.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn mount(
        key: ContentKey,
        fallback: &FallbackNode,
        services: &ContentServices,
        config: &ContentConfig,
    ) -> Self {
        let default_value = fallback.flatten();
        let shared = Arc::new(SlotShared::new(SlotSnapshot::new(
            key.clone(),
            default_value.clone(),
        )));
        let mut tasks = Vec::with_capacity(3);

        let gate = AuthorizationGate::new(services.sessions.clone(), services.store.clone());
        let auth_shared = shared.clone();
        tasks.push(tokio::spawn(async move {
            let authorization = gate.check().await;
            auth_shared.update_if_mounted(|state| state.apply_authorization(authorization));
        }));

        let resolver = ContentResolver::new(
            services.store.clone(),
            services.cache.clone(),
            config.cache_prefix.clone(),
        );
        let resolve_shared = shared.clone();
        let resolve_key = key.clone();
        tasks.push(tokio::spawn(async move {
            let resolution = resolver.resolve(&resolve_key, &default_value).await;
            resolve_shared.update_if_mounted(|state| state.apply_resolution(resolution));
        }));

        let filter = Filter::eq(tables::CONTENT_CONFLICT_KEY, key.as_str());
        let guard = match services.feed.subscribe(tables::SITE_CONTENT, filter) {
            Ok(subscription) => {
                let (receiver, guard) = subscription.into_parts();
                let listener = LiveUpdateListener::new(
                    key.clone(),
                    shared.clone(),
                    config.sync_indicator(),
                    config.conflict_policy,
                );
                tasks.push(tokio::spawn(listener.run(receiver)));
                tracing::info!(%key, "subscribed to content changes");
                Some(guard)
            }
            Err(err) => {
                tracing::warn!(%key, %err, "live updates unavailable");
                None
            }
        };

        let session = EditSession::new(
            key.clone(),
            services.store.clone(),
            services.cache.clone(),
            config.cache_key(&key),
        );

        Self {
            key,
            fallback: fallback.clone(),
            shared,
            session,
            policy: config.conflict_policy,
            guard,
            tasks,
            save_task: Mutex::new(None),
        }
    }

    /// Slot key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// Static fallback content
    #[inline]
    #[must_use]
    pub fn fallback(&self) -> &FallbackNode {
        &self.fallback
    }

    /// Current state
    #[must_use]
    pub fn snapshot(&self) -> SlotSnapshot {
        self.shared.snapshot()
    }

    /// Receiver that observes every state change
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SlotSnapshot> {
        self.shared.subscribe()
    }

    /// What to render right now
    #[must_use]
    pub fn view(&self) -> SlotView {
        SlotView::from_snapshot(&self.shared.snapshot())
    }

    /// Whether a live subscription is attached
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.guard.is_some()
    }

    /// Wait until authorization and initial resolution have both completed
    pub async fn settled(&self) -> SlotSnapshot {
        let mut receiver = self.shared.subscribe();
        let settled = receiver
            .wait_for(SlotSnapshot::is_settled)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.shared.snapshot())
    }

    /// Open an edit session seeded with the shown value
    ///
    /// # Errors
    /// - `EditError::NotAuthorized` unless the viewer is a resolved editor
    /// - `EditError::NotLoaded` until the stored value has been resolved
    /// - `EditError::AlreadyEditing` / `EditError::SaveInProgress`
    pub fn begin_edit(&self) -> Result<(), EditError> {
        self.shared.try_update(session::begin_edit)
    }

    /// Replace the draft
    ///
    /// # Errors
    /// - `EditError::NotEditing` / `EditError::SaveInProgress`
    pub fn update_draft(&self, text: impl Into<String>) -> Result<(), EditError> {
        let text = text.into();
        self.shared.try_update(|state| session::update_draft(state, text))
    }

    /// Discard the draft and go back to viewing
    ///
    /// # Errors
    /// - `EditError::NotEditing` / `EditError::SaveInProgress`
    pub fn cancel_edit(&self) -> Result<(), EditError> {
        self.shared.try_update(session::cancel_edit)
    }

    /// Save the trimmed draft
    ///
    /// The write runs as a task owned by the slot, so dropping this future
    /// does not strand the slot in saving. A failed store write keeps the
    /// draft in the local cache and still returns to viewing with an
    /// advisory.
    ///
    /// # Errors
    /// - `EditError::EmptyDraft` if the draft is blank (nothing changes)
    /// - `EditError::NotEditing` / `EditError::SaveInProgress`
    /// - `EditError::Interrupted` if the save task was aborted or panicked
    pub async fn save(&self) -> Result<SaveOutcome, EditError> {
        let pending = self
            .shared
            .try_update(|state| session::prepare_save(state, Utc::now()))?;

        let shared = self.shared.clone();
        let writer = self.session.clone();
        let policy = self.policy;
        let handle = tokio::spawn(async move {
            let outcome = writer.persist(&pending.content, pending.updated_at).await;
            shared.update_if_mounted(|state| {
                session::finish_save(state, &pending, &outcome, policy);
            });
            outcome
        });
        *self.save_task.lock() = Some(handle.abort_handle());

        let result = handle.await;
        self.save_task.lock().take();
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!(key = %self.key, %err, "save task did not complete");
                self.shared.update_if_mounted(|state| {
                    if state.edit.is_saving() {
                        state.edit = EditState::Viewing;
                        state.advisory = Some("Save interrupted.".to_string());
                    }
                });
                Err(EditError::Interrupted)
            }
        }
    }

    /// Tear the slot down now
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for EditableContent {
    fn drop(&mut self) {
        self.shared.unmount();
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
        for task in &self.tasks {
            task.abort();
        }
        if let Some(save) = self.save_task.lock().take() {
            save.abort();
        }
        tracing::debug!(key = %self.key, "content slot unmounted");
    }
}

impl std::fmt::Debug for EditableContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableContent")
            .field("key", &self.key)
            .field("live", &self.guard.is_some())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
