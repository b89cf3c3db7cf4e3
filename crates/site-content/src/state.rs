//! Slot state and its shared, observable cell

use crate::auth::ViewerAuthorization;
use crate::key::ContentKey;
use crate::resolver::{ContentSource, Resolution};
use crate::session::EditState;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Everything a slot knows at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    /// Slot key
    pub key: ContentKey,
    /// Flattened fallback text
    pub default_value: String,
    /// Value currently shown; also the baseline an edit is cancelled back to
    pub resolved_value: String,
    /// Where `resolved_value` came from
    pub source: ContentSource,
    /// Store timestamp of `resolved_value`, when known
    pub version: Option<DateTime<Utc>>,
    /// Whether initial resolution has finished
    pub loaded: bool,
    /// Viewer authorization
    pub authorization: ViewerAuthorization,
    /// Edit session state
    pub edit: EditState,
    /// Transient "just synced" indicator
    pub syncing: bool,
    /// Non-fatal message from the last save
    pub advisory: Option<String>,
}

impl SlotSnapshot {
    /// Fresh slot showing its default text
    #[must_use]
    pub fn new(key: ContentKey, default_value: String) -> Self {
        Self {
            key,
            resolved_value: default_value.clone(),
            default_value,
            source: ContentSource::Default,
            version: None,
            loaded: false,
            authorization: ViewerAuthorization::unresolved(),
            edit: EditState::Viewing,
            syncing: false,
            advisory: None,
        }
    }

    /// Both authorization and initial resolution have completed
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.loaded && self.authorization.resolved
    }

    /// Current draft, while editing or saving
    #[inline]
    #[must_use]
    pub fn draft(&self) -> Option<&str> {
        self.edit.draft()
    }

    /// Adopt the initial resolution unless a push or save got there first
    pub(crate) fn apply_resolution(&mut self, resolution: Resolution) {
        self.loaded = true;
        if self.source != ContentSource::Default {
            return;
        }
        self.resolved_value = resolution.value;
        self.source = resolution.source;
        self.version = resolution.updated_at;
    }

    /// Authorization resolves once and never reverts
    pub(crate) fn apply_authorization(&mut self, authorization: ViewerAuthorization) {
        if self.authorization.resolved {
            return;
        }
        self.authorization = ViewerAuthorization::resolved(authorization.is_editor);
    }
}

/// Slot state behind a lock, republished to watchers on every change
#[derive(Debug)]
pub(crate) struct SlotShared {
    state: Mutex<SlotSnapshot>,
    published: watch::Sender<SlotSnapshot>,
    mounted: AtomicBool,
}

impl SlotShared {
    pub(crate) fn new(initial: SlotSnapshot) -> Self {
        let (published, _) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(initial),
            published,
            mounted: AtomicBool::new(true),
        }
    }

    pub(crate) fn snapshot(&self) -> SlotSnapshot {
        self.state.lock().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SlotSnapshot> {
        self.published.subscribe()
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SlotSnapshot) -> R) -> R {
        let mut state = self.state.lock();
        let out = f(&mut state);
        self.published.send_replace(state.clone());
        out
    }

    /// Apply a transition that leaves state untouched when it fails
    pub(crate) fn try_update<T, E>(
        &self,
        f: impl FnOnce(&mut SlotSnapshot) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut state = self.state.lock();
        let out = f(&mut state)?;
        self.published.send_replace(state.clone());
        Ok(out)
    }

    /// Apply only while mounted; late async results are dropped
    pub(crate) fn update_if_mounted<R>(&self, f: impl FnOnce(&mut SlotSnapshot) -> R) -> Option<R> {
        if !self.is_mounted() {
            return None;
        }
        Some(self.update(f))
    }

    pub(crate) fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}
