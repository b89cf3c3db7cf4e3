//! Live update listener
//!
//! Raw notifications are decoded into [`ContentChange`] at the channel
//! boundary. Anything that is not a usable `site_content` row for this slot
//! is dropped before it reaches slot state.

use crate::config::ConflictPolicy;
use crate::error::ContentError;
use crate::key::ContentKey;
use crate::resolver::ContentSource;
use crate::state::{SlotShared, SlotSnapshot};
use chrono::{DateTime, Utc};
use site_backend::{tables, ChangeKind, ChangeNotification, SiteContentRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Validated content change for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// New content, never empty
    pub content: String,
    /// Store timestamp, when the payload carries one
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentChange {
    /// Decode a raw notification addressed to `key`
    ///
    /// # Errors
    /// `ContentError::RejectedPayload` when the notification is for another
    /// table, is a delete, has no usable `new` row, names a different key or
    /// carries empty content.
    pub fn decode(key: &ContentKey, notification: &ChangeNotification) -> Result<Self, ContentError> {
        if notification.table != tables::SITE_CONTENT {
            return Err(ContentError::rejected(format!(
                "unexpected table {}",
                notification.table
            )));
        }
        if notification.kind == ChangeKind::Delete {
            return Err(ContentError::rejected("delete carries no content"));
        }

        let row = notification
            .new
            .clone()
            .ok_or_else(|| ContentError::rejected("missing new row"))?;
        let record: SiteContentRecord = serde_json::from_value(row)
            .map_err(|err| ContentError::rejected(format!("malformed row: {err}")))?;

        if record.key != key.as_str() {
            return Err(ContentError::rejected(format!(
                "row for {} delivered to {key}",
                record.key
            )));
        }
        if record.content.is_empty() {
            return Err(ContentError::rejected("empty content"));
        }

        Ok(Self {
            content: record.content,
            updated_at: record.updated_at,
        })
    }
}

/// Apply a change to slot state; returns whether it was applied
///
/// An open draft is left alone. The baseline it cancels back to moves.
pub(crate) fn apply_change(
    state: &mut SlotSnapshot,
    change: &ContentChange,
    policy: ConflictPolicy,
) -> bool {
    if policy == ConflictPolicy::NewestTimestamp {
        if let (Some(shown), Some(incoming)) = (state.version, change.updated_at) {
            if incoming < shown {
                tracing::debug!(key = %state.key, "ignoring stale push");
                return false;
            }
        }
    }

    state.resolved_value.clone_from(&change.content);
    state.source = ContentSource::Live;
    if change.updated_at.is_some() {
        state.version = change.updated_at;
    }
    state.syncing = true;
    true
}

/// Task draining one slot's subscription
pub(crate) struct LiveUpdateListener {
    key: ContentKey,
    shared: Arc<SlotShared>,
    indicator: Duration,
    policy: ConflictPolicy,
}

impl LiveUpdateListener {
    pub(crate) fn new(
        key: ContentKey,
        shared: Arc<SlotShared>,
        indicator: Duration,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            key,
            shared,
            indicator,
            policy,
        }
    }

    /// Run until the feed closes or the slot unmounts
    pub(crate) async fn run(self, mut receiver: mpsc::UnboundedReceiver<ChangeNotification>) {
        let mut clear_at: Option<Instant> = None;

        loop {
            tokio::select! {
                notification = receiver.recv() => {
                    let Some(notification) = notification else {
                        break;
                    };
                    if self.handle(&notification) {
                        clear_at = Some(Instant::now() + self.indicator);
                    }
                }
                () = tokio::time::sleep_until(clear_at.unwrap_or_else(Instant::now)), if clear_at.is_some() => {
                    clear_at = None;
                    self.shared.update_if_mounted(|state| state.syncing = false);
                }
            }

            if !self.shared.is_mounted() {
                return;
            }
        }

        tracing::debug!(key = %self.key, "change feed closed");
        if let Some(deadline) = clear_at {
            tokio::time::sleep_until(deadline).await;
            self.shared.update_if_mounted(|state| state.syncing = false);
        }
    }

    fn handle(&self, notification: &ChangeNotification) -> bool {
        let change = match ContentChange::decode(&self.key, notification) {
            Ok(change) => change,
            Err(err) => {
                tracing::warn!(key = %self.key, %err, "ignoring change notification");
                return false;
            }
        };

        let applied = self
            .shared
            .update_if_mounted(|state| apply_change(state, &change, self.policy))
            .unwrap_or(false);
        if applied {
            tracing::info!(key = %self.key, "content synced from push");
        }
        applied
    }
}
