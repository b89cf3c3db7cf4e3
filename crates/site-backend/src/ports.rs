//! Collaborator ports consumed by the content core
//!
//! Each port is an object-safe trait so callers can hold `Arc<dyn Port>`
//! handles constructed at the composition root.

use crate::error::BackendError;
use crate::types::{ChangeNotification, Filter, Record, Session, UserId};
use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Source of the current viewer session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current session, if the viewer is signed in
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    /// Current user id, if the viewer is signed in
    async fn current_user_id(&self) -> Result<Option<UserId>, BackendError>;
}

/// Row store addressed by table and equality filter
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the single row matching `filter`
    ///
    /// Zero rows is `Ok(None)`, not an error.
    ///
    /// # Errors
    /// - `BackendError::Ambiguous` if more than one row matches
    /// - any transport or rejection error from the backend
    async fn query_one(&self, table: &str, filter: &Filter)
        -> Result<Option<Record>, BackendError>;

    /// Insert `record`, or update the row sharing its `conflict_key` value
    async fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict_key: &str,
    ) -> Result<(), BackendError>;

    /// Delete every row matching `filter`
    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<(), BackendError>;
}

/// Push channel for row changes
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to changes on `table` whose row matches `filter`
    ///
    /// # Errors
    /// Any error means no notifications will be delivered.
    fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, BackendError>;
}

/// Viewer-local durable cache
///
/// Operations are best-effort; implementations log and swallow failures.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Read entry
    async fn get(&self, key: &str) -> Option<String>;

    /// Overwrite entry
    async fn set(&self, key: &str, value: &str);

    /// Remove entry
    async fn remove(&self, key: &str);
}

/// Releases a feed registration exactly once, on `release` or drop
pub struct SubscriptionGuard {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SubscriptionGuard {
    /// Create guard running `release` when dropped
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Guard with nothing to release
    #[must_use]
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release now
    #[inline]
    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// Live subscription: a notification stream plus its registration guard
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ChangeNotification>,
    guard: SubscriptionGuard,
}

impl Subscription {
    /// Create subscription from a receiver and its guard
    #[inline]
    #[must_use]
    pub fn new(
        receiver: mpsc::UnboundedReceiver<ChangeNotification>,
        guard: SubscriptionGuard,
    ) -> Self {
        Self { receiver, guard }
    }

    /// Next notification; `None` once the feed side is gone
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.recv().await
    }

    /// Next notification if one is already queued
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        self.receiver.try_recv().ok()
    }

    /// Release the registration and stop receiving
    #[inline]
    pub fn unsubscribe(self) {
        self.guard.release();
    }

    /// Split into the notification stream and the guard
    ///
    /// Lets the owner release the registration synchronously while another
    /// task drains the stream.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<ChangeNotification>,
        SubscriptionGuard,
    ) {
        (self.receiver, self.guard)
    }
}

impl Stream for Subscription {
    type Item = ChangeNotification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
