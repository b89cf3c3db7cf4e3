//! In-process backend
//!
//! Holds sessions, rows and live subscriptions in memory. Used by tests,
//! demos and offline runs. Every port can be switched to fail so degraded
//! paths are reachable without a network.

use crate::error::BackendError;
use crate::ports::{ChangeFeed, RecordStore, SessionProvider, Subscription, SubscriptionGuard};
use crate::types::{ChangeKind, ChangeNotification, Filter, Record, Session, UserId};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Live subscription registration
#[derive(Debug)]
struct Subscriber {
    table: String,
    filter: Filter,
    sender: mpsc::UnboundedSender<ChangeNotification>,
}

/// Switchable failure modes
#[derive(Debug, Default)]
struct Faults {
    sessions: AtomicBool,
    reads: AtomicBool,
    writes: AtomicBool,
    subscribe: AtomicBool,
}

/// In-memory sessions, tables and change feed
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// Rows by table
    tables: Mutex<HashMap<String, Vec<Record>>>,
    /// Current session
    session: Mutex<Option<Session>>,
    /// Live subscriptions by id
    subscribers: Arc<DashMap<u64, Subscriber>>,
    /// Next subscription id
    next_subscriber: AtomicU64,
    /// Injected failures
    faults: Faults,
    /// Upserts attempted, successful or not
    upsert_calls: AtomicUsize,
}

impl InMemoryBackend {
    /// Create empty backend with no session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign a user in
    pub fn sign_in(&self, session: Session) {
        *self.session.lock() = Some(session);
    }

    /// Sign the current user out
    pub fn sign_out(&self) {
        *self.session.lock() = None;
    }

    /// Insert a row without emitting notifications
    pub fn seed(&self, table: &str, record: Record) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(record);
    }

    /// Snapshot of a table
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Make session lookups fail
    pub fn set_sessions_failing(&self, failing: bool) {
        self.faults.sessions.store(failing, Ordering::SeqCst);
    }

    /// Make `query_one` fail
    pub fn set_reads_failing(&self, failing: bool) {
        self.faults.reads.store(failing, Ordering::SeqCst);
    }

    /// Make `upsert` and `delete_where` fail
    pub fn set_writes_failing(&self, failing: bool) {
        self.faults.writes.store(failing, Ordering::SeqCst);
    }

    /// Make `subscribe` fail
    pub fn set_subscribe_failing(&self, failing: bool) {
        self.faults.subscribe.store(failing, Ordering::SeqCst);
    }

    /// Number of live subscriptions
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of upserts attempted
    #[inline]
    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Deliver a raw notification to matching subscribers
    ///
    /// Matching uses the `new` row, falling back to `old` for deletes.
    /// Subscribers whose receiver is gone are pruned.
    pub fn publish(&self, notification: ChangeNotification) {
        let row = notification
            .new
            .as_ref()
            .or(notification.old.as_ref())
            .and_then(Value::as_object);

        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if subscriber.table != notification.table {
                continue;
            }
            if !row.is_some_and(|r| subscriber.filter.matches(r)) {
                continue;
            }
            if subscriber.sender.send(notification.clone()).is_err() {
                closed.push(*entry.key());
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
        }
    }

    fn unavailable(what: &str) -> BackendError {
        BackendError::Unavailable(format!("{what} failing (injected)"))
    }
}

#[async_trait]
impl SessionProvider for InMemoryBackend {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        if self.faults.sessions.load(Ordering::SeqCst) {
            return Err(Self::unavailable("sessions"));
        }
        Ok(self.session.lock().clone())
    }

    async fn current_user_id(&self) -> Result<Option<UserId>, BackendError> {
        Ok(self.current_session().await?.map(|s| s.user_id))
    }
}

#[async_trait]
impl RecordStore for InMemoryBackend {
    async fn query_one(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, BackendError> {
        if self.faults.reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable("reads"));
        }

        let tables = self.tables.lock();
        let mut matches = tables
            .get(table)
            .into_iter()
            .flatten()
            .filter(|row| filter.matches(row));

        let first = matches.next().cloned();
        let extra = matches.count();
        if extra > 0 {
            return Err(BackendError::Ambiguous {
                table: table.to_string(),
                count: extra + 1,
            });
        }
        Ok(first)
    }

    async fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict_key: &str,
    ) -> Result<(), BackendError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable("writes"));
        }

        let Some(conflict_value) = record.get(conflict_key).cloned() else {
            return Err(BackendError::Malformed(format!(
                "row for {table} is missing conflict column {conflict_key}"
            )));
        };

        let notification = {
            let mut tables = self.tables.lock();
            let rows = tables.entry(table.to_string()).or_default();

            if let Some(existing) = rows
                .iter_mut()
                .find(|row| row.get(conflict_key) == Some(&conflict_value))
            {
                let old = existing.clone();
                for (column, value) in record {
                    existing.insert(column, value);
                }
                ChangeNotification {
                    table: table.to_string(),
                    kind: ChangeKind::Update,
                    new: Some(Value::Object(existing.clone())),
                    old: Some(Value::Object(old)),
                }
            } else {
                let mut row = record;
                row.entry("id".to_string())
                    .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
                rows.push(row.clone());
                ChangeNotification {
                    table: table.to_string(),
                    kind: ChangeKind::Insert,
                    new: Some(Value::Object(row)),
                    old: None,
                }
            }
        };

        self.publish(notification);
        Ok(())
    }

    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<(), BackendError> {
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable("writes"));
        }

        let removed: Vec<Record> = {
            let mut tables = self.tables.lock();
            let Some(rows) = tables.get_mut(table) else {
                return Ok(());
            };
            let (removed, kept): (Vec<Record>, Vec<Record>) =
                rows.drain(..).partition(|row| filter.matches(row));
            *rows = kept;
            removed
        };

        for row in removed {
            self.publish(ChangeNotification {
                table: table.to_string(),
                kind: ChangeKind::Delete,
                new: None,
                old: Some(Value::Object(row)),
            });
        }
        Ok(())
    }
}

impl ChangeFeed for InMemoryBackend {
    fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, BackendError> {
        if self.faults.subscribe.load(Ordering::SeqCst) {
            return Err(Self::unavailable("subscribe"));
        }

        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.insert(
            id,
            Subscriber {
                table: table.to_string(),
                filter,
                sender,
            },
        );

        let subscribers = Arc::clone(&self.subscribers);
        let guard = SubscriptionGuard::new(move || {
            subscribers.remove(&id);
        });
        Ok(Subscription::new(receiver, guard))
    }
}
