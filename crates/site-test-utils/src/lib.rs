//! Testing utilities for the site content workspace
//!
//! Shared backends, fixtures and waiting helpers.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde_json::json;
use site_backend::{
    tables, ChangeKind, ChangeNotification, InMemoryBackend, MemoryCache, ProfileRecord, Session,
    SiteContentRecord,
};
use site_content::{ContentConfig, ContentKey, ContentServices, EditableContent, FallbackNode, SlotSnapshot};
use std::sync::Arc;
use std::time::Duration;

pub const EDITOR_ID: &str = "editor-1";
pub const VIEWER_ID: &str = "viewer-1";

/// Backend, cache and services wired together
pub struct TestSite {
    pub backend: Arc<InMemoryBackend>,
    pub cache: Arc<MemoryCache>,
    pub services: ContentServices,
}

impl TestSite {
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let cache = Arc::new(MemoryCache::default());
        let services = ContentServices::from_backend(backend.clone(), cache.clone());
        Self {
            backend,
            cache,
            services,
        }
    }

    /// Signed-in editor with a profile row
    pub fn with_editor() -> Self {
        let site = Self::new();
        site.add_profile(EDITOR_ID, Some(true));
        site.backend
            .sign_in(Session::new(EDITOR_ID).with_email("editor@example.com"));
        site
    }

    /// Signed-in user whose profile is not an editor
    pub fn with_viewer() -> Self {
        let site = Self::new();
        site.add_profile(VIEWER_ID, Some(false));
        site.backend.sign_in(Session::new(VIEWER_ID));
        site
    }

    pub fn add_profile(&self, id: &str, is_admin: Option<bool>) {
        let profile = ProfileRecord {
            id: id.to_string(),
            is_admin,
            email: None,
        };
        let row = site_backend::encode(&profile).unwrap();
        self.backend.seed(tables::PROFILES, row);
    }

    pub fn store_content(&self, key: &str, content: &str) {
        self.backend.seed(
            tables::SITE_CONTENT,
            SiteContentRecord::new(key, content).into_record().unwrap(),
        );
    }

    pub fn store_content_at(&self, key: &str, content: &str, at: DateTime<Utc>) {
        self.backend.seed(
            tables::SITE_CONTENT,
            SiteContentRecord::new(key, content)
                .with_updated_at(at)
                .into_record()
                .unwrap(),
        );
    }

    pub fn stored_content(&self, key: &str) -> Option<String> {
        self.backend
            .rows(tables::SITE_CONTENT)
            .into_iter()
            .find(|row| row.get("key").and_then(|k| k.as_str()) == Some(key))
            .and_then(|row| row.get("content").and_then(|c| c.as_str()).map(str::to_string))
    }

    pub fn mount(&self, key: &str, fallback: &str) -> EditableContent {
        self.mount_with(key, &FallbackNode::text(fallback), &ContentConfig::default())
    }

    pub fn mount_with(
        &self,
        key: &str,
        fallback: &FallbackNode,
        config: &ContentConfig,
    ) -> EditableContent {
        EditableContent::mount(ContentKey::new(key).unwrap(), fallback, &self.services, config)
    }
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

/// Update notification for a content row, as another session would cause
pub fn content_update(key: &str, content: &str) -> ChangeNotification {
    ChangeNotification {
        table: tables::SITE_CONTENT.to_string(),
        kind: ChangeKind::Update,
        new: Some(json!({"key": key, "content": content})),
        old: None,
    }
}

pub fn content_update_at(key: &str, content: &str, at: DateTime<Utc>) -> ChangeNotification {
    let mut notification = content_update(key, content);
    notification.new = Some(json!({"key": key, "content": content, "updated_at": at}));
    notification
}

/// `<h1>Welcome to <b>2024</b> edition</h1>` as a fallback tree
pub fn hero_fallback() -> FallbackNode {
    FallbackNode::composite([
        FallbackNode::text("Welcome to"),
        FallbackNode::composite([FallbackNode::Number(2024.0)]),
        FallbackNode::text("edition"),
    ])
}

/// Wait until `predicate` holds for the slot, or panic after `timeout`
pub async fn wait_for_state<F>(slot: &EditableContent, timeout: Duration, predicate: F) -> SlotSnapshot
where
    F: FnMut(&SlotSnapshot) -> bool,
{
    let mut receiver = slot.watch();
    let waited = tokio::time::timeout(timeout, receiver.wait_for(predicate)).await;
    let state = match waited {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => panic!("slot state channel closed"),
        Err(_) => panic!("timed out waiting for slot state: {:?}", slot.snapshot()),
    };
    state
}

/// Settled snapshot with a generous timeout
pub async fn settled(slot: &EditableContent) -> SlotSnapshot {
    tokio::time::timeout(Duration::from_secs(5), slot.settled())
        .await
        .expect("slot did not settle")
}
