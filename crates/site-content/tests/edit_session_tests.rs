use async_trait::async_trait;
use pretty_assertions::assert_eq;
use site_backend::{tables, BackendError, Filter, InMemoryBackend, LocalCache, Record, RecordStore};
use site_content::{
    ContentConfig, ContentKey, ContentServices, ContentSource, EditError, EditState,
    EditableContent, FallbackNode, SaveOutcome, SlotView,
};
use site_test_utils::{settled, wait_for_state, TestSite};
use std::sync::Arc;
use std::time::Duration;

/// Record store over the in-memory backend with slow content access
struct ThrottledStore {
    inner: Arc<InMemoryBackend>,
    read_delay: Duration,
    write_delay: Duration,
    crash_on_write: bool,
}

impl ThrottledStore {
    fn new(site: &TestSite) -> Self {
        Self {
            inner: site.backend.clone(),
            read_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
            crash_on_write: false,
        }
    }

    fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    fn crashing_on_write(mut self) -> Self {
        self.crash_on_write = true;
        self
    }
}

#[async_trait]
impl RecordStore for ThrottledStore {
    async fn query_one(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, BackendError> {
        if table == tables::SITE_CONTENT {
            tokio::time::sleep(self.read_delay).await;
        }
        self.inner.query_one(table, filter).await
    }

    async fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict_key: &str,
    ) -> Result<(), BackendError> {
        tokio::time::sleep(self.write_delay).await;
        if self.crash_on_write {
            panic!("content store crashed mid-write");
        }
        self.inner.upsert(table, record, conflict_key).await
    }

    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<(), BackendError> {
        self.inner.delete_where(table, filter).await
    }
}

fn mount_through(site: &TestSite, store: ThrottledStore) -> EditableContent {
    let services = ContentServices::new(
        site.backend.clone(),
        Arc::new(store),
        site.backend.clone(),
        site.cache.clone(),
    );
    EditableContent::mount(
        ContentKey::new("hero-title").unwrap(),
        &FallbackNode::text("Default Title"),
        &services,
        &ContentConfig::default(),
    )
}

async fn editing_site(stored: &str) -> (TestSite, site_content::EditableContent) {
    let site = TestSite::with_editor();
    site.store_content("hero-title", stored);
    let slot = site.mount("hero-title", "Default Title");
    settled(&slot).await;
    (site, slot)
}

#[tokio::test]
async fn test_successful_save_persists_and_clears_cache() {
    let (site, slot) = editing_site("Old Title").await;
    site.cache.set("content_hero-title", "Stale local copy").await;

    slot.begin_edit().unwrap();
    assert_eq!(slot.snapshot().draft(), Some("Old Title"));
    slot.update_draft("New Title").unwrap();

    let outcome = slot.save().await.unwrap();

    assert_eq!(outcome, SaveOutcome::Persisted);
    let state = slot.snapshot();
    assert_eq!(state.resolved_value, "New Title");
    assert_eq!(state.edit, EditState::Viewing);
    assert!(state.advisory.is_none());
    assert!(site.cache.get("content_hero-title").await.is_none());
    assert_eq!(site.stored_content("hero-title").as_deref(), Some("New Title"));
}

#[tokio::test]
async fn test_failed_save_keeps_local_copy_with_advisory() {
    let (site, slot) = editing_site("Old Title").await;
    site.backend.set_writes_failing(true);

    slot.begin_edit().unwrap();
    slot.update_draft("New Title").unwrap();
    let outcome = slot.save().await.unwrap();

    let SaveOutcome::SavedLocally { advisory } = outcome else {
        panic!("expected local save, got {outcome:?}");
    };
    assert!(advisory.starts_with("Saved locally"));

    let state = slot.snapshot();
    assert_eq!(state.resolved_value, "New Title");
    assert_eq!(state.source, ContentSource::Cache);
    assert_eq!(state.edit, EditState::Viewing);
    assert_eq!(state.advisory.as_deref(), Some(advisory.as_str()));
    assert_eq!(
        site.cache.get("content_hero-title").await.as_deref(),
        Some("New Title")
    );
    assert_eq!(site.stored_content("hero-title").as_deref(), Some("Old Title"));
}

#[tokio::test]
async fn test_blank_draft_is_not_saved() {
    let (site, slot) = editing_site("Old Title").await;

    slot.begin_edit().unwrap();
    slot.update_draft("   ").unwrap();
    let before = slot.snapshot();

    assert_eq!(slot.save().await, Err(EditError::EmptyDraft));

    assert_eq!(slot.snapshot(), before);
    assert_eq!(slot.snapshot().draft(), Some("   "));
    assert_eq!(site.backend.upsert_calls(), 0);
}

#[tokio::test]
async fn test_save_trims_draft() {
    let (site, slot) = editing_site("Old Title").await;

    slot.begin_edit().unwrap();
    slot.update_draft("  Padded Title \n").unwrap();
    slot.save().await.unwrap();

    assert_eq!(slot.snapshot().resolved_value, "Padded Title");
    assert_eq!(site.stored_content("hero-title").as_deref(), Some("Padded Title"));
}

#[tokio::test]
async fn test_cancel_restores_baseline() {
    let (site, slot) = editing_site("X").await;

    slot.begin_edit().unwrap();
    slot.update_draft("Y").unwrap();
    slot.cancel_edit().unwrap();

    let state = slot.snapshot();
    assert_eq!(state.resolved_value, "X");
    assert_eq!(state.edit, EditState::Viewing);
    assert_eq!(site.backend.upsert_calls(), 0);
}

#[tokio::test]
async fn test_next_edit_clears_advisory() {
    let (site, slot) = editing_site("Old Title").await;
    site.backend.set_writes_failing(true);
    slot.begin_edit().unwrap();
    slot.update_draft("Offline edit").unwrap();
    slot.save().await.unwrap();
    assert!(slot.snapshot().advisory.is_some());

    slot.begin_edit().unwrap();

    let state = slot.snapshot();
    assert!(state.advisory.is_none());
    assert_eq!(state.draft(), Some("Offline edit"));
}

#[tokio::test]
async fn test_illegal_transitions_leave_state_alone() {
    let (_site, slot) = editing_site("Old Title").await;

    assert_eq!(slot.update_draft("x"), Err(EditError::NotEditing));
    assert_eq!(slot.cancel_edit(), Err(EditError::NotEditing));
    assert_eq!(slot.save().await, Err(EditError::NotEditing));

    slot.begin_edit().unwrap();
    assert_eq!(slot.begin_edit(), Err(EditError::AlreadyEditing));
    assert!(slot.snapshot().edit.is_editing());
}

#[tokio::test]
async fn test_editor_view_tracks_session() {
    let (_site, slot) = editing_site("Old Title").await;

    let SlotView::Editor(editor) = slot.view() else {
        panic!("editor should get the editor view");
    };
    assert_eq!(editor.text, "Old Title");
    assert!(editor.draft.is_none());

    slot.begin_edit().unwrap();
    slot.update_draft("Draft").unwrap();
    let SlotView::Editor(editor) = slot.view() else {
        panic!("editor should get the editor view");
    };
    assert_eq!(editor.draft.as_deref(), Some("Draft"));
}

#[tokio::test]
async fn test_saved_content_is_seen_by_next_mount() {
    let (site, slot) = editing_site("Old Title").await;
    slot.begin_edit().unwrap();
    slot.update_draft("New Title").unwrap();
    slot.save().await.unwrap();
    slot.unmount();

    let again = site.mount("hero-title", "Default Title");
    assert_eq!(settled(&again).await.resolved_value, "New Title");
}

#[tokio::test(start_paused = true)]
async fn test_edit_cannot_start_before_content_loads() {
    let site = TestSite::with_editor();
    site.store_content("hero-title", "Stored Title");
    let slot = mount_through(
        &site,
        ThrottledStore::new(&site).with_read_delay(Duration::from_millis(200)),
    );

    let state = wait_for_state(&slot, Duration::from_secs(1), |s| s.authorization.resolved).await;
    assert!(state.authorization.can_edit());
    assert!(!state.loaded);
    assert_eq!(slot.begin_edit(), Err(EditError::NotLoaded));
    assert_eq!(slot.snapshot().edit, EditState::Viewing);

    settled(&slot).await;
    slot.begin_edit().unwrap();
    assert_eq!(slot.snapshot().draft(), Some("Stored Title"));

    assert_eq!(slot.save().await, Ok(SaveOutcome::Persisted));
    assert_eq!(site.stored_content("hero-title").as_deref(), Some("Stored Title"));
}

#[tokio::test]
async fn test_crashed_save_returns_to_viewing() {
    let site = TestSite::with_editor();
    site.store_content("hero-title", "Old Title");
    let slot = mount_through(&site, ThrottledStore::new(&site).crashing_on_write());
    settled(&slot).await;

    slot.begin_edit().unwrap();
    slot.update_draft("New Title").unwrap();

    assert_eq!(slot.save().await, Err(EditError::Interrupted));

    let state = slot.snapshot();
    assert_eq!(state.edit, EditState::Viewing);
    assert_eq!(state.advisory.as_deref(), Some("Save interrupted."));
    assert_eq!(state.resolved_value, "Old Title");
    assert_eq!(site.stored_content("hero-title").as_deref(), Some("Old Title"));

    slot.begin_edit().unwrap();
    assert!(slot.snapshot().advisory.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_save_still_settles() {
    let site = TestSite::with_editor();
    site.store_content("hero-title", "Old Title");
    let slot = mount_through(
        &site,
        ThrottledStore::new(&site).with_write_delay(Duration::from_millis(100)),
    );
    settled(&slot).await;

    slot.begin_edit().unwrap();
    slot.update_draft("New Title").unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(1), slot.save()).await;
    assert!(abandoned.is_err());
    assert!(slot.snapshot().edit.is_saving());

    let state = wait_for_state(&slot, Duration::from_secs(1), |s| s.edit == EditState::Viewing).await;
    assert_eq!(state.resolved_value, "New Title");
    assert!(state.advisory.is_none());
    assert_eq!(site.stored_content("hero-title").as_deref(), Some("New Title"));
}
