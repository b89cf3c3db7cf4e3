use futures::StreamExt;
use pretty_assertions::assert_eq;
use site_backend::{
    decode, tables, ChangeFeed, ChangeKind, FileCache, Filter, InMemoryBackend, LocalCache,
    RecordStore, SiteContentRecord,
};
use std::sync::Arc;

#[tokio::test]
async fn test_ports_through_trait_objects() {
    let backend = Arc::new(InMemoryBackend::new());
    let store: Arc<dyn RecordStore> = backend.clone();
    let feed: Arc<dyn ChangeFeed> = backend.clone();

    let mut subscription = feed
        .subscribe(tables::SITE_CONTENT, Filter::eq("key", "hero-title"))
        .unwrap();

    let row = SiteContentRecord::new("hero-title", "Hello").into_record().unwrap();
    store
        .upsert(tables::SITE_CONTENT, row, tables::CONTENT_CONFLICT_KEY)
        .await
        .unwrap();
    let row = SiteContentRecord::new("hero-title", "Hello again")
        .into_record()
        .unwrap();
    store
        .upsert(tables::SITE_CONTENT, row, tables::CONTENT_CONFLICT_KEY)
        .await
        .unwrap();

    let first = subscription.next().await.unwrap();
    let second = subscription.next().await.unwrap();
    assert_eq!(first.kind, ChangeKind::Insert);
    assert_eq!(second.kind, ChangeKind::Update);

    let stored = store
        .query_one(tables::SITE_CONTENT, &Filter::eq("key", "hero-title"))
        .await
        .unwrap()
        .unwrap();
    let record: SiteContentRecord = decode(stored).unwrap();
    assert_eq!(record.content, "Hello again");
    assert_eq!(backend.rows(tables::SITE_CONTENT).len(), 1);

    subscription.unsubscribe();
    assert_eq!(backend.subscriber_count(), 0);
}

#[tokio::test]
async fn test_file_cache_as_local_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");

    {
        let cache: Arc<dyn LocalCache> = Arc::new(FileCache::open(&path).await.unwrap());
        cache.set("content_hero-title", "Offline copy").await;
        cache.set("content_footer", "Footer").await;
        cache.remove("content_footer").await;
    }

    let reopened = FileCache::open(&path).await.unwrap();
    assert_eq!(
        reopened.get("content_hero-title").await.as_deref(),
        Some("Offline copy")
    );
    assert!(reopened.get("content_footer").await.is_none());
    assert_eq!(reopened.len().await, 1);
}
