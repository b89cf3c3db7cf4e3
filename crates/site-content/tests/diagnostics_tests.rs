use site_backend::{tables, Session};
use site_content::diagnostics::PROBE_KEY_PREFIX;
use site_content::{check_admin, probe_sync, AdminStatus, ContentError};
use site_test_utils::{TestSite, EDITOR_ID, VIEWER_ID};

#[tokio::test]
async fn test_check_admin_without_session() {
    let site = TestSite::new();

    let status = check_admin(site.backend.as_ref(), site.backend.as_ref()).await;

    assert_eq!(status, AdminStatus::default());
}

#[tokio::test]
async fn test_check_admin_for_editor() {
    let site = TestSite::with_editor();

    let status = check_admin(site.backend.as_ref(), site.backend.as_ref()).await;

    assert!(status.logged_in);
    assert!(status.is_admin);
    assert_eq!(status.user_id.as_deref(), Some(EDITOR_ID));
    assert_eq!(status.email.as_deref(), Some("editor@example.com"));
    assert!(status.error.is_none());
}

#[tokio::test]
async fn test_check_admin_for_viewer() {
    let site = TestSite::with_viewer();

    let status = check_admin(site.backend.as_ref(), site.backend.as_ref()).await;

    assert!(status.logged_in);
    assert!(!status.is_admin);
    assert_eq!(status.user_id.as_deref(), Some(VIEWER_ID));
}

#[tokio::test]
async fn test_check_admin_reports_lookup_errors() {
    let site = TestSite::new();
    site.backend.sign_in(Session::new("no-profile"));

    let status = check_admin(site.backend.as_ref(), site.backend.as_ref()).await;
    assert!(status.logged_in);
    assert!(!status.is_admin);
    assert!(status.error.is_some_and(|e| e.starts_with("Profile error")));

    site.backend.set_sessions_failing(true);
    let status = check_admin(site.backend.as_ref(), site.backend.as_ref()).await;
    assert!(!status.logged_in);
    assert!(status.error.is_some_and(|e| e.starts_with("Session error")));
}

#[tokio::test]
async fn test_probe_writes_and_cleans_up() {
    let site = TestSite::new();

    let probe = probe_sync(site.backend.as_ref()).await.unwrap();

    assert!(probe.key.starts_with(PROBE_KEY_PREFIX));
    assert!(probe.cleaned_up);
    assert!(site.backend.rows(tables::SITE_CONTENT).is_empty());
    assert_eq!(site.backend.upsert_calls(), 1);
}

#[tokio::test]
async fn test_probe_reports_rejected_write() {
    let site = TestSite::new();
    site.backend.set_writes_failing(true);

    let err = probe_sync(site.backend.as_ref()).await.unwrap_err();

    assert!(matches!(err, ContentError::Backend(e) if e.is_unavailable()));
}
