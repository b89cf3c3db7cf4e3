//! Operator diagnostics: admin status, store write probe, schema DDL

use crate::error::ContentError;
use serde::Serialize;
use site_backend::{
    decode, tables, Filter, ProfileRecord, RecordStore, SessionProvider, SiteContentRecord,
};

/// DDL for the content table and its row-level security policies
pub const SETUP_SQL: &str = r#"CREATE TABLE IF NOT EXISTS site_content (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  key TEXT UNIQUE NOT NULL,
  content TEXT NOT NULL,
  created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
  updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);

ALTER TABLE site_content ENABLE ROW LEVEL SECURITY;

DROP POLICY IF EXISTS "Everyone can read site content" ON site_content;
DROP POLICY IF EXISTS "Only admins can modify site content" ON site_content;

CREATE POLICY "Everyone can read site content" ON site_content
  FOR SELECT USING (true);

CREATE POLICY "Only admins can modify site content" ON site_content
  FOR ALL USING (
    EXISTS (
      SELECT 1 FROM profiles
      WHERE id = auth.uid()
      AND is_admin = true
    )
  );
"#;

/// Prefix of rows written by [`probe_sync`]
pub const PROBE_KEY_PREFIX: &str = "test-content-";

/// Who the current session is and whether it may edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    /// A session exists
    pub logged_in: bool,
    /// The profile carries the editor flag
    pub is_admin: bool,
    /// Signed-in user id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Profile email, falling back to the session email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// What went wrong, if anything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report the current viewer's admin status
///
/// Unlike the authorization gate this surfaces lookup failures in `error`.
pub async fn check_admin(sessions: &dyn SessionProvider, store: &dyn RecordStore) -> AdminStatus {
    let session = match sessions.current_session().await {
        Ok(Some(session)) => session,
        Ok(None) => return AdminStatus::default(),
        Err(err) => {
            return AdminStatus {
                error: Some(format!("Session error: {err}")),
                ..AdminStatus::default()
            }
        }
    };

    let mut status = AdminStatus {
        logged_in: true,
        user_id: Some(session.user_id.to_string()),
        ..AdminStatus::default()
    };

    let filter = Filter::eq(tables::PROFILE_ID, session.user_id.as_str());
    let profile = match store.query_one(tables::PROFILES, &filter).await {
        Ok(Some(row)) => decode::<ProfileRecord>(row),
        Ok(None) => {
            status.error = Some("Profile error: no profile row".to_string());
            return status;
        }
        Err(err) => Err(err),
    };

    match profile {
        Ok(profile) => {
            status.is_admin = profile.is_editor();
            status.email = profile.email.or(session.email);
        }
        Err(err) => status.error = Some(format!("Profile error: {err}")),
    }
    status
}

/// Result of a store write probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncProbe {
    /// Key of the throwaway row
    pub key: String,
    /// Whether the row was deleted again
    pub cleaned_up: bool,
}

/// Check that the content table accepts writes
///
/// Writes a throwaway row and deletes it again. A failed delete is
/// reported in the result, not as an error.
///
/// # Errors
/// - `ContentError::Backend` if the write is rejected
pub async fn probe_sync(store: &dyn RecordStore) -> Result<SyncProbe, ContentError> {
    let key = format!(
        "{PROBE_KEY_PREFIX}{}",
        chrono::Utc::now().timestamp_millis()
    );
    let row = SiteContentRecord::new(key.as_str(), "Test content for real-time sync")
        .into_record()?;

    store
        .upsert(tables::SITE_CONTENT, row, tables::CONTENT_CONFLICT_KEY)
        .await?;

    let filter = Filter::eq(tables::CONTENT_CONFLICT_KEY, key.as_str());
    let cleaned_up = match store.delete_where(tables::SITE_CONTENT, &filter).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(%key, %err, "probe row was not cleaned up");
            false
        }
    };

    tracing::info!(%key, cleaned_up, "sync probe succeeded");
    Ok(SyncProbe { key, cleaned_up })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_sql_covers_table_and_policies() {
        assert!(SETUP_SQL.contains("key TEXT UNIQUE NOT NULL"));
        assert!(SETUP_SQL.contains("ENABLE ROW LEVEL SECURITY"));
        assert!(SETUP_SQL.contains("is_admin = true"));
    }

    #[test]
    fn admin_status_serializes_camel_case() {
        let status = AdminStatus {
            logged_in: true,
            user_id: Some("u1".to_string()),
            ..AdminStatus::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["loggedIn"], true);
        assert_eq!(json["userId"], "u1");
        assert!(json.get("error").is_none());
    }
}
