//! Record shapes, filters and change notifications shared by all adapters

use crate::error::BackendError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A row as exchanged with a record store
pub type Record = serde_json::Map<String, Value>;

/// Table and column names
pub mod tables {
    /// Editable site copy, one row per content key
    pub const SITE_CONTENT: &str = "site_content";
    /// Per-user profile carrying the editor flag
    pub const PROFILES: &str = "profiles";
    /// Unique column used to upsert site content
    pub const CONTENT_CONFLICT_KEY: &str = "key";
    /// Profile identity column
    pub const PROFILE_ID: &str = "id";
}

/// Authenticated user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create user id
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current viewer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user
    pub user_id: UserId,
    /// Email, when the auth provider exposes it
    pub email: Option<String>,
    /// Bearer token for row-level security
    pub access_token: Option<String>,
}

impl Session {
    /// Create session for user
    #[inline]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: None,
            access_token: None,
        }
    }

    /// With email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With access token
    #[inline]
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Equality filter `column = value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// Column name
    pub column: String,
    /// Expected value
    pub value: String,
}

impl Filter {
    /// Create equality filter
    #[inline]
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Check whether a row satisfies the filter
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }

    /// PostgREST query form, e.g. `eq.hero-title`
    #[inline]
    #[must_use]
    pub fn postgrest_value(&self) -> String {
        format!("eq.{}", self.value)
    }
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// Row inserted
    Insert,
    /// Row updated
    Update,
    /// Row deleted
    Delete,
}

/// Raw change notification as delivered by a change feed
///
/// Payloads are untyped here; consumers decode and validate `new` before
/// acting on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// Table the change happened on
    pub table: String,
    /// Change kind
    pub kind: ChangeKind,
    /// Row after the change, if any
    pub new: Option<Value>,
    /// Row before the change, if any
    pub old: Option<Value>,
}

/// `site_content` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteContentRecord {
    /// Unique content key
    pub key: String,
    /// Stored copy
    pub content: String,
    /// Last write time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SiteContentRecord {
    /// Create row without a timestamp
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            updated_at: None,
        }
    }

    /// With update timestamp
    #[inline]
    #[must_use]
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Encode as a generic row
    ///
    /// # Errors
    /// - `BackendError::Malformed` if serialization does not yield an object
    pub fn into_record(self) -> Result<Record, BackendError> {
        encode(&self)
    }
}

/// `profiles` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// User id
    pub id: String,
    /// Editor flag; absent or null means not an editor
    #[serde(default)]
    pub is_admin: Option<bool>,
    /// Contact email, when stored
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileRecord {
    /// Whether this profile may edit content
    #[inline]
    #[must_use]
    pub fn is_editor(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }
}

/// Decode a generic row into a typed record
///
/// # Errors
/// - `BackendError::Malformed` if the row does not match `T`
pub fn decode<T: DeserializeOwned>(record: Record) -> Result<T, BackendError> {
    serde_json::from_value(Value::Object(record)).map_err(BackendError::from)
}

/// Encode a typed record into a generic row
///
/// # Errors
/// - `BackendError::Malformed` if `T` does not serialize to a JSON object
pub fn encode<T: Serialize>(value: &T) -> Result<Record, BackendError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Malformed(format!(
            "expected object, got {other}"
        ))),
    }
}
