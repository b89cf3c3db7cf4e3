//! HTTP adapters for a PostgREST-style managed backend
//!
//! - [`RestStore`]: `RecordStore` over the `/rest/v1/{table}` endpoints
//! - [`StaticSession`]: a session fixed at construction (token from env)
//! - [`DisabledFeed`]: a change feed that is never available

use crate::error::BackendError;
use crate::ports::{ChangeFeed, RecordStore, SessionProvider, Subscription};
use crate::types::{Filter, Record, Session, UserId};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

/// Connection settings for [`RestStore`]
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://xyz.example.co`
    pub base_url: String,
    /// Public API key sent as `apikey`
    pub api_key: String,
    /// User access token; the API key is used as bearer when absent
    pub access_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RestConfig {
    /// Create config with a 10 second timeout
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// With user access token
    #[inline]
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint for a table
    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }
}

/// PostgREST-compatible record store
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    config: RestConfig,
}

impl RestStore {
    /// Build store and its HTTP client
    ///
    /// # Errors
    /// - `BackendError::Malformed` if the key or token is not a valid header value
    /// - `BackendError::Unavailable` if the HTTP client cannot be built
    pub fn new(config: RestConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&config.api_key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.bearer()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Connection settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, BackendError> {
    HeaderValue::from_str(raw).map_err(|e| BackendError::Malformed(e.to_string()))
}

#[async_trait]
impl RecordStore for RestStore {
    async fn query_one(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Option<Record>, BackendError> {
        let request = self
            .client
            .get(self.config.table_url(table))
            .query(&[("select", "*".to_string())])
            .query(&[(filter.column.as_str(), filter.postgrest_value())]);

        let mut rows: Vec<Record> = Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(BackendError::Ambiguous {
                table: table.to_string(),
                count,
            }),
        }
    }

    async fn upsert(
        &self,
        table: &str,
        record: Record,
        conflict_key: &str,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.config.table_url(table))
            .query(&[("on_conflict", conflict_key)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record]);

        Self::send(request).await.map(|_| ())
    }

    async fn delete_where(&self, table: &str, filter: &Filter) -> Result<(), BackendError> {
        let request = self
            .client
            .delete(self.config.table_url(table))
            .query(&[(filter.column.as_str(), filter.postgrest_value())]);

        Self::send(request).await.map(|_| ())
    }
}

/// Session provider returning a session fixed at construction
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    session: Option<Session>,
}

impl StaticSession {
    /// Signed-in viewer
    #[inline]
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Anonymous viewer
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.session.clone())
    }

    async fn current_user_id(&self) -> Result<Option<UserId>, BackendError> {
        Ok(self.session.as_ref().map(|s| s.user_id.clone()))
    }
}

/// Change feed that never delivers; subscribers fall back to no live updates
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledFeed;

impl ChangeFeed for DisabledFeed {
    fn subscribe(&self, table: &str, _filter: Filter) -> Result<Subscription, BackendError> {
        Err(BackendError::Unsupported(format!(
            "live updates for {table} are disabled"
        )))
    }
}
