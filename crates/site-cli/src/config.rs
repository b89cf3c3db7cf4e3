//! Backend settings from flags and environment

use anyhow::{Context, Result};
use clap::ArgMatches;
use site_backend::{
    DisabledFeed, FileCache, LocalCache, RecordStore, RestConfig, RestStore, Session,
    SessionProvider, StaticSession,
};
use site_content::ContentServices;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DEFAULT_CACHE_PATH: &str = ".site-content-cache.json";

/// Connection settings resolved from the command line
#[derive(Debug, Clone)]
pub(crate) struct BackendSettings {
    pub(crate) url: Option<String>,
    pub(crate) anon_key: Option<String>,
    pub(crate) access_token: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) cache_path: PathBuf,
    pub(crate) timeout: Duration,
}

impl BackendSettings {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Self {
        let text = |name: &str| matches.get_one::<String>(name).cloned();
        Self {
            url: text("url"),
            anon_key: text("anon-key"),
            access_token: text("access-token"),
            user_id: text("user-id"),
            cache_path: matches
                .get_one::<PathBuf>("cache")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            timeout: Duration::from_secs(
                matches.get_one::<u64>("timeout").copied().unwrap_or(10),
            ),
        }
    }

    pub(crate) fn session(&self) -> StaticSession {
        match &self.user_id {
            Some(user_id) => {
                let mut session = Session::new(user_id.as_str());
                if let Some(token) = &self.access_token {
                    session = session.with_access_token(token.as_str());
                }
                StaticSession::signed_in(session)
            }
            None => StaticSession::anonymous(),
        }
    }

    pub(crate) fn store(&self) -> Result<RestStore> {
        let url = self
            .url
            .as_deref()
            .context("backend URL missing: pass --url or set SITE_BACKEND_URL")?;
        let anon_key = self
            .anon_key
            .as_deref()
            .context("API key missing: pass --anon-key or set SITE_ANON_KEY")?;

        let mut config = RestConfig::new(url, anon_key).with_timeout(self.timeout);
        if let Some(token) = &self.access_token {
            config = config.with_access_token(token.as_str());
        }
        tracing::debug!(url, "using REST backend");
        RestStore::new(config).context("building REST client")
    }

    pub(crate) async fn services(&self) -> Result<ContentServices> {
        let sessions: Arc<dyn SessionProvider> = Arc::new(self.session());
        let store: Arc<dyn RecordStore> = Arc::new(self.store()?);
        let cache: Arc<dyn LocalCache> = Arc::new(
            FileCache::open(&self.cache_path)
                .await
                .with_context(|| format!("opening cache {}", self.cache_path.display()))?,
        );
        Ok(ContentServices::new(sessions, store, Arc::new(DisabledFeed), cache))
    }
}
