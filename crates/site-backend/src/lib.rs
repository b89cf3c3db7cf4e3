//! Site Backend - collaborator ports for editable site content
//!
//! The content core never talks to a concrete backend directly. It consumes
//! four narrow ports:
//! - [`SessionProvider`]: who is viewing
//! - [`RecordStore`]: query / upsert / delete rows by an equality filter
//! - [`ChangeFeed`]: push notifications scoped to one table and filter
//! - [`LocalCache`]: a viewer-local durable key/value cache
//!
//! # Adapters
//!
//! - [`memory::InMemoryBackend`]: sessions, rows and change feed in process,
//!   with failure injection for tests
//! - [`cache::MemoryCache`] / [`cache::FileCache`]: moka-backed and
//!   JSON-file-backed local caches
//! - [`rest::RestStore`]: PostgREST-compatible HTTP record store
//!
//! # Example
//!
//! ```rust,ignore
//! use site_backend::prelude::*;
//!
//! # async fn example() -> Result<(), BackendError> {
//! let backend = InMemoryBackend::new();
//! let row = SiteContentRecord::new("hero-title", "Hello").into_record()?;
//! backend.upsert(tables::SITE_CONTENT, row, tables::CONTENT_CONFLICT_KEY).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod error;
pub mod memory;
pub mod ports;
pub mod rest;
pub mod types;

pub use cache::{FileCache, MemoryCache};
pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use ports::{
    ChangeFeed, LocalCache, RecordStore, SessionProvider, Subscription, SubscriptionGuard,
};
pub use rest::{DisabledFeed, RestConfig, RestStore, StaticSession};
pub use types::{
    decode, encode, tables, ChangeKind, ChangeNotification, Filter, ProfileRecord, Record, Session,
    SiteContentRecord, UserId,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the backend ports
    pub use crate::error::BackendError;
    pub use crate::memory::InMemoryBackend;
    pub use crate::ports::{ChangeFeed, LocalCache, RecordStore, SessionProvider, Subscription};
    pub use crate::types::{
        tables, ChangeKind, ChangeNotification, Filter, ProfileRecord, Record, Session,
        SiteContentRecord, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
