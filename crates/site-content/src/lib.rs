//! Site Content - editable copy slots with live sync
//!
//! A slot is a named piece of site copy with a static fallback. Mounting a
//! slot runs four pieces:
//! - [`AuthorizationGate`]: is the viewer an editor (resolved once, fails safe)
//! - [`ContentResolver`]: store, then local cache, then flattened fallback
//! - live update listener: push notifications for the slot's key
//! - edit session: Viewing → Editing → Saving → Viewing, with a local-cache
//!   fallback when the store write fails
//!
//! # Example
//!
//! ```rust,ignore
//! use site_content::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(InMemoryBackend::new());
//! let services = ContentServices::from_backend(backend, Arc::new(MemoryCache::default()));
//!
//! let slot = EditableContent::mount(
//!     ContentKey::new("hero-title")?,
//!     &FallbackNode::text("Welcome"),
//!     &services,
//!     &ContentConfig::default(),
//! );
//! let state = slot.settled().await;
//! assert_eq!(state.resolved_value, "Welcome");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fallback;
pub mod key;
pub mod listener;
pub mod resolver;
pub mod services;
pub mod session;
pub mod slot;
pub mod state;
pub mod view;

pub use auth::{AuthorizationGate, ViewerAuthorization};
pub use config::{ConflictPolicy, ContentConfig};
pub use diagnostics::{check_admin, probe_sync, AdminStatus, SyncProbe, SETUP_SQL};
pub use error::{ContentError, EditError};
pub use fallback::FallbackNode;
pub use key::ContentKey;
pub use listener::ContentChange;
pub use resolver::{ContentResolver, ContentSource, Resolution};
pub use services::ContentServices;
pub use session::{advisory_for, EditSession, EditState, SaveOutcome};
pub use slot::EditableContent;
pub use state::SlotSnapshot;
pub use view::{EditorView, SlotView};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{ConflictPolicy, ContentConfig};
    pub use crate::error::{ContentError, EditError};
    pub use crate::fallback::FallbackNode;
    pub use crate::key::ContentKey;
    pub use crate::services::ContentServices;
    pub use crate::session::{EditState, SaveOutcome};
    pub use crate::slot::EditableContent;
    pub use crate::state::SlotSnapshot;
    pub use crate::view::SlotView;
    pub use site_backend::{InMemoryBackend, MemoryCache};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
