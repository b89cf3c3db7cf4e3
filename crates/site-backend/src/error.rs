//! Error types for backend ports
//!
//! Every adapter maps its failures onto [`BackendError`] so the content
//! core can classify them without knowing which backend is in use.

use std::path::PathBuf;

/// Backend failure
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Backend could not be reached (network, service down, injected fault)
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered but refused the request
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP-style status code
        status: u16,
        /// Message returned by the backend
        message: String,
    },

    /// A single-row query matched more than one row
    #[error("query on {table} matched {count} rows, expected at most one")]
    Ambiguous {
        /// Table that was queried
        table: String,
        /// Number of rows matched
        count: usize,
    },

    /// Row could not be encoded or decoded
    #[error("malformed record: {0}")]
    Malformed(String),

    /// Operation not offered by this adapter
    #[error("not supported: {0}")]
    Unsupported(String),

    /// Local cache file could not be read or written
    #[error("cache io error at {path}: {source}")]
    CacheIo {
        /// Cache file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Create cache IO error for path
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Check if the backend could not be reached at all
    #[inline]
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = BackendError::Rejected {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert_eq!(err.to_string(), "request rejected (401): JWT expired");
    }

    #[test]
    fn unavailable_classification() {
        assert!(BackendError::Unavailable("down".to_string()).is_unavailable());
        assert!(!BackendError::Malformed("bad".to_string()).is_unavailable());
    }

    #[test]
    fn serde_errors_become_malformed() {
        let err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        assert!(matches!(BackendError::from(err), BackendError::Malformed(_)));
    }
}
