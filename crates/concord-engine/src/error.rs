//! Error types for the reconciliation engine
//!
//! Covers:
//! - Read-only violations
//! - Path and pattern validation
//! - Store failures (files, record, cache)
//! - Handler failures during dispatch

use concord_store::StoreError;
use concord_tree::PathError;

/// Boxed error a change handler may fail with
pub type HandlerFailure = Box<dyn std::error::Error + Send + Sync>;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Mutation attempted while read-only
    #[error("config is read-only; mutation at '{0}' rejected")]
    ReadOnly(String),

    /// Malformed config path
    #[error("invalid config path: {0}")]
    InvalidPath(#[from] PathError),

    /// Malformed handler path pattern
    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Store layer failure (documents, record, cache)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A registered change handler failed
    ///
    /// Not caught by the dispatcher; remaining path processing in the
    /// operation is aborted.
    #[error("handler failed at '{path}': {source}")]
    Handler {
        /// Path the event was dispatched for
        path: String,
        /// The handler's error
        #[source]
        source: HandlerFailure,
    },
}
