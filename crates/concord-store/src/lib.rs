//! Concord store layer
//!
//! Everything the reconciliation engine needs from the outside world:
//!
//! - [`DocumentStore`]: the YAML document set (base file + transitive
//!   imports), parse memoization and deferred writes
//! - [`InfoStore`] / [`InfoRecord`]: the durable snapshot record
//! - [`ModificationCache`]: the file mtime staleness cache
//! - [`SyncSettings`]: constructor-supplied engine configuration

mod cache;
mod document;
mod error;
mod record;
mod settings;

pub use cache::{
    FileTimes, ModificationCache, MokaModificationCache, CACHE_DURATION, CACHE_KEY,
};
pub use document::{is_sandboxed, DocumentStore, IMPORTS_KEY};
pub use error::StoreError;
pub use record::{InfoRecord, InfoStore, MemoryInfoStore};
pub use settings::{SyncSettings, DEFAULT_BASE_FILENAME};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
