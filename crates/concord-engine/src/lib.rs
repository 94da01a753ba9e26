//! Concord reconciliation engine
//!
//! Keeps a declarative YAML config tree and a durable stored snapshot
//! converged by dispatching granular change events:
//!
//! - [`ConfigSync`]: accessors, mutators, reconciliation and deferred
//!   persistence over both trees
//! - [`ChangeEvent`] / [`ChangeKind`]: what handlers receive
//! - `{uid}` path patterns: registrations like `sections.{uid}` fire with
//!   the captured identifier, and changes below a registered path
//!   re-trigger evaluation at that path
//!
//! ```no_run
//! use concord_engine::ConfigSync;
//! use concord_store::{MemoryInfoStore, MokaModificationCache, SyncSettings};
//!
//! # fn main() -> Result<(), concord_engine::SyncError> {
//! let settings = SyncSettings::new("config");
//! let mut sync = ConfigSync::new(
//!     settings,
//!     Box::new(MemoryInfoStore::new()),
//!     Box::new(MokaModificationCache::new()),
//! );
//! sync.on_add("sections.{uid}", |event| {
//!     println!("section {} added", event.token_matches[0]);
//!     Ok(())
//! })?;
//! if sync.changes_pending()? {
//!     sync.apply_external_changes()?;
//!     sync.flush()?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod event;
mod registry;
mod sync;
mod version;

pub use error::{HandlerFailure, SyncError};
pub use event::{ChangeEvent, ChangeKind};
pub use registry::{Handler, UID_PATTERN};
pub use sync::{ChangeSummary, ConfigSync, DATE_MODIFIED_KEY, SCHEMA_VERSION_PATH};
pub use version::compare_versions;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
