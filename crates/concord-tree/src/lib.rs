//! Concord config tree model
//!
//! The value types and pure tree algorithms the reconciliation engine is
//! built on.
//!
//! # Core Concepts
//!
//! - [`ConfigValue`] / [`ConfigMap`]: tagged-union config trees (scalars,
//!   sequences, nested maps, never objects with identity)
//! - [`ConfigPath`]: dotted hierarchical addressing (`sections.3f2a.name`)
//! - [`flatten`] / [`unflatten`]: dotted-leaf form used for comparison
//! - [`diff`]: pending added/changed/removed item paths between two trees

mod diff;
mod flatten;
mod node;
mod path;
mod value;

pub use diff::{diff, PendingChanges};
pub use flatten::{flatten, unflatten, FlatMap};
pub use node::{merge_top_level, prune_empty, read, write};
pub use path::{ConfigPath, PathError};
pub use value::{canonical_json, ConfigMap, ConfigValue, Scalar};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
