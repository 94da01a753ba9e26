//! Modification-time cache
//!
//! A staleness-window approximation for "are there pending file changes",
//! never a correctness source of truth for file contents. The default
//! implementation keeps the file-to-mtime map in a moka cache with a long
//! TTL; hosts with a shared cache store can supply their own.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Cache key for the file times entry
pub const CACHE_KEY: &str = "concord.config.files";

/// How long cached file times stay valid (30 days)
pub const CACHE_DURATION: Duration = Duration::from_secs(2_592_000);

/// File path to last-known modification time
pub type FileTimes = BTreeMap<PathBuf, SystemTime>;

/// Store for cached config file modification times
pub trait ModificationCache {
    /// Load the cached times, if any entry is live
    fn load(&self) -> Option<FileTimes>;

    /// Store the times for [`CACHE_DURATION`]
    fn store(&self, times: FileTimes);
}

/// In-process moka-backed modification cache
#[derive(Debug)]
pub struct MokaModificationCache {
    inner: moka::sync::Cache<&'static str, FileTimes>,
}

impl MokaModificationCache {
    /// Create a cache with the standard TTL
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(CACHE_DURATION)
    }

    /// Create a cache with a custom TTL
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: moka::sync::Cache::builder()
                .max_capacity(1)
                .time_to_live(ttl)
                .build(),
        }
    }
}

impl Default for MokaModificationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ModificationCache for MokaModificationCache {
    fn load(&self) -> Option<FileTimes> {
        self.inner.get(&CACHE_KEY)
    }

    fn store(&self, times: FileTimes) {
        self.inner.insert(CACHE_KEY, times);
    }
}
