//! Testing utilities for Concord workspace
//!
//! Shared fixtures: temp config dirs, preloaded record stores, and
//! event-recording handlers.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use concord_engine::{ChangeEvent, ConfigSync, HandlerFailure};
use concord_store::{InfoRecord, MemoryInfoStore, MokaModificationCache, SyncSettings};
use concord_tree::ConfigMap;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

/// Install a trace subscriber honoring `RUST_LOG`, once per process
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Parse an inline YAML mapping into a config tree
pub fn yaml(source: &str) -> ConfigMap {
    serde_yaml::from_str(source).unwrap()
}

/// Fresh temp directory to hold config documents
pub fn config_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Write a YAML document under the config dir, creating subdirectories
pub fn write_config(dir: &Path, name: &str, source: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, source).unwrap();
}

/// Record store preloaded with an encoded stored snapshot
pub fn preloaded_store(tree: &ConfigMap) -> MemoryInfoStore {
    let mut record = InfoRecord::default();
    record.encode_config(tree).unwrap();
    MemoryInfoStore::with_record(record)
}

/// File-mode engine over `dir` with a fresh record store
pub fn engine_in(dir: &Path) -> ConfigSync {
    engine_with_store(dir, MemoryInfoStore::new())
}

/// File-mode engine over `dir` with the given record store
pub fn engine_with_store(dir: &Path, store: MemoryInfoStore) -> ConfigSync {
    let settings = SyncSettings::new(dir);
    ConfigSync::new(
        settings,
        Box::new(store),
        Box::new(MokaModificationCache::new()),
    )
}

/// Snapshot-only engine (no file layer) with the given record store
pub fn snapshot_engine(store: MemoryInfoStore) -> ConfigSync {
    let settings = SyncSettings::new("unused").with_use_files(false);
    ConfigSync::new(
        settings,
        Box::new(store),
        Box::new(MokaModificationCache::new()),
    )
}

/// Shared log of dispatched change events
///
/// Hand `recorder()` closures to the engine's registration methods and
/// inspect what fired afterwards.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that records every event it receives
    pub fn recorder(&self) -> impl FnMut(&ChangeEvent) -> Result<(), HandlerFailure> + 'static {
        let events = Rc::clone(&self.events);
        move |event| {
            events.borrow_mut().push(event.clone());
            Ok(())
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.borrow().clone()
    }

    /// Dispatched paths, in firing order
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.path.to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}
