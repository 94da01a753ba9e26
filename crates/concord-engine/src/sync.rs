//! The config reconciliation service
//!
//! [`ConfigSync`] owns both trees, the external (file-derived) config and
//! the stored snapshot, and keeps them converged:
//! - `set`/`remove` mutate the owning document and immediately diff+dispatch
//!   the touched path
//! - `apply_external_changes` reconciles every pending difference in one
//!   pass: removed, then changed, then added
//! - `flush` performs all the deferred persistence at the end of the
//!   operation
//!
//! Single-threaded by design: one logical operation at a time, callers
//! serialize access themselves.

use crate::error::{HandlerFailure, SyncError};
use crate::event::{ChangeEvent, ChangeKind};
use crate::registry::HandlerRegistry;
use crate::version::compare_versions;
use concord_store::{
    DocumentStore, InfoStore, ModificationCache, StoreError, SyncSettings, IMPORTS_KEY,
};
use concord_tree::{
    canonical_json, diff, read, write, ConfigMap, ConfigPath, ConfigValue, PendingChanges,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

/// Top-level key stamped on the first mutation of an operation
pub const DATE_MODIFIED_KEY: &str = "dateModified";

/// Path holding the config's schema version
pub const SCHEMA_VERSION_PATH: &str = "system.schemaVersion";

/// Pending change paths reduced to their first two segments, per kind
///
/// Depth-1 paths carry no item identity and are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Added item groups
    pub added: BTreeSet<String>,
    /// Changed item groups
    pub changed: BTreeSet<String>,
    /// Removed item groups
    pub removed: BTreeSet<String>,
}

/// Declarative config synchronization engine
///
/// Collaborators are constructor-supplied: the document store is built from
/// the settings; the durable record store and the mtime cache are injected.
pub struct ConfigSync {
    settings: SyncSettings,
    info: Box<dyn InfoStore>,
    cache: Box<dyn ModificationCache>,
    documents: DocumentStore,
    registry: HandlerRegistry,
    /// Stored snapshot, lazily decoded from the info record
    stored: Option<ConfigMap>,
    /// External tree in snapshot-only mode (file mode merges documents)
    virtual_external: Option<ConfigMap>,
    /// Top-level node to owning file, lazily decoded from the info record
    config_map: Option<BTreeMap<String, PathBuf>>,
    /// Paths already dispatched this operation
    processed: HashSet<String>,
    timestamp_stamped: bool,
    map_dirty: bool,
    snapshot_dirty: bool,
    times_dirty: bool,
}

impl std::fmt::Debug for ConfigSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSync")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("processed", &self.processed.len())
            .field("map_dirty", &self.map_dirty)
            .field("snapshot_dirty", &self.snapshot_dirty)
            .finish_non_exhaustive()
    }
}

impl ConfigSync {
    /// Create an engine over the given collaborators
    #[must_use]
    pub fn new(
        settings: SyncSettings,
        info: Box<dyn InfoStore>,
        cache: Box<dyn ModificationCache>,
    ) -> Self {
        let documents = DocumentStore::new(settings.base_dir.clone(), settings.base_file());
        Self {
            settings,
            info,
            cache,
            documents,
            registry: HandlerRegistry::default(),
            stored: None,
            virtual_external: None,
            config_map: None,
            processed: HashSet::new(),
            timestamp_stamped: false,
            map_dirty: false,
            snapshot_dirty: false,
            times_dirty: false,
        }
    }

    // Accessors
    // ---------------------------------------------------------------------

    /// Value at `path` in the stored snapshot
    ///
    /// Absent paths read as `None`; no intermediate nodes are created.
    ///
    /// # Errors
    /// Propagates path and record failures.
    pub fn get(&mut self, path: &str) -> Result<Option<ConfigValue>, SyncError> {
        let path: ConfigPath = path.parse()?;
        let tree = self.stored_tree()?;
        Ok(read(tree, &path).cloned())
    }

    /// Value at `path` in the external (file-derived) tree
    ///
    /// # Errors
    /// Propagates path, parse and record failures.
    pub fn get_external(&mut self, path: &str) -> Result<Option<ConfigValue>, SyncError> {
        let path: ConfigPath = path.parse()?;
        self.external_value(&path)
    }

    // Mutation
    // ---------------------------------------------------------------------

    /// Set the value at `path` and dispatch the resulting change
    ///
    /// # Errors
    /// Returns [`SyncError::ReadOnly`] in read-only mode; propagates store
    /// and handler failures.
    pub fn set(&mut self, path: &str, value: impl Into<ConfigValue>) -> Result<(), SyncError> {
        self.write_value(path, Some(value.into()))
    }

    /// Remove the value at `path` and dispatch the resulting change
    ///
    /// Removing an absent path is a silent no-op.
    ///
    /// # Errors
    /// Returns [`SyncError::ReadOnly`] in read-only mode; propagates store
    /// and handler failures.
    pub fn remove(&mut self, path: &str) -> Result<(), SyncError> {
        self.write_value(path, None)
    }

    fn write_value(
        &mut self,
        path_str: &str,
        value: Option<ConfigValue>,
    ) -> Result<(), SyncError> {
        if self.settings.read_only {
            return Err(SyncError::ReadOnly(path_str.to_string()));
        }

        let path: ConfigPath = path_str.parse()?;

        // First mutation of the operation bumps the generation marker, once.
        if !self.timestamp_stamped {
            self.timestamp_stamped = true;
            let now = chrono::Utc::now().timestamp();
            self.write_value(DATE_MODIFIED_KEY, Some(ConfigValue::from(now)))?;
        }

        if self.settings.use_files {
            let top = path.segments()[0].clone();
            let base_file = self.documents.base_file().to_path_buf();

            let mut newly_mapped = false;
            let target = {
                let map = self.config_map_mut()?;
                if let Some(owner) = map.get(&top) {
                    owner.clone()
                } else {
                    // New top nodes route to the base document.
                    map.insert(top, base_file.clone());
                    newly_mapped = true;
                    base_file
                }
            };
            if newly_mapped {
                self.map_dirty = true;
            }

            let mut document = self.documents.document(&target)?.clone();
            write(&mut document, &path, value);
            self.documents.save(target, document);
        } else {
            self.ensure_virtual()?;
            if let Some(tree) = &mut self.virtual_external {
                write(tree, &path, value);
            }
        }

        // Ensure the fresh data is processed even if this path already was.
        self.processed.remove(&path.to_string());
        self.process(&path)
    }

    // Dispatch
    // ---------------------------------------------------------------------

    /// Diff and dispatch the change at a single path
    ///
    /// Idempotent per path within one operation: a second call without an
    /// intervening mutation at the path dispatches nothing.
    ///
    /// # Errors
    /// Propagates store and handler failures.
    pub fn process_path(&mut self, path: &str) -> Result<(), SyncError> {
        let path: ConfigPath = path.parse()?;
        self.process(&path)
    }

    fn process(&mut self, path: &ConfigPath) -> Result<(), SyncError> {
        let key = path.to_string();
        if self.processed.contains(&key) {
            return Ok(());
        }
        self.processed.insert(key);

        let old_value = {
            let tree = self.stored_tree()?;
            read(tree, path).cloned()
        };
        let new_value = self.external_value(path)?;

        // Presence-based classification: a falsy stored value is still
        // present, so a value change is always an update.
        let kind = match (&old_value, &new_value) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (Some(old), Some(new)) if canonical_json(old) != canonical_json(new) => {
                ChangeKind::Updated
            }
            _ => return Ok(()),
        };

        tracing::debug!(path = %path, kind = ?kind, "dispatching config change");
        let event = ChangeEvent::new(path.clone(), old_value, new_value.clone());
        let reprocess = self.registry.dispatch(kind, &event)?;

        // A change deep inside a registered subtree re-triggers evaluation
        // at the registered ancestor path, against the un-converged stored
        // tree.
        for base in reprocess {
            let base_path: ConfigPath = base.parse()?;
            self.process(&base_path)?;
        }

        // Converge the stored tree at this path and defer the durable
        // snapshot update.
        let stored = self.stored_tree_mut()?;
        write(stored, path, new_value);
        self.snapshot_dirty = true;
        self.times_dirty = true;
        Ok(())
    }

    // Registration
    // ---------------------------------------------------------------------

    /// Register a handler for items added at paths matching `pattern`
    ///
    /// `pattern` may contain `{uid}` placeholders; captured segments reach
    /// the handler as `token_matches`.
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidPattern`] for uncompilable patterns.
    pub fn on_add(
        &mut self,
        pattern: &str,
        handler: impl FnMut(&ChangeEvent) -> Result<(), HandlerFailure> + 'static,
    ) -> Result<(), SyncError> {
        self.registry
            .register(ChangeKind::Added, pattern, Box::new(handler))
    }

    /// Register a handler for items updated at paths matching `pattern`
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidPattern`] for uncompilable patterns.
    pub fn on_update(
        &mut self,
        pattern: &str,
        handler: impl FnMut(&ChangeEvent) -> Result<(), HandlerFailure> + 'static,
    ) -> Result<(), SyncError> {
        self.registry
            .register(ChangeKind::Updated, pattern, Box::new(handler))
    }

    /// Register a handler for items removed at paths matching `pattern`
    ///
    /// # Errors
    /// Returns [`SyncError::InvalidPattern`] for uncompilable patterns.
    pub fn on_remove(
        &mut self,
        pattern: &str,
        handler: impl FnMut(&ChangeEvent) -> Result<(), HandlerFailure> + 'static,
    ) -> Result<(), SyncError> {
        self.registry
            .register(ChangeKind::Removed, pattern, Box::new(handler))
    }

    /// Register a callback fired after a full reconciliation pass
    pub fn on_reconciled(&mut self, handler: impl FnMut() + 'static) {
        self.registry.register_completion(Box::new(handler));
    }

    // Reconciliation
    // ---------------------------------------------------------------------

    /// Apply every pending external change to the stored config
    ///
    /// Single pass: removed, then changed, then added; removals free
    /// identifiers before additions might reuse them. Any failure aborts
    /// the pass and propagates; re-running is safe.
    ///
    /// # Errors
    /// Propagates store and handler failures.
    pub fn apply_external_changes(&mut self) -> Result<(), SyncError> {
        tracing::info!("looking for pending config changes");

        // Work against the actual file layout, not the persisted map.
        if self.settings.use_files {
            self.config_map = Some(self.documents.node_locations()?);
        }

        let changes = self.pending_changes()?;

        if !changes.removed.is_empty() {
            tracing::info!(count = changes.removed.len(), "processing removed items");
            for path in &changes.removed {
                self.process(path)?;
            }
        }
        if !changes.changed.is_empty() {
            tracing::info!(count = changes.changed.len(), "processing changed items");
            for path in &changes.changed {
                self.process(path)?;
            }
        }
        if !changes.added.is_empty() {
            tracing::info!(count = changes.added.len(), "processing added items");
            for path in &changes.added {
                self.process(path)?;
            }
        }

        tracing::info!("reconciliation complete");
        self.registry.fire_completion();

        if !changes.is_empty() {
            // The snapshot adopts a fresh generation marker.
            let now = chrono::Utc::now().timestamp();
            let date_modified = ConfigPath::single(DATE_MODIFIED_KEY);
            let stored = self.stored_tree_mut()?;
            write(stored, &date_modified, Some(ConfigValue::from(now)));
            self.snapshot_dirty = true;
        }

        self.times_dirty = true;
        if self.settings.use_files {
            self.map_dirty = true;
        }
        Ok(())
    }

    /// Compute the pending change set between the external and stored trees
    ///
    /// Pure: volatile keys (`dateModified`, `imports`) are stripped from
    /// copies before comparison.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn pending_changes(&mut self) -> Result<PendingChanges, SyncError> {
        let mut external = self.external_tree()?;
        let mut stored = self.stored_tree()?.clone();
        for key in [DATE_MODIFIED_KEY, IMPORTS_KEY] {
            external.remove(key);
            stored.remove(key);
        }
        Ok(diff(&external, &stored))
    }

    /// Whether the external files hold changes not yet applied
    ///
    /// A missing base file is regenerated from the snapshot first. The
    /// mtime cache short-circuits the check; a clean diff re-caches the
    /// times. Always false in snapshot-only mode.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn changes_pending(&mut self) -> Result<bool, SyncError> {
        if !self.settings.use_files {
            return Ok(false);
        }

        if !self.documents.base_file_exists() {
            self.regenerate_from_stored()?;
            self.flush()?;
        }

        if self.files_modified() {
            if !self.pending_changes()?.is_empty() {
                return Ok(true);
            }
            self.refresh_file_times()?;
        }
        Ok(false)
    }

    /// Pending change paths grouped per kind, reduced to two segments
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn pending_change_summary(&mut self) -> Result<ChangeSummary, SyncError> {
        let changes = self.pending_changes()?;
        Ok(ChangeSummary {
            added: summarize(&changes.added),
            changed: summarize(&changes.changed),
            removed: summarize(&changes.removed),
        })
    }

    /// Whether the external config's schema version is supported by this
    /// codebase
    ///
    /// A config without a schema version is compatible.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn schema_versions_compatible(&mut self) -> Result<bool, SyncError> {
        let config_version = match self.get_external(SCHEMA_VERSION_PATH)? {
            Some(ConfigValue::Scalar(scalar)) => scalar.to_string(),
            _ => String::new(),
        };
        Ok(compare_versions(&self.settings.schema_version, &config_version) != Ordering::Less)
    }

    /// Write the stored snapshot back out as the base document (deferred)
    ///
    /// # Errors
    /// Propagates record failures.
    pub fn regenerate_from_stored(&mut self) -> Result<(), SyncError> {
        tracing::info!("regenerating base document from the stored config");
        let stored = self.stored_tree()?.clone();
        if self.settings.use_files {
            let base = self.documents.base_file().to_path_buf();
            self.documents.save(base, stored);
        } else {
            self.virtual_external = Some(stored);
        }
        self.times_dirty = true;
        Ok(())
    }

    // Deferred persistence
    // ---------------------------------------------------------------------

    /// Flush all deferred work: dirty documents, the info record, the mtime
    /// cache
    ///
    /// Invoked once at the natural end of an operation. Collapses any number
    /// of mutations into at most one write per touched document and one
    /// record save. Ends the operation: the processed-path set and the
    /// generation-marker guard reset.
    ///
    /// # Errors
    /// Propagates I/O and record failures; documents after a failing write
    /// stay dirty and unwritten.
    pub fn flush(&mut self) -> Result<(), SyncError> {
        if self.settings.use_files && self.documents.has_dirty() {
            let written = self.documents.write_dirty()?;
            tracing::info!(count = written.len(), "flushed config documents");
        }

        let map_dirty = self.map_dirty && self.settings.use_files;
        if map_dirty || self.snapshot_dirty {
            let mut record = self.info.load()?;
            if map_dirty {
                let map = self.documents.node_locations()?;
                record.encode_config_map(&map)?;
                self.config_map = Some(map);
            }
            if self.snapshot_dirty {
                let stored = self.stored_tree()?.clone();
                record.encode_config(&stored)?;
            }
            self.info.save(&record)?;
            tracing::debug!("updated durable info record");
            self.map_dirty = false;
            self.snapshot_dirty = false;
        }

        if self.times_dirty && self.settings.use_files {
            self.refresh_file_times()?;
        }

        self.processed.clear();
        self.timestamp_stamped = false;
        Ok(())
    }

    // Internals
    // ---------------------------------------------------------------------

    fn ensure_stored(&mut self) -> Result<(), SyncError> {
        if self.stored.is_none() {
            let record = self.info.load()?;
            self.stored = Some(record.decode_config()?);
        }
        Ok(())
    }

    fn stored_tree(&mut self) -> Result<&ConfigMap, SyncError> {
        self.ensure_stored()?;
        self.stored
            .as_ref()
            .ok_or(SyncError::Store(StoreError::MissingRecord))
    }

    fn stored_tree_mut(&mut self) -> Result<&mut ConfigMap, SyncError> {
        self.ensure_stored()?;
        self.stored
            .as_mut()
            .ok_or(SyncError::Store(StoreError::MissingRecord))
    }

    /// Snapshot-only mode emulates the external tree with a copy of the
    /// stored config, so comparisons keep working while events fire.
    fn ensure_virtual(&mut self) -> Result<(), SyncError> {
        if self.virtual_external.is_none() {
            self.virtual_external = Some(self.stored_tree()?.clone());
        }
        Ok(())
    }

    fn external_value(&mut self, path: &ConfigPath) -> Result<Option<ConfigValue>, SyncError> {
        if self.settings.use_files {
            let merged = self.documents.merged()?;
            Ok(read(merged, path).cloned())
        } else {
            self.ensure_virtual()?;
            Ok(self
                .virtual_external
                .as_ref()
                .and_then(|tree| read(tree, path))
                .cloned())
        }
    }

    fn external_tree(&mut self) -> Result<ConfigMap, SyncError> {
        if self.settings.use_files {
            Ok(self.documents.merged()?.clone())
        } else {
            self.ensure_virtual()?;
            Ok(self.virtual_external.clone().unwrap_or_default())
        }
    }

    fn config_map_mut(&mut self) -> Result<&mut BTreeMap<String, PathBuf>, SyncError> {
        if self.config_map.is_none() {
            let record = self.info.load()?;
            self.config_map = Some(record.decode_config_map()?);
        }
        self.config_map
            .as_mut()
            .ok_or(SyncError::Store(StoreError::MissingRecord))
    }

    /// Whether any cached file looks modified since last checked
    ///
    /// No live cache entry means "assume modified". An unchanged set
    /// refreshes the entry's TTL.
    fn files_modified(&mut self) -> bool {
        let Some(cached) = self.cache.load() else {
            return true;
        };
        if cached.is_empty() {
            return true;
        }

        for (file, cached_time) in &cached {
            let current = std::fs::metadata(file).and_then(|meta| meta.modified());
            match current {
                Ok(modified) if modified <= *cached_time => {}
                _ => return true,
            }
        }

        self.cache.store(cached);
        false
    }

    fn refresh_file_times(&mut self) -> Result<(), SyncError> {
        let times = self.documents.modified_times()?;
        self.cache.store(times);
        self.times_dirty = false;
        Ok(())
    }
}

fn summarize(paths: &[ConfigPath]) -> BTreeSet<String> {
    paths
        .iter()
        .filter(|path| path.depth() > 1)
        .map(|path| path.truncated(2).to_string())
        .collect()
}
