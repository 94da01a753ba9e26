//! YAML document store
//!
//! The one component that touches the filesystem. Owns:
//! - import resolution: the base document plus everything it transitively
//!   `imports`, depth-first in declared order, sandboxed to the config root
//! - per-file parse memoization for the life of the store
//! - the merged external tree (later documents win per top-level node)
//! - dirty tracking and deferred writes

use crate::error::StoreError;
use concord_tree::{merge_top_level, prune_empty, ConfigMap, ConfigValue};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Top-level key listing files to pull into the document set
pub const IMPORTS_KEY: &str = "imports";

/// File-backed config document set
#[derive(Debug)]
pub struct DocumentStore {
    base_dir: PathBuf,
    base_file: PathBuf,
    parsed: HashMap<PathBuf, ConfigMap>,
    file_list: Option<Vec<PathBuf>>,
    merged: Option<ConfigMap>,
    dirty: BTreeSet<PathBuf>,
}

impl DocumentStore {
    /// Create a store rooted at `base_dir` with the given base document
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, base_file: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            base_file: base_file.into(),
            parsed: HashMap::new(),
            file_list: None,
            merged: None,
            dirty: BTreeSet::new(),
        }
    }

    /// The base document path
    #[inline]
    #[must_use]
    pub fn base_file(&self) -> &Path {
        &self.base_file
    }

    /// Whether the base document exists on disk
    #[inline]
    #[must_use]
    pub fn base_file_exists(&self) -> bool {
        self.base_file.exists()
    }

    /// Parsed contents of a document, memoized
    ///
    /// A missing file parses as an empty document.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] / [`StoreError::Parse`] on unreadable or
    /// malformed files.
    pub fn document(&mut self, path: &Path) -> Result<&ConfigMap, StoreError> {
        if !self.parsed.contains_key(path) {
            let tree = Self::parse_file(path)?;
            self.parsed.insert(path.to_path_buf(), tree);
        }
        Ok(&self.parsed[path])
    }

    /// Replace a document's in-memory tree and mark it for deferred write
    pub fn save(&mut self, path: impl Into<PathBuf>, tree: ConfigMap) {
        let path = path.into();
        self.parsed.insert(path.clone(), tree);
        self.dirty.insert(path);
        self.merged = None;
    }

    /// The ordered document list: base file plus transitive imports
    ///
    /// Memoized for the life of the store; depth-first in declared import
    /// order. Imports that escape `base_dir` are rejected.
    ///
    /// # Errors
    /// Returns [`StoreError::ImportNotSandboxed`] for traversal attempts and
    /// propagates parse failures.
    pub fn file_list(&mut self) -> Result<Vec<PathBuf>, StoreError> {
        if let Some(list) = &self.file_list {
            return Ok(list.clone());
        }

        let mut list = Vec::new();
        let base = self.base_file.clone();
        self.collect_files(&base, &mut list)?;
        self.file_list = Some(list.clone());
        Ok(list)
    }

    fn collect_files(&mut self, file: &Path, list: &mut Vec<PathBuf>) -> Result<(), StoreError> {
        if list.iter().any(|known| known == file) {
            // Import cycles terminate here.
            return Ok(());
        }
        list.push(file.to_path_buf());

        let imports = match self.document(file)?.get(IMPORTS_KEY) {
            Some(ConfigValue::Sequence(entries)) => entries
                .iter()
                .filter_map(ConfigValue::as_str)
                .map(PathBuf::from)
                .collect(),
            _ => Vec::new(),
        };

        let file_dir = file.parent().unwrap_or(&self.base_dir).to_path_buf();
        for import in imports {
            if !is_sandboxed(&import) {
                return Err(StoreError::ImportNotSandboxed(import));
            }
            let resolved = file_dir.join(&import);
            self.collect_files(&resolved, list)?;
        }
        Ok(())
    }

    /// The merged external tree, memoized
    ///
    /// Documents are merged in file-list order: a later document's top-level
    /// nodes replace earlier ones.
    ///
    /// # Errors
    /// Propagates file-list and parse failures.
    pub fn merged(&mut self) -> Result<&ConfigMap, StoreError> {
        if self.merged.is_none() {
            let files = self.file_list()?;
            let mut combined = ConfigMap::new();
            for file in files {
                let tree = self.document(&file)?.clone();
                merge_top_level(&mut combined, tree);
            }
            self.merged = Some(combined);
        }
        Ok(self.merged.as_ref().unwrap_or(&EMPTY))
    }

    /// Top-level node to owning file, regenerated from the document list
    ///
    /// Later documents win, matching [`Self::merged`]; `imports` is never a
    /// mapped node.
    ///
    /// # Errors
    /// Propagates file-list and parse failures.
    pub fn node_locations(&mut self) -> Result<BTreeMap<String, PathBuf>, StoreError> {
        let files = self.file_list()?;
        let mut nodes = BTreeMap::new();
        for file in files {
            for key in self.document(&file)?.keys() {
                nodes.insert(key.clone(), file.clone());
            }
        }
        nodes.remove(IMPORTS_KEY);
        Ok(nodes)
    }

    /// Last-modified times for every document in the list
    ///
    /// Missing files report the epoch, so their later appearance registers
    /// as a modification.
    ///
    /// # Errors
    /// Propagates file-list and parse failures.
    pub fn modified_times(&mut self) -> Result<BTreeMap<PathBuf, SystemTime>, StoreError> {
        let files = self.file_list()?;
        let mut times = BTreeMap::new();
        for file in files {
            let modified = std::fs::metadata(&file)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            times.insert(file, modified);
        }
        Ok(times)
    }

    /// Whether any document awaits a deferred write
    #[inline]
    #[must_use]
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Write every dirty document to disk
    ///
    /// Trees are pruned of empty maps first; keys serialize in canonical
    /// order. Documents after a failing one stay unwritten and dirty.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] / [`StoreError::Encode`] for the failing
    /// document.
    pub fn write_dirty(&mut self) -> Result<Vec<PathBuf>, StoreError> {
        let pending: Vec<PathBuf> = self.dirty.iter().cloned().collect();
        let mut written = Vec::new();

        for file in pending {
            let mut tree = self.parsed.get(&file).cloned().unwrap_or_default();
            prune_empty(&mut tree);

            let text = serde_yaml::to_string(&tree).map_err(|source| StoreError::Encode {
                path: file.clone(),
                source,
            })?;

            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            std::fs::write(&file, text).map_err(|e| StoreError::io(&file, e))?;
            tracing::debug!(path = %file.display(), "wrote config document");

            self.dirty.remove(&file);
            written.push(file);
        }

        Ok(written)
    }

    fn parse_file(path: &Path) -> Result<ConfigMap, StoreError> {
        if !path.exists() {
            return Ok(ConfigMap::new());
        }
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        if text.trim().is_empty() {
            return Ok(ConfigMap::new());
        }
        serde_yaml::from_str(&text).map_err(|e| StoreError::parse(path, e))
    }
}

static EMPTY: ConfigMap = ConfigMap::new();

/// Whether an import path is confined to the config root
///
/// Relative, no parent traversal. Purely lexical; resolution never follows
/// the filesystem.
#[must_use]
pub fn is_sandboxed(path: &Path) -> bool {
    !path.is_absolute()
        && !path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}
