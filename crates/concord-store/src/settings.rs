//! Engine settings
//!
//! Constructor-supplied configuration for the sync engine, no ambient
//! global state. Hosts build one with [`SyncSettings::new`] and the `with_*`
//! methods.

use std::path::PathBuf;

/// Default base document filename
pub const DEFAULT_BASE_FILENAME: &str = "project.yaml";

/// Settings for a config sync instance
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Whether mutation is forbidden
    pub read_only: bool,
    /// Whether config lives in YAML files (vs. snapshot-only mode)
    pub use_files: bool,
    /// Directory holding the base document and its imports
    pub base_dir: PathBuf,
    /// Filename of the base document within `base_dir`
    pub base_filename: String,
    /// Schema version of the hosting codebase
    pub schema_version: String,
}

impl SyncSettings {
    /// Create settings for a config directory, with defaults:
    /// writable, file-backed, base document `project.yaml`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            read_only: false,
            use_files: true,
            base_dir: base_dir.into(),
            base_filename: DEFAULT_BASE_FILENAME.to_string(),
            schema_version: String::new(),
        }
    }

    /// Set read-only mode
    #[inline]
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Toggle file-backed mode
    #[inline]
    #[must_use]
    pub fn with_use_files(mut self, use_files: bool) -> Self {
        self.use_files = use_files;
        self
    }

    /// Override the base document filename
    #[inline]
    #[must_use]
    pub fn with_base_filename(mut self, filename: impl Into<String>) -> Self {
        self.base_filename = filename.into();
        self
    }

    /// Set the host schema version
    #[inline]
    #[must_use]
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    /// Absolute path of the base document
    #[inline]
    #[must_use]
    pub fn base_file(&self) -> PathBuf {
        self.base_dir.join(&self.base_filename)
    }
}
