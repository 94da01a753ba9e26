//! Error types for the store layer
//!
//! Covers:
//! - Document reads/writes (file I/O, YAML syntax)
//! - Import resolution (sandbox violations)
//! - The durable info record (missing or undecodable)

use std::path::PathBuf;

/// Errors from the document store, info record or mtime cache
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error reading or writing a document
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid YAML (or not a mapping at the root)
    #[error("parse error in {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },

    /// Document could not be serialized for writing
    #[error("encode error for {path}: {source}")]
    Encode {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml::Error,
    },

    /// Import directive escapes the config root
    #[error("import '{0}' escapes the config directory")]
    ImportNotSandboxed(PathBuf),

    /// Required durable record is unavailable
    #[error("durable info record is unavailable")]
    MissingRecord,

    /// Stored snapshot or config map could not be decoded
    #[error("stored {field} could not be decoded: {source}")]
    Decode {
        /// Record field ("config" or "configMap")
        field: &'static str,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for a path
    pub fn parse(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
