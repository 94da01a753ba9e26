//! Durable info record
//!
//! The persisted record the engine stores its snapshot in: two opaque text
//! fields, `config` (JSON-encoded stored tree) and `config_map` (JSON-encoded
//! top-level-node to file map). Hosts own the actual persistence (a database
//! row, usually); [`MemoryInfoStore`] covers tests and file-less hosts.

use crate::error::StoreError;
use concord_tree::ConfigMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// The durable record consumed by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRecord {
    /// JSON-encoded stored config tree (the last-applied snapshot)
    pub config: Option<String>,
    /// JSON-encoded config file map
    pub config_map: Option<String>,
}

impl InfoRecord {
    /// Decode the stored snapshot; absent means an empty tree
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] for undecodable data.
    pub fn decode_config(&self) -> Result<ConfigMap, StoreError> {
        match &self.config {
            None => Ok(ConfigMap::new()),
            Some(text) => serde_json::from_str(text).map_err(|source| StoreError::Decode {
                field: "config",
                source,
            }),
        }
    }

    /// Decode the config file map; absent means an empty map
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] for undecodable data.
    pub fn decode_config_map(&self) -> Result<BTreeMap<String, PathBuf>, StoreError> {
        match &self.config_map {
            None => Ok(BTreeMap::new()),
            Some(text) => serde_json::from_str(text).map_err(|source| StoreError::Decode {
                field: "configMap",
                source,
            }),
        }
    }

    /// Encode and set the stored snapshot
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] if the tree cannot be encoded.
    pub fn encode_config(&mut self, tree: &ConfigMap) -> Result<(), StoreError> {
        let text = serde_json::to_string(tree).map_err(|source| StoreError::Decode {
            field: "config",
            source,
        })?;
        self.config = Some(text);
        Ok(())
    }

    /// Encode and set the config file map
    ///
    /// # Errors
    /// Returns [`StoreError::Decode`] if the map cannot be encoded.
    pub fn encode_config_map(
        &mut self,
        map: &BTreeMap<String, PathBuf>,
    ) -> Result<(), StoreError> {
        let text = serde_json::to_string(map).map_err(|source| StoreError::Decode {
            field: "configMap",
            source,
        })?;
        self.config_map = Some(text);
        Ok(())
    }
}

/// Access to the durable info record
///
/// The engine loads lazily and saves at most once per flush.
pub trait InfoStore {
    /// Load the record
    ///
    /// # Errors
    /// Returns [`StoreError::MissingRecord`] when the record is unavailable.
    fn load(&self) -> Result<InfoRecord, StoreError>;

    /// Persist the record as a single durable update
    ///
    /// # Errors
    /// Returns a store error when persistence fails.
    fn save(&self, record: &InfoRecord) -> Result<(), StoreError>;
}

/// In-memory info store
///
/// Clones share the same record, so a caller can keep a handle to inspect
/// what the engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryInfoStore {
    record: Arc<Mutex<Option<InfoRecord>>>,
}

impl MemoryInfoStore {
    /// Create an empty store holding a default record
    #[must_use]
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(InfoRecord::default()))),
        }
    }

    /// Create a store preloaded with a record
    #[must_use]
    pub fn with_record(record: InfoRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// Create a store with no record at all, for missing-record scenarios
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            record: Arc::new(Mutex::new(None)),
        }
    }
}

impl InfoStore for MemoryInfoStore {
    fn load(&self) -> Result<InfoRecord, StoreError> {
        self.record
            .lock()
            .map_err(|_| StoreError::MissingRecord)?
            .clone()
            .ok_or(StoreError::MissingRecord)
    }

    fn save(&self, record: &InfoRecord) -> Result<(), StoreError> {
        *self.record.lock().map_err(|_| StoreError::MissingRecord)? = Some(record.clone());
        Ok(())
    }
}
