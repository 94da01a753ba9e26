//! Config tree values
//!
//! Provides [`ConfigValue`], the tagged union every config tree is built
//! from, and [`ConfigMap`], the map type used for tree roots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// A nested config mapping from string key to value
///
/// `BTreeMap` keeps keys in canonical order, so serialized documents come
/// out sorted without an explicit sort pass.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// A value in a config tree
///
/// Keys are strings; values are scalars, sequences, or nested maps, never
/// objects with identity. Serialization is untagged so trees round-trip
/// through YAML and JSON without wrapper structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Leaf scalar
    Scalar(Scalar),
    /// Sequence of values
    ///
    /// Treated as a leaf by the diff engine and compared by equality.
    Sequence(Vec<ConfigValue>),
    /// Nested mapping
    Map(ConfigMap),
}

/// Scalar leaf values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Explicit null (`~` in YAML), distinct from an absent key
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
}

impl ConfigValue {
    /// Whether this value is a mapping
    #[inline]
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Borrow as a mapping, if this value is one
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Mutably borrow as a mapping, if this value is one
    #[inline]
    #[must_use]
    pub fn as_map_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as a string scalar, if this value is one
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Empty mapping value
    #[inline]
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(ConfigMap::new())
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Scalar(Scalar::String(value))
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(value: ConfigMap) -> Self {
        Self::Map(value)
    }
}

impl<V: Into<ConfigValue>> From<Vec<V>> for ConfigValue {
    fn from(values: Vec<V>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Canonical JSON form of a value
///
/// Structural (deep) equality for dispatch classification is defined as
/// equality of canonical forms, not reference or float-bit equality. Map
/// keys are already ordered by [`ConfigMap`].
#[must_use]
pub fn canonical_json(value: &ConfigValue) -> String {
    // BTreeMap ordering makes the output canonical; serialization of the
    // untagged enum cannot fail.
    serde_json::to_string(value).unwrap_or_default()
}
