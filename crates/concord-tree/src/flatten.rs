//! Flattening between nested trees and dotted-leaf maps
//!
//! The diff engine compares trees in flattened form: a map from dotted path
//! to leaf value. Nested maps are recursed into; scalars and sequences are
//! leaves.

use crate::path::ConfigPath;
use crate::value::{ConfigMap, ConfigValue};
use std::collections::BTreeMap;

/// Flattened tree: dotted leaf path to leaf value
pub type FlatMap = BTreeMap<ConfigPath, ConfigValue>;

/// Flatten a tree into a dotted-leaf map
///
/// An empty nested map produces no leaves and is therefore invisible to the
/// diff, matching the prune-on-flush behavior.
#[must_use]
pub fn flatten(tree: &ConfigMap) -> FlatMap {
    let mut result = FlatMap::new();
    flatten_into(tree, &ConfigPath::new(Vec::new()), &mut result);
    result
}

fn flatten_into(tree: &ConfigMap, prefix: &ConfigPath, result: &mut FlatMap) {
    for (key, value) in tree {
        let path = prefix.child(key.clone());
        match value {
            ConfigValue::Map(nested) => flatten_into(nested, &path, result),
            leaf => {
                result.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuild a nested tree from a dotted-leaf map
#[must_use]
pub fn unflatten(flat: &FlatMap) -> ConfigMap {
    let mut tree = ConfigMap::new();
    for (path, value) in flat {
        crate::node::write(&mut tree, path, Some(value.clone()));
    }
    tree
}
