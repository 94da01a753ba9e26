//! Tree traversal primitives
//!
//! Ordinary recursive functions over [`ConfigMap`] trees:
//! - [`read`] - lookup without creating intermediate nodes
//! - [`write`] - insert (creating intermediates) or delete
//! - [`prune_empty`] - drop empty nested maps before serialization
//! - [`merge_top_level`] - document merge where later top-level keys win

use crate::path::ConfigPath;
use crate::value::{ConfigMap, ConfigValue};

/// Read the value at `path`
///
/// Returns `None` if any segment is absent or a non-map value is reached
/// mid-path. Never creates intermediate nodes.
#[must_use]
pub fn read<'a>(tree: &'a ConfigMap, path: &ConfigPath) -> Option<&'a ConfigValue> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = tree.get(first)?;
    for segment in rest {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, or delete the key there when `value` is `None`
///
/// Writing creates intermediate maps as needed, replacing any non-map value
/// in the way. Deleting an absent path is a silent no-op; deleting also
/// prunes ancestor maps that become empty.
pub fn write(tree: &mut ConfigMap, path: &ConfigPath, value: Option<ConfigValue>) {
    let segments = path.segments();
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    match value {
        Some(value) => {
            if rest.is_empty() {
                tree.insert(first.clone(), value);
                return;
            }
            let child = tree
                .entry(first.clone())
                .or_insert_with(ConfigValue::empty_map);
            if !child.is_map() {
                *child = ConfigValue::empty_map();
            }
            if let ConfigValue::Map(child_map) = child {
                write(child_map, &ConfigPath::new(rest.to_vec()), Some(value));
            }
        }
        None => {
            delete(tree, segments);
        }
    }
}

/// Delete the key addressed by `segments`, pruning emptied ancestors
///
/// Returns whether anything was removed.
fn delete(tree: &mut ConfigMap, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };

    if rest.is_empty() {
        return tree.remove(first).is_some();
    }

    let Some(child) = tree.get_mut(first).and_then(ConfigValue::as_map_mut) else {
        return false;
    };

    let removed = delete(child, rest);
    if removed && child.is_empty() {
        tree.remove(first);
    }
    removed
}

/// Remove empty nested maps, recursively
///
/// Run before serializing a document so files never accumulate `key: {}`
/// leftovers. Key order needs no sorting; [`ConfigMap`] is ordered.
pub fn prune_empty(tree: &mut ConfigMap) {
    tree.retain(|_, value| {
        if let ConfigValue::Map(map) = value {
            prune_empty(map);
            !map.is_empty()
        } else {
            true
        }
    });
}

/// Merge `overlay` into `base` at the top level
///
/// Whole top-level nodes from `overlay` replace those in `base`; the merge
/// semantics of an ordered document list, where later files win.
pub fn merge_top_level(base: &mut ConfigMap, overlay: ConfigMap) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}
