//! Tree diff engine
//!
//! Flattens two trees into dotted-leaf maps and computes the set of
//! top-level-changed item paths: added, changed, and removed.

use crate::flatten::flatten;
use crate::path::ConfigPath;
use crate::value::ConfigMap;
use std::collections::BTreeSet;

/// Pending change paths between an external and a stored tree
///
/// Each set holds the *immediate parent* of a differing leaf (the leaf
/// itself when it sits at the top level), deduplicated and ordered
/// deepest-first. The depth ordering approximates dependency order, it is
/// not a strict guarantee; consumers must tolerate redundant dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    /// Item paths present externally but not in the stored tree
    pub added: Vec<ConfigPath>,
    /// Item paths whose leaf values differ
    pub changed: Vec<ConfigPath>,
    /// Item paths present in the stored tree but gone externally
    pub removed: Vec<ConfigPath>,
}

impl PendingChanges {
    /// Whether no changes are pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Total number of pending item paths
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }
}

/// Compute pending changes between `external` and `stored`
///
/// Leaf comparison is strict equality with no type coercion. Callers strip
/// volatile keys (`dateModified`, `imports`) before diffing.
#[must_use]
pub fn diff(external: &ConfigMap, stored: &ConfigMap) -> PendingChanges {
    let flat_external = flatten(external);
    let mut flat_stored = flatten(stored);

    let mut added = BTreeSet::new();
    let mut changed = BTreeSet::new();

    for (leaf, value) in &flat_external {
        let item = item_path(leaf);
        match flat_stored.remove(leaf) {
            None => {
                added.insert(item);
            }
            Some(stored_value) if stored_value != *value => {
                changed.insert(item);
            }
            Some(_) => {}
        }
    }

    // Stored leaves the external pass never consumed are removals.
    let removed: BTreeSet<ConfigPath> = flat_stored.keys().map(item_path).collect();

    PendingChanges {
        added: deepest_first(added),
        changed: deepest_first(changed),
        removed: deepest_first(removed),
    }
}

/// The changed-item path for a leaf: its immediate parent, or the leaf
/// itself at the top level
fn item_path(leaf: &ConfigPath) -> ConfigPath {
    match leaf.parent() {
        Some(parent) if !parent.is_empty() => parent,
        _ => leaf.clone(),
    }
}

/// Deepest paths first; ties break lexicographically for determinism
fn deepest_first(paths: BTreeSet<ConfigPath>) -> Vec<ConfigPath> {
    let mut ordered: Vec<ConfigPath> = paths.into_iter().collect();
    ordered.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn tree(text: &str) -> ConfigMap {
        serde_yaml::from_str(text).unwrap()
    }

    fn paths(list: &[&str]) -> Vec<ConfigPath> {
        list.iter().map(|s| ConfigPath::from_str(s).unwrap()).collect()
    }

    #[test]
    fn new_item_marks_parent() {
        let changes = diff(&tree("a:\n  b: 1\n"), &ConfigMap::new());
        assert_eq!(changes.added, paths(&["a"]));
        assert!(changes.changed.is_empty());
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn removed_item_marks_parent() {
        let changes = diff(&ConfigMap::new(), &tree("a:\n  b: 1\n"));
        assert_eq!(changes.removed, paths(&["a"]));
        assert!(changes.added.is_empty());
    }

    #[test]
    fn changed_item_marks_parent() {
        let changes = diff(&tree("a:\n  b: 1\n"), &tree("a:\n  b: 2\n"));
        assert_eq!(changes.changed, paths(&["a"]));
        assert!(changes.added.is_empty());
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn equal_trees_have_no_changes() {
        let t = tree("a:\n  b: 1\nc: x\n");
        assert!(diff(&t, &t).is_empty());
    }

    #[test]
    fn top_level_leaf_is_its_own_item() {
        let changes = diff(&tree("a: 1\n"), &ConfigMap::new());
        assert_eq!(changes.added, paths(&["a"]));
    }

    #[test]
    fn no_type_coercion() {
        // "1" (string) vs 1 (int) is a change.
        let changes = diff(&tree("a:\n  b: '1'\n"), &tree("a:\n  b: 1\n"));
        assert_eq!(changes.changed, paths(&["a"]));
    }

    #[test]
    fn deepest_paths_first() {
        let external = tree("a:\n  b:\n    c:\n      leaf: 1\n  top: 2\n");
        let changes = diff(&external, &ConfigMap::new());
        assert_eq!(changes.added, paths(&["a.b.c", "a"]));
    }

    #[test]
    fn duplicate_parents_deduplicated() {
        let changes = diff(&tree("a:\n  b: 1\n  c: 2\n"), &ConfigMap::new());
        assert_eq!(changes.added, paths(&["a"]));
    }

    #[test]
    fn sequence_change_is_a_change() {
        let changes = diff(
            &tree("a:\n  list: [1, 2]\n"),
            &tree("a:\n  list: [1, 3]\n"),
        );
        assert_eq!(changes.changed, paths(&["a"]));
    }

    #[test]
    fn mixed_changes() {
        let external = tree("kept: 1\nfresh:\n  x: 1\nedited:\n  y: 2\n");
        let stored = tree("kept: 1\nedited:\n  y: 1\ngone:\n  z: 9\n");
        let changes = diff(&external, &stored);
        assert_eq!(changes.added, paths(&["fresh"]));
        assert_eq!(changes.changed, paths(&["edited"]));
        assert_eq!(changes.removed, paths(&["gone"]));
    }
}
