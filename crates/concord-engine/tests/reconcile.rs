//! End-to-end reconciliation over a file-backed config tree

use concord_engine::{ConfigSync, SyncError};
use concord_store::{MemoryInfoStore, MokaModificationCache, SyncSettings};
use concord_test_utils::{
    config_dir, engine_in, engine_with_store, init_tracing, preloaded_store, write_config, yaml,
    EventLog,
};
use concord_tree::ConfigValue;
use pretty_assertions::assert_eq;

#[test]
fn applies_added_items_from_base_and_imports() {
    init_tracing();
    let dir = config_dir();
    write_config(
        dir.path(),
        "project.yaml",
        "foo:\n  bar: 1\nimports:\n  - extra.yaml\n",
    );
    write_config(dir.path(), "extra.yaml", "baz: 2\n");

    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("foo", log.recorder()).unwrap();
    sync.on_add("baz", log.recorder()).unwrap();

    assert!(sync.changes_pending().unwrap());
    sync.apply_external_changes().unwrap();
    sync.flush().unwrap();

    // Both items sit at depth 1, so their relative order is unspecified.
    let fired: std::collections::BTreeSet<String> = log.paths().into_iter().collect();
    let expected: std::collections::BTreeSet<String> =
        ["foo", "baz"].iter().map(ToString::to_string).collect();
    assert_eq!(fired, expected);
    assert_eq!(sync.get("foo.bar").unwrap(), Some(ConfigValue::from(1i64)));
    assert_eq!(sync.get("baz").unwrap(), Some(ConfigValue::from(2i64)));
    assert!(sync.get("dateModified").unwrap().is_some());
}

#[test]
fn removed_changed_added_fire_in_that_order() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "mod:\n  b: 2\nfresh:\n  c: 3\n");

    let store = preloaded_store(&yaml("old:\n  a: 1\nmod:\n  b: 1\n"));
    let mut sync = engine_with_store(dir.path(), store);

    let log = EventLog::new();
    sync.on_remove("old", log.recorder()).unwrap();
    sync.on_update("mod", log.recorder()).unwrap();
    sync.on_add("fresh", log.recorder()).unwrap();

    sync.apply_external_changes().unwrap();

    assert_eq!(
        log.paths(),
        vec!["old".to_string(), "mod".to_string(), "fresh".to_string()]
    );
}

#[test]
fn deeper_items_processed_before_shallow_ones() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "zz: 1\na:\n  b:\n    c: 1\n");

    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("a.b", log.recorder()).unwrap();
    sync.on_add("zz", log.recorder()).unwrap();

    sync.apply_external_changes().unwrap();

    assert_eq!(log.paths(), vec!["a.b".to_string(), "zz".to_string()]);
}

#[test]
fn missing_base_file_is_regenerated_from_snapshot() {
    let dir = config_dir();
    let store = preloaded_store(&yaml("foo:\n  bar: 1\n"));
    let mut sync = engine_with_store(dir.path(), store);

    assert!(!sync.changes_pending().unwrap());

    let written = std::fs::read_to_string(dir.path().join("project.yaml")).unwrap();
    let tree: concord_tree::ConfigMap = serde_yaml::from_str(&written).unwrap();
    assert_eq!(tree, yaml("foo:\n  bar: 1\n"));
}

#[test]
fn matching_trees_have_no_pending_changes() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "foo:\n  bar: 1\n");

    let store = preloaded_store(&yaml("foo:\n  bar: 1\n"));
    let mut sync = engine_with_store(dir.path(), store);

    assert!(!sync.changes_pending().unwrap());
    assert!(sync.pending_changes().unwrap().is_empty());
}

#[test]
fn date_modified_and_imports_are_ignored_by_the_diff() {
    let dir = config_dir();
    write_config(
        dir.path(),
        "project.yaml",
        "dateModified: 999\nfoo:\n  bar: 1\nimports:\n  - extra.yaml\n",
    );
    write_config(dir.path(), "extra.yaml", "{}\n");

    let store = preloaded_store(&yaml("dateModified: 1\nfoo:\n  bar: 1\n"));
    let mut sync = engine_with_store(dir.path(), store);

    assert!(!sync.changes_pending().unwrap());
}

#[test]
fn handler_error_aborts_the_pass_and_leaves_the_snapshot_untouched() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "{}\n");

    let store = preloaded_store(&yaml("also:\n  b: 1\ngone:\n  a: 1\n"));
    let mut sync = engine_with_store(dir.path(), store);

    let log = EventLog::new();
    sync.on_remove("also", |_event| Err("refused".into()))
        .unwrap();
    sync.on_remove("gone", log.recorder()).unwrap();

    let err = sync.apply_external_changes().unwrap_err();
    assert!(matches!(err, SyncError::Handler { .. }));

    // "also" sorts before "gone"; the failure stops the pass there.
    assert!(log.is_empty());
    assert_eq!(sync.get("also.b").unwrap(), Some(ConfigValue::from(1i64)));
    assert_eq!(sync.get("gone.a").unwrap(), Some(ConfigValue::from(1i64)));
}

#[test]
fn summary_groups_pending_paths_by_item() {
    let dir = config_dir();
    write_config(
        dir.path(),
        "project.yaml",
        "sections:\n  abc:\n    name: News\n    handle: news\n",
    );

    let mut sync = engine_in(dir.path());
    let summary = sync.pending_change_summary().unwrap();

    assert_eq!(summary.added.len(), 1);
    assert!(summary.added.contains("sections.abc"));
    assert!(summary.changed.is_empty());
    assert!(summary.removed.is_empty());
}

#[test]
fn schema_version_gates_compatibility() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "system:\n  schemaVersion: 4.0.0\n");

    let make = |version: &str| {
        let settings = SyncSettings::new(dir.path()).with_schema_version(version);
        ConfigSync::new(
            settings,
            Box::new(MemoryInfoStore::new()),
            Box::new(MokaModificationCache::new()),
        )
    };

    assert!(!make("3.7.11").schema_versions_compatible().unwrap());
    assert!(make("4.0.0").schema_versions_compatible().unwrap());
    assert!(make("4.1.0").schema_versions_compatible().unwrap());
}

#[test]
fn config_without_schema_version_is_compatible() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "foo: 1\n");

    let settings = SyncSettings::new(dir.path()).with_schema_version("4.0.0");
    let mut sync = ConfigSync::new(
        settings,
        Box::new(MemoryInfoStore::new()),
        Box::new(MokaModificationCache::new()),
    );
    assert!(sync.schema_versions_compatible().unwrap());
}

#[test]
fn reconciled_callback_fires_after_the_pass() {
    let dir = config_dir();
    write_config(dir.path(), "project.yaml", "foo: 1\n");

    let mut sync = engine_in(dir.path());
    let fired = std::rc::Rc::new(std::cell::Cell::new(false));
    let flag = std::rc::Rc::clone(&fired);
    sync.on_reconciled(move || flag.set(true));

    sync.apply_external_changes().unwrap();
    assert!(fired.get());
}
