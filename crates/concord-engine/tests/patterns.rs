//! `{uid}` path patterns: token capture and descendant re-triggering

use concord_test_utils::{
    config_dir, engine_in, preloaded_store, snapshot_engine, write_config, yaml, EventLog,
};
use concord_tree::{ConfigValue, Scalar};
use pretty_assertions::assert_eq;

#[test]
fn uid_tokens_are_captured_on_exact_matches() {
    let dir = config_dir();
    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("sections.{uid}", log.recorder()).unwrap();

    sync.set("sections.abc-123", ConfigValue::Map(yaml("name: News\n")))
        .unwrap();

    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path.to_string(), "sections.abc-123");
    assert_eq!(events[0].token_matches, vec!["abc-123".to_string()]);
}

#[test]
fn every_uid_placeholder_captures_its_segment() {
    let dir = config_dir();
    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("sites.{uid}.groups.{uid}", log.recorder())
        .unwrap();

    sync.set(
        "sites.s1.groups.g2",
        ConfigValue::Map(yaml("name: Editors\n")),
    )
    .unwrap();

    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].token_matches,
        vec!["s1".to_string(), "g2".to_string()]
    );
}

#[test]
fn descendant_change_retriggers_the_pattern_path() {
    let store = preloaded_store(&yaml("sections:\n  abc:\n    name: Old\n    handle: h\n"));
    let mut sync = snapshot_engine(store);
    let log = EventLog::new();
    sync.on_update("sections.{uid}", log.recorder()).unwrap();

    sync.set("sections.abc.name", "New").unwrap();

    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path.to_string(), "sections.abc");
    assert_eq!(events[0].token_matches, vec!["abc".to_string()]);

    // The handler sees the whole item, before and after.
    let old = events[0].old_value.as_ref().and_then(ConfigValue::as_map);
    let new = events[0].new_value.as_ref().and_then(ConfigValue::as_map);
    assert_eq!(
        old.and_then(|m| m.get("name")),
        Some(&ConfigValue::from("Old"))
    );
    assert_eq!(
        new.and_then(|m| m.get("name")),
        Some(&ConfigValue::from("New"))
    );
    assert_eq!(
        new.and_then(|m| m.get("handle")),
        Some(&ConfigValue::from("h"))
    );
}

#[test]
fn deep_add_below_a_pattern_fires_the_pattern_as_added() {
    let dir = config_dir();
    write_config(
        dir.path(),
        "project.yaml",
        "sections:\n  abc:\n    siteSettings:\n      s1:\n        uriFormat: news\n",
    );

    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("sections.{uid}", log.recorder()).unwrap();

    sync.apply_external_changes().unwrap();

    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path.to_string(), "sections.abc");
    assert_eq!(events[0].token_matches, vec!["abc".to_string()]);
}

#[test]
fn unrelated_paths_do_not_match() {
    let dir = config_dir();
    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("globals.{uid}", log.recorder()).unwrap();

    sync.set("sections.x", 1i64).unwrap();

    assert!(log.is_empty());
}

#[test]
fn processing_is_idempotent_per_path() {
    let dir = config_dir();
    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("foo.bar", log.recorder()).unwrap();

    sync.set("foo.bar", 5i64).unwrap();
    sync.process_path("foo.bar").unwrap();
    sync.process_path("foo.bar").unwrap();

    assert_eq!(log.len(), 1);
}

#[test]
fn explicit_null_counts_as_present() {
    let dir = config_dir();
    let mut sync = engine_in(dir.path());
    let log = EventLog::new();
    sync.on_add("flags.x", log.recorder()).unwrap();

    sync.set("flags.x", ConfigValue::Scalar(Scalar::Null)).unwrap();

    let events = log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].new_value,
        Some(ConfigValue::Scalar(Scalar::Null))
    );
    assert_eq!(
        sync.get("flags.x").unwrap(),
        Some(ConfigValue::Scalar(Scalar::Null))
    );
}
