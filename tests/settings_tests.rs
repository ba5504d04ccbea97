//! Integration tests for filter settings persistence.
//!
//! These tests verify that settings files are created with defaults,
//! written through on every mutation and read back in every format.

use dbwin_monitor::filter::{color_for, ColorHighlightRule, ProcessFilterMode};
use dbwin_monitor::settings::FilterSettings;
use dbwin_monitor::{SettingsError, SettingsStore};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_created_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");

    let store = SettingsStore::load(&path);
    assert_eq!(store.snapshot(), FilterSettings::with_default_colors());
    assert!(path.exists());

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["colorFilters"].as_array().unwrap().len(), 4);
    assert_eq!(written["processFilters"].as_array().unwrap().len(), 0);
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");
    fs::write(&path, "{ not json").unwrap();

    let store = SettingsStore::load(&path);
    assert_eq!(store.snapshot(), FilterSettings::with_default_colors());
}

#[test]
fn test_mutations_write_through() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");
    let store = SettingsStore::load(&path);

    assert!(store.add_process_filter("worker.exe").unwrap());
    assert!(!store.add_process_filter("WORKER.EXE").unwrap());
    store.set_filtering_enabled(true).unwrap();
    store.set_process_filter_mode(ProcessFilterMode::Exclude).unwrap();
    store
        .add_color_rule(ColorHighlightRule::new("timeout", "#FFFFA500"))
        .unwrap();

    let reopened = SettingsStore::load(&path).snapshot();
    assert_eq!(reopened.process_filters, vec!["worker.exe"]);
    assert!(reopened.filtering_enabled);
    assert_eq!(reopened.process_filter_mode, ProcessFilterMode::Exclude);
    assert_eq!(reopened.color_filters.last().unwrap().match_text, "timeout");

    let filter = store.process_filter();
    assert!(filter.enabled);
    assert_eq!(filter.names, vec!["worker.exe"]);
}

#[test]
fn test_reload_sees_external_edits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");
    let running = SettingsStore::load(&path);
    let editor = SettingsStore::load(&path);

    editor.add_process_filter("late").unwrap();
    assert!(running.snapshot().process_filters.is_empty());

    running.reload().unwrap();
    assert_eq!(running.snapshot().process_filters, vec!["late"]);
}

#[test]
fn test_reload_of_deleted_file_fails_and_keeps_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");
    let store = SettingsStore::load(&path);
    store.add_process_filter("kept").unwrap();

    fs::remove_file(&path).unwrap();
    assert!(matches!(store.reload(), Err(SettingsError::Io(_))));
    assert_eq!(store.snapshot().process_filters, vec!["kept"]);
}

#[test]
fn test_yaml_and_toml_files() {
    let dir = TempDir::new().unwrap();

    for name in ["filters.yaml", "filters.toml"] {
        let path = dir.path().join(name);
        let store = SettingsStore::load(&path);
        store.add_process_filter("svc").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("processFilters"), "{name}: {content}");

        let reopened = SettingsStore::load(&path).snapshot();
        assert_eq!(reopened.process_filters, vec!["svc"], "{name}");
        assert_eq!(reopened.color_filters.len(), 4, "{name}");
    }
}

#[test]
fn test_unknown_fields_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");
    fs::write(&path, r#"{"processFilters": ["a"]}"#).unwrap();

    let settings = SettingsStore::load(&path).snapshot();
    assert_eq!(settings.process_filters, vec!["a"]);
    assert!(!settings.filtering_enabled);
    assert_eq!(settings.process_filter_mode, ProcessFilterMode::Include);
    assert!(settings.color_filters.is_empty());
}

#[test]
fn test_color_rule_order_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter_settings.json");
    let store = SettingsStore::load(&path);
    store
        .add_color_rule(ColorHighlightRule::new("error timeout", "#FFFFA500"))
        .unwrap();

    // Both "Error" and "error timeout" match; the earlier rule wins
    let message = "error timeout on socket";
    let error_colour = color_for(message, &store.snapshot().color_filters).unwrap();

    let last = store.snapshot().color_filters.len() - 1;
    for index in (1..=last).rev() {
        assert!(store.move_color_rule(index, true).unwrap());
    }
    assert!(!store.move_color_rule(0, true).unwrap());

    let reopened = SettingsStore::load(&path).snapshot();
    assert_eq!(reopened.color_filters[0].match_text, "error timeout");
    let promoted = color_for(message, &reopened.color_filters).unwrap();
    assert_ne!(promoted, error_colour);

    let removed = store.remove_color_rule(0).unwrap().unwrap();
    assert_eq!(removed.match_text, "error timeout");
    assert!(store.remove_color_rule(10).unwrap().is_none());
    assert_eq!(SettingsStore::load(&path).snapshot().color_filters.len(), 4);
}
