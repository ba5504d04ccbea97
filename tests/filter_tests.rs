//! Integration tests for record filtering.
//!
//! These tests combine message rules, the process filter and colour rules
//! the way a presenter does when deciding what to show.

use dbwin_monitor::filter::{
    color_for, matches_process_filter, ColorHighlightRule, FilterEngine, FilterKind, FilterRule,
    MatchMode, ProcessFilterMode,
};
use dbwin_monitor::record::LogRecord;
use dbwin_monitor::settings::FilterSettings;

fn visible(engine: &FilterEngine, record: &LogRecord, rules: &[FilterRule], settings: &FilterSettings) -> bool {
    matches_process_filter(record, &settings.process_filter()) && engine.should_include(record, rules)
}

#[test]
fn test_include_rules_are_ored() {
    let engine = FilterEngine::new();
    let rules = vec![
        FilterRule::simple("alpha", FilterKind::Include),
        FilterRule::regex(r"beta\d", FilterKind::Include),
    ];

    assert!(engine.should_include(&LogRecord::new(1, "p", "ALPHA"), &rules));
    assert!(engine.should_include(&LogRecord::new(1, "p", "beta7"), &rules));
    assert!(!engine.should_include(&LogRecord::new(1, "p", "beta"), &rules));
}

#[test]
fn test_only_exclude_rules() {
    let engine = FilterEngine::new();
    let rules = vec![FilterRule::new("heartbeat", FilterKind::Exclude, MatchMode::Simple)];

    assert!(engine.should_include(&LogRecord::new(1, "p", "request done"), &rules));
    assert!(!engine.should_include(&LogRecord::new(1, "p", "HeartBeat tick"), &rules));
}

#[test]
fn test_process_and_message_filters_combine() {
    let engine = FilterEngine::new();
    let rules = vec![FilterRule::simple("error", FilterKind::Include)];

    let mut settings = FilterSettings::default();
    settings.filtering_enabled = true;
    settings.process_filter_mode = ProcessFilterMode::Exclude;
    settings.add_process_filter("noisy.exe");

    let quiet_error = LogRecord::new(1, "C:\\bin\\quiet.exe", "error: disk");
    let noisy_error = LogRecord::new(2, "noisy", "error: net");
    let quiet_info = LogRecord::new(3, "quiet", "started");

    assert!(visible(&engine, &quiet_error, &rules, &settings));
    assert!(!visible(&engine, &noisy_error, &rules, &settings));
    assert!(!visible(&engine, &quiet_info, &rules, &settings));

    settings.filtering_enabled = false;
    assert!(visible(&engine, &noisy_error, &rules, &settings));
}

#[test]
fn test_placeholder_names_filterable() {
    let mut settings = FilterSettings::default();
    settings.filtering_enabled = true;
    settings.add_process_filter("<4242>");

    let record = LogRecord::new(4242, "<4242>", "orphan");
    assert!(matches_process_filter(&record, &settings.process_filter()));
}

#[test]
fn test_default_colour_rules() {
    let settings = FilterSettings::with_default_colors();

    let error = color_for("Unhandled EXCEPTION: error", &settings.color_filters).unwrap();
    assert_eq!((error.r, error.g, error.b), (0xff, 0x43, 0x43));

    let success = color_for("build success", &settings.color_filters).unwrap();
    assert_eq!((success.r, success.g, success.b), (0x00, 0xff, 0x00));

    assert!(color_for("plain text", &settings.color_filters).is_none());
    assert!(color_for("", &[ColorHighlightRule::new("x", "#FF000000")]).is_none());
}

#[test]
fn test_engine_shared_across_threads() {
    let engine = std::sync::Arc::new(FilterEngine::new());
    let rules = std::sync::Arc::new(vec![FilterRule::regex(r"^id=\d+$", FilterKind::Include)]);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = std::sync::Arc::clone(&engine);
            let rules = std::sync::Arc::clone(&rules);
            std::thread::spawn(move || {
                (0..100).all(|i| engine.should_include(&LogRecord::new(t, "p", format!("id={i}")), &rules))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(engine.cache().len(), 1);
}
