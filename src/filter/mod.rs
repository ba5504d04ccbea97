//! Rule evaluation for captured records.
//!
//! This module provides:
//! - `rules`: Include/Exclude/Highlight message rules and the regex cache
//! - `process`: Process-name include/exclude filtering
//! - `highlight`: Colour rules for decorating messages
//!
//! Evaluation never fails: an invalid regex simply never matches.

pub mod highlight;
pub mod process;
pub mod rules;

pub use highlight::{color_for, Argb, ColorHighlightRule};
pub use process::{
    is_process_match, matches_process_filter, normalize_process_name, ProcessFilterConfig,
    ProcessFilterMode,
};
pub use rules::{validate_rule, FilterKind, FilterRule, MatchMode, RegexCache};

use crate::record::LogRecord;
use rules::contains_ignore_case;

/// Evaluates message rules, caching compiled regex patterns across calls.
#[derive(Default)]
pub struct FilterEngine {
    cache: RegexCache,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tests one rule against a text. Empty patterns never match.
    pub fn is_match(&self, rule: &FilterRule, text: &str) -> bool {
        if rule.pattern().is_empty() {
            return false;
        }

        match rule.mode {
            MatchMode::Simple => contains_ignore_case(text, rule.pattern()),
            MatchMode::Regex => self
                .cache
                .get(rule.pattern())
                .is_some_and(|regex| regex.is_match(text)),
        }
    }

    /// Decides whether a record passes the message rules.
    ///
    /// Any matching Exclude rule rejects immediately. If Include rules exist
    /// at least one must match. Highlight rules are ignored.
    pub fn should_include(&self, record: &LogRecord, rules: &[FilterRule]) -> bool {
        let mut has_include = false;
        let mut matched_include = false;

        for rule in rules {
            match rule.kind {
                FilterKind::Exclude => {
                    if self.is_match(rule, &record.message) {
                        return false;
                    }
                }
                FilterKind::Include => {
                    has_include = true;
                    if !matched_include && self.is_match(rule, &record.message) {
                        matched_include = true;
                    }
                }
                FilterKind::Highlight => {}
            }
        }

        !has_include || matched_include
    }

    /// Highlight rules matching the record, in rule order.
    pub fn highlights<'a>(&self, record: &LogRecord, rules: &'a [FilterRule]) -> Vec<&'a FilterRule> {
        rules
            .iter()
            .filter(|rule| rule.kind == FilterKind::Highlight && self.is_match(rule, &record.message))
            .collect()
    }

    /// Changes a rule's pattern and drops the compiled form of the old one.
    pub fn set_rule_pattern(&self, rule: &mut FilterRule, pattern: impl Into<String>) {
        let old = rule.set_pattern(pattern);
        self.cache.invalidate(&old);
    }

    pub fn cache(&self) -> &RegexCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(1, "p", message)
    }

    #[test]
    fn test_no_rules_pass_everything() {
        let engine = FilterEngine::new();
        assert!(engine.should_include(&record("anything"), &[]));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let engine = FilterEngine::new();
        let rules = vec![
            FilterRule::simple("net", FilterKind::Include),
            FilterRule::simple("noise", FilterKind::Exclude),
        ];
        assert!(engine.should_include(&record("NET up"), &rules));
        assert!(!engine.should_include(&record("net noise"), &rules));
        assert!(!engine.should_include(&record("disk"), &rules));
    }

    #[test]
    fn test_highlight_does_not_filter() {
        let engine = FilterEngine::new();
        let rules = vec![FilterRule::simple("hot", FilterKind::Highlight)];
        assert!(engine.should_include(&record("cold"), &rules));
        assert!(engine.highlights(&record("cold"), &rules).is_empty());
        assert_eq!(engine.highlights(&record("HOT path"), &rules).len(), 1);
    }

    #[test]
    fn test_regex_rules_case_insensitive() {
        let engine = FilterEngine::new();
        let rules = vec![FilterRule::regex(r"^error \d+$", FilterKind::Include)];
        assert!(engine.should_include(&record("ERROR 42"), &rules));
        assert!(!engine.should_include(&record("error x"), &rules));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let engine = FilterEngine::new();
        let rules = vec![
            FilterRule::regex("(", FilterKind::Exclude),
            FilterRule::simple("ok", FilterKind::Include),
        ];
        assert!(engine.should_include(&record("ok ("), &rules));
    }

    #[test]
    fn test_pattern_change_recompiles() {
        let engine = FilterEngine::new();
        let mut rule = FilterRule::regex("^a", FilterKind::Include);
        assert!(engine.is_match(&rule, "abc"));
        engine.set_rule_pattern(&mut rule, "^b");
        assert!(!engine.is_match(&rule, "abc"));
        assert!(engine.is_match(&rule, "bcd"));
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let engine = FilterEngine::new();
        let rules = vec![FilterRule::simple("", FilterKind::Include)];
        assert!(!engine.should_include(&record("x"), &rules));
    }
}
