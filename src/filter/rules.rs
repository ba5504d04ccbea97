//! Message rules and the compiled-pattern cache behind regex matching.

use ahash::AHashMap as HashMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

use crate::error::FilterError;

/// Effect of a rule on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Include,
    Exclude,
    /// Decoration only, never affects inclusion.
    Highlight,
}

/// How a rule's pattern is matched against the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// Case-insensitive substring.
    #[default]
    Simple,
    /// Case-insensitive regular expression.
    Regex,
}

/// A single message rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pattern: String,
    pub kind: FilterKind,
    #[serde(default)]
    pub mode: MatchMode,
}

impl FilterRule {
    pub fn new(pattern: impl Into<String>, kind: FilterKind, mode: MatchMode) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            mode,
        }
    }

    pub fn simple(pattern: impl Into<String>, kind: FilterKind) -> Self {
        Self::new(pattern, kind, MatchMode::Simple)
    }

    pub fn regex(pattern: impl Into<String>, kind: FilterKind) -> Self {
        Self::new(pattern, kind, MatchMode::Regex)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Replaces the pattern, returning the previous one so callers can
    /// invalidate its compiled form.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) -> String {
        std::mem::replace(&mut self.pattern, pattern.into())
    }
}

/// Compiled matchers keyed by pattern string.
///
/// Invalid patterns are cached as `None` and never match.
#[derive(Default)]
pub struct RegexCache {
    compiled: RwLock<HashMap<String, Option<Arc<Regex>>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled matcher for `pattern`, compiling it on first use.
    pub fn get(&self, pattern: &str) -> Option<Arc<Regex>> {
        if let Some(entry) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
        {
            return entry.clone();
        }

        let compiled = match compile(pattern) {
            Ok(regex) => Some(Arc::new(regex)),
            Err(e) => {
                warn!(pattern, error = %e, "invalid regex rule will never match");
                None
            }
        };

        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pattern.to_string())
            .or_insert(compiled)
            .clone()
    }

    /// Drops the compiled form of `pattern`.
    pub fn invalidate(&self, pattern: &str) {
        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pattern);
    }

    pub fn len(&self) -> usize {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile(pattern: &str) -> Result<Regex, FilterError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| FilterError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}

/// Checks a rule at edit time. Simple rules always validate.
pub fn validate_rule(rule: &FilterRule) -> Result<(), FilterError> {
    match rule.mode {
        MatchMode::Simple => Ok(()),
        MatchMode::Regex => compile(rule.pattern()).map(|_| ()),
    }
}

/// Case-insensitive substring test.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
