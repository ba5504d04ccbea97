//! Persisted filter settings.
//!
//! [`SettingsStore`] is an explicit handle over one settings file. Every
//! mutation made through it is written back immediately; `reload` picks up
//! edits made by another process. The file format follows the extension:
//! `.yaml`/`.yml`, `.toml`, anything else is JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::filter::{ColorHighlightRule, ProcessFilterConfig, ProcessFilterMode};

/// Default settings file name, resolved against the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "filter_settings.json";

/// Filter configuration shared with presenters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default)]
    pub filtering_enabled: bool,
    #[serde(default)]
    pub process_filter_mode: ProcessFilterMode,
    #[serde(default)]
    pub process_filters: Vec<String>,
    #[serde(default)]
    pub color_filters: Vec<ColorHighlightRule>,
}

impl FilterSettings {
    /// Settings written on first run: filtering off and a few common colours.
    pub fn with_default_colors() -> Self {
        Self {
            color_filters: vec![
                ColorHighlightRule::new("Error", "#FFFF4343"),
                ColorHighlightRule::new("Warning", "#FFFFD800"),
                ColorHighlightRule::new("Exception", "#FFFF0000"),
                ColorHighlightRule::new("Success", "#FF00FF00"),
            ],
            ..Self::default()
        }
    }

    pub fn process_filter(&self) -> ProcessFilterConfig {
        ProcessFilterConfig {
            enabled: self.filtering_enabled,
            mode: self.process_filter_mode,
            names: self.process_filters.clone(),
        }
    }

    /// Adds a process name unless an equal name (ignoring case) exists.
    /// Returns true if the list changed.
    pub fn add_process_filter(&mut self, name: &str) -> bool {
        let name = name.trim();
        let lowered = name.to_lowercase();
        if name.is_empty()
            || self
                .process_filters
                .iter()
                .any(|existing| existing.to_lowercase() == lowered)
        {
            return false;
        }
        self.process_filters.push(name.to_string());
        true
    }

    /// Removes a process name (ignoring case). Returns true if it was present.
    pub fn remove_process_filter(&mut self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        let before = self.process_filters.len();
        self.process_filters.retain(|existing| existing.to_lowercase() != name);
        self.process_filters.len() != before
    }

    /// Removes the colour rule at `index`, if any.
    pub fn remove_color_rule(&mut self, index: usize) -> Option<ColorHighlightRule> {
        (index < self.color_filters.len()).then(|| self.color_filters.remove(index))
    }

    /// Swaps the rule at `index` with its neighbour. Rules earlier in the list
    /// win, so moving up raises priority. Returns false at either end.
    pub fn move_color_rule(&mut self, index: usize, up: bool) -> bool {
        let len = self.color_filters.len();
        let target = match (up, index) {
            (true, i) if i > 0 && i < len => i - 1,
            (false, i) if i + 1 < len => i + 1,
            _ => return false,
        };
        self.color_filters.swap(index, target);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsFormat {
    Json,
    Yaml,
    Toml,
}

impl SettingsFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => SettingsFormat::Yaml,
            Some("toml") => SettingsFormat::Toml,
            _ => SettingsFormat::Json,
        }
    }

    fn parse(&self, content: &str) -> Result<FilterSettings, SettingsError> {
        match self {
            SettingsFormat::Json => serde_json::from_str(content).map_err(|e| SettingsError::Parse(e.to_string())),
            SettingsFormat::Yaml => serde_yaml::from_str(content).map_err(|e| SettingsError::Parse(e.to_string())),
            SettingsFormat::Toml => toml::from_str(content).map_err(|e| SettingsError::Parse(e.to_string())),
        }
    }

    fn render(&self, settings: &FilterSettings) -> Result<String, SettingsError> {
        match self {
            SettingsFormat::Json => {
                serde_json::to_string_pretty(settings).map_err(|e| SettingsError::Serialize(e.to_string()))
            }
            SettingsFormat::Yaml => {
                serde_yaml::to_string(settings).map_err(|e| SettingsError::Serialize(e.to_string()))
            }
            SettingsFormat::Toml => {
                toml::to_string_pretty(settings).map_err(|e| SettingsError::Serialize(e.to_string()))
            }
        }
    }
}

/// Handle over a settings file with write-through mutation.
pub struct SettingsStore {
    path: PathBuf,
    format: SettingsFormat,
    current: RwLock<FilterSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to (and saving) the defaults
    /// when the file is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SettingsFormat::from_path(&path);

        let loaded = if path.exists() {
            match read_settings(&path, format) {
                Ok(settings) => {
                    info!("Loaded filter settings from: {}", path.display());
                    Some(settings)
                }
                Err(e) => {
                    warn!("Failed to load filter settings from {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let store = Self {
            path,
            format,
            current: RwLock::new(loaded.clone().unwrap_or_else(FilterSettings::with_default_colors)),
        };

        if loaded.is_none() {
            // Failure is already logged by save; defaults stay in memory
            let _ = store.save();
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, replacing the in-memory settings.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let settings = read_settings(&self.path, self.format)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings;
        debug!("Reloaded filter settings from: {}", self.path.display());
        Ok(())
    }

    pub fn snapshot(&self) -> FilterSettings {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn process_filter(&self) -> ProcessFilterConfig {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .process_filter()
    }

    /// Applies `mutate` and writes the result to disk.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut FilterSettings) -> R) -> Result<R, SettingsError> {
        let (result, snapshot) = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let result = mutate(&mut current);
            (result, current.clone())
        };
        self.write(&snapshot)?;
        Ok(result)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let snapshot = self.snapshot();
        self.write(&snapshot)
    }

    pub fn set_filtering_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.update(|s| s.filtering_enabled = enabled)
    }

    pub fn set_process_filter_mode(&self, mode: ProcessFilterMode) -> Result<(), SettingsError> {
        self.update(|s| s.process_filter_mode = mode)
    }

    pub fn add_process_filter(&self, name: &str) -> Result<bool, SettingsError> {
        self.update(|s| s.add_process_filter(name))
    }

    pub fn remove_process_filter(&self, name: &str) -> Result<bool, SettingsError> {
        self.update(|s| s.remove_process_filter(name))
    }

    pub fn add_color_rule(&self, rule: ColorHighlightRule) -> Result<(), SettingsError> {
        self.update(|s| s.color_filters.push(rule))
    }

    pub fn remove_color_rule(&self, index: usize) -> Result<Option<ColorHighlightRule>, SettingsError> {
        self.update(|s| s.remove_color_rule(index))
    }

    pub fn move_color_rule(&self, index: usize, up: bool) -> Result<bool, SettingsError> {
        self.update(|s| s.move_color_rule(index, up))
    }

    fn write(&self, settings: &FilterSettings) -> Result<(), SettingsError> {
        let result = self
            .format
            .render(settings)
            .and_then(|content| fs::write(&self.path, content).map_err(SettingsError::from));
        if let Err(e) = &result {
            warn!("Failed to save filter settings to {}: {}", self.path.display(), e);
        }
        result
    }
}

fn read_settings(path: &Path, format: SettingsFormat) -> Result<FilterSettings, SettingsError> {
    let content = fs::read_to_string(path)?;
    format.parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_process_filter_dedupes() {
        let mut s = FilterSettings::default();
        assert!(s.add_process_filter(" App "));
        assert!(!s.add_process_filter("app"));
        assert!(!s.add_process_filter("   "));
        assert_eq!(s.process_filters, vec!["App"]);
        assert!(s.remove_process_filter("APP"));
        assert!(s.process_filters.is_empty());
    }

    #[test]
    fn test_color_rule_reordering_bounds() {
        let mut s = FilterSettings::with_default_colors();
        let first = s.color_filters[0].match_text.clone();
        let last = s.color_filters[3].match_text.clone();

        assert!(!s.move_color_rule(0, true));
        assert!(!s.move_color_rule(3, false));
        assert!(!s.move_color_rule(9, true));
        assert!(s.move_color_rule(0, false));
        assert_eq!(s.color_filters[1].match_text, first);

        assert!(s.remove_color_rule(9).is_none());
        assert_eq!(s.remove_color_rule(3).unwrap().match_text, last);
        assert_eq!(s.color_filters.len(), 3);
    }

    #[test]
    fn test_json_schema_keys() {
        let s = FilterSettings::with_default_colors();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["filteringEnabled"], false);
        assert_eq!(json["processFilterMode"], "Include");
        assert_eq!(json["colorFilters"][0]["matchText"], "Error");
        assert_eq!(json["colorFilters"][0]["colorHex"], "#FFFF4343");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SettingsFormat::from_path(Path::new("a.yml")), SettingsFormat::Yaml);
        assert_eq!(SettingsFormat::from_path(Path::new("a.toml")), SettingsFormat::Toml);
        assert_eq!(SettingsFormat::from_path(Path::new("a")), SettingsFormat::Json);
    }
}
