//! Filters command implementation.
//!
//! Shows and edits the persisted filter settings. Every edit is written to
//! the settings file immediately, so a running capture session picks it up
//! on its next reload.

use anyhow::bail;
use std::path::Path;

use dbwin_monitor::filter::{Argb, ColorHighlightRule, ProcessFilterMode};
use dbwin_monitor::settings::FilterSettings;
use dbwin_monitor::SettingsStore;

use crate::cli::{FilterAction, FilterModeArg};

/// Applies a filter settings action against the file at `path`.
pub fn command_filters(action: &FilterAction, path: &Path) -> anyhow::Result<()> {
    let store = SettingsStore::load(path);

    match action {
        FilterAction::Show => {
            print_settings(&store.snapshot(), store.path());
        }
        FilterAction::Add { name } => {
            if name.trim().is_empty() {
                bail!("process name must not be empty");
            }
            if store.add_process_filter(name)? {
                println!("✅ Added process filter: {}", name.trim());
            } else {
                println!("ℹ️  Process filter already present: {}", name.trim());
            }
        }
        FilterAction::Remove { name } => {
            if store.remove_process_filter(name)? {
                println!("✅ Removed process filter: {}", name.trim());
            } else {
                println!("ℹ️  Process filter not found: {}", name.trim());
            }
        }
        FilterAction::Mode { mode } => {
            let mode = match mode {
                FilterModeArg::Include => ProcessFilterMode::Include,
                FilterModeArg::Exclude => ProcessFilterMode::Exclude,
            };
            store.set_process_filter_mode(mode)?;
            println!("✅ Process filter mode: {:?}", mode);
        }
        FilterAction::Enable => {
            store.set_filtering_enabled(true)?;
            println!("✅ Process filtering enabled");
        }
        FilterAction::Disable => {
            store.set_filtering_enabled(false)?;
            println!("✅ Process filtering disabled");
        }
        FilterAction::Color { text, color } => {
            if text.trim().is_empty() {
                bail!("match text must not be empty");
            }
            if Argb::parse(color).is_none() {
                bail!("invalid colour '{}', expected #AARRGGBB or #RRGGBB", color);
            }
            store.add_color_rule(ColorHighlightRule::new(text.trim(), color.trim()))?;
            println!("✅ Added colour rule: {} -> {}", text.trim(), color.trim());
        }
        FilterAction::ColorRemove { index } => {
            let Some(position) = index.checked_sub(1) else {
                bail!("colour rule positions start at 1");
            };
            match store.remove_color_rule(position)? {
                Some(rule) => println!("✅ Removed colour rule {}: {}", index, rule.match_text),
                None => bail!("no colour rule at position {}", index),
            }
        }
        FilterAction::ColorUp { index } | FilterAction::ColorDown { index } => {
            let up = matches!(action, FilterAction::ColorUp { .. });
            let Some(position) = index.checked_sub(1) else {
                bail!("colour rule positions start at 1");
            };
            if position >= store.snapshot().color_filters.len() {
                bail!("no colour rule at position {}", index);
            }
            if store.move_color_rule(position, up)? {
                println!("✅ Moved colour rule {} {}", index, if up { "up" } else { "down" });
            } else {
                println!("ℹ️  Colour rule {} is already {}", index, if up { "first" } else { "last" });
            }
        }
    }

    Ok(())
}

fn print_settings(settings: &FilterSettings, path: &Path) {
    println!("📄 Filter settings: {}", path.display());
    println!(
        "   Process filtering: {}",
        if settings.filtering_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("   Mode: {:?}", settings.process_filter_mode);

    if settings.process_filters.is_empty() {
        println!("   Processes: (none)");
    } else {
        println!("   Processes:");
        for name in &settings.process_filters {
            println!("   ├─ {}", name);
        }
    }

    if settings.color_filters.is_empty() {
        println!("   Colour rules: (none)");
    } else {
        println!("   Colour rules:");
        for (i, rule) in settings.color_filters.iter().enumerate() {
            println!("   ├─ {}. {} -> {}", i + 1, rule.match_text, rule.color_hex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_actions_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filters.json");

        command_filters(&FilterAction::Add { name: "svc".into() }, &path).unwrap();
        command_filters(&FilterAction::Add { name: "SVC".into() }, &path).unwrap();
        command_filters(&FilterAction::Enable, &path).unwrap();
        command_filters(
            &FilterAction::Mode {
                mode: FilterModeArg::Exclude,
            },
            &path,
        )
        .unwrap();

        let settings = SettingsStore::load(&path).snapshot();
        assert_eq!(settings.process_filters, vec!["svc"]);
        assert!(settings.filtering_enabled);
        assert_eq!(settings.process_filter_mode, ProcessFilterMode::Exclude);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filters.json");
        let action = FilterAction::Color {
            text: "boom".into(),
            color: "red".into(),
        };
        assert!(command_filters(&action, &path).is_err());
        assert_eq!(SettingsStore::load(&path).snapshot().color_filters.len(), 4);
    }

    #[test]
    fn test_color_rule_positions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filters.json");
        let defaults = FilterSettings::with_default_colors().color_filters;

        command_filters(&FilterAction::ColorUp { index: 2 }, &path).unwrap();
        command_filters(&FilterAction::ColorRemove { index: 4 }, &path).unwrap();
        assert!(command_filters(&FilterAction::ColorRemove { index: 0 }, &path).is_err());
        assert!(command_filters(&FilterAction::ColorDown { index: 9 }, &path).is_err());

        let rules = SettingsStore::load(&path).snapshot().color_filters;
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0], defaults[1]);
        assert_eq!(rules[1], defaults[0]);
        assert_eq!(rules[2], defaults[2]);
    }
}
