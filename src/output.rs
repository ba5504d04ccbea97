//! Terminal rendering of stored records.
//!
//! Applies the persisted process filter and the message rules from the
//! command line, then formats each surviving record as a text line (with
//! optional ANSI colour) or a JSON object.

use dbwin_monitor::filter::{color_for, matches_process_filter, FilterEngine, FilterRule};
use dbwin_monitor::record::{format_full, LogRecord, SharedRecord};
use dbwin_monitor::settings::FilterSettings;
use tracing::warn;

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output switches taken from CLI and config.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub color: bool,
    pub json: bool,
    pub show_pid: bool,
}

/// Filters and formats records for stdout.
pub struct Printer {
    engine: FilterEngine,
    rules: Vec<FilterRule>,
    options: OutputOptions,
}

impl Printer {
    pub fn new(rules: Vec<FilterRule>, options: OutputOptions) -> Self {
        Self {
            engine: FilterEngine::new(),
            rules,
            options,
        }
    }

    /// Renders the records of one batch that pass all filters.
    pub fn render_batch(&self, batch: &[SharedRecord], settings: &FilterSettings) -> Vec<String> {
        let process_filter = settings.process_filter();

        batch
            .iter()
            .filter(|record| matches_process_filter(record, &process_filter))
            .filter(|record| self.engine.should_include(record, &self.rules))
            .filter_map(|record| self.render(record, settings))
            .collect()
    }

    fn render(&self, record: &LogRecord, settings: &FilterSettings) -> Option<String> {
        if self.options.json {
            return match serde_json::to_string(record) {
                Ok(line) => Some(line),
                Err(e) => {
                    warn!(id = record.id, error = %e, "failed to serialize record");
                    None
                }
            };
        }

        let mut line = format_full(record);
        if self.options.show_pid {
            line = format!("{:>6} {}", record.process_id, line);
        }

        let highlighted = !self.engine.highlights(record, &self.rules).is_empty();

        if !self.options.color {
            let marker = if highlighted { "* " } else { "" };
            return Some(format!("{marker}{line}"));
        }

        let mut prefix = String::new();
        if highlighted {
            prefix.push_str(ANSI_BOLD);
        }
        if let Some(color) = color_for(&record.message, &settings.color_filters) {
            prefix.push_str(&color.ansi_foreground());
        }

        if prefix.is_empty() {
            Some(line)
        } else {
            Some(format!("{prefix}{line}{ANSI_RESET}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbwin_monitor::filter::{ColorHighlightRule, FilterKind};
    use std::sync::Arc;

    fn batch(items: &[(&str, &str)]) -> Vec<SharedRecord> {
        items
            .iter()
            .map(|(process, message)| Arc::new(LogRecord::new(7, *process, *message)))
            .collect()
    }

    fn plain() -> OutputOptions {
        OutputOptions {
            color: false,
            json: false,
            show_pid: false,
        }
    }

    #[test]
    fn test_message_rules_applied() {
        let printer = Printer::new(
            vec![
                FilterRule::simple("net", FilterKind::Include),
                FilterRule::simple("hot", FilterKind::Highlight),
            ],
            plain(),
        );
        let lines = printer.render_batch(
            &batch(&[("a", "net up"), ("a", "disk"), ("a", "net hot")]),
            &FilterSettings::default(),
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[a] net up"));
        assert!(lines[1].starts_with("* "));
    }

    #[test]
    fn test_process_filter_applied() {
        let mut settings = FilterSettings::default();
        settings.filtering_enabled = true;
        settings.add_process_filter("svc");
        let printer = Printer::new(Vec::new(), plain());
        let lines = printer.render_batch(&batch(&[("svc.exe", "x"), ("other", "y")]), &settings);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[svc.exe]"));
    }

    #[test]
    fn test_color_and_pid() {
        let mut settings = FilterSettings::default();
        settings
            .color_filters
            .push(ColorHighlightRule::new("error", "#FFFF0000"));
        let printer = Printer::new(
            Vec::new(),
            OutputOptions {
                color: true,
                json: false,
                show_pid: true,
            },
        );
        let lines = printer.render_batch(&batch(&[("a", "Error!")]), &settings);
        assert!(lines[0].starts_with("\x1b[38;2;255;0;0m     7 "));
        assert!(lines[0].ends_with(ANSI_RESET));
    }

    #[test]
    fn test_json_output() {
        let printer = Printer::new(
            Vec::new(),
            OutputOptions {
                color: false,
                json: true,
                show_pid: true,
            },
        );
        let lines = printer.render_batch(&batch(&[("a", "hello")]), &FilterSettings::default());
        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["message"], "hello");
        assert_eq!(value["process_id"], 7);
    }
}
