//! CLI arguments and subcommands for dbwin-monitor.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Retention policy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RetentionArg {
    None,
    AutoClear,
    KeepMax,
}

/// Process filter mode selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterModeArg {
    Include,
    Exclude,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "dbwin-monitor",
    about = "Capture and filter debug output published over the DBWIN protocol",
    long_about = "Capture and filter debug output published over the DBWIN protocol.\n\n\
                  Listens on the local session and/or global debug-output channels, stores \
                  messages in a bounded ring buffer and prints them filtered by message \
                  rules and the persisted process filter.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (diagnostics go to stderr) [default: warn]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Ring buffer capacity (records)
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Also capture the global (cross-session) channel
    #[arg(long)]
    pub global: bool,

    /// Do not capture the local session channel
    #[arg(long)]
    pub no_local: bool,

    /// DATA wait timeout in milliseconds (bounds stop latency)
    #[arg(long)]
    pub wait_timeout_ms: Option<u64>,

    /// Maximum records per delivered batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Retention policy applied after each batch
    #[arg(long, value_enum)]
    pub retention: Option<RetentionArg>,

    /// Record limit for the retention policy
    #[arg(long)]
    pub retention_limit: Option<usize>,

    /// Filter settings file (JSON/YAML/TOML by extension)
    #[arg(long)]
    pub settings_file: Option<PathBuf>,

    /// Show only messages containing this text (repeatable)
    #[arg(long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Hide messages containing this text (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Mark messages containing this text (repeatable)
    #[arg(long = "highlight", value_name = "PATTERN")]
    pub highlight: Vec<String>,

    /// Treat --include/--exclude/--highlight patterns as regular expressions
    #[arg(long)]
    pub regex: bool,

    /// Disable ANSI colours
    #[arg(long)]
    pub no_color: bool,

    /// Emit one JSON object per record
    #[arg(long)]
    pub json: bool,

    /// Omit the process id from printed lines
    #[arg(long)]
    pub hide_pid: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Show or edit the persisted filter settings
    Filters {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Run the capture pipeline against synthetic in-process producers
    Demo {
        /// Messages sent by each producer
        #[arg(short = 'n', long, default_value_t = 1000)]
        messages: usize,

        /// Number of concurrent producers
        #[arg(long, default_value_t = 2)]
        sources: usize,

        /// Print every stored record
        #[arg(long)]
        verbose: bool,
    },
}

/// Edits applied to the filter settings file
#[derive(Subcommand, Debug)]
pub enum FilterAction {
    /// Print the current settings
    Show,

    /// Add a process name to the filter list
    Add { name: String },

    /// Remove a process name from the filter list
    Remove { name: String },

    /// Select whether listed processes are shown or hidden
    Mode {
        #[arg(value_enum)]
        mode: FilterModeArg,
    },

    /// Turn process filtering on
    Enable,

    /// Turn process filtering off
    Disable,

    /// Add a colour rule
    Color {
        /// Text to match (case-insensitive)
        text: String,
        /// Colour as #AARRGGBB or #RRGGBB
        color: String,
    },

    /// Delete a colour rule by its position in `show`
    ColorRemove { index: usize },

    /// Move a colour rule one place earlier (higher priority)
    ColorUp { index: usize },

    /// Move a colour rule one place later (lower priority)
    ColorDown { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_parse() {
        let args = Args::try_parse_from([
            "dbwin-monitor",
            "--global",
            "--include",
            "net",
            "--include",
            "disk",
            "--retention",
            "auto-clear",
        ])
        .unwrap();
        assert!(args.global);
        assert_eq!(args.include, vec!["net", "disk"]);
        assert_eq!(args.retention, Some(RetentionArg::AutoClear));
        assert!(args.command.is_none());
    }

    #[test]
    fn test_filters_subcommand_parse() {
        let args = Args::try_parse_from(["dbwin-monitor", "filters", "color", "Error", "#FFFF0000"]).unwrap();
        match args.command {
            Some(Commands::Filters {
                action: FilterAction::Color { text, color },
            }) => {
                assert_eq!(text, "Error");
                assert_eq!(color, "#FFFF0000");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_color_reorder_actions_parse() {
        let args = Args::try_parse_from(["dbwin-monitor", "filters", "color-down", "2"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Filters {
                action: FilterAction::ColorDown { index: 2 }
            })
        ));
        assert!(Args::try_parse_from(["dbwin-monitor", "filters", "color-remove", "x"]).is_err());
    }
}
