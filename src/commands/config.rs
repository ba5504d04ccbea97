//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from(default_file_name(&format)),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

fn default_file_name(format: &ConfigFormat) -> &'static str {
    match format {
        ConfigFormat::Yaml => "dbwin-monitor.yaml",
        ConfigFormat::Json => "dbwin-monitor.json",
        ConfigFormat::Toml => "dbwin-monitor.toml",
    }
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# DBWIN Monitor Configuration
# ===========================
#
# Store
# -----
# capacity: 100000             # Ring buffer capacity (records)
#
# Capture
# -------
# capture_local: true          # Session-local debug output
# capture_global: false        # System-wide debug output (Global\ objects)
# wait_timeout_ms: 100         # DATA wait timeout, bounds stop latency
# batch_size: 256              # Maximum records per delivered batch
#
# Retention
# ---------
# retention: keep_max          # none, auto_clear, keep_max
# retention_limit: 10000       # Record limit for the retention policy
# prune_interval_secs: 60      # Process name cache pruning interval
#
# Filter Settings
# ---------------
# settings_file: filter_settings.json  # Process filter and colour rules
#
# Output
# ------
# log_level: "warn"            # off, error, warn, info, debug, trace
# show_pid: true               # Print the process id on each line
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generated.yaml");
        command_config(Some(path.clone()), ConfigFormat::Yaml, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# DBWIN Monitor Configuration"));

        let loaded = crate::config::load_config(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_generated_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generated.toml");
        command_config(Some(path.clone()), ConfigFormat::Toml, false).unwrap();
        let loaded = crate::config::load_config(Some(&path)).unwrap();
        assert_eq!(loaded.capacity, Some(100_000));
    }
}
