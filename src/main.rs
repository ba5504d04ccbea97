//! dbwin-monitor - version 0.1.0
//!
//! Debug-output monitor with tracing logging.
//! This is the main entry point that starts a capture session and handles subcommands.

mod cli;
mod commands;
mod config;
mod output;

use clap::Parser;
use tracing::{info, warn, Level};

use cli::{Args, Commands};
use commands::{command_config, command_demo, command_filters, command_run};
use config::{missing_config_file, resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
///
/// Diagnostics go to stderr so captured messages on stdout stay clean.
fn setup_logging(config: &Config) {
    let level_name = config.log_level.as_deref().unwrap_or("warn");
    let log_level = match level_name {
        "off" => return,
        "error" => Level::ERROR,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::WARN,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {}", level_name);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        if let Some(path) = missing_config_file(&args) {
            eprintln!("⚠️  Config file not found: {} - using defaults", path.display());
        }
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, &args.config_format);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config);

    if let Some(path) = missing_config_file(&args) {
        warn!("Config file not found: {} - using defaults", path.display());
    }

    match &args.command {
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => command_config(output.clone(), format.clone(), *commented),
        Some(Commands::Filters { action }) => command_filters(action, &config.settings_file()),
        Some(Commands::Demo {
            messages,
            sources,
            verbose,
        }) => command_demo(*messages, *sources, *verbose, &config).await,
        None => {
            info!("Starting dbwin-monitor");
            command_run(&args, &config).await?;
            info!("dbwin-monitor stopped gracefully");
            Ok(())
        }
    }
}
