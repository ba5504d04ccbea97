//! Live capture session.
//!
//! Wires the system backend, one capture channel per enabled scope, the
//! multiplexer and the store, then prints every stored batch until Ctrl+C
//! (or SIGTERM) or until every channel has failed.

use anyhow::{bail, Context};
use std::io::{self, Write};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use dbwin_monitor::capture::{system_backend, TransportFactory};
use dbwin_monitor::filter::{validate_rule, FilterKind, FilterRule, MatchMode};
use dbwin_monitor::retention::{RetentionMode, RetentionOutcome};
use dbwin_monitor::{
    CaptureChannel, CaptureScope, LogStore, PipelineStats, ProcessNameResolver, SettingsStore,
    SourceMultiplexer,
};

use crate::cli::Args;
use crate::config::Config;
use crate::output::{OutputOptions, Printer};

/// How often the settings file is re-read so edits from `filters` apply live.
const SETTINGS_RELOAD_INTERVAL: Duration = Duration::from_secs(2);

/// How often the session checks whether any channel is still alive.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Builds message rules from the --include/--exclude/--highlight flags.
pub fn rules_from_args(args: &Args) -> anyhow::Result<Vec<FilterRule>> {
    let mode = if args.regex {
        MatchMode::Regex
    } else {
        MatchMode::Simple
    };

    let groups = [
        (&args.include, FilterKind::Include),
        (&args.exclude, FilterKind::Exclude),
        (&args.highlight, FilterKind::Highlight),
    ];

    let mut rules = Vec::new();
    for (patterns, kind) in groups {
        for pattern in patterns {
            let rule = FilterRule::new(pattern.clone(), kind, mode);
            validate_rule(&rule)?;
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Scopes enabled by the effective config.
pub fn enabled_scopes(config: &Config) -> Vec<CaptureScope> {
    let mut scopes = Vec::new();
    if config.capture_local.unwrap_or(true) {
        scopes.push(CaptureScope::Local);
    }
    if config.capture_global.unwrap_or(false) {
        scopes.push(CaptureScope::Global);
    }
    scopes
}

/// Registers a listener applying `retention` after every delivered batch.
pub fn install_retention(store: &Arc<LogStore>, retention: RetentionMode) {
    if retention == RetentionMode::None {
        return;
    }

    let weak = Arc::downgrade(store);
    store.on_batch(move |_| {
        let Some(store) = weak.upgrade() else {
            return;
        };
        match retention.apply(&store) {
            RetentionOutcome::Unchanged => {}
            RetentionOutcome::Cleared => info!("Retention limit reached, store cleared"),
            RetentionOutcome::Shrunk { oldest_id } => {
                debug!(?oldest_id, "Store trimmed to retention limit")
            }
        }
    });
}

/// Runs a capture session against the system debug-output objects.
pub async fn command_run(args: &Args, config: &Config) -> anyhow::Result<()> {
    run_session(args, config, system_backend(), &mut io::stdout()).await
}

async fn run_session(
    args: &Args,
    config: &Config,
    backend: Arc<dyn TransportFactory>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let rules = rules_from_args(args)?;
    let settings = Arc::new(SettingsStore::load(config.settings_file()));
    let store = Arc::new(LogStore::new(config.capacity()).context("invalid store capacity")?);
    let stats = Arc::new(PipelineStats::new());
    let resolver = Arc::new(ProcessNameResolver::default());

    install_retention(&store, config.retention_mode());
    let mut batches = store.subscribe();

    let mut mux = SourceMultiplexer::new(Arc::clone(&store))
        .with_batch_size(config.batch_size())
        .with_stats(Arc::clone(&stats));

    let scopes = enabled_scopes(config);
    for scope in &scopes {
        mux.add_source(
            CaptureChannel::new(*scope, Arc::clone(&backend), Arc::clone(&resolver))
                .with_wait_timeout(config.wait_timeout())
                .with_stats(Arc::clone(&stats)),
        );
    }

    let printer = Printer::new(
        rules,
        OutputOptions {
            color: !args.no_color && !args.json,
            json: args.json,
            show_pid: config.show_pid.unwrap_or(true),
        },
    );

    let background = CancellationToken::new();
    let maintenance = tokio::spawn(maintain(
        background.clone(),
        Arc::clone(&resolver),
        Arc::clone(&settings),
        config.prune_interval(),
    ));

    mux.start();
    info!(scopes = ?scopes, "Capture session started");

    let shutdown_signal = shutdown_signal();
    tokio::pin!(shutdown_signal);
    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    let mut all_failed = false;
    let mut outcome: anyhow::Result<()> = Ok(());

    loop {
        tokio::select! {
            Some(batch) = batches.recv() => {
                if let Err(e) = print_lines(out, &printer.render_batch(&batch, &settings.snapshot())) {
                    outcome = Err(anyhow::Error::new(e).context("failed to write captured output"));
                    break;
                }
            }
            _ = health.tick() => {
                if stats.failed_sources.load(Ordering::Relaxed) as usize >= mux.source_count() {
                    all_failed = true;
                    break;
                }
            }
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received, stopping capture...");
                break;
            }
        }
    }

    mux.stop().await;
    background.cancel();
    if let Err(e) = maintenance.await {
        warn!(error = %e, "maintenance task panicked");
    }

    // Batches delivered while stopping
    if outcome.is_ok() {
        let snapshot = settings.snapshot();
        while let Ok(batch) = batches.try_recv() {
            if let Err(e) = print_lines(out, &printer.render_batch(&batch, &snapshot)) {
                outcome = Err(anyhow::Error::new(e).context("failed to write captured output"));
                break;
            }
        }
    }

    for failure in mux.failures() {
        error!("❌ {}: {}", failure.source, failure.error);
    }

    let summary = stats.snapshot();
    info!(
        captured = summary.records_captured,
        batches = summary.batches_delivered,
        stored = store.count(),
        "Capture session finished"
    );

    outcome?;
    if all_failed {
        bail!("no capture channel could be opened");
    }
    Ok(())
}

/// Periodic resolver pruning and settings reloads until cancelled.
async fn maintain(
    cancel: CancellationToken,
    resolver: Arc<ProcessNameResolver>,
    settings: Arc<SettingsStore>,
    prune_interval: Duration,
) {
    let mut prune = tokio::time::interval(prune_interval);
    let mut reload = tokio::time::interval(SETTINGS_RELOAD_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = prune.tick() => {
                let removed = resolver.prune();
                if removed > 0 {
                    debug!(removed, cached = resolver.len(), "Pruned process name cache");
                }
            }
            _ = reload.tick() => {
                if let Err(e) = settings.reload() {
                    debug!(error = %e, "Filter settings reload skipped");
                }
            }
        }
    }
}

fn print_lines(out: &mut dyn Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
