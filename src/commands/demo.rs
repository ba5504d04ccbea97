//! Demo command implementation.
//!
//! Drives the full capture pipeline through the in-process loopback backend:
//! synthetic producers publish messages over the DBWIN handshake on both
//! scopes while one capture channel per scope reads them into the store.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use dbwin_monitor::capture::{LoopbackNamespace, LoopbackProducer};
use dbwin_monitor::record::format_full;
use dbwin_monitor::{CaptureChannel, CaptureScope, LogStore, PipelineStats, ProcessNameResolver, SourceMultiplexer};

use crate::config::Config;

/// How long a producer waits for the reader to signal READY.
const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of one demo run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoSummary {
    pub sent: usize,
    pub dropped: usize,
    pub stored: usize,
    pub total: u64,
}

/// Runs the demo pipeline and prints a summary.
pub async fn command_demo(
    messages: usize,
    sources: usize,
    verbose: bool,
    config: &Config,
) -> anyhow::Result<()> {
    println!("🧪 DBWIN Monitor - Demo Mode");
    println!("============================");
    println!("   Producers: {}  Messages each: {}", sources, messages);

    let start = Instant::now();
    let store = Arc::new(LogStore::new(config.capacity())?);
    let summary = run_demo(messages, sources, Arc::clone(&store), config).await?;
    let duration = start.elapsed();

    if verbose {
        for record in store.get_all() {
            println!("   {}", format_full(&record));
        }
    }

    println!(
        "   ⏱️  Duration: {:.2}ms",
        duration.as_secs_f64() * 1000.0
    );
    println!("   📤 Sent: {}  Dropped: {}", summary.sent, summary.dropped);
    println!("   📦 Stored: {}  Total added: {}", summary.stored, summary.total);
    if duration.as_secs_f64() > 0.0 {
        println!(
            "   📈 Throughput: {:.0} msg/s",
            summary.sent as f64 / duration.as_secs_f64()
        );
    }

    println!("\n✅ Demo completed successfully");
    Ok(())
}

/// Runs `sources` producers alternating between the local and global scope.
pub async fn run_demo(
    messages: usize,
    sources: usize,
    store: Arc<LogStore>,
    config: &Config,
) -> anyhow::Result<DemoSummary> {
    let ns = LoopbackNamespace::new();
    let stats = Arc::new(PipelineStats::new());
    let resolver = Arc::new(ProcessNameResolver::default());

    let mut mux = SourceMultiplexer::new(Arc::clone(&store))
        .with_batch_size(config.batch_size())
        .with_stats(Arc::clone(&stats));

    for scope in [CaptureScope::Local, CaptureScope::Global] {
        mux.add_source(
            CaptureChannel::new(scope, Arc::new(ns.clone()), Arc::clone(&resolver))
                .with_wait_timeout(config.wait_timeout())
                .with_stats(Arc::clone(&stats)),
        );
    }
    mux.start();

    let pid = std::process::id() as i32;
    let mut producers = Vec::with_capacity(sources);
    for index in 0..sources {
        let scope = if index % 2 == 0 {
            CaptureScope::Local
        } else {
            CaptureScope::Global
        };
        let producer = LoopbackProducer::open(&ns, scope, pid)?;

        producers.push(tokio::task::spawn_blocking(move || {
            (0..messages)
                .filter(|n| producer.send(&format!("[demo-{index}] message {n}"), SEND_TIMEOUT))
                .count()
        }));
    }

    let mut sent = 0;
    for producer in producers {
        match producer.await {
            Ok(count) => sent += count,
            Err(e) => warn!(error = %e, "demo producer panicked"),
        }
    }

    mux.stop().await;

    Ok(DemoSummary {
        sent,
        dropped: messages * sources - sent,
        stored: store.count(),
        total: store.total_count(),
    })
}
