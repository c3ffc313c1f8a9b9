//  █████╗ ██╗   ██╗ ██████╗████████╗██╗ ██████╗ ███╗   ██╗
// ██╔══██╗██║   ██║██╔════╝╚══██╔══╝██║██╔═══██╗████╗  ██║
// ███████║██║   ██║██║        ██║   ██║██║   ██║██╔██╗ ██║
// ██╔══██║██║   ██║██║        ██║   ██║██║   ██║██║╚██╗██║
// ██║  ██║╚██████╔╝╚██████╗   ██║   ██║╚██████╔╝██║ ╚████║
// ╚═╝  ╚═╝ ╚═════╝  ╚═════╝   ╚═╝   ╚═╝ ╚═════╝ ╚═╝  ╚═══╝
//
// W A T C H   E N G I N E
//
// Reads the text blocks scraped off a fantasy baseball league's pending
// transactions page, works out who is up for auction (and who is being
// dropped to make room), finds the claim deadline, and writes it all down
// for the mailer.

mod aggregate;
mod classifier;
mod config;
mod dedup;
mod error;
mod extract;
mod metrics;
mod models;
mod pipeline;
mod publisher;
mod report;
mod source;
mod watcher;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::dedup::DedupEngine;
use crate::metrics::MetricsCollector;
use crate::models::AuctionReport;
use crate::publisher::{OutboxSink, ReportPublisher};
use crate::source::{BlockSource, CaptureFileSource};

fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════════════════════════╗
    ║            ⚾  AUCTION WATCH ENGINE  ⚾                   ║
    ║                                                          ║
    ║   Input:   captured DOM text blocks (JSON)               ║
    ║   Output:  auction_players.json + email_summary.txt      ║
    ║   Dedup:   Bloom Filter + LRU Cache Hybrid               ║
    ║   Channel: Lock-Free Crossbeam                           ║
    ╚══════════════════════════════════════════════════════════╝
    "#;
    println!("{}", banner);
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(false)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .init();
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = Arc::new(Config::from_env());
    init_tracing(config.log_json);

    if !config.log_json {
        print_banner();
    }

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "could not create output directory {}",
            config.output_dir.display()
        )
    })?;

    let capture = CaptureFileSource::new(&config.capture_path);
    info!(
        capture = %capture.path().display(),
        output_dir = %config.output_dir.display(),
        run_once = config.run_once,
        "Configuration loaded"
    );
    let source: Arc<dyn BlockSource> = Arc::new(capture);

    let (report_tx, report_rx) = crossbeam_channel::bounded::<AuctionReport>(64);

    let dedup_engine = Arc::new(DedupEngine::new(
        config.bloom_expected_items,
        config.bloom_false_positive_rate,
        config.lru_cache_size,
        config.renotify_interval,
    ));

    let metrics_collector = Arc::new(MetricsCollector::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ═══════════════════════════════════════════
    // SPAWN WATCHER
    // ═══════════════════════════════════════════
    let watcher_config = config.clone();
    let watcher_metrics = metrics_collector.clone();
    let mut watcher_shutdown = shutdown_rx.clone();
    let mut watcher_handle = tokio::spawn(async move {
        watcher::run(
            watcher_config,
            source,
            report_tx,
            watcher_metrics,
            &mut watcher_shutdown,
        )
        .await;
        info!("Watcher: OFFLINE");
    });

    // ═══════════════════════════════════════════
    // SPAWN PUBLISHER
    // ═══════════════════════════════════════════
    let publisher = ReportPublisher::new(
        config.clone(),
        report_rx,
        shutdown_rx.clone(),
        dedup_engine.clone(),
        Box::new(OutboxSink::new(config.outbox_path())),
        metrics_collector.clone(),
    );
    let publisher_handle = tokio::spawn(async move {
        if let Err(e) = publisher.run().await {
            error!(error = %e, "Publisher error");
        }
        info!("Publisher: OFFLINE");
    });

    // The watcher owns the only sender, so when it finishes the publisher
    // drains what's left and stops on its own.
    tokio::select! {
        res = &mut watcher_handle => {
            if let Err(e) = res {
                error!(error = %e, "Watcher task panicked");
            }
        }
        res = signal::ctrl_c() => {
            match res {
                Ok(()) => warn!("Shutdown signal received"),
                Err(err) => error!(error = %err, "Signal listener error"),
            }
            let _ = shutdown_tx.send(true);
            let _ = watcher_handle.await;
        }
    }

    info!("Waiting for publisher to finish (timeout: 10s)...");
    if tokio::time::timeout(Duration::from_secs(10), publisher_handle)
        .await
        .is_err()
    {
        warn!("Publisher did not finish in time");
    }

    info!(
        metrics = %serde_json::to_string(&metrics_collector.snapshot())?,
        dedup = %serde_json::to_string(&dedup_engine.snapshot())?,
        "Final counters"
    );
    info!("AUCTION WATCH ENGINE: OFFLINE");
    Ok(())
}
