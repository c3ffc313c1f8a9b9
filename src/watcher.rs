// =============================================================================
// watcher.rs - THE CYCLE DRIVER
// =============================================================================
//
// One cycle is: read the blocks, run the extraction, render the report, and
// push it down the channel for the publisher. The first cycle starts as soon
// as the task does. In run-once mode that is also the last; otherwise the
// watcher sleeps for the poll interval and goes again until shutdown.
//
// A source that can't be read costs one cycle, not the process.
// =============================================================================

use std::sync::Arc;

use chrono::{Local, Utc};
use crossbeam_channel::{Sender, TrySendError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::models::AuctionReport;
use crate::pipeline::run_extraction;
use crate::report::format_report;
use crate::source::BlockSource;

/// Drive cycles until run-once completes or shutdown is signalled.
///
/// # Arguments
/// * `config` - poll interval, run-once flag and extraction settings
/// * `source` - where each cycle's raw blocks come from
/// * `report_tx` - sending end of the channel the publisher drains
/// * `shutdown` - flips to true when the process is going down
pub async fn run(
    config: Arc<Config>,
    source: Arc<dyn BlockSource>,
    report_tx: Sender<AuctionReport>,
    metrics: Arc<MetricsCollector>,
    shutdown: &mut watch::Receiver<bool>,
) {
    info!(
        source = source.name(),
        run_once = config.run_once,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Watcher online"
    );

    loop {
        run_cycle(&config, source.as_ref(), &report_tx, &metrics);

        if config.run_once {
            info!("Run-once mode, watcher finished after a single cycle");
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = shutdown.changed() => {
                info!("Watcher received shutdown signal");
                break;
            }
        }
    }
}

/// One full cycle. Returns `true` if a report was handed to the publisher.
pub fn run_cycle(
    config: &Config,
    source: &dyn BlockSource,
    report_tx: &Sender<AuctionReport>,
    metrics: &MetricsCollector,
) -> bool {
    metrics.increment_cycles();

    let blocks = match source.fetch_blocks() {
        Ok(blocks) => blocks,
        Err(e) => {
            metrics.increment_source_errors();
            error!(source = source.name(), error = %e, "Failed to read raw blocks, skipping cycle");
            return false;
        }
    };

    let outcome = run_extraction(&blocks, &config.scan_settings());
    metrics.record_run(&outcome.stats);

    let text = format_report(&outcome.results, &Local::now());
    let report = AuctionReport::new(outcome.results, text, Utc::now());

    // Never block a runtime worker on a stalled publisher.
    let sent = match report_tx.try_send(report) {
        Ok(()) => true,
        Err(TrySendError::Full(report)) => {
            warn!(report_id = %report.id, "Publisher backlog full, report dropped");
            false
        }
        Err(TrySendError::Disconnected(report)) => {
            warn!(report_id = %report.id, "Publisher is gone, report dropped");
            false
        }
    };

    debug!(metrics = ?metrics.snapshot(), "Cycle complete");
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use std::path::PathBuf;
    use std::time::Duration;

    struct FixedSource(Vec<String>);

    impl BlockSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_blocks(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl BlockSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        fn fetch_blocks(&self) -> Result<Vec<String>, SourceError> {
            Err(SourceError::Read {
                path: PathBuf::from("nowhere.json"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        }
    }

    fn trout_source() -> FixedSource {
        FixedSource(vec![
            "Mike Trout\nOF\nLAA\nBID\nJun 12, 2:00 AM".to_string(),
            "Thu Jun 12, 2:00 AM CDT".to_string(),
        ])
    }

    #[test]
    fn test_cycle_sends_rendered_report() {
        let config = Config::from_env();
        let metrics = MetricsCollector::new();
        let (tx, rx) = crossbeam_channel::unbounded();

        assert!(run_cycle(&config, &trout_source(), &tx, &metrics));

        let report = rx.try_recv().unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(report.text.contains("Mike Trout"));
        assert!(report.text.contains("Deadline Jun 12"));
        assert!(report.text.contains("Auction Deadline: Thu Jun 12, 2:00 AM"));

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles, 1);
        assert_eq!(snap.records_accepted, 1);
    }

    #[test]
    fn test_full_channel_drops_report_without_blocking() {
        let config = Config::from_env();
        let metrics = MetricsCollector::new();
        let (tx, rx) = crossbeam_channel::bounded(1);

        assert!(run_cycle(&config, &trout_source(), &tx, &metrics));
        assert!(!run_cycle(&config, &trout_source(), &tx, &metrics));
        assert_eq!(rx.len(), 1);
        assert_eq!(metrics.snapshot().cycles, 2);
    }

    #[test]
    fn test_source_error_skips_cycle() {
        let config = Config::from_env();
        let metrics = MetricsCollector::new();
        let (tx, rx) = crossbeam_channel::unbounded();

        assert!(!run_cycle(&config, &BrokenSource, &tx, &metrics));
        assert!(rx.try_recv().is_err());
        assert_eq!(metrics.snapshot().source_errors, 1);
    }

    #[tokio::test]
    async fn test_run_once_returns_after_one_cycle() {
        let mut config = Config::from_env();
        config.run_once = true;
        config.poll_interval = Duration::from_secs(3600);
        let metrics = Arc::new(MetricsCollector::new());
        let (tx, rx) = crossbeam_channel::unbounded();
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        run(
            Arc::new(config),
            Arc::new(trout_source()),
            tx,
            metrics.clone(),
            &mut shutdown_rx,
        )
        .await;

        assert_eq!(rx.len(), 1);
        assert_eq!(metrics.snapshot().cycles, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_polling() {
        let mut config = Config::from_env();
        config.run_once = false;
        config.poll_interval = Duration::from_secs(3600);
        let metrics = Arc::new(MetricsCollector::new());
        let (tx, _rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn({
            let metrics = metrics.clone();
            async move {
                run(
                    Arc::new(config),
                    Arc::new(trout_source()),
                    tx,
                    metrics,
                    &mut shutdown_rx,
                )
                .await;
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metrics.snapshot().cycles, 1);
    }
}
