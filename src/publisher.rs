// =============================================================================
// publisher.rs - WRITING IT DOWN AND PASSING IT ON
// =============================================================================
//
// Consumes finished reports from the crossbeam channel and, for each one:
//
// 1. Persists the clean records as a pretty JSON array (auction_players.json)
// 2. Persists the rendered report text (email_summary.txt)
// 3. Applies the mailer's send/suppress rule to the text
// 4. Checks the dedup engine so an unchanged report isn't re-delivered
// 5. Hands anything left to the notification sink, and only once the sink
//    accepts it does the report count as delivered
//
// Steps 1 and 2 happen for every report, including empty ones, so the files
// on disk always describe the latest run.
// =============================================================================

use anyhow::Result;
use chrono::Utc;
use crossbeam_channel::Receiver;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::dedup::DedupEngine;
use crate::error::PublishError;
use crate::metrics::MetricsCollector;
use crate::models::AuctionReport;
use crate::report::{delivery_for, Delivery};

/// Where a deliverable report goes next. Actual mail transport lives on the
/// other side of this trait.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, report: &AuctionReport) -> Result<(), PublishError>;
}

/// Appends one line per delivered report to the outbox log the mailer tails.
pub struct OutboxSink {
    path: PathBuf,
}

impl OutboxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NotificationSink for OutboxSink {
    fn notify(&self, report: &AuctionReport) -> Result<(), PublishError> {
        let line = format!("{}: report ready {}\n", Utc::now().to_rfc3339(), report);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| PublishError::Write {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|source| PublishError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// What happened to one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    Suppressed,
    Repeated,
}

pub struct ReportPublisher {
    config: Arc<Config>,
    receiver: Receiver<AuctionReport>,
    shutdown: watch::Receiver<bool>,
    dedup: Arc<DedupEngine>,
    sink: Box<dyn NotificationSink>,
    metrics: Arc<MetricsCollector>,
}

impl ReportPublisher {
    pub fn new(
        config: Arc<Config>,
        receiver: Receiver<AuctionReport>,
        shutdown: watch::Receiver<bool>,
        dedup: Arc<DedupEngine>,
        sink: Box<dyn NotificationSink>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            receiver,
            shutdown,
            dedup,
            sink,
            metrics,
        }
    }

    /// Run until the channel disconnects or shutdown is signalled. Reports
    /// still queued at shutdown are drained and published first.
    pub async fn run(self) -> Result<()> {
        info!(
            records = %self.config.records_path().display(),
            summary = %self.config.summary_path().display(),
            "Report publisher starting"
        );

        loop {
            if *self.shutdown.borrow() {
                info!("Shutdown signal received, draining remaining reports");
                while let Ok(report) = self.receiver.try_recv() {
                    self.handle(&report);
                }
                return Ok(());
            }

            match self.receiver.try_recv() {
                Ok(report) => self.handle(&report),
                Err(crossbeam_channel::TryRecvError::Empty) => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(crossbeam_channel::TryRecvError::Disconnected) => {
                    info!("Channel disconnected, publisher shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn handle(&self, report: &AuctionReport) {
        match self.publish(report) {
            Ok(outcome) => {
                self.metrics.increment_published();
                match outcome {
                    PublishOutcome::Delivered => self.metrics.increment_delivered(),
                    PublishOutcome::Suppressed => self.metrics.increment_suppressed(),
                    PublishOutcome::Repeated => self.metrics.increment_repeated(),
                }
            }
            Err(e) => {
                self.metrics.increment_publish_errors();
                error!(error = %e, report_id = %report.id, "Failed to publish report");
            }
        }
    }

    /// Persist one report and decide whether it gets delivered.
    pub fn publish(&self, report: &AuctionReport) -> Result<PublishOutcome, PublishError> {
        write_records(&self.config.records_path(), report)?;
        write_text(&self.config.summary_path(), &report.text)?;

        if let Delivery::Suppress(reason) = delivery_for(&report.text, self.config.min_report_chars) {
            info!(report_id = %report.id, %reason, "Notification suppressed");
            return Ok(PublishOutcome::Suppressed);
        }

        let fingerprint = report.results.fingerprint();
        if !self.dedup.is_new(&fingerprint) {
            info!(report_id = %report.id, "Auction list unchanged since last notification");
            return Ok(PublishOutcome::Repeated);
        }

        // Only a report the sink accepted counts as delivered.
        self.sink.notify(report)?;
        self.dedup.insert(&fingerprint);
        info!(report = %report, "Notification handed to the outbox");
        Ok(PublishOutcome::Delivered)
    }
}

fn write_records(path: &Path, report: &AuctionReport) -> Result<(), PublishError> {
    let json = serde_json::to_string_pretty(&report.results.records)?;
    write_text(path, &json)?;
    debug!(path = %path.display(), records = report.results.len(), "Records written");
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<(), PublishError> {
    fs::write(path, text).map_err(|source| PublishError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResultSet, TransactionRecord};
    use crate::report::format_report;
    use parking_lot::Mutex;
    use uuid::Uuid;

    /// Remembers which reports it was asked to deliver.
    #[derive(Default)]
    struct RecordingSink {
        delivered: Arc<Mutex<Vec<String>>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, report: &AuctionReport) -> Result<(), PublishError> {
            self.delivered.lock().push(report.id.clone());
            Ok(())
        }
    }

    /// Fails the first `failures` deliveries, then behaves.
    struct FlakySink {
        failures: Mutex<usize>,
        calls: Arc<Mutex<usize>>,
    }

    impl NotificationSink for FlakySink {
        fn notify(&self, _report: &AuctionReport) -> Result<(), PublishError> {
            *self.calls.lock() += 1;
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(PublishError::Write {
                    path: PathBuf::from("notification_log.txt"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            Ok(())
        }
    }

    /// Output directory removed when the test is done with it.
    struct ScratchDir(PathBuf);

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn scratch_config() -> (Arc<Config>, ScratchDir) {
        let dir = std::env::temp_dir().join(format!("auction-watch-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let mut config = Config::from_env();
        config.output_dir = dir.clone();
        config.records_file = "auction_players.json".into();
        config.summary_file = "email_summary.txt".into();
        config.outbox_file = "notification_log.txt".into();
        config.min_report_chars = 50;
        (Arc::new(config), ScratchDir(dir))
    }

    fn report_with(names: &[&str]) -> AuctionReport {
        let records = names
            .iter()
            .map(|n| {
                let mut r = TransactionRecord::new(*n);
                r.position = Some("OF".into());
                r.team = Some("LAA".into());
                r
            })
            .collect();
        let results = ResultSet {
            records,
            deadline: None,
        };
        let now = Utc::now();
        let text = format_report(&results, &now);
        AuctionReport::new(results, text, now)
    }

    fn publisher(
        config: Arc<Config>,
        receiver: Receiver<AuctionReport>,
        delivered: Arc<Mutex<Vec<String>>>,
    ) -> (ReportPublisher, watch::Sender<bool>) {
        publisher_with_sink(config, receiver, Box::new(RecordingSink { delivered }))
    }

    fn publisher_with_sink(
        config: Arc<Config>,
        receiver: Receiver<AuctionReport>,
        sink: Box<dyn NotificationSink>,
    ) -> (ReportPublisher, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dedup = Arc::new(DedupEngine::new(100, 0.01, 10, Duration::from_secs(3600)));
        let publisher = ReportPublisher::new(
            config,
            receiver,
            shutdown_rx,
            dedup,
            sink,
            Arc::new(MetricsCollector::new()),
        );
        (publisher, shutdown_tx)
    }

    #[test]
    fn test_report_with_players_is_persisted_and_delivered() {
        let (config, _scratch) = scratch_config();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let (publisher, _shutdown) = publisher(config.clone(), rx, delivered.clone());

        let report = report_with(&["Mike Trout"]);
        assert_eq!(publisher.publish(&report).unwrap(), PublishOutcome::Delivered);
        assert_eq!(delivered.lock().len(), 1);

        let json = fs::read_to_string(config.records_path()).unwrap();
        let records: Vec<TransactionRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records[0].player_name, "Mike Trout");
        let text = fs::read_to_string(config.summary_path()).unwrap();
        assert_eq!(text, report.text);
    }

    #[test]
    fn test_empty_report_is_persisted_but_suppressed() {
        let (config, _scratch) = scratch_config();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let (publisher, _shutdown) = publisher(config.clone(), rx, delivered.clone());

        let report = report_with(&[]);
        assert_eq!(publisher.publish(&report).unwrap(), PublishOutcome::Suppressed);
        assert!(delivered.lock().is_empty());
        assert_eq!(fs::read_to_string(config.records_path()).unwrap(), "[]");
    }

    #[test]
    fn test_unchanged_report_is_not_redelivered() {
        let (config, _scratch) = scratch_config();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let (publisher, _shutdown) = publisher(config, rx, delivered.clone());

        assert_eq!(
            publisher.publish(&report_with(&["Mike Trout"])).unwrap(),
            PublishOutcome::Delivered
        );
        assert_eq!(
            publisher.publish(&report_with(&["Mike Trout"])).unwrap(),
            PublishOutcome::Repeated
        );
        assert_eq!(
            publisher.publish(&report_with(&["Mike Trout", "Juan Soto"])).unwrap(),
            PublishOutcome::Delivered
        );
        assert_eq!(delivered.lock().len(), 2);
    }

    #[test]
    fn test_failed_notification_is_retried_next_cycle() {
        let (config, _scratch) = scratch_config();
        let (_tx, rx) = crossbeam_channel::unbounded();
        let calls = Arc::new(Mutex::new(0));
        let sink = Box::new(FlakySink {
            failures: Mutex::new(1),
            calls: calls.clone(),
        });
        let (publisher, _shutdown) = publisher_with_sink(config, rx, sink);

        assert!(matches!(
            publisher.publish(&report_with(&["Mike Trout"])),
            Err(PublishError::Write { .. })
        ));
        assert_eq!(
            publisher.publish(&report_with(&["Mike Trout"])).unwrap(),
            PublishOutcome::Delivered
        );
        assert_eq!(
            publisher.publish(&report_with(&["Mike Trout"])).unwrap(),
            PublishOutcome::Repeated
        );
        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn test_outbox_sink_appends_lines() {
        let (config, _scratch) = scratch_config();
        let sink = OutboxSink::new(config.outbox_path());
        sink.notify(&report_with(&["Mike Trout"])).unwrap();
        sink.notify(&report_with(&["Juan Soto"])).unwrap();
        let log = fs::read_to_string(config.outbox_path()).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("1 player(s)"));
    }

    #[tokio::test]
    async fn test_run_drains_until_channel_disconnects() {
        let (config, _scratch) = scratch_config();
        let (tx, rx) = crossbeam_channel::unbounded();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let (publisher, _shutdown) = publisher(config, rx, delivered.clone());

        tx.send(report_with(&["Mike Trout"])).unwrap();
        tx.send(report_with(&["Juan Soto"])).unwrap();
        drop(tx);

        publisher.run().await.unwrap();
        assert_eq!(delivered.lock().len(), 2);
    }
}
