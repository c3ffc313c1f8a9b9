// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - counts what every cycle did
// ═══════════════════════════════════════════════════════════════
//
// Lock-free counters shared by the watcher and the publisher. A snapshot is
// logged after every cycle and once more on the way out.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::pipeline::RunStats;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub source_errors: u64,
    pub blocks_seen: u64,
    pub blocks_parsed: u64,
    pub candidates_extracted: u64,
    pub records_accepted: u64,
    pub reports_published: u64,
    pub publish_errors: u64,
    pub notifications_delivered: u64,
    pub notifications_suppressed: u64,
    pub notifications_repeated: u64,
    pub uptime_seconds: u64,
}

pub struct MetricsCollector {
    cycles: AtomicU64,
    source_errors: AtomicU64,
    blocks_seen: AtomicU64,
    blocks_parsed: AtomicU64,
    candidates_extracted: AtomicU64,
    records_accepted: AtomicU64,
    reports_published: AtomicU64,
    publish_errors: AtomicU64,
    notifications_delivered: AtomicU64,
    notifications_suppressed: AtomicU64,
    notifications_repeated: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            blocks_seen: AtomicU64::new(0),
            blocks_parsed: AtomicU64::new(0),
            candidates_extracted: AtomicU64::new(0),
            records_accepted: AtomicU64::new(0),
            reports_published: AtomicU64::new(0),
            publish_errors: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            notifications_suppressed: AtomicU64::new(0),
            notifications_repeated: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_cycles(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_source_errors(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run(&self, stats: &RunStats) {
        self.blocks_seen.fetch_add(stats.blocks as u64, Ordering::Relaxed);
        self.blocks_parsed.fetch_add(stats.blocks_parsed as u64, Ordering::Relaxed);
        self.candidates_extracted.fetch_add(stats.candidates as u64, Ordering::Relaxed);
        self.records_accepted.fetch_add(stats.records as u64, Ordering::Relaxed);
    }

    pub fn increment_published(&self) {
        self.reports_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_publish_errors(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delivered(&self) {
        self.notifications_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_suppressed(&self) {
        self.notifications_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_repeated(&self) {
        self.notifications_repeated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
            blocks_seen: self.blocks_seen.load(Ordering::Relaxed),
            blocks_parsed: self.blocks_parsed.load(Ordering::Relaxed),
            candidates_extracted: self.candidates_extracted.load(Ordering::Relaxed),
            records_accepted: self.records_accepted.load(Ordering::Relaxed),
            reports_published: self.reports_published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            notifications_suppressed: self.notifications_suppressed.load(Ordering::Relaxed),
            notifications_repeated: self.notifications_repeated.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
