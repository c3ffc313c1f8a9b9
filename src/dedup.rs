// =============================================================================
// dedup.rs - DON'T SEND THE SAME ALERT TWICE
// =============================================================================
//
// In watch mode the engine re-reads the capture every few minutes, and most
// of the time the page hasn't changed. Nobody wants the same "3 players up
// for auction" mail every five minutes, so every delivered report's
// fingerprint goes into a Bloom filter backed by an LRU cache:
//
// 1. Bloom says "never seen": definitely new, deliver it.
// 2. Bloom says "maybe": ask the LRU for a definitive answer.
// 3. The Bloom filter is swapped for a fresh one every re-notify interval,
//    at which point an unchanged report is delivered once more as a
//    reminder. The LRU is cleared at the same moment, otherwise it would
//    keep vetoing the reminder.
//
// A false "new" only costs an extra reminder. A false "seen" cannot happen:
// the LRU has the final word on every "maybe".
// =============================================================================

use bloomfilter::Bloom;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct DedupEngine {
    bloom: Arc<RwLock<Bloom<String>>>,

    /// Definitive answer when the Bloom filter says "maybe".
    lru_cache: Arc<RwLock<LruCache<String, ()>>>,

    last_rotation: Arc<RwLock<Instant>>,

    rotation_interval: Duration,

    bloom_expected_items: u64,
    bloom_fp_rate: f64,

    pub stats: Arc<DedupStats>,
}

pub struct DedupStats {
    pub checks: portable_atomic::AtomicU64,
    pub unique: portable_atomic::AtomicU64,
    pub duplicates: portable_atomic::AtomicU64,
    pub rotations: portable_atomic::AtomicU64,
    /// Bloom said "maybe", LRU said "no".
    pub bloom_false_positives: portable_atomic::AtomicU64,
}

impl DedupStats {
    fn new() -> Self {
        Self {
            checks: portable_atomic::AtomicU64::new(0),
            unique: portable_atomic::AtomicU64::new(0),
            duplicates: portable_atomic::AtomicU64::new(0),
            rotations: portable_atomic::AtomicU64::new(0),
            bloom_false_positives: portable_atomic::AtomicU64::new(0),
        }
    }
}

impl DedupEngine {
    /// # Arguments
    /// * `expected_items` - distinct reports expected per rotation window
    /// * `fp_rate` - target Bloom false positive rate (0.01 = 1%)
    /// * `lru_capacity` - fingerprints remembered exactly
    /// * `rotation_interval` - how long a delivered report stays "seen"
    pub fn new(
        expected_items: u64,
        fp_rate: f64,
        lru_capacity: usize,
        rotation_interval: Duration,
    ) -> Self {
        info!(
            expected_items = expected_items,
            fp_rate = fp_rate,
            lru_capacity = lru_capacity,
            rotation_secs = rotation_interval.as_secs(),
            "Initializing notification dedup engine"
        );

        let bloom = Bloom::new_for_fp_rate(expected_items.max(1) as usize, fp_rate);
        let lru_size = NonZeroUsize::new(lru_capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            bloom: Arc::new(RwLock::new(bloom)),
            lru_cache: Arc::new(RwLock::new(LruCache::new(lru_size))),
            last_rotation: Arc::new(RwLock::new(Instant::now())),
            rotation_interval,
            bloom_expected_items: expected_items.max(1),
            bloom_fp_rate: fp_rate,
            stats: Arc::new(DedupStats::new()),
        }
    }

    /// Has this key gone unseen in the current window? Records nothing, so a
    /// caller can attempt delivery first and `insert` only on success.
    pub fn is_new(&self, key: &str) -> bool {
        use portable_atomic::Ordering;

        self.stats.checks.fetch_add(1, Ordering::Relaxed);
        self.maybe_rotate();

        let key = key.to_string();
        if !self.bloom.read().check(&key) {
            return true;
        }

        if self.lru_cache.write().get(&key).is_some() {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Report already delivered in this window");
            return false;
        }

        self.stats.bloom_false_positives.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Bloom false positive, LRU says the report is new");
        true
    }

    /// Mark a key as seen for the rest of the current window.
    pub fn insert(&self, key: &str) {
        let key = key.to_string();
        self.bloom.write().set(&key);
        self.lru_cache.write().put(key, ());
        self.stats
            .unique
            .fetch_add(1, portable_atomic::Ordering::Relaxed);
    }

    fn maybe_rotate(&self) {
        let should_rotate = self.last_rotation.read().elapsed() >= self.rotation_interval;
        if !should_rotate {
            return;
        }

        let mut bloom = self.bloom.write();
        let mut last = self.last_rotation.write();

        // Another caller may have rotated while we waited for the lock.
        if last.elapsed() >= self.rotation_interval {
            *bloom = Bloom::new_for_fp_rate(self.bloom_expected_items as usize, self.bloom_fp_rate);
            self.lru_cache.write().clear();
            *last = Instant::now();

            self.stats
                .rotations
                .fetch_add(1, portable_atomic::Ordering::Relaxed);
            info!("Re-notify window elapsed, dedup memory cleared");
        }
    }

    pub fn snapshot(&self) -> DedupSnapshot {
        use portable_atomic::Ordering;
        DedupSnapshot {
            total_checks: self.stats.checks.load(Ordering::Relaxed),
            unique_items: self.stats.unique.load(Ordering::Relaxed),
            duplicates_caught: self.stats.duplicates.load(Ordering::Relaxed),
            rotations: self.stats.rotations.load(Ordering::Relaxed),
            bloom_false_positives: self.stats.bloom_false_positives.load(Ordering::Relaxed),
            lru_cache_size: self.lru_cache.read().len(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DedupSnapshot {
    pub total_checks: u64,
    pub unique_items: u64,
    pub duplicates_caught: u64,
    pub rotations: u64,
    pub bloom_false_positives: u64,
    pub lru_cache_size: usize,
}
