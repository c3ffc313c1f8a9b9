// =============================================================================
// config.rs - EVERY KNOB IN ONE PLACE
// =============================================================================
//
// All values can be overridden via environment variables prefixed with
// AUCTION_WATCH_, and a `.env` file next to the binary is loaded first if
// there is one. Nothing here is required: with no environment at all the
// engine reads `captured_blocks.json` from the working directory, runs once,
// and writes its outputs next to it.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::ScanSettings;
use crate::report::DEFAULT_MIN_REPORT_CHARS;

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // INPUT / OUTPUT
    // =========================================================================

    /// JSON array of raw text blocks written by the capture step, in page order.
    pub capture_path: PathBuf,

    /// Directory all outputs are written to.
    pub output_dir: PathBuf,

    /// File name of the clean records array.
    pub records_file: String,

    /// File name of the plain-text report.
    pub summary_file: String,

    /// File name of the notification hand-off log.
    pub outbox_file: String,

    // =========================================================================
    // SCHEDULING
    // =========================================================================

    /// Run a single cycle and exit. This is how the scheduled job uses it.
    pub run_once: bool,

    /// Time between cycles when `run_once` is off.
    pub poll_interval: Duration,

    // =========================================================================
    // EXTRACTION
    // =========================================================================

    /// Blocks whose trimmed text is this long or shorter are not parsed for
    /// players. Default: 20.
    pub min_block_chars: usize,

    /// Keep only candidates that have both a position and a team.
    pub require_complete_records: bool,

    // =========================================================================
    // NOTIFICATION
    // =========================================================================

    /// Reports shorter than this are never delivered. Default: 50.
    pub min_report_chars: usize,

    /// Expected distinct reports per re-notify window.
    pub bloom_expected_items: u64,

    pub bloom_false_positive_rate: f64,

    pub lru_cache_size: usize,

    /// An identical report is delivered again only after this long.
    /// Default: 3600 seconds.
    pub renotify_interval: Duration,

    // =========================================================================
    // LOGGING
    // =========================================================================

    /// Emit log lines as JSON instead of the human format.
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Config {
            capture_path: PathBuf::from(env_or_default(
                "AUCTION_WATCH_CAPTURE_PATH",
                "captured_blocks.json",
            )),
            output_dir: PathBuf::from(env_or_default("AUCTION_WATCH_OUTPUT_DIR", ".")),
            records_file: env_or_default("AUCTION_WATCH_RECORDS_FILE", "auction_players.json"),
            summary_file: env_or_default("AUCTION_WATCH_SUMMARY_FILE", "email_summary.txt"),
            outbox_file: env_or_default("AUCTION_WATCH_OUTBOX_FILE", "notification_log.txt"),

            run_once: parse_bool(&env_or_default("AUCTION_WATCH_RUN_ONCE", "true"), true),
            poll_interval: Duration::from_secs(
                env_or_default("AUCTION_WATCH_POLL_SECS", "300").parse().unwrap_or(300),
            ),

            min_block_chars: env_or_default("AUCTION_WATCH_MIN_BLOCK_CHARS", "20")
                .parse()
                .unwrap_or(20),
            require_complete_records: parse_bool(
                &env_or_default("AUCTION_WATCH_REQUIRE_COMPLETE", "true"),
                true,
            ),

            min_report_chars: env_or_default("AUCTION_WATCH_MIN_REPORT_CHARS", "50")
                .parse()
                .unwrap_or(DEFAULT_MIN_REPORT_CHARS),
            bloom_expected_items: env_or_default("AUCTION_WATCH_BLOOM_ITEMS", "10000")
                .parse()
                .unwrap_or(10_000),
            bloom_false_positive_rate: env_or_default("AUCTION_WATCH_BLOOM_FP_RATE", "0.01")
                .parse()
                .unwrap_or(0.01),
            lru_cache_size: env_or_default("AUCTION_WATCH_LRU_CACHE_SIZE", "1000")
                .parse()
                .unwrap_or(1_000),
            renotify_interval: Duration::from_secs(
                env_or_default("AUCTION_WATCH_RENOTIFY_SECS", "3600")
                    .parse()
                    .unwrap_or(3600),
            ),

            log_json: parse_bool(&env_or_default("AUCTION_WATCH_LOG_JSON", "false"), false),
        }
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            min_block_chars: self.min_block_chars,
            require_complete_records: self.require_complete_records,
        }
    }

    pub fn records_path(&self) -> PathBuf {
        self.output_dir.join(&self.records_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_file)
    }

    pub fn outbox_path(&self) -> PathBuf {
        self.output_dir.join(&self.outbox_file)
    }
}

/// Read an environment variable, falling back to a default.
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
