// =============================================================================
// pipeline.rs - ONE EXTRACTION RUN, START TO FINISH
// =============================================================================
//
// raw blocks ──► block gate ──► record extractor ──► candidate gate ─┐
//     │                                                              ├─► aggregator ──► ResultSet
//     └──────────────────────► deadline extractor ───────────────────┘
//
// Synchronous and pure. Give it the same blocks twice and it answers the
// same way twice.
// =============================================================================

use std::collections::HashSet;
use tracing::{debug, info};

use crate::aggregate;
use crate::classifier;
use crate::extract::{extract_deadline, extract_record};
use crate::models::{ResultSet, TransactionRecord};

/// Knobs for the two gates around the record extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// A block must be strictly longer than this (trimmed) to be parsed.
    pub min_block_chars: usize,
    /// Candidates without both a position and a team are thrown away.
    pub require_complete_records: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            min_block_chars: 20,
            require_complete_records: true,
        }
    }
}

/// Counts from one run, for the metrics collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub blocks: usize,
    pub blocks_parsed: usize,
    pub candidates: usize,
    pub records: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub results: ResultSet,
    pub stats: RunStats,
}

/// Is this block worth handing to the record extractor?
///
/// Too short, already parsed earlier in this run, or no position code in
/// sight: skip. `seen` belongs to the caller and is updated here.
fn passes_block_gate(block: &str, seen: &mut HashSet<String>, settings: &ScanSettings) -> bool {
    let text = block.trim();
    if text.chars().count() <= settings.min_block_chars {
        return false;
    }
    if !classifier::quick_position_check(text) {
        return false;
    }
    seen.insert(text.to_string())
}

/// Pull candidate records out of every block that passes the gates.
pub fn scan_candidates<S: AsRef<str>>(
    blocks: &[S],
    settings: &ScanSettings,
) -> (Vec<TransactionRecord>, usize) {
    let mut seen = HashSet::new();
    let mut parsed = 0;
    let mut candidates = Vec::new();

    for block in blocks {
        let block = block.as_ref();
        if !passes_block_gate(block, &mut seen, settings) {
            continue;
        }
        parsed += 1;

        let Some(record) = extract_record(block.trim()) else {
            continue;
        };

        if settings.require_complete_records && !record.is_complete() {
            debug!(player = %record.player_name, "Candidate missing position or team, skipped");
            continue;
        }

        candidates.push(record);
    }

    (candidates, parsed)
}

/// Run the full extraction over one run's blocks.
pub fn run_extraction<S: AsRef<str>>(blocks: &[S], settings: &ScanSettings) -> RunOutcome {
    let deadline = extract_deadline(blocks);
    let (candidates, blocks_parsed) = scan_candidates(blocks, settings);
    let candidate_count = candidates.len();

    let results = aggregate::aggregate(candidates, deadline);

    let stats = RunStats {
        blocks: blocks.len(),
        blocks_parsed,
        candidates: candidate_count,
        records: results.len(),
    };

    info!(
        blocks = stats.blocks,
        parsed = stats.blocks_parsed,
        candidates = stats.candidates,
        records = stats.records,
        deadline = %results
            .deadline
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "none".to_string()),
        "Extraction run complete"
    );

    for (i, record) in results.records.iter().enumerate() {
        info!("  {}. {}", i + 1, record);
    }

    RunOutcome { results, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeadlineKind, DropConfidence};
    use crate::report::{
        delivery_for, format_report, Delivery, SuppressReason, DEFAULT_MIN_REPORT_CHARS,
    };
    use chrono::Utc;

    #[test]
    fn test_scenario_single_claim() {
        let blocks = ["Mike Trout\nOF\nLAA\nBID\nJun 12, 2:00 AM"];
        let outcome = run_extraction(&blocks, &ScanSettings::default());
        assert_eq!(outcome.results.len(), 1);
        let record = &outcome.results.records[0];
        assert_eq!(record.player_name, "Mike Trout");
        assert_eq!(record.position.as_deref(), Some("OF"));
        assert_eq!(record.team.as_deref(), Some("LAA"));
        assert_eq!(record.bid_time.as_deref(), Some("Jun 12, 2:00 AM"));
    }

    #[test]
    fn test_scenario_short_block_yields_nothing() {
        let blocks = ["Juan Soto\nSP,RP\nNYY"];
        let outcome = run_extraction(&blocks, &ScanSettings::default());
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.stats.blocks_parsed, 0);
    }

    #[test]
    fn test_scenario_weekday_deadline_preferred() {
        let blocks = ["Free Agent Claims\nJun 13, 5:00 PM", "Thu Jun 12, 2:00 AM CDT"];
        let outcome = run_extraction(&blocks, &ScanSettings::default());
        let deadline = outcome.results.deadline.unwrap();
        assert_eq!(deadline.text, "Thu Jun 12, 2:00 AM");
        assert_eq!(deadline.kind, DeadlineKind::Weekday);
    }

    #[test]
    fn test_scenario_no_candidates() {
        let blocks = ["Pending Transactions", "nothing useful in here at all", ""];
        let outcome = run_extraction(&blocks, &ScanSettings::default());
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn test_scenario_no_candidates_renders_empty_report() {
        let blocks = ["Pending Transactions", "nothing useful in here at all", ""];
        let outcome = run_extraction(&blocks, &ScanSettings::default());
        let text = format_report(&outcome.results, &Utc::now());

        assert!(text.contains("Found 0 player(s) up for auction."));
        assert!(!text.contains("Auction Deadline:"));
        assert_eq!(
            delivery_for(&text, DEFAULT_MIN_REPORT_CHARS),
            Delivery::Suppress(SuppressReason::NoPlayers)
        );
    }

    #[test]
    fn test_deadline_block_is_not_a_player() {
        // "Thu Jun" looks like a name; the completeness gate keeps it out.
        let blocks = ["Claims process at Thu Jun 12, 2:00 AM CDT"];
        let outcome = run_extraction(&blocks, &ScanSettings::default());
        assert!(outcome.results.is_empty());
        assert!(outcome.results.deadline.is_some());
    }

    #[test]
    fn test_identical_blocks_parsed_once() {
        let block = "Mike Trout\nOF\nLAA\nBID\nJun 12, 2:00 AM";
        let blocks = [block, block, block];
        let (candidates, parsed) = scan_candidates(&blocks, &ScanSettings::default());
        assert_eq!(parsed, 1);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_incomplete_candidates_kept_when_allowed() {
        let blocks = ["Mike Trout\nOF\nBID SUBMITTED"];
        let strict = run_extraction(&blocks, &ScanSettings::default());
        assert!(strict.results.is_empty());

        let lenient = ScanSettings {
            require_complete_records: false,
            ..ScanSettings::default()
        };
        let outcome = run_extraction(&blocks, &lenient);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results.records[0].team, None);
    }

    #[test]
    fn test_nested_elements_drop_exclusion() {
        // The page nests elements: the outer block holds claim + drop, an inner
        // element holds only the dropped player's row.
        let filler: String = (0..9).map(|i| format!("${i}\n")).collect();
        let outer = format!("Mike Trout\nOF\nLAA\nBID\n{filler}Joey Gallo\n1B\nMIN");
        let inner = "Joey Gallo\n1B\nMIN\nRoster slot";
        let blocks = [inner.to_string(), outer];
        let outcome = run_extraction(&blocks, &ScanSettings::default());

        let names: Vec<_> = outcome
            .results
            .records
            .iter()
            .map(|r| r.player_name.as_str())
            .collect();
        assert_eq!(names, vec!["Mike Trout"]);
        assert_eq!(
            outcome.results.records[0].drop_confidence,
            Some(DropConfidence::Certain)
        );
        assert_eq!(outcome.stats.candidates, 2);
    }
}
