// =============================================================================
// aggregate.rs - FROM A PILE OF CANDIDATES TO A CLEAN LIST
// =============================================================================
//
// The same player can surface in several blocks (the page nests elements, so
// the same text shows up in a parent and in its child). A player being
// dropped can also show up on his own in some other block and look like a
// claim. This module folds the candidates into one list where:
//
// - every name appears once, first sighting wins
// - page labels and position lists never make it through
// - nobody who is being dropped somewhere is reported as a claim
//
// No globals: the seen-set travels inside the accumulator, and each step
// takes the accumulator by value and hands it back.
// =============================================================================

use std::collections::HashSet;
use tracing::debug;

use crate::classifier;
use crate::models::{Deadline, ResultSet, TransactionRecord};

/// State threaded through the fold.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    seen: HashSet<String>,
    records: Vec<TransactionRecord>,
}

impl Accumulator {
    pub fn into_records(self) -> Vec<TransactionRecord> {
        self.records
    }
}

/// Why a candidate didn't make it into the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    GenericLabel,
    PositionList,
    AlreadySeen,
    BeingDropped,
}

/// Lower-cased names of every player some candidate is dropping.
pub fn drop_set(candidates: &[TransactionRecord]) -> HashSet<String> {
    candidates
        .iter()
        .filter_map(|c| c.drop_player.as_deref())
        .map(str::to_lowercase)
        .collect()
}

/// Decide whether a candidate belongs in the output, given what the
/// accumulator has already let through.
pub fn screen(
    acc: &Accumulator,
    candidate: &TransactionRecord,
    drops: &HashSet<String>,
) -> Result<(), Rejection> {
    let key = candidate.name_key();
    if classifier::is_generic_label(&candidate.player_name) {
        Err(Rejection::GenericLabel)
    } else if classifier::is_position_list(&candidate.player_name) {
        Err(Rejection::PositionList)
    } else if acc.seen.contains(&key) {
        Err(Rejection::AlreadySeen)
    } else if drops.contains(&key) {
        Err(Rejection::BeingDropped)
    } else {
        Ok(())
    }
}

/// One fold step: returns the accumulator with the candidate appended, or
/// unchanged if the candidate was screened out.
pub fn fold(
    mut acc: Accumulator,
    candidate: TransactionRecord,
    drops: &HashSet<String>,
) -> Accumulator {
    match screen(&acc, &candidate, drops) {
        Ok(()) => {
            acc.seen.insert(candidate.name_key());
            acc.records.push(candidate);
        }
        Err(reason) => {
            debug!(player = %candidate.player_name, ?reason, "Candidate rejected");
        }
    }
    acc
}

/// Fold all of a run's candidates into its final result set.
pub fn aggregate(candidates: Vec<TransactionRecord>, deadline: Option<Deadline>) -> ResultSet {
    let drops = drop_set(&candidates);
    let total = candidates.len();

    let acc = candidates
        .into_iter()
        .fold(Accumulator::default(), |acc, candidate| fold(acc, candidate, &drops));

    debug!(
        candidates = total,
        kept = acc.records.len(),
        dropped_players = drops.len(),
        "Aggregation complete"
    );

    ResultSet {
        records: acc.into_records(),
        deadline,
    }
}
