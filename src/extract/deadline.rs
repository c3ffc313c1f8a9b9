// =============================================================================
// extract/deadline.rs - WHEN DOES THIS ROUND CLOSE?
// =============================================================================
//
// The page states the claims deadline once, somewhere, with a weekday in
// front of it ("Thu Jun 12, 2:00 AM CDT"). Individual bids carry timestamps
// too, but never a weekday, which is how we tell them apart.
//
// Policy: first weekday-qualified match across all blocks wins. Only if
// there is none do we settle for a bare timestamp, and then only from a
// block that isn't a player's claim. A player's bid time is not the
// round deadline, however much it looks like one.
// =============================================================================

use tracing::debug;

use crate::classifier;
use crate::extract::record::extract_record;
use crate::models::{Deadline, DeadlineKind};

/// Find the auction deadline in one run's blocks, scanned in order.
pub fn extract_deadline<S: AsRef<str>>(blocks: &[S]) -> Option<Deadline> {
    let weekday = blocks
        .iter()
        .enumerate()
        .find_map(|(i, block)| classifier::extract_deadline_full(block.as_ref()).map(|d| (i, d)));

    if let Some((block_index, text)) = weekday {
        debug!(block_index, deadline = text, "Weekday-qualified deadline found");
        return Some(Deadline::new(text, DeadlineKind::Weekday));
    }

    let fallback = blocks.iter().enumerate().find_map(|(i, block)| {
        let block = block.as_ref();
        let time = classifier::extract_bid_time(block)?;
        if extract_record(block).is_some() {
            return None;
        }
        Some((i, time))
    });

    match fallback {
        Some((block_index, text)) => {
            debug!(block_index, deadline = text, "Falling back to a bare timestamp for the deadline");
            Some(Deadline::new(text, DeadlineKind::BidTimeFallback))
        }
        None => {
            debug!(blocks = blocks.len(), "No deadline anywhere in this run");
            None
        }
    }
}
