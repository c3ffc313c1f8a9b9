// =============================================================================
// report.rs - THE PLAIN-TEXT REPORT THE MAILER READS
// =============================================================================
//
// The mailer downstream is not clever. It reads this text, looks for the
// literal "Found 0 player(s)" and checks that the body is at least fifty
// characters long, and that's how it decides whether anything is worth
// sending. So the empty case must always print that sentinel, verbatim.
// =============================================================================

use chrono::{DateTime, TimeZone};
use std::fmt::{self, Write};

use crate::classifier;
use crate::models::{DropConfidence, ResultSet};

/// Control string the notification side keys off to skip sending.
pub const EMPTY_SENTINEL: &str = "Found 0 player(s)";

/// Reports shorter than this (trimmed) are treated as empty by the mailer.
pub const DEFAULT_MIN_REPORT_CHARS: usize = 50;

const TITLE: &str = "Fantasy Baseball Auction Alert";

/// Render a run's results as the plain-text report.
pub fn format_report<Tz>(results: &ResultSet, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut out = String::new();

    let deadline_fragment = results
        .deadline
        .as_ref()
        .and_then(|d| classifier::extract_month_day(&d.text))
        .map(|md| format!(" - Deadline {md}"))
        .unwrap_or_default();

    let _ = writeln!(
        out,
        "{TITLE}{deadline_fragment} - {}\n",
        generated_at.format("%Y-%m-%d %H:%M")
    );

    if let Some(deadline) = &results.deadline {
        let _ = writeln!(out, "Auction Deadline: {}\n", deadline.text);
    }

    if results.is_empty() {
        let _ = writeln!(out, "{EMPTY_SENTINEL} up for auction.");
        return out;
    }

    let _ = writeln!(out, "Found {} player(s) up for auction:\n", results.len());

    for (i, record) in results.records.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, record.player_name);
        let _ = writeln!(out, "   Position: {}", record.position.as_deref().unwrap_or("Unknown"));
        let _ = writeln!(out, "   Team: {}", record.team.as_deref().unwrap_or("Unknown"));
        if let Some(bid_time) = &record.bid_time {
            let _ = writeln!(out, "   Bid Time: {bid_time}");
        }
        if let Some(drop) = &record.drop_player {
            let marker = match record.drop_confidence {
                Some(DropConfidence::Heuristic) => " (unconfirmed)",
                _ => "",
            };
            let _ = writeln!(out, "   Dropping: {drop}{marker}");
        }
        out.push('\n');
    }

    out
}

/// What the notification side should do with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Send,
    Suppress(SuppressReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The report carries the empty sentinel.
    NoPlayers,
    /// The body is too short to hold a real claim.
    TooShort,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::NoPlayers => write!(f, "no players up for auction"),
            SuppressReason::TooShort => write!(f, "report body below length floor"),
        }
    }
}

/// The mailer's send/suppress rule, applied to a rendered report.
pub fn delivery_for(text: &str, min_chars: usize) -> Delivery {
    if text.contains(EMPTY_SENTINEL) {
        Delivery::Suppress(SuppressReason::NoPlayers)
    } else if text.trim().chars().count() < min_chars {
        Delivery::Suppress(SuppressReason::TooShort)
    } else {
        Delivery::Send
    }
}
