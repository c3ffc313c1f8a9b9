// =============================================================================
// classifier.rs - THE LINE SNIFFER
// =============================================================================
//
// Every line of text scraped off the pending-transactions page is one of a
// handful of things: a player's name, a position list, a team code, a bid
// timestamp, or noise. This module tells them apart.
//
// Everything here is line-local and stateless. The record extractor slides
// windows over a block and calls into these functions line by line, so no
// function may remember anything about the previous line.
//
// Tools of the trade:
// 1. regex: the name, team, timestamp and deadline patterns
// 2. Aho-Corasick: the bid-context keywords, matched in a single pass
// 3. memchr: the cheap "does this block mention a position at all?" check
//    that runs before a block is even split into lines
// =============================================================================

use aho_corasick::AhoCorasick;
use memchr::memmem;
use regex::Regex;
use std::sync::LazyLock;

/// Position codes that can be attached to a player.
pub const POSITION_CODES: &[&str] = &["SP", "RP", "C", "1B", "2B", "3B", "SS", "OF", "DH"];

/// Three-letter tokens that show up on the page but are never teams.
pub const TEAM_STOPLIST: &[&str] = &["BID", "PTY", "POS", "STA", "DEL", "CDT"];

/// Keywords that mark a name as the one actually being bid on.
pub const BID_CONTEXT_KEYWORDS: &[&str] = &["BID", "PTY", "SUBMITTED"];

/// Page chrome that happens to look like "Capitalized Capitalized".
/// Compared against the lower-cased full line.
pub const GENERIC_LABELS: &[&str] = &[
    "pending transactions",
    "fantasy advice",
    "roster",
    "players",
    "free agent",
    "agent claims",
    "claim budget",
    "free agent claims",
];

/// Two capitalized words in a row: "Mike Trout", "Free Agent", "Thu Jun".
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][a-z]+\s+[A-Z][a-z]+").expect("name pattern is a valid regex")
});

/// A whole line that is nothing but comma-separated position codes.
/// Includes the bare pitcher code `P`, which never counts as a position
/// for extraction but must still keep "SP,P" from looking like a name.
static POSITION_LIST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(SP|RP|C|1B|2B|3B|SS|OF|DH|P)(,(SP|RP|C|1B|2B|3B|SS|OF|DH|P))*$")
        .expect("position list pattern is a valid regex")
});

static POSITION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(SP|RP|C|1B|2B|3B|SS|OF|DH)\b").expect("position token pattern is a valid regex")
});

static TEAM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{3}\b").expect("team token pattern is a valid regex")
});

static BID_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d+,?\s+\d+:\d+\s+(AM|PM)")
        .expect("bid time pattern is a valid regex")
});

/// Weekday-qualified timestamp. Only the round deadline is printed this way
/// on the page, individual bids never carry a weekday.
static DEADLINE_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(Mon|Tue|Wed|Thu|Fri|Sat|Sun)\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d+,?\s+\d+:\d+\s+(AM|PM)",
    )
    .expect("deadline pattern is a valid regex")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d+")
        .expect("month/day pattern is a valid regex")
});

/// Case-sensitive on purpose: "Bid" in a player's name is not bid context.
static BID_CONTEXT_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(BID_CONTEXT_KEYWORDS).expect("Failed to build bid context automaton")
});

static POSITION_FINDERS: LazyLock<Vec<memmem::Finder<'static>>> = LazyLock::new(|| {
    POSITION_CODES
        .iter()
        .map(|code| memmem::Finder::new(code.as_bytes()))
        .collect()
});

/// Does this line carry a player name?
///
/// True when the line contains two consecutive capitalized words and is not,
/// as a whole, a comma list of position codes. The line is trimmed first, so
/// the answer never depends on surrounding whitespace.
pub fn is_name_line(line: &str) -> bool {
    let line = line.trim();
    NAME_PATTERN.is_match(line) && !is_position_list(line)
}

/// Anchored full-line test for `SP`, `SP,RP`, `1B,3B,OF` and friends.
pub fn is_position_list(text: &str) -> bool {
    POSITION_LIST_LINE.is_match(text.trim())
}

/// All whole-word position codes in the line, in order of appearance.
pub fn extract_positions(line: &str) -> Vec<&str> {
    POSITION_TOKEN.find_iter(line).map(|m| m.as_str()).collect()
}

/// First three-letter uppercase token that isn't on the stoplist.
pub fn extract_team(line: &str) -> Option<&str> {
    TEAM_TOKEN
        .find_iter(line)
        .map(|m| m.as_str())
        .find(|token| !TEAM_STOPLIST.contains(token))
}

/// First `Jun 12, 2:00 AM` style timestamp.
pub fn extract_bid_time(line: &str) -> Option<&str> {
    BID_TIME.find(line).map(|m| m.as_str())
}

/// First `Thu Jun 12, 2:00 AM` style timestamp.
pub fn extract_deadline_full(text: &str) -> Option<&str> {
    DEADLINE_FULL.find(text).map(|m| m.as_str())
}

/// The `Jun 12` part of a timestamp, used in the report header.
pub fn extract_month_day(text: &str) -> Option<&str> {
    MONTH_DAY.find(text).map(|m| m.as_str())
}

pub fn has_bid_context(line: &str) -> bool {
    BID_CONTEXT_AUTOMATON.is_match(line)
}

pub fn is_generic_label(name: &str) -> bool {
    let lowered = name.trim().to_lowercase();
    GENERIC_LABELS.contains(&lowered.as_str())
}

/// Quick check if a raw block mentions any position code anywhere, as a
/// plain substring. Blocks that fail this can't possibly hold a claim and
/// are not worth splitting into lines.
///
/// `C` is one of the codes, so in practice this only rejects blocks with no
/// capital C and no other code. It's a bouncer, not a judge.
pub fn quick_position_check(text: &str) -> bool {
    let bytes = text.as_bytes();
    POSITION_FINDERS.iter().any(|finder| finder.find(bytes).is_some())
}
