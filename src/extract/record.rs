// =============================================================================
// extract/record.rs - ONE BLOCK IN, AT MOST ONE CLAIM OUT
// =============================================================================
//
// A raw block is whatever text one DOM element coughed up. Sometimes that's a
// single tidy claim. Often it's a claim glued to the player being dropped for
// it, and there is no delimiter between the two: just name, tokens, name,
// tokens.
//
// The trick is to let names be the delimiters. We anchor on the first name,
// read at most eight lines forward, and stop the moment a different name
// shows up, since everything after it belongs to someone else.
//
// Which of the two names is the claim and which is the drop is then decided
// by looking for bid paperwork (BID / PTY / SUBMITTED) near each of them.
// =============================================================================

use tracing::debug;

use crate::classifier;
use crate::models::{DropConfidence, TransactionRecord};

/// Lines read for a player's details: the name line and the seven after it.
pub const RELEVANT_WINDOW: usize = 8;

/// How many lines either side of a name count as "near" for bid context.
pub const CONTEXT_RADIUS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NameLine<'a> {
    index: usize,
    text: &'a str,
}

/// Details read out of one name's window.
#[derive(Debug, Default)]
struct WindowFields {
    positions: Vec<String>,
    team: Option<String>,
    bid_time: Option<String>,
}

impl WindowFields {
    fn position(&self) -> Option<String> {
        match self.positions.len() {
            0 => None,
            1 => Some(self.positions[0].clone()),
            _ => Some(self.positions.join("/")),
        }
    }

    fn into_record(self, player_name: &str) -> TransactionRecord {
        let mut record = TransactionRecord::new(player_name);
        record.position = self.position();
        record.team = self.team;
        record.bid_time = self.bid_time;
        record
    }
}

/// Which name is the claim, which (if any) is the drop, and how sure we are.
#[derive(Debug, PartialEq, Eq)]
struct Resolution<'a> {
    claim: NameLine<'a>,
    drop: Option<&'a str>,
    confidence: Option<DropConfidence>,
}

/// Extract the claim carried by one raw block, if there is one.
///
/// Never fails: a block we can't make sense of simply yields `None`.
pub fn extract_record(block: &str) -> Option<TransactionRecord> {
    let lines: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let names: Vec<NameLine<'_>> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| classifier::is_name_line(line))
        .map(|(index, text)| NameLine { index, text: *text })
        .collect();

    let first = *names.first()?;
    let resolution = resolve_claim(&lines, &names, first);

    let mut record = window_fields(&lines, resolution.claim.index, resolution.claim.text)
        .into_record(resolution.claim.text);
    record.drop_player = resolution.drop.map(str::to_string);
    record.drop_confidence = resolution.confidence;

    if classifier::is_generic_label(&record.player_name)
        || classifier::is_position_list(&record.player_name)
    {
        debug!(name = %record.player_name, "Discarding page label masquerading as a player");
        return None;
    }

    debug!(
        player = %record.player_name,
        position = ?record.position,
        team = ?record.team,
        drop = ?record.drop_player,
        confidence = ?record.drop_confidence,
        "Block yielded a claim"
    );

    Some(record)
}

/// Walk a name's window and collect its positions, team and bid time.
/// Stops early at the first line carrying a different name.
fn window_fields(lines: &[&str], at: usize, name: &str) -> WindowFields {
    let mut fields = WindowFields::default();

    for line in lines.iter().skip(at).take(RELEVANT_WINDOW) {
        if *line != name && classifier::is_name_line(line) {
            break;
        }

        for position in classifier::extract_positions(line) {
            if !fields.positions.iter().any(|p| p == position) {
                fields.positions.push(position.to_string());
            }
        }

        if fields.team.is_none() {
            fields.team = classifier::extract_team(line).map(str::to_string);
        }

        if fields.bid_time.is_none() {
            fields.bid_time = classifier::extract_bid_time(line).map(str::to_string);
        }
    }

    fields
}

fn has_context_near(lines: &[&str], index: usize) -> bool {
    let start = index.saturating_sub(CONTEXT_RADIUS);
    let end = (index + CONTEXT_RADIUS + 1).min(lines.len());
    lines[start..end]
        .iter()
        .any(|line| classifier::has_bid_context(line))
}

fn resolve_claim<'a>(
    lines: &[&'a str],
    names: &[NameLine<'a>],
    first: NameLine<'a>,
) -> Resolution<'a> {
    // Repeats of the first name are the same player, not a second one.
    let Some(second) = names.iter().copied().find(|n| n.text != first.text) else {
        return Resolution {
            claim: first,
            drop: None,
            confidence: None,
        };
    };

    let first_has_bid = has_context_near(lines, first.index);
    let second_has_bid = has_context_near(lines, second.index);

    match (first_has_bid, second_has_bid) {
        (true, false) => Resolution {
            claim: first,
            drop: Some(second.text),
            confidence: Some(DropConfidence::Certain),
        },
        (false, true) => {
            debug!(claim = second.text, drop = first.text, "Bid context sits on the second name, swapping");
            Resolution {
                claim: second,
                drop: Some(first.text),
                confidence: Some(DropConfidence::Certain),
            }
        }
        _ => {
            // Ambiguous: first name is the claim. The drop is the last name
            // that isn't the claim, but only if the block mentions a bid at all.
            let keyword_anywhere = lines.iter().any(|line| classifier::has_bid_context(line));
            let last_distinct = names
                .iter()
                .rev()
                .map(|n| n.text)
                .find(|text| *text != first.text);

            match (keyword_anywhere, last_distinct) {
                (true, Some(drop)) => Resolution {
                    claim: first,
                    drop: Some(drop),
                    confidence: Some(DropConfidence::Heuristic),
                },
                _ => Resolution {
                    claim: first,
                    drop: None,
                    confidence: Some(DropConfidence::Unknown),
                },
            }
        }
    }
}
