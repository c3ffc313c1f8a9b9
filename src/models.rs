// =============================================================================
// models.rs - WHAT A CLAIM LOOKS LIKE ONCE WE'VE PULLED IT OUT OF THE SOUP
// =============================================================================
//
// A pending auction on the transactions page is a claimed player, maybe a
// player dropped to make room, and a bunch of loose tokens around them.
// These are the shapes we squeeze that into.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How sure the extractor is about a `drop_player`.
///
/// The claim/drop split is guessed from unlabeled text. Consumers get told
/// which guesses were backed by evidence and which were a default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropConfidence {
    /// Exactly one of the two names had bid context next to it.
    Certain,
    /// Evidence was ambiguous; the last distinct name was taken as the drop.
    Heuristic,
    /// A second name was present but nothing pointed either way, so no drop
    /// was recorded.
    Unknown,
}

impl fmt::Display for DropConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropConfidence::Certain => write!(f, "certain"),
            DropConfidence::Heuristic => write!(f, "heuristic"),
            DropConfidence::Unknown => write!(f, "unknown"),
        }
    }
}

/// One claim pulled out of one raw block.
///
/// Serializes to the `auction_players.json` shape: `player_name, position,
/// team, bid_time, drop_player`, with nulls for anything we didn't find.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub player_name: String,

    /// `/`-joined when the player is eligible at several spots, e.g. `SP/RP`.
    pub position: Option<String>,

    pub team: Option<String>,

    pub bid_time: Option<String>,

    pub drop_player: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_confidence: Option<DropConfidence>,
}

impl TransactionRecord {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            position: None,
            team: None,
            bid_time: None,
            drop_player: None,
            drop_confidence: None,
        }
    }

    /// Lower-cased name, the identity used for dedup and drop exclusion.
    pub fn name_key(&self) -> String {
        self.player_name.to_lowercase()
    }

    /// Has everything the mailer needs to say something useful.
    pub fn is_complete(&self) -> bool {
        self.position.is_some() && self.team.is_some()
    }
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {} - {}",
            self.player_name,
            self.position.as_deref().unwrap_or("Unknown"),
            self.team.as_deref().unwrap_or("Unknown"),
            self.bid_time.as_deref().unwrap_or("Unknown time"),
        )?;
        match (&self.drop_player, self.drop_confidence) {
            (Some(drop), Some(confidence)) if confidence != DropConfidence::Certain => {
                write!(f, " (dropping {drop}, {confidence})")?
            }
            (Some(drop), _) => write!(f, " (dropping {drop})")?,
            (None, _) => {}
        }
        Ok(())
    }
}

/// Where the deadline came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    /// `Thu Jun 12, 2:00 AM`, the form the page uses for the round cutoff.
    Weekday,
    /// A bare `Jun 12, 2:00 AM` found in a block that held no player.
    BidTimeFallback,
}

/// When the current auction round closes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deadline {
    pub text: String,
    pub kind: DeadlineKind,
}

impl Deadline {
    pub fn new(text: impl Into<String>, kind: DeadlineKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The clean output of one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSet {
    pub records: Vec<TransactionRecord>,
    pub deadline: Option<Deadline>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Identity of what a notification would say. Two runs with the same
    /// deadline and the same claim/drop pairs produce the same key, whatever
    /// order the page rendered them in.
    pub fn fingerprint(&self) -> String {
        let mut pairs: Vec<String> = self
            .records
            .iter()
            .map(|r| {
                format!(
                    "{}>{}",
                    r.name_key(),
                    r.drop_player.as_deref().unwrap_or("").to_lowercase()
                )
            })
            .collect();
        pairs.sort();
        format!(
            "{}|{}",
            self.deadline.as_ref().map(|d| d.text.as_str()).unwrap_or(""),
            pairs.join(",")
        )
    }
}

/// One run's worth of output, as handed from the watcher to the publisher.
#[derive(Debug, Clone, Serialize)]
pub struct AuctionReport {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub results: ResultSet,
    /// The rendered plain-text report.
    pub text: String,
}

impl AuctionReport {
    pub fn new(results: ResultSet, text: String, generated_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            generated_at,
            results,
            text,
        }
    }
}

impl fmt::Display for AuctionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} player(s), deadline ", self.id, self.results.len())?;
        match &self.results.deadline {
            Some(deadline) => write!(f, "{deadline}"),
            None => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_absent_fields_as_null() {
        let record = TransactionRecord::new("Mike Trout");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["player_name"], "Mike Trout");
        assert!(json["position"].is_null());
        assert!(json["team"].is_null());
        assert!(json["bid_time"].is_null());
        assert!(json["drop_player"].is_null());
        assert!(json.get("drop_confidence").is_none());
    }

    #[test]
    fn test_drop_confidence_serialized_when_set() {
        let mut record = TransactionRecord::new("Mike Trout");
        record.drop_player = Some("Joey Gallo".into());
        record.drop_confidence = Some(DropConfidence::Heuristic);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["drop_confidence"], "heuristic");
    }

    #[test]
    fn test_fingerprint_ignores_record_order() {
        let a = TransactionRecord::new("Mike Trout");
        let b = TransactionRecord::new("Juan Soto");
        let deadline = Some(Deadline::new("Thu Jun 12, 2:00 AM", DeadlineKind::Weekday));
        let first = ResultSet {
            records: vec![a.clone(), b.clone()],
            deadline: deadline.clone(),
        };
        let second = ResultSet {
            records: vec![b, a],
            deadline,
        };
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_record_display_mentions_drop() {
        let mut record = TransactionRecord::new("Mike Trout");
        record.position = Some("OF".into());
        record.team = Some("LAA".into());
        record.drop_player = Some("Joey Gallo".into());
        assert_eq!(
            record.to_string(),
            "Mike Trout (OF) - LAA - Unknown time (dropping Joey Gallo)"
        );
    }

    #[test]
    fn test_record_display_flags_unconfirmed_drop() {
        let mut record = TransactionRecord::new("Mike Trout");
        record.drop_player = Some("Joey Gallo".into());
        record.drop_confidence = Some(DropConfidence::Heuristic);
        assert!(record.to_string().ends_with("(dropping Joey Gallo, heuristic)"));

        record.drop_confidence = Some(DropConfidence::Certain);
        assert!(record.to_string().ends_with("(dropping Joey Gallo)"));
    }

    #[test]
    fn test_report_display_names_deadline() {
        let results = ResultSet {
            records: vec![TransactionRecord::new("Mike Trout")],
            deadline: Some(Deadline::new("Thu Jun 12, 2:00 AM", DeadlineKind::Weekday)),
        };
        let report = AuctionReport::new(results, String::new(), Utc::now());
        let shown = report.to_string();
        assert!(shown.starts_with(&format!("[{}]", report.id)));
        assert!(shown.ends_with("1 player(s), deadline Thu Jun 12, 2:00 AM"));

        let bare = AuctionReport::new(ResultSet::default(), String::new(), Utc::now());
        assert!(bare.to_string().ends_with("deadline unknown"));
    }
}
