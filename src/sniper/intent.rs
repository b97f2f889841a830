//! Bid-intent parsing
//!
//! A favorite's note is free-form user text that may carry a small JSON
//! payload: `{"max_bid": "12.50"}`. Notes that don't parse as JSON are
//! ordinary notes, not failed intents. A note that *is* intent but whose
//! amount is unusable is reported as malformed so the user hears about it.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// The user's parsed maximum-bid ceiling for one favorite.
#[derive(Debug, Clone, PartialEq)]
pub enum BidIntent {
    /// No note, free-text note, or JSON without a `max_bid` field.
    Absent,
    /// A `max_bid` field that cannot be read as an amount.
    Malformed(String),
    /// A usable ceiling.
    Valid { max_bid: Decimal },
}

impl BidIntent {
    /// Parse a favorite's note. Never fails; malformed input becomes a
    /// variant, not an error.
    pub fn parse(note: Option<&str>) -> Self {
        let Some(note) = note else {
            return Self::Absent;
        };
        let note = note.trim();
        if note.is_empty() {
            return Self::Absent;
        }

        let Ok(value) = serde_json::from_str::<Value>(note) else {
            return Self::Absent;
        };
        let Some(raw) = value.get("max_bid") else {
            return Self::Absent;
        };

        match raw {
            Value::Number(n) => match Decimal::from_str(&n.to_string()) {
                Ok(max_bid) => Self::Valid { max_bid },
                Err(_) => Self::Malformed(format!("unusable max_bid value {n}")),
            },
            Value::String(s) => match Decimal::from_str(s.trim()) {
                Ok(max_bid) => Self::Valid { max_bid },
                Err(_) => Self::Malformed(format!("non-numeric max_bid '{s}'")),
            },
            other => Self::Malformed(format!("max_bid has unexpected type: {other}")),
        }
    }
}
