//! Mood — the daily market-sentiment label.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Daily market mood derived from the Fear & Greed index.
///
/// Ordering is Fear < Neutral < Greed. Group statistics, contingency tables
/// and model dummy columns all follow this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mood {
    Fear,
    Neutral,
    Greed,
}

impl Mood {
    pub const ALL: [Mood; 3] = [Mood::Fear, Mood::Neutral, Mood::Greed];

    /// Map an index classification to a mood.
    ///
    /// The index publishes five buckets; the extremes collapse onto their
    /// neighbours. Matching is case-insensitive and ignores surrounding space.
    pub fn from_classification(label: &str) -> Option<Mood> {
        match label.trim().to_ascii_lowercase().as_str() {
            "extreme fear" | "fear" => Some(Mood::Fear),
            "neutral" => Some(Mood::Neutral),
            "greed" | "extreme greed" => Some(Mood::Greed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Fear => "Fear",
            Mood::Neutral => "Neutral",
            Mood::Greed => "Greed",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mood '{0}' (expected Fear, Neutral or Greed)")]
pub struct ParseMoodError(pub String);

impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::from_classification(s).ok_or_else(|| ParseMoodError(s.to_string()))
    }
}
