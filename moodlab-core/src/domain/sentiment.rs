//! SentimentRecord — one day of the Fear & Greed index.

use super::mood::Mood;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Index reading for a calendar date. Dates are unique within a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub date: NaiveDate,
    pub mood: Mood,
    /// Raw index value (0 = extreme fear, 100 = extreme greed).
    pub score: f64,
}
