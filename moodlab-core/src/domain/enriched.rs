//! EnrichedTrade — a trade joined with the mood of its calendar date.

use super::mood::Mood;
use super::sentiment::SentimentRecord;
use super::trade::TradeRecord;
use serde::{Deserialize, Serialize};

/// A trade carrying exactly one mood, taken from the sentiment record whose
/// date equals the trade date. Only the merger constructs these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrade {
    pub trade: TradeRecord,
    pub mood: Mood,
    pub sentiment_score: f64,
}

impl EnrichedTrade {
    pub fn join(trade: &TradeRecord, sentiment: &SentimentRecord) -> Self {
        debug_assert_eq!(trade.date, sentiment.date);
        Self {
            trade: trade.clone(),
            mood: sentiment.mood,
            sentiment_score: sentiment.score,
        }
    }

    pub fn pnl(&self) -> f64 {
        self.trade.pnl
    }

    pub fn size(&self) -> f64 {
        self.trade.size
    }

    pub fn is_loss(&self) -> bool {
        self.trade.is_loss()
    }
}
