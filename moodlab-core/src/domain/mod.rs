//! Domain types for MoodLab

pub mod enriched;
pub mod mood;
pub mod sentiment;
pub mod trade;

pub use enriched::EnrichedTrade;
pub use mood::{Mood, ParseMoodError};
pub use sentiment::SentimentRecord;
pub use trade::{Side, TradeRecord};
