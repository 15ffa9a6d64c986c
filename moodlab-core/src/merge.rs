//! Trade ↔ sentiment date join.
//!
//! Inner join on exact calendar date. A trade whose date has no index reading
//! is excluded from everything downstream, and the exclusion is reported as a
//! `MergeGap` (count plus the distinct dates involved). Nothing is defaulted:
//! an enriched trade's mood always comes from the sentiment table.

use crate::domain::{EnrichedTrade, SentimentRecord, TradeRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Trades dropped by the join because their date has no index reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeGap {
    pub excluded: usize,
    /// Distinct unmatched dates, ascending.
    pub dates: Vec<NaiveDate>,
}

impl fmt::Display for MergeGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trade(s) on {} date(s) without a sentiment reading were excluded",
            self.excluded,
            self.dates.len()
        )?;
        if let (Some(first), Some(last)) = (self.dates.first(), self.dates.last()) {
            write!(f, " ({first} .. {last})")?;
        }
        Ok(())
    }
}

/// Join accounting. `enriched + excluded == total_trades` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub total_trades: usize,
    pub enriched: usize,
    pub gap: Option<MergeGap>,
}

impl MergeReport {
    pub fn excluded(&self) -> usize {
        self.gap.as_ref().map_or(0, |g| g.excluded)
    }
}

/// Result of the join.
#[derive(Debug, Clone)]
pub struct Merged {
    pub trades: Vec<EnrichedTrade>,
    pub report: MergeReport,
}

/// Inner-join trades to sentiment by date, preserving trade order.
pub fn merge(trades: &[TradeRecord], sentiment: &[SentimentRecord]) -> Merged {
    // First reading for a date wins, as in the loader.
    let mut by_date: HashMap<NaiveDate, &SentimentRecord> = HashMap::with_capacity(sentiment.len());
    for s in sentiment {
        by_date.entry(s.date).or_insert(s);
    }

    let mut enriched = Vec::with_capacity(trades.len());
    let mut excluded = 0usize;
    let mut missing_dates = BTreeSet::new();

    for trade in trades {
        match by_date.get(&trade.date) {
            Some(reading) => enriched.push(EnrichedTrade::join(trade, reading)),
            None => {
                excluded += 1;
                missing_dates.insert(trade.date);
            }
        }
    }

    let gap = (excluded > 0).then(|| MergeGap {
        excluded,
        dates: missing_dates.into_iter().collect(),
    });
    if let Some(ref g) = gap {
        tracing::warn!(excluded = g.excluded, dates = g.dates.len(), "merge gap");
    }
    tracing::info!(total = trades.len(), enriched = enriched.len(), "trades merged with sentiment");

    Merged {
        report: MergeReport {
            total_trades: trades.len(),
            enriched: enriched.len(),
            gap,
        },
        trades: enriched,
    }
}
