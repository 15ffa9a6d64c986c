//! Per-mood descriptive statistics and the headline metrics.

use crate::error::AnalysisError;
use crate::report::Section;
use moodlab_core::{EnrichedTrade, Mood};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// PnL summary for one mood partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub mean_pnl: f64,
    pub median_pnl: f64,
    /// Sample standard deviation (n − 1). `None` for a single trade.
    pub std_pnl: Option<f64>,
    pub total_pnl: f64,
    /// Share of trades with PnL < 0.
    pub loss_rate: f64,
    /// Share of trades with PnL ≤ 0.
    pub non_positive_rate: f64,
    pub mean_size: f64,
    pub total_fees: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodGroup {
    pub mood: Mood,
    pub stats: Section<GroupStats>,
}

/// Dashboard headline for the filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub trades: usize,
    /// Share of trades with PnL ≤ 0.
    pub chance_of_loss: f64,
    pub average_pnl: f64,
}

pub const NO_TRADES_MESSAGE: &str = "No trades found for the selected filters.";

/// Split trades by mood, preserving order within each partition.
pub fn partition<'a>(trades: &[&'a EnrichedTrade]) -> BTreeMap<Mood, Vec<&'a EnrichedTrade>> {
    let mut groups: BTreeMap<Mood, Vec<&'a EnrichedTrade>> = BTreeMap::new();
    for &trade in trades {
        groups.entry(trade.mood).or_default().push(trade);
    }
    groups
}

pub fn group_stats(trades: &[&EnrichedTrade]) -> Result<GroupStats, AnalysisError> {
    if trades.is_empty() {
        return Err(AnalysisError::insufficient("no trades in this group"));
    }
    let n = trades.len() as f64;
    let pnl: Vec<f64> = trades.iter().map(|t| t.pnl()).collect();

    let total_pnl: f64 = pnl.iter().sum();
    let mean_pnl = total_pnl / n;
    let std_pnl = (trades.len() >= 2).then(|| {
        let ss: f64 = pnl.iter().map(|p| (p - mean_pnl).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });

    Ok(GroupStats {
        count: trades.len(),
        mean_pnl,
        median_pnl: median(&pnl),
        std_pnl,
        total_pnl,
        loss_rate: trades.iter().filter(|t| t.is_loss()).count() as f64 / n,
        non_positive_rate: trades.iter().filter(|t| t.trade.is_non_positive()).count() as f64 / n,
        mean_size: trades.iter().map(|t| t.size()).sum::<f64>() / n,
        total_fees: trades.iter().map(|t| t.trade.fee).sum(),
    })
}

/// One entry per selected mood, in Fear, Neutral, Greed order. A mood with no
/// trades in the selection is reported as skipped.
pub fn describe_by_mood(trades: &[&EnrichedTrade], moods: &BTreeSet<Mood>) -> Vec<MoodGroup> {
    let groups = partition(trades);
    moods
        .iter()
        .map(|&mood| {
            let members = groups.get(&mood).map(Vec::as_slice).unwrap_or(&[]);
            let stats = group_stats(members).map_err(|_| {
                AnalysisError::insufficient(format!("no {mood} trades in the selection"))
            });
            MoodGroup {
                mood,
                stats: Section::from_result(stats),
            }
        })
        .collect()
}

pub fn headline(trades: &[&EnrichedTrade]) -> Section<Headline> {
    if trades.is_empty() {
        return Section::skipped(NO_TRADES_MESSAGE);
    }
    let n = trades.len() as f64;
    Section::Ready(Headline {
        trades: trades.len(),
        chance_of_loss: trades.iter().filter(|t| t.trade.is_non_positive()).count() as f64 / n,
        average_pnl: trades.iter().map(|t| t.pnl()).sum::<f64>() / n,
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
