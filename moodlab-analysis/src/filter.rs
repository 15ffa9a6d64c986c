//! Interactive filter: mood subset plus trade-size range.
//!
//! Filters are validated on construction and never clamped. Applying a filter
//! always starts from the full enriched set; nothing is cached between calls.

use moodlab_core::{EnrichedTrade, Mood};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("mood selection is empty; choose at least one of Fear, Neutral, Greed")]
    EmptyMoodSet,

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("size range is inverted: min {min} > max {max}")]
    Inverted { min: f64, max: f64 },
}

/// Inclusive trade-size range in USD. `max == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeRange {
    min: f64,
    max: Option<f64>,
}

impl SizeRange {
    pub fn new(min: f64, max: Option<f64>) -> Result<Self, FilterError> {
        check_bound("size_min", min)?;
        if let Some(max) = max {
            check_bound("size_max", max)?;
            if min > max {
                return Err(FilterError::Inverted { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// `[0, ∞)`: admits every valid trade.
    pub fn full() -> Self {
        Self { min: 0.0, max: None }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn contains(&self, size: f64) -> bool {
        size >= self.min && self.max.map_or(true, |max| size <= max)
    }
}

fn check_bound(field: &'static str, value: f64) -> Result<(), FilterError> {
    if !value.is_finite() {
        return Err(FilterError::NonFinite { field, value });
    }
    if value < 0.0 {
        return Err(FilterError::Negative { field, value });
    }
    Ok(())
}

impl fmt::Display for SizeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{:.0}–{:.0} USD", self.min, max),
            None => write!(f, "≥ {:.0} USD", self.min),
        }
    }
}

/// Mood subset and size range applied to the enriched trade set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeFilter {
    moods: BTreeSet<Mood>,
    size: SizeRange,
}

impl TradeFilter {
    pub fn new(
        moods: impl IntoIterator<Item = Mood>,
        size: SizeRange,
    ) -> Result<Self, FilterError> {
        let moods: BTreeSet<Mood> = moods.into_iter().collect();
        if moods.is_empty() {
            return Err(FilterError::EmptyMoodSet);
        }
        Ok(Self { moods, size })
    }

    /// Every mood, full size range. Selects the whole enriched set.
    pub fn all() -> Self {
        Self {
            moods: Mood::ALL.into_iter().collect(),
            size: SizeRange::full(),
        }
    }

    /// The dashboard's initial controls: Fear days, 1 000–5 000 USD.
    pub fn dashboard_default() -> Self {
        Self {
            moods: BTreeSet::from([Mood::Fear]),
            size: SizeRange {
                min: 1_000.0,
                max: Some(5_000.0),
            },
        }
    }

    pub fn moods(&self) -> &BTreeSet<Mood> {
        &self.moods
    }

    pub fn size(&self) -> SizeRange {
        self.size
    }

    pub fn matches(&self, trade: &EnrichedTrade) -> bool {
        self.moods.contains(&trade.mood) && self.size.contains(trade.size())
    }

    /// Select matching trades, preserving input order.
    pub fn apply<'a>(&self, trades: &'a [EnrichedTrade]) -> Vec<&'a EnrichedTrade> {
        trades.iter().filter(|t| self.matches(t)).collect()
    }
}

impl fmt::Display for TradeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let moods: Vec<&str> = self.moods.iter().map(Mood::as_str).collect();
        write!(f, "moods [{}], size {}", moods.join(", "), self.size)
    }
}
