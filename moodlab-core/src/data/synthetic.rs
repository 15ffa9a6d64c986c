//! Deterministic synthetic datasets for demos and tests.
//!
//! The sentiment index is a noisy 45-day cycle, so every mood appears in any
//! run longer than a cycle. Trades are drawn per day with a loss probability
//! that depends on the mood and on trade size, so every downstream statistic
//! has something to find. A few index days are left out
//! on purpose so the merge gap path is exercised too.
//!
//! Synthetic data is tagged (`LoadedTables::synthetic`) and reports say so.

use super::loader::LoadedTables;
use super::provider::LoadError;
use crate::domain::{Mood, SentimentRecord, Side, TradeRecord};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Shape of the generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticParams {
    pub seed: u64,
    pub start: NaiveDate,
    pub days: u32,
    pub trades_per_day: u32,
    /// Every n-th day has no index reading (0 disables gaps).
    pub gap_every: u32,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            days: 120,
            trades_per_day: 25,
            gap_every: 17,
        }
    }
}

const CYCLE_DAYS: f64 = 45.0;

const SYMBOLS: [&str; 4] = ["BTC", "ETH", "SOL", "HYPE"];

/// The index's own five-bucket classification of a score.
fn classify(score: f64) -> &'static str {
    match score {
        s if s < 25.0 => "Extreme Fear",
        s if s < 46.0 => "Fear",
        s if s <= 54.0 => "Neutral",
        s if s < 75.0 => "Greed",
        _ => "Extreme Greed",
    }
}

fn base_loss_probability(mood: Mood) -> f64 {
    match mood {
        Mood::Fear => 0.48,
        Mood::Neutral => 0.42,
        Mood::Greed => 0.36,
    }
}

/// Generate a synthetic trade table and sentiment index.
pub fn generate(params: &SyntheticParams) -> (Vec<TradeRecord>, Vec<SentimentRecord>) {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut sentiment = Vec::new();
    let mut trades = Vec::new();
    let mut next_id: u64 = 1;

    for day in 0..params.days {
        let date = params.start + Duration::days(i64::from(day));
        let phase = std::f64::consts::TAU * f64::from(day) / CYCLE_DAYS;
        let reading = (50.0 + 35.0 * phase.sin() + rng.gen_range(-8.0..8.0))
            .clamp(1.0, 99.0)
            .round();
        let mood = Mood::from_classification(classify(reading)).unwrap_or(Mood::Neutral);

        let is_gap = params.gap_every > 0 && day % params.gap_every == params.gap_every - 1;
        if !is_gap {
            sentiment.push(SentimentRecord {
                date,
                mood,
                score: reading,
            });
        }

        for _ in 0..params.trades_per_day {
            let size: f64 = (rng.gen_range(4.0_f64..10.0).exp()).round();
            // Larger trades lose slightly more often.
            let p_loss = (base_loss_probability(mood) + 0.02 * (size.ln() - 7.0)).clamp(0.05, 0.95);
            let magnitude = size * rng.gen_range(0.001..0.04);
            let pnl = if rng.gen_bool(p_loss) {
                -magnitude
            } else {
                magnitude * rng.gen_range(0.6..1.4)
            };
            let symbol = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
            let price = match symbol {
                "BTC" => rng.gen_range(40_000.0..70_000.0),
                "ETH" => rng.gen_range(2_000.0..4_000.0),
                "SOL" => rng.gen_range(80.0..200.0),
                _ => rng.gen_range(5.0..40.0),
            };

            trades.push(TradeRecord {
                trade_id: next_id.to_string(),
                account_id: format!("0x{:04x}", rng.gen_range(0..32u32)),
                date,
                symbol: symbol.to_string(),
                side: if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
                size,
                price: (price * 100.0_f64).round() / 100.0,
                pnl: (pnl * 100.0_f64).round() / 100.0,
                fee: (size * 0.00035 * 1e6_f64).round() / 1e6,
            });
            next_id += 1;
        }
    }

    (trades, sentiment)
}

/// Generate and wrap as tagged tables.
pub fn synthetic_tables(params: &SyntheticParams) -> Result<LoadedTables, LoadError> {
    let (trades, sentiment) = generate(params);
    LoadedTables::from_records(trades, sentiment, true)
}

/// Write a trade table in the plain schema.
pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "trade_id",
        "account_id",
        "date",
        "symbol",
        "side",
        "size",
        "price",
        "profit_and_loss",
        "fee",
    ])?;
    for t in trades {
        wtr.write_record([
            t.trade_id.clone(),
            t.account_id.clone(),
            t.date.format("%Y-%m-%d").to_string(),
            t.symbol.clone(),
            t.side.to_string(),
            t.size.to_string(),
            t.price.to_string(),
            t.pnl.to_string(),
            t.fee.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a sentiment index in the Fear & Greed export layout.
pub fn write_sentiment_csv(path: &Path, sentiment: &[SentimentRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["value", "classification", "date"])?;
    for s in sentiment {
        wtr.write_record([
            s.score.to_string(),
            classify(s.score).to_string(),
            s.date.format("%Y-%m-%d").to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
