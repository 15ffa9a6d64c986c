//! TradeRecord — one fill from the exchange export.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(Side::Buy),
            "sell" | "s" => Ok(Side::Sell),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// A single trade, immutable once loaded.
///
/// `size` is the notional in USD and is always > 0; `fee` is always >= 0.
/// Both are enforced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub price: f64,
    pub pnl: f64,
    pub fee: f64,
}

impl TradeRecord {
    /// A loss is a strictly negative PnL.
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }

    /// Zero-PnL fills (typically position openings) count as "not making money".
    pub fn is_non_positive(&self) -> bool {
        self.pnl <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64) -> TradeRecord {
        TradeRecord {
            trade_id: "1".into(),
            account_id: "0xabc".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            symbol: "BTC".into(),
            side: Side::Sell,
            size: 1500.0,
            price: 62_000.0,
            pnl,
            fee: 0.35,
        }
    }

    #[test]
    fn zero_pnl_is_not_a_loss_but_is_non_positive() {
        let t = trade(0.0);
        assert!(!t.is_loss());
        assert!(t.is_non_positive());
    }

    #[test]
    fn negative_pnl_is_loss() {
        assert!(trade(-0.01).is_loss());
        assert!(!trade(12.0).is_loss());
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("BUY".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" sell ".parse::<Side>().unwrap(), Side::Sell);
        assert!("hold".parse::<Side>().is_err());
    }
}
