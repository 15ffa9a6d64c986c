//! Column schemas for the two input tables.
//!
//! Headers are normalized (trimmed, lower-cased, spaces to underscores) and
//! each typed field is resolved against a priority-ordered alias list, so the
//! raw exchange export ("Closed PnL", "Timestamp IST", "Size USD") and the
//! plain schema ("profit_and_loss", "date", "size") both load unchanged.

use csv::StringRecord;

/// Normalize a header cell: `" Closed PnL"` → `"closed_pnl"`.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Find the first alias present in the normalized headers.
fn resolve(
    headers: &[String],
    field: &'static str,
    aliases: &'static [&'static str],
) -> Result<usize, SchemaError> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
        .ok_or_else(|| SchemaError::MissingColumn {
            field,
            accepted: aliases.join(", "),
        })
}

fn normalized(headers: &StringRecord) -> Vec<String> {
    headers.iter().map(normalize_header).collect()
}

/// Column positions of the trade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeColumns {
    pub trade_id: usize,
    pub account_id: usize,
    pub date: usize,
    pub symbol: usize,
    pub side: usize,
    pub size: usize,
    pub price: usize,
    pub pnl: usize,
    pub fee: usize,
}

/// Expected schema for trade records.
pub struct TradeSchema;

impl TradeSchema {
    pub const TRADE_ID: &'static [&'static str] = &["trade_id"];
    pub const ACCOUNT_ID: &'static [&'static str] = &["account_id", "account"];
    pub const DATE: &'static [&'static str] = &["date", "timestamp_ist", "timestamp"];
    pub const SYMBOL: &'static [&'static str] = &["symbol", "coin"];
    pub const SIDE: &'static [&'static str] = &["side"];
    pub const SIZE: &'static [&'static str] = &["size", "size_usd"];
    pub const PRICE: &'static [&'static str] = &["price", "execution_price"];
    pub const PNL: &'static [&'static str] = &["profit_and_loss", "closed_pnl", "pnl"];
    pub const FEE: &'static [&'static str] = &["fee"];

    /// Resolve every required column or report the first missing one.
    pub fn resolve(headers: &StringRecord) -> Result<TradeColumns, SchemaError> {
        let h = normalized(headers);
        Ok(TradeColumns {
            trade_id: resolve(&h, "trade_id", Self::TRADE_ID)?,
            account_id: resolve(&h, "account_id", Self::ACCOUNT_ID)?,
            date: resolve(&h, "date", Self::DATE)?,
            symbol: resolve(&h, "symbol", Self::SYMBOL)?,
            side: resolve(&h, "side", Self::SIDE)?,
            size: resolve(&h, "size", Self::SIZE)?,
            price: resolve(&h, "price", Self::PRICE)?,
            pnl: resolve(&h, "profit_and_loss", Self::PNL)?,
            fee: resolve(&h, "fee", Self::FEE)?,
        })
    }
}

/// Column positions of the sentiment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentColumns {
    pub date: usize,
    pub mood: usize,
    pub score: usize,
}

/// Expected schema for the sentiment index.
pub struct SentimentSchema;

impl SentimentSchema {
    pub const DATE: &'static [&'static str] = &["date"];
    pub const MOOD: &'static [&'static str] = &["classification", "mood"];
    pub const SCORE: &'static [&'static str] = &["value", "score"];

    pub fn resolve(headers: &StringRecord) -> Result<SentimentColumns, SchemaError> {
        let h = normalized(headers);
        Ok(SentimentColumns {
            date: resolve(&h, "date", Self::DATE)?,
            mood: resolve(&h, "mood", Self::MOOD)?,
            score: resolve(&h, "score", Self::SCORE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column '{field}' (accepted names: {accepted})")]
    MissingColumn {
        field: &'static str,
        accepted: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header(" Closed PnL"), "closed_pnl");
        assert_eq!(normalize_header("Timestamp IST"), "timestamp_ist");
        assert_eq!(normalize_header("fee"), "fee");
    }

    #[test]
    fn exchange_export_headers_resolve() {
        let headers = StringRecord::from(vec![
            "Account",
            "Coin",
            "Execution Price",
            "Size Tokens",
            "Size USD",
            "Side",
            "Timestamp IST",
            "Start Position",
            "Direction",
            "Closed PnL",
            "Transaction Hash",
            "Order ID",
            "Crossed",
            "Fee",
            "Trade ID",
            "Timestamp",
        ]);
        let cols = TradeSchema::resolve(&headers).unwrap();
        assert_eq!(cols.account_id, 0);
        assert_eq!(cols.symbol, 1);
        assert_eq!(cols.price, 2);
        assert_eq!(cols.size, 4);
        // "Timestamp IST" outranks the epoch-millis "Timestamp" column
        assert_eq!(cols.date, 6);
        assert_eq!(cols.pnl, 9);
        assert_eq!(cols.fee, 13);
        assert_eq!(cols.trade_id, 14);
    }

    #[test]
    fn plain_headers_resolve() {
        let headers = StringRecord::from(vec![
            "trade_id",
            "account_id",
            "date",
            "symbol",
            "side",
            "size",
            "price",
            "profit_and_loss",
            "fee",
        ]);
        let cols = TradeSchema::resolve(&headers).unwrap();
        assert_eq!(cols.trade_id, 0);
        assert_eq!(cols.pnl, 7);
    }

    #[test]
    fn missing_column_is_named() {
        let headers = StringRecord::from(vec!["date", "value"]);
        let err = SentimentSchema::resolve(&headers).unwrap_err();
        match err {
            SchemaError::MissingColumn { field, accepted } => {
                assert_eq!(field, "mood");
                assert!(accepted.contains("classification"));
            }
        }
    }

    #[test]
    fn fear_greed_index_headers_resolve() {
        let headers = StringRecord::from(vec!["timestamp", "value", "classification", "date"]);
        let cols = SentimentSchema::resolve(&headers).unwrap();
        assert_eq!(cols.score, 1);
        assert_eq!(cols.mood, 2);
        assert_eq!(cols.date, 3);
    }
}
