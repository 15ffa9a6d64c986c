//! Typed ingestion of CSV tables.
//!
//! Every row is validated against the schema and either becomes a typed record
//! or a `RowRejection`. Rejected rows are skipped and counted; the first few are
//! kept verbatim so the caller can show what went wrong. Nothing is dropped
//! silently.

use super::provider::LoadError;
use super::schema::{SentimentColumns, SentimentSchema, TradeColumns, TradeSchema};
use crate::domain::{Mood, SentimentRecord, Side, TradeRecord};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;

/// How many rejections are kept in full. All rejections are counted.
pub const MAX_KEPT_REJECTIONS: usize = 20;

/// Accepted date layouts, tried in order on the first token of the cell.
/// Exchange exports are day-first (`02-12-2024 22:50`).
const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// One row that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    /// 1-based line number in the source (header is line 1).
    pub line: u64,
    pub column: Option<String>,
    pub reason: String,
}

/// Per-table load accounting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_rejected: usize,
    /// First `MAX_KEPT_REJECTIONS` rejections.
    pub rejections: Vec<RowRejection>,
}

impl IngestReport {
    fn reject(&mut self, rejection: RowRejection) {
        self.rows_rejected += 1;
        if self.rejections.len() < MAX_KEPT_REJECTIONS {
            self.rejections.push(rejection);
        }
    }
}

/// Typed records plus their load report.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub report: IngestReport,
}

/// Parse a date cell. Only the first whitespace-separated token is used, so
/// `"02-12-2024 22:50"` becomes 2024-12-02. The year must have four digits;
/// `%Y` alone would read `02-12-24` as year 24.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let token = cell.split_whitespace().next()?;
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(token, fmt)
            .ok()
            .filter(|date| (1000..=9999).contains(&date.year()))
    })
}

/// Cell accessor that turns every failure into a `RowRejection`.
struct Row<'a> {
    record: &'a csv::StringRecord,
    line: u64,
}

impl<'a> Row<'a> {
    fn reject(&self, column: &str, reason: impl Into<String>) -> RowRejection {
        RowRejection {
            line: self.line,
            column: Some(column.to_string()),
            reason: reason.into(),
        }
    }

    fn text(&self, idx: usize, column: &str) -> Result<&'a str, RowRejection> {
        match self.record.get(idx).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.reject(column, "missing value")),
        }
    }

    fn number(&self, idx: usize, column: &str) -> Result<f64, RowRejection> {
        let raw = self.text(idx, column)?;
        let value: f64 = raw
            .parse()
            .map_err(|_| self.reject(column, format!("not a number: '{raw}'")))?;
        if !value.is_finite() {
            return Err(self.reject(column, format!("non-finite number: '{raw}'")));
        }
        Ok(value)
    }

    fn date(&self, idx: usize, column: &str) -> Result<NaiveDate, RowRejection> {
        let raw = self.text(idx, column)?;
        parse_date(raw).ok_or_else(|| self.reject(column, format!("unparsable date: '{raw}'")))
    }
}

fn parse_trade(row: &Row<'_>, cols: &TradeColumns) -> Result<TradeRecord, RowRejection> {
    let size = row.number(cols.size, "size")?;
    if size <= 0.0 {
        return Err(row.reject("size", format!("size must be > 0, got {size}")));
    }
    let fee = row.number(cols.fee, "fee")?;
    if fee < 0.0 {
        return Err(row.reject("fee", format!("fee must be >= 0, got {fee}")));
    }
    let side_raw = row.text(cols.side, "side")?;
    let side: Side = side_raw.parse().map_err(|e: String| row.reject("side", e))?;

    Ok(TradeRecord {
        trade_id: row.text(cols.trade_id, "trade_id")?.to_string(),
        account_id: row.text(cols.account_id, "account_id")?.to_string(),
        date: row.date(cols.date, "date")?,
        symbol: row.text(cols.symbol, "symbol")?.to_string(),
        side,
        size,
        price: row.number(cols.price, "price")?,
        pnl: row.number(cols.pnl, "profit_and_loss")?,
        fee,
    })
}

fn parse_sentiment(
    row: &Row<'_>,
    cols: &SentimentColumns,
) -> Result<SentimentRecord, RowRejection> {
    let label = row.text(cols.mood, "mood")?;
    let mood = Mood::from_classification(label)
        .ok_or_else(|| row.reject("mood", format!("unknown classification '{label}'")))?;
    Ok(SentimentRecord {
        date: row.date(cols.date, "date")?,
        mood,
        score: row.number(cols.score, "score")?,
    })
}

/// Drive a CSV reader through `parse`, collecting records and rejections.
fn ingest_with<R, C, T, F>(
    reader: R,
    location: &str,
    resolve: impl FnOnce(&csv::StringRecord) -> Result<C, super::schema::SchemaError>,
    mut parse: F,
) -> Result<Ingested<T>, LoadError>
where
    R: Read,
    F: FnMut(&Row<'_>, &C) -> Result<T, RowRejection>,
{
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| LoadError::Read {
            location: location.to_string(),
            reason: e.to_string(),
        })?
        .clone();
    let cols = resolve(&headers).map_err(|source| LoadError::Schema {
        location: location.to_string(),
        source,
    })?;

    let mut records = Vec::new();
    let mut report = IngestReport::default();

    for result in rdr.records() {
        report.rows_read += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(LoadError::Read {
                    location: location.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                report.reject(RowRejection {
                    line: e.position().map(|p| p.line()).unwrap_or(0),
                    column: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let row = Row {
            record: &record,
            line: record.position().map(|p| p.line()).unwrap_or(0),
        };
        match parse(&row, &cols) {
            Ok(value) => records.push(value),
            Err(rejection) => report.reject(rejection),
        }
    }

    report.rows_loaded = records.len();
    if records.is_empty() {
        return Err(LoadError::NoValidRows {
            location: location.to_string(),
            rejected: report.rows_rejected,
        });
    }
    if report.rows_rejected > 0 {
        tracing::warn!(
            location,
            rejected = report.rows_rejected,
            loaded = report.rows_loaded,
            "rows rejected during load"
        );
    }

    Ok(Ingested { records, report })
}

/// Ingest the trade table.
pub fn ingest_trades<R: Read>(reader: R, location: &str) -> Result<Ingested<TradeRecord>, LoadError> {
    ingest_with(reader, location, TradeSchema::resolve, parse_trade)
}

/// Ingest the sentiment table. A repeated date is rejected; the first
/// occurrence wins.
pub fn ingest_sentiment<R: Read>(
    reader: R,
    location: &str,
) -> Result<Ingested<SentimentRecord>, LoadError> {
    let mut seen: HashSet<NaiveDate> = HashSet::new();
    ingest_with(reader, location, SentimentSchema::resolve, |row, cols| {
        let record = parse_sentiment(row, cols)?;
        if !seen.insert(record.date) {
            return Err(row.reject("date", format!("duplicate date {}", record.date)));
        }
        Ok(record)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRADES_CSV: &str = "\
Account,Coin,Execution Price,Size Tokens,Size USD,Side,Timestamp IST,Start Position,Direction,Closed PnL,Transaction Hash,Order ID,Crossed,Fee,Trade ID,Timestamp
0xae,@107,7.9769,986.87,7872.16,BUY,02-12-2024 22:50,0,Buy,0,0xec09,52017706630,TRUE,0.345404,895000000000000,1730000000000
0xae,@107,7.98,16,127.68,BUY,02-12-2024 22:50,986.52,Buy,-4.5,0xec09,52017706630,TRUE,0.0056,443000000000000,1730000000000
0xae,@107,7.98,0,0,BUY,02-12-2024 22:50,986.52,Buy,0,0xec09,52017706630,TRUE,0.0056,443000000000001,1730000000000
0xae,@107,abc,16,127.68,SELL,03-12-2024 10:00,986.52,Sell,1.0,0xec09,52017706630,TRUE,0.0056,443000000000002,1730000000000
";

    #[test]
    fn parse_date_day_first_with_time() {
        assert_eq!(
            parse_date("02-12-2024 22:50"),
            NaiveDate::from_ymd_opt(2024, 12, 2)
        );
    }

    #[test]
    fn parse_date_iso() {
        assert_eq!(parse_date("2018-02-01"), NaiveDate::from_ymd_opt(2018, 2, 1));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("1730000000000"), None);
    }

    #[test]
    fn parse_date_rejects_two_digit_year() {
        assert_eq!(parse_date("02-12-24 10:00"), None);
        assert_eq!(parse_date("24-12-02"), None);
        assert_eq!(parse_date("02/12/24"), None);
    }

    #[test]
    fn two_digit_year_row_is_rejected_on_date_column() {
        let csv = "trade_id,account_id,date,symbol,side,size,price,profit_and_loss,fee\n\
                   1,a,02-12-24 10:00,BTC,BUY,100,40000,1.0,0.1\n\
                   2,a,02-12-2024 10:00,BTC,SELL,100,40000,1.0,0.1\n";
        let ingested = ingest_trades(csv.as_bytes(), "inline").unwrap();
        assert_eq!(ingested.records.len(), 1);
        assert_eq!(ingested.report.rows_rejected, 1);
        let rejection = &ingested.report.rejections[0];
        assert_eq!(rejection.column.as_deref(), Some("date"));
        assert!(rejection.reason.contains("02-12-24"));
    }

    #[test]
    fn trades_skip_and_count() {
        let ingested = ingest_trades(TRADES_CSV.as_bytes(), "inline").unwrap();
        assert_eq!(ingested.report.rows_read, 4);
        assert_eq!(ingested.report.rows_loaded, 2);
        assert_eq!(ingested.report.rows_rejected, 2);
        assert_eq!(ingested.records.len(), 2);

        let first = &ingested.records[0];
        assert_eq!(first.symbol, "@107");
        assert_eq!(first.side, Side::Buy);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 12, 2).unwrap());
        assert!((first.size - 7872.16).abs() < 1e-9);
        assert!((ingested.records[1].pnl + 4.5).abs() < 1e-12);

        let reasons: Vec<&str> = ingested
            .report
            .rejections
            .iter()
            .filter_map(|r| r.column.as_deref())
            .collect();
        assert_eq!(reasons, vec!["size", "price"]);
        assert_eq!(ingested.report.rejections[0].line, 4);
    }

    #[test]
    fn negative_fee_rejected() {
        let csv = "trade_id,account_id,date,symbol,side,size,price,profit_and_loss,fee\n\
                   1,a,2024-01-01,BTC,BUY,100,40000,1.0,-0.1\n\
                   2,a,2024-01-01,BTC,SELL,100,40000,1.0,0.1\n";
        let ingested = ingest_trades(csv.as_bytes(), "inline").unwrap();
        assert_eq!(ingested.report.rows_rejected, 1);
        assert_eq!(ingested.records[0].trade_id, "2");
    }

    #[test]
    fn short_row_is_rejected_not_fatal() {
        let csv = "trade_id,account_id,date,symbol,side,size,price,profit_and_loss,fee\n\
                   1,a,2024-01-01\n\
                   2,a,2024-01-01,BTC,SELL,100,40000,1.0,0.1\n";
        let ingested = ingest_trades(csv.as_bytes(), "inline").unwrap();
        assert_eq!(ingested.report.rows_rejected, 1);
        assert_eq!(ingested.records.len(), 1);
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "trade_id,date,symbol\n1,2024-01-01,BTC\n";
        let err = ingest_trades(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, LoadError::Schema { .. }));
        assert!(err.to_string().contains("account_id"));
    }

    #[test]
    fn all_rows_rejected_is_fatal() {
        let csv = "date,value,classification\n2024-01-01,x,Fear\n";
        let err = ingest_sentiment(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, LoadError::NoValidRows { rejected: 1, .. }));
    }

    #[test]
    fn sentiment_normalizes_and_dedupes() {
        let csv = "timestamp,value,classification,date\n\
                   1517463000,30,Fear,2018-02-01\n\
                   1517549400,15,Extreme Fear,2018-02-02\n\
                   1517549400,16,Fear,2018-02-02\n\
                   1517635800,80,Extreme Greed,2018-02-03\n\
                   1517722200,50,Meh,2018-02-04\n";
        let ingested = ingest_sentiment(csv.as_bytes(), "inline").unwrap();
        assert_eq!(ingested.records.len(), 3);
        assert_eq!(ingested.records[1].mood, Mood::Fear);
        assert_eq!(ingested.records[1].score, 15.0);
        assert_eq!(ingested.records[2].mood, Mood::Greed);
        assert_eq!(ingested.report.rows_rejected, 2);
        assert!(ingested.report.rejections[0].reason.contains("duplicate"));
        assert!(ingested.report.rejections[1].reason.contains("Meh"));
    }
}
