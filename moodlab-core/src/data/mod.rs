//! Data loading: schema resolution, typed ingestion, remote fetch, synthetic data

pub mod fetch;
pub mod ingest;
pub mod loader;
pub mod provider;
pub mod schema;
pub mod synthetic;

pub use fetch::{FetchOptions, HttpFetcher};
pub use ingest::{ingest_sentiment, ingest_trades, parse_date, IngestReport, Ingested, RowRejection};
pub use loader::{compute_dataset_hash, load_tables, LoadedTables};
pub use provider::{DataSource, LoadError, LoadProgress, LogProgress, SilentProgress, TableKind};
pub use schema::{SchemaError, SentimentSchema, TradeSchema};
pub use synthetic::{generate, synthetic_tables, SyntheticParams};
