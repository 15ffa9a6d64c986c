//! MoodLab Core — domain types, typed loading and the trade/sentiment join.
//!
//! This crate contains everything up to the enriched trade set:
//! - Domain types (mood, trade, sentiment reading, enriched trade)
//! - Schema resolution and skip-and-count CSV ingestion
//! - Local and remote (HTTP, bounded timeout) sources
//! - Deterministic synthetic datasets
//! - Inner date join with explicit gap reporting

pub mod data;
pub mod domain;
pub mod merge;

pub use data::{load_tables, DataSource, FetchOptions, LoadError, LoadedTables};
pub use domain::{EnrichedTrade, Mood, SentimentRecord, Side, TradeRecord};
pub use merge::{merge, MergeGap, MergeReport, Merged};
