//! Analysis session: tables loaded once, every analysis recomputed per filter.

use crate::describe::{describe_by_mood, headline};
use crate::error::AnalysisError;
use crate::filter::TradeFilter;
use crate::independence::mood_loss_independence;
use crate::model::{fit_loss_model, LossModel, ModelOptions};
use crate::rank_test::compare_moods;
use crate::report::{AnalysisReport, DatasetInfo, PreviewRow, Section};
use moodlab_core::data::{load_tables, DataSource, FetchOptions, LoadProgress};
use moodlab_core::{merge, EnrichedTrade, LoadError, LoadedTables, MergeReport, Mood};

/// Tunables for one analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Mood pair for the rank test.
    pub compare: (Mood, Mood),
    pub alpha: f64,
    pub preview_rows: usize,
    pub model: ModelOptions,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            compare: (Mood::Fear, Mood::Greed),
            alpha: 0.05,
            preview_rows: 10,
            model: ModelOptions::default(),
        }
    }
}

/// One user's view of the data. Owns its own copy; nothing is shared or
/// persisted across sessions.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: DatasetInfo,
    merge_report: MergeReport,
    enriched: Vec<EnrichedTrade>,
}

impl Session {
    /// Merge already-loaded tables.
    pub fn new(tables: LoadedTables) -> Self {
        let merged = merge(&tables.trades, &tables.sentiment);
        Self {
            dataset: DatasetInfo::from_tables(&tables),
            merge_report: merged.report,
            enriched: merged.trades,
        }
    }

    /// Load both sources, then merge. Load failures end the session.
    pub fn load(
        trades: &DataSource,
        sentiment: &DataSource,
        fetch: &FetchOptions,
        progress: &dyn LoadProgress,
    ) -> Result<Self, LoadError> {
        load_tables(trades, sentiment, fetch, progress).map(Self::new)
    }

    pub fn dataset(&self) -> &DatasetInfo {
        &self.dataset
    }

    pub fn merge_report(&self) -> &MergeReport {
        &self.merge_report
    }

    pub fn enriched(&self) -> &[EnrichedTrade] {
        &self.enriched
    }

    pub fn select(&self, filter: &TradeFilter) -> Vec<&EnrichedTrade> {
        filter.apply(&self.enriched)
    }

    /// Full analysis of the trades matching `filter`.
    pub fn analyze(&self, filter: &TradeFilter, opts: &AnalysisOptions) -> AnalysisReport {
        let selected = self.select(filter);
        tracing::debug!(%filter, selected = selected.len(), "analysis pass");

        let (a, b) = opts.compare;
        AnalysisReport {
            dataset: self.dataset.clone(),
            merge: self.merge_report.clone(),
            filter: filter.clone(),
            selected: selected.len(),
            alpha: opts.alpha,
            headline: headline(&selected),
            groups: describe_by_mood(&selected, filter.moods()),
            rank_test: Section::from_result(compare_moods(&selected, a, b)),
            independence: Section::from_result(mood_loss_independence(&selected)),
            model: Section::from_result(fit_loss_model(&selected, &opts.model)),
            preview: selected
                .iter()
                .take(opts.preview_rows)
                .map(|t| PreviewRow::from(*t))
                .collect(),
        }
    }

    /// Fit the loss model on the filtered set only.
    pub fn loss_model(
        &self,
        filter: &TradeFilter,
        opts: &ModelOptions,
    ) -> Result<LossModel, AnalysisError> {
        fit_loss_model(&self.select(filter), opts)
    }
}
