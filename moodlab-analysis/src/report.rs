//! Analysis report: section outcomes, Markdown rendering and JSON export.

use crate::describe::{GroupStats, Headline, MoodGroup};
use crate::error::AnalysisError;
use crate::filter::TradeFilter;
use crate::independence::IndependenceTest;
use crate::model::LossModel;
use crate::rank_test::RankComparison;
use moodlab_core::{EnrichedTrade, LoadedTables, MergeReport, Mood};
use serde::Serialize;
use std::fmt::Write as _;

// ─── Section ─────────────────────────────────────────────────────────

/// Outcome of one report section. A skipped section carries the reason and
/// never a placeholder number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Skipped { reason: String },
}

impl<T> Section<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn from_result(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::skipped(e.to_string()),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Skipped { reason } => Some(reason),
        }
    }
}

// ─── Report ──────────────────────────────────────────────────────────

/// Where the data came from and how much of it loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub hash: String,
    pub synthetic: bool,
    pub trades_loaded: usize,
    pub trades_rejected: usize,
    pub sentiment_loaded: usize,
    pub sentiment_rejected: usize,
}

impl DatasetInfo {
    pub fn from_tables(tables: &LoadedTables) -> Self {
        Self {
            hash: tables.dataset_hash.clone(),
            synthetic: tables.synthetic,
            trades_loaded: tables.trades_report.rows_loaded,
            trades_rejected: tables.trades_report.rows_rejected,
            sentiment_loaded: tables.sentiment_report.rows_loaded,
            sentiment_rejected: tables.sentiment_report.rows_rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub mood: Mood,
    pub size_usd: f64,
    pub closed_pnl: f64,
}

impl From<&EnrichedTrade> for PreviewRow {
    fn from(t: &EnrichedTrade) -> Self {
        Self {
            mood: t.mood,
            size_usd: t.size(),
            closed_pnl: t.pnl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub dataset: DatasetInfo,
    pub merge: MergeReport,
    pub filter: TradeFilter,
    pub selected: usize,
    pub alpha: f64,
    pub headline: Section<Headline>,
    pub groups: Vec<MoodGroup>,
    pub rank_test: Section<RankComparison>,
    pub independence: Section<IndependenceTest>,
    pub model: Section<LossModel>,
    pub preview: Vec<PreviewRow>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ─── Markdown ────────────────────────────────────────────────────────

pub struct MarkdownReport;

impl MarkdownReport {
    pub fn render(&self, report: &AnalysisReport) -> String {
        let mut out = String::new();
        // fmt::Write into a String cannot fail
        let _ = self.write(&mut out, report);
        out
    }

    fn write(&self, out: &mut String, r: &AnalysisReport) -> std::fmt::Result {
        writeln!(out, "# Trader Behavior vs Market Sentiment\n")?;
        let hash_prefix: String = r.dataset.hash.chars().take(12).collect();
        writeln!(out, "Dataset: `{hash_prefix}`")?;
        if r.dataset.synthetic {
            writeln!(out, "**Synthetic data**: generated, not market records.")?;
        }
        writeln!(
            out,
            "- Trades loaded: {} ({} rejected)\n- Index days loaded: {} ({} rejected)",
            r.dataset.trades_loaded,
            r.dataset.trades_rejected,
            r.dataset.sentiment_loaded,
            r.dataset.sentiment_rejected
        )?;
        match &r.merge.gap {
            Some(gap) => writeln!(out, "- Merge: {} enriched; {gap}", r.merge.enriched)?,
            None => writeln!(out, "- Merge: all {} trades enriched", r.merge.enriched)?,
        }
        writeln!(out, "- Filter: {} → {} trades", r.filter, r.selected)?;

        writeln!(out, "\n## Headline\n")?;
        match &r.headline {
            Section::Ready(h) => writeln!(
                out,
                "| Trades | Chance of losing money | Average PnL |\n\
                 |--------|------------------------|-------------|\n\
                 | {} | {:.1}% | {:+.2} |",
                h.trades,
                h.chance_of_loss * 100.0,
                h.average_pnl
            )?,
            Section::Skipped { reason } => writeln!(out, "> {reason}")?,
        }

        writeln!(out, "\n## PnL by Mood\n")?;
        writeln!(
            out,
            "| Mood | Trades | Mean | Median | Std | Total | Loss rate | ≤0 rate | Mean size | Fees |"
        )?;
        writeln!(
            out,
            "|------|--------|------|--------|-----|-------|-----------|---------|-----------|------|"
        )?;
        for g in &r.groups {
            match &g.stats {
                Section::Ready(s) => writeln!(out, "| {} | {} |", g.mood, group_cells(s))?,
                Section::Skipped { reason } => writeln!(out, "| {} | _{reason}_ |", g.mood)?,
            }
        }

        writeln!(out, "\n## Rank Test (Mann–Whitney U)\n")?;
        match &r.rank_test {
            Section::Ready(t) => {
                let verdict = if t.significant(r.alpha) {
                    "distributions differ"
                } else {
                    "no significant difference"
                };
                writeln!(
                    out,
                    "{} (n={}) vs {} (n={}): U = {:.1}, z = {:+.3}, p = {:.4}, \
                     P({} > {}) = {:.3}: {verdict} at α = {}",
                    t.group_a,
                    t.test.n_a,
                    t.group_b,
                    t.test.n_b,
                    t.test.u,
                    t.test.z,
                    t.test.p_value,
                    t.group_a,
                    t.group_b,
                    t.test.effect_size,
                    r.alpha
                )?;
            }
            Section::Skipped { reason } => writeln!(out, "Skipped: {reason}")?,
        }

        writeln!(out, "\n## Mood vs Loss (Chi-square)\n")?;
        match &r.independence {
            Section::Ready(t) => {
                writeln!(out, "| Mood | Losses | Non-losses | Expected losses | Expected non-losses |")?;
                writeln!(out, "|------|--------|------------|-----------------|---------------------|")?;
                for row in &t.rows {
                    writeln!(
                        out,
                        "| {} | {} | {} | {:.1} | {:.1} |",
                        row.mood, row.observed[0], row.observed[1], row.expected[0], row.expected[1]
                    )?;
                }
                writeln!(
                    out,
                    "\nχ² = {:.3} (dof {}{}), p = {:.4}, Cramér's V = {:.3}",
                    t.statistic,
                    t.dof,
                    if t.yates_corrected { ", Yates" } else { "" },
                    t.p_value,
                    t.cramers_v
                )?;
                if t.low_expected_cells > 0 {
                    writeln!(
                        out,
                        "Warning: {} cell(s) with expected count below 5.",
                        t.low_expected_cells
                    )?;
                }
            }
            Section::Skipped { reason } => writeln!(out, "Skipped: {reason}")?,
        }

        writeln!(out, "\n## Loss Model (logistic)\n")?;
        match &r.model {
            Section::Ready(m) => write_model(out, m)?,
            Section::Skipped { reason } => writeln!(out, "Skipped: {reason}")?,
        }

        if !r.preview.is_empty() {
            writeln!(out, "\n## Preview\n")?;
            writeln!(out, "| Mood | Size USD | Closed PnL |")?;
            writeln!(out, "|------|----------|------------|")?;
            for row in &r.preview {
                writeln!(out, "| {} | {:.2} | {:+.2} |", row.mood, row.size_usd, row.closed_pnl)?;
            }
        }
        Ok(())
    }
}

fn group_cells(s: &GroupStats) -> String {
    let std = s.std_pnl.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
    format!(
        "{} | {:+.2} | {:+.2} | {std} | {:+.2} | {:.1}% | {:.1}% | {:.0} | {:.2}",
        s.count,
        s.mean_pnl,
        s.median_pnl,
        s.total_pnl,
        s.loss_rate * 100.0,
        s.non_positive_rate * 100.0,
        s.mean_size,
        s.total_fees
    )
}

fn write_model(out: &mut String, m: &LossModel) -> std::fmt::Result {
    writeln!(
        out,
        "Reference mood: {}; {} trades, {} iterations, log-likelihood {:.2}\n",
        m.reference, m.observations, m.iterations, m.log_likelihood
    )?;
    writeln!(out, "| Term | Estimate | Std. error | z | p | Odds ratio |")?;
    writeln!(out, "|------|----------|------------|---|---|------------|")?;
    for c in &m.coefficients {
        writeln!(
            out,
            "| {} | {:+.6} | {:.6} | {:+.2} | {:.4} | {:.4} |",
            c.term, c.estimate, c.std_error, c.z, c.p_value, c.odds_ratio
        )?;
    }
    writeln!(
        out,
        "\nOdds of a loss change ×{:.3} per 1 000 USD of trade size.",
        m.size_odds_ratio_per_1000()
    )?;
    for &mood in &m.levels {
        if let Ok(p) = m.predict(mood, 1_000.0) {
            writeln!(out, "- P(loss | {mood}, 1 000 USD) = {:.1}%", p * 100.0)?;
        }
    }
    Ok(())
}
