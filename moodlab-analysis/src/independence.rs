//! Chi-square test of independence between mood and loss occurrence.
//!
//! Rows are the moods present in the selection (Fear, Neutral, Greed order),
//! columns are `[loss, no loss]` with loss meaning PnL < 0. Yates' continuity
//! correction is applied when the table has one degree of freedom. Cramér's V
//! is computed from the uncorrected statistic.

use crate::error::AnalysisError;
use moodlab_core::{EnrichedTrade, Mood};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Expected counts below this make the asymptotic p-value unreliable.
const MIN_EXPECTED: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyRow {
    pub mood: Mood,
    pub observed: [u64; 2],
    pub expected: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndependenceTest {
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    pub yates_corrected: bool,
    pub cramers_v: f64,
    pub rows: Vec<ContingencyRow>,
    /// Cells whose expected count is below 5.
    pub low_expected_cells: usize,
}

pub fn mood_loss_independence(trades: &[&EnrichedTrade]) -> Result<IndependenceTest, AnalysisError> {
    let observed: Vec<(Mood, [u64; 2])> = Mood::ALL
        .into_iter()
        .map(|mood| {
            let mut cells = [0u64; 2];
            for t in trades.iter().filter(|t| t.mood == mood) {
                cells[usize::from(!t.is_loss())] += 1;
            }
            (mood, cells)
        })
        .filter(|(_, cells)| cells[0] + cells[1] > 0)
        .collect();

    if observed.len() < 2 {
        return Err(AnalysisError::insufficient(format!(
            "independence test needs at least two moods with trades (found {})",
            observed.len()
        )));
    }

    let col_totals = [0, 1].map(|c| observed.iter().map(|(_, cells)| cells[c]).sum::<u64>());
    if col_totals.contains(&0) {
        let missing = if col_totals[0] == 0 { "losing" } else { "non-losing" };
        return Err(AnalysisError::insufficient(format!(
            "independence test needs both outcomes; the selection has no {missing} trades"
        )));
    }

    let total = (col_totals[0] + col_totals[1]) as f64;
    let dof = observed.len() - 1;
    let yates = dof == 1;

    let mut statistic = 0.0;
    let mut uncorrected = 0.0;
    let mut low_expected_cells = 0;
    let rows: Vec<ContingencyRow> = observed
        .into_iter()
        .map(|(mood, cells)| {
            let row_total = (cells[0] + cells[1]) as f64;
            let expected = [0, 1].map(|c| row_total * col_totals[c] as f64 / total);
            for c in 0..2 {
                let diff = (cells[c] as f64 - expected[c]).abs();
                uncorrected += diff * diff / expected[c];
                let adjusted = if yates { (diff - 0.5).max(0.0) } else { diff };
                statistic += adjusted * adjusted / expected[c];
                if expected[c] < MIN_EXPECTED {
                    low_expected_cells += 1;
                }
            }
            ContingencyRow {
                mood,
                observed: cells,
                expected,
            }
        })
        .collect();

    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| AnalysisError::insufficient(format!("chi-square distribution: {e}")))?;
    // min(r-1, c-1) is always 1 with two outcome columns
    let cramers_v = (uncorrected / total).sqrt();

    Ok(IndependenceTest {
        statistic,
        dof,
        p_value: dist.sf(statistic),
        yates_corrected: yates,
        cramers_v,
        rows,
        low_expected_cells,
    })
}
