//! Mann–Whitney U test between two mood groups.
//!
//! Two-sided, normal approximation with:
//! - average ranks for ties and the tie-corrected variance
//! - a 0.5 continuity correction toward the null
//!
//! The statistic reported is U for the first group, so the common-language
//! effect size `U / (n_a · n_b)` reads as P(a > b) + ½·P(a = b).

use crate::error::AnalysisError;
use moodlab_core::{EnrichedTrade, Mood};
use serde::Serialize;
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

pub const MIN_GROUP_SIZE: usize = 2;

/// Raw test output on two samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MannWhitney {
    pub n_a: usize,
    pub n_b: usize,
    pub u: f64,
    /// Continuity-corrected z; positive when the first sample ranks higher.
    pub z: f64,
    pub p_value: f64,
    pub effect_size: f64,
}

/// Mann–Whitney on the PnL of two moods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankComparison {
    pub group_a: Mood,
    pub group_b: Mood,
    #[serde(flatten)]
    pub test: MannWhitney,
}

impl RankComparison {
    pub fn significant(&self, alpha: f64) -> bool {
        self.test.p_value < alpha
    }
}

pub fn mann_whitney(a: &[f64], b: &[f64]) -> Result<MannWhitney, AnalysisError> {
    if a.len() < MIN_GROUP_SIZE || b.len() < MIN_GROUP_SIZE {
        return Err(AnalysisError::insufficient(format!(
            "rank test needs at least {MIN_GROUP_SIZE} trades per group (got {} and {})",
            a.len(),
            b.len()
        )));
    }

    let n_a = a.len() as f64;
    let n_b = b.len() as f64;
    let n = n_a + n_b;

    let mut pooled: Vec<(f64, bool)> = a
        .iter()
        .map(|&v| (v, true))
        .chain(b.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut rank_sum_a = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < pooled.len() {
        let mut j = i + 1;
        while j < pooled.len() && pooled[j].0 == pooled[i].0 {
            j += 1;
        }
        // positions i..j (0-based) share ranks i+1..=j
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let tied = (j - i) as f64;
        tie_term += tied.powi(3) - tied;
        rank_sum_a += avg_rank * pooled[i..j].iter().filter(|(_, in_a)| *in_a).count() as f64;
        i = j;
    }

    let u = rank_sum_a - n_a * (n_a + 1.0) / 2.0;
    let mean_u = n_a * n_b / 2.0;
    let var_u = n_a * n_b / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));

    let (z, p_value) = if var_u > 0.0 {
        let sd = var_u.sqrt();
        let deviation = u - mean_u;
        let corrected = (deviation.abs() - 0.5).max(0.0);
        let z = corrected.copysign(deviation) / sd;
        (z, erfc(z.abs() / SQRT_2).min(1.0))
    } else {
        // every pooled value identical
        (0.0, 1.0)
    };

    Ok(MannWhitney {
        n_a: a.len(),
        n_b: b.len(),
        u,
        z,
        p_value,
        effect_size: u / (n_a * n_b),
    })
}

/// Compare the PnL distributions of two moods within `trades`.
pub fn compare_moods(
    trades: &[&EnrichedTrade],
    group_a: Mood,
    group_b: Mood,
) -> Result<RankComparison, AnalysisError> {
    let pnl_of = |mood: Mood| -> Vec<f64> {
        trades
            .iter()
            .filter(|t| t.mood == mood)
            .map(|t| t.pnl())
            .collect()
    };
    let (a, b) = (pnl_of(group_a), pnl_of(group_b));
    let test = mann_whitney(&a, &b).map_err(|_| {
        AnalysisError::insufficient(format!(
            "{group_a} vs {group_b} needs at least {MIN_GROUP_SIZE} trades in each group \
             ({group_a}: {}, {group_b}: {})",
            a.len(),
            b.len()
        ))
    })?;
    Ok(RankComparison {
        group_a,
        group_b,
        test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_samples_are_not_significant() {
        let x = [1.0, -2.0, 3.5, 0.0, 7.0];
        let r = mann_whitney(&x, &x).unwrap();
        assert!(r.p_value >= 0.99);
        assert!((r.effect_size - 0.5).abs() < 1e-12);
    }

    #[test]
    fn textbook_example_without_ties() {
        // a ranks 1..5, b ranks 6..10
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [6.0, 7.0, 8.0, 9.0, 10.0];
        let r = mann_whitney(&a, &b).unwrap();
        assert_eq!(r.u, 0.0);
        assert_eq!(r.effect_size, 0.0);
        // mean 12.5, var 25·11/12, z = -(12.5 - 0.5)/sqrt(22.9167)
        let expected_z = -12.0 / (25.0_f64 * 11.0 / 12.0).sqrt();
        assert!((r.z - expected_z).abs() < 1e-12);
        assert!(r.p_value < 0.02 && r.p_value > 0.005);
    }

    #[test]
    fn swapping_groups_mirrors_u_and_keeps_p() {
        let a = [0.3, 1.2, -0.5, 2.2, 2.2, 4.0];
        let b = [1.1, -3.0, 0.3, 0.0];
        let ab = mann_whitney(&a, &b).unwrap();
        let ba = mann_whitney(&b, &a).unwrap();
        assert!((ab.u + ba.u - 24.0).abs() < 1e-12);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
        assert!((ab.z + ba.z).abs() < 1e-12);
    }

    #[test]
    fn all_values_tied_gives_unit_p() {
        let r = mann_whitney(&[2.0, 2.0], &[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.z, 0.0);
    }

    #[test]
    fn groups_below_two_are_insufficient() {
        let err = mann_whitney(&[1.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }
}
