//! Logistic model of loss probability on mood and trade size.
//!
//! `logit P(pnl < 0) = β₀ + Σ β_mood · [mood] + β_size · size`
//!
//! Moods use treatment coding against the first mood present (Fear, Neutral,
//! Greed order). Size is standardized for fitting and coefficients are mapped
//! back to USD units afterwards, including the delta-method intercept error.
//!
//! Fitting is Newton–Raphson / IRLS with a Cholesky solve of the information
//! matrix. Anything that makes the maximum-likelihood estimate fail to exist
//! or be unique surfaces as `ModelNotIdentifiable`:
//! - no variation in the outcome
//! - a mood level that is all losses or all non-losses
//! - constant trade size, or a singular information matrix
//! - no convergence within the iteration cap, or a runaway linear predictor

use crate::error::AnalysisError;
use moodlab_core::{EnrichedTrade, Mood};
use ndarray::{Array1, Array2};
use serde::Serialize;
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

// ─── Options ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelOptions {
    pub max_iterations: usize,
    /// Convergence threshold on the largest Newton step.
    pub tolerance: f64,
    /// |η| beyond this on any trade is treated as separation.
    pub eta_bound: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-8,
            eta_bound: 30.0,
        }
    }
}

// ─── Fitted model ────────────────────────────────────────────────────

/// One fitted coefficient, in raw (USD) units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub odds_ratio: f64,
}

impl Coefficient {
    fn new(term: String, estimate: f64, std_error: f64) -> Self {
        let z = estimate / std_error;
        Self {
            term,
            estimate,
            std_error,
            z,
            p_value: erfc(z.abs() / SQRT_2),
            odds_ratio: estimate.exp(),
        }
    }
}

pub const INTERCEPT_TERM: &str = "intercept";
pub const SIZE_TERM: &str = "size_usd";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossModel {
    pub reference: Mood,
    /// Moods present at fit time, reference first.
    pub levels: Vec<Mood>,
    /// Intercept, one dummy per non-reference level, then size.
    pub coefficients: Vec<Coefficient>,
    pub observations: usize,
    pub iterations: usize,
    pub log_likelihood: f64,
}

impl LossModel {
    pub fn intercept(&self) -> &Coefficient {
        &self.coefficients[0]
    }

    pub fn size(&self) -> &Coefficient {
        &self.coefficients[self.coefficients.len() - 1]
    }

    /// Dummy coefficient for `mood`; `None` for the reference or unfitted moods.
    pub fn mood_effect(&self, mood: Mood) -> Option<&Coefficient> {
        let idx = self.levels.iter().position(|&m| m == mood)?;
        (idx > 0).then(|| &self.coefficients[idx])
    }

    /// Odds multiplier for a 1 000 USD increase in trade size.
    pub fn size_odds_ratio_per_1000(&self) -> f64 {
        (self.size().estimate * 1_000.0).exp()
    }

    /// Predicted probability that a trade of `size` USD on a `mood` day loses.
    pub fn predict(&self, mood: Mood, size: f64) -> Result<f64, AnalysisError> {
        if !size.is_finite() || size < 0.0 {
            return Err(AnalysisError::InvalidQuery(format!(
                "size must be a finite non-negative number, got {size}"
            )));
        }
        if !self.levels.contains(&mood) {
            return Err(AnalysisError::InvalidQuery(format!(
                "no {mood} trades in the fitted data"
            )));
        }
        let mood_term = self.mood_effect(mood).map_or(0.0, |c| c.estimate);
        let eta = self.intercept().estimate + mood_term + self.size().estimate * size;
        Ok(sigmoid(eta))
    }
}

// ─── Fitting ─────────────────────────────────────────────────────────

pub fn fit_loss_model(
    trades: &[&EnrichedTrade],
    opts: &ModelOptions,
) -> Result<LossModel, AnalysisError> {
    let levels: Vec<Mood> = Mood::ALL
        .into_iter()
        .filter(|m| trades.iter().any(|t| t.mood == *m))
        .collect();
    let n = trades.len();
    let p = levels.len() + 1;
    if levels.is_empty() || n < p + 1 {
        return Err(AnalysisError::insufficient(format!(
            "loss model needs more than {p} trades (got {n})"
        )));
    }

    let losses = trades.iter().filter(|t| t.is_loss()).count();
    if losses == 0 || losses == n {
        return Err(AnalysisError::not_identifiable(
            "every selected trade has the same outcome",
        ));
    }
    for &mood in &levels {
        let group: Vec<bool> = trades
            .iter()
            .filter(|t| t.mood == mood)
            .map(|t| t.is_loss())
            .collect();
        if group.iter().all(|&l| l) || group.iter().all(|&l| !l) {
            let outcome = if group[0] { "losses" } else { "non-losses" };
            return Err(AnalysisError::not_identifiable(format!(
                "{mood} trades are all {outcome}; mood perfectly predicts the outcome"
            )));
        }
    }

    let sizes: Vec<f64> = trades.iter().map(|t| t.size()).collect();
    let size_mean = sizes.iter().sum::<f64>() / n as f64;
    let size_sd =
        (sizes.iter().map(|s| (s - size_mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt();
    if !(size_sd > 0.0) {
        return Err(AnalysisError::not_identifiable(
            "trade size is constant and collinear with the intercept",
        ));
    }

    let mut x = Array2::<f64>::zeros((n, p));
    let mut y = Array1::<f64>::zeros(n);
    for (i, t) in trades.iter().enumerate() {
        x[[i, 0]] = 1.0;
        if let Some(level) = levels.iter().skip(1).position(|&m| m == t.mood) {
            x[[i, level + 1]] = 1.0;
        }
        x[[i, p - 1]] = (t.size() - size_mean) / size_sd;
        y[i] = if t.is_loss() { 1.0 } else { 0.0 };
    }

    let fit = irls(&x, &y, opts)?;
    let cov = invert_spd(&fit.information).ok_or_else(|| {
        AnalysisError::not_identifiable("information matrix is singular at the estimate")
    })?;

    // back to USD units: size_raw = b_z / sd, intercept_raw = b0 - b_z · mean / sd
    let k = size_mean / size_sd;
    let b = &fit.beta;
    let last = p - 1;
    let mut coefficients = Vec::with_capacity(p);

    let intercept = b[0] - b[last] * k;
    let intercept_var = cov[[0, 0]] + k * k * cov[[last, last]] - 2.0 * k * cov[[0, last]];
    coefficients.push(Coefficient::new(
        INTERCEPT_TERM.to_string(),
        intercept,
        intercept_var.max(0.0).sqrt(),
    ));
    for (j, mood) in levels.iter().enumerate().skip(1) {
        coefficients.push(Coefficient::new(
            format!("mood[{mood}]"),
            b[j],
            cov[[j, j]].sqrt(),
        ));
    }
    coefficients.push(Coefficient::new(
        SIZE_TERM.to_string(),
        b[last] / size_sd,
        cov[[last, last]].sqrt() / size_sd,
    ));

    tracing::info!(
        observations = n,
        iterations = fit.iterations,
        log_likelihood = fit.log_likelihood,
        "loss model fitted"
    );

    Ok(LossModel {
        reference: levels[0],
        levels,
        coefficients,
        observations: n,
        iterations: fit.iterations,
        log_likelihood: fit.log_likelihood,
    })
}

struct IrlsFit {
    beta: Array1<f64>,
    information: Array2<f64>,
    iterations: usize,
    log_likelihood: f64,
}

fn irls(x: &Array2<f64>, y: &Array1<f64>, opts: &ModelOptions) -> Result<IrlsFit, AnalysisError> {
    let p = x.ncols();
    let mut beta = Array1::<f64>::zeros(p);

    for iteration in 1..=opts.max_iterations {
        let eta = x.dot(&beta);
        if eta.iter().any(|e| e.abs() > opts.eta_bound) {
            return Err(AnalysisError::not_identifiable(
                "linear predictor diverged; the outcome is (quasi-)separated",
            ));
        }
        let mu = eta.mapv(sigmoid);
        let w = mu.mapv(|m| m * (1.0 - m));

        let gradient = x.t().dot(&(y - &mu));
        let information = weighted_gram(x, &w);
        let step = cholesky_solve(&information, &gradient).ok_or_else(|| {
            AnalysisError::not_identifiable("information matrix is singular")
        })?;
        beta = beta + &step;

        let max_step = step.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()));
        tracing::debug!(iteration, max_step, "irls step");
        if max_step < opts.tolerance {
            let eta = x.dot(&beta);
            let mu = eta.mapv(sigmoid);
            let w = mu.mapv(|m| m * (1.0 - m));
            return Ok(IrlsFit {
                information: weighted_gram(x, &w),
                log_likelihood: log_likelihood(y, &eta),
                beta,
                iterations: iteration,
            });
        }
    }

    Err(AnalysisError::not_identifiable(format!(
        "did not converge within {} iterations",
        opts.max_iterations
    )))
}

// ─── Linear algebra ──────────────────────────────────────────────────

/// `Xᵀ W X` for diagonal `W`.
fn weighted_gram(x: &Array2<f64>, w: &Array1<f64>) -> Array2<f64> {
    let mut weighted = x.clone();
    for (mut row, &wi) in weighted.rows_mut().into_iter().zip(w.iter()) {
        row *= wi;
    }
    x.t().dot(&weighted)
}

/// Lower-triangular `L` with `A = L Lᵀ`, or `None` if `A` is not positive definite.
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let scale = (0..n).fold(0.0_f64, |acc, i| acc.max(a[[i, i]].abs()));
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= scale * 1e-12 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

fn solve_with_factor(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (z[i] - sum) / l[[i, i]];
    }
    x
}

fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky(a).map(|l| solve_with_factor(&l, b))
}

fn invert_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let l = cholesky(a)?;
    let n = a.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        inv.column_mut(j).assign(&solve_with_factor(&l, &e));
    }
    Some(inv)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn log_likelihood(y: &Array1<f64>, eta: &Array1<f64>) -> f64 {
    // y·η − ln(1 + e^η), evaluated stably
    y.iter()
        .zip(eta.iter())
        .map(|(&yi, &e)| yi * e - (e.max(0.0) + (-e.abs()).exp().ln_1p()))
        .sum()
}
