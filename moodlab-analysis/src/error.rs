//! Analysis failures that skip a report section instead of producing numbers.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Statistical preconditions unmet (too few observations, empty groups).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Degenerate logistic fit: separation, collinearity or divergence.
    #[error("model not identifiable: {0}")]
    ModelNotIdentifiable(String),

    /// A prediction query outside what the fitted model can answer.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl AnalysisError {
    pub(crate) fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub(crate) fn not_identifiable(msg: impl Into<String>) -> Self {
        Self::ModelNotIdentifiable(msg.into())
    }
}
