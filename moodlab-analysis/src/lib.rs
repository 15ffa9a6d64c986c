//! MoodLab Analysis — everything downstream of the enriched trade set.
//!
//! - Per-mood descriptive statistics and dashboard headline
//! - Mann–Whitney rank test and mood × loss chi-square test
//! - Logistic loss model with identifiability checks
//! - Validated filters, the session that re-runs analyses per filter
//! - Markdown and JSON reports, TOML configuration

pub mod config;
pub mod describe;
pub mod error;
pub mod filter;
pub mod independence;
pub mod model;
pub mod rank_test;
pub mod report;
pub mod session;

pub use config::{ConfigError, MoodLabConfig};
pub use describe::{describe_by_mood, group_stats, headline, GroupStats, Headline, MoodGroup};
pub use error::AnalysisError;
pub use filter::{FilterError, SizeRange, TradeFilter};
pub use independence::{mood_loss_independence, IndependenceTest};
pub use model::{fit_loss_model, LossModel, ModelOptions};
pub use rank_test::{compare_moods, mann_whitney, MannWhitney, RankComparison};
pub use report::{AnalysisReport, MarkdownReport, Section};
pub use session::{AnalysisOptions, Session};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: sessions and reports can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Session>();
        require_sync::<Session>();
        require_send::<AnalysisReport>();
        require_sync::<AnalysisReport>();
        require_send::<LossModel>();
        require_sync::<LossModel>();
        require_send::<AnalysisError>();
        require_sync::<AnalysisError>();
        require_send::<ConfigError>();
        require_sync::<ConfigError>();
    }
}
