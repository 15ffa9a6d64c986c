//! TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid. Command
//! line flags are applied on top by the caller.
//!
//! ```toml
//! [sources]
//! trades = "data/historical_data.csv"
//! sentiment = "https://example.org/fear_greed_index.csv"
//!
//! [fetch]
//! timeout_secs = 60
//! max_retries = 2
//!
//! [analysis]
//! compare = ["Fear", "Greed"]
//! alpha = 0.05
//! preview_rows = 10
//!
//! [model]
//! max_iterations = 50
//! tolerance = 1e-8
//!
//! [filter]
//! moods = ["Fear"]
//! size_min = 1000.0
//! size_max = 5000.0
//! ```

use crate::filter::{FilterError, SizeRange, TradeFilter};
use crate::model::ModelOptions;
use crate::session::AnalysisOptions;
use moodlab_core::{FetchOptions, Mood};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid default filter: {0}")]
    Filter(#[from] FilterError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub trades: Option<String>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchOptions::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            max_retries: defaults.max_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub compare: [Mood; 2],
    pub alpha: f64,
    pub preview_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let defaults = AnalysisOptions::default();
        Self {
            compare: [defaults.compare.0, defaults.compare.1],
            alpha: defaults.alpha,
            preview_rows: defaults.preview_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let defaults = ModelOptions::default();
        Self {
            max_iterations: defaults.max_iterations,
            tolerance: defaults.tolerance,
        }
    }
}

/// Initial filter controls. Defaults to the dashboard's Fear, 1 000–5 000 USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub moods: Vec<Mood>,
    pub size_min: f64,
    pub size_max: Option<f64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let filter = TradeFilter::dashboard_default();
        Self {
            moods: filter.moods().iter().copied().collect(),
            size_min: filter.size().min(),
            size_max: filter.size().max(),
        }
    }
}

impl FilterConfig {
    pub fn to_filter(&self) -> Result<TradeFilter, FilterError> {
        TradeFilter::new(
            self.moods.iter().copied(),
            SizeRange::new(self.size_min, self.size_max)?,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodLabConfig {
    pub sources: SourceConfig,
    pub fetch: FetchConfig,
    pub analysis: AnalysisConfig,
    pub model: ModelConfig,
    pub filter: FilterConfig,
}

impl MoodLabConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analysis;
        if a.compare[0] == a.compare[1] {
            return Err(ConfigError::Invalid(format!(
                "analysis.compare needs two different moods, got {} twice",
                a.compare[0]
            )));
        }
        if !(a.alpha > 0.0 && a.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "analysis.alpha must be in (0, 1), got {}",
                a.alpha
            )));
        }
        if self.model.max_iterations == 0 {
            return Err(ConfigError::Invalid("model.max_iterations must be positive".into()));
        }
        if !(self.model.tolerance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "model.tolerance must be positive, got {}",
                self.model.tolerance
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch.timeout_secs must be positive".into()));
        }
        self.filter.to_filter()?;
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_retries: self.fetch.max_retries,
            ..FetchOptions::default()
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            compare: (self.analysis.compare[0], self.analysis.compare[1]),
            alpha: self.analysis.alpha,
            preview_rows: self.analysis.preview_rows,
            model: ModelOptions {
                max_iterations: self.model.max_iterations,
                tolerance: self.model.tolerance,
                ..ModelOptions::default()
            },
        }
    }

    pub fn default_filter(&self) -> Result<TradeFilter, FilterError> {
        self.filter.to_filter()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = MoodLabConfig::from_toml("").unwrap();
        assert_eq!(config, MoodLabConfig::default());
        assert_eq!(config.default_filter().unwrap(), TradeFilter::dashboard_default());
        assert_eq!(config.analysis_options(), AnalysisOptions::default());
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(60));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = MoodLabConfig::from_toml(
            r#"
            [analysis]
            compare = ["Neutral", "Greed"]

            [filter]
            moods = ["Fear", "Greed"]
            size_min = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.analysis.compare, [Mood::Neutral, Mood::Greed]);
        assert_eq!(config.analysis.alpha, 0.05);
        let filter = config.default_filter().unwrap();
        assert_eq!(filter.moods().len(), 2);
        assert_eq!(filter.size().max(), Some(5_000.0));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let same_pair = "[analysis]\ncompare = [\"Fear\", \"Fear\"]";
        assert!(matches!(
            MoodLabConfig::from_toml(same_pair),
            Err(ConfigError::Invalid(_))
        ));
        let empty_moods = "[filter]\nmoods = []";
        assert!(matches!(
            MoodLabConfig::from_toml(empty_moods),
            Err(ConfigError::Filter(FilterError::EmptyMoodSet))
        ));
        assert!(matches!(
            MoodLabConfig::from_toml("[analysis]\nalpha = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MoodLabConfig::from_toml("[filter]\nmoods = [\"Panic\"]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let config = MoodLabConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(MoodLabConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moodlab.toml");
        std::fs::write(&path, "[fetch]\nmax_retries = 5\n").unwrap();
        let config = MoodLabConfig::from_file(&path).unwrap();
        assert_eq!(config.fetch_options().max_retries, 5);

        let missing = MoodLabConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
