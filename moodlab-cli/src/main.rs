//! MoodLab CLI — trader behaviour vs market sentiment.
//!
//! Commands:
//! - `analyze` — load, merge, filter and print the full report (Markdown or JSON)
//! - `predict` — fit the loss model and print P(loss) for a mood and trade size
//! - `explore` — interactive session: change filters and re-run on the loaded data
//! - `synth` — write a deterministic synthetic dataset as CSV

mod explore;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use moodlab_analysis::{MarkdownReport, MoodLabConfig, Session, SizeRange, TradeFilter};
use moodlab_core::data::synthetic::{write_sentiment_csv, write_trades_csv};
use moodlab_core::data::{generate, synthetic_tables, DataSource, LogProgress, SyntheticParams};
use moodlab_core::Mood;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "moodlab",
    about = "MoodLab — trader performance under Fear, Neutral and Greed markets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full analysis report for a filter.
    ///
    /// Without filter flags this uses the starting filter (Fear only, 1000 to
    /// 5000 USD), so the Fear vs Greed rank test and the chi-square test are
    /// skipped. Pass --all-moods (or several --mood flags) to run them.
    Analyze {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Emit the report as JSON instead of Markdown.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Predicted loss probability for a trade of SIZE USD on a MOOD day.
    ///
    /// The model is fit on every trade unless filter flags narrow it.
    Predict {
        mood: Mood,

        size: f64,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Load once, then adjust filters interactively.
    Explore {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Write a synthetic trades table and sentiment index.
    Synth {
        /// Output directory.
        #[arg(long, default_value = "synthetic")]
        out_dir: PathBuf,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 120)]
        days: u32,

        #[arg(long, default_value_t = 25)]
        trades_per_day: u32,
    },
}

#[derive(Args)]
struct DataArgs {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trades CSV (path or http(s) URL). Overrides the config.
    #[arg(long)]
    trades: Option<String>,

    /// Fear & Greed index CSV (path or http(s) URL). Overrides the config.
    #[arg(long)]
    sentiment: Option<String>,

    /// Use the built-in synthetic dataset instead of files.
    #[arg(long, default_value_t = false, conflicts_with_all = ["trades", "sentiment"])]
    synthetic: bool,

    /// Seed for --synthetic.
    #[arg(long, default_value_t = 42, requires = "synthetic")]
    seed: u64,

    /// Remote fetch timeout in seconds. Overrides the config.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Mood to include (repeatable).
    #[arg(long = "mood")]
    moods: Vec<Mood>,

    /// Include every mood.
    #[arg(long, default_value_t = false, conflicts_with = "moods")]
    all_moods: bool,

    /// Minimum trade size in USD (inclusive).
    #[arg(long)]
    size_min: Option<f64>,

    /// Maximum trade size in USD (inclusive).
    #[arg(long)]
    size_max: Option<f64>,

    /// Drop the upper size bound.
    #[arg(long, default_value_t = false, conflicts_with = "size_max")]
    no_size_max: bool,
}

impl FilterArgs {
    /// Apply flag overrides on top of `base`.
    fn resolve(&self, base: &TradeFilter) -> Result<TradeFilter> {
        let moods: Vec<Mood> = if self.all_moods {
            Mood::ALL.to_vec()
        } else if !self.moods.is_empty() {
            self.moods.clone()
        } else {
            base.moods().iter().copied().collect()
        };
        let size_min = self.size_min.unwrap_or(base.size().min());
        let size_max = if self.no_size_max {
            None
        } else {
            self.size_max.or(base.size().max())
        };
        let filter = TradeFilter::new(moods, SizeRange::new(size_min, size_max)?)?;
        Ok(filter)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { data, filter, json } => run_analyze(data, filter, json),
        Commands::Predict {
            mood,
            size,
            data,
            filter,
        } => run_predict(mood, size, data, filter),
        Commands::Explore { data } => run_explore(data),
        Commands::Synth {
            out_dir,
            seed,
            days,
            trades_per_day,
        } => run_synth(out_dir, seed, days, trades_per_day),
    }
}

// ─── Shared setup ────────────────────────────────────────────────────

fn load_config(data: &DataArgs) -> Result<MoodLabConfig> {
    let mut config = match &data.config {
        Some(path) => MoodLabConfig::from_file(path)?,
        None => MoodLabConfig::default(),
    };
    if let Some(trades) = &data.trades {
        config.sources.trades = Some(trades.clone());
    }
    if let Some(sentiment) = &data.sentiment {
        config.sources.sentiment = Some(sentiment.clone());
    }
    if let Some(secs) = data.timeout_secs {
        if secs == 0 {
            bail!("--timeout-secs must be positive");
        }
        config.fetch.timeout_secs = secs;
    }
    Ok(config)
}

fn open_session(data: &DataArgs, config: &MoodLabConfig) -> Result<Session> {
    if data.synthetic {
        let params = SyntheticParams {
            seed: data.seed,
            ..SyntheticParams::default()
        };
        tracing::info!(seed = params.seed, "using synthetic dataset");
        return Ok(Session::new(synthetic_tables(&params)?));
    }

    let (Some(trades), Some(sentiment)) = (&config.sources.trades, &config.sources.sentiment)
    else {
        bail!("no data sources: pass --trades and --sentiment, set [sources] in --config, or use --synthetic");
    };
    let session = Session::load(
        &DataSource::parse(trades),
        &DataSource::parse(sentiment),
        &config.fetch_options(),
        &LogProgress,
    )?;
    Ok(session)
}

// ─── Commands ────────────────────────────────────────────────────────

fn run_analyze(data: DataArgs, filter: FilterArgs, json: bool) -> Result<()> {
    let config = load_config(&data)?;
    let filter = filter.resolve(&config.default_filter()?)?;
    let session = open_session(&data, &config)?;

    let report = session.analyze(&filter, &config.analysis_options());
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", MarkdownReport.render(&report));
    }
    Ok(())
}

fn run_predict(mood: Mood, size: f64, data: DataArgs, filter: FilterArgs) -> Result<()> {
    let config = load_config(&data)?;
    let filter = filter.resolve(&TradeFilter::all())?;
    let session = open_session(&data, &config)?;

    let model = session.loss_model(&filter, &config.analysis_options().model)?;
    let p = model.predict(mood, size)?;
    println!(
        "P(loss | {mood}, {size:.2} USD) = {:.2}%  (fit on {} trades, {filter})",
        p * 100.0,
        model.observations
    );
    Ok(())
}

fn run_explore(data: DataArgs) -> Result<()> {
    let config = load_config(&data)?;
    let initial = config.default_filter()?;
    let session = open_session(&data, &config)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    explore::run(
        &session,
        initial,
        &config.analysis_options(),
        stdin.lock(),
        stdout.lock(),
    )
    .context("interactive session")
}

fn run_synth(out_dir: PathBuf, seed: u64, days: u32, trades_per_day: u32) -> Result<()> {
    if days == 0 || trades_per_day == 0 {
        bail!("--days and --trades-per-day must be positive");
    }
    let params = SyntheticParams {
        seed,
        days,
        trades_per_day,
        ..SyntheticParams::default()
    };
    let (trades, sentiment) = generate(&params);

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create {}", out_dir.display()))?;
    let trades_path = out_dir.join("historical_data.csv");
    let sentiment_path = out_dir.join("fear_greed_index.csv");
    write_trades_csv(&trades_path, &trades)
        .with_context(|| format!("write {}", trades_path.display()))?;
    write_sentiment_csv(&sentiment_path, &sentiment)
        .with_context(|| format!("write {}", sentiment_path.display()))?;

    println!(
        "Wrote {} trades to {} and {} index days to {}",
        trades.len(),
        trades_path.display(),
        sentiment.len(),
        sentiment_path.display()
    );
    println!(
        "Run: moodlab analyze --trades {} --sentiment {}",
        trades_path.display(),
        sentiment_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flags_override_base() {
        let args = FilterArgs {
            moods: vec![Mood::Greed],
            size_min: Some(10.0),
            no_size_max: true,
            ..FilterArgs::default()
        };
        let filter = args.resolve(&TradeFilter::dashboard_default()).unwrap();
        assert_eq!(filter.moods().iter().copied().collect::<Vec<_>>(), vec![Mood::Greed]);
        assert_eq!(filter.size().min(), 10.0);
        assert_eq!(filter.size().max(), None);
    }

    #[test]
    fn no_flags_keep_base() {
        let base = TradeFilter::dashboard_default();
        assert_eq!(FilterArgs::default().resolve(&base).unwrap(), base);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let args = FilterArgs {
            size_min: Some(6_000.0),
            ..FilterArgs::default()
        };
        assert!(args.resolve(&TradeFilter::dashboard_default()).is_err());
    }

    #[test]
    fn analyze_parses_repeated_moods() {
        let cli = Cli::try_parse_from([
            "moodlab", "analyze", "--synthetic", "--mood", "fear", "--mood", "Extreme Greed",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { filter, data, .. } => {
                assert!(data.synthetic);
                assert_eq!(filter.moods, vec![Mood::Fear, Mood::Greed]);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn analyze_help_points_to_all_moods() {
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        let analyze = cmd.find_subcommand_mut("analyze").unwrap();
        let help = analyze.render_long_help().to_string();
        assert!(help.contains("Fear only"));
        assert!(help.contains("--all-moods"));
    }
}
