//! Interactive exploration over one loaded session.
//!
//! Each filter change re-runs the whole analysis on the full enriched set.
//! Invalid input is reported and the previous filter stays in force.

use anyhow::Result;
use moodlab_analysis::{AnalysisOptions, MarkdownReport, Session, SizeRange, TradeFilter};
use moodlab_core::Mood;
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  moods <mood>...         select moods (fear, neutral, greed, or 'all')
  size <min> <max|any>    set the inclusive size range in USD
  reset                   back to the starting filter
  show                    print the full report for the current filter
  json                    print the report as JSON
  predict <mood> <size>   P(loss) from the model fit on the current filter
  help                    this text
  quit                    leave";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Moods(Vec<Mood>),
    Size { min: f64, max: Option<f64> },
    Reset,
    Show,
    Json,
    Predict { mood: Mood, size: f64 },
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command; try 'help'".into());
    };
    let rest: Vec<&str> = words.collect();

    match head.to_ascii_lowercase().as_str() {
        "moods" | "mood" => {
            if rest.len() == 1 && rest[0].eq_ignore_ascii_case("all") {
                return Ok(Command::Moods(Mood::ALL.to_vec()));
            }
            let moods = rest
                .iter()
                .map(|w| w.parse::<Mood>().map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::Moods(moods))
        }
        "size" => match rest.as_slice() {
            [min, max] => {
                let min = parse_number(min)?;
                let max = match *max {
                    "any" | "-" | "inf" => None,
                    other => Some(parse_number(other)?),
                };
                Ok(Command::Size { min, max })
            }
            _ => Err("usage: size <min> <max|any>".into()),
        },
        "predict" => match rest.as_slice() {
            [mood, size] => Ok(Command::Predict {
                mood: mood.parse::<Mood>().map_err(|e| e.to_string())?,
                size: parse_number(size)?,
            }),
            _ => Err("usage: predict <mood> <size>".into()),
        },
        "reset" => Ok(Command::Reset),
        "show" => Ok(Command::Show),
        "json" => Ok(Command::Json),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}'; try 'help'")),
    }
}

fn parse_number(word: &str) -> Result<f64, String> {
    word.replace('_', "")
        .parse::<f64>()
        .map_err(|_| format!("'{word}' is not a number"))
}

/// Drive the prompt loop until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(
    session: &Session,
    initial: TradeFilter,
    opts: &AnalysisOptions,
    input: R,
    mut out: W,
) -> Result<()> {
    let mut filter = initial.clone();
    writeln!(
        out,
        "{} enriched trades loaded. Filter: {filter}. Type 'help' for commands.",
        session.enriched().len()
    )?;
    write_summary(&mut out, session, &filter, opts)?;
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            write!(out, "> ")?;
            out.flush()?;
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => writeln!(out, "{HELP}")?,
            Ok(Command::Show) => {
                write!(out, "{}", MarkdownReport.render(&session.analyze(&filter, opts)))?
            }
            Ok(Command::Json) => writeln!(out, "{}", session.analyze(&filter, opts).to_json()?)?,
            Ok(Command::Predict { mood, size }) => {
                match session
                    .loss_model(&filter, &opts.model)
                    .and_then(|m| m.predict(mood, size))
                {
                    Ok(p) => writeln!(out, "P(loss | {mood}, {size:.2} USD) = {:.2}%", p * 100.0)?,
                    Err(e) => writeln!(out, "cannot predict: {e}")?,
                }
            }
            Ok(change) => match apply(&filter, &initial, change) {
                Ok(next) => {
                    filter = next;
                    writeln!(out, "Filter: {filter}")?;
                    write_summary(&mut out, session, &filter, opts)?;
                }
                Err(e) => writeln!(out, "rejected: {e} (filter unchanged)")?,
            },
            Err(e) => writeln!(out, "{e}")?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

fn apply(current: &TradeFilter, initial: &TradeFilter, change: Command) -> Result<TradeFilter, String> {
    let next = match change {
        Command::Moods(moods) => TradeFilter::new(moods, current.size()),
        Command::Size { min, max } => SizeRange::new(min, max)
            .and_then(|size| TradeFilter::new(current.moods().iter().copied(), size)),
        Command::Reset => Ok(initial.clone()),
        _ => Ok(current.clone()),
    };
    next.map_err(|e| e.to_string())
}

/// Headline plus a one-line status for every other section.
fn write_summary<W: Write>(
    out: &mut W,
    session: &Session,
    filter: &TradeFilter,
    opts: &AnalysisOptions,
) -> std::io::Result<()> {
    let report = session.analyze(filter, opts);
    match report.headline.ready() {
        Some(h) => writeln!(
            out,
            "  trades {} | chance of losing money {:.1}% | average PnL {:+.2}",
            h.trades,
            h.chance_of_loss * 100.0,
            h.average_pnl
        )?,
        None => writeln!(out, "  {}", report.headline.reason().unwrap_or_default())?,
    }
    match report.rank_test.ready() {
        Some(t) => writeln!(
            out,
            "  {} vs {}: p = {:.4}",
            t.group_a, t.group_b, t.test.p_value
        )?,
        None => writeln!(out, "  rank test: {}", report.rank_test.reason().unwrap_or_default())?,
    }
    match report.model.ready() {
        Some(m) => writeln!(
            out,
            "  loss model: odds ×{:.3} per 1 000 USD",
            m.size_odds_ratio_per_1000()
        )?,
        None => writeln!(out, "  loss model: {}", report.model.reason().unwrap_or_default())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodlab_core::data::{synthetic_tables, SyntheticParams};

    #[test]
    fn parses_filter_commands() {
        assert_eq!(
            parse_command("moods fear GREED").unwrap(),
            Command::Moods(vec![Mood::Fear, Mood::Greed])
        );
        assert_eq!(
            parse_command("moods all").unwrap(),
            Command::Moods(Mood::ALL.to_vec())
        );
        assert_eq!(
            parse_command("size 1_000 any").unwrap(),
            Command::Size {
                min: 1000.0,
                max: None
            }
        );
        assert_eq!(
            parse_command("predict neutral 2500").unwrap(),
            Command::Predict {
                mood: Mood::Neutral,
                size: 2500.0
            }
        );
        assert_eq!(parse_command("  quit ").unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("").is_err());
        assert!(parse_command("moods panic").is_err());
        assert!(parse_command("size 10").is_err());
        assert!(parse_command("size ten 20").is_err());
        assert!(parse_command("launch").is_err());
    }

    #[test]
    fn invalid_change_keeps_previous_filter() {
        let current = TradeFilter::dashboard_default();
        assert!(apply(&current, &current, Command::Moods(vec![])).is_err());
        assert!(apply(
            &current,
            &current,
            Command::Size {
                min: 10.0,
                max: Some(1.0)
            }
        )
        .is_err());
        let widened = apply(&current, &current, Command::Moods(Mood::ALL.to_vec())).unwrap();
        assert_eq!(widened.size(), current.size());
    }

    #[test]
    fn scripted_session_runs_to_quit() {
        let session = Session::new(synthetic_tables(&SyntheticParams::default()).unwrap());
        let script = b"moods all\nsize 0 any\nmoods\npredict greed 1000\nbogus\nquit\nshow\n";
        let mut out = Vec::new();
        run(
            &session,
            TradeFilter::dashboard_default(),
            &AnalysisOptions::default(),
            &script[..],
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Filter: moods [Fear, Neutral, Greed], size ≥ 0 USD"));
        assert!(text.contains("rejected: mood selection is empty"));
        assert!(text.contains("P(loss | Greed, 1000.00 USD)"));
        assert!(text.contains("unknown command 'bogus'"));
        // input after quit is ignored
        assert!(!text.contains("# Trader Behavior"));
    }
}
