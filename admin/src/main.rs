//! The admin-side leaderboard CLI.
//!
//! Collects whatever the judges exported, ranks the contestants, and prints
//! the leaderboard table and chart.

#![warn(clippy::all, clippy::pedantic)]

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use tally_common::config::ScoringConfig;
use tally_common::ingest::{dedup_submissions, ingest};
use tally_common::leaderboard::rank_contestants;
use tally_common::store::{DEFAULT_DATA_DIR, LocalStore};
use tally_common::{LeaderboardRow, Submission, SubmissionSource};

const CHART_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(
    long_about = "Aggregates judge submissions into a ranked leaderboard. Paste the judges' \
exported text on stdin (or point --input at a file); the last paste is cached and reused when \
no new text arrives. The passcode is a shared string meant to keep casual eyes off the \
leaderboard, nothing more."
)]
pub struct Cli {
    /// The shared passcode revealing the leaderboard
    #[arg(short, long, env = "TALLY_PASSCODE")]
    passcode: String,

    /// Where to read submissions from
    #[arg(value_enum, short, long, default_value = "paste", env = "TALLY_SOURCE")]
    source: SubmissionSource,

    /// File with pasted judge exports; stdin when omitted (paste source)
    #[arg(short, long)]
    input: Option<String>,

    /// Judge whose local submission log to aggregate (local source)
    #[arg(short, long, env = "TALLY_JUDGE")]
    judge: Option<String>,

    /// Directory holding this machine's local storage
    #[arg(short, long, default_value = DEFAULT_DATA_DIR, env = "TALLY_DATA_DIR")]
    data_dir: String,

    /// Event configuration file (JSON); defaults to the built-in event
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = ScoringConfig::load_or_default(cli.config.as_deref().map(Path::new))?;
    if cli.passcode != config.admin_passcode {
        println!("That passcode does not match. Ask the organizer for the current one.");
        std::process::exit(1);
    }

    let store = LocalStore::new(&cli.data_dir);
    let submissions = collect_submissions(&cli, &store)?;
    info!("aggregating {} submissions", submissions.len());

    let rows = rank_contestants(&submissions, &config);
    if rows.is_empty() {
        println!("No submissions yet. Paste judge exports to build the leaderboard.");
        return Ok(());
    }

    print_table(&rows);
    println!();
    print_chart(&rows, config.max_total_score());
    Ok(())
}

/// Gather the submission set from the selected source, deduplicated either
/// way: a pasted blob may repeat itself, and a local log may hold a double
/// submit.
fn collect_submissions(cli: &Cli, store: &LocalStore) -> Result<Vec<Submission>> {
    match cli.source {
        SubmissionSource::Paste => {
            let raw = match read_paste_input(cli)? {
                Some(text) => {
                    store.save_paste_cache(&text)?;
                    text
                }
                None => store.load_paste_cache()?.unwrap_or_default(),
            };
            Ok(ingest(&raw))
        }
        SubmissionSource::Local => {
            let Some(judge) = cli.judge.as_deref() else {
                bail!("--source local needs --judge to pick a submission log");
            };
            Ok(dedup_submissions(store.load_submissions(judge)?))
        }
    }
}

/// New pasted text, if any arrived this run.
fn read_paste_input(cli: &Cli) -> Result<Option<String>> {
    let text = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("could not read pasted input from {path}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("could not read pasted input from stdin")?;
            buffer
        }
    };
    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn print_table(rows: &[LeaderboardRow]) {
    println!("=== LEADERBOARD ===");
    println!(
        "{:>4}  {:<30} {:>8} {:>8} {:>10}",
        "Rank", "Contestant", "Avg", "Judges", "Tie-break"
    );
    for row in rows {
        // the top three placements get a marker
        let marker = if row.rank <= 3 { '*' } else { ' ' };
        println!(
            "{marker}{:>3}  {:<30} {:>8.2} {:>8} {:>10.2}",
            row.rank, row.name, row.average_total, row.sample_count, row.average_tie_break
        );
    }
}

/// Horizontal bars keyed by rank and name, with the axis ceiling fixed at
/// the maximum possible total score.
fn print_chart(rows: &[LeaderboardRow], max_total_score: i64) {
    println!("=== AVERAGE SCORES (out of {max_total_score}) ===");
    for row in rows {
        let bar = "#".repeat(bar_length(row.average_total, max_total_score));
        println!(
            "{:>2}. {:<30} |{:<width$}| {:.2}",
            row.rank,
            row.name,
            bar,
            row.average_total,
            width = CHART_WIDTH
        );
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn bar_length(average: f64, max_total_score: i64) -> usize {
    if max_total_score <= 0 {
        return 0;
    }
    let scaled = (average / max_total_score as f64) * CHART_WIDTH as f64;
    (scaled.round().max(0.0) as usize).min(CHART_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_length_scales_to_the_axis_ceiling() {
        assert_eq!(bar_length(100.0, 100), CHART_WIDTH);
        assert_eq!(bar_length(50.0, 100), CHART_WIDTH / 2);
        assert_eq!(bar_length(0.0, 100), 0);
    }

    #[test]
    fn test_bar_length_clamps_out_of_range_averages() {
        assert_eq!(bar_length(250.0, 100), CHART_WIDTH);
        assert_eq!(bar_length(-5.0, 100), 0);
    }
}
