//! A score entry CLI for one judge session.

#![warn(clippy::all, clippy::pedantic)]

use std::path::Path;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use log::debug;

use tally_common::config::ScoringConfig;
use tally_common::score_sheet::ScoreSheet;
use tally_common::store::{DEFAULT_DATA_DIR, LocalStore};
use tally_common::{Contestant, Criterion};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The judge name recorded on every submission from this session
    #[arg(short, long, default_value = "anonymous", env = "TALLY_JUDGE")]
    judge: String,

    /// Directory holding this machine's local storage
    #[arg(short, long, default_value = DEFAULT_DATA_DIR, env = "TALLY_DATA_DIR")]
    data_dir: String,

    /// Event configuration file (JSON); defaults to the built-in event
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the configured contestants
    Contestants,
    /// Show the scoring sheet and running total for one contestant
    Sheet { contestant: String },
    /// Enter one criterion score for a contestant
    Score {
        contestant: String,
        criterion: String,
        value: String,
    },
    /// Finalize the current sheet for a contestant into a submission
    Submit { contestant: String },
    /// Print the serialized submission list for copying to the admin
    Export,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = ScoringConfig::load_or_default(cli.config.as_deref().map(Path::new))?;
    let store = LocalStore::new(&cli.data_dir);
    debug!("using data dir {}", store.dir().display());

    match &cli.command {
        Command::Contestants => {
            for contestant in &config.contestants {
                println!("{} - {}", contestant.id, contestant.name);
            }
        }
        Command::Sheet { contestant } => {
            let contestant = find_contestant(&config, contestant)?;
            let sheet = ScoreSheet::from_scores(store.load_sheet(&cli.judge)?);
            print_sheet(&config, &sheet, contestant);
        }
        Command::Score {
            contestant,
            criterion,
            value,
        } => {
            let contestant = find_contestant(&config, contestant)?;
            let criterion = find_criterion(&config, criterion)?;
            let mut sheet = ScoreSheet::from_scores(store.load_sheet(&cli.judge)?);
            let stored = sheet.apply_entry(criterion, &contestant.id, value)?;
            store.save_sheet(&cli.judge, &sheet.scores)?;
            println!(
                "{}: {stored} / {} pts for {} ({})",
                criterion.name, criterion.max, contestant.name, contestant.id
            );
            println!(
                "Running total: {} / {}",
                sheet.total(&config, &contestant.id),
                config.max_total_score()
            );
            println!("Scores saved locally.");
        }
        Command::Submit { contestant } => {
            let contestant = find_contestant(&config, contestant)?;
            let sheet = ScoreSheet::from_scores(store.load_sheet(&cli.judge)?);
            let submission = sheet.finalize_submission(&config, &cli.judge, &contestant.id)?;
            store.append_submission(&cli.judge, &submission)?;
            println!(
                "Recorded submission {} for {} ({}): total {} / {}",
                submission.submission_id,
                contestant.name,
                contestant.id,
                submission.total_score,
                config.max_total_score()
            );
        }
        Command::Export => {
            println!("{}", store.export_submissions(&cli.judge)?);
        }
    }
    Ok(())
}

fn find_contestant<'a>(config: &'a ScoringConfig, id: &str) -> Result<&'a Contestant> {
    match config.contestant(id) {
        Some(contestant) => Ok(contestant),
        None => bail!("unknown contestant id {id}; run `contestants` to list them"),
    }
}

fn find_criterion<'a>(config: &'a ScoringConfig, name: &str) -> Result<&'a Criterion> {
    match config.criterion(name) {
        Some(criterion) => Ok(criterion),
        None => bail!("unknown criterion {name:?}"),
    }
}

fn print_sheet(config: &ScoringConfig, sheet: &ScoreSheet, contestant: &Contestant) {
    println!("{} ({})", contestant.name, contestant.id);
    for criterion in &config.criteria {
        let entry = match sheet.entry(&contestant.id, &criterion.name) {
            Some(value) => value.to_string(),
            None => "-".to_string(),
        };
        match &criterion.options {
            Some(options) => println!(
                "  {} (pick one of {:?}): {entry}",
                criterion.name, options
            ),
            None => println!("  {} (max {} pts): {entry}", criterion.name, criterion.max),
        }
    }
    println!(
        "Total: {} / {}",
        sheet.total(config, &contestant.id),
        config.max_total_score()
    );
}
