//! Snow Groomer headless driver
//!
//! Loads a level (JSON file or seeded daily run), lets the autopilot groom it
//! for a while, logs what happened and prints the final snapshot as JSON.
//!
//! ```text
//! snow-groomer <level.json> [--tuning tuning.json] [--secs N] [--seed N]
//! snow-groomer --daily <seed> [rank] [--tuning tuning.json] [--secs N]
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};
use thiserror::Error;

use snow_groomer::level::seed_from_str;
use snow_groomer::objectives::evaluate;
use snow_groomer::sim::{FixedStepper, GameEvent, GameState, TickInput};
use snow_groomer::{Level, LevelError, Rank, Tuning, generate_level};

/// Driver frame time; the stepper turns it into fixed simulation ticks
const FRAME_DT: f32 = 1.0 / 30.0;

#[derive(Debug, Error)]
enum DriverError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error("cannot encode snapshot: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "snow-groomer", version, about = "Let the autopilot groom a level and report the result")]
#[command(group(ArgGroup::new("source").required(true).args(["level", "daily"])))]
struct Cli {
    /// Level definition (JSON)
    level: Option<PathBuf>,

    /// Generate a daily run from a shareable seed and optional rank (green, blue, red, black)
    #[arg(long, num_args = 1..=2, value_names = ["SEED", "RANK"])]
    daily: Vec<String>,

    /// Tuning overrides (JSON); absent keys keep their defaults
    #[arg(long, value_name = "FILE")]
    tuning: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u32).range(1..=86_400))]
    secs: u32,

    /// Simulation seed; defaults to the daily seed, or 0 for level files
    #[arg(long)]
    seed: Option<u64>,
}

fn read(path: &Path) -> Result<String, DriverError> {
    std::fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn run(cli: Cli) -> Result<(), DriverError> {
    let tuning = match &cli.tuning {
        Some(path) => Tuning::from_json(&read(path)?)?,
        None => Tuning::default(),
    };

    let (level, default_seed) = match (&cli.level, cli.daily.split_first()) {
        (Some(path), _) => (Level::from_json(&read(path)?)?, 0),
        (None, Some((seed, rest))) => {
            let rank = rest.first().map(|name| Rank::parse(name)).unwrap_or_default();
            log::info!("daily run '{seed}' ({})", rank.as_str());
            (Level::from_def(generate_level(seed, rank))?, seed_from_str(seed))
        }
        (None, None) => Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "a level file or --daily <SEED> is required")
            .exit(),
    };

    let mut state = GameState::new(level, tuning, cli.seed.unwrap_or(default_seed))?;
    let mut stepper = FixedStepper::default();
    let input = TickInput {
        autopilot: true,
        ..TickInput::default()
    };

    let frames = (cli.secs as f32 / FRAME_DT).ceil() as u32;
    for _ in 0..frames {
        stepper.advance(&mut state, &input, FRAME_DT);
        for event in state.drain_events() {
            match event {
                GameEvent::AgentTrack { .. } => log::trace!("{event:?}"),
                GameEvent::AgentStateChanged { .. } | GameEvent::AgentSpawned { .. } | GameEvent::AgentRemoved { .. } => {
                    log::debug!("{event:?}")
                }
                _ => log::info!("{event:?}"),
            }
        }
        if state.is_over() {
            break;
        }
    }

    let snapshot = state.snapshot();
    let result = evaluate(&state.level, &snapshot);
    log::info!(
        "finished '{}': {:.1}% coverage, {} star(s)",
        state.level.name,
        snapshot.coverage_ratio * 100.0,
        result.stars
    );
    for (objective, met) in &result.bonus {
        log::info!("  [{}] {}", if *met { "x" } else { " " }, objective.describe());
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("snow-groomer: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_daily_with_rank() {
        let cli = Cli::try_parse_from(["snow-groomer", "--daily", "ABC123", "black", "--secs", "60"]).unwrap();
        assert_eq!(cli.daily, vec!["ABC123".to_string(), "black".to_string()]);
        assert!(cli.level.is_none());
        assert_eq!(cli.secs, 60);
    }

    #[test]
    fn test_level_file_defaults() {
        let cli = Cli::try_parse_from(["snow-groomer", "levels/bunny.json"]).unwrap();
        assert_eq!(cli.level, Some(PathBuf::from("levels/bunny.json")));
        assert_eq!(cli.secs, 240);
        assert!(cli.seed.is_none());
    }

    #[test]
    fn test_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["snow-groomer"]).is_err());
        assert!(Cli::try_parse_from(["snow-groomer", "a.json", "--daily", "X"]).is_err());
        assert!(Cli::try_parse_from(["snow-groomer", "a.json", "--secs", "0"]).is_err());
    }
}
