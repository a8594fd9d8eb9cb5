use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::PathBuf;
use wattsim_core::{AlwaysFinish, GameLogger, GameState, GameStatus, Params, RandomProvider};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Every player finishes the build phase as fast as possible.
    Passive,
    /// Every player picks uniformly among their legal actions.
    Random,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of players
    #[arg(short, long, default_value_t = 4)]
    players: usize,

    /// Seed for the risk draw and random policies
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Decision policy driving all players
    #[arg(long, value_enum, default_value_t = Policy::Passive)]
    policy: Policy,

    /// Path to a game parameter file (JSON); defaults to the baseline rules
    #[arg(long)]
    params: Option<PathBuf>,

    /// Write the JSONL game event log to this file
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let params = match &args.params {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open params file {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("cannot parse params file {}", path.display()))?
        }
        None => Params::default(),
    };
    params.validate().context("invalid game parameters")?;

    let logger = match &args.event_log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create event log {}", path.display()))?;
            GameLogger::to_writer(file)
        }
        None => GameLogger::disabled(),
    };

    let provider: Box<dyn wattsim_core::ActionProvider> = match args.policy {
        Policy::Passive => Box::new(AlwaysFinish),
        Policy::Random => Box::new(RandomProvider::new(args.seed)),
    };

    log::info!(
        "Starting a {}-player game with the {:?} policy (seed {})",
        args.players,
        args.policy,
        args.seed
    );

    let mut game = GameState::new(args.players, params, logger, provider, args.seed)?;
    game.run();

    let view = game.view();
    match view.status {
        GameStatus::Win => log::info!("Game won after {} rounds", view.round),
        GameStatus::Loss => log::info!(
            "Game lost after {} rounds: {:?}",
            view.round,
            view.reason
        ),
        GameStatus::Ongoing => log::warn!("Game stopped while still ongoing"),
    }
    log::info!("Total emissions: {}", view.carbon_emissions);
    for (pi, p) in view.players.iter().enumerate() {
        log::info!(
            "Player {pi}: {:?} with {} money and {} assets",
            p.status,
            p.money,
            p.assets.total()
        );
    }

    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}
