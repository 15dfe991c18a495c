#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Virus Smash sessions.

mod config;
mod engine;
mod render;

use std::{
    fs::OpenOptions,
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use virus_smash_core::{CellIndex, Command, Event, SessionState};
use virus_smash_system_autoplay::Autoplay;
use virus_smash_system_reporting::{JsonLinesSink, MemorySink, ScoreSink};
use virus_smash_world::query;

use self::{config::FileConfig, engine::Engine};

#[derive(Debug, Parser)]
#[command(name = "virus-smash", about = "Reactive grid game engine runner")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seed of the spawn stream.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// JSON-lines file that receives finished scores.
    #[arg(long, global = true)]
    scores: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Let a simulated player run a session headlessly.
    Simulate(SimulateArgs),
    /// Play a session by typing commands.
    Play,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Milliseconds a cell must be visible before the player reacts.
    #[arg(long)]
    reaction_ms: Option<u64>,
    /// Probability of engaging a virus or boss.
    #[arg(long)]
    accuracy: Option<f64>,
    /// Probability of clicking a trap by mistake.
    #[arg(long)]
    blunder_rate: Option<f64>,
    /// Hard stop in simulated seconds.
    #[arg(long)]
    max_secs: Option<u64>,
    /// Print the grid every simulated second.
    #[arg(long)]
    show: bool,
}

/// Entry point for the Virus Smash command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let file = FileConfig::load(cli.config.as_deref())?;

    let seed = cli.seed.or(file.session.seed).unwrap_or_else(rand::random);
    info!(seed, "spawn stream seeded");

    let sink = open_sink(cli.scores.or(file.report.scores_path.clone()))?;
    let mut engine = Engine::new(seed, sink);
    println!("{}", query::welcome_banner(engine.world()));

    match cli.mode {
        Mode::Simulate(args) => simulate(&mut engine, &file, &args),
        Mode::Play => play(&mut engine, &file),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_sink(path: Option<PathBuf>) -> Result<Box<dyn ScoreSink>> {
    let Some(path) = path else {
        return Ok(Box::new(MemorySink::new()));
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open scores file {}", path.display()))?;
    Ok(Box::new(JsonLinesSink::new(file)))
}

fn simulate(
    engine: &mut Engine<Box<dyn ScoreSink>>,
    file: &FileConfig,
    args: &SimulateArgs,
) -> Result<()> {
    let mut player_config = file.autoplay;
    if let Some(reaction) = args.reaction_ms {
        player_config.reaction = Duration::from_millis(reaction);
    }
    if let Some(accuracy) = args.accuracy {
        player_config.accuracy = accuracy;
    }
    if let Some(blunder_rate) = args.blunder_rate {
        player_config.blunder_rate = blunder_rate;
    }
    for (name, value) in [
        ("accuracy", player_config.accuracy),
        ("blunder rate", player_config.blunder_rate),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{name} must lie within 0.0..=1.0, got {value}");
        }
    }

    let frame = frame_length(file)?;
    let max = Duration::from_secs(args.max_secs.unwrap_or(file.simulation.max_secs));
    let mut player = Autoplay::new(player_config);

    let _ = engine.step(Command::StartSession, Some(&mut player));
    let mut elapsed = Duration::ZERO;
    while elapsed < max && query::session_state(engine.world()) == SessionState::Active {
        let events = engine.advance(Duration::from_secs(1), frame, Some(&mut player));
        elapsed += Duration::from_secs(1);
        if args.show {
            println!("{}\n", draw(engine));
        }
        report_summary(&events);
    }

    if query::session_state(engine.world()) == SessionState::Active {
        println!("stopped after {}s without a game over", max.as_secs());
        println!("{}", draw(engine));
    }
    println!(
        "scores reported: {}, failed: {}",
        engine.reporting().delivered(),
        engine.reporting().failed()
    );
    Ok(())
}

fn play(engine: &mut Engine<Box<dyn ScoreSink>>, file: &FileConfig) -> Result<()> {
    let frame = frame_length(file)?;
    let longest_wait = Duration::from_secs(file.simulation.max_secs);
    println!("commands: start | hit <0-15> | wait <ms> | show | quit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        let mut words = line.split_whitespace();
        let events = match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("quit" | "q"), _) => break,
            (Some("start" | "restart"), _) => engine.step(Command::StartSession, None),
            (Some("hit" | "h"), Some(cell)) => match cell.parse::<u32>() {
                Ok(cell) => engine.step(
                    Command::Hit {
                        cell: CellIndex::new(cell),
                    },
                    None,
                ),
                Err(_) => {
                    println!("not a cell index: {cell}");
                    continue;
                }
            },
            (Some("wait" | "w"), Some(millis)) => match wait_duration(millis, longest_wait) {
                Ok(wait) => engine.advance(wait, frame, None),
                Err(error) => {
                    println!("{error}");
                    continue;
                }
            },
            (Some("show" | "s"), _) => Vec::new(),
            (Some(other), _) => {
                println!("unknown command: {other}");
                continue;
            }
        };

        report_summary(&events);
        println!("{}", draw(engine));
        stdout.flush().context("failed to flush stdout")?;
    }
    Ok(())
}

fn draw<S: ScoreSink>(engine: &Engine<S>) -> String {
    let world = engine.world();
    render::frame(query::grid_view(world), &query::session(world))
}

fn wait_duration(millis: &str, longest: Duration) -> Result<Duration> {
    let millis: u64 = millis
        .parse()
        .with_context(|| format!("not a duration: {millis}"))?;
    let wait = Duration::from_millis(millis);
    if wait > longest {
        bail!("waits are capped at {} ms", longest.as_millis());
    }
    Ok(wait)
}

fn frame_length(file: &FileConfig) -> Result<Duration> {
    if file.simulation.tick_ms == 0 {
        bail!("simulation.tick_ms must be positive");
    }
    Ok(Duration::from_millis(file.simulation.tick_ms))
}

fn report_summary(events: &[Event]) {
    for event in events {
        if let Event::SessionEnded { summary } = event {
            println!(
                "game over ({:?}): score {} after {}s, {} viruses, {} bosses, best combo {}",
                summary.cause,
                summary.final_score,
                summary.survival_secs,
                summary.viruses_smashed,
                summary.bosses_defeated,
                summary.best_combo
            );
        }
    }
}
