use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use twentyq_cli::config::{CliConfig, ResolvedOutputs};
use twentyq_cli::dataset::FileStore;
use twentyq_cli::logging::init_logging;
use twentyq_cli::play::{self, PlayOutcome};
use twentyq_cli::simulate::SimulationRunner;
use twentyq_core::AppInfo;
use twentyq_core::game::GameState;
use twentyq_core::settings::GameSettings;

/// Twenty questions over a learned response dataset.
#[derive(Debug, Parser)]
#[command(name = "twentyq", author, version, about = "Twenty questions guessing engine")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "twentyq.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Exit after validating the configuration and loading the dataset.
    #[arg(long)]
    validate_only: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play interactively on stdin/stdout.
    Play {
        /// Resume from, and save to, this session file.
        #[arg(long, value_name = "FILE")]
        session: Option<PathBuf>,
    },
    /// Run seeded self-play over the dataset.
    Simulate {
        /// Override the number of games.
        #[arg(long, value_name = "N")]
        games: Option<usize>,

        /// Override the RNG seed for secret selection.
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }
    if let Some(Command::Simulate { games, seed }) = &cli.command {
        if let Some(games) = games {
            config.simulate.games = *games;
        }
        if let Some(seed) = seed {
            config.simulate.seed = Some(*seed);
        }
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;

    let mut store = FileStore::open(&config.dataset, &outputs.records, &outputs.outcomes)
        .with_context(|| format!("opening dataset {}", config.dataset))?;
    eprintln!(
        "{} {} ({}): '{run_id}' with {} candidates and {} questions",
        AppInfo::name(),
        AppInfo::version(),
        AppInfo::codename(),
        store.memory().candidate_count(),
        store.memory().question_count()
    );

    if cli.validate_only {
        eprintln!("Validation-only mode: no game played.");
        return Ok(());
    }

    match cli.command.unwrap_or(Command::Play { session: None }) {
        Command::Play { session } => run_play(&mut store, config.game, session.as_deref()),
        Command::Simulate { .. } => {
            let runner = SimulationRunner::new(&store, config.game, run_id.as_str());
            let summary = runner.run(
                config.simulate.games,
                config.simulate.seed,
                &outputs.simulation,
            )?;
            println!(
                "Simulated {} games: {:.1}% found, {:.2} questions on average",
                summary.games,
                summary.success_rate() * 100.0,
                summary.average_questions()
            );
            println!("Game rows: {}", summary.jsonl_path.display());
            Ok(())
        }
    }
}

fn run_play(store: &mut FileStore, settings: GameSettings, session: Option<&Path>) -> Result<()> {
    let state = match session.filter(|path| path.exists()) {
        Some(path) => {
            let payload = fs::read_to_string(path)
                .with_context(|| format!("reading session {}", path.display()))?;
            let state = GameState::deserialize(&payload, settings)
                .with_context(|| format!("restoring session {}", path.display()))?;
            eprintln!(
                "Resuming game at question {}.",
                state.question_number()
            );
            state
        }
        None => GameState::with_settings(settings),
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    match play::run(store, state, &mut input, &mut output)? {
        PlayOutcome::Finished(_) => {
            if let Some(path) = session.filter(|path| path.exists()) {
                fs::remove_file(path)
                    .with_context(|| format!("removing finished session {}", path.display()))?;
            }
        }
        PlayOutcome::Suspended(payload) => match session {
            Some(path) => {
                fs::write(path, payload)
                    .with_context(|| format!("saving session {}", path.display()))?;
                eprintln!("Session saved to {}.", path.display());
            }
            None => eprintln!("Session not saved; pass --session FILE to resume later."),
        },
    }
    Ok(())
}
