//! pokerank - rank Pokémon through quick battles and manual reordering.
//!
//! Session state lives in SQLite and is saved after every change. The
//! candidate pool is read from a JSON file named in `pokerank.toml`.

mod config;
mod display;
mod pool;
mod session;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::AppConfig;
use pokerank_core::{BattleType, CandidateId, RankingEngine};
use pokerank_store::SqliteStateStore;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pokerank")]
#[command(about = "Rank Pokémon through battles and manual ordering")]
struct Cli {
    /// Configuration file (defaults to pokerank.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Only battle candidates of this category
    #[arg(long, global = true)]
    category: Option<u32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run interactive battles
    Battle {
        /// Battle format: pairs or triplets
        #[arg(short = 't', long = "type")]
        battle_type: Option<BattleType>,
        /// Stop after this many battles
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },
    /// Move a candidate to a position in the current ranking
    Reorder {
        /// Candidate id
        id: u32,
        /// New 1-based position
        position: usize,
    },
    /// Show the current ranking
    Rankings {
        /// Number of rows to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show a frozen milestone ranking, or list them
    Milestone {
        /// Battle count of the milestone
        count: Option<u32>,
    },
    /// Flag a candidate for refinement battles
    Flag { id: u32 },
    /// Remove a candidate from the refinement queue
    Unflag { id: u32 },
    /// Show the refinement queue
    Queue,
    /// Discard all ratings and progress
    Reset,
    /// Write the session state as JSON
    Export { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let pool = pool::load_pool(&config.pool_path)
        .with_context(|| format!("Failed to load pool from {}", config.pool_path.display()))?;
    tracing::info!("Loaded {} candidates", pool.len());

    if let Some(dir) = config.db_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }
    let mut store = SqliteStateStore::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    let mut engine = match store.load() {
        Ok(Some(state)) => RankingEngine::from_persisted(config.engine.clone(), pool, state),
        Ok(None) => RankingEngine::new(config.engine.clone(), pool),
        Err(e) => {
            tracing::warn!("Could not read saved session, starting fresh: {}", e);
            RankingEngine::new(config.engine.clone(), pool)
        }
    };
    engine.set_category_filter(cli.category);

    run(cli.command, &mut engine, &mut store)
}

fn persist(store: &mut SqliteStateStore, engine: &RankingEngine) {
    if let Err(e) = store.save(&engine.to_persisted()) {
        tracing::warn!("Failed to save session: {}", e);
    }
}

fn run(
    command: Commands,
    engine: &mut RankingEngine,
    store: &mut SqliteStateStore,
) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    match command {
        Commands::Battle { battle_type, count } => {
            if let Some(battle_type) = battle_type {
                engine.set_battle_type(battle_type);
            }
            let stdin = io::stdin();
            let summary = session::run_session(
                engine,
                &mut stdin.lock(),
                &mut stdout,
                count,
                |engine| store.save(&engine.to_persisted()),
            )?;
            tracing::info!("Session ended: {:?}", summary.end);
        }
        Commands::Reorder { id, position } => {
            let id = CandidateId(id);
            if !engine.pool().contains(id) {
                anyhow::bail!("Candidate {} is not in the pool", id);
            }
            if position == 0 {
                anyhow::bail!("Positions start at 1");
            }
            let mut order: Vec<CandidateId> = engine.get_rankings().iter().map(|e| e.id).collect();
            if !order.contains(&id) {
                order.push(id);
            }
            let rankings = engine.submit_manual_reorder(id, position - 1, &order)?;
            persist(store, engine);
            write!(stdout, "{}", display::format_rankings(&rankings, None))?;
        }
        Commands::Rankings { limit } => {
            let progress = match engine.next_milestone() {
                Some(next) => format!(
                    "next milestone {} ({:.0}%)",
                    next,
                    engine.progress() * 100.0
                ),
                None => "no further milestones".to_string(),
            };
            writeln!(stdout, "{} battles, {}", engine.total_battles(), progress)?;
            write!(
                stdout,
                "{}",
                display::format_rankings(&engine.get_rankings(), limit)
            )?;
        }
        Commands::Milestone { count: Some(count) } => match engine.get_milestone_snapshot(count) {
            Some(snapshot) => write!(
                stdout,
                "{}",
                display::format_snapshot(snapshot, engine.pool())
            )?,
            None => writeln!(stdout, "No milestone snapshot at {} battles", count)?,
        },
        Commands::Milestone { count: None } => {
            let counts: Vec<String> = engine
                .snapshots()
                .iter()
                .map(|s| s.battle_count().to_string())
                .collect();
            if counts.is_empty() {
                writeln!(stdout, "No milestones reached yet")?;
            } else {
                writeln!(stdout, "Milestones: {}", counts.join(", "))?;
            }
        }
        Commands::Flag { id } => {
            if !engine.pool().contains(CandidateId(id)) {
                anyhow::bail!("Candidate {} is not in the pool", CandidateId(id));
            }
            if engine.enqueue_refinement(CandidateId(id)) {
                persist(store, engine);
                writeln!(stdout, "Flagged {} for refinement", CandidateId(id))?;
            } else {
                writeln!(stdout, "{} is already flagged", CandidateId(id))?;
            }
        }
        Commands::Unflag { id } => {
            if engine.remove_refinement(CandidateId(id)) {
                persist(store, engine);
                writeln!(stdout, "Removed {} from the refinement queue", CandidateId(id))?;
            } else {
                writeln!(stdout, "{} was not flagged", CandidateId(id))?;
            }
        }
        Commands::Queue => write!(
            stdout,
            "{}",
            display::format_queue(engine.refinement_queue(), engine.pool())
        )?,
        Commands::Reset => {
            engine.reset();
            if let Err(e) = store.clear() {
                tracing::warn!("Failed to clear saved session: {}", e);
            }
            writeln!(stdout, "Session reset")?;
        }
        Commands::Export { path } => {
            let json = serde_json::to_string_pretty(&engine.to_persisted())?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            writeln!(stdout, "Exported session to {}", path.display())?;
        }
    }
    Ok(())
}
