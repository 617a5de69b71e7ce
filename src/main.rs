use anyhow::{Context, Result};
use clap::Parser;
use perftdiff::board::cozy::validate_fen;
use perftdiff::engine::{EngineConfig, EngineProcess};
use perftdiff::report;
use perftdiff::search::{DivergenceSearch, SearchConfig};
use std::path::PathBuf;

/// Reference engine location, relative to the working directory.
const REFERENCE_ENGINE: &str = "Stockfish/stockfish";

#[derive(Parser, Debug)]
#[command(author, version, about = "Find where a move generator's perft diverges from Stockfish", long_about = None)]
struct Args {
    /// Path to the engine under test, relative to the working directory
    #[arg(value_name = "CANDIDATE")]
    candidate: PathBuf,

    /// Starting position
    #[arg(value_name = "FEN")]
    fen: String,

    /// Deepest perft to compare
    #[arg(value_name = "DEPTH")]
    depth: u32,

    /// Log every command sent to and line received from the engines
    #[arg(short, long)]
    verbose: bool,

    /// Optional: write the full report as JSON to this path
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    println!("{}", report::render_start());

    validate_fen(&args.fen).context("Invalid FEN")?;
    if args.depth == 0 { anyhow::bail!("depth must be at least 1"); }

    let cwd = std::env::current_dir().context("read working directory")?;
    let engine_cfg = |name: &str| EngineConfig { verbose: args.verbose, ..EngineConfig::named(name) };
    let reference = EngineProcess::spawn(cwd.join(REFERENCE_ENGINE), engine_cfg("Stockfish"))?;
    let candidate = EngineProcess::spawn(cwd.join(&args.candidate), engine_cfg("Anonymous Engine"))?;

    let mut search = DivergenceSearch::new(reference, candidate, SearchConfig { max_depth: args.depth });
    let outcome = search.run_with(&args.fen, |step| {
        println!("{}", report::render_step(step, "Stockfish", "Anonymous Engine"));
    });
    // Engines go down before any reporting that could fail.
    drop(search);

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            println!("{}", report::render_abort(&e));
            println!("{}", report::render_end(false));
            return Err(e.into());
        }
    };

    let rendered = report::render_outcome(&report.outcome);
    if !rendered.is_empty() { println!("{rendered}"); }
    if let Some(path) = &args.json_out {
        report::write_json(&report, path)?;
    }

    let success = report.outcome.is_success();
    println!("{}", report::render_end(success));
    if !success { std::process::exit(1); }
    Ok(())
}
