use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::board::cozy::{diagram, replay};
use crate::board::Position;
use crate::search::{DepthStep, Outcome, SearchError, SearchReport};

const BREAK_WIDTH: usize = 90;

fn break_line() -> String { "=".repeat(BREAK_WIDTH) }

pub fn render_start() -> String {
    format!("{0}\n\nPerft Validator\n\n{0}\n", break_line())
}

/// Totals, mismatched moves and one line per reference move.
/// Green lines agree, red lines differ, blue lines are missing on one side.
pub fn render_step(step: &DepthStep, reference: &str, candidate: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", break_line());
    let _ = writeln!(out, "Depth: {} | FEN: {}", step.depth, step.position.fen());
    if !step.position.moves().is_empty() {
        let _ = writeln!(out, "Moves: {}", step.position.moves().join(" "));
    }
    let _ = writeln!(out, "{reference} Perft: {}", step.reference_total);
    let _ = writeln!(out, "{candidate} Perft: {}", step.candidate_total);

    if !step.mismatches.is_empty() {
        let _ = writeln!(out, "{}", "Mismatched Moves:".red());
        let _ = writeln!(out, "{}", step.mismatches.join(" ").red());
    }
    for d in &step.diffs {
        let line = format!("{}: {}", d.mv, d.diff);
        let painted = if step.mismatches.contains(&d.mv) {
            line.blue()
        } else if d.diff == 0 {
            line.green()
        } else {
            line.red()
        };
        let _ = writeln!(out, "{painted}");
    }
    let _ = write!(out, "\n{}\n", break_line());
    out
}

/// The position a failure was observed in, replayed from the starting FEN.
pub fn render_position(pos: &Position) -> String {
    match replay(pos) {
        Ok(board) => format!("FEN: {board}\n{}", diagram(&board)),
        Err(e) => format!("FEN: {} (replay failed: {e})", pos.fen()),
    }
}

pub fn render_outcome(outcome: &Outcome) -> String {
    let mut out = String::new();
    match outcome {
        Outcome::Validated { .. } => return out,
        Outcome::Anomaly { depth, .. } => {
            let msg = format!("Unequal Move Generation Resulted In Equal Move Counts (depth {depth})");
            let _ = writeln!(out, "{}", msg.red());
        }
        Outcome::StructuralMismatch { depth, mismatches, .. } => {
            let msg = format!("Move generation differs at depth {depth}: {}", mismatches.join(" "));
            let _ = writeln!(out, "{}", msg.red());
        }
        Outcome::Exhausted { .. } => {
            let _ = writeln!(out, "{}", "Node counts still differ at depth 1".red());
        }
    }
    let _ = writeln!(out, "{}", render_position(outcome.prefix()));
    let _ = write!(out, "Moves: {}", outcome.trail().join(" "));
    out
}

pub fn render_abort(err: &SearchError) -> String {
    match err {
        SearchError::Engine { position, .. } => {
            format!("{}\n{}\nMoves: {}", format!("{err}").red(), render_position(position), position.moves().join(" "))
        }
        SearchError::ZeroDepth => format!("{}", format!("{err}").red()),
    }
}

pub fn render_end(success: bool) -> String {
    let verdict = if success {
        "Move Generation Validated".green()
    } else {
        "Move Generation Failed".red()
    };
    format!("\n{0}\n\n{verdict}\n\n{0}", break_line())
}

pub fn write_json<P: AsRef<Path>>(report: &SearchReport, path: P) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create report file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), report)
        .with_context(|| format!("write report: {}", path.display()))?;
    Ok(())
}
