//! Depth-descending narrowing of a perft disagreement.
//!
//! Both engines are asked for a split perft of the same position. The root
//! move whose subtree count differs the most is played and the comparison is
//! repeated one ply shallower, until the totals agree, a move appears on one
//! side only, or the depth runs out.
//!
//! Only moves the reference engine reports are candidates for the move that
//! is followed. A move only the candidate engine generates is listed as a
//! mismatch but is never played.

use log::{debug, info};
use serde::Serialize;

use crate::board::Position;
use crate::engine::{EngineError, PerftEngine};
use crate::perft::PerftResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveDiff {
    pub mv: String,
    pub reference: u64,
    pub candidate: Option<u64>,
    /// Reference minus candidate; the full reference count when the
    /// candidate never produced the move.
    pub diff: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// One entry per reference move, in reference order.
    pub diffs: Vec<MoveDiff>,
    /// Reference-only moves, then candidate-only moves.
    pub mismatches: Vec<String>,
}

impl Comparison {
    /// Largest per-move difference. Ties go to the move the reference
    /// engine printed first.
    pub fn biggest(&self) -> Option<&MoveDiff> {
        self.diffs.iter().fold(None, |best: Option<&MoveDiff>, d| match best {
            Some(b) if b.diff >= d.diff => Some(b),
            _ => Some(d),
        })
    }
}

fn signed(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn compare(reference: &PerftResult, candidate: &PerftResult) -> Comparison {
    let diffs = reference
        .iter()
        .map(|(mv, r)| {
            let c = candidate.get(mv);
            let diff = match c {
                Some(c) => signed(r) - signed(c),
                None => signed(r),
            };
            MoveDiff { mv: mv.to_string(), reference: r, candidate: c, diff }
        })
        .collect();

    let mut mismatches: Vec<String> = reference
        .iter()
        .filter(|(mv, _)| !candidate.contains(mv))
        .map(|(mv, _)| mv.to_string())
        .collect();
    mismatches.extend(
        candidate.iter().filter(|(mv, _)| !reference.contains(mv)).map(|(mv, _)| mv.to_string()),
    );

    Comparison { diffs, mismatches }
}

/// Everything observed at one depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthStep {
    pub depth: u32,
    pub position: Position,
    pub reference_total: u64,
    pub candidate_total: u64,
    pub diffs: Vec<MoveDiff>,
    pub mismatches: Vec<String>,
    /// Move the search would follow from here.
    pub chosen: Option<String>,
}

/// How a run ended. `prefix` is always the position that was queried at
/// `depth`; `suspect` is the move implicated there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Totals agree; no narrowing needed below this depth.
    Validated { depth: u32, prefix: Position },
    /// Totals differ but no single move accounts for it.
    Anomaly { depth: u32, prefix: Position, suspect: Option<String> },
    /// One engine generates a move the other does not.
    StructuralMismatch { depth: u32, prefix: Position, suspect: Option<String>, mismatches: Vec<String> },
    /// Depth 1 reached with totals still differing.
    Exhausted { depth: u32, prefix: Position, suspect: Option<String> },
}

impl Outcome {
    pub fn is_success(&self) -> bool { matches!(self, Outcome::Validated { .. }) }

    pub fn depth(&self) -> u32 {
        match self {
            Outcome::Validated { depth, .. }
            | Outcome::Anomaly { depth, .. }
            | Outcome::StructuralMismatch { depth, .. }
            | Outcome::Exhausted { depth, .. } => *depth,
        }
    }

    pub fn prefix(&self) -> &Position {
        match self {
            Outcome::Validated { prefix, .. }
            | Outcome::Anomaly { prefix, .. }
            | Outcome::StructuralMismatch { prefix, .. }
            | Outcome::Exhausted { prefix, .. } => prefix,
        }
    }

    pub fn suspect(&self) -> Option<&str> {
        match self {
            Outcome::Validated { .. } => None,
            Outcome::Anomaly { suspect, .. }
            | Outcome::StructuralMismatch { suspect, .. }
            | Outcome::Exhausted { suspect, .. } => suspect.as_deref(),
        }
    }

    /// Prefix moves followed by the implicated move, if any.
    pub fn trail(&self) -> Vec<String> {
        let mut moves = self.prefix().moves().to_vec();
        moves.extend(self.suspect().map(str::to_string));
        moves
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub fen: String,
    pub max_depth: u32,
    pub steps: Vec<DepthStep>,
    pub outcome: Outcome,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search depth must be at least 1")]
    ZeroDepth,
    #[error("engine failed at depth {depth} in {position}")]
    Engine {
        depth: u32,
        position: Position,
        #[source]
        source: EngineError,
    },
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub max_depth: u32,
}

impl Default for SearchConfig {
    fn default() -> Self { Self { max_depth: 1 } }
}

/// Owns the reference and candidate engines for one validation run.
pub struct DivergenceSearch<R, C> {
    reference: R,
    candidate: C,
    cfg: SearchConfig,
}

impl<R: PerftEngine, C: PerftEngine> DivergenceSearch<R, C> {
    pub fn new(reference: R, candidate: C, cfg: SearchConfig) -> Self {
        Self { reference, candidate, cfg }
    }

    pub fn into_engines(self) -> (R, C) { (self.reference, self.candidate) }

    pub fn run(&mut self, fen: &str) -> Result<SearchReport, SearchError> {
        self.run_with(fen, |_| {})
    }

    /// Run the search, handing each depth's step to `on_step` as soon as
    /// both engines have answered.
    pub fn run_with<F>(&mut self, fen: &str, mut on_step: F) -> Result<SearchReport, SearchError>
    where
        F: FnMut(&DepthStep),
    {
        if self.cfg.max_depth == 0 { return Err(SearchError::ZeroDepth); }
        let fen = fen.trim();
        let max_depth = self.cfg.max_depth;
        let mut pos = Position::new(fen);
        let mut steps = Vec::new();

        for depth in (1..=max_depth).rev() {
            let (r, c) = self.query(&pos, depth).map_err(|source| SearchError::Engine {
                depth,
                position: pos.clone(),
                source,
            })?;
            let cmp = compare(&r, &c);
            let biggest = cmp.biggest().map(|d| (d.mv.clone(), d.diff));
            info!(
                "depth {depth}: {} {} vs {} {} ({} mismatched)",
                self.reference.name(), r.total(), self.candidate.name(), c.total(), cmp.mismatches.len()
            );

            let step = DepthStep {
                depth,
                position: pos.clone(),
                reference_total: r.total(),
                candidate_total: c.total(),
                diffs: cmp.diffs,
                mismatches: cmp.mismatches,
                chosen: biggest.as_ref().map(|(mv, _)| mv.clone()),
            };
            on_step(&step);
            let mismatches = step.mismatches.clone();
            steps.push(step);

            let done = |outcome: Outcome, steps: Vec<DepthStep>| SearchReport {
                fen: fen.to_string(),
                max_depth,
                steps,
                outcome,
            };

            if r.total() == c.total() {
                return Ok(done(Outcome::Validated { depth, prefix: pos }, steps));
            }
            let suspect = biggest.as_ref().map(|(mv, _)| mv.clone());
            let outcome = match biggest {
                None if mismatches.is_empty() => Outcome::Anomaly { depth, prefix: pos, suspect },
                None => Outcome::StructuralMismatch { depth, prefix: pos, suspect, mismatches },
                Some((_, 0)) => Outcome::Anomaly { depth, prefix: pos, suspect },
                Some(_) if !mismatches.is_empty() => {
                    Outcome::StructuralMismatch { depth, prefix: pos, suspect, mismatches }
                }
                Some(_) if depth == 1 => Outcome::Exhausted { depth, prefix: pos, suspect },
                Some((mv, diff)) => {
                    debug!("depth {depth}: following {mv} (diff {diff})");
                    pos = pos.with_move(mv);
                    continue;
                }
            };
            return Ok(done(outcome, steps));
        }
        unreachable!("the depth-1 iteration always settles the outcome")
    }

    fn query(&mut self, pos: &Position, depth: u32) -> Result<(PerftResult, PerftResult), EngineError> {
        self.reference.load_position(pos)?;
        self.candidate.load_position(pos)?;
        let r = self.reference.perft(depth)?;
        let c = self.candidate.perft(depth)?;
        Ok((r, c))
    }
}
