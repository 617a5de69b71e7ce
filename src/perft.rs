use cozy_chess::Move;
use serde::Serialize;

/// Left-hand side of the line that closes a `go perft` answer.
pub const TERMINAL_PHRASE: &str = "Nodes searched";

/// One classified line of engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerftLine {
    /// `Nodes searched: N`, the end of a perft answer.
    TerminalCount(u64),
    /// `<move>: N`, the subtree size below one root move.
    MoveCount(String, u64),
    /// Banners, `info` lines, diagnostics.
    Unrecognized,
}

/// A line shaped like a result line whose count could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed perft line `{line}`: count `{count}` is not a node count")]
pub struct MalformedLine {
    pub line: String,
    pub count: String,
}

/// Classify one raw line of `go perft` output.
pub fn classify(line: &str) -> Result<PerftLine, MalformedLine> {
    let line = line.trim();
    let mut parts = line.split(':');
    let (left, right) = match (parts.next(), parts.next(), parts.next()) {
        (Some(l), Some(r), None) => (l.trim(), r.trim()),
        _ => return Ok(PerftLine::Unrecognized),
    };
    if left.is_empty() || right.is_empty() {
        return Ok(PerftLine::Unrecognized);
    }

    let count = || {
        right.parse::<u64>().map_err(|_| MalformedLine {
            line: line.to_string(),
            count: right.to_string(),
        })
    };

    if left == TERMINAL_PHRASE {
        return Ok(PerftLine::TerminalCount(count()?));
    }
    if is_move_token(left) {
        return Ok(PerftLine::MoveCount(left.to_string(), count()?));
    }
    Ok(PerftLine::Unrecognized)
}

/// True when `token` is coordinate notation such as `e2e4` or `e7e8q`.
pub fn is_move_token(token: &str) -> bool {
    token.parse::<Move>().is_ok()
}

/// Per-move node counts reported for one position, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PerftResult {
    moves: Vec<(String, u64)>,
    summed: u64,
    total: u64,
}

impl PerftResult {
    pub fn new() -> Self { Self::default() }

    /// Build a finished result from per-move counts and the reported total.
    pub fn from_counts<I, S>(counts: I, total: u64) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut res = Self::new();
        for (mv, n) in counts { res.record(mv.into(), n); }
        res.finish(total);
        res
    }

    /// Accumulate one `MoveCount` line. A repeated move keeps its first slot
    /// and takes the latest count; the running sum still grows.
    pub fn record(&mut self, mv: String, nodes: u64) {
        self.summed = self.summed.saturating_add(nodes);
        match self.moves.iter_mut().find(|(m, _)| *m == mv) {
            Some(slot) => slot.1 = nodes,
            None => self.moves.push((mv, nodes)),
        }
    }

    /// Close the result with the value of the terminal line.
    pub fn finish(&mut self, total: u64) { self.total = total; }

    /// Total as reported by the engine's terminal line.
    pub fn total(&self) -> u64 { self.total }

    /// Sum of every per-move line seen, duplicates included.
    pub fn summed(&self) -> u64 { self.summed }

    pub fn get(&self, mv: &str) -> Option<u64> {
        self.moves.iter().find(|(m, _)| m == mv).map(|(_, n)| *n)
    }

    pub fn contains(&self, mv: &str) -> bool { self.get(mv).is_some() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.moves.iter().map(|(m, n)| (m.as_str(), *n))
    }

    pub fn len(&self) -> usize { self.moves.len() }

    pub fn is_empty(&self) -> bool { self.moves.is_empty() }
}
