use serde::Serialize;
use std::fmt;

/// Starting FEN plus the moves played on top of it.
///
/// Values are never mutated in place: [`Position::with_move`] returns a new,
/// longer position so every depth of the search owns its own prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    fen: String,
    moves: Vec<String>,
}

impl Position {
    pub fn new(fen: impl Into<String>) -> Self {
        Self { fen: fen.into().trim().to_string(), moves: Vec::new() }
    }

    pub fn with_moves<I, S>(fen: impl Into<String>, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pos = Self::new(fen);
        pos.moves = moves.into_iter().map(Into::into).collect();
        pos
    }

    pub fn fen(&self) -> &str { &self.fen }

    pub fn moves(&self) -> &[String] { &self.moves }

    pub fn with_move(&self, mv: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.moves.push(mv.into());
        next
    }

    /// The `position` command for this position. The `moves` clause is
    /// dropped when nothing has been played.
    pub fn uci_command(&self) -> String {
        let mut cmd = format!("position fen {}", self.fen);
        if !self.moves.is_empty() {
            cmd.push_str(" moves ");
            cmd.push_str(&self.moves.join(" "));
        }
        cmd
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen)?;
        if !self.moves.is_empty() { write!(f, " [{}]", self.moves.join(" "))?; }
        Ok(())
    }
}
