use cozy_chess::{Board as CozyBoard, Color, File, Piece, Rank, Square};
use cozy_chess::util::parse_uci_move;

use super::Position;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("invalid FEN `{fen}`: {reason}")]
    Fen { fen: String, reason: String },
    #[error("ply {ply}: `{mv}` is not a move")]
    BadMove { ply: usize, mv: String },
    #[error("ply {ply}: `{mv}` is illegal here")]
    Illegal { ply: usize, mv: String },
}

/// Complete a FEN missing its halfmove and fullmove counters, which
/// engines accept in `position fen`.
fn full_fen(fen: &str) -> String {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    match fields.len() {
        4 => format!("{} 0 1", fields.join(" ")),
        5 => format!("{} 1", fields.join(" ")),
        _ => fields.join(" "),
    }
}

pub fn validate_fen(fen: &str) -> Result<CozyBoard, ReplayError> {
    CozyBoard::from_fen(&full_fen(fen), false).map_err(|e| ReplayError::Fen {
        fen: fen.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Play the moves of `pos` on its FEN. Castling is read in standard UCI
/// form (`e1g1`), the way engines print it in perft output.
pub fn replay(pos: &Position) -> Result<CozyBoard, ReplayError> {
    let mut board = validate_fen(pos.fen())?;
    for (ply, mv_uci) in pos.moves().iter().enumerate() {
        let mv = parse_uci_move(&board, mv_uci)
            .map_err(|_| ReplayError::BadMove { ply, mv: mv_uci.clone() })?;
        if !board.is_legal(mv) {
            return Err(ReplayError::Illegal { ply, mv: mv_uci.clone() });
        }
        board.play_unchecked(mv);
    }
    Ok(board)
}

fn piece_char(piece: Piece, color: Color) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    if color == Color::White { c.to_ascii_uppercase() } else { c }
}

/// Eight rank lines, white at the bottom, `.` for empty squares.
pub fn diagram(board: &CozyBoard) -> String {
    let mut out = String::new();
    for &rank in Rank::ALL.iter().rev() {
        out.push(rank_char(rank));
        out.push(' ');
        for &file in File::ALL.iter() {
            let sq = Square::new(file, rank);
            let c = match (board.piece_on(sq), board.color_on(sq)) {
                (Some(p), Some(col)) => piece_char(p, col),
                _ => '.',
            };
            out.push(c);
            out.push(' ');
        }
        out.pop();
        out.push('\n');
    }
    out.push_str("  a b c d e f g h");
    out
}

fn rank_char(rank: Rank) -> char { (b'1' + rank as u8) as char }

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn replays_standard_castling() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let b = replay(&Position::with_moves(fen, ["e1g1"])).expect("castling is legal");
        assert_eq!(b.side_to_move(), Color::Black);
        assert_eq!(b.piece_on(Square::G1), Some(Piece::King));
        assert_eq!(b.piece_on(Square::F1), Some(Piece::Rook));
    }

    #[test]
    fn illegal_move_reports_ply() {
        let err = replay(&Position::with_moves(START, ["e2e4", "e2e4"])).unwrap_err();
        assert!(matches!(err, ReplayError::Illegal { ply: 1, .. } | ReplayError::BadMove { ply: 1, .. }));
    }

    #[test]
    fn diagram_of_startpos() {
        let d = diagram(&validate_fen(START).unwrap());
        let lines: Vec<&str> = d.lines().collect();
        assert_eq!(lines[0], "8 r n b q k b n r");
        assert_eq!(lines[7], "1 R N B Q K B N R");
        assert_eq!(lines[8], "  a b c d e f g h");
    }

    #[test]
    fn rejects_garbage_fen() {
        assert!(validate_fen("not a fen").is_err());
    }
}
