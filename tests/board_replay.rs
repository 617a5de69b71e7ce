use cozy_chess::{Color, Piece, Square};
use perftdiff::board::cozy::{replay, validate_fen, ReplayError};
use perftdiff::board::Position;

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[test]
fn apply_moves_from_fen() {
    let pos = Position::with_moves(START, ["e2e4", "e7e5", "g1f3"]);
    let board = replay(&pos).expect("legal move sequence");
    assert_eq!(board.side_to_move(), Color::Black, "expected black to move after 3 plies");
    assert_eq!(board.piece_on(Square::F3), Some(Piece::Knight));
}

#[test]
fn replay_starts_from_given_fen_not_startpos() {
    let fen = "4k3/P7/8/8/8/8/8/4K3 w - - 0 1";
    let board = replay(&Position::with_moves(fen, ["a7a8q"])).unwrap();
    assert_eq!(board.piece_on(Square::A8), Some(Piece::Queen));
}

#[test]
fn garbage_token_is_bad_move() {
    let err = replay(&Position::with_moves(START, ["e2e4", "zz"])).unwrap_err();
    assert!(matches!(err, ReplayError::BadMove { ply: 1, .. }));
}

#[test]
fn fen_validation() {
    assert!(validate_fen(START).is_ok());
    assert!(matches!(validate_fen("8/8/8 w - - 0 1"), Err(ReplayError::Fen { .. })));
}

#[test]
fn four_field_fen_is_accepted() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -";
    assert!(validate_fen(fen).is_ok());
    assert!(validate_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0").is_ok());
    let board = replay(&Position::with_moves(fen, ["e2e4"])).unwrap();
    assert_eq!(board.side_to_move(), Color::Black);
    assert_eq!(board.piece_on(Square::E4), Some(Piece::Pawn));
}
