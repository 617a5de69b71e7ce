use perftdiff::perft::{classify, PerftLine};

fn squares() -> impl Iterator<Item = String> {
    ('a'..='h').flat_map(|f| ('1'..='8').map(move |r| format!("{f}{r}")))
}

#[test]
fn every_coordinate_move_is_a_move_count() {
    for from in squares() {
        for to in squares().filter(|to| *to != from).step_by(7) {
            let mv = format!("{from}{to}");
            for n in [0u64, 1, 197_281] {
                assert_eq!(classify(&format!("{mv}: {n}")), Ok(PerftLine::MoveCount(mv.clone(), n)));
            }
        }
    }
}

#[test]
fn promotions_are_move_counts() {
    for piece in ['q', 'r', 'b', 'n'] {
        let mv = format!("a7a8{piece}");
        assert_eq!(classify(&format!("{mv}: 4")), Ok(PerftLine::MoveCount(mv, 4)));
    }
}

#[test]
fn terminal_line_variants() {
    assert_eq!(classify("Nodes searched: 0"), Ok(PerftLine::TerminalCount(0)));
    assert_eq!(classify("Nodes searched:119060324\r"), Ok(PerftLine::TerminalCount(119_060_324)));
    assert_eq!(classify("nodes searched: 20"), Ok(PerftLine::Unrecognized));
}

#[test]
fn engine_chatter_is_ignored() {
    for line in [
        "info depth 1 seldepth 1 multipv 1 score cp 20 nodes 20 nps 20000 time 1 pv e2e4",
        "bestmove e2e4",
        "readyok",
        "Fen: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "Key: 8F8F01D4562F59FB",
        "z9z9: 4",
        "e2e4 20",
    ] {
        assert_eq!(classify(line), Ok(PerftLine::Unrecognized), "line {line:?}");
    }
}
