// Perft divergence finder: drives a reference and a candidate engine and
// narrows down where their perft counts diverge.
pub mod board;
pub mod engine;
pub mod perft;
pub mod report;
pub mod search;
