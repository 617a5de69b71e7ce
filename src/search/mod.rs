pub mod divergence;

pub use divergence::{compare, Comparison, DepthStep, DivergenceSearch, MoveDiff, Outcome, SearchConfig, SearchError, SearchReport};
