pub mod cozy;
pub mod position;

pub use position::Position;
