pub mod coordinate;
pub mod state;

pub use coordinate::{CoordinateMapper, MapperMetrics};
pub use state::MapperState;
