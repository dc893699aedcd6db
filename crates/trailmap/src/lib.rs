//! Trailmap — core trail model: decode page geometry and waypoints, join them
//! by coordinate, and style the result for publishing.

pub mod markers;
pub mod merge;
pub mod types;

pub use markers::{marker_symbol, DEFAULT_MARKER, START_MARKER_COLOR};
pub use merge::{merge, pictogram_names};
pub use types::*;
