//! Mathematical utilities: least squares, descriptive statistics and planar geometry.

pub mod geo;
pub mod ols;
pub mod stats;

pub use geo::*;
pub use ols::*;
pub use stats::*;
