//! Variogram fitting and driving-distribution selection.
//!
//! Responsibilities:
//!
//! - compute the empirical semivariogram of binned backscatter
//! - generate the range grid for the exponential model
//! - evaluate each candidate range (parallel) and keep the best weighted fit
//! - pick the driving distribution by mean KL divergence over trial simulations

pub mod empirical;
pub mod fitter;
pub mod range_grid;
pub mod selection;

pub use empirical::*;
pub use fitter::*;
pub use range_grid::*;
pub use selection::*;
