//! Model evaluation: the exponential variogram and the non-negative driving
//! distributions.
//!
//! Models are implemented as small, pure functions so that fitting/simulation
//! code can stay generic.

pub mod driver;
pub mod variogram;

pub use driver::*;
pub use variogram::*;
