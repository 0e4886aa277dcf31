//! Spatial simulation and bootstrap propagation.
//!
//! - `field`: conditional Gaussian field on the survey grid
//! - `problem`: per-class variogram, field and driving distribution
//! - `biology`: catch composition, age-length and length-weight keys
//! - `bootstrap`: replicate loop over all error sources
//! - `stepwise`: cumulative error decomposition and CV bootstrap

pub mod biology;
pub mod bootstrap;
pub mod field;
pub mod problem;
pub mod stepwise;

pub use bootstrap::{BootstrapOptions, simulate_classes};
pub use field::ConditionalField;
pub use problem::{ClassProblem, ClassVariogram, build_class_problems, fit_class_variogram};
pub use stepwise::{SourceCv, cv_bootstrap, replicate_totals, stepwise_error, stepwise_labels};
