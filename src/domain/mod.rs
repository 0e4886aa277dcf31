//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - survey tables as read from disk (`AcousticRecord`, `ScalingRecord`, ...)
//! - the aggregated acoustic bins the variograms are fitted to (`AcousticBin`)
//! - error sources and replicate result rows (`ErrorSource`, `ReplicateRow`)
//! - the run configuration (`RunConfig`)

pub mod types;

pub use types::*;
