//! Input/output helpers.
//!
//! - raw file projection and gridding (`preprocess`)
//! - strict CSV ingest of the survey tables (`ingest`)
//! - result and class-problem exports (`export`)

pub mod export;
pub mod ingest;
pub mod preprocess;

pub use export::*;
pub use ingest::*;
pub use preprocess::*;
