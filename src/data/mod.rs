//! In-memory survey data preparation.

pub mod aggregate;

pub use aggregate::*;
