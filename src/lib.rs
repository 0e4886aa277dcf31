//! `at-bootstrap` library crate.
//!
//! Total-uncertainty bootstrap for acoustic-trawl fish surveys: conditional
//! geostatistical simulation of backscatter, trawl-based scaling to numbers and
//! weight at age, and a stepwise decomposition of the error sources.
//!
//! The binary (`atboot`) is a thin wrapper around this library so the pipeline
//! is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod sim;
