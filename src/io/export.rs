//! Export replicate results and class problems.
//!
//! - results: one CSV row per (replicate, age), ready for spreadsheets or R
//! - problems: JSON with each class's variogram and driving distribution

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::{DriverDistribution, ExponentialVariogram, ReplicateRow, VariogramPoint};
use crate::error::AppError;
use crate::io::ingest::write_csv;
use crate::sim::ClassProblem;

/// Write the replicate results table.
pub fn write_results_csv(path: &Path, rows: &[ReplicateRow]) -> Result<(), AppError> {
    write_csv(path, rows)
}

#[derive(Debug, Clone, Serialize)]
struct ScoreExport {
    driver: DriverDistribution,
    mean_kl: f64,
}

#[derive(Debug, Clone, Serialize)]
struct ProblemExport<'a> {
    class: &'a str,
    n_bins: usize,
    empirical: &'a [VariogramPoint],
    variogram: ExponentialVariogram,
    wsse: f64,
    driver: DriverDistribution,
    driver_scores: Vec<ScoreExport>,
}

#[derive(Debug, Clone, Serialize)]
struct ProblemsFile<'a> {
    tool: &'static str,
    generated: String,
    problems: Vec<ProblemExport<'a>>,
}

/// Write the class problems (fit and selection results, not the field).
pub fn write_problems_json(path: &Path, problems: &[ClassProblem]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create problems JSON '{}': {e}", path.display())))?;

    let doc = ProblemsFile {
        tool: "atboot",
        generated: chrono::Local::now().to_rfc3339(),
        problems: problems
            .iter()
            .map(|p| ProblemExport {
                class: &p.class,
                n_bins: p.bins.len(),
                empirical: &p.empirical,
                variogram: p.fit.model,
                wsse: p.fit.wsse,
                driver: p.driver,
                driver_scores: p
                    .driver_scores
                    .iter()
                    .map(|s| ScoreExport {
                        driver: s.driver,
                        mean_kl: s.mean_kl,
                    })
                    .collect(),
            })
            .collect(),
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::input(format!("Failed to write problems JSON: {e}")))?;
    Ok(())
}
