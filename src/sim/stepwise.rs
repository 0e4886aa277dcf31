//! Stepwise error decomposition.
//!
//! The bootstrap is re-run with error sources switched on cumulatively in
//! [`ErrorSource::ALL`] order, after a baseline with none of them. The spread
//! of replicate totals per step is then summarized with a bootstrap of a robust
//! (IQR-based) CV estimator.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{ErrorSet, ErrorSource, LABEL_NONE, ReplicateRow, RunConfig, SurveyData};
use crate::error::AppError;
use crate::math::iqr_cv_percent;
use crate::sim::bootstrap::{BootstrapOptions, simulate_classes};
use crate::sim::problem::ClassProblem;

/// Labels of the stepwise runs, in run order.
pub fn stepwise_labels() -> Vec<&'static str> {
    std::iter::once(LABEL_NONE)
        .chain(ErrorSource::ALL.iter().map(|s| s.label()))
        .collect()
}

/// Run the cumulative decomposition.
///
/// Rows from every step are concatenated; `error_source` holds the source
/// added at that step (`"none"` for the baseline).
pub fn stepwise_error(
    problems: &[ClassProblem],
    survey: &SurveyData,
    config: &RunConfig,
    nreplicates: usize,
    rng: &mut StdRng,
) -> Result<Vec<ReplicateRow>, AppError> {
    let mut errors = ErrorSet::none();
    let mut rows = simulate_classes(
        problems,
        survey,
        &BootstrapOptions::from_config(config, errors, LABEL_NONE),
        nreplicates,
        rng,
    )?;
    log::info!("Stepwise: baseline done");

    for source in ErrorSource::ALL {
        errors = errors.with(source);
        let options = BootstrapOptions::from_config(config, errors, source.label());
        rows.extend(simulate_classes(problems, survey, &options, nreplicates, rng)?);
        log::info!("Stepwise: added {}", source.label());
    }
    Ok(rows)
}

/// Per-replicate totals over all ages: `(abundance, biomass)`, ordered by
/// replicate index.
pub fn replicate_totals(rows: &[ReplicateRow], label: &str) -> (Vec<f64>, Vec<f64>) {
    let mut totals: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.error_source == label) {
        let e = totals.entry(r.replicate).or_default();
        e.0 += r.abundance;
        e.1 += r.biomass;
    }
    totals.into_values().unzip()
}

/// Bootstrap distribution of the IQR CV for one stepwise label.
#[derive(Debug, Clone)]
pub struct SourceCv {
    pub label: String,
    pub abundance_cv: Vec<f64>,
    pub biomass_cv: Vec<f64>,
}

/// Resample the replicate totals of each label `nboot` times and score every
/// resample with the IQR CV estimator.
///
/// Labels keep their first-appearance order. A resample whose mean is zero
/// scores `NaN`.
pub fn cv_bootstrap(rows: &[ReplicateRow], nboot: usize, rng: &mut StdRng) -> Result<Vec<SourceCv>, AppError> {
    if nboot == 0 {
        return Err(AppError::input("Number of CV bootstrap resamples must be >= 1."));
    }
    let mut labels: Vec<&str> = Vec::new();
    for r in rows {
        if !labels.contains(&r.error_source.as_str()) {
            labels.push(&r.error_source);
        }
    }

    let mut out = Vec::with_capacity(labels.len());
    for label in labels {
        let (abundance, biomass) = replicate_totals(rows, label);
        let n = abundance.len();
        let picks: Vec<Vec<usize>> = (0..nboot)
            .map(|_| (0..n).map(|_| rng.gen_range(0..n)).collect())
            .collect();
        let score = |totals: &[f64]| -> Vec<f64> {
            picks
                .par_iter()
                .map(|idx| {
                    let sample: Vec<f64> = idx.iter().map(|&i| totals[i]).collect();
                    iqr_cv_percent(&sample).unwrap_or(f64::NAN)
                })
                .collect()
        };
        out.push(SourceCv {
            label: label.to_string(),
            abundance_cv: score(&abundance),
            biomass_cv: score(&biomass),
        });
    }
    Ok(out)
}
