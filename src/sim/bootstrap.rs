//! Bootstrap propagation of survey error into abundance and biomass at age.
//!
//! One replicate, for every class problem:
//!
//! 1. simulate NASC on the grid (or take the kriged mean)
//! 2. scale by a calibration offset `10^(ε/10)`, `ε ~ N(0, cal_sd_db)`
//! 3. assign every cell to a haul (distance-weighted draw, or the nearest haul)
//! 4. resample each haul's length-frequency rows, perturb `sigma_bs` by a
//!    target-strength offset
//! 5. convert to numbers (`NASC · area / 4π σ̄_bs`), split by length, then by
//!    age through the (resampled) age-length key, and weigh through the
//!    (refitted) length-weight relationship
//!
//! Replicates are independent. Each gets its own `StdRng` seeded from the
//! parent generator in replicate order, so the output does not depend on how
//! rayon schedules them.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::Normal;
use rayon::prelude::*;

use crate::domain::{
    ErrorSet, ErrorSource, NON_TARGET_AGE, ReplicateRow, RunConfig, ScalingRecord, SurveyData,
};
use crate::error::AppError;
use crate::math::distance;
use crate::sim::biology::{AgeLengthKey, HaulComposition, LengthWeight, resample};
use crate::sim::problem::ClassProblem;

/// Settings of one bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub errors: ErrorSet,
    /// Written to every result row's `error_source` column.
    pub label: String,
    pub cal_sd_db: f64,
    pub ts_sd_db: f64,
    pub assignment_scale: f64,
    pub km2nmi: f64,
}

impl BootstrapOptions {
    pub fn from_config(config: &RunConfig, errors: ErrorSet, label: impl Into<String>) -> Self {
        Self {
            errors,
            label: label.into(),
            cal_sd_db: config.cal_sd_db,
            ts_sd_db: config.ts_sd_db,
            assignment_scale: config.assignment_scale,
            km2nmi: config.km2nmi,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        for (name, v) in [("cal_sd_db", self.cal_sd_db), ("ts_sd_db", self.ts_sd_db)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(AppError::input(format!("{name} must be finite and >= 0 (got {v}).")));
            }
        }
        if !(self.assignment_scale.is_finite() && self.assignment_scale > 0.0) {
            return Err(AppError::input("assignment_scale must be finite and > 0."));
        }
        if !(self.km2nmi.is_finite() && self.km2nmi > 0.0) {
            return Err(AppError::input("km2nmi must be finite and > 0."));
        }
        Ok(())
    }
}

/// A haul usable for scaling one class.
#[derive(Debug, Clone)]
struct ClassHaul {
    rows: Vec<ScalingRecord>,
    composition: HaulComposition,
}

/// Per-class data precomputed once for all replicates.
struct ClassContext<'a> {
    problem: &'a ClassProblem,
    hauls: Vec<ClassHaul>,
    nearest: Vec<usize>,
    kernels: Vec<Option<WeightedIndex<f64>>>,
}

impl<'a> ClassContext<'a> {
    fn build(problem: &'a ClassProblem, survey: &SurveyData, scale: f64) -> Result<Self, AppError> {
        let mut by_haul: BTreeMap<u32, Vec<ScalingRecord>> = BTreeMap::new();
        for r in survey.scaling.iter().filter(|r| r.class == problem.class) {
            by_haul.entry(r.haul).or_default().push(r.clone());
        }

        let mut hauls = Vec::new();
        let mut positions = Vec::new();
        for (haul, rows) in by_haul {
            let Some(loc) = survey.trawl_locations.iter().find(|t| t.haul == haul) else {
                log::warn!("{}: haul {haul} has catch data but no trawl location; skipped", problem.class);
                continue;
            };
            let composition = HaulComposition::from_rows(haul, &rows)?;
            positions.push((loc.x, loc.y));
            hauls.push(ClassHaul { rows, composition });
        }
        if hauls.is_empty() {
            return Err(AppError::numerical(format!(
                "No located haul has catch data for scaling class {}.",
                problem.class
            )));
        }

        let mut nearest = Vec::with_capacity(problem.field.len());
        let mut kernels = Vec::with_capacity(problem.field.len());
        for cell in &survey.domain.cells {
            let d: Vec<f64> = positions.iter().map(|&p| distance((cell.x, cell.y), p)).collect();
            let (imin, dmin) = d
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (i, v)| if v < acc.1 { (i, v) } else { acc });
            nearest.push(imin);
            let weights = d.iter().map(|&v| (-(v - dmin) / scale).exp());
            kernels.push(WeightedIndex::new(weights).ok());
        }

        Ok(Self {
            problem,
            hauls,
            nearest,
            kernels,
        })
    }
}

/// Biological keys shared by all replicates when their error source is off.
struct BaseKeys {
    alk: AgeLengthKey,
    lw: LengthWeight,
    ages: Vec<u32>,
}

/// Run `nreplicates` bootstrap replicates over all class problems.
///
/// Returns one row per (replicate, target age), ordered by replicate then age.
/// Ages are every non-zero age in the full age-length key, so each replicate
/// contributes the same number of rows.
pub fn simulate_classes(
    problems: &[ClassProblem],
    survey: &SurveyData,
    options: &BootstrapOptions,
    nreplicates: usize,
    rng: &mut StdRng,
) -> Result<Vec<ReplicateRow>, AppError> {
    if nreplicates == 0 {
        return Err(AppError::input("Number of replicates must be >= 1."));
    }
    if problems.is_empty() {
        return Err(AppError::insufficient("No class problems to simulate."));
    }
    options.validate()?;

    for p in problems {
        if p.field.len() != survey.domain.cells.len() {
            return Err(AppError::numerical(format!(
                "{}: simulation grid does not match the survey domain.",
                p.class
            )));
        }
    }

    let contexts = problems
        .iter()
        .map(|p| ClassContext::build(p, survey, options.assignment_scale))
        .collect::<Result<Vec<_>, _>>()?;

    let alk = AgeLengthKey::from_specimens(&survey.age_length)?;
    let ages: Vec<u32> = alk.ages().into_iter().filter(|&a| a != NON_TARGET_AGE).collect();
    if ages.is_empty() {
        return Err(AppError::insufficient("Age-length key has no target ages."));
    }
    let base = BaseKeys {
        alk,
        lw: LengthWeight::fit(&survey.length_weight)?,
        ages,
    };

    let area_nmi2 = survey.domain.cell_area_km2() * options.km2nmi * options.km2nmi;
    let seeds: Vec<u64> = (0..nreplicates).map(|_| rng.next_u64()).collect();

    let per_replicate = seeds
        .par_iter()
        .enumerate()
        .map(|(replicate, &seed)| {
            let mut rep_rng = StdRng::seed_from_u64(seed);
            run_replicate(&contexts, survey, &base, options, area_nmi2, replicate, &mut rep_rng)
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(per_replicate.into_iter().flatten().collect())
}

fn run_replicate(
    contexts: &[ClassContext<'_>],
    survey: &SurveyData,
    base: &BaseKeys,
    options: &BootstrapOptions,
    area_nmi2: f64,
    replicate: usize,
    rng: &mut StdRng,
) -> Result<Vec<ReplicateRow>, AppError> {
    let errors = &options.errors;

    let resampled_alk;
    let alk = if errors.contains(ErrorSource::AgeLength) {
        resampled_alk = AgeLengthKey::from_specimens(&resample(&survey.age_length, rng))?;
        &resampled_alk
    } else {
        &base.alk
    };
    let lw = if errors.contains(ErrorSource::LengthWeight) {
        LengthWeight::fit(&resample(&survey.length_weight, rng))?
    } else {
        base.lw
    };

    let mut abundance: BTreeMap<u32, f64> = BTreeMap::new();
    let mut biomass: BTreeMap<u32, f64> = BTreeMap::new();

    for ctx in contexts {
        let cal = if errors.contains(ErrorSource::Calibration) {
            db_factor(options.cal_sd_db, rng)?
        } else {
            1.0
        };
        let ts = if errors.contains(ErrorSource::TargetStrength) {
            db_factor(options.ts_sd_db, rng)?
        } else {
            1.0
        };

        let nasc = ctx.problem.simulate(errors.contains(ErrorSource::Spatial), rng);

        let mut haul_nasc = vec![0.0; ctx.hauls.len()];
        let random_assignment = errors.contains(ErrorSource::TrawlAssignment);
        for (i, &value) in nasc.iter().enumerate() {
            let h = match (&ctx.kernels[i], random_assignment) {
                (Some(kernel), true) => kernel.sample(rng),
                _ => ctx.nearest[i],
            };
            haul_nasc[h] += value * cal;
        }

        for (haul, &sum_nasc) in ctx.hauls.iter().zip(&haul_nasc) {
            if sum_nasc <= 0.0 {
                continue;
            }
            let resampled;
            let composition = if errors.contains(ErrorSource::CatchResampling) {
                resampled = HaulComposition::from_rows(haul.composition.haul, &resample(&haul.rows, rng))?;
                &resampled
            } else {
                &haul.composition
            };

            let numbers = sum_nasc * area_nmi2 / (4.0 * PI * composition.mean_sigma_bs * ts);
            for &(length, p_len) in &composition.lengths {
                let n_len = numbers * p_len;
                let w = lw.weight(length);
                for &(age, p_age) in alk.proportions(length) {
                    *abundance.entry(age).or_default() += n_len * p_age;
                    *biomass.entry(age).or_default() += n_len * p_age * w;
                }
            }
        }
    }

    Ok(base
        .ages
        .iter()
        .map(|&age| ReplicateRow {
            age,
            abundance: abundance.get(&age).copied().unwrap_or(0.0),
            biomass: biomass.get(&age).copied().unwrap_or(0.0),
            replicate,
            error_source: options.label.clone(),
        })
        .collect())
}

/// Multiplicative factor for a dB-scale error: `10^(ε/10)`, `ε ~ N(0, sd_db)`.
fn db_factor<R: Rng + ?Sized>(sd_db: f64, rng: &mut R) -> Result<f64, AppError> {
    if sd_db == 0.0 {
        return Ok(1.0);
    }
    let normal = Normal::new(0.0, sd_db)
        .map_err(|e| AppError::input(format!("Invalid dB error standard deviation {sd_db}: {e}")))?;
    Ok(10f64.powf(normal.sample(rng) / 10.0))
}
