//! Driving distributions that turn a Gaussian field value into a
//! non-negative NASC draw.
//!
//! A simulated Gaussian value `g` is used as the mean of the draw. `g <= 0`
//! yields exactly zero, which reproduces the zero-inflation of acoustic data.
//! Positive means draw from the selected family with the selected CV.

use rand::Rng;
use rand_distr::{Distribution, Exp, Gamma, LogNormal};

use crate::domain::{DriverDistribution, DriverKind};
use crate::error::AppError;

/// CV grid scanned for the families that have a free dispersion.
pub const CANDIDATE_CVS: [f64; 4] = [0.25, 0.5, 1.0, 2.0];

/// The candidate family scanned by the distribution selection, in tie-break order.
pub fn candidate_drivers() -> Vec<DriverDistribution> {
    let mut out = Vec::new();
    for kind in [DriverKind::Gamma, DriverKind::LogNormal] {
        for cv in CANDIDATE_CVS {
            out.push(DriverDistribution { kind, cv });
        }
    }
    out.push(DriverDistribution {
        kind: DriverKind::Exponential,
        cv: 1.0,
    });
    out
}

/// Validate a driver's parameters once, so sampling can't fail later.
pub fn validate_driver(driver: &DriverDistribution) -> Result<(), AppError> {
    if !(driver.cv.is_finite() && driver.cv > 0.0) {
        return Err(AppError::input(format!(
            "Invalid driving distribution {driver}: cv must be finite and > 0."
        )));
    }
    if driver.kind == DriverKind::Exponential && (driver.cv - 1.0).abs() > 1e-12 {
        return Err(AppError::input("Exponential driving distribution has cv = 1."));
    }
    Ok(())
}

/// Draw one non-negative value with the given mean.
///
/// Degenerate parameters (zero/negative/non-finite mean) give zero.
pub fn sample_driver<R: Rng + ?Sized>(driver: &DriverDistribution, mean: f64, rng: &mut R) -> f64 {
    if !(mean.is_finite() && mean > 0.0) {
        return 0.0;
    }
    let cv = driver.cv;
    let draw = match driver.kind {
        DriverKind::Gamma => {
            let shape = 1.0 / (cv * cv);
            Gamma::new(shape, mean / shape).map(|d| d.sample(rng)).ok()
        }
        DriverKind::LogNormal => {
            let sigma2 = (1.0 + cv * cv).ln();
            let mu = mean.ln() - 0.5 * sigma2;
            LogNormal::new(mu, sigma2.sqrt()).map(|d| d.sample(rng)).ok()
        }
        DriverKind::Exponential => Exp::new(1.0 / mean).map(|d| d.sample(rng)).ok(),
    };
    draw.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0)
}
