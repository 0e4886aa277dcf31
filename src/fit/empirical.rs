//! Empirical semivariogram.
//!
//! `γ(h_k) = Σ (z_i − z_j)² / (2 N_k)` over all pairs whose separation falls in
//! lag bin `k`. Bins are equal-width on `[0, maxlag]`; pairs beyond `maxlag`
//! are ignored and empty bins are dropped.

use crate::domain::{AcousticBin, VariogramPoint};
use crate::error::AppError;
use crate::math::distance;

/// Empirical semivariogram of the binned NASC values.
pub fn empirical_variogram(
    bins: &[AcousticBin],
    nlags: usize,
    maxlag: f64,
) -> Result<Vec<VariogramPoint>, AppError> {
    if nlags == 0 {
        return Err(AppError::input("Variogram lag count must be >= 1."));
    }
    if !(maxlag.is_finite() && maxlag > 0.0) {
        return Err(AppError::input(format!("Invalid maximum lag: {maxlag}.")));
    }

    let width = maxlag / nlags as f64;
    let mut sum_sq = vec![0.0; nlags];
    let mut sum_h = vec![0.0; nlags];
    let mut counts = vec![0usize; nlags];

    for i in 0..bins.len() {
        for j in (i + 1)..bins.len() {
            let h = distance((bins[i].x, bins[i].y), (bins[j].x, bins[j].y));
            if h > maxlag {
                continue;
            }
            let k = ((h / width).floor() as usize).min(nlags - 1);
            let dz = bins[i].nasc - bins[j].nasc;
            sum_sq[k] += dz * dz;
            sum_h[k] += h;
            counts[k] += 1;
        }
    }

    let points: Vec<VariogramPoint> = (0..nlags)
        .filter(|&k| counts[k] > 0)
        .map(|k| VariogramPoint {
            lag: sum_h[k] / counts[k] as f64,
            gamma: sum_sq[k] / (2.0 * counts[k] as f64),
            npairs: counts[k],
        })
        .collect();

    if points.is_empty() {
        return Err(AppError::insufficient(format!(
            "No sample pairs within {maxlag} km; cannot compute a variogram."
        )));
    }

    Ok(points)
}

/// Fit weight for one lag bin: inverse lag distance, so short-range
/// structure dominates the fit.
pub fn lag_weight(point: &VariogramPoint) -> Option<f64> {
    if point.lag > 0.0 && point.lag.is_finite() {
        Some(1.0 / point.lag)
    } else {
        None
    }
}
