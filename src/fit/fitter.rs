//! Exponential variogram fitting.
//!
//! Given:
//! - empirical lags `h_k` and semivariances `γ_k`
//! - inverse-lag weights `w_k`
//! - a list of candidate ranges
//!
//! we solve, for each range:
//! - a weighted least-squares problem for `(nugget, psill)`
//! - the resulting weighted SSE
//!
//! and return the best (lowest SSE) candidate whose nugget and partial sill are
//! both non-negative. When the free solve goes negative, the two boundary fits
//! (`nugget = 0` and pure nugget) are tried at the same range instead.

use rayon::prelude::*;

use crate::domain::{ExponentialVariogram, VariogramPoint};
use crate::error::AppError;
use crate::fit::empirical::lag_weight;
use crate::math::solve_weighted;
use crate::models::{fill_design_row, predict_gamma};

/// Tolerance below zero accepted (and clamped) for fitted nugget/psill.
const NEG_TOL: f64 = 1e-9;

/// Best exponential fit to one empirical variogram.
#[derive(Debug, Clone)]
pub struct VariogramFit {
    pub model: ExponentialVariogram,
    /// Weighted sum of squared residuals.
    pub wsse: f64,
    pub n_lags: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    model: ExponentialVariogram,
    wsse: f64,
}

/// Fit the exponential model over a range grid.
pub fn fit_exponential(points: &[VariogramPoint], ranges: &[f64]) -> Result<VariogramFit, AppError> {
    if ranges.is_empty() {
        return Err(AppError::numerical("Range grid is empty."));
    }

    let (lags, gammas, weights): (Vec<f64>, Vec<f64>, Vec<f64>) = {
        let mut lags = Vec::new();
        let mut gammas = Vec::new();
        let mut weights = Vec::new();
        for p in points {
            if let Some(w) = lag_weight(p) {
                if p.gamma.is_finite() {
                    lags.push(p.lag);
                    gammas.push(p.gamma);
                    weights.push(w);
                }
            }
        }
        (lags, gammas, weights)
    };

    if lags.is_empty() {
        return Err(AppError::insufficient(
            "No usable lag bins (all pairs at zero distance) for the variogram fit.",
        ));
    }

    // Evaluate each range independently (parallel).
    let candidates: Vec<Candidate> = ranges
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &range)| {
            evaluate_range(range, &lags, &gammas, &weights).map(|(model, wsse)| Candidate { idx, model, wsse })
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::numerical("No valid exponential variogram candidates."));
    }

    // Deterministic selection: pick the minimum SSE; break ties by original grid index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.wsse < best.wsse || (c.wsse == best.wsse && c.idx < best.idx) {
            best = c;
        }
    }

    Ok(VariogramFit {
        model: best.model,
        wsse: best.wsse,
        n_lags: lags.len(),
    })
}

fn evaluate_range(range: f64, lags: &[f64], gammas: &[f64], weights: &[f64]) -> Option<(ExponentialVariogram, f64)> {
    if !(range.is_finite() && range > 0.0) {
        return None;
    }

    let rows: Vec<Vec<f64>> = lags
        .iter()
        .map(|&h| {
            let mut row = vec![0.0; 2];
            fill_design_row(h, range, &mut row);
            row
        })
        .collect();

    let mut feasible = Vec::with_capacity(3);

    // Free (nugget, psill).
    if lags.len() >= 2 {
        if let Some(beta) = solve_weighted(&rows, gammas, weights) {
            if beta[0] >= -NEG_TOL && beta[1] >= -NEG_TOL {
                feasible.push(ExponentialVariogram {
                    nugget: beta[0].max(0.0),
                    psill: beta[1].max(0.0),
                    range,
                });
            }
        }
    }

    // Boundary: nugget = 0.
    let shape_rows: Vec<Vec<f64>> = rows.iter().map(|r| vec![r[1]]).collect();
    if let Some(beta) = solve_weighted(&shape_rows, gammas, weights) {
        if beta[0] >= -NEG_TOL {
            feasible.push(ExponentialVariogram {
                nugget: 0.0,
                psill: beta[0].max(0.0),
                range,
            });
        }
    }

    // Boundary: pure nugget (weighted mean of γ).
    let w_sum: f64 = weights.iter().sum();
    let nugget = gammas.iter().zip(weights).map(|(g, w)| g * w).sum::<f64>() / w_sum;
    if nugget.is_finite() && nugget >= 0.0 {
        feasible.push(ExponentialVariogram {
            nugget,
            psill: 0.0,
            range,
        });
    }

    feasible
        .into_iter()
        .map(|model| (model, weighted_sse(&model, lags, gammas, weights)))
        .filter(|(_, wsse)| wsse.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn weighted_sse(model: &ExponentialVariogram, lags: &[f64], gammas: &[f64], weights: &[f64]) -> f64 {
    lags.iter()
        .zip(gammas)
        .zip(weights)
        .map(|((&h, &g), &w)| {
            let r = g - predict_gamma(model, h);
            w * r * r
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(model: &ExponentialVariogram) -> Vec<VariogramPoint> {
        (1..=12)
            .map(|k| {
                let h = k as f64 * 10.0;
                VariogramPoint {
                    lag: h,
                    gamma: predict_gamma(model, h),
                    npairs: 50,
                }
            })
            .collect()
    }

    #[test]
    fn fit_recovers_exact_model_when_range_is_on_grid() {
        let truth = ExponentialVariogram {
            nugget: 2.0,
            psill: 8.0,
            range: 25.0,
        };
        let ranges = vec![5.0, 10.0, 25.0, 50.0, 100.0];
        let fit = fit_exponential(&synthetic(&truth), &ranges).unwrap();

        assert!((fit.model.range - 25.0).abs() < 1e-12);
        assert!((fit.model.nugget - 2.0).abs() < 1e-8);
        assert!((fit.model.psill - 8.0).abs() < 1e-8);
        assert!(fit.wsse < 1e-12);
    }

    #[test]
    fn fit_never_returns_negative_components() {
        // Decreasing semivariance would need a negative partial sill.
        let points: Vec<VariogramPoint> = (1..=8)
            .map(|k| VariogramPoint {
                lag: k as f64 * 10.0,
                gamma: 10.0 - k as f64,
                npairs: 10,
            })
            .collect();
        let ranges = vec![5.0, 20.0, 80.0];
        let fit = fit_exponential(&points, &ranges).unwrap();
        assert!(fit.model.nugget >= 0.0);
        assert!(fit.model.psill >= 0.0);
    }

    #[test]
    fn empty_range_grid_is_an_error() {
        let truth = ExponentialVariogram {
            nugget: 1.0,
            psill: 1.0,
            range: 10.0,
        };
        let err = fit_exponential(&synthetic(&truth), &[]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
