//! Range grid generation.
//!
//! The exponential variogram is fitted using a deterministic grid search over
//! its range parameter. For a fixed range the model is linear in
//! `(nugget, psill)`, so each grid point is one small weighted solve.

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::input(format!(
            "Invalid range bounds: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::input("Range steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// Candidate ranges for a variogram with `nlags` bins up to `maxlag`.
///
/// Spans from a tenth of one lag bin (almost pure nugget) to twice the maximum
/// lag (almost linear over the fitted window).
pub fn range_grid(maxlag: f64, nlags: usize, steps: usize) -> Result<Vec<f64>, AppError> {
    if nlags == 0 {
        return Err(AppError::input("Variogram lag count must be >= 1."));
    }
    let lag_width = maxlag / nlags as f64;
    log_space(lag_width / 10.0, maxlag * 2.0, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn range_grid_is_increasing_and_bounded() {
        let grid = range_grid(200.0, 10, 30).unwrap();
        assert_eq!(grid.len(), 30);
        assert!((grid[0] - 2.0).abs() < 1e-12);
        assert!((grid[29] - 400.0).abs() < 1e-9);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn invalid_bounds_are_input_errors() {
        assert_eq!(log_space(0.0, 1.0, 5).unwrap_err().exit_code(), 2);
        assert_eq!(range_grid(200.0, 0, 5).unwrap_err().exit_code(), 2);
    }
}
