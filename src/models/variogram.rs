//! Exponential variogram evaluation.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given lag and range (for the weighted solve)
//! - predict `γ(h)` given the fitted parameters (for residuals/plots/covariance)

use crate::domain::ExponentialVariogram;

/// Structural part of the exponential model, `1 − exp(−h/range)`.
pub fn exponential_shape(h: f64, range: f64) -> f64 {
    if h <= 0.0 {
        return 0.0;
    }
    -(-h / range).exp_m1()
}

/// Fill the design row `[1, 1 − exp(−h/range)]` for the columns `(nugget, psill)`.
///
/// # Panics
/// Panics if `out` has fewer than 2 elements.
pub fn fill_design_row(h: f64, range: f64, out: &mut [f64]) {
    out[0] = 1.0;
    out[1] = exponential_shape(h, range);
}

/// Semivariance at lag `h`. `γ(0) = 0` exactly; the nugget is a jump at the origin.
pub fn predict_gamma(model: &ExponentialVariogram, h: f64) -> f64 {
    if h <= 0.0 {
        return 0.0;
    }
    model.nugget + model.psill * exponential_shape(h, model.range)
}

/// Covariance implied by the variogram, `C(h) = sill − γ(h)`.
pub fn covariance(model: &ExponentialVariogram, h: f64) -> f64 {
    model.sill() - predict_gamma(model, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_rises_from_nugget_to_sill() {
        let model = ExponentialVariogram {
            nugget: 1.0,
            psill: 4.0,
            range: 10.0,
        };
        assert_eq!(predict_gamma(&model, 0.0), 0.0);
        assert!((predict_gamma(&model, 1e-9) - 1.0).abs() < 1e-6);
        assert!((predict_gamma(&model, 1e4) - 5.0).abs() < 1e-9);
        // ~95% of the partial sill at the practical range.
        let g = predict_gamma(&model, 30.0);
        assert!((g - (1.0 + 4.0 * (1.0 - (-3.0_f64).exp()))).abs() < 1e-12);
    }

    #[test]
    fn covariance_is_sill_at_origin() {
        let model = ExponentialVariogram {
            nugget: 0.5,
            psill: 2.0,
            range: 5.0,
        };
        assert!((covariance(&model, 0.0) - 2.5).abs() < 1e-12);
        assert!(covariance(&model, 1e6).abs() < 1e-9);
    }
}
