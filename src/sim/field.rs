//! Conditional Gaussian simulation on the survey grid (LU / Cholesky method).
//!
//! With data `z` at locations `d` and grid locations `g`, the field on the grid
//! conditional on the data is Gaussian with
//!
//! ```text
//! mean = μ + K_gd K_dd⁻¹ (z − μ)            (simple kriging, μ = sample mean)
//! cov  = K_gg − K_gd K_dd⁻¹ K_dg
//! ```
//!
//! Both are computed once per class. A realization is then `mean + L·ε`, where
//! `L` is the Cholesky factor of the conditional covariance and `ε ~ N(0, I)`.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::domain::{ExponentialVariogram, GridCell};
use crate::error::AppError;
use crate::math::distance;
use crate::models::covariance;

/// Diagonal jitter (relative to the sill) tried in turn until a factorization succeeds.
const JITTER_STEPS: [f64; 6] = [0.0, 1e-12, 1e-10, 1e-8, 1e-6, 1e-4];

/// Precomputed conditional distribution of the field on the grid.
#[derive(Debug, Clone)]
pub struct ConditionalField {
    /// Conditional (kriged) mean per grid cell.
    pub mean: DVector<f64>,
    /// Lower Cholesky factor of the conditional covariance.
    pub factor: DMatrix<f64>,
}

impl ConditionalField {
    /// Condition the variogram model on `data` (`(x, y, value)`) over `cells`.
    pub fn build(
        model: &ExponentialVariogram,
        data: &[(f64, f64, f64)],
        cells: &[GridCell],
    ) -> Result<Self, AppError> {
        if data.is_empty() {
            return Err(AppError::insufficient("Conditional simulation needs at least one data point."));
        }
        if cells.is_empty() {
            return Err(AppError::insufficient("Conditional simulation needs at least one grid cell."));
        }
        let sill = model.sill();
        if !(sill.is_finite() && sill > 0.0) {
            return Err(AppError::numerical(format!(
                "Variogram sill must be positive for simulation (got {sill})."
            )));
        }

        let n = data.len();
        let m = cells.len();
        let mu = data.iter().map(|d| d.2).sum::<f64>() / n as f64;

        let k_dd = DMatrix::from_fn(n, n, |i, j| {
            covariance(model, distance((data[i].0, data[i].1), (data[j].0, data[j].1)))
        });
        let k_dg = DMatrix::from_fn(n, m, |i, j| {
            covariance(model, distance((data[i].0, data[i].1), (cells[j].x, cells[j].y)))
        });
        let k_gg = DMatrix::from_fn(m, m, |i, j| {
            covariance(model, distance((cells[i].x, cells[i].y), (cells[j].x, cells[j].y)))
        });

        let chol_dd = factorize(&k_dd, sill)
            .ok_or_else(|| AppError::numerical("Data covariance matrix is not positive definite."))?;

        let residual = DVector::from_iterator(n, data.iter().map(|d| d.2 - mu));
        let weights = chol_dd.solve(&residual);
        let mean = k_dg.transpose() * weights + DVector::from_element(m, mu);

        let a = chol_dd.solve(&k_dg);
        let cond = &k_gg - k_dg.transpose() * a;
        let cond = (&cond + cond.transpose()) * 0.5;

        let chol_gg = factorize(&cond, sill)
            .ok_or_else(|| AppError::numerical("Conditional covariance matrix is not positive definite."))?;

        Ok(Self {
            mean,
            factor: chol_gg.l(),
        })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// One unconstrained Gaussian realization on the grid.
    pub fn simulate_gaussian<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let m = self.len();
        let eps = DVector::from_iterator(m, (0..m).map(|_| rng.sample::<f64, _>(StandardNormal)));
        &self.mean + &self.factor * eps
    }
}

fn factorize(matrix: &DMatrix<f64>, scale: f64) -> Option<Cholesky<f64, Dyn>> {
    for &rel in &JITTER_STEPS {
        let mut jittered = matrix.clone();
        if rel > 0.0 {
            for i in 0..jittered.nrows() {
                jittered[(i, i)] += rel * scale;
            }
        }
        if let Some(chol) = Cholesky::new(jittered) {
            if rel > 0.0 {
                log::debug!("Cholesky succeeded with relative jitter {rel:e}");
            }
            return Some(chol);
        }
    }
    None
}
