//! Descriptive statistics used by the summaries, the CV bootstrap and the
//! distribution selection.
//!
//! Quantiles use the R-7 linear interpolation rule (the default in R and NumPy).

/// Arithmetic mean. `None` for empty input.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (denominator `n − 1`). `None` for fewer than 2 values.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m) * (x - m)).sum();
    Some((ss / (data.len() as f64 - 1.0)).sqrt())
}

/// Coefficient of variation in percent: `std / mean * 100`.
pub fn cv_percent(std: f64, mean: f64) -> f64 {
    std / mean * 100.0
}

/// R-7 quantile on data that is already sorted ascending.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();
    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some((1.0 - g) * sorted[j] + g * sorted[j + 1])
    }
}

/// Five-number summary (min, q1, median, q3, max) for box plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumber {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

pub fn five_number(data: &[f64]) -> Option<FiveNumber> {
    if data.is_empty() || data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(FiveNumber {
        min: sorted[0],
        q1: quantile_sorted(&sorted, 0.25)?,
        median: quantile_sorted(&sorted, 0.5)?,
        q3: quantile_sorted(&sorted, 0.75)?,
        max: sorted[sorted.len() - 1],
    })
}

/// Ratio between the interquartile range and the standard deviation of a
/// normal distribution.
const IQR_PER_SD: f64 = 1.349;

/// Robust CV (percent): `(IQR / 1.349) / mean * 100`.
///
/// Insensitive to the few extreme replicates a heavy-tailed field produces.
pub fn iqr_cv_percent(data: &[f64]) -> Option<f64> {
    let five = five_number(data)?;
    let m = mean(data)?;
    if m == 0.0 {
        return None;
    }
    Some((five.q3 - five.q1) / IQR_PER_SD / m * 100.0)
}

/// Histogram over `[lo, hi]` with `nbins` equal-width bins.
///
/// Values above `hi` land in the last bin, values below `lo` in the first.
/// Returns normalized frequencies (summing to 1), or `None` for empty input.
pub fn histogram(data: &[f64], lo: f64, hi: f64, nbins: usize) -> Option<Vec<f64>> {
    if data.is_empty() || nbins == 0 || !(hi > lo) {
        return None;
    }
    let width = (hi - lo) / nbins as f64;
    let mut counts = vec![0.0; nbins];
    for &v in data {
        if !v.is_finite() {
            continue;
        }
        let idx = (((v - lo) / width).floor().max(0.0) as usize).min(nbins - 1);
        counts[idx] += 1.0;
    }
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(counts.into_iter().map(|c| c / total).collect())
}

/// Smoothing mass added to every histogram bin before taking logs.
const KL_EPS: f64 = 1e-10;

/// Kullback-Leibler divergence `KL(p ‖ q)` between two discrete distributions
/// on the same bins.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| {
            let pi = pi + KL_EPS;
            let qi = qi + KL_EPS;
            pi * (pi / qi).ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_dev_matches_sample_formula() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&v).unwrap() - 4.571428571428571_f64.sqrt()).abs() < 1e-12);
        assert!(std_dev(&[1.0]).is_none());
    }

    #[test]
    fn five_number_uses_r7_quartiles() {
        let f = five_number(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!((f.min, f.q1, f.median, f.q3, f.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!(quantile_sorted(&[1.0, 2.0], 0.5), Some(1.5));
        assert!(five_number(&[1.0, f64::NAN]).is_none());
    }

    #[test]
    fn iqr_cv_of_normal_like_sample_is_close_to_classic_cv() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;
        use rand_distr::{Distribution, Normal};

        let mut rng = StdRng::seed_from_u64(7);
        let normal = Normal::new(100.0, 10.0).unwrap();
        let data: Vec<f64> = (0..20_000).map(|_| normal.sample(&mut rng)).collect();
        let cv = iqr_cv_percent(&data).unwrap();
        assert!((cv - 10.0).abs() < 0.5, "cv={cv}");
    }

    #[test]
    fn histogram_clamps_out_of_range_values() {
        let h = histogram(&[-1.0, 0.5, 1.5, 99.0], 0.0, 2.0, 2).unwrap();
        assert_eq!(h, vec![0.5, 0.5]);
    }

    #[test]
    fn kl_divergence_is_zero_for_identical_and_positive_otherwise() {
        let p = [0.2, 0.3, 0.5];
        assert!(kl_divergence(&p, &p).abs() < 1e-12);
        assert!(kl_divergence(&p, &[0.5, 0.3, 0.2]) > 0.0);
    }
}
