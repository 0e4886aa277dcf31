//! Biological keys: catch composition per haul, the age-length key and the
//! length-weight relationship, plus the resampling used by the bootstrap.

use std::collections::BTreeMap;

use rand::Rng;

use crate::domain::{AgeLengthRecord, LengthWeightRecord, ScalingRecord};
use crate::error::AppError;
use crate::math::solve_weighted;

/// Bootstrap resample (with replacement) of `rows`.
pub fn resample<T: Clone, R: Rng + ?Sized>(rows: &[T], rng: &mut R) -> Vec<T> {
    if rows.is_empty() {
        return Vec::new();
    }
    (0..rows.len()).map(|_| rows[rng.gen_range(0..rows.len())].clone()).collect()
}

/// Length-bin key for a length in cm (nearest whole centimetre).
pub fn length_bin(length: f64) -> i64 {
    length.round() as i64
}

/// Length composition and mean backscattering cross-section of one haul.
#[derive(Debug, Clone)]
pub struct HaulComposition {
    pub haul: u32,
    /// `(length cm, proportion)`; proportions sum to 1.
    pub lengths: Vec<(f64, f64)>,
    /// Expansion-weighted mean `sigma_bs` (m²).
    pub mean_sigma_bs: f64,
}

impl HaulComposition {
    /// Summarize the scaling rows of one haul.
    pub fn from_rows(haul: u32, rows: &[ScalingRecord]) -> Result<Self, AppError> {
        let mut by_length: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
        let mut total = 0.0;
        let mut sigma = 0.0;
        for r in rows {
            let e = by_length.entry(length_bin(r.length)).or_insert((0.0, 0.0));
            e.0 += r.expansion;
            e.1 += r.expansion * r.length;
            total += r.expansion;
            sigma += r.expansion * r.sigma_bs;
        }
        if !(total > 0.0) {
            return Err(AppError::insufficient(format!(
                "Haul {haul} has no positive catch expansion."
            )));
        }
        let mean_sigma_bs = sigma / total;
        if !(mean_sigma_bs.is_finite() && mean_sigma_bs > 0.0) {
            return Err(AppError::numerical(format!(
                "Haul {haul} has a non-positive mean sigma_bs."
            )));
        }
        let lengths = by_length
            .values()
            .filter(|(w, _)| *w > 0.0)
            .map(|&(w, wl)| (wl / w, w / total))
            .collect();
        Ok(Self {
            haul,
            lengths,
            mean_sigma_bs,
        })
    }
}

/// Age proportions by whole-centimetre length bin.
#[derive(Debug, Clone)]
pub struct AgeLengthKey {
    bins: BTreeMap<i64, Vec<(u32, f64)>>,
}

impl AgeLengthKey {
    pub fn from_specimens(specimens: &[AgeLengthRecord]) -> Result<Self, AppError> {
        let mut counts: BTreeMap<i64, BTreeMap<u32, f64>> = BTreeMap::new();
        for s in specimens {
            *counts.entry(length_bin(s.length)).or_default().entry(s.age).or_default() += 1.0;
        }
        if counts.is_empty() {
            return Err(AppError::insufficient("Age-length key has no specimens."));
        }
        let bins = counts
            .into_iter()
            .map(|(len, ages)| {
                let n: f64 = ages.values().sum();
                (len, ages.into_iter().map(|(a, c)| (a, c / n)).collect())
            })
            .collect();
        Ok(Self { bins })
    }

    /// Age proportions at `length`; unkeyed lengths borrow the nearest keyed
    /// bin (the shorter one on a tie).
    pub fn proportions(&self, length: f64) -> &[(u32, f64)] {
        let key = length_bin(length);
        if let Some(p) = self.bins.get(&key) {
            return p;
        }
        let below = self.bins.range(..key).next_back();
        let above = self.bins.range(key..).next();
        let nearest = match (below, above) {
            (Some((lb, pb)), Some((la, pa))) => {
                if key - lb <= la - key {
                    pb
                } else {
                    pa
                }
            }
            (Some((_, p)), None) | (None, Some((_, p))) => p,
            (None, None) => return &[],
        };
        nearest
    }

    /// Every age present in the key, ascending.
    pub fn ages(&self) -> Vec<u32> {
        let mut ages: Vec<u32> = self.bins.values().flatten().map(|&(a, _)| a).collect();
        ages.sort_unstable();
        ages.dedup();
        ages
    }
}

/// Length-weight relationship `W = exp(a) · L^b`, fitted on the log-log scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthWeight {
    pub a: f64,
    pub b: f64,
}

impl LengthWeight {
    pub fn fit(specimens: &[LengthWeightRecord]) -> Result<Self, AppError> {
        let usable: Vec<&LengthWeightRecord> = specimens
            .iter()
            .filter(|s| s.length > 0.0 && s.weight > 0.0)
            .collect();
        if usable.len() < 2 {
            return Err(AppError::insufficient(
                "Length-weight fit needs at least two specimens with positive length and weight.",
            ));
        }
        let rows: Vec<Vec<f64>> = usable.iter().map(|s| vec![1.0, s.length.ln()]).collect();
        let y: Vec<f64> = usable.iter().map(|s| s.weight.ln()).collect();
        let w = vec![1.0; usable.len()];
        let beta = solve_weighted(&rows, &y, &w)
            .ok_or_else(|| AppError::numerical("Length-weight regression is singular."))?;
        Ok(Self { a: beta[0], b: beta[1] })
    }

    /// Predicted weight (kg) at `length` (cm).
    pub fn weight(&self, length: f64) -> f64 {
        if length <= 0.0 {
            return 0.0;
        }
        (self.a + self.b * length.ln()).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scaling(haul: u32, length: f64, sigma_bs: f64, expansion: f64) -> ScalingRecord {
        ScalingRecord {
            haul,
            class: "SS1".to_string(),
            length,
            sigma_bs,
            expansion,
        }
    }

    #[test]
    fn haul_composition_weights_by_expansion() {
        let rows = vec![scaling(1, 10.0, 1e-4, 1.0), scaling(1, 20.0, 3e-4, 3.0)];
        let comp = HaulComposition::from_rows(1, &rows).unwrap();
        assert_eq!(comp.lengths.len(), 2);
        assert!((comp.lengths[0].1 - 0.25).abs() < 1e-12);
        assert!((comp.lengths[1].1 - 0.75).abs() < 1e-12);
        assert!((comp.mean_sigma_bs - 2.5e-4).abs() < 1e-16);
    }

    #[test]
    fn age_length_key_uses_nearest_bin() {
        let specimens = vec![
            AgeLengthRecord { length: 10.0, age: 1 },
            AgeLengthRecord { length: 10.2, age: 1 },
            AgeLengthRecord { length: 10.1, age: 2 },
            AgeLengthRecord { length: 20.0, age: 3 },
        ];
        let key = AgeLengthKey::from_specimens(&specimens).unwrap();

        let p10 = key.proportions(10.0);
        assert_eq!(p10.len(), 2);
        assert!((p10[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(key.proportions(13.0), p10);
        assert_eq!(key.proportions(18.0), &[(3u32, 1.0)][..]);
        assert_eq!(key.proportions(50.0), &[(3u32, 1.0)][..]);
        assert_eq!(key.ages(), vec![1, 2, 3]);
    }

    #[test]
    fn length_weight_recovers_power_law() {
        let specimens: Vec<LengthWeightRecord> = (10..30)
            .map(|l| {
                let length = l as f64;
                LengthWeightRecord {
                    length,
                    weight: 1e-5 * length.powf(3.0),
                }
            })
            .collect();
        let lw = LengthWeight::fit(&specimens).unwrap();
        assert!((lw.b - 3.0).abs() < 1e-8);
        assert!((lw.weight(20.0) - 0.08).abs() < 1e-10);
    }

    #[test]
    fn resample_keeps_length_and_draws_from_input() {
        let rows = vec![1, 2, 3, 4];
        let mut rng = StdRng::seed_from_u64(4);
        let out = resample(&rows, &mut rng);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| rows.contains(v)));
    }
}
