//! Reporting: across-replicate summaries, terminal tables and the HTML report.

pub mod format;
pub mod html;

pub use format::*;
pub use html::*;

use std::collections::BTreeMap;

use crate::domain::{AgeSummary, NON_TARGET_AGE, ReplicateRow};
use crate::math::{cv_percent, five_number, mean, std_dev, FiveNumber};
use crate::sim::{SourceCv, replicate_totals};

/// Mean, standard deviation and CV per age class across replicates.
///
/// Non-target age rows are ignored. With a single replicate the standard
/// deviation (and CV) is NaN.
pub fn summarize_by_age(rows: &[ReplicateRow]) -> Vec<AgeSummary> {
    let mut by_age: BTreeMap<u32, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.age != NON_TARGET_AGE) {
        let e = by_age.entry(r.age).or_default();
        e.0.push(r.abundance);
        e.1.push(r.biomass);
    }

    by_age
        .into_iter()
        .map(|(age, (abundance, biomass))| {
            let (a_mean, a_std) = mean_std(&abundance);
            let (b_mean, b_std) = mean_std(&biomass);
            AgeSummary {
                age,
                abundance_mean: a_mean,
                abundance_std: a_std,
                abundance_cv: cv_percent(a_std, a_mean),
                biomass_mean: b_mean,
                biomass_std: b_std,
                biomass_cv: cv_percent(b_std, b_mean),
            }
        })
        .collect()
}

fn mean_std(v: &[f64]) -> (f64, f64) {
    (mean(v).unwrap_or(f64::NAN), std_dev(v).unwrap_or(f64::NAN))
}

/// Spread of replicate totals for one stepwise label.
#[derive(Debug, Clone)]
pub struct SourceSummary {
    pub label: String,
    pub abundance_mean: f64,
    pub abundance_cv: f64,
    pub biomass_mean: f64,
    pub biomass_cv: f64,
    /// Five-number summary of the bootstrapped IQR CV (abundance).
    pub abundance_cv_boot: Option<FiveNumber>,
    pub biomass_cv_boot: Option<FiveNumber>,
}

/// Summarize each stepwise label, in the order of `cvs`.
pub fn summarize_by_source(rows: &[ReplicateRow], cvs: &[SourceCv]) -> Vec<SourceSummary> {
    cvs.iter()
        .map(|cv| {
            let (abundance, biomass) = replicate_totals(rows, &cv.label);
            let (a_mean, a_std) = mean_std(&abundance);
            let (b_mean, b_std) = mean_std(&biomass);
            SourceSummary {
                label: cv.label.clone(),
                abundance_mean: a_mean,
                abundance_cv: cv_percent(a_std, a_mean),
                biomass_mean: b_mean,
                biomass_cv: cv_percent(b_std, b_mean),
                abundance_cv_boot: finite_five_number(&cv.abundance_cv),
                biomass_cv_boot: finite_five_number(&cv.biomass_cv),
            }
        })
        .collect()
}

fn finite_five_number(v: &[f64]) -> Option<FiveNumber> {
    let finite: Vec<f64> = v.iter().copied().filter(|x| x.is_finite()).collect();
    five_number(&finite)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(age: u32, replicate: usize, abundance: f64) -> ReplicateRow {
        ReplicateRow {
            age,
            abundance,
            biomass: abundance * 2.0,
            replicate,
            error_source: "total".to_string(),
        }
    }

    #[test]
    fn cv_is_std_over_mean_times_100() {
        let rows = vec![row(1, 0, 10.0), row(1, 1, 20.0), row(1, 2, 30.0), row(2, 0, 5.0), row(2, 1, 5.0), row(2, 2, 5.0)];
        let s = summarize_by_age(&rows);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].age, 1);
        assert!((s[0].abundance_mean - 20.0).abs() < 1e-12);
        assert!((s[0].abundance_std - 10.0).abs() < 1e-12);
        assert_eq!(s[0].abundance_cv, s[0].abundance_std / s[0].abundance_mean * 100.0);
        assert_eq!(s[0].biomass_cv, s[0].biomass_std / s[0].biomass_mean * 100.0);
        assert_eq!(s[1].abundance_cv, 0.0);
    }

    #[test]
    fn non_target_age_is_excluded() {
        let rows = vec![row(0, 0, 1.0), row(0, 1, 2.0), row(3, 0, 1.0), row(3, 1, 2.0)];
        let s = summarize_by_age(&rows);
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].age, 3);
    }

    #[test]
    fn source_summary_follows_cv_order() {
        let rows = vec![row(1, 0, 10.0), row(1, 1, 14.0)];
        let cvs = vec![SourceCv {
            label: "total".to_string(),
            abundance_cv: vec![1.0, 2.0, f64::NAN, 3.0],
            biomass_cv: vec![],
        }];
        let s = summarize_by_source(&rows, &cvs);
        assert_eq!(s.len(), 1);
        assert!((s[0].abundance_mean - 12.0).abs() < 1e-12);
        assert_eq!(s[0].abundance_cv_boot.unwrap().median, 2.0);
        assert!(s[0].biomass_cv_boot.is_none());
    }
}
