//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the simulation code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{AgeSummary, RunConfig, age_label};
use crate::report::SourceSummary;
use crate::sim::{ClassProblem, ClassVariogram};

/// Run header: survey, grid and simulation settings.
pub fn format_run_header(config: &RunConfig, n_cells: usize, n_bins: usize) -> String {
    let mut out = String::new();
    out.push_str("=== atboot - acoustic-trawl survey bootstrap ===\n");
    out.push_str(&format!("Survey: {}\n", config.survey));
    out.push_str(&format!(
        "Grid: {} km ({n_cells} cells) | classes: {} | binned samples: {n_bins}\n",
        config.resolution,
        config.scaling_classes.join(","),
    ));
    out.push_str(&format!(
        "Replicates: {} | seed: {}\n",
        config.nreplicates, config.seed
    ));
    out
}

/// Fitted variogram per class, with its empirical bins.
pub fn format_variograms(variograms: &[ClassVariogram]) -> String {
    let mut out = String::new();
    for v in variograms {
        out.push_str(&format!(
            "Class {}: {} bins, {} lags | nugget={:.4} psill={:.4} range={:.2} km | WSSE={:.4}\n",
            v.class,
            v.bins.len(),
            v.fit.n_lags,
            v.fit.model.nugget,
            v.fit.model.psill,
            v.fit.model.range,
            v.fit.wsse
        ));
        push_line(&mut out, format!("{:>10} {:>14} {:>8}", "lag_km", "gamma", "pairs"));
        push_line(&mut out, format!("{:-<10} {:-<14} {:-<8}", "", "", ""));
        for p in &v.empirical {
            push_line(&mut out, format!("{:>10.2} {:>14.4} {:>8}", p.lag, p.gamma, p.npairs));
        }
        out.push('\n');
    }
    out
}

/// Selected driving distribution per class, with every candidate's score.
pub fn format_problems(problems: &[ClassProblem]) -> String {
    let mut out = String::new();
    for p in problems {
        out.push_str(&format!("Class {}: driving distribution {}\n", p.class, p.driver));
        for s in &p.driver_scores {
            let chosen = if s.driver == p.driver { "*" } else { " " };
            out.push_str(&format!("{chosen} {:<22} mean KL={:.5}\n", s.driver.to_string(), s.mean_kl));
        }
    }
    out
}

/// Abundance and biomass by age.
pub fn format_age_table(summaries: &[AgeSummary]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<4} {:>14} {:>14} {:>8} {:>14} {:>14} {:>8}",
            "age", "abundance", "abund_sd", "cv_%", "biomass_kg", "biom_sd", "cv_%"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<4} {:-<14} {:-<14} {:-<8} {:-<14} {:-<14} {:-<8}", "", "", "", "", "", "", ""),
    );
    for s in summaries {
        push_line(
            &mut out,
            format!(
                "{:<4} {:>14} {:>14} {:>8} {:>14} {:>14} {:>8}",
                age_label(s.age),
                fmt_num(s.abundance_mean),
                fmt_num(s.abundance_std),
                fmt_cv(s.abundance_cv),
                fmt_num(s.biomass_mean),
                fmt_num(s.biomass_std),
                fmt_cv(s.biomass_cv),
            ),
        );
    }
    out
}

/// CV of replicate totals per stepwise label, with the bootstrapped IQR CV.
pub fn format_stepwise_table(sources: &[SourceSummary]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<18} {:>8} {:>10} {:>10} {:>8} {:>10}",
            "added_source", "cv_%", "iqr_cv_q1", "iqr_cv_q3", "biom_cv", "biom_iqr"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<18} {:-<8} {:-<10} {:-<10} {:-<8} {:-<10}", "", "", "", "", "", ""),
    );
    for s in sources {
        let (q1, q3) = s
            .abundance_cv_boot
            .map(|f| (fmt_cv(f.q1), fmt_cv(f.q3)))
            .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
        let biom_median = s.biomass_cv_boot.map(|f| fmt_cv(f.median)).unwrap_or_else(|| "-".to_string());
        push_line(
            &mut out,
            format!(
                "{:<18} {:>8} {:>10} {:>10} {:>8} {:>10}",
                s.label,
                fmt_cv(s.abundance_cv),
                q1,
                q3,
                fmt_cv(s.biomass_cv),
                biom_median
            ),
        );
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Large counts in scientific notation, small ones with two decimals.
pub fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    if v.abs() >= 1e6 {
        format!("{v:.3e}")
    } else {
        format!("{v:.2}")
    }
}

pub fn fmt_cv(v: f64) -> String {
    if v.is_finite() { format!("{v:.1}") } else { "-".to_string() }
}
