//! Self-contained HTML report.
//!
//! Plots are inline: SVG heatmaps and variograms from plotters, ASCII plots in
//! `<pre>` blocks. The file has no external assets.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::domain::{AgeSummary, ReplicateRow, RunConfig, SurveyDomain, age_label};
use crate::error::AppError;
use crate::math::{FiveNumber, five_number};
use crate::plot::{render_box_plots, render_field_svg, render_sample_map, render_variogram, render_variogram_svg};
use crate::report::format::{fmt_cv, fmt_num};
use crate::report::SourceSummary;
use crate::sim::{ClassProblem, SourceCv};

const HEATMAP_PX: (u32, u32) = (360, 360);
const VARIOGRAM_PX: (u32, u32) = (420, 280);

/// Stepwise decomposition results for the report.
#[derive(Debug, Clone)]
pub struct StepwiseReport {
    pub sources: Vec<SourceSummary>,
    pub cvs: Vec<SourceCv>,
}

/// Everything the report shows.
pub struct ReportInput<'a> {
    pub config: &'a RunConfig,
    pub domain: &'a SurveyDomain,
    pub problems: &'a [ClassProblem],
    /// One simulated realization per problem (same order).
    pub example_fields: &'a [Vec<f64>],
    pub rows: &'a [ReplicateRow],
    pub summaries: &'a [AgeSummary],
    pub stepwise: Option<&'a StepwiseReport>,
}

pub fn render_html_report(input: &ReportInput<'_>) -> Result<String, AppError> {
    let config = input.config;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>atboot: {}</title>", escape(&config.survey));
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");

    let _ = writeln!(html, "<h1>Total survey uncertainty: {}</h1>", escape(&config.survey));
    let _ = writeln!(
        html,
        "<p class=\"meta\">Generated {}</p>",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        html,
        "<p>Backscatter of scaling class(es) <b>{}</b> was binned at {} km and simulated \
         conditionally on a {} km grid of {} cells inside the survey domain. \
         {} bootstrap replicates (seed {}) carried calibration, spatial sampling, trawl assignment, \
         catch resampling, target strength, age-length and length-weight error into abundance and \
         biomass at age. Age class 00 is excluded.</p>",
        escape(&config.scaling_classes.join(", ")),
        config.resolution,
        config.resolution,
        input.domain.cells.len(),
        config.nreplicates,
        config.seed
    );

    for (i, problem) in input.problems.iter().enumerate() {
        write_class_section(&mut html, input, problem, input.example_fields.get(i))?;
    }

    html.push_str("<h2>Abundance and biomass by age</h2>\n");
    write_age_table(&mut html, input.summaries);

    html.push_str("<h2>Replicate distributions by age</h2>\n");
    let by_age = age_groups(age_distribution_rows(input.rows, input.stepwise));
    let _ = writeln!(html, "<h3>Abundance</h3>\n<pre>{}</pre>", escape(&render_box_plots(&by_age.0, config.plot_width)));
    let _ = writeln!(html, "<h3>Biomass (kg)</h3>\n<pre>{}</pre>", escape(&render_box_plots(&by_age.1, config.plot_width)));

    if let Some(stepwise) = input.stepwise {
        write_stepwise_section(&mut html, stepwise, config.plot_width);
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

pub fn write_html_report(path: &Path, html: &str) -> Result<(), AppError> {
    std::fs::write(path, html)
        .map_err(|e| AppError::input(format!("Failed to write report '{}': {e}", path.display())))
}

fn write_class_section(
    html: &mut String,
    input: &ReportInput<'_>,
    problem: &ClassProblem,
    example: Option<&Vec<f64>>,
) -> Result<(), AppError> {
    let config = input.config;
    let model = &problem.fit.model;

    let _ = writeln!(html, "<h2>Class {}</h2>", escape(&problem.class));
    let _ = writeln!(
        html,
        "<p>{} binned samples. Exponential variogram: nugget {:.4}, partial sill {:.4}, range {:.2} km \
         (weighted SSE {:.4}). Driving distribution: {}.</p>",
        problem.bins.len(),
        model.nugget,
        model.psill,
        model.range,
        problem.fit.wsse,
        escape(&problem.driver.to_string())
    );

    let _ = writeln!(
        html,
        "<h3>Samples</h3>\n<pre>{}</pre>",
        escape(&render_sample_map(&problem.bins, config.plot_width, config.plot_height))
    );

    html.push_str("<h3>Variogram</h3>\n<div class=\"row\">\n");
    html.push_str(&render_variogram_svg(&problem.empirical, model, VARIOGRAM_PX)?);
    let _ = writeln!(
        html,
        "<pre>{}</pre>\n</div>",
        escape(&render_variogram(&problem.empirical, model, config.plot_width, config.plot_height))
    );

    let kriged: Vec<f64> = problem.field.mean.iter().map(|&m| m.max(0.0)).collect();
    let vmax = kriged
        .iter()
        .chain(example.into_iter().flatten())
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    html.push_str("<h3>Simulated NASC</h3>\n<div class=\"row\">\n");
    let _ = writeln!(
        html,
        "<figure>{}<figcaption>Kriged mean</figcaption></figure>",
        render_field_svg(&input.domain.cells, &kriged, input.domain.resolution, vmax, HEATMAP_PX)?
    );
    if let Some(values) = example {
        let _ = writeln!(
            html,
            "<figure>{}<figcaption>One conditional realization</figcaption></figure>",
            render_field_svg(&input.domain.cells, values, input.domain.resolution, vmax, HEATMAP_PX)?
        );
    }
    let _ = writeln!(html, "</div>\n<p class=\"meta\">Colour scale 0 to {vmax:.1} NASC (dark to light).</p>");
    Ok(())
}

fn write_age_table(html: &mut String, summaries: &[AgeSummary]) {
    html.push_str(
        "<table>\n<tr><th>Age</th><th>Abundance</th><th>SD</th><th>CV %</th>\
         <th>Biomass (kg)</th><th>SD</th><th>CV %</th></tr>\n",
    );
    for s in summaries {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            age_label(s.age),
            fmt_num(s.abundance_mean),
            fmt_num(s.abundance_std),
            fmt_cv(s.abundance_cv),
            fmt_num(s.biomass_mean),
            fmt_num(s.biomass_std),
            fmt_cv(s.biomass_cv)
        );
    }
    html.push_str("</table>\n");
}

fn write_stepwise_section(html: &mut String, stepwise: &StepwiseReport, width: usize) {
    html.push_str("<h2>Stepwise error decomposition</h2>\n");
    html.push_str(
        "<p>Error sources are added one at a time, in table order. Each row's CV is that of the \
         replicate totals with all sources up to and including the row enabled.</p>\n",
    );
    html.push_str(
        "<table>\n<tr><th>Added source</th><th>Mean abundance</th><th>CV %</th>\
         <th>Mean biomass (kg)</th><th>CV %</th></tr>\n",
    );
    for s in &stepwise.sources {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&s.label),
            fmt_num(s.abundance_mean),
            fmt_cv(s.abundance_cv),
            fmt_num(s.biomass_mean),
            fmt_cv(s.biomass_cv)
        );
    }
    html.push_str("</table>\n");

    let abundance: BoxGroups = stepwise
        .sources
        .iter()
        .filter_map(|s| s.abundance_cv_boot.map(|f| (s.label.clone(), f)))
        .collect();
    let biomass: BoxGroups = stepwise
        .sources
        .iter()
        .filter_map(|s| s.biomass_cv_boot.map(|f| (s.label.clone(), f)))
        .collect();
    let _ = writeln!(
        html,
        "<h3>Bootstrapped IQR CV of total abundance (%)</h3>\n<pre>{}</pre>",
        escape(&render_box_plots(&abundance, width))
    );
    let _ = writeln!(
        html,
        "<h3>Bootstrapped IQR CV of total biomass (%)</h3>\n<pre>{}</pre>",
        escape(&render_box_plots(&biomass, width))
    );
}

/// Labelled five-number summaries, one box plot row each.
pub type BoxGroups = Vec<(String, FiveNumber)>;

/// Rows the by-age distributions are drawn from.
///
/// A stepwise run holds every step's rows; only the final step (all error
/// sources enabled) matches the age table.
pub fn age_distribution_rows<'a>(
    rows: &'a [ReplicateRow],
    stepwise: Option<&StepwiseReport>,
) -> Vec<&'a ReplicateRow> {
    match stepwise.and_then(|s| s.sources.last()) {
        Some(last) => rows.iter().filter(|r| r.error_source == last.label).collect(),
        None => rows.iter().collect(),
    }
}

/// Abundance and biomass box plot groups per age class.
pub fn age_groups<'a>(rows: impl IntoIterator<Item = &'a ReplicateRow>) -> (BoxGroups, BoxGroups) {
    let mut by_age: BTreeMap<u32, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for r in rows {
        let e = by_age.entry(r.age).or_default();
        e.0.push(r.abundance);
        e.1.push(r.biomass);
    }
    let mut abundance = Vec::new();
    let mut biomass = Vec::new();
    for (age, (a, b)) in by_age {
        if let Some(f) = five_number(&a) {
            abundance.push((age_label(age), f));
        }
        if let Some(f) = five_number(&b) {
            biomass.push((age_label(age), f));
        }
    }
    (abundance, biomass)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

const STYLE: &str = "<style>\n\
body { font-family: sans-serif; max-width: 1100px; margin: 2em auto; }\n\
pre { background: #f6f6f6; padding: 0.6em; font-size: 12px; }\n\
table { border-collapse: collapse; }\n\
td, th { border: 1px solid #ccc; padding: 0.2em 0.6em; text-align: right; }\n\
.row { display: flex; gap: 1em; align-items: flex-start; flex-wrap: wrap; }\n\
.meta { color: #666; }\n\
</style>\n";
