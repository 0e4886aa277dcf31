//! Shared survey pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! preprocess -> load -> class filter/bin -> variograms -> class problems ->
//! bootstrap (or stepwise decomposition) -> summaries
//!
//! The CLI handlers can then focus on presentation (printing, report, exports).

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::filter_and_bin;
use crate::domain::{AcousticBin, AgeSummary, ErrorSet, LABEL_TOTAL, ReplicateRow, RunConfig, SurveyData};
use crate::error::AppError;
use crate::io::{preprocess_survey_data, read_survey_files};
use crate::report::{StepwiseReport, summarize_by_age, summarize_by_source};
use crate::sim::{
    BootstrapOptions, ClassProblem, ClassVariogram, build_class_problems, cv_bootstrap, fit_class_variogram,
    simulate_classes, stepwise_error, stepwise_labels,
};

/// Loaded survey plus its binned acoustic samples.
#[derive(Debug, Clone)]
pub struct PreparedSurvey {
    pub survey: SurveyData,
    pub bins: Vec<AcousticBin>,
}

/// Outputs of a bootstrap (`run`) or stepwise run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub prepared: PreparedSurvey,
    pub problems: Vec<ClassProblem>,
    /// One example realization per problem, for the report.
    pub example_fields: Vec<Vec<f64>>,
    pub rows: Vec<ReplicateRow>,
    pub summaries: Vec<AgeSummary>,
    pub stepwise: Option<StepwiseReport>,
}

/// Preprocess, load and bin the survey.
pub fn prepare_survey(config: &RunConfig) -> Result<PreparedSurvey, AppError> {
    let dir = config.survey_dir();
    log::info!("Preprocessing {} at {} km", dir.display(), config.resolution);
    let written = preprocess_survey_data(&dir, config.resolution)?;
    log::debug!(
        "Wrote {} projected acoustic rows, {} trawl locations, {} grid cells",
        written.acoustics,
        written.trawl_locations,
        written.grid_cells
    );

    let survey = read_survey_files(&dir, config.resolution)?;
    let bins = filter_and_bin(
        &survey.acoustics,
        &config.scaling_classes,
        config.max_transect,
        config.resolution,
    )?;
    if bins.is_empty() {
        return Err(AppError::insufficient(format!(
            "No acoustic records for classes [{}] on transects below {}.",
            config.scaling_classes.join(", "),
            config.max_transect
        )));
    }
    log::info!(
        "Loaded {} acoustic rows into {} bins; {} trawls; {} grid cells",
        survey.acoustics.len(),
        bins.len(),
        survey.trawl_locations.len(),
        survey.domain.cells.len()
    );

    Ok(PreparedSurvey {
        survey,
        bins,
    })
}

/// Fit the variogram of every accepted class.
pub fn run_variograms(config: &RunConfig) -> Result<(PreparedSurvey, Vec<ClassVariogram>), AppError> {
    let prepared = prepare_survey(config)?;
    let variograms = config
        .scaling_classes
        .iter()
        .map(|class| fit_class_variogram(class, &prepared.bins, config))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((prepared, variograms))
}

fn build_problems(
    config: &RunConfig,
    prepared: &PreparedSurvey,
    rng: &mut StdRng,
) -> Result<(Vec<ClassProblem>, Vec<Vec<f64>>), AppError> {
    log::info!("Building class problems ({} trial simulations each)", config.ntrials);
    let problems = build_class_problems(&prepared.bins, &prepared.survey.domain, config, rng)?;
    let example_fields = problems.iter().map(|p| p.simulate(true, rng)).collect();
    Ok((problems, example_fields))
}

/// Full bootstrap with every error source enabled.
pub fn run_bootstrap(config: &RunConfig) -> Result<RunOutput, AppError> {
    let prepared = prepare_survey(config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (problems, example_fields) = build_problems(config, &prepared, &mut rng)?;

    log::info!("Running {} bootstrap replicates", config.nreplicates);
    let options = BootstrapOptions::from_config(config, ErrorSet::all(), LABEL_TOTAL);
    let rows = simulate_classes(&problems, &prepared.survey, &options, config.nreplicates, &mut rng)?;
    let summaries = summarize_by_age(&rows);

    Ok(RunOutput {
        prepared,
        problems,
        example_fields,
        rows,
        summaries,
        stepwise: None,
    })
}

/// Stepwise decomposition; age summaries come from the final (all sources) step.
pub fn run_stepwise(config: &RunConfig) -> Result<RunOutput, AppError> {
    let prepared = prepare_survey(config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (problems, example_fields) = build_problems(config, &prepared, &mut rng)?;

    log::info!(
        "Running stepwise decomposition ({} replicates per step)",
        config.nreplicates
    );
    let rows = stepwise_error(&problems, &prepared.survey, config, config.nreplicates, &mut rng)?;
    let cvs = cv_bootstrap(&rows, config.nboot, &mut rng)?;
    let sources = summarize_by_source(&rows, &cvs);

    let last = stepwise_labels().last().copied().unwrap_or(LABEL_TOTAL);
    let final_rows: Vec<ReplicateRow> = rows.iter().filter(|r| r.error_source == last).cloned().collect();
    let summaries = summarize_by_age(&final_rows);

    Ok(RunOutput {
        prepared,
        problems,
        example_fields,
        rows,
        summaries,
        stepwise: Some(StepwiseReport { sources, cvs }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;

    const TRAWLS: usize = 3;

    /// Four in-survey transects plus one off-survey leg (transect 250).
    fn write_survey(dir: &Path) {
        fs::write(dir.join("domain.csv"), "lon,lat\n-0.3,50.3\n0.3,50.3\n0.3,50.7\n-0.3,50.7\n").unwrap();

        let mut acoustics = String::from("transect,class,lon,lat,nasc\n");
        for (t, lat) in [(1, 50.35), (2, 50.45), (3, 50.55), (4, 50.65), (250, 50.5)] {
            for i in 0..29 {
                let lon = -0.28 + 0.02 * i as f64;
                let nasc = 60.0 + 40.0 * (0.35 * i as f64 + t as f64).sin() + (i % 4) as f64 * 5.0;
                let _ = writeln!(acoustics, "{t},SS1,{lon:.3},{lat},{nasc:.3}");
                let _ = writeln!(acoustics, "{t},SS2,{lon:.3},{lat},1.0");
            }
        }
        fs::write(dir.join("acoustics.csv"), acoustics).unwrap();

        fs::write(
            dir.join("trawl_locations.csv"),
            "haul,lon,lat\n1,-0.2,50.4\n2,0.0,50.5\n3,0.2,50.6\n",
        )
        .unwrap();
        fs::write(
            dir.join("scaling.csv"),
            "haul,class,length,sigma_bs,expansion\n\
             1,SS1,12.0,0.00020,5.0\n1,SS1,16.0,0.00040,3.0\n\
             2,SS1,14.0,0.00030,4.0\n2,SS1,20.0,0.00070,2.0\n\
             3,SS1,18.0,0.00050,6.0\n3,SS1,22.0,0.00080,1.0\n",
        )
        .unwrap();
        fs::write(
            dir.join("age_length.csv"),
            "length,age\n9,0\n11,0\n12,1\n13,1\n14,1\n16,2\n17,2\n18,2\n20,3\n22,3\n",
        )
        .unwrap();
        let mut lw = String::from("length,weight\n");
        for l in 9..24 {
            let length = l as f64;
            let _ = writeln!(lw, "{length},{:.6}", 8e-6 * length.powf(3.05) * (1.0 + 0.03 * ((l % 3) as f64 - 1.0)));
        }
        fs::write(dir.join("length_weight.csv"), lw).unwrap();
    }

    fn config(root: &Path) -> RunConfig {
        RunConfig {
            survey: "synthetic".to_string(),
            data_root: root.to_path_buf(),
            nlags: 6,
            maxlag: 60.0,
            range_steps: 20,
            ntrials: 20,
            nreplicates: 50,
            nboot: 40,
            ..RunConfig::default()
        }
    }

    fn setup() -> (tempfile::TempDir, RunConfig) {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("synthetic");
        fs::create_dir(&dir).unwrap();
        write_survey(&dir);
        let config = config(root.path());
        (root, config)
    }

    #[test]
    fn end_to_end_bootstrap_on_synthetic_survey() {
        let (_root, config) = setup();
        let out = run_bootstrap(&config).unwrap();

        assert_eq!(out.prepared.survey.trawl_locations.len(), TRAWLS);
        assert!(out.prepared.bins.iter().all(|b| b.class == "SS1" && b.transect < 200));
        assert_eq!(out.problems.len(), 1);
        assert_eq!(out.problems[0].class, "SS1");

        // Ages 01..03; age 00 is never reported.
        assert_eq!(out.rows.len(), 50 * 3);
        assert!(out.rows.iter().all(|r| r.age != 0));
        assert_eq!(out.summaries.len(), 3);
        for s in &out.summaries {
            assert_eq!(s.abundance_cv, s.abundance_std / s.abundance_mean * 100.0);
        }
        assert!(out.example_fields[0].iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn bootstrap_is_reproducible_for_a_seed() {
        let (_root, config) = setup();
        let config = RunConfig {
            nreplicates: 10,
            ..config
        };
        let a = run_bootstrap(&config).unwrap();
        let b = run_bootstrap(&config).unwrap();
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.problems[0].driver, b.problems[0].driver);
    }

    #[test]
    fn stepwise_runs_every_step() {
        let (_root, config) = setup();
        let config = RunConfig {
            nreplicates: 6,
            ntrials: 5,
            ..config
        };
        let out = run_stepwise(&config).unwrap();
        let labels = stepwise_labels();
        assert_eq!(out.rows.len(), labels.len() * 6 * 3);

        let stepwise = out.stepwise.unwrap();
        assert_eq!(stepwise.cvs.len(), labels.len());
        assert_eq!(stepwise.sources[0].label, "none");
        // The deterministic baseline has no spread.
        assert!(stepwise.sources[0].abundance_cv.abs() < 1e-9);
    }

    fn render(config: &RunConfig, out: &RunOutput) -> String {
        crate::report::render_html_report(&crate::report::ReportInput {
            config,
            domain: &out.prepared.survey.domain,
            problems: &out.problems,
            example_fields: &out.example_fields,
            rows: &out.rows,
            summaries: &out.summaries,
            stepwise: out.stepwise.as_ref(),
        })
        .unwrap()
    }

    #[test]
    fn stepwise_report_has_both_tables_and_final_step_distributions() {
        let (_root, config) = setup();
        let config = RunConfig {
            nreplicates: 6,
            ntrials: 5,
            nboot: 20,
            ..config
        };
        let out = run_stepwise(&config).unwrap();
        let html = render(&config, &out);

        assert!(html.contains("<h2>Abundance and biomass by age</h2>"));
        for age in ["01", "02", "03"] {
            assert!(html.contains(&format!("<tr><td>{age}</td>")), "age {age} missing");
        }
        assert!(!html.contains("<td>00</td>"));

        assert!(html.contains("<h2>Stepwise error decomposition</h2>"));
        for label in stepwise_labels() {
            assert!(html.contains(&format!("<tr><td>{label}</td>")), "step {label} missing");
        }
        assert!(html.contains("IQR CV of total abundance"));
        assert!(html.contains("IQR CV of total biomass"));

        // Variogram, kriged mean and one realization for the single class.
        assert!(html.contains("<h2>Class SS1</h2>"));
        assert_eq!(html.matches("<svg").count(), 3);

        let last = stepwise_labels().last().copied().unwrap();
        let final_rows: Vec<&ReplicateRow> = out.rows.iter().filter(|r| r.error_source == last).collect();
        assert_eq!(final_rows.len(), 6 * 3);
        let (abundance, biomass) = crate::report::age_groups(final_rows);
        assert!(html.contains(&crate::plot::render_box_plots(&abundance, config.plot_width)));
        assert!(html.contains(&crate::plot::render_box_plots(&biomass, config.plot_width)));
    }

    #[test]
    fn bootstrap_report_has_no_stepwise_section() {
        let (_root, config) = setup();
        let config = RunConfig {
            nreplicates: 8,
            ntrials: 5,
            ..config
        };
        let out = run_bootstrap(&config).unwrap();
        let html = render(&config, &out);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Abundance and biomass by age</h2>"));
        assert!(!html.contains("<td>00</td>"));
        assert!(!html.contains("Stepwise error decomposition"));
        assert_eq!(html.matches("<svg").count(), 3);

        let (abundance, _) = crate::report::age_groups(&out.rows);
        assert!(html.contains(&crate::plot::render_box_plots(&abundance, config.plot_width)));
    }

    #[test]
    fn variograms_only() {
        let (_root, config) = setup();
        let (prepared, variograms) = run_variograms(&config).unwrap();
        assert_eq!(variograms.len(), 1);
        assert_eq!(variograms[0].bins.len(), prepared.bins.len());
    }

    #[test]
    fn unknown_class_is_insufficient_data() {
        let (_root, config) = setup();
        let config = RunConfig {
            scaling_classes: vec!["SS9".to_string()],
            ..config
        };
        assert_eq!(run_bootstrap(&config).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn missing_survey_is_an_input_error() {
        let root = tempfile::tempdir().unwrap();
        let config = config(root.path());
        assert_eq!(run_bootstrap(&config).unwrap_err().exit_code(), 2);
    }
}
