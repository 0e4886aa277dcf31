//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the survey pipeline for the chosen subcommand
//! - prints tables and terminal plots
//! - writes the optional exports and HTML report

use clap::Parser;

use crate::cli::{Command, RunArgs};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::report::ReportInput;

pub mod pipeline;

/// Entry point for the `atboot` binary.
pub fn run() -> Result<(), AppError> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    // `atboot -s 2019` behaves like `atboot run -s 2019`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Variogram(args) => handle_variogram(args),
        Command::Run(args) => handle_run(args),
        Command::Stepwise(args) => handle_stepwise(args),
    }
}

fn handle_variogram(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let (prepared, variograms) = pipeline::run_variograms(&config)?;

    println!(
        "{}",
        crate::report::format_run_header(&config, prepared.survey.domain.cells.len(), prepared.bins.len())
    );
    println!("{}", crate::report::format_variograms(&variograms));

    if !args.no_plot {
        for v in &variograms {
            println!("Class {} samples", v.class);
            println!("{}", crate::plot::render_sample_map(&v.bins, config.plot_width, config.plot_height));
            println!(
                "{}",
                crate::plot::render_variogram(&v.empirical, &v.fit.model, config.plot_width, config.plot_height)
            );
        }
    }
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let out = pipeline::run_bootstrap(&config)?;
    print_and_export(&config, &out, !args.no_plot)
}

fn handle_stepwise(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let out = pipeline::run_stepwise(&config)?;
    print_and_export(&config, &out, !args.no_plot)
}

fn print_and_export(config: &RunConfig, out: &pipeline::RunOutput, plot: bool) -> Result<(), AppError> {
    let survey = &out.prepared.survey;
    println!(
        "{}",
        crate::report::format_run_header(config, survey.domain.cells.len(), out.prepared.bins.len())
    );
    println!("{}", crate::report::format_problems(&out.problems));

    if plot {
        for p in &out.problems {
            println!(
                "{}",
                crate::plot::render_variogram(&p.empirical, &p.fit.model, config.plot_width, config.plot_height)
            );
        }
    }

    if let Some(stepwise) = &out.stepwise {
        println!("Stepwise error decomposition (cumulative)");
        println!("{}", crate::report::format_stepwise_table(&stepwise.sources));
        println!("Abundance and biomass by age (all sources)");
    } else {
        println!("Abundance and biomass by age");
    }
    println!("{}", crate::report::format_age_table(&out.summaries));

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &out.rows)?;
        log::info!("Wrote {} replicate rows to {}", out.rows.len(), path.display());
    }
    if let Some(path) = &config.export_problems {
        crate::io::write_problems_json(path, &out.problems)?;
        log::info!("Wrote class problems to {}", path.display());
    }
    if let Some(path) = &config.report {
        let html = crate::report::render_html_report(&ReportInput {
            config,
            domain: &survey.domain,
            problems: &out.problems,
            example_fields: &out.example_fields,
            rows: &out.rows,
            summaries: &out.summaries,
            stepwise: out.stepwise.as_ref(),
        })?;
        crate::report::write_html_report(path, &html)?;
        log::info!("Wrote report to {}", path.display());
    }

    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        survey: args.survey.clone(),
        data_root: args.data_root.clone(),
        resolution: args.resolution,
        scaling_classes: args.classes.clone(),
        max_transect: args.max_transect,

        nlags: args.nlags,
        maxlag: args.maxlag,
        range_steps: args.range_steps,
        ntrials: args.ntrials,
        kl_bins: args.kl_bins,

        nreplicates: args.nreplicates,
        nboot: args.nboot,
        km2nmi: args.km2nmi,
        seed: args.seed,

        cal_sd_db: args.cal_sd_db,
        ts_sd_db: args.ts_sd_db,
        assignment_scale: args.assignment_scale,

        plot_width: args.width,
        plot_height: args.height,

        report: args.report.clone(),
        export_results: args.export.clone(),
        export_problems: args.export_problems.clone(),
    }
}

/// Rewrite argv so `atboot` defaults to `atboot run`.
///
/// Rules:
/// - `atboot -s 2019 ...`          -> `atboot run -s 2019 ...`
/// - `atboot --help/--version/-h`  -> unchanged (show top-level help/version)
/// - `atboot`                      -> unchanged (clap prints usage)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_flags_default_to_run() {
        assert_eq!(rewrite_args(argv(&["atboot", "-s", "2019"])), argv(&["atboot", "run", "-s", "2019"]));
        assert_eq!(rewrite_args(argv(&["atboot", "stepwise", "-s", "x"])), argv(&["atboot", "stepwise", "-s", "x"]));
        assert_eq!(rewrite_args(argv(&["atboot", "--help"])), argv(&["atboot", "--help"]));
        assert_eq!(rewrite_args(argv(&["atboot"])), argv(&["atboot"]));
    }

    #[test]
    fn config_maps_every_flag() {
        let cli = crate::cli::Cli::parse_from(rewrite_args(argv(&[
            "atboot",
            "-s",
            "2019",
            "-n",
            "25",
            "--export",
            "out.csv",
            "--export-problems",
            "p.json",
        ])));
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = run_config_from_args(&args);
        assert_eq!(config.survey, "2019");
        assert_eq!(config.nreplicates, 25);
        assert_eq!(config.export_results.as_deref(), Some(std::path::Path::new("out.csv")));
        assert_eq!(config.export_problems.as_deref(), Some(std::path::Path::new("p.json")));
        assert!(config.report.is_none());
        assert_eq!(config.km2nmi, 0.539957);
    }
}
