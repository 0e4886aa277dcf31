//! Command-line parsing for the survey bootstrap.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the geostatistics and simulation code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "atboot", version, about = "Acoustic-trawl survey total-uncertainty bootstrap")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit and print the variogram of each scaling class (no simulation).
    Variogram(RunArgs),
    /// Run the full bootstrap and report abundance and biomass by age.
    Run(RunArgs),
    /// Run the stepwise error decomposition.
    Stepwise(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Survey identifier (directory name under the data root).
    #[arg(short = 's', long)]
    pub survey: String,

    /// Directory holding one sub-directory per survey.
    #[arg(long, default_value = ".")]
    pub data_root: PathBuf,

    /// Grid and binning resolution (km).
    #[arg(long, default_value_t = 10.0)]
    pub resolution: f64,

    /// Accepted scaling classes (comma separated).
    #[arg(long, value_delimiter = ',', default_value = "SS1")]
    pub classes: Vec<String>,

    /// Transects numbered at or above this are dropped.
    #[arg(long, default_value_t = 200)]
    pub max_transect: u32,

    /// Number of empirical variogram lag bins.
    #[arg(long, default_value_t = 10)]
    pub nlags: usize,

    /// Maximum variogram lag (km).
    #[arg(long, default_value_t = 200.0)]
    pub maxlag: f64,

    /// Range grid steps for the exponential fit.
    #[arg(long, default_value_t = 40)]
    pub range_steps: usize,

    /// Trial simulations when selecting the driving distribution.
    #[arg(long, default_value_t = 500)]
    pub ntrials: usize,

    /// Histogram bins for the KL divergence.
    #[arg(long, default_value_t = 20)]
    pub kl_bins: usize,

    /// Bootstrap replicates (per stepwise step for `stepwise`).
    #[arg(short = 'n', long, default_value_t = 500)]
    pub nreplicates: usize,

    /// Resamples of the replicate totals for the IQR CV bootstrap.
    #[arg(long, default_value_t = 1000)]
    pub nboot: usize,

    /// Kilometres to nautical miles.
    #[arg(long, default_value_t = 0.539957)]
    pub km2nmi: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Calibration error SD (dB).
    #[arg(long, default_value_t = 0.1)]
    pub cal_sd_db: f64,

    /// Target-strength error SD (dB).
    #[arg(long, default_value_t = 0.14)]
    pub ts_sd_db: f64,

    /// Distance scale (km) of the random trawl assignment.
    #[arg(long, default_value_t = 20.0)]
    pub assignment_scale: f64,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,

    /// Write the HTML report here.
    #[arg(long, value_name = "HTML")]
    pub report: Option<PathBuf>,

    /// Export replicate results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export class problems (variogram + distribution) to JSON.
    #[arg(long = "export-problems", value_name = "JSON")]
    pub export_problems: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_class_list() {
        let cli = Cli::parse_from(["atboot", "run", "-s", "2019", "--classes", "SS1,SS2"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.survey, "2019");
        assert_eq!(args.classes, vec!["SS1", "SS2"]);
        assert_eq!(args.resolution, 10.0);
        assert_eq!(args.nreplicates, 500);
        assert_eq!(args.max_transect, 200);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
