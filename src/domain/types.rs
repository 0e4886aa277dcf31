//! Shared domain types.
//!
//! Table rows derive `Serialize`/`Deserialize` so the same structs are used to:
//!
//! - read the survey CSV files
//! - write the preprocessing intermediates
//! - export replicate results

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Age class excluded from every results table and summary (young-of-year,
/// not a survey target). Rendered as `"00"`.
pub const NON_TARGET_AGE: u32 = 0;

/// Label an age class the way survey reports do (`"00"`, `"01"`, ...).
pub fn age_label(age: u32) -> String {
    format!("{age:02}")
}

/// One acoustic integration interval as delivered by the survey (geographic only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAcousticRecord {
    pub transect: u32,
    pub class: String,
    pub lon: f64,
    pub lat: f64,
    pub nasc: f64,
}

/// Acoustic interval after projection to survey km coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcousticRecord {
    pub transect: u32,
    pub class: String,
    pub lon: f64,
    pub lat: f64,
    pub x: f64,
    pub y: f64,
    pub nasc: f64,
}

/// Trawl haul position as delivered by the survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrawlLocation {
    pub haul: u32,
    pub lon: f64,
    pub lat: f64,
}

/// Trawl haul position after projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrawlLocation {
    pub haul: u32,
    pub lon: f64,
    pub lat: f64,
    pub x: f64,
    pub y: f64,
}

/// Length-frequency scaling row: one measured length in one haul and class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingRecord {
    pub haul: u32,
    pub class: String,
    /// Fork length (cm).
    pub length: f64,
    /// Backscattering cross-section (m²) of a fish at this length.
    pub sigma_bs: f64,
    /// Catch-sampling expansion factor (how many fish this row stands for).
    pub expansion: f64,
}

/// Aged specimen (age-length key row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeLengthRecord {
    pub length: f64,
    pub age: u32,
}

/// Weighed specimen (length-weight key row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthWeightRecord {
    pub length: f64,
    /// Weight (kg).
    pub weight: f64,
}

/// Survey boundary vertex as delivered by the survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoVertex {
    pub lon: f64,
    pub lat: f64,
}

/// Centre of one simulation grid cell (projected km).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub x: f64,
    pub y: f64,
}

/// Survey extent: the projected boundary polygon and its grid at `resolution`.
#[derive(Debug, Clone)]
pub struct SurveyDomain {
    pub polygon: Vec<(f64, f64)>,
    pub cells: Vec<GridCell>,
    /// Grid spacing (km).
    pub resolution: f64,
}

impl SurveyDomain {
    pub fn cell_area_km2(&self) -> f64 {
        self.resolution * self.resolution
    }
}

/// Everything `read_survey_files` loads for one survey.
#[derive(Debug, Clone)]
pub struct SurveyData {
    pub acoustics: Vec<AcousticRecord>,
    pub scaling: Vec<ScalingRecord>,
    pub age_length: Vec<AgeLengthRecord>,
    pub length_weight: Vec<LengthWeightRecord>,
    pub trawl_locations: Vec<TrawlLocation>,
    pub domain: SurveyDomain,
}

/// Mean backscatter in one (transect, class, bin) cell.
#[derive(Debug, Clone, Serialize)]
pub struct AcousticBin {
    pub transect: u32,
    pub class: String,
    /// Bin index along x (`round(x / resolution)`).
    pub bin_x: i64,
    /// Bin index along y.
    pub bin_y: i64,
    /// Mean projected position of the intervals in the bin.
    pub x: f64,
    pub y: f64,
    pub lon: f64,
    pub lat: f64,
    /// Mean NASC.
    pub nasc: f64,
    pub n_intervals: usize,
}

/// One lag bin of the empirical semivariogram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VariogramPoint {
    /// Mean pair distance in the bin (km).
    pub lag: f64,
    pub gamma: f64,
    pub npairs: usize,
}

/// Fitted exponential variogram `γ(h) = nugget + psill·(1 − exp(−h/range))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialVariogram {
    pub nugget: f64,
    pub psill: f64,
    /// Range parameter (km). The practical range is about `3 * range`.
    pub range: f64,
}

impl ExponentialVariogram {
    /// Total sill (`nugget + psill`), the field variance.
    pub fn sill(&self) -> f64 {
        self.nugget + self.psill
    }
}

/// Family of the distribution that turns a Gaussian field value into a
/// non-negative NASC draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Gamma,
    LogNormal,
    Exponential,
}

impl DriverKind {
    pub fn display_name(self) -> &'static str {
        match self {
            DriverKind::Gamma => "Gamma",
            DriverKind::LogNormal => "LogNormal",
            DriverKind::Exponential => "Exponential",
        }
    }
}

/// A concrete driving distribution: family plus coefficient of variation.
///
/// Draws have mean equal to the (positive) field value and the given CV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverDistribution {
    pub kind: DriverKind,
    pub cv: f64,
}

impl std::fmt::Display for DriverDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(cv={:.2})", self.kind.display_name(), self.cv)
    }
}

/// Independent error source that the bootstrap can switch on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    /// Echosounder calibration offset (dB), one draw per class and replicate.
    Calibration,
    /// Conditional simulation of the backscatter field.
    Spatial,
    /// Random (distance-weighted) choice of the haul a grid cell is scaled by.
    TrawlAssignment,
    /// Bootstrap of the length-frequency rows within each haul.
    CatchResampling,
    /// Target-strength (sigma_bs) model error (dB).
    TargetStrength,
    /// Bootstrap of the aged specimens.
    AgeLength,
    /// Bootstrap of the weighed specimens before the length-weight fit.
    LengthWeight,
}

impl ErrorSource {
    /// Order in which sources are added by the stepwise decomposition.
    pub const ALL: [ErrorSource; 7] = [
        ErrorSource::Calibration,
        ErrorSource::Spatial,
        ErrorSource::TrawlAssignment,
        ErrorSource::CatchResampling,
        ErrorSource::TargetStrength,
        ErrorSource::AgeLength,
        ErrorSource::LengthWeight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ErrorSource::Calibration => "calibration",
            ErrorSource::Spatial => "spatial",
            ErrorSource::TrawlAssignment => "trawl_assignment",
            ErrorSource::CatchResampling => "catch_resampling",
            ErrorSource::TargetStrength => "target_strength",
            ErrorSource::AgeLength => "age_length",
            ErrorSource::LengthWeight => "length_weight",
        }
    }
}

/// Which error sources a bootstrap run includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorSet {
    pub calibration: bool,
    pub spatial: bool,
    pub trawl_assignment: bool,
    pub catch_resampling: bool,
    pub target_strength: bool,
    pub age_length: bool,
    pub length_weight: bool,
}

impl ErrorSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        ErrorSource::ALL
            .iter()
            .fold(Self::none(), |set, &source| set.with(source))
    }

    pub fn with(mut self, source: ErrorSource) -> Self {
        *self.flag_mut(source) = true;
        self
    }

    pub fn contains(&self, source: ErrorSource) -> bool {
        match source {
            ErrorSource::Calibration => self.calibration,
            ErrorSource::Spatial => self.spatial,
            ErrorSource::TrawlAssignment => self.trawl_assignment,
            ErrorSource::CatchResampling => self.catch_resampling,
            ErrorSource::TargetStrength => self.target_strength,
            ErrorSource::AgeLength => self.age_length,
            ErrorSource::LengthWeight => self.length_weight,
        }
    }

    fn flag_mut(&mut self, source: ErrorSource) -> &mut bool {
        match source {
            ErrorSource::Calibration => &mut self.calibration,
            ErrorSource::Spatial => &mut self.spatial,
            ErrorSource::TrawlAssignment => &mut self.trawl_assignment,
            ErrorSource::CatchResampling => &mut self.catch_resampling,
            ErrorSource::TargetStrength => &mut self.target_strength,
            ErrorSource::AgeLength => &mut self.age_length,
            ErrorSource::LengthWeight => &mut self.length_weight,
        }
    }
}

/// Label for results produced with every error source enabled.
pub const LABEL_TOTAL: &str = "total";
/// Label for the deterministic baseline of the stepwise decomposition.
pub const LABEL_NONE: &str = "none";

/// One (replicate, age) result of the bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicateRow {
    pub age: u32,
    /// Numbers of fish.
    pub abundance: f64,
    /// Biomass (kg).
    pub biomass: f64,
    pub replicate: usize,
    /// `total`, `none`, or the label of the error source added at this step.
    pub error_source: String,
}

/// Across-replicate summary for one age class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeSummary {
    pub age: u32,
    pub abundance_mean: f64,
    pub abundance_std: f64,
    /// `abundance_std / abundance_mean * 100` (NaN when the mean is zero).
    pub abundance_cv: f64,
    pub biomass_mean: f64,
    pub biomass_std: f64,
    pub biomass_cv: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub survey: String,
    pub data_root: PathBuf,
    /// Grid and binning resolution (km).
    pub resolution: f64,
    pub scaling_classes: Vec<String>,
    /// Transects numbered at or above this are dropped as out-of-survey
    /// artifacts (off-transect and calibration legs).
    pub max_transect: u32,

    pub nlags: usize,
    /// Largest lag (km) in the empirical variogram.
    pub maxlag: f64,
    pub range_steps: usize,
    /// Trial simulations per candidate when selecting the driving distribution.
    pub ntrials: usize,
    pub kl_bins: usize,

    pub nreplicates: usize,
    /// Resamples in the bootstrap-of-the-bootstrap CV estimate.
    pub nboot: usize,
    /// Kilometres to nautical miles.
    pub km2nmi: f64,
    pub seed: u64,

    /// Calibration error standard deviation (dB).
    pub cal_sd_db: f64,
    /// Target-strength error standard deviation (dB).
    pub ts_sd_db: f64,
    /// Distance scale (km) of the random trawl assignment kernel.
    pub assignment_scale: f64,

    pub plot_width: usize,
    pub plot_height: usize,

    pub report: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_problems: Option<PathBuf>,
}

impl RunConfig {
    /// Directory holding this survey's files (`<data_root>/<survey>`).
    pub fn survey_dir(&self) -> PathBuf {
        self.data_root.join(&self.survey)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            survey: String::new(),
            data_root: PathBuf::from("."),
            resolution: 10.0,
            scaling_classes: vec!["SS1".to_string()],
            max_transect: 200,
            nlags: 10,
            maxlag: 200.0,
            range_steps: 40,
            ntrials: 500,
            kl_bins: 20,
            nreplicates: 500,
            nboot: 1000,
            km2nmi: 1.0 / 1.852,
            seed: 42,
            cal_sd_db: 0.1,
            ts_sd_db: 0.14,
            assignment_scale: 20.0,
            plot_width: 72,
            plot_height: 18,
            report: None,
            export_results: None,
            export_problems: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_set_all_contains_every_source() {
        let all = ErrorSet::all();
        for source in ErrorSource::ALL {
            assert!(all.contains(source), "{} missing", source.label());
        }
        assert!(!ErrorSet::none().contains(ErrorSource::Spatial));
    }

    #[test]
    fn age_label_is_zero_padded() {
        assert_eq!(age_label(NON_TARGET_AGE), "00");
        assert_eq!(age_label(7), "07");
        assert_eq!(age_label(12), "12");
    }
}
