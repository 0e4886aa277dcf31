//! Survey file ingest.
//!
//! Every table is read strictly:
//! - a missing file or header is an input error (exit code 2)
//! - the first unparsable row fails the load, naming file and line
//! - a required table with no rows is insufficient data (exit code 3)
//!
//! Nothing is skipped silently; a survey either loads completely or not at all.

use std::fs::File;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{
    AcousticRecord, AgeLengthRecord, GridCell, LengthWeightRecord, ScalingRecord, SurveyData, SurveyDomain,
    TrawlLocation,
};
use crate::error::AppError;
use crate::io::preprocess::{
    ACOUSTICS_PROJECTED_CSV, TRAWLS_PROJECTED_CSV, domain_grid_file_name, projected_domain_polygon,
};

pub const SCALING_CSV: &str = "scaling.csv";
pub const AGE_LENGTH_CSV: &str = "age_length.csv";
pub const LENGTH_WEIGHT_CSV: &str = "length_weight.csv";

/// Read every row of a headed CSV file into `T`.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        let row = result.map_err(|e| AppError::input(format!("{}: line {line}: {e}", path.display())))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Like [`read_csv`], but an empty table is an error.
pub fn read_required_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let rows = read_csv(path)?;
    if rows.is_empty() {
        return Err(AppError::insufficient(format!("'{}' has no data rows.", path.display())));
    }
    Ok(rows)
}

/// Write rows (with a header) to a CSV file, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}

/// Load the preprocessed survey tables from `survey_dir`.
///
/// Expects the intermediates written by
/// [`preprocess_survey_data`](crate::io::preprocess_survey_data) at the same
/// `resolution`.
pub fn read_survey_files(survey_dir: &Path, resolution: f64) -> Result<SurveyData, AppError> {
    let acoustics: Vec<AcousticRecord> = read_required_csv(&survey_dir.join(ACOUSTICS_PROJECTED_CSV))?;
    let scaling: Vec<ScalingRecord> = read_required_csv(&survey_dir.join(SCALING_CSV))?;
    let age_length: Vec<AgeLengthRecord> = read_required_csv(&survey_dir.join(AGE_LENGTH_CSV))?;
    let length_weight: Vec<LengthWeightRecord> = read_required_csv(&survey_dir.join(LENGTH_WEIGHT_CSV))?;
    let trawl_locations: Vec<TrawlLocation> = read_required_csv(&survey_dir.join(TRAWLS_PROJECTED_CSV))?;

    let grid_path = survey_dir.join(domain_grid_file_name(resolution));
    let cells: Vec<GridCell> = read_csv(&grid_path)?;
    if cells.is_empty() {
        return Err(AppError::insufficient(format!(
            "Survey domain has no grid cells at {resolution} km ('{}').",
            grid_path.display()
        )));
    }
    let (_, polygon) = projected_domain_polygon(survey_dir)?;

    log::debug!(
        "Loaded {} acoustic, {} scaling, {} age-length, {} length-weight, {} trawl rows; {} grid cells",
        acoustics.len(),
        scaling.len(),
        age_length.len(),
        length_weight.len(),
        trawl_locations.len(),
        cells.len()
    );

    Ok(SurveyData {
        acoustics,
        scaling,
        age_length,
        length_weight,
        trawl_locations,
        domain: SurveyDomain {
            polygon,
            cells,
            resolution,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bad_row_names_file_and_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AGE_LENGTH_CSV);
        fs::write(&path, "length,age\n10.0,1\n11.0,x\n").unwrap();

        let err = read_csv::<AgeLengthRecord>(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("age_length.csv"));
        assert!(err.message().contains("line 3"));
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv::<AgeLengthRecord>(&dir.path().join("nope.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_required_table_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LENGTH_WEIGHT_CSV);
        fs::write(&path, "length,weight\n").unwrap();
        let err = read_required_csv::<LengthWeightRecord>(&path).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn written_rows_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.csv");
        let cells = vec![GridCell { x: 10.0, y: -20.0 }, GridCell { x: 0.0, y: 5.5 }];
        write_csv(&path, &cells).unwrap();
        assert_eq!(read_csv::<GridCell>(&path).unwrap(), cells);
    }
}
