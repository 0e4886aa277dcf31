//! Projection and gridding of the raw survey files.
//!
//! Reads the geographic tables, projects them to km about the survey domain
//! centre and writes the intermediates `read_survey_files` loads. Outputs are
//! overwritten, so running twice at one resolution gives identical files.

use std::path::Path;

use crate::domain::{
    AcousticRecord, GeoVertex, GridCell, RawAcousticRecord, RawTrawlLocation, TrawlLocation,
};
use crate::error::AppError;
use crate::io::ingest::{read_required_csv, write_csv};
use crate::math::{Projection, grid_in_polygon};

pub const DOMAIN_CSV: &str = "domain.csv";
pub const ACOUSTICS_CSV: &str = "acoustics.csv";
pub const TRAWLS_CSV: &str = "trawl_locations.csv";
pub const ACOUSTICS_PROJECTED_CSV: &str = "acoustics_projected.csv";
pub const TRAWLS_PROJECTED_CSV: &str = "trawl_locations_projected.csv";

/// Name of the grid file for one resolution (`surveydomain_10km.csv`).
pub fn domain_grid_file_name(resolution: f64) -> String {
    format!("surveydomain_{resolution}km.csv")
}

/// Row counts of the written intermediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub acoustics: usize,
    pub trawl_locations: usize,
    pub grid_cells: usize,
}

/// Survey projection and the projected domain polygon.
pub fn projected_domain_polygon(survey_dir: &Path) -> Result<(Projection, Vec<(f64, f64)>), AppError> {
    let vertices: Vec<GeoVertex> = read_required_csv(&survey_dir.join(DOMAIN_CSV))?;
    if vertices.len() < 3 {
        return Err(AppError::input(format!(
            "{DOMAIN_CSV}: a polygon needs at least 3 vertices (got {}).",
            vertices.len()
        )));
    }
    let lonlat: Vec<(f64, f64)> = vertices.iter().map(|v| (v.lon, v.lat)).collect();
    let projection = Projection::centered_on(&lonlat)
        .ok_or_else(|| AppError::input(format!("{DOMAIN_CSV}: no vertices.")))?;
    let polygon = lonlat.iter().map(|&(lon, lat)| projection.project(lon, lat)).collect();
    Ok((projection, polygon))
}

/// Project the raw acoustic and trawl tables and grid the domain at `resolution` km.
pub fn preprocess_survey_data(survey_dir: &Path, resolution: f64) -> Result<PreprocessSummary, AppError> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(AppError::input(format!(
            "Grid resolution must be finite and > 0 (got {resolution})."
        )));
    }
    if !survey_dir.is_dir() {
        return Err(AppError::input(format!(
            "Survey directory '{}' does not exist.",
            survey_dir.display()
        )));
    }

    let (projection, polygon) = projected_domain_polygon(survey_dir)?;

    let raw: Vec<RawAcousticRecord> = read_required_csv(&survey_dir.join(ACOUSTICS_CSV))?;
    let acoustics: Vec<AcousticRecord> = raw
        .into_iter()
        .map(|r| {
            let (x, y) = projection.project(r.lon, r.lat);
            AcousticRecord {
                transect: r.transect,
                class: r.class,
                lon: r.lon,
                lat: r.lat,
                x,
                y,
                nasc: r.nasc,
            }
        })
        .collect();

    let raw: Vec<RawTrawlLocation> = read_required_csv(&survey_dir.join(TRAWLS_CSV))?;
    let trawls: Vec<TrawlLocation> = raw
        .into_iter()
        .map(|r| {
            let (x, y) = projection.project(r.lon, r.lat);
            TrawlLocation {
                haul: r.haul,
                lon: r.lon,
                lat: r.lat,
                x,
                y,
            }
        })
        .collect();

    let cells: Vec<GridCell> = grid_in_polygon(&polygon, resolution)
        .into_iter()
        .map(|(x, y)| GridCell { x, y })
        .collect();
    if cells.is_empty() {
        return Err(AppError::insufficient(format!(
            "Survey domain contains no {resolution} km grid cells."
        )));
    }

    write_csv(&survey_dir.join(ACOUSTICS_PROJECTED_CSV), &acoustics)?;
    write_csv(&survey_dir.join(TRAWLS_PROJECTED_CSV), &trawls)?;
    write_csv(&survey_dir.join(domain_grid_file_name(resolution)), &cells)?;

    Ok(PreprocessSummary {
        acoustics: acoustics.len(),
        trawl_locations: trawls.len(),
        grid_cells: cells.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_raw(dir: &Path) {
        fs::write(dir.join(DOMAIN_CSV), "lon,lat\n-1.0,50.0\n1.0,50.0\n1.0,51.0\n-1.0,51.0\n").unwrap();
        fs::write(
            dir.join(ACOUSTICS_CSV),
            "transect,class,lon,lat,nasc\n1,SS1,0.0,50.5,12.5\n2,SS1,0.5,50.2,0.0\n",
        )
        .unwrap();
        fs::write(dir.join(TRAWLS_CSV), "haul,lon,lat\n7,0.1,50.4\n").unwrap();
    }

    #[test]
    fn grid_file_name_uses_plain_resolution() {
        assert_eq!(domain_grid_file_name(10.0), "surveydomain_10km.csv");
        assert_eq!(domain_grid_file_name(2.5), "surveydomain_2.5km.csv");
    }

    #[test]
    fn preprocessing_writes_projected_tables_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_raw(dir.path());

        let first = preprocess_survey_data(dir.path(), 10.0).unwrap();
        assert_eq!(first.acoustics, 2);
        assert_eq!(first.trawl_locations, 1);
        assert!(first.grid_cells > 0);
        let grid = fs::read_to_string(dir.path().join("surveydomain_10km.csv")).unwrap();
        let projected = fs::read_to_string(dir.path().join(ACOUSTICS_PROJECTED_CSV)).unwrap();

        let second = preprocess_survey_data(dir.path(), 10.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(grid, fs::read_to_string(dir.path().join("surveydomain_10km.csv")).unwrap());
        assert_eq!(projected, fs::read_to_string(dir.path().join(ACOUSTICS_PROJECTED_CSV)).unwrap());

        // The domain centre projects to the origin.
        let rows: Vec<AcousticRecord> = read_required_csv(&dir.path().join(ACOUSTICS_PROJECTED_CSV)).unwrap();
        assert!(rows[0].x.abs() < 1e-9);
        assert!(rows[0].y.abs() < 1e-9);
    }

    #[test]
    fn missing_directory_is_an_input_error() {
        let err = preprocess_survey_data(Path::new("/definitely/not/here"), 10.0).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
