//! Class filtering and spatial binning of acoustic records.

use std::collections::BTreeMap;

use crate::domain::{AcousticBin, AcousticRecord};
use crate::error::AppError;

#[derive(Default)]
struct BinSum {
    x: f64,
    y: f64,
    lon: f64,
    lat: f64,
    nasc: f64,
    n: usize,
}

/// Keep records of the accepted classes on in-survey transects and average
/// them within each (transect, class, bin) cell.
///
/// Bins are the coordinates rounded to the nearest multiple of `resolution`.
/// Output is sorted by (class, transect, bin_x, bin_y).
pub fn filter_and_bin(
    acoustics: &[AcousticRecord],
    classes: &[String],
    max_transect: u32,
    resolution: f64,
) -> Result<Vec<AcousticBin>, AppError> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(AppError::input(format!(
            "Binning resolution must be finite and > 0 (got {resolution})."
        )));
    }

    let mut groups: BTreeMap<(String, u32, i64, i64), BinSum> = BTreeMap::new();
    let mut dropped_transects = 0usize;
    for r in acoustics {
        if !classes.iter().any(|c| *c == r.class) {
            continue;
        }
        if r.transect >= max_transect {
            dropped_transects += 1;
            continue;
        }
        let bin_x = (r.x / resolution).round() as i64;
        let bin_y = (r.y / resolution).round() as i64;
        let sum = groups.entry((r.class.clone(), r.transect, bin_x, bin_y)).or_default();
        sum.x += r.x;
        sum.y += r.y;
        sum.lon += r.lon;
        sum.lat += r.lat;
        sum.nasc += r.nasc;
        sum.n += 1;
    }
    if dropped_transects > 0 {
        log::debug!("Dropped {dropped_transects} records on transects >= {max_transect}");
    }

    Ok(groups
        .into_iter()
        .map(|((class, transect, bin_x, bin_y), s)| {
            let n = s.n as f64;
            AcousticBin {
                transect,
                class,
                bin_x,
                bin_y,
                x: s.x / n,
                y: s.y / n,
                lon: s.lon / n,
                lat: s.lat / n,
                nasc: s.nasc / n,
                n_intervals: s.n,
            }
        })
        .collect())
}
