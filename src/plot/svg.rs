//! SVG charts for the HTML report, drawn with plotters.
//!
//! Charts carry no text (no font backend is compiled in); the report puts
//! titles and scales next to each image instead.

use plotters::prelude::*;

use crate::domain::{ExponentialVariogram, GridCell, VariogramPoint};
use crate::error::AppError;
use crate::models::predict_gamma;

/// Colour stops (dark blue to yellow) used for heatmaps.
const RAMP: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Colour for `u` in `[0, 1]` on the heatmap ramp.
pub fn ramp_color(u: f64) -> RGBColor {
    let u = if u.is_finite() { u.clamp(0.0, 1.0) } else { 0.0 };
    let pos = u * (RAMP.len() - 1) as f64;
    let i = (pos.floor() as usize).min(RAMP.len() - 2);
    let f = pos - i as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
    let (a, b) = (RAMP[i], RAMP[i + 1]);
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

fn draw_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::numerical(format!("Failed to draw SVG chart: {e}"))
}

/// Heatmap of one value per grid cell, scaled from 0 to `vmax`.
pub fn render_field_svg(
    cells: &[GridCell],
    values: &[f64],
    resolution: f64,
    vmax: f64,
    size: (u32, u32),
) -> Result<String, AppError> {
    if cells.is_empty() || cells.len() != values.len() {
        return Err(AppError::numerical("Heatmap needs one value per grid cell."));
    }
    let half = resolution / 2.0;
    let x0 = cells.iter().map(|c| c.x).fold(f64::INFINITY, f64::min) - half;
    let x1 = cells.iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max) + half;
    let y0 = cells.iter().map(|c| c.y).fold(f64::INFINITY, f64::min) - half;
    let y1 = cells.iter().map(|c| c.y).fold(f64::NEG_INFINITY, f64::max) + half;
    let vmax = if vmax > 0.0 { vmax } else { 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(4)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?;
        chart
            .draw_series(cells.iter().zip(values).map(|(c, &v)| {
                Rectangle::new(
                    [(c.x - half, c.y - half), (c.x + half, c.y + half)],
                    ramp_color(v / vmax).filled(),
                )
            }))
            .map_err(draw_err)?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

/// Empirical semivariance (dots) with the fitted model (line).
pub fn render_variogram_svg(
    empirical: &[VariogramPoint],
    model: &ExponentialVariogram,
    size: (u32, u32),
) -> Result<String, AppError> {
    let h_max = empirical.iter().map(|p| p.lag).fold(0.0_f64, f64::max).max(1e-9);
    let n = 100;
    let curve: Vec<(f64, f64)> = (0..=n)
        .map(|i| {
            let h = h_max * i as f64 / n as f64;
            (h, predict_gamma(model, h))
        })
        .collect();
    let g_max = empirical
        .iter()
        .map(|p| p.gamma)
        .chain(curve.iter().map(|&(_, g)| g))
        .filter(|g| g.is_finite())
        .fold(0.0_f64, f64::max);
    let g_max = if g_max > 0.0 { g_max * 1.05 } else { 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .build_cartesian_2d(0.0..h_max * 1.02, 0.0..g_max)
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(curve, RGBColor(59, 82, 139).stroke_width(2)))
            .map_err(draw_err)?;
        chart
            .draw_series(
                empirical
                    .iter()
                    .map(|p| Circle::new((p.lag, p.gamma), 4, RGBColor(200, 60, 40).filled())),
            )
            .map_err(draw_err)?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_match_stops() {
        assert_eq!(ramp_color(0.0), RGBColor(68, 1, 84));
        assert_eq!(ramp_color(1.0), RGBColor(253, 231, 37));
        assert_eq!(ramp_color(f64::NAN), RGBColor(68, 1, 84));
    }

    #[test]
    fn heatmap_draws_one_rect_per_cell() {
        let cells = vec![GridCell { x: 0.0, y: 0.0 }, GridCell { x: 10.0, y: 0.0 }, GridCell { x: 0.0, y: 10.0 }];
        let svg = render_field_svg(&cells, &[0.0, 5.0, 10.0], 10.0, 10.0, (120, 120)).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.matches("<rect").count() >= cells.len());
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let cells = vec![GridCell { x: 0.0, y: 0.0 }];
        assert!(render_field_svg(&cells, &[], 10.0, 1.0, (50, 50)).is_err());
    }

    #[test]
    fn variogram_svg_has_points() {
        let empirical = vec![
            VariogramPoint { lag: 5.0, gamma: 2.0, npairs: 3 },
            VariogramPoint { lag: 15.0, gamma: 4.0, npairs: 3 },
        ];
        let model = ExponentialVariogram { nugget: 1.0, psill: 3.0, range: 8.0 };
        let svg = render_variogram_svg(&empirical, &model, (200, 150)).unwrap();
        assert!(svg.contains("<circle"));
        assert!(svg.contains("<polyline"));
    }
}
