//! ASCII plotting for terminal output and `<pre>` blocks in the report.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - empirical semivariance: `o`
//! - fitted variogram: `-` line
//! - sample map: `.`, `o`, `O`, `@` by NASC quartile of the maximum
//! - box plots: `|` whisker ends, `-` whiskers, `=` box, `M` median

use crate::domain::{AcousticBin, ExponentialVariogram, VariogramPoint};
use crate::math::FiveNumber;
use crate::models::predict_gamma;

/// Render an empirical variogram with its fitted exponential model.
pub fn render_variogram(
    empirical: &[VariogramPoint],
    model: &ExponentialVariogram,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let h_max = empirical.iter().map(|p| p.lag).fold(0.0_f64, f64::max);
    let h_max = if h_max > 0.0 { h_max } else { 1.0 };
    let curve = sample_model(model, h_max, width);

    let (y_min, y_max) = y_range(
        empirical.iter().map(|p| p.gamma).chain(curve.iter().map(|&(_, g)| g)),
    )
    .unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min.min(0.0), y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    draw_curve(&mut grid, &curve, 0.0, h_max, y_min, y_max);
    for p in empirical {
        let x = map_x(p.lag, 0.0, h_max, width);
        let y = map_y(p.gamma, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Variogram: lag=[0.0, {h_max:.1}] km | gamma=[{y_min:.2}, {y_max:.2}]\n"
    ));
    push_grid(&mut out, grid);
    out
}

/// Render the binned acoustic samples as a map, marked by NASC level.
pub fn render_sample_map(bins: &[AcousticBin], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = y_range(bins.iter().map(|b| b.x)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(bins.iter().map(|b| b.y)).unwrap_or((0.0, 1.0));
    let nasc_max = bins.iter().map(|b| b.nasc).fold(0.0_f64, f64::max);

    // Larger values drawn last so they stay visible.
    let mut order: Vec<&AcousticBin> = bins.iter().collect();
    order.sort_by(|a, b| a.nasc.total_cmp(&b.nasc));

    let mut grid = vec![vec![' '; width]; height];
    for b in order {
        let ch = if nasc_max <= 0.0 {
            '.'
        } else {
            match b.nasc / nasc_max {
                u if u > 0.75 => '@',
                u if u > 0.5 => 'O',
                u if u > 0.25 => 'o',
                _ => '.',
            }
        };
        grid[map_y(b.y, y_min, y_max, height)][map_x(b.x, x_min, x_max, width)] = ch;
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Samples: x=[{x_min:.1}, {x_max:.1}] km | y=[{y_min:.1}, {y_max:.1}] km | max NASC={nasc_max:.1}\n"
    ));
    push_grid(&mut out, grid);
    out
}

/// Render horizontal box plots on a shared axis, one row per group.
pub fn render_box_plots(groups: &[(String, FiveNumber)], width: usize) -> String {
    let width = width.max(5);
    let lo = groups.iter().map(|(_, f)| f.min).fold(f64::INFINITY, f64::min);
    let hi = groups.iter().map(|(_, f)| f.max).fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = match (lo.is_finite(), hi.is_finite()) {
        (true, true) if hi > lo => (lo, hi),
        (true, true) => (lo, lo + 1.0),
        _ => (0.0, 1.0),
    };
    let label_width = groups.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("Range: [{lo:.2}, {hi:.2}]\n"));
    for (label, f) in groups {
        let mut track = vec![' '; width];
        let p = |v: f64| map_x(v, lo, hi, width);
        for c in &mut track[p(f.min)..=p(f.max)] {
            *c = '-';
        }
        for c in &mut track[p(f.q1)..=p(f.q3)] {
            *c = '=';
        }
        track[p(f.min)] = '|';
        track[p(f.max)] = '|';
        track[p(f.median)] = 'M';

        let line = format!("{label:<label_width$} {}", track.into_iter().collect::<String>());
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn sample_model(model: &ExponentialVariogram, h_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let h = h_max * i as f64 / (n as f64 - 1.0);
            (h, predict_gamma(model, h))
        })
        .collect()
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min_y = min_y.min(v);
        max_y = max_y.max(v);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
