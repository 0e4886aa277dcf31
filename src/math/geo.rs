//! Planar geometry for survey coordinates.
//!
//! Survey extents are a few hundred kilometres, so an equirectangular
//! projection about the survey centre is accurate enough for binning and
//! variogram distances.

/// Kilometres per degree of latitude.
const KM_PER_DEG_LAT: f64 = 110.574;
/// Kilometres per degree of longitude at the equator.
const KM_PER_DEG_LON: f64 = 111.32;

/// Equirectangular projection centred on `(lon0, lat0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub lon0: f64,
    pub lat0: f64,
}

impl Projection {
    /// Centre the projection on the mean of the given vertices.
    pub fn centered_on(vertices: &[(f64, f64)]) -> Option<Self> {
        if vertices.is_empty() {
            return None;
        }
        let n = vertices.len() as f64;
        let lon0 = vertices.iter().map(|v| v.0).sum::<f64>() / n;
        let lat0 = vertices.iter().map(|v| v.1).sum::<f64>() / n;
        Some(Self { lon0, lat0 })
    }

    /// Project `(lon, lat)` in degrees to `(x, y)` in km.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon - self.lon0) * KM_PER_DEG_LON * self.lat0.to_radians().cos();
        let y = (lat - self.lat0) * KM_PER_DEG_LAT;
        (x, y)
    }
}

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Even-odd ray casting test.
pub fn point_in_polygon(p: (f64, f64), polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > p.1) != (yj > p.1) {
            let x_cross = xj + (p.1 - yj) * (xi - xj) / (yi - yj);
            if p.0 < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Centres of the `resolution`-spaced grid cells that fall inside `polygon`.
///
/// Cell centres sit on multiples of `resolution`, so grids at the same
/// resolution line up with the acoustic bins.
pub fn grid_in_polygon(polygon: &[(f64, f64)], resolution: f64) -> Vec<(f64, f64)> {
    if polygon.len() < 3 || !(resolution.is_finite() && resolution > 0.0) {
        return Vec::new();
    }
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in polygon {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    let i0 = (x_min / resolution).floor() as i64;
    let i1 = (x_max / resolution).ceil() as i64;
    let j0 = (y_min / resolution).floor() as i64;
    let j1 = (y_max / resolution).ceil() as i64;

    let mut cells = Vec::new();
    for j in j0..=j1 {
        for i in i0..=i1 {
            let p = (i as f64 * resolution, j as f64 * resolution);
            if point_in_polygon(p, polygon) {
                cells.push(p);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]
    }

    #[test]
    fn projection_maps_centre_to_origin() {
        let proj = Projection::centered_on(&[(-124.0, 44.0), (-122.0, 46.0)]).unwrap();
        let (x, y) = proj.project(-123.0, 45.0);
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);

        let (_, y1) = proj.project(-123.0, 46.0);
        assert!((y1 - KM_PER_DEG_LAT).abs() < 1e-9);
    }

    #[test]
    fn point_in_polygon_square() {
        let poly = square(10.0);
        assert!(point_in_polygon((5.0, 5.0), &poly));
        assert!(!point_in_polygon((15.0, 5.0), &poly));
        assert!(!point_in_polygon((5.0, -0.1), &poly));
    }

    #[test]
    fn grid_counts_interior_cells() {
        // Centres at 10, 20 and 30 in each direction fall inside.
        let poly = vec![(1.0, 1.0), (39.0, 1.0), (39.0, 39.0), (1.0, 39.0)];
        let cells = grid_in_polygon(&poly, 10.0);
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|&c| point_in_polygon(c, &poly)));
    }
}
