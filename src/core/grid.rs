//! Candidate facility grid generation

use geo::{BoundingRect, Contains, MultiPolygon, Point};

use crate::core::coords::Coordinate;

/// Share of bounding-box grid points expected to fall inside a state
const EXPECTED_FILL_RATIO: f64 = 0.5;

/// Evenly spaced grid over `boundary`, keeping points strictly inside it
///
/// Longitude spacing is scaled by `cos(mid latitude)` so cells come out
/// roughly square on the ground. The result holds about `target_points`
/// coordinates, latitude-major, south to north.
pub fn generate_grid_points(boundary: &MultiPolygon<f64>, target_points: usize) -> Vec<Coordinate> {
    let Some(bounds) = boundary.bounding_rect() else {
        return Vec::new();
    };
    let (min, max) = (bounds.min(), bounds.max());

    let lat_correction = ((min.y + max.y) / 2.0).to_radians().cos();
    let width = (max.x - min.x) * lat_correction;
    let height = max.y - min.y;
    if width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }

    let estimated_total = target_points as f64 / EXPECTED_FILL_RATIO;
    let aspect_ratio = width / height;
    let n_y = (estimated_total / aspect_ratio).sqrt() as usize;
    let n_x = (n_y as f64 * aspect_ratio) as usize;
    log::info!("Creating a grid of {n_x} x {n_y} ({} candidates)", n_x * n_y);

    let xs = linspace(min.x, max.x, n_x);
    let ys = linspace(min.y, max.y, n_y);

    let mut points = Vec::new();
    for &y in &ys {
        for &x in &xs {
            if boundary.contains(&Point::new(x, y)) {
                points.push(Coordinate::new(y, x));
            }
        }
    }

    log::info!("{} candidates fall inside the boundary", points.len());
    points
}

/// `n` evenly spaced values from `start` to `end`, both included
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
