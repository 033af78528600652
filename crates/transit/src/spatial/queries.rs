//! Distance and interpolation helpers for route polylines.
//!
//! Uses Haversine formula for accurate distances on Earth's surface.

use geo::{HaversineDistance, Point};

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    p1.haversine_distance(&p2)
}

/// Haversine distance between two points in kilometers
pub fn haversine_km(p1: Point, p2: Point) -> f64 {
    haversine_distance(p1, p2) / 1000.0
}

/// Running distance (km) from the first point to every point of a polyline.
///
/// The result has one entry per point and starts at `0.0`.
pub fn cumulative_distances_km(points: &[Point]) -> Vec<f64> {
    let mut total = 0.0;
    let mut cumulative = Vec::with_capacity(points.len());

    if let Some(first) = points.first() {
        cumulative.push(0.0);
        let mut prev = *first;
        for &p in &points[1..] {
            total += haversine_km(prev, p);
            cumulative.push(total);
            prev = p;
        }
    }

    cumulative
}

/// Straight interpolation in lat/lng space between two points.
pub fn lerp(p1: Point, p2: Point, fraction: f64) -> Point {
    Point::new(
        p1.x() + (p2.x() - p1.x()) * fraction,
        p1.y() + (p2.y() - p1.y()) * fraction,
    )
}
