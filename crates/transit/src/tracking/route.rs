//! Route polyline with precomputed cumulative distances.

use geo::{LineString, Point};

use crate::spatial::queries::{cumulative_distances_km, lerp};

/// Immutable road path between a trip's origin and destination.
///
/// `cumulative_km[i]` is the distance along the path from the first point to
/// `points[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePath {
    points: Vec<Point>,
    cumulative_km: Vec<f64>,
}

impl RoutePath {
    pub fn new(points: Vec<Point>) -> Self {
        let cumulative_km = cumulative_distances_km(&points);
        Self {
            points,
            cumulative_km,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn total_km(&self) -> f64 {
        self.cumulative_km.last().copied().unwrap_or(0.0)
    }

    pub fn to_line_string(&self) -> LineString {
        self.points.iter().copied().collect()
    }

    /// Index of the first point lying strictly beyond `km` along the path.
    ///
    /// Only meaningful for `0 <= km < total_km()`, where the result is in
    /// `1..len()`.
    fn segment_end(&self, km: f64) -> usize {
        self.cumulative_km.partition_point(|&c| c <= km)
    }

    /// Point at a given distance along the path.
    ///
    /// Distances are clamped to the path span, so the result is always a path
    /// vertex or an interpolation between two adjacent vertices.
    pub fn point_at(&self, km: f64) -> Option<Point> {
        let first = self.first()?;
        if km <= 0.0 {
            return Some(first);
        }
        if km >= self.total_km() {
            return self.last();
        }

        let end = self.segment_end(km);
        let start = end - 1;
        let segment_km = self.cumulative_km[end] - self.cumulative_km[start];
        let fraction = (km - self.cumulative_km[start]) / segment_km;

        Some(lerp(self.points[start], self.points[end], fraction))
    }

    /// Split the path at a distance into the traveled and remaining trails.
    ///
    /// The traveled trail ends at the interpolated point and the remaining
    /// trail starts there, so drawing both reproduces the full path.
    pub fn split_at(&self, km: f64) -> (Vec<Point>, Vec<Point>) {
        let (Some(first), Some(last)) = (self.first(), self.last()) else {
            return (Vec::new(), Vec::new());
        };
        if km <= 0.0 {
            return (vec![first], self.points.clone());
        }
        if km >= self.total_km() {
            return (self.points.clone(), vec![last]);
        }

        let end = self.segment_end(km);
        let Some(at) = self.point_at(km) else {
            return (Vec::new(), Vec::new());
        };

        let mut traveled = self.points[..end].to_vec();
        traveled.push(at);

        let mut remaining = Vec::with_capacity(self.points.len() - end + 1);
        remaining.push(at);
        remaining.extend_from_slice(&self.points[end..]);

        (traveled, remaining)
    }
}

impl From<LineString> for RoutePath {
    fn from(line: LineString) -> Self {
        Self::new(line.points().collect())
    }
}
