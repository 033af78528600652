//! Pluggable networking traits.
//!
//! External crates implement these to resolve place names and road paths.
//! Returning `Ok(None)` means the service answered but found nothing.

use std::future::Future;
use std::pin::Pin;

use chrono::Duration;
use geo::Point;

use crate::models::types::Result;
use crate::tracking::route::RoutePath;

/// Result of a routing lookup between two points.
#[derive(Clone, Debug)]
pub struct RouteLookup {
    pub path: RoutePath,
    /// Distance reported by the routing service, not the polyline length.
    pub distance_km: f64,
    pub duration: Duration,
}

/// Resolve a place name to coordinates
pub trait Geocoder: Send + Sync {
    fn geocode<'a>(
        &'a self,
        place: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Point>>> + Send + 'a>>;
}

/// Find the road path between two points
pub trait RouteService: Send + Sync {
    fn route<'a>(
        &'a self,
        origin: Point,
        destination: Point,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RouteLookup>>> + Send + 'a>>;
}
