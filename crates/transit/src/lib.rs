//! # fleetguard-transit
//!
//! Booking domain and live-position simulation for intercity bus trips.
//!
//! ## Features
//!
//! - **Schedules**: departure/arrival from service date and clock times,
//!   including trips that arrive after midnight
//! - **Bookings**: trip availability, reservation ordering and validation
//! - **Tracking**: constant-speed position estimate along a route polyline
//! - **Pluggable networking**: bring your own geocoder and router
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use fleetguard_transit::prelude::*;
//! use geo::Point;
//!
//! let schedule = TripSchedule::from_service_day(
//!     "Bogotá", "Tunja", "2024-05-10", "08:00", "10:30",
//! ).unwrap();
//!
//! let route = Arc::new(RoutePath::new(vec![
//!     Point::new(-74.0721, 4.7110),
//!     Point::new(-73.3678, 5.5353),
//! ]));
//!
//! let estimator = TripEstimator::for_schedule(route, &schedule, 100.0).unwrap();
//! let snapshot = estimator.snapshot_at(schedule.departure()).unwrap();
//! assert_eq!(snapshot.traveled_km, 0.0);
//! ```

pub mod identifiers;
pub mod models;
pub mod network;
pub mod spatial;
pub mod tracking;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{
        reservation::*, schedule::TripSchedule, trip::*, types::*,
    };
    pub use crate::network::traits::*;
    pub use crate::tracking::{
        PositionSnapshot, RoutePath, TripEstimator, TripProgress, TripTracker,
    };
}

pub use prelude::*;

// Geometry types appear throughout the public API
pub use geo;
