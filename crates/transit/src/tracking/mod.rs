//! Live bus-position simulation.

pub mod estimator;
pub mod route;

pub use estimator::{PositionSnapshot, TripEstimator, TripProgress, TripTracker, ARRIVAL_TOLERANCE};
pub use route::RoutePath;
