//! Distance and interpolation utilities.

pub mod queries;

pub use queries::{cumulative_distances_km, haversine_distance, haversine_km, lerp};
