//! Network abstractions for route lookup.

pub mod traits;

pub use traits::{Geocoder, RouteLookup, RouteService};
