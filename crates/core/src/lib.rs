pub mod api;
pub mod config;
pub mod error;
pub mod routing;
pub mod session;
pub mod task;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::GraphQlClient;
pub use config::FleetGuardConfig;
pub use error::{CoreError, Result};

// Re-export the domain crate
pub use fleetguard_transit as transit;
