//! HTTP implementations of the transit crate's
//! [`Geocoder`](fleetguard_transit::Geocoder) and
//! [`RouteService`](fleetguard_transit::RouteService) traits.
//!
//! Both are single request/response lookups without retry.

mod nominatim;
mod osrm;

use fleetguard_transit::TransitError;
use reqwest::Url;

use crate::config::FleetGuardConfig;
use crate::error::{CoreError, Result};

pub use nominatim::NominatimGeocoder;
pub use osrm::OsrmRouter;

fn parse_base_url(name: &str, url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| CoreError::Configuration(format!("invalid {name} {url}: {e}")))
}

fn network_error(service: &str, e: reqwest::Error) -> TransitError {
    TransitError::Network(format!("{service}: {e}"))
}

/// Build both lookups from one configuration, sharing an HTTP client.
pub fn from_config(
    http: reqwest::Client,
    config: &FleetGuardConfig,
) -> Result<(NominatimGeocoder, OsrmRouter)> {
    let geocoder = NominatimGeocoder::new(http.clone(), &config.geocoder_url)?;
    let router = OsrmRouter::new(http, &config.router_url)?;
    Ok((geocoder, router))
}
