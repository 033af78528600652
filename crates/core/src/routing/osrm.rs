use std::future::Future;
use std::pin::Pin;

use chrono::Duration;
use fleetguard_transit::{RouteLookup, RoutePath, RouteService, TransitError};
use futures_util::FutureExt;
use geo::{LineString, Point};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{network_error, parse_base_url};
use crate::error::Result;

/// Router speaking the OSRM `route/v1/driving` API.
#[derive(Clone, Debug)]
pub struct OsrmRouter {
    http: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: geojson::Geometry,
    /// meters
    distance: f64,
    /// seconds
    duration: f64,
}

impl OsrmRouter {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base: parse_base_url("router url", base_url)?,
        })
    }

    fn route_url(&self, origin: Point, destination: Point) -> fleetguard_transit::Result<Url> {
        let path = format!(
            "route/v1/driving/{},{};{},{}",
            origin.x(),
            origin.y(),
            destination.x(),
            destination.y()
        );
        let mut url = self
            .base
            .join(&path)
            .map_err(|e| TransitError::InvalidData(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson")
            .append_pair("steps", "false");
        Ok(url)
    }

    async fn lookup(
        &self,
        origin: Point,
        destination: Point,
    ) -> fleetguard_transit::Result<Option<RouteLookup>> {
        let response = self
            .http
            .get(self.route_url(origin, destination)?)
            .send()
            .await
            .map_err(|e| network_error("router", e))?;

        // OSRM reports "no route" with a 400 and a JSON body.
        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransitError::Network(format!("router: HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| network_error("router", e))?;
        let body: OsrmResponse = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(TransitError::Network(format!("router: HTTP {status}")));
            }
            Err(e) => {
                return Err(TransitError::InvalidData(format!("router response: {e}")));
            }
        };

        if body.code != "Ok" {
            tracing::info!(code = %body.code, message = ?body.message, "no route");
            return Ok(None);
        }
        let Some(route) = body.routes.into_iter().next() else {
            return Ok(None);
        };

        let line = LineString::<f64>::try_from(route.geometry)
            .map_err(|e| TransitError::InvalidData(format!("route geometry: {e}")))?;
        let path = RoutePath::from(line);
        if path.is_empty() {
            return Ok(None);
        }

        tracing::debug!(
            points = path.len(),
            distance_km = route.distance / 1000.0,
            "route found"
        );
        Ok(Some(RouteLookup {
            path,
            distance_km: route.distance / 1000.0,
            duration: Duration::milliseconds((route.duration * 1000.0).round() as i64),
        }))
    }
}

impl RouteService for OsrmRouter {
    fn route<'a>(
        &'a self,
        origin: Point,
        destination: Point,
    ) -> Pin<Box<dyn Future<Output = fleetguard_transit::Result<Option<RouteLookup>>> + Send + 'a>>
    {
        self.lookup(origin, destination).boxed()
    }
}
