use std::future::Future;
use std::pin::Pin;

use fleetguard_transit::{Geocoder, TransitError};
use futures_util::FutureExt;
use geo::Point;
use reqwest::Url;
use serde::Deserialize;

use super::{network_error, parse_base_url};
use crate::error::Result;

/// Geocoder speaking the Nominatim `search` API.
#[derive(Clone, Debug)]
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base: parse_base_url("geocoder url", base_url)?,
        })
    }

    fn search_url(&self, place: &str) -> fleetguard_transit::Result<Url> {
        let mut url = self
            .base
            .join("search")
            .map_err(|e| TransitError::InvalidData(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("q", place)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        Ok(url)
    }

    async fn lookup(&self, place: &str) -> fleetguard_transit::Result<Option<Point>> {
        let place = place.trim();
        if place.is_empty() {
            return Ok(None);
        }

        let response = self
            .http
            .get(self.search_url(place)?)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| network_error("geocoder", e))?;
        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| TransitError::InvalidData(format!("geocoder response: {e}")))?;

        let Some(found) = places.into_iter().next() else {
            tracing::info!(place, "no geocoding result");
            return Ok(None);
        };

        let parse = |v: &str| {
            v.parse::<f64>()
                .map_err(|e| TransitError::InvalidData(format!("coordinate {v:?}: {e}")))
        };
        let point = Point::new(parse(&found.lon)?, parse(&found.lat)?);
        tracing::debug!(place, lng = point.x(), lat = point.y(), "geocoded");
        Ok(Some(point))
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode<'a>(
        &'a self,
        place: &'a str,
    ) -> Pin<Box<dyn Future<Output = fleetguard_transit::Result<Option<Point>>> + Send + 'a>> {
        self.lookup(place).boxed()
    }
}
