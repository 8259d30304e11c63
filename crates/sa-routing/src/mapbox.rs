//! Mapbox Directions API client.
//!
//! See <https://docs.mapbox.com/api/navigation/directions/>
//!
//! Only the first route's GeoJSON geometry is used; its coordinates are
//! already `[lng, lat]` pairs in travel order.

use async_trait::async_trait;
use sa_core::{Coordinate, TravelProfile};

use crate::{RouteProvider, RoutingError};

/// Public Mapbox API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";

/// Route provider backed by the Mapbox Directions API.
#[derive(Debug, Clone)]
pub struct MapboxRouter {
    client:       reqwest::Client,
    base_url:     String,
    access_token: String,
}

impl MapboxRouter {
    /// Create a client against the public endpoint.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (self-hosted or test server).
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client:       reqwest::Client::new(),
            base_url:     base_url.into().trim_end_matches('/').to_owned(),
            access_token: access_token.into(),
        }
    }

    /// Request URL for a `start → end` query, without the access token.
    pub fn directions_url(&self, start: Coordinate, end: Coordinate, profile: TravelProfile) -> String {
        format!(
            "{}/directions/v5/mapbox/{}/{},{};{},{}",
            self.base_url, profile.as_str(), start.lon, start.lat, end.lon, end.lat
        )
    }
}

#[async_trait]
impl RouteProvider for MapboxRouter {
    async fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
        profile: TravelProfile,
    ) -> Result<Vec<Coordinate>, RoutingError> {
        let resp = self
            .client
            .get(self.directions_url(start, end, profile))
            .query(&[
                ("geometries", "geojson"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RoutingError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp.json().await?;
        let route = parse_response(&body)?;
        log::debug!("mapbox returned {} waypoints for {start} -> {end}", route.len());
        Ok(route)
    }
}

/// Parses a Directions API response body into waypoints.
///
/// # Errors
///
/// [`RoutingError::NoRoute`] when `code != "Ok"` or `routes` is empty;
/// [`RoutingError::Parse`] when the geometry is missing or malformed.
pub fn parse_response(body: &serde_json::Value) -> Result<Vec<Coordinate>, RoutingError> {
    if body["code"].as_str() != Some("Ok") {
        return Err(RoutingError::NoRoute);
    }

    let Some(first) = body["routes"].as_array().and_then(|r| r.first()) else {
        return Err(RoutingError::NoRoute);
    };

    let coords = first["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| RoutingError::Parse("missing routes[0].geometry.coordinates".to_string()))?;

    coords
        .iter()
        .map(|pair| {
            let lon = pair[0].as_f64();
            let lat = pair[1].as_f64();
            match (lon, lat) {
                (Some(lon), Some(lat)) => Ok(Coordinate::new(lon, lat)),
                _ => Err(RoutingError::Parse(format!("bad coordinate pair {pair}"))),
            }
        })
        .collect()
}
