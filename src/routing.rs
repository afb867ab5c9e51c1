//! Driving distance and route geometry from an external provider.
//!
//! Kept outside the prediction path: a provider failure is reported as
//! [`RouteUnavailableError`] and never turned into an ETA.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RouteUnavailableError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub distance_km: f64,
    pub points: Vec<LatLng>,
}

pub trait RouteProvider: Send + Sync {
    fn route(&self, start: LatLng, end: LatLng) -> BoxFuture<'_, Result<Route, RouteUnavailableError>>;
}

pub const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
const DIRECTIONS_PATH: &str = "/v2/directions/driving-car/geojson";

/// OpenRouteService directions client. Without an API key every call fails
/// with [`RouteUnavailableError::NotConfigured`].
pub struct OpenRouteService {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenRouteService {
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RouteUnavailableError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, start: LatLng, end: LatLng) -> Result<Route, RouteUnavailableError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(RouteUnavailableError::NotConfigured)?;

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, DIRECTIONS_PATH))
            .header(reqwest::header::AUTHORIZATION, key)
            .json(&request_body(start, end))
            .send()
            .await?;

        let status = resp.status();
        tracing::debug!(status = status.as_u16(), "routing provider responded");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RouteUnavailableError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await?;
        parse_geojson_route(&body)
    }
}

impl RouteProvider for OpenRouteService {
    fn route(&self, start: LatLng, end: LatLng) -> BoxFuture<'_, Result<Route, RouteUnavailableError>> {
        Box::pin(self.fetch(start, end))
    }
}

/// The provider takes `[lng, lat]` pairs.
fn request_body(start: LatLng, end: LatLng) -> Value {
    json!({ "coordinates": [[start.lng, start.lat], [end.lng, end.lat]] })
}

/// Extracts distance (metres → km) and the `[lng, lat]` geometry of the first
/// feature, returning points as lat/lng.
pub fn parse_geojson_route(body: &Value) -> Result<Route, RouteUnavailableError> {
    let malformed = |what: &str| RouteUnavailableError::MalformedResponse(what.to_string());

    let feature = body
        .pointer("/features/0")
        .ok_or_else(|| malformed("no features in response"))?;
    let metres = feature
        .pointer("/properties/summary/distance")
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed("missing summary distance"))?;
    let coords = feature
        .pointer("/geometry/coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing geometry coordinates"))?;

    let points = coords
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([lng, lat, ..]) => match (lat.as_f64(), lng.as_f64()) {
                (Some(lat), Some(lng)) => Ok(LatLng::new(lat, lng)),
                _ => Err(malformed("non-numeric coordinate")),
            },
            _ => Err(malformed("coordinate is not a pair")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Route {
        distance_km: metres / 1000.0,
        points,
    })
}
