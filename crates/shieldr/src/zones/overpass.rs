//! Overpass API zone source.
//!
//! Builds an Overpass QL query for emergency amenities and hazardous land
//! use around a point, posts it to an interpreter endpoint and maps the
//! returned elements onto [`Zone`]s.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, instrument, Level};

use super::{GeoQuery, UpstreamError, Zone, ZoneSource, ZoneType};
use crate::config::ZonesConfig;
use crate::error::{Error, Result};

/// Amenity values treated as places to seek help.
pub const SAFE_AMENITIES: &[&str] = &["police", "hospital", "fire_station", "shelter"];

/// Name used when an element has neither `name` nor `operator`.
const UNNAMED: &str = "Unnamed area";

/// Build the Overpass QL query for a point and radius.
#[must_use]
pub fn build_query(query: &GeoQuery, result_limit: usize) -> String {
    let around = format!("(around:{},{},{})", query.radius_m, query.lat, query.lng);
    let amenities = SAFE_AMENITIES.join("|");
    format!(
        "[out:json];\n(\n  nwr[\"amenity\"~\"{amenities}\"]{around};\n  nwr[\"landuse\"=\"industrial\"]{around};\n  nwr[\"landuse\"=\"construction\"]{around};\n);\nout center {result_limit};\n"
    )
}

/// Top-level interpreter response.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Returned elements.
    pub elements: Vec<Element>,
}

/// A node, way or relation.
#[derive(Debug, Deserialize)]
pub struct Element {
    /// OSM id.
    pub id: i64,
    /// Latitude (nodes).
    pub lat: Option<f64>,
    /// Longitude (nodes).
    pub lon: Option<f64>,
    /// Centroid (ways and relations with `out center`).
    pub center: Option<Center>,
    /// OSM tags. Values are usually strings; anything else is ignored.
    #[serde(default)]
    pub tags: HashMap<String, serde_json::Value>,
}

/// Centroid reported for non-node elements.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl Element {
    /// The element's own coordinates, else its center.
    #[must_use]
    pub fn point(&self) -> Option<(f64, f64)> {
        let own = self.lat.zip(self.lon);
        let center = self.center.map(|c| (c.lat, c.lon));
        own.or(center)
            .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
    }

    /// Safety classification and category label from the tags.
    #[must_use]
    pub fn classify(&self) -> (ZoneType, String) {
        match self.tag("landuse") {
            Some("industrial") => return (ZoneType::Danger, "Industrial area".to_string()),
            Some("construction") => return (ZoneType::Avoid, "Construction".to_string()),
            _ => {}
        }

        match self.tag("amenity") {
            Some(amenity) => (ZoneType::Safe, amenity.replace('_', " ")),
            None => (ZoneType::Safe, "Safe".to_string()),
        }
    }

    /// Display name from `name`, then `operator`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.tag("name")
            .or_else(|| self.tag("operator"))
            .unwrap_or(UNNAMED)
    }

    /// Convert into a zone; `None` if the element has no usable point.
    #[must_use]
    pub fn into_zone(self) -> Option<Zone> {
        let (lat, lng) = self.point()?;
        let (zone_type, category) = self.classify();
        Some(Zone {
            id: self.id,
            zone_type,
            name: self.display_name().to_string(),
            category,
            lat,
            lng,
            distance_m: None,
        })
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Parse an interpreter response body into zones, in upstream order.
///
/// # Errors
///
/// Returns [`UpstreamError::MalformedResponse`] if the body is not JSON of
/// the expected shape.
pub fn parse_response(body: &[u8]) -> std::result::Result<Vec<Zone>, UpstreamError> {
    let response: OverpassResponse = serde_json::from_slice(body)
        .map_err(|err| UpstreamError::MalformedResponse(err.to_string()))?;

    Ok(response
        .elements
        .into_iter()
        .filter_map(Element::into_zone)
        .collect())
}

/// HTTP client for an Overpass interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    endpoint: String,
    result_limit: usize,
}

impl OverpassClient {
    /// Create a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration, result_limit: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| Error::internal(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            result_limit,
        })
    }

    /// Create a client from the zones configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &ZonesConfig) -> Result<Self> {
        Self::new(
            config.overpass_url.clone(),
            config.upstream_timeout(),
            config.live_result_limit,
        )
    }
}

#[async_trait]
impl ZoneSource for OverpassClient {
    fn name(&self) -> &'static str {
        "overpass"
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    async fn fetch(&self, query: &GeoQuery) -> std::result::Result<Vec<Zone>, UpstreamError> {
        let body = build_query(query, self.result_limit);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let zones = parse_response(&bytes)?;
        debug!("Parsed {} zones from {} bytes", zones.len(), bytes.len());
        Ok(zones)
    }
}

fn map_transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Unavailable(err.to_string())
    }
}
