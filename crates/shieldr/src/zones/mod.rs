//! Nearby safety zones.
//!
//! [`ZoneProximityResolver`] answers "what safety-relevant places are near
//! this point?". It asks a live [`ZoneSource`] (Overpass in production) once,
//! bounded by a timeout. If that request fails in any way, it ranks the
//! bundled [`catalog::FALLBACK_CATALOG`] by haversine distance instead.
//!
//! Live results keep upstream order and are not capped here (Overpass is
//! already told `out center N`). Fallback results are sorted by distance
//! and capped. Which path answered is carried by [`Resolution`].

pub mod catalog;
pub mod geo;
pub mod overpass;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ZonesConfig;
use crate::error::{Error, Result};

use self::catalog::FALLBACK_CATALOG;
use self::overpass::OverpassClient;

/// Safety classification of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    /// A place to go for help (hospital, police, shelter).
    Safe,
    /// A hazardous area (industrial land).
    Danger,
    /// An area best avoided (construction).
    Avoid,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Safe => "safe",
            Self::Danger => "danger",
            Self::Avoid => "avoid",
        })
    }
}

/// A categorized point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Identifier, unique within one response only.
    pub id: i64,
    /// Safety classification.
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    /// Display name.
    pub name: String,
    /// Human-readable category, e.g. "Hospital" or "Industrial area".
    pub category: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Distance from the query point in metres (fallback results only).
    #[serde(
        rename = "distance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub distance_m: Option<f64>,
}

impl Zone {
    /// Whether both coordinates are finite numbers.
    #[must_use]
    pub fn has_valid_point(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A validated proximity query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoQuery {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Search radius in metres, always finite and positive.
    pub radius_m: f64,
}

impl GeoQuery {
    /// Build a query from numeric input.
    ///
    /// A missing, non-finite or non-positive radius is replaced by
    /// `default_radius_m`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if `lat` or `lng` is not finite.
    pub fn new(lat: f64, lng: f64, radius_m: Option<f64>, default_radius_m: f64) -> Result<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(Error::InvalidQuery);
        }

        let radius_m = radius_m
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(default_radius_m);

        Ok(Self { lat, lng, radius_m })
    }

    /// Build a query from raw query-string values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if `lat` or `lng` is missing or does
    /// not parse as a finite number.
    pub fn parse(
        lat: Option<&str>,
        lng: Option<&str>,
        radius: Option<&str>,
        default_radius_m: f64,
    ) -> Result<Self> {
        let lat = parse_number(lat).ok_or(Error::InvalidQuery)?;
        let lng = parse_number(lng).ok_or(Error::InvalidQuery)?;
        Self::new(lat, lng, parse_number(radius), default_radius_m)
    }
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
}

/// Failure of a live zone source.
///
/// These never reach callers of the resolver; they become a
/// [`FallbackReason`].
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or the connection failed.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete in time.
    #[error("upstream timed out")]
    Timeout,

    /// The upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}

/// Why a resolution was answered from the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    /// No live source is configured.
    Disabled,
    /// The live source exceeded the timeout.
    Timeout,
    /// The live source could not be reached.
    Unavailable(String),
    /// The live source answered with a non-success status.
    Status(u16),
    /// The live response could not be parsed.
    Malformed(String),
}

impl From<UpstreamError> for FallbackReason {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unavailable(message) => Self::Unavailable(message),
            UpstreamError::Timeout => Self::Timeout,
            UpstreamError::Status(code) => Self::Status(code),
            UpstreamError::MalformedResponse(message) => Self::Malformed(message),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "live source disabled"),
            Self::Timeout => write!(f, "live source timed out"),
            Self::Unavailable(message) => write!(f, "live source unavailable: {message}"),
            Self::Status(code) => write!(f, "live source returned status {code}"),
            Self::Malformed(message) => write!(f, "malformed live response: {message}"),
        }
    }
}

/// The outcome of one resolution, tagged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Zones from the live source, in upstream order.
    Live {
        /// The zones.
        zones: Vec<Zone>,
    },
    /// Zones from the static catalog, nearest first.
    Fallback {
        /// The zones.
        zones: Vec<Zone>,
        /// Why the live source was not used.
        reason: FallbackReason,
    },
}

impl Resolution {
    /// The resolved zones.
    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        match self {
            Self::Live { zones } | Self::Fallback { zones, .. } => zones,
        }
    }

    /// Take the resolved zones.
    #[must_use]
    pub fn into_zones(self) -> Vec<Zone> {
        match self {
            Self::Live { zones } | Self::Fallback { zones, .. } => zones,
        }
    }

    /// Whether the live source answered.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// The fallback reason, if the static catalog answered.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Live { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    /// `"live"` or `"fallback"`.
    #[must_use]
    pub fn source_label(&self) -> &'static str {
        if self.is_live() {
            "live"
        } else {
            "fallback"
        }
    }
}

/// A live provider of nearby zones.
///
/// Implementations perform at most one upstream request per call and do not
/// retry. The resolver enforces the overall timeout.
#[async_trait]
pub trait ZoneSource: Send + Sync + fmt::Debug {
    /// Name of this source (for logging).
    fn name(&self) -> &'static str;

    /// Fetch zones around the query point.
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] describing why no zones could be produced.
    async fn fetch(&self, query: &GeoQuery) -> std::result::Result<Vec<Zone>, UpstreamError>;
}

/// Tunables for [`ZoneProximityResolver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    /// Bound on a single live request.
    pub timeout: Duration,
    /// Cap on fallback results.
    pub fallback_limit: usize,
    /// Radius used when a query gives none.
    pub default_radius_m: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&ZonesConfig::default())
    }
}

impl From<&ZonesConfig> for ResolverSettings {
    fn from(config: &ZonesConfig) -> Self {
        Self {
            timeout: config.upstream_timeout(),
            fallback_limit: config.fallback_limit,
            default_radius_m: config.default_radius_m,
        }
    }
}

/// Resolves nearby zones, preferring a live source over the static catalog.
#[derive(Debug, Clone)]
pub struct ZoneProximityResolver {
    source: Option<Arc<dyn ZoneSource>>,
    settings: ResolverSettings,
}

impl ZoneProximityResolver {
    /// Create a resolver over an optional live source.
    #[must_use]
    pub fn new(source: Option<Arc<dyn ZoneSource>>, settings: ResolverSettings) -> Self {
        Self { source, settings }
    }

    /// Create a resolver that only uses the static catalog.
    #[must_use]
    pub fn offline(settings: ResolverSettings) -> Self {
        Self::new(None, settings)
    }

    /// Create a resolver from configuration, wiring up Overpass when enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &ZonesConfig) -> Result<Self> {
        let settings = ResolverSettings::from(config);
        if !config.live_enabled {
            return Ok(Self::offline(settings));
        }

        let client = OverpassClient::from_config(config)?;
        Ok(Self::new(Some(Arc::new(client)), settings))
    }

    /// The resolver's settings.
    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve zones around raw coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] if `lat` or `lng` is not finite. No
    /// request is made in that case.
    pub async fn resolve(&self, lat: f64, lng: f64, radius_m: Option<f64>) -> Result<Resolution> {
        let query = GeoQuery::new(lat, lng, radius_m, self.settings.default_radius_m)?;
        Ok(self.resolve_query(&query).await)
    }

    /// Resolve zones for an already validated query.
    pub async fn resolve_query(&self, query: &GeoQuery) -> Resolution {
        let Some(source) = &self.source else {
            return self.fallback(query, FallbackReason::Disabled);
        };

        debug!(
            "Querying {} for zones near {}, {} (radius {}m)",
            source.name(),
            query.lat,
            query.lng,
            query.radius_m
        );

        let outcome = tokio::time::timeout(self.settings.timeout, source.fetch(query))
            .await
            .unwrap_or(Err(UpstreamError::Timeout));

        match outcome {
            Ok(mut zones) => {
                zones.retain(Zone::has_valid_point);
                info!("Received {} zones from {}", zones.len(), source.name());
                Resolution::Live { zones }
            }
            Err(err) => {
                warn!("{} failed, using fallback catalog: {err}", source.name());
                self.fallback(query, err.into())
            }
        }
    }

    /// Resolve from the static catalog only.
    #[must_use]
    pub fn fallback(&self, query: &GeoQuery, reason: FallbackReason) -> Resolution {
        let zones = FALLBACK_CATALOG.nearby(query, self.settings.fallback_limit);
        info!("Using {} nearby fallback zones ({reason})", zones.len());
        Resolution::Fallback { zones, reason }
    }
}
