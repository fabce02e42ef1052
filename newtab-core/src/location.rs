//! Coordinates for the forecast request: a live fix when the host can
//! provide one in time, otherwise whatever the user stored in settings.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Coordinates;

pub const DEFAULT_GEO_TIMEOUT: Duration = Duration::from_secs(4);
pub const DEFAULT_GEO_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Location service errors
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoOptions {
    /// Upper bound on waiting for a fix.
    pub timeout: Duration,
    /// How old a previously obtained fix may be and still be reused.
    pub maximum_age: Duration,
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_GEO_TIMEOUT,
            maximum_age: DEFAULT_GEO_MAX_AGE,
        }
    }
}

/// A live geolocation capability offered by the host.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(&self, options: &GeoOptions) -> Result<Coordinates, LocationError>;
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    geolocator: Option<Arc<dyn Geolocator>>,
    options: GeoOptions,
}

impl LocationResolver {
    pub fn new(geolocator: Option<Arc<dyn Geolocator>>, options: GeoOptions) -> Self {
        Self {
            geolocator,
            options,
        }
    }

    /// Resolver for hosts with no geolocation at all.
    pub fn stored_only() -> Self {
        Self::new(None, GeoOptions::default())
    }

    /// A live fix always wins over stored coordinates. Any geolocation
    /// failure falls back to the stored pair, and only when both halves are
    /// present and finite. Never retries, never errors.
    pub async fn resolve(
        &self,
        stored_lat: Option<f64>,
        stored_lon: Option<f64>,
    ) -> Option<Coordinates> {
        if let Some(geo) = &self.geolocator {
            match tokio::time::timeout(self.options.timeout, geo.current_position(&self.options))
                .await
            {
                Ok(Ok(coords)) => {
                    debug!(lat = coords.lat, lon = coords.lon, "Using live geolocation");
                    return Some(coords);
                }
                Ok(Err(err)) => warn!(error = %err, "Geolocation failed, using stored location"),
                Err(_) => warn!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    "Geolocation timed out, using stored location"
                ),
            }
        }

        match (stored_lat, stored_lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Coordinates::new(lat, lon))
            }
            _ => None,
        }
    }
}

/// Reuses the last fix of an inner geolocator while it is younger than
/// `GeoOptions::maximum_age`.
#[derive(Debug)]
pub struct CachedGeolocator {
    inner: Arc<dyn Geolocator>,
    last_fix: Mutex<Option<(Instant, Coordinates)>>,
}

impl CachedGeolocator {
    pub fn new(inner: Arc<dyn Geolocator>) -> Self {
        Self {
            inner,
            last_fix: Mutex::new(None),
        }
    }

    fn fresh_fix(&self, maximum_age: Duration) -> Option<Coordinates> {
        let guard = self.last_fix.lock().ok()?;
        let (at, coords) = (*guard)?;
        (at.elapsed() <= maximum_age).then_some(coords)
    }
}

#[async_trait]
impl Geolocator for CachedGeolocator {
    async fn current_position(&self, options: &GeoOptions) -> Result<Coordinates, LocationError> {
        if let Some(coords) = self.fresh_fix(options.maximum_age) {
            debug!("Reusing cached geolocation fix");
            return Ok(coords);
        }

        let coords = self.inner.current_position(options).await?;
        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some((Instant::now(), coords));
        }
        Ok(coords)
    }
}

pub const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json";

/// Coarse, city-level position derived from the machine's public IP.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    endpoint: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

impl IpGeolocator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: Client::new(),
        }
    }
}

impl Default for IpGeolocator {
    fn default() -> Self {
        Self::new(DEFAULT_IP_LOOKUP_URL)
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self, options: &GeoOptions) -> Result<Coordinates, LocationError> {
        let response = self
            .http
            .get(&self.endpoint)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LocationError::Timeout
                } else {
                    LocationError::Other(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "IP lookup returned an error status");
            return Err(LocationError::Unavailable);
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Other(e.to_string()))?;

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(LocationError::Unavailable),
        }
    }
}
