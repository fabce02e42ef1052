use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CACHE_CONTROL, PRAGMA},
};
use serde::Deserialize;
use std::fmt::Debug;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::model::{Coordinates, CurrentConditions, Units};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Wind speed is always requested in km/h; it is not user-configurable.
pub const WIND_SPEED_UNIT: &str = "kmh";

#[derive(Debug, Error)]
pub enum WeatherError {
    /// The forecast API answered with a non-success status.
    #[error("Forecast request failed with HTTP status {0}")]
    Status(u16),

    /// The request never produced a response.
    #[error("Forecast request failed: {0}")]
    Transport(String),

    /// The response did not contain usable current conditions.
    #[error("Failed to parse forecast response: {0}")]
    Parse(String),
}

impl WeatherError {
    pub fn status(&self) -> Option<u16> {
        match self {
            WeatherError::Status(code) => Some(*code),
            _ => None,
        }
    }

    /// Status and transport failures; everything but a bad payload.
    pub fn is_network(&self) -> bool {
        !matches!(self, WeatherError::Parse(_))
    }
}

#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Current conditions at `coords`, with temperature in `units`.
    /// `api_base` replaces the default endpoint when given.
    async fn fetch_current(
        &self,
        coords: Coordinates,
        units: Units,
        api_base: Option<&str>,
    ) -> Result<CurrentConditions, WeatherError>;
}

/// Open-Meteo forecast API.
#[derive(Debug, Clone, Default)]
pub struct OpenMeteoClient {
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<RawCurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct RawCurrentWeather {
    temperature: f64,
    weathercode: i32,
    windspeed: f64,
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    fn endpoint(api_base: Option<&str>) -> &str {
        match api_base.map(str::trim) {
            Some(base) if !base.is_empty() => base,
            _ => DEFAULT_FORECAST_URL,
        }
    }

    fn query(coords: Coordinates, units: Units) -> [(&'static str, String); 5] {
        [
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("current_weather", "true".to_string()),
            ("temperature_unit", units.as_str().to_string()),
            ("windspeed_unit", WIND_SPEED_UNIT.to_string()),
        ]
    }

    fn parse(body: &str, units: Units) -> Result<CurrentConditions, WeatherError> {
        let parsed: ForecastResponse =
            serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        let current = parsed.current_weather.ok_or_else(|| {
            WeatherError::Parse("No current_weather object in response".to_string())
        })?;

        Ok(CurrentConditions {
            temperature: current.temperature,
            weather_code: current.weathercode,
            wind_speed: current.windspeed,
            units,
        })
    }
}

#[async_trait]
impl WeatherClient for OpenMeteoClient {
    #[instrument(skip(self), fields(lat = %coords.lat, lon = %coords.lon))]
    async fn fetch_current(
        &self,
        coords: Coordinates,
        units: Units,
        api_base: Option<&str>,
    ) -> Result<CurrentConditions, WeatherError> {
        let url = Self::endpoint(api_base);
        debug!(url, %units, "Fetching current weather");

        let res = self
            .http
            .get(url)
            .query(&Self::query(coords, units))
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        if !status.is_success() {
            debug!(%status, body = %truncate_body(&body), "Forecast request rejected");
            return Err(WeatherError::Status(status.as_u16()));
        }

        Self::parse(&body, units)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
