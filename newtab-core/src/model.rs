use serde::{Deserialize, Serialize};

use crate::i18n::{self, Translate};

/// Temperature unit system. Wind speed is always km/h regardless of this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Celsius => "celsius",
            Units::Fahrenheit => "fahrenheit",
        }
    }

    /// Decode a stored raw value. Anything that is not exactly `"fahrenheit"`
    /// (including a missing value) is Celsius.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            Some("fahrenheit") => Units::Fahrenheit,
            _ => Units::Celsius,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Units::Celsius => "°C",
            Units::Fahrenheit => "°F",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latitude/longitude in degrees. Not range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Snapshot of the weather preferences, built fresh for every pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSettings {
    pub enabled: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub units: Units,
    /// Empty means "use the default forecast endpoint".
    pub api_base: String,
}

impl WeatherSettings {
    pub fn api_base(&self) -> Option<&str> {
        let trimmed = self.api_base.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Current conditions as returned by the forecast API.
///
/// `temperature` is already expressed in `units`; it is never converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub weather_code: i32,
    /// km/h
    pub wind_speed: f64,
    pub units: Units,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Disabled,
    NoLocation,
    /// Progress hint emitted right before the network call. Never final.
    Fetching,
    Ready {
        icon: &'static str,
        temperature_text: String,
        message: String,
    },
    Unavailable,
}

impl PipelineOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineOutcome::Fetching)
    }

    /// Text for the status line under the greeting.
    pub fn render(&self, tr: &dyn Translate) -> String {
        match self {
            PipelineOutcome::Disabled => tr.translate(i18n::WEATHER_OFF),
            PipelineOutcome::NoLocation => tr.translate(i18n::SET_LOCATION_TO_SEE_WEATHER),
            PipelineOutcome::Fetching => tr.translate(i18n::FETCHING_WEATHER),
            PipelineOutcome::Ready {
                icon,
                temperature_text,
                message,
            } => format!("{icon} {temperature_text} — {message}"),
            PipelineOutcome::Unavailable => tr.translate(i18n::WEATHER_UNAVAILABLE),
        }
    }
}
