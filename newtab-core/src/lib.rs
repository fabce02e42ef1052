//! Core library for the new tab page.
//!
//! This crate defines:
//! - Typed preferences over interchangeable storage backends
//! - Location resolution with a live-fix-then-stored fallback
//! - The Open-Meteo current weather client
//! - Localized presentation of weather codes and the status-line pipeline
//!
//! It is used by `newtab-cli`, but any host that can supply storage,
//! geolocation and a translator can drive the pipeline.

pub mod client;
pub mod config;
pub mod greeting;
pub mod i18n;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod prefs;
pub mod present;

pub use client::{OpenMeteoClient, WeatherClient, WeatherError};
pub use config::Config;
pub use i18n::{Catalog, Language, Translate};
pub use location::{GeoOptions, Geolocator, LocationError, LocationResolver};
pub use model::{Coordinates, CurrentConditions, PipelineOutcome, Units, WeatherSettings};
pub use pipeline::{StatusLine, WeatherPipeline};
pub use prefs::{PrefKey, PrefValue, PreferenceStore, SettingsUpdate};
