use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    convert::TryFrom,
    fmt::Debug,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Units, WeatherSettings};

pub mod durable;
pub mod local;

pub use durable::DurableStore;
pub use local::LocalStore;

pub const DEFAULT_USERNAME: &str = "User";
pub const DEFAULT_PROFILE_NAME: &str = "Default Profile";

#[derive(Debug, Error)]
pub enum PrefError {
    #[error("Unknown preference '{0}'")]
    UnknownKey(String),

    #[error("Failed to read preferences from {backend}: {reason}")]
    Read {
        backend: &'static str,
        reason: String,
    },

    #[error("Failed to write preferences to {backend}: {reason}")]
    Write {
        backend: &'static str,
        reason: String,
    },
}

/// Every preference the new tab page knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrefKey {
    Username,
    ProfileName,
    DisableAnimations,
    WeatherEnabled,
    WeatherLatitude,
    WeatherLongitude,
    WeatherUnits,
    WeatherApiBase,
}

/// Shape a preference value is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKind {
    Text,
    Flag,
    Number,
}

impl PrefKey {
    /// Storage key, identical across backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefKey::Username => "username",
            PrefKey::ProfileName => "profile_name",
            PrefKey::DisableAnimations => "disable_animations",
            PrefKey::WeatherEnabled => "weather_enabled",
            PrefKey::WeatherLatitude => "weather_latitude",
            PrefKey::WeatherLongitude => "weather_longitude",
            PrefKey::WeatherUnits => "weather_units",
            PrefKey::WeatherApiBase => "weather_api_base",
        }
    }

    pub const fn all() -> &'static [PrefKey] {
        &[
            PrefKey::Username,
            PrefKey::ProfileName,
            PrefKey::DisableAnimations,
            PrefKey::WeatherEnabled,
            PrefKey::WeatherLatitude,
            PrefKey::WeatherLongitude,
            PrefKey::WeatherUnits,
            PrefKey::WeatherApiBase,
        ]
    }

    pub const fn weather() -> &'static [PrefKey] {
        &[
            PrefKey::WeatherEnabled,
            PrefKey::WeatherLatitude,
            PrefKey::WeatherLongitude,
            PrefKey::WeatherUnits,
            PrefKey::WeatherApiBase,
        ]
    }

    pub fn kind(&self) -> PrefKind {
        match self {
            PrefKey::Username
            | PrefKey::ProfileName
            | PrefKey::WeatherUnits
            | PrefKey::WeatherApiBase => PrefKind::Text,
            PrefKey::DisableAnimations | PrefKey::WeatherEnabled => PrefKind::Flag,
            PrefKey::WeatherLatitude | PrefKey::WeatherLongitude => PrefKind::Number,
        }
    }

    /// Value a read yields before anything was written. Coordinates have none.
    pub fn default_value(&self) -> Option<PrefValue> {
        match self {
            PrefKey::Username => Some(PrefValue::Text(DEFAULT_USERNAME.into())),
            PrefKey::ProfileName => Some(PrefValue::Text(DEFAULT_PROFILE_NAME.into())),
            PrefKey::DisableAnimations | PrefKey::WeatherEnabled => Some(PrefValue::Bool(false)),
            PrefKey::WeatherLatitude | PrefKey::WeatherLongitude => None,
            PrefKey::WeatherUnits => Some(PrefValue::Text(Units::default().as_str().into())),
            PrefKey::WeatherApiBase => Some(PrefValue::Text(String::new())),
        }
    }
}

impl std::fmt::Display for PrefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PrefKey {
    type Error = PrefError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        PrefKey::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| PrefError::UnknownKey(value.to_string()))
    }
}

/// A stored primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PrefValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrefValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PrefValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Keep the value only if it has the shape `kind` expects.
    pub fn conform(self, kind: PrefKind) -> Option<Self> {
        let fits = match (&self, kind) {
            (PrefValue::Text(s), PrefKind::Text) => !s.is_empty(),
            (PrefValue::Bool(_), PrefKind::Flag) => true,
            (PrefValue::Number(n), PrefKind::Number) => n.is_finite(),
            _ => false,
        };
        fits.then_some(self)
    }

    /// Lenient decode of a string-only backend value.
    ///
    /// Flags are `true` only for the exact text `"true"`; numbers take the
    /// longest numeric prefix; empty text is treated as absent.
    pub fn decode(kind: PrefKind, raw: &str) -> Option<Self> {
        match kind {
            PrefKind::Text => (!raw.is_empty()).then(|| PrefValue::Text(raw.to_string())),
            PrefKind::Flag => Some(PrefValue::Bool(raw == "true")),
            PrefKind::Number => parse_float_prefix(raw).map(PrefValue::Number),
        }
    }

    /// Representation used by string-only backends.
    pub fn encode(&self) -> String {
        match self {
            PrefValue::Bool(b) => b.to_string(),
            PrefValue::Number(n) => n.to_string(),
            PrefValue::Text(s) => s.clone(),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        PrefValue::Bool(value)
    }
}

impl From<f64> for PrefValue {
    fn from(value: f64) -> Self {
        PrefValue::Number(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::Text(value.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        PrefValue::Text(value)
    }
}

/// Longest numeric prefix, e.g. `"12.5abc"` -> 12.5, scanned the way
/// `parseFloat` does: sign, digits, fraction, optional exponent.
fn parse_float_prefix(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let skip_digits = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut end = skip_digits(sign);
    let mut mantissa = end - sign;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = skip_digits(end + 1);
        mantissa += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = skip_digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Contents of `path`, or `None` if it does not exist yet.
async fn read_if_exists(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write to a sibling temp file, then rename it over `path`.
async fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await
}

pub type PrefMap = BTreeMap<PrefKey, PrefValue>;

/// A key/value backend. Missing keys are simply absent from the returned map.
#[async_trait]
pub trait PreferenceBackend: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn get(&self, keys: &[PrefKey]) -> Result<PrefMap, PrefError>;

    async fn set(&self, values: &PrefMap) -> Result<(), PrefError>;
}

/// All eight preferences as written from the settings form.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsUpdate {
    pub username: String,
    pub profile_name: String,
    pub disable_animations: bool,
    pub weather_enabled: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub units: Units,
    pub api_base: String,
}

impl SettingsUpdate {
    /// Normalised write set. Absent coordinates are left out so a previously
    /// stored location is never erased.
    pub fn to_prefs(&self) -> PrefMap {
        let non_empty = |s: &str, default: &str| {
            let s = s.trim();
            if s.is_empty() { default.to_string() } else { s.to_string() }
        };

        let mut map = PrefMap::new();
        map.insert(PrefKey::Username, non_empty(&self.username, DEFAULT_USERNAME).into());
        map.insert(
            PrefKey::ProfileName,
            non_empty(&self.profile_name, DEFAULT_PROFILE_NAME).into(),
        );
        map.insert(PrefKey::DisableAnimations, self.disable_animations.into());
        map.insert(PrefKey::WeatherEnabled, self.weather_enabled.into());
        if let Some(lat) = self.latitude.filter(|v| v.is_finite()) {
            map.insert(PrefKey::WeatherLatitude, lat.into());
        }
        if let Some(lon) = self.longitude.filter(|v| v.is_finite()) {
            map.insert(PrefKey::WeatherLongitude, lon.into());
        }
        map.insert(PrefKey::WeatherUnits, self.units.as_str().into());
        map.insert(PrefKey::WeatherApiBase, self.api_base.trim().into());
        map
    }
}

/// Typed front for whichever backend the capability probe selected.
#[derive(Debug)]
pub struct PreferenceStore {
    backend: Box<dyn PreferenceBackend>,
}

impl PreferenceStore {
    pub fn new(backend: Box<dyn PreferenceBackend>) -> Self {
        Self { backend }
    }

    /// Use the host's durable storage when it is present, otherwise the
    /// local fallback. Decided once; callers never see which one won.
    pub fn probe(extension_storage: Option<PathBuf>, local: LocalStore) -> Self {
        let backend: Box<dyn PreferenceBackend> =
            match extension_storage.and_then(DurableStore::detect) {
                Some(durable) => Box::new(durable),
                None => Box::new(local),
            };
        debug!(backend = backend.name(), "Selected preference backend");
        Self::new(backend)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Stored values for `keys`. A failing backend reads as "nothing stored".
    pub async fn get(&self, keys: &[PrefKey]) -> PrefMap {
        match self.backend.get(keys).await {
            Ok(map) => map,
            Err(err) => {
                warn!(error = %err, "Preference read failed, using defaults");
                PrefMap::new()
            }
        }
    }

    /// Stored value, or the key's default.
    pub async fn read(&self, key: PrefKey) -> Option<PrefValue> {
        self.get(&[key]).await.remove(&key).or_else(|| key.default_value())
    }

    pub async fn set(&self, values: &PrefMap) -> Result<(), PrefError> {
        self.backend.set(values).await
    }

    pub async fn save(&self, update: &SettingsUpdate) -> Result<(), PrefError> {
        self.set(&update.to_prefs()).await
    }

    pub async fn username(&self) -> String {
        self.read_text(PrefKey::Username, DEFAULT_USERNAME).await
    }

    pub async fn profile_name(&self) -> String {
        self.read_text(PrefKey::ProfileName, DEFAULT_PROFILE_NAME).await
    }

    pub async fn disable_animations(&self) -> bool {
        self.read(PrefKey::DisableAnimations)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub async fn weather_settings(&self) -> WeatherSettings {
        let mut stored = self.get(PrefKey::weather()).await;
        let mut take = |key: PrefKey| stored.remove(&key);

        WeatherSettings {
            enabled: take(PrefKey::WeatherEnabled)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            latitude: take(PrefKey::WeatherLatitude).and_then(|v| v.as_f64()),
            longitude: take(PrefKey::WeatherLongitude).and_then(|v| v.as_f64()),
            units: Units::from_stored(take(PrefKey::WeatherUnits).as_ref().and_then(|v| v.as_str())),
            api_base: take(PrefKey::WeatherApiBase)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
        }
    }

    async fn read_text(&self, key: PrefKey, default: &str) -> String {
        self.read(key)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}
