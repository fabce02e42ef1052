use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{ffi::OsString, fs, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    i18n::Language,
    location::{
        CachedGeolocator, DEFAULT_IP_LOOKUP_URL, GeoOptions, Geolocator, IpGeolocator,
        LocationResolver,
    },
    prefs::{LocalStore, PreferenceStore},
};

/// Environment variable through which a host hands over its durable storage.
pub const EXTENSION_STORAGE_ENV: &str = "NEWTAB_EXTENSION_STORAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoProvider {
    /// No live geolocation; only stored coordinates are used.
    #[default]
    None,
    /// Coarse lookup by public IP address.
    Ip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub provider: GeoProvider,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_age_secs: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            provider: GeoProvider::None,
            endpoint: DEFAULT_IP_LOOKUP_URL.to_string(),
            timeout_ms: 4_000,
            max_age_secs: 5 * 60,
        }
    }
}

impl GeolocationConfig {
    pub fn options(&self) -> GeoOptions {
        GeoOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            maximum_age: Duration::from_secs(self.max_age_secs),
        }
    }
}

/// Host configuration stored on disk.
///
/// Example TOML:
/// language = "es"
/// extension_storage = "/home/me/.mozilla/newtab/storage.json"
///
/// [geolocation]
/// provider = "ip"
/// timeout_ms = 4000
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Locale tag such as "es" or "en_US". Falls back to `LC_ALL`/`LANG`.
    pub language: Option<String>,

    /// Durable storage file provided by the host, if any.
    pub extension_storage: Option<PathBuf>,

    pub geolocation: GeolocationConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "newtab", "newtab")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Where the string-only fallback store keeps its data.
    pub fn local_storage_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("local_storage.toml"))
    }

    /// Active language: explicit setting, then the process locale.
    pub fn language(&self) -> Language {
        self.language_with(|var| std::env::var(var).ok())
    }

    fn language_with(&self, env: impl Fn(&str) -> Option<String>) -> Language {
        self.language
            .clone()
            .or_else(|| {
                ["LC_ALL", "LANG"]
                    .into_iter()
                    .find_map(|var| env(var).filter(|v| !v.is_empty()))
            })
            .map(|locale| Language::from_locale(&locale))
            .unwrap_or_default()
    }

    /// Host storage location; the environment overrides the file setting.
    pub fn extension_storage(&self) -> Option<PathBuf> {
        self.extension_storage_with(std::env::var_os(EXTENSION_STORAGE_ENV))
    }

    fn extension_storage_with(&self, env: Option<OsString>) -> Option<PathBuf> {
        env.filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.extension_storage.clone())
    }

    /// Probe the storage capabilities and open the winning backend.
    pub fn preference_store(&self) -> Result<PreferenceStore> {
        let local = LocalStore::at(Self::local_storage_path()?);
        Ok(PreferenceStore::probe(self.extension_storage(), local))
    }

    pub fn location_resolver(&self) -> LocationResolver {
        let geolocator: Option<Arc<dyn Geolocator>> = match self.geolocation.provider {
            GeoProvider::None => None,
            GeoProvider::Ip => {
                let ip: Arc<dyn Geolocator> =
                    Arc::new(IpGeolocator::new(self.geolocation.endpoint.clone()));
                let cached: Arc<dyn Geolocator> = Arc::new(CachedGeolocator::new(ip));
                Some(cached)
            }
        };

        LocationResolver::new(geolocator, self.geolocation.options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = Config::from_toml("").expect("empty config parses");

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.geolocation.provider, GeoProvider::None);
        assert_eq!(cfg.geolocation.options(), GeoOptions::default());
    }

    #[test]
    fn partial_geolocation_table_keeps_other_defaults() {
        let cfg = Config::from_toml(
            r#"
            language = "es_ES"

            [geolocation]
            provider = "ip"
            timeout_ms = 1500
            "#,
        )
        .expect("config parses");

        assert_eq!(cfg.language(), Language::Spanish);
        assert_eq!(cfg.geolocation.provider, GeoProvider::Ip);
        assert_eq!(cfg.geolocation.options().timeout, Duration::from_millis(1500));
        assert_eq!(cfg.geolocation.max_age_secs, 300);
        assert_eq!(cfg.geolocation.endpoint, DEFAULT_IP_LOOKUP_URL);
    }

    #[test]
    fn unknown_geo_provider_is_rejected() {
        let err = Config::from_toml("[geolocation]\nprovider = \"gps\"").unwrap_err();
        assert!(err.to_string().contains("unknown variant"));
    }

    #[test]
    fn env_storage_path_overrides_file_setting() {
        let cfg = Config {
            extension_storage: Some(PathBuf::from("/from/file/storage.json")),
            ..Config::default()
        };

        assert_eq!(
            cfg.extension_storage_with(Some("/from/env/storage.json".into())),
            Some(PathBuf::from("/from/env/storage.json"))
        );
        assert_eq!(
            cfg.extension_storage_with(Some(OsString::new())),
            Some(PathBuf::from("/from/file/storage.json"))
        );
        assert_eq!(
            cfg.extension_storage_with(None),
            Some(PathBuf::from("/from/file/storage.json"))
        );
        assert_eq!(Config::default().extension_storage_with(None), None);
    }

    #[test]
    fn language_falls_back_to_lc_all_then_lang() {
        let cfg = Config::default();

        let env = |all: Option<&str>, lang: Option<&str>| {
            let all = all.map(str::to_string);
            let lang = lang.map(str::to_string);
            move |var: &str| match var {
                "LC_ALL" => all.clone(),
                "LANG" => lang.clone(),
                _ => None,
            }
        };

        assert_eq!(cfg.language_with(env(Some("es_ES.UTF-8"), Some("en_US"))), Language::Spanish);
        assert_eq!(cfg.language_with(env(Some(""), Some("es_MX"))), Language::Spanish);
        assert_eq!(cfg.language_with(env(None, Some("en_GB"))), Language::English);
        assert_eq!(cfg.language_with(env(None, None)), Language::English);

        let explicit = Config {
            language: Some("en".into()),
            ..Config::default()
        };
        assert_eq!(explicit.language_with(env(Some("es"), None)), Language::English);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let cfg = Config {
            language: Some("en".into()),
            extension_storage: Some(PathBuf::from("/tmp/newtab/storage.json")),
            geolocation: GeolocationConfig {
                provider: GeoProvider::Ip,
                ..GeolocationConfig::default()
            },
        };

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        assert_eq!(Config::from_toml(&text).expect("parse"), cfg);
    }
}
