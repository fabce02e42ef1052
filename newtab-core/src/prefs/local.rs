use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::warn;

use super::{
    PrefError, PrefKey, PrefMap, PrefValue, PreferenceBackend, read_if_exists, replace_file,
};

type RawTable = BTreeMap<String, String>;

#[derive(Debug)]
enum Backing {
    File(PathBuf),
    Memory(RawTable),
}

/// Fallback storage that only knows strings, like a browser's `localStorage`.
///
/// Every value is written as text and decoded leniently on the way out, so a
/// hand-edited or corrupted entry reads as absent instead of failing.
#[derive(Debug)]
pub struct LocalStore {
    backing: Mutex<Backing>,
}

impl LocalStore {
    pub const NAME: &'static str = "local-storage";

    /// Storage backed by a TOML table of strings at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Mutex::new(Backing::File(path.into())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Mutex::new(Backing::Memory(RawTable::new())),
        }
    }
}

fn parse(contents: &str) -> Result<RawTable, toml::de::Error> {
    let table: toml::Table = toml::from_str(contents)?;

    // Non-string entries were not written by us; ignore them.
    Ok(table
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect())
}

fn merge(raw: &mut RawTable, values: &PrefMap) {
    for (key, value) in values {
        raw.insert(key.as_str().to_string(), value.encode());
    }
}

#[async_trait]
impl PreferenceBackend for LocalStore {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn get(&self, keys: &[PrefKey]) -> Result<PrefMap, PrefError> {
        let backing = self.backing.lock().await;
        let raw = match &*backing {
            Backing::Memory(raw) => raw.clone(),
            Backing::File(path) => {
                let contents = read_if_exists(path).await.map_err(|e| read_error(path, e))?;
                match contents {
                    Some(contents) => parse(&contents).map_err(|e| read_error(path, e))?,
                    None => RawTable::new(),
                }
            }
        };

        Ok(keys
            .iter()
            .filter_map(|key| {
                let value = PrefValue::decode(key.kind(), raw.get(key.as_str())?)?;
                Some((*key, value))
            })
            .collect())
    }

    async fn set(&self, values: &PrefMap) -> Result<(), PrefError> {
        let mut backing = self.backing.lock().await;
        let path = match &mut *backing {
            Backing::Memory(raw) => {
                merge(raw, values);
                return Ok(());
            }
            Backing::File(path) => path.as_path(),
        };

        // A half-written or hand-mangled file must not block writes.
        let contents = read_if_exists(path).await.map_err(|e| read_error(path, e))?;
        let mut raw = match contents.as_deref().map(parse).transpose() {
            Ok(raw) => raw.unwrap_or_default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Discarding unreadable local storage");
                RawTable::new()
            }
        };
        merge(&mut raw, values);

        let contents = toml::to_string(&raw).map_err(|e| write_error(path, e))?;
        replace_file(path, contents.as_bytes())
            .await
            .map_err(|e| write_error(path, e))
    }
}

fn read_error(path: &Path, e: impl std::fmt::Display) -> PrefError {
    PrefError::Read {
        backend: LocalStore::NAME,
        reason: format!("{}: {e}", path.display()),
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> PrefError {
    PrefError::Write {
        backend: LocalStore::NAME,
        reason: format!("{}: {e}", path.display()),
    }
}
