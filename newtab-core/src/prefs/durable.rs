use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    PrefError, PrefKey, PrefMap, PrefValue, PreferenceBackend, read_if_exists, replace_file,
};

type Document = Map<String, Value>;

#[derive(Debug)]
enum Backing {
    File(PathBuf),
    Memory(Document),
}

/// Host-provided storage. Values keep their native JSON type, so booleans and
/// numbers round-trip without any string decoding.
#[derive(Debug)]
pub struct DurableStore {
    backing: Mutex<Backing>,
}

impl DurableStore {
    pub const NAME: &'static str = "extension-storage";

    /// Storage backed by a JSON document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Mutex::new(Backing::File(path.into())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backing: Mutex::new(Backing::Memory(Document::new())),
        }
    }

    /// Capability probe: the storage is usable only if the host already
    /// created the directory that holds it.
    pub fn detect(path: PathBuf) -> Option<Self> {
        let present = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        };

        if present {
            Some(Self::open(path))
        } else {
            debug!(path = %path.display(), "Extension storage not present");
            None
        }
    }
}

fn parse(contents: &str) -> Result<Document, serde_json::Error> {
    if contents.trim().is_empty() {
        return Ok(Document::new());
    }
    serde_json::from_str(contents)
}

fn merge(doc: &mut Document, values: &PrefMap) -> Result<(), serde_json::Error> {
    for (key, value) in values {
        doc.insert(key.as_str().to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

#[async_trait]
impl PreferenceBackend for DurableStore {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn get(&self, keys: &[PrefKey]) -> Result<PrefMap, PrefError> {
        let backing = self.backing.lock().await;
        let doc = match &*backing {
            Backing::Memory(doc) => doc.clone(),
            Backing::File(path) => {
                let contents = read_if_exists(path).await.map_err(|e| read_error(path, e))?;
                match contents {
                    Some(contents) => parse(&contents).map_err(|e| read_error(path, e))?,
                    None => Document::new(),
                }
            }
        };

        Ok(keys
            .iter()
            .filter_map(|key| {
                let raw = doc.get(key.as_str())?.clone();
                let value = serde_json::from_value::<PrefValue>(raw).ok()?;
                Some((*key, value.conform(key.kind())?))
            })
            .collect())
    }

    async fn set(&self, values: &PrefMap) -> Result<(), PrefError> {
        let mut backing = self.backing.lock().await;
        let path = match &mut *backing {
            Backing::Memory(doc) => {
                return merge(doc, values).map_err(|e| PrefError::Write {
                    backend: Self::NAME,
                    reason: e.to_string(),
                });
            }
            Backing::File(path) => path.as_path(),
        };

        // A half-written document must not block writes.
        let contents = read_if_exists(path).await.map_err(|e| read_error(path, e))?;
        let mut doc = match contents.as_deref().map(parse).transpose() {
            Ok(doc) => doc.unwrap_or_default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Discarding unreadable extension storage");
                Document::new()
            }
        };
        merge(&mut doc, values).map_err(|e| write_error(path, e))?;

        let json = serde_json::to_string_pretty(&doc).map_err(|e| write_error(path, e))?;
        replace_file(path, json.as_bytes())
            .await
            .map_err(|e| write_error(path, e))
    }
}

fn read_error(path: &Path, e: impl std::fmt::Display) -> PrefError {
    PrefError::Read {
        backend: DurableStore::NAME,
        reason: format!("{}: {e}", path.display()),
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> PrefError {
    PrefError::Write {
        backend: DurableStore::NAME,
        reason: format!("{}: {e}", path.display()),
    }
}
