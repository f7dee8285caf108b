//! Durable key/value cache kept in a single JSON file.
//!
//! Used as the offline fallback for games and player facts, and to keep the
//! in-progress game across restarts. Every write replaces the file atomically
//! (temporary file, then rename).

use std::{
    io,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::debug;

/// Keys the cache knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    /// The game being played.
    CurrentGame,
    /// Games recorded while offline, plus the last known remote list.
    Games,
    /// Player facts recorded while offline, plus the last known remote list.
    PlayerFacts,
    /// Model selection chosen at runtime.
    ModelSettings,
}

impl CacheKey {
    /// Name of the key inside the cache file.
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::CurrentGame => "currentGame",
            CacheKey::Games => "games",
            CacheKey::PlayerFacts => "playerFacts",
            CacheKey::ModelSettings => "modelSettings",
        }
    }
}

/// Convenient result alias returning [`CacheError`] failures.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures raised by the local cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or replacing the cache file failed.
    #[error("local cache I/O failed for `{}`", path.display())]
    Io {
        /// Cache file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The cache file exists but is not a JSON object.
    #[error("local cache file `{}` is corrupt", path.display())]
    Corrupt {
        /// Cache file.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// A value could not be turned into JSON.
    #[error("failed to encode cache key `{key}`")]
    Encode {
        /// Key being written.
        key: &'static str,
        /// Serialization failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored value no longer matches its type.
    #[error("failed to decode cache key `{key}`")]
    Decode {
        /// Key being read.
        key: &'static str,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// JSON-file backed cache shared by every persistence flow.
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalCache {
    /// Cache stored at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored under `key`, if any.
    pub async fn load<T: DeserializeOwned>(&self, key: CacheKey) -> CacheResult<Option<T>> {
        let mut entries = self.read_entries().await?;
        match entries.remove(key.as_str()) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| CacheError::Decode {
                    key: key.as_str(),
                    source,
                }),
        }
    }

    /// Replace the value stored under `key`.
    pub async fn store<T: Serialize>(&self, key: CacheKey, value: &T) -> CacheResult<()> {
        let value = serde_json::to_value(value).map_err(|source| CacheError::Encode {
            key: key.as_str(),
            source,
        })?;
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.as_str().to_string(), value);
        self.write_entries(&entries).await?;
        debug!(key = key.as_str(), path = %self.path.display(), "local cache updated");
        Ok(())
    }

    /// Drop `key` from the cache.
    pub async fn remove(&self, key: CacheKey) -> CacheResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key.as_str()).is_some() {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }

    async fn read_entries(&self) -> CacheResult<Map<String, Value>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&raw).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_entries(&self, entries: &Map<String, Value>) -> CacheResult<()> {
        let io_error = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let payload = serde_json::to_vec_pretty(entries).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, payload).await.map_err(io_error)?;
        fs::rename(&tmp, &self.path).await.map_err(io_error)
    }
}
