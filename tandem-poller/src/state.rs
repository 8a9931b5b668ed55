//! State store
//!
//! Durable key-value persistence of the small JSON records each poller
//! checkpoints. Every poller reads and writes only the record keyed by its
//! own name, so the store needs no cross-poller locking.
//!
//! # Crash safety
//!
//! [`FileStateStore`] never overwrites a record in place. A save writes a
//! temporary sibling, syncs it, renames it over the record and syncs the
//! directory, so a crash leaves either the old record or the new one.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state record {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write state record {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state record {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state record {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid state record key {0:?}")]
    InvalidKey(String),

    #[error("state store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Persistence of per-poller records
pub trait StateStore: Send + Sync {
    /// Loads a record, or `None` if it was never saved
    fn load_raw(&self, key: &str) -> Result<Option<Value>, StateError>;

    /// Atomically replaces a record
    fn save_raw(&self, key: &str, record: &Value) -> Result<(), StateError>;
}

impl dyn StateStore {
    /// Loads a typed record, treating a missing record as empty
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StateError> {
        match self.load_raw(key)? {
            Some(value) => serde_json::from_value(value).map_err(|source| StateError::Corrupt {
                key: key.to_string(),
                source,
            }),
            None => Ok(T::default()),
        }
    }

    /// Saves a typed record
    pub fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StateError> {
        self.save_raw(key, &encode(key, record)?)
    }
}

fn encode<T: Serialize>(key: &str, record: &T) -> Result<Value, StateError> {
    serde_json::to_value(record).map_err(|source| StateError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Typed load run on the blocking pool, keeping file I/O off the async
/// workers
pub async fn load_blocking<T>(store: &Arc<dyn StateStore>, key: &str) -> Result<T, StateError>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    let store = Arc::clone(store);
    let key = key.to_string();
    tokio::task::spawn_blocking(move || store.load(&key)).await?
}

/// Typed save run on the blocking pool. The record is encoded before the
/// hand-off.
pub async fn save_blocking<T: Serialize>(
    store: &Arc<dyn StateStore>,
    key: &str,
    record: &T,
) -> Result<(), StateError> {
    let value = encode(key, record)?;
    let store = Arc::clone(store);
    let key = key.to_string();
    tokio::task::spawn_blocking(move || store.save_raw(&key, &value)).await?
}

/// Checks that a key can be used as a file name: non-empty, no path
/// separators, no leading dot
pub fn validate_key(key: &str) -> Result<(), StateError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StateError::InvalidKey(key.to_string()))
    }
}

/// Stores each record as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Opens a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StateError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StateError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Path of the record stored under `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StateError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn write_atomically(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let tmp_path = path.with_extension("json.tmp");

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, path)?;
        fsync_dir(&self.dir)
    }
}

impl StateStore for FileStateStore {
    fn load_raw(&self, key: &str) -> Result<Option<Value>, StateError> {
        let path = self.path_for(key)?;

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No state record at {}", path.display());
                return Ok(None);
            }
            Err(source) => return Err(StateError::Read { path, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StateError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn save_raw(&self, key: &str, record: &Value) -> Result<(), StateError> {
        let path = self.path_for(key)?;
        let contents = serde_json::to_vec_pretty(record).map_err(|source| StateError::Encode {
            key: key.to_string(),
            source,
        })?;

        self.write_atomically(&path, &contents)
            .map_err(|source| StateError::Write { path, source })
    }
}

/// Syncs a directory so a rename inside it survives power loss
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
