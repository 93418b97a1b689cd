//! Persistent shortcut bindings.
//!
//! The store is a flat JSON object keyed by shortcut. It is read fully on open and rewritten in
//! full after every mutation; the in-memory copy is authoritative for the lifetime of the process
//! even if a write fails.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::fs as async_fs;
use tracing::{debug, error, warn};

/// Shortcut bindings keyed by shortcut.
pub type Bindings = BTreeMap<String, Binding>;

/// A single shortcut binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// The full student account the shortcut points to.
    pub account: String,
    /// The room name reported when the binding was created.
    ///
    /// Older files may hold the room as a list of name parts, or `null`.
    #[serde(default, deserialize_with = "room_text")]
    pub room_name: String,
    /// Creation time as fractional Unix seconds, `0` if unknown.
    #[serde(default, alias = "created_time", deserialize_with = "timestamp")]
    pub created_at: f64,
}

/// Reads a room stored as a string, a list of parts or `null` into a single line of text.
fn room_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    fn part(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    Ok(match Value::deserialize(deserializer)? {
        Value::Array(parts) => parts.iter().filter_map(part).collect::<Vec<_>>().join(" "),
        other => part(&other).unwrap_or_default(),
    })
}

/// Reads a timestamp stored as a number, a numeric string or `null`.
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let seconds = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    Ok(seconds.filter(|s| s.is_finite()).unwrap_or_default())
}

impl Binding {
    /// Creates a binding stamped with the current time.
    #[must_use]
    pub fn new(account: &str, room_name: &str) -> Binding {
        #[allow(clippy::cast_precision_loss)]
        let created_at = OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9;

        Binding {
            account: account.to_string(),
            room_name: room_name.to_string(),
            created_at,
        }
    }

    /// Returns the creation time, if one was recorded.
    #[must_use]
    pub fn created(&self) -> Option<OffsetDateTime> {
        #[allow(clippy::cast_possible_truncation)]
        let seconds = self.created_at as i64;

        (seconds > 0)
            .then(|| OffsetDateTime::from_unix_timestamp(seconds).ok())
            .flatten()
    }
}

/// Errors that can occur while persisting bindings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not serialize bindings: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Shortcut bindings backed by a JSON file, or by nothing at all.
#[derive(Debug, Default)]
pub struct BindingStore {
    /// The backing file. `None` keeps the store in memory only.
    path: Option<PathBuf>,
    /// The working copy.
    bindings: Bindings,
}

impl BindingStore {
    /// Opens the store backed by the file at `path`, loading whatever it currently holds.
    ///
    /// A missing or malformed file results in an empty store.
    pub fn open(path: impl Into<PathBuf>) -> BindingStore {
        let path = path.into();
        let bindings = load(&path);

        BindingStore {
            path: Some(path),
            bindings,
        }
    }

    /// Creates an empty store that is never persisted.
    #[cfg(test)]
    #[must_use]
    pub fn in_memory() -> BindingStore {
        BindingStore::default()
    }

    /// Returns all bindings, ordered by shortcut.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns whether the store holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns whether `shortcut` is taken.
    #[must_use]
    pub fn contains(&self, shortcut: &str) -> bool {
        self.bindings.contains_key(shortcut)
    }

    /// Returns the account bound to `shortcut`.
    #[must_use]
    pub fn account_for(&self, shortcut: &str) -> Option<&str> {
        self.bindings
            .get(shortcut)
            .map(|binding| binding.account.as_str())
    }

    /// Returns the first shortcut bound to `account`.
    #[must_use]
    pub fn shortcut_for(&self, account: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, binding)| binding.account == account)
            .map(|(shortcut, _)| shortcut.as_str())
    }

    /// Binds `shortcut` to `account`, replacing any previous binding of `shortcut`, and persists
    /// the store.
    pub async fn add(&mut self, shortcut: &str, account: &str, room_name: &str) {
        self.bindings
            .insert(shortcut.to_string(), Binding::new(account, room_name));
        self.persist().await;
    }

    /// Removes the binding of `shortcut` and persists the store.
    ///
    /// Returns whether a binding was removed.
    pub async fn remove(&mut self, shortcut: &str) -> bool {
        if self.bindings.remove(shortcut).is_some() {
            self.persist().await;
            true
        } else {
            false
        }
    }

    /// Writes the full set of bindings to the backing file, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written. The
    /// working copy is left untouched either way.
    pub async fn save(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let json = serde_json::to_string_pretty(&self.bindings).map_err(Error::Serialize)?;

        async_fs::write(path, json)
            .await
            .map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;

        debug!(?path, num_bindings = self.bindings.len(), "saved bindings");

        Ok(())
    }

    async fn persist(&self) {
        if let Err(err) = self.save().await {
            error!(%err, "could not persist bindings");
        }
    }
}

/// Loads the bindings stored at `path`, treating a missing or malformed file as empty.
#[must_use]
pub fn load(path: &Path) -> Bindings {
    match try_load(path) {
        Ok(Some(bindings)) => {
            debug!(?path, num_bindings = bindings.len(), "loaded bindings");
            bindings
        }
        Ok(None) => {
            debug!(?path, "no bindings file, starting empty");
            Bindings::new()
        }
        Err(err) => {
            warn!(%err, "could not load bindings, starting empty");
            Bindings::new()
        }
    }
}

/// Loads the bindings stored at `path`, returning `None` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn try_load(path: &Path) -> Result<Option<Bindings>, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
}
