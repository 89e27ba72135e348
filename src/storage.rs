use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Settings, Task};

/// The two blobs the application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Tasks,
    Settings,
}

impl StoreKey {
    pub fn file_name(&self) -> &'static str {
        match self {
            StoreKey::Tasks => "tasks.json",
            StoreKey::Settings => "settings.json",
        }
    }
}

/// Durable key-value storage for opaque JSON blobs. Every save overwrites the whole value.
pub trait Storage {
    fn load(&self, key: StoreKey) -> Result<Option<String>>;
    fn save(&self, key: StoreKey, blob: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for &S {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: StoreKey, blob: &str) -> Result<()> {
        (**self).save(key, blob)
    }
}

/// Returns the directory holding the data files.
///
/// The path is determined in the following order:
/// 1. `TICKLER_DIR` environment variable.
/// 2. `~/.local/share/tickler` (on Linux).
/// 3. `./tickler` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var("TICKLER_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("tickler");
        p
    })
}

/// Stores each key as a pretty-printed JSON file inside one directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage rooted at [`data_dir`].
    pub fn from_env() -> Self {
        Self::new(data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Deletes both data files.
    pub fn delete_all(&self) -> Result<()> {
        for key in [StoreKey::Tasks, StoreKey::Settings] {
            let path = self.path(key);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        let path = self.path(key);
        let mut f = match OpenOptions::new().read(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(Some(s))
    }

    fn save(&self, key: StoreKey, blob: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let path = self.path(key);
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        f.write_all(blob.as_bytes())?;
        debug!(path = %path.display(), bytes = blob.len(), "saved");
        Ok(())
    }
}

/// Keeps blobs in memory only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RefCell<HashMap<StoreKey, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw blob, e.g. to simulate a previous session or a corrupt file.
    pub fn with_blob(self, key: StoreKey, blob: impl Into<String>) -> Self {
        self.blobs.borrow_mut().insert(key, blob.into());
        self
    }

    pub fn blob(&self, key: StoreKey) -> Option<String> {
        self.blobs.borrow().get(&key).cloned()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self.blob(key))
    }

    fn save(&self, key: StoreKey, blob: &str) -> Result<()> {
        self.blobs.borrow_mut().insert(key, blob.to_string());
        Ok(())
    }
}

/// Decodes a stored blob.
///
/// # Returns
/// `None` if nothing is stored, or the blob cannot be read or decoded.
fn load_decoded<T: DeserializeOwned>(storage: &impl Storage, key: StoreKey) -> Option<T> {
    let blob = match storage.load(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return None,
        Err(e) => {
            warn!(key = key.file_name(), error = %e, "could not read stored data");
            return None;
        }
    };
    serde_json::from_str(&blob)
        .map_err(|e| warn!(key = key.file_name(), error = %e, "stored data is malformed, ignoring it"))
        .ok()
}

/// Reads the stored task list as it is right now.
///
/// Unlike [`load_tasks`], a missing or unusable blob yields `None` rather than an
/// empty list, so callers holding a good copy can keep it.
pub fn read_tasks(storage: &impl Storage) -> Option<Vec<Task>> {
    load_decoded(storage, StoreKey::Tasks)
}

/// Loads all tasks. Returns an empty list if nothing usable is stored.
pub fn load_tasks(storage: &impl Storage) -> Vec<Task> {
    read_tasks(storage).unwrap_or_default()
}

/// Overwrites the stored task list.
pub fn save_tasks(storage: &impl Storage, tasks: &[Task]) -> Result<()> {
    let s = serde_json::to_string_pretty(tasks)?;
    storage.save(StoreKey::Tasks, &s)
}

/// Loads settings, falling back to defaults.
pub fn load_settings(storage: &impl Storage) -> Settings {
    load_decoded(storage, StoreKey::Settings).unwrap_or_default()
}

/// Overwrites the stored settings.
pub fn save_settings(storage: &impl Storage, settings: &Settings) -> Result<()> {
    let s = serde_json::to_string_pretty(settings)?;
    storage.save(StoreKey::Settings, &s)
}
