//! Key-value backends for form documents.
//!
//! The form store only needs to get, put and delete opaque JSON texts, so
//! it talks to a [`KeyValueStore`]. [`FileStore`] keeps one file per key
//! on disk; [`MemoryStore`] keeps everything in a map.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::form::FormId;

/// Extension of stored form files.
const FORM_FILE_EXTENSION: &str = "json";

/// Address of one stored text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// The form index.
    Index,
    /// One form document.
    Form(FormId),
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => f.write_str("index"),
            Self::Form(id) => write!(f, "form/{id}"),
        }
    }
}

/// Minimal storage interface used by the form store.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Fetch the text stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &StorageKey) -> Result<Option<String>>;

    /// Store `text` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn put(&self, key: &StorageKey, text: &str) -> Result<()>;

    /// Remove `key`. Returns `false` if nothing was stored under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the value exists but cannot be removed.
    fn delete(&self, key: &StorageKey) -> Result<bool>;

    /// Identifiers of every stored form document, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be enumerated.
    fn list(&self) -> Result<Vec<FormId>>;
}

/// Filesystem backend: an index file plus one JSON file per form.
#[derive(Debug, Clone)]
pub struct FileStore {
    index_path: PathBuf,
    forms_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open(root: impl AsRef<Path>, index_file: &str, forms_dir: &str) -> Result<Self> {
        let root = root.as_ref();
        let forms_dir = root.join(forms_dir);

        for dir in [root, forms_dir.as_path()] {
            fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        debug!("Opened form storage at {}", root.display());
        Ok(Self {
            index_path: root.join(index_file),
            forms_dir,
        })
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        match key {
            StorageKey::Index => self.index_path.clone(),
            StorageKey::Form(id) => self
                .forms_dir
                .join(format!("{id}.{FORM_FILE_EXTENSION}")),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::StorageRead { path, source }),
        }
    }

    fn put(&self, key: &StorageKey, text: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, text).map_err(|source| Error::StorageWrite {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| Error::StorageWrite {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote {} ({} bytes)", path.display(), text.len());
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> Result<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::StorageDelete { path, source }),
        }
    }

    fn list(&self) -> Result<Vec<FormId>> {
        let entries = fs::read_dir(&self.forms_dir).map_err(|source| Error::StorageRead {
            path: self.forms_dir.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FORM_FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match FormId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(_) => warn!("Ignoring unexpected file {}", path.display()),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-memory backend for tests and scratch use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<StorageKey, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &StorageKey, text: &str) -> Result<()> {
        self.lock()?.insert(key.clone(), text.to_string());
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> Result<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<FormId>> {
        let mut ids: Vec<FormId> = self
            .lock()?
            .keys()
            .filter_map(|key| match key {
                StorageKey::Form(id) => Some(id.clone()),
                StorageKey::Index => None,
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}
