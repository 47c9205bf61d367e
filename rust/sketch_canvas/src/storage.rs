//! Durable Key-Value Storage
//!
//! The controller keeps exactly one value here: the last auto-saved canvas
//! as PNG bytes. Backends:
//! - [`MemoryStore`]: process-local, used by tests and as a fallback
//! - [`FileStore`]: one file per key in the user's data directory (desktop)
//! - [`LocalStorageStore`]: browser `localStorage`, values kept as base64 data URLs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;

use crate::error::StorageError;

/// Synchronous get/set/delete over byte blobs
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    /// Deleting a missing key is not an error
    fn delete(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores each key as a file inside `dir`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data_dir>/sketch_canvas`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn in_data_dir() -> Option<Self> {
        let mut dir = dirs::data_dir()?;
        dir.push(env!("CARGO_PKG_NAME"));
        Some(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidData { key: key.to_owned() });
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves a truncated blob behind
        let staging = path.with_extension("partial");
        std::fs::write(&staging, value)?;
        std::fs::rename(&staging, &path)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn to_data_url(bytes: &[u8]) -> String {
    let mut url = String::from(DATA_URL_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut url);
    url
}

/// Accepts any base64 data URL, whatever its media type
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn from_data_url(url: &str) -> Option<Vec<u8>> {
    let (header, payload) = url.split_once(',')?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

/// Browser `localStorage`, scoped to the page origin
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    pub fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(url) = self
            .storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
        else {
            return Ok(None);
        };
        from_data_url(&url)
            .map(Some)
            .ok_or_else(|| StorageError::InvalidData { key: key.to_owned() })
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        // Fails with a QuotaExceededError once the origin's budget is spent
        self.storage
            .set_item(key, &to_data_url(value))
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }
}
