//! File-based credential store adapter.
//!
//! Credentials are kept as a flat JSON object in
//! `~/.geoarchive/.credentials.json`:
//!
//! ```json
//! { "access_token": "...", "refresh_token": "...", "user": "{...}" }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::default_credentials_path;
use crate::traits::{CredentialKey, CredentialStore, StoreError};

type CredentialMap = BTreeMap<String, String>;

/// File-based credential store.
///
/// The whole file is rewritten on every change. Writes from this process
/// are serialized.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Store at the default location.
    pub fn new() -> Self {
        Self::with_path(default_credentials_path())
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the path to the credentials file.
    pub fn credentials_path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<CredentialMap, StoreError> {
        if !self.path.exists() {
            return Ok(CredentialMap::new());
        }
        let file = File::open(&self.path).map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write_map(&self, map: &CredentialMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        if map.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
            }
            return Ok(());
        }

        let file = File::create(&self.path).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, map)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    fn update(&self, change: impl FnOnce(&mut CredentialMap)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StoreError::Serialization(e)) => {
                tracing::warn!("Credentials file is corrupt, starting over: {}", e);
                CredentialMap::new()
            }
            Err(e) => return Err(e),
        };
        change(&mut map);
        self.write_map(&map)
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.remove(key.as_str()))
    }

    async fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.as_str().to_string(), value.to_string());
        })
    }

    async fn delete(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.update(|map| {
            map.remove(key.as_str());
        })
    }
}
