//! JSON file record store
//!
//! The file holds a pretty-printed JSON array of records. Saves go through a
//! sibling temporary file that is renamed over the target, so readers (and a
//! restarted harvest) only ever see a complete previous or new version.

use crate::checkpoint::traits::{RecordStore, StoreError, StoreResult};
use crate::record::Record;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Record store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store for the given file path; the file need not exist
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used while saving
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self) -> StoreResult<Vec<Record>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, records: &[Record]) -> StoreResult<()> {
        let raw = serde_json::to_vec_pretty(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;
        }

        let tmp_path = self.temp_path();
        fs::write(&tmp_path, raw).map_err(|e| self.io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(&self.path, e))?;

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
