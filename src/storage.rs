// Snapshot persistence: one JSON document per key

use crate::error::Result;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key holding the full trial collection.
pub const TRIALS_KEY: &str = "ensayos";
/// Key holding the full treatment collection.
pub const TREATMENTS_KEY: &str = "tratamientos";
/// Key holding the session marker.
pub const SESSION_KEY: &str = "agriglobal_user";

/// Key-value backend for whole-document snapshots. The store rewrites the
/// full collection under its key on every mutation.
pub trait Backend {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// File-backed store: each key becomes `{key}.json` under a `.agritrial`
/// directory. Writes take an exclusive lock and flush before returning.
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    /// Open or create a backend rooted at the given path.
    ///
    /// The data lives in a `.agritrial` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(".agritrial");
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        // Exclusive lock while rewriting; released when the file drops
        file.lock_exclusive()?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        debug!(key, bytes = value.len(), "snapshot written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-memory backend for tests: no persistence across instances.
#[derive(Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl Backend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
