//! Atomic JSON file operations.
//!
//! Writes go to a sibling temp file that is fsynced and renamed over the
//! target; read-modify-write cycles hold an exclusive lock file.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Errors that can occur during atomic JSON operations.
#[derive(Debug)]
pub enum AtomicJsonError {
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON serialization/deserialization error.
    JsonError(serde_json::Error),
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicJsonError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicJsonError::JsonError(e) => write!(f, "JSON error: {}", e),
            AtomicJsonError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicJsonError {}

impl From<std::io::Error> for AtomicJsonError {
    fn from(e: std::io::Error) -> Self {
        AtomicJsonError::IoError(e)
    }
}

impl From<serde_json::Error> for AtomicJsonError {
    fn from(e: serde_json::Error) -> Self {
        AtomicJsonError::JsonError(e)
    }
}

impl From<AtomicJsonError> for testops_core::TestOpsError {
    fn from(e: AtomicJsonError) -> Self {
        testops_core::TestOpsError::storage(e.to_string())
    }
}

/// A handle to a JSON file that is only ever replaced whole.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// Returns `Ok(None)` when the file is missing or empty.
    pub fn load(&self) -> Result<Option<T>, AtomicJsonError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Saves data atomically via temp file + rename.
    pub fn save(&self, data: &T) -> Result<(), AtomicJsonError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// Read-modify-write under an exclusive lock.
    ///
    /// `f` receives the current contents (or `default_value` when the file
    /// is missing) and the result is written back only if `f` succeeds.
    pub fn update<F, R>(&self, default_value: T, f: F) -> Result<R, AtomicJsonError>
    where
        F: FnOnce(&mut T) -> Result<R, AtomicJsonError>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        let result = f(&mut data)?;
        self.save(&data)?;

        Ok(result)
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicJsonError> {
        let parent = self.path.parent().ok_or_else(|| {
            AtomicJsonError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        })?;

        let file_name = self.path.file_name().ok_or_else(|| {
            AtomicJsonError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no file name",
            ))
        })?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// Exclusive lock guard; released when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicJsonError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive().map_err(|e| {
                AtomicJsonError::LockError(format!("Failed to acquire lock: {}", e))
            })?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    type Entries = BTreeMap<String, String>;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Entries>::new(temp_dir.path().join("state.json"));

        let mut entries = Entries::new();
        entries.insert("testops_theme".into(), "\"dark\"".into());
        file.save(&entries).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_load_missing_or_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        let file = AtomicJsonFile::<Entries>::new(path.clone());
        assert!(file.load().unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let file = AtomicJsonFile::<Entries>::new(path);
        assert!(matches!(file.load(), Err(AtomicJsonError::JsonError(_))));
    }

    #[test]
    fn test_update_returns_closure_result() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Entries>::new(temp_dir.path().join("state.json"));

        let previous = file
            .update(Entries::new(), |entries| {
                Ok(entries.insert("k".into(), "1".into()))
            })
            .unwrap();
        assert!(previous.is_none());

        let previous = file
            .update(Entries::new(), |entries| {
                Ok(entries.insert("k".into(), "2".into()))
            })
            .unwrap();
        assert_eq!(previous.as_deref(), Some("1"));
    }

    #[test]
    fn test_no_temp_or_lock_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        let file = AtomicJsonFile::<Entries>::new(path.clone());

        file.update(Entries::new(), |_| Ok(())).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".state.json.tmp").exists());
        assert!(!temp_dir.path().join("state.lock").exists());
    }
}
