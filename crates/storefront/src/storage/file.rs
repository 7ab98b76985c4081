//! File-backed storage.
//!
//! Stores every key in one JSON object on disk, rewritten on each mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Storage, StorageError};

/// JSON-file storage.
///
/// All reads and writes go through the file so that two processes sharing
/// the path see each other's writes after their next read (last write wins,
/// as with two browser tabs).
///
/// # Example
///
/// ```rust,ignore
/// use copperpot_storefront::storage::FileStorage;
///
/// let storage = FileStorage::new(".copperpot/storage.json")?;
/// ```
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a file store at `path`, creating parent directories.
    ///
    /// The file itself is created on first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(items)?;
        // Atomic replace via a sibling temp file, unique per write so
        // concurrent processes never share one.
        let tmp = self.temp_path();
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp);
        })?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "storage".into(), |n| n.to_string_lossy());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
    }

    fn update(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
        let mut items = self.read_all()?;
        mutate(&mut items);
        self.write_all(&items)
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("copperpot-storage-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_persists_across_instances() {
        let path = temp_path("storage.json");

        let first = FileStorage::new(&path).unwrap();
        first.set_item("cart_session_id", "abc").unwrap();

        let second = FileStorage::new(&path).unwrap();
        assert_eq!(
            second.get_item("cart_session_id").unwrap().as_deref(),
            Some("abc")
        );

        second.remove_item("cart_session_id").unwrap();
        assert_eq!(first.get_item("cart_session_id").unwrap(), None);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let storage = FileStorage::new(temp_path("absent.json")).unwrap();
        assert_eq!(storage.get_item("anything").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt.json");
        let storage = FileStorage::new(&path).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            storage.get_item("k"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_concurrent_writers_share_a_file() {
        let path = temp_path("shared.json");
        let writers: Vec<_> = (0..4)
            .map(|n| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let storage = FileStorage::new(&path).unwrap();
                    for i in 0..25 {
                        storage.set_item(&format!("writer_{n}"), &i.to_string())?;
                    }
                    Ok::<_, StorageError>(())
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap().unwrap();
        }

        // The file is whole and no temp files are left behind.
        let storage = FileStorage::new(&path).unwrap();
        storage.get_item("writer_0").unwrap();
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }
}
