use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Errors raised when a storage medium refuses a write.
#[derive(Error, Debug)]
pub enum MediumError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("storage medium is disabled")]
    Disabled,

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Synchronous string-keyed text storage.
///
/// Reads never fail: anything that cannot be read is reported as absent.
pub trait StorageMedium {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), MediumError>;
    fn remove(&self, key: &str) -> Result<(), MediumError>;
}

/// One `<key>.json` file per key inside a directory.
pub struct DirMedium {
    dir: PathBuf,
}

impl DirMedium {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, MediumError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(MediumError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StorageMedium for DirMedium {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key).ok()?;
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable stored value");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let path = self.path_for(key)?;
        atomic_write(&path, value.as_bytes())?;
        restrict_file(&path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MediumError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local medium; contents vanish when it is dropped.
#[derive(Default)]
pub struct MemoryMedium {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageMedium for MemoryMedium {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MediumError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// A medium that holds nothing and rejects every write.
pub struct DisabledMedium;

impl StorageMedium for DisabledMedium {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), MediumError> {
        Err(MediumError::Disabled)
    }

    fn remove(&self, _key: &str) -> Result<(), MediumError> {
        Err(MediumError::Disabled)
    }
}

pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid target path"))?;
    if !parent.exists() {
        fs::create_dir_all(parent)?;
        restrict_dir(parent)?;
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub(crate) fn restrict_file(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}

pub(crate) fn restrict_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if path.exists() {
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_medium_set_then_get() {
        let tmp = TempDir::new().unwrap();
        let medium = DirMedium::new(tmp.path().join("data"));

        assert_eq!(medium.get("mine_links"), None);
        medium.set("mine_links", "[]").unwrap();
        assert_eq!(medium.get("mine_links").as_deref(), Some("[]"));
        assert!(tmp.path().join("data").join("mine_links.json").exists());
    }

    #[test]
    fn test_dir_medium_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let medium = DirMedium::new(tmp.path());

        medium.remove("never_written").unwrap();
        medium.set("k", "v").unwrap();
        medium.remove("k").unwrap();
        assert_eq!(medium.get("k"), None);
    }

    #[test]
    fn test_dir_medium_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let medium = DirMedium::new(tmp.path());

        assert!(matches!(
            medium.set("../escape", "x"),
            Err(MediumError::InvalidKey(_))
        ));
        assert_eq!(medium.get("../escape"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_dir_medium_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let medium = DirMedium::new(tmp.path());
        medium.set("k", "v").unwrap();

        let mode = fs::metadata(tmp.path().join("k.json"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_memory_medium_overwrites() {
        let medium = MemoryMedium::new();
        medium.set("k", "one").unwrap();
        medium.set("k", "two").unwrap();
        assert_eq!(medium.get("k").as_deref(), Some("two"));
    }

    #[test]
    fn test_disabled_medium_rejects_writes() {
        let medium = DisabledMedium;
        assert!(matches!(medium.set("k", "v"), Err(MediumError::Disabled)));
        assert_eq!(medium.get("k"), None);
    }
}
