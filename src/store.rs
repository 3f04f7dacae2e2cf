use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::medium::{MediumError, StorageMedium};

/// Typed, key-scoped JSON access to a [`StorageMedium`].
///
/// Neither operation surfaces an error: a missing or corrupt value loads as
/// the caller's default and a rejected write leaves only the in-memory copy.
#[derive(Clone)]
pub struct PersistentStore {
    medium: Rc<dyn StorageMedium>,
}

impl PersistentStore {
    pub fn new(medium: Rc<dyn StorageMedium>) -> Self {
        Self { medium }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.medium.get(key) else {
            debug!(key, "no stored value, using default");
            return default;
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "discarding unparseable stored value");
                default
            }
        }
    }

    /// Returns whether the value reached the medium.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "persisting failed, keeping in-memory state");
                false
            }
        }
    }

    pub fn clear(&self, key: &str) -> bool {
        match self.medium.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "could not clear stored value");
                false
            }
        }
    }

    fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), MediumError> {
        let text = serde_json::to_string(value)?;
        self.medium.set(key, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::{DisabledMedium, MemoryMedium};

    #[test]
    fn test_load_absent_returns_default() {
        let store = PersistentStore::new(Rc::new(MemoryMedium::new()));
        let loaded: Vec<u32> = store.load("nums", vec![7]);
        assert_eq!(loaded, vec![7]);
    }

    #[test]
    fn test_round_trip_keeps_order() {
        let store = PersistentStore::new(Rc::new(MemoryMedium::new()));
        assert!(store.save("nums", &vec![3, 1, 2]));
        let loaded: Vec<u32> = store.load("nums", Vec::new());
        assert_eq!(loaded, vec![3, 1, 2]);
    }

    #[test]
    fn test_corrupt_value_returns_default() {
        let medium = Rc::new(MemoryMedium::new());
        medium.set("nums", "{not json").unwrap();
        let store = PersistentStore::new(medium);

        let loaded: Vec<u32> = store.load("nums", vec![42]);
        assert_eq!(loaded, vec![42]);
    }

    #[test]
    fn test_wrong_shape_returns_default() {
        let medium = Rc::new(MemoryMedium::new());
        medium.set("nums", r#"{"a": 1}"#).unwrap();
        let store = PersistentStore::new(medium);

        let loaded: Vec<u32> = store.load("nums", Vec::new());
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_rejected_write_is_swallowed() {
        let store = PersistentStore::new(Rc::new(DisabledMedium));
        assert!(!store.save("nums", &vec![1]));
        let loaded: Vec<u32> = store.load("nums", vec![9]);
        assert_eq!(loaded, vec![9]);
    }
}
