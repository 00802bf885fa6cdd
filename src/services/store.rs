use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

use crate::models::{Trial, UserProfile};

/// Key holding the serialized user profile
pub const PROFILE_KEY: &str = "userProfile";
/// Key holding the serialized list of accepted trials
pub const ACCEPTED_TRIALS_KEY: &str = "acceptedTrials";

/// Errors that can occur with profile store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Synchronous key-value store for serialized blobs
///
/// The matching core reads the profile from here and writes accepted trials
/// back; it does not own the data.
pub trait ProfileStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn load_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        match self.get(PROFILE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.set(PROFILE_KEY, &serde_json::to_string(profile)?)
    }

    fn load_accepted_trials(&self) -> Result<Vec<Trial>, StoreError> {
        match self.get(ACCEPTED_TRIALS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_accepted_trials(&self, trials: &[Trial]) -> Result<(), StoreError> {
        self.set(ACCEPTED_TRIALS_KEY, &serde_json::to_string(trials)?)
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store, one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", file_name))
    }
}

impl ProfileStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Write-then-rename so readers never observe a partial blob
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        tracing::trace!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> UserProfile {
        UserProfile {
            conditions: vec!["Asthma".to_string()],
            location: "Boston, MA".to_string(),
            allergies: vec!["latex".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();

        assert!(store.load_profile().unwrap().is_none());
        assert!(store.load_accepted_trials().unwrap().is_empty());

        store.save_profile(&sample_profile()).unwrap();
        assert_eq!(store.load_profile().unwrap(), Some(sample_profile()));
    }

    #[test]
    fn test_file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        store
            .save_accepted_trials(&[Trial {
                id: "NCT42".to_string(),
                ..Default::default()
            }])
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        let accepted = reopened.load_accepted_trials().unwrap();

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, "NCT42");
        assert!(reopened.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let store = MemoryStore::new();
        store.set(PROFILE_KEY, "{not json").unwrap();

        assert!(matches!(store.load_profile(), Err(StoreError::Serialization(_))));
    }
}
