//! On-device key/value persistence
//!
//! One JSON file per key under a base directory. Writes land in a
//! temporary file first and are renamed over the target, so a failed write
//! leaves the previous value intact.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Key holding the saved drafts array.
pub const SAVED_DRAFTS_KEY: &str = "savedPiggyStates";
/// Key holding the hash of the last submitted transaction.
pub const LAST_TX_HASH_KEY: &str = "lastTransactionHash";
/// Key holding metadata of the last submitted transaction.
pub const LAST_TX_DATA_KEY: &str = "lastTransactionData";

#[derive(Clone, Debug)]
pub struct Storage {
    base_path: PathBuf,
}

impl Storage {
    /// Storage rooted at the default data directory ("./piggybank-data")
    pub fn new() -> Self {
        Self {
            base_path: PathBuf::from("./piggybank-data"),
        }
    }

    /// Storage with a custom base directory (for testing)
    pub fn new_with_base_dir(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    /// Load a value, or `None` if the key was never written.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let value = serde_json::from_str(&contents)?;
        Ok(Some(value))
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.key_path(key);
        let tmp = self.base_path.join(format!(".{}.json.tmp", key));
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Remove a key. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new_with_base_dir(dir.path().join("nested"));

        assert_eq!(storage.load::<Vec<u32>>("numbers").unwrap(), None);
        storage.save("numbers", &vec![1u32, 2, 3]).unwrap();
        assert_eq!(
            storage.load::<Vec<u32>>("numbers").unwrap(),
            Some(vec![1, 2, 3])
        );

        storage.remove("numbers").unwrap();
        storage.remove("numbers").unwrap();
        assert_eq!(storage.load::<Vec<u32>>("numbers").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new_with_base_dir(dir.path().to_path_buf());
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            storage.load::<Vec<u32>>("broken"),
            Err(StorageError::Json(_))
        ));
    }
}
