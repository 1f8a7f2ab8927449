//! Saved deposit drafts ("save for later")
//!
//! Drafts live only on this device. Each save or delete rewrites the whole
//! sequence in one atomic file replacement.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{Storage, SAVED_DRAFTS_KEY};
use crate::validation::MAX_NAME_LENGTH;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedDraft {
    pub id: String,
    pub name: String,
    pub amount: String,
    pub unlock_time: u64,
    pub created_at: DateTime<Utc>,
}

pub struct BookmarkStore {
    storage: Storage,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl BookmarkStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// All drafts in insertion order.
    pub fn list(&self) -> Result<Vec<SavedDraft>, StorageError> {
        Ok(self
            .storage
            .load::<Vec<SavedDraft>>(SAVED_DRAFTS_KEY)?
            .unwrap_or_default())
    }

    pub fn save(
        &self,
        name: &str,
        amount: &str,
        unlock_time: u64,
    ) -> Result<SavedDraft, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut drafts = self.list()?;

        let now = Utc::now();
        let mut id = now.timestamp_millis();
        while drafts.iter().any(|d| d.id == id.to_string()) {
            id += 1;
        }

        let draft = SavedDraft {
            id: id.to_string(),
            name: sanitize_name(name),
            amount: sanitize_amount(amount),
            unlock_time,
            created_at: now,
        };

        drafts.push(draft.clone());
        self.storage.save(SAVED_DRAFTS_KEY, &drafts)?;
        log::info!("Saved draft '{}' ({})", draft.name, draft.id);
        Ok(draft)
    }

    /// Returns whether a draft with `id` existed.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut drafts = self.list()?;
        let before = drafts.len();
        drafts.retain(|d| d.id != id);
        if drafts.len() == before {
            return Ok(false);
        }
        self.storage.save(SAVED_DRAFTS_KEY, &drafts)?;
        log::info!("Deleted draft {}", id);
        Ok(true)
    }
}

fn sanitize_name(name: &str) -> String {
    name.trim().chars().take(MAX_NAME_LENGTH).collect()
}

/// Keep the amount if it is a plain non-negative decimal, else "0".
/// Signs and exponents are not kept.
fn sanitize_amount(amount: &str) -> String {
    let trimmed = amount.trim();
    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    let dots = trimmed.chars().filter(|c| *c == '.').count();
    if digits > 0 && dots <= 1 && digits + dots == trimmed.len() {
        trimmed.to_string()
    } else {
        "0".to_string()
    }
}
