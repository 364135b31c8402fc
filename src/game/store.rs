//! Score Persistence
//!
//! Cross-session score storage is an external collaborator. The ledger only
//! needs `load` at session start and `save` at game end, keyed by address.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::address::Address;

/// Score store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("score store I/O: {0}")]
    Io(#[from] io::Error),

    /// Stored document could not be (de)serialized.
    #[error("score store format: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-address score persistence.
pub trait ScoreStore {
    /// Load the persisted score for `address`, if any.
    fn load(&self, address: &Address) -> Result<Option<u64>, StoreError>;

    /// Persist `score` for `address`, replacing any previous value.
    fn save(&mut self, address: &Address, score: u64) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile store for tests and the demo binary.
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    scores: BTreeMap<Address, u64>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a score.
    pub fn with_score(mut self, address: Address, score: u64) -> Self {
        self.scores.insert(address, score);
        self
    }

    /// Peek at a stored score.
    pub fn get(&self, address: &Address) -> Option<u64> {
        self.scores.get(address).copied()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self, address: &Address) -> Result<Option<u64>, StoreError> {
        Ok(self.scores.get(address).copied())
    }

    fn save(&mut self, address: &Address, score: u64) -> Result<(), StoreError> {
        self.scores.insert(address.clone(), score);
        Ok(())
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// A single persisted score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Last saved score.
    pub score: u64,
    /// When it was saved.
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreDocument {
    scores: BTreeMap<Address, ScoreRecord>,
}

/// Scores kept in a JSON document on disk.
///
/// The whole document is rewritten on every save.
#[derive(Debug)]
pub struct JsonFileScoreStore {
    path: PathBuf,
    document: ScoreDocument,
}

impl JsonFileScoreStore {
    /// Open the store at `path`. A missing file starts an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let document = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No score file at {}, starting fresh", path.display());
                ScoreDocument::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, document })
    }

    /// Full record for an address.
    pub fn record(&self, address: &Address) -> Option<&ScoreRecord> {
        self.document.scores.get(address)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.document)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl ScoreStore for JsonFileScoreStore {
    fn load(&self, address: &Address) -> Result<Option<u64>, StoreError> {
        Ok(self.document.scores.get(address).map(|r| r.score))
    }

    fn save(&mut self, address: &Address, score: u64) -> Result<(), StoreError> {
        self.document.scores.insert(
            address.clone(),
            ScoreRecord {
                score,
                saved_at: Utc::now(),
            },
        );
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryScoreStore::new();
        let addr = Address::new("alice");

        assert_eq!(store.load(&addr).unwrap(), None);
        store.save(&addr, 42).unwrap();
        assert_eq!(store.load(&addr).unwrap(), Some(42));
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scores.json");
        let addr = Address::new("0xabc");

        {
            let mut store = JsonFileScoreStore::open(&path).unwrap();
            assert_eq!(store.load(&addr).unwrap(), None);
            store.save(&addr, 17).unwrap();
        }

        let reopened = JsonFileScoreStore::open(&path).unwrap();
        assert_eq!(reopened.load(&addr).unwrap(), Some(17));
        assert!(reopened.record(&addr).is_some());
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(JsonFileScoreStore::open(&path), Err(StoreError::Json(_))));
    }
}
