//! Score Ledger
//!
//! Address → score, as far as this client knows. Hydrated from the score
//! store when an address is first seen, credited by consumption, moved
//! wholesale on elimination, and written back at game end.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::address::Address;
use crate::game::store::{ScoreStore, StoreError};

/// Result of moving a loser's score to the winner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreTransfer {
    /// Points taken from the loser.
    pub moved: u64,
    /// Winner's score after the transfer.
    pub winner_score: u64,
}

/// Client-side score ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    scores: BTreeMap<Address, u64>,
}

impl ScoreLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score (0 for unknown addresses).
    pub fn score(&self, address: &Address) -> u64 {
        self.scores.get(address).copied().unwrap_or(0)
    }

    /// Check the ledger has an entry for `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.scores.contains_key(address)
    }

    /// Overwrite a score.
    pub fn set(&mut self, address: Address, score: u64) {
        self.scores.insert(address, score);
    }

    /// Load `address` from the store unless it is already tracked.
    ///
    /// Store failures are logged and the address starts at zero.
    pub fn hydrate<S: ScoreStore + ?Sized>(&mut self, address: &Address, store: &S) -> u64 {
        if let Some(score) = self.scores.get(address) {
            return *score;
        }

        let score = match store.load(address) {
            Ok(Some(score)) => {
                debug!("Loaded persisted score {} for {}", score, address.short());
                score
            }
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to load score for {}: {}", address.short(), e);
                0
            }
        };
        self.scores.insert(address.clone(), score);
        score
    }

    /// Add `amount` to a score. Returns the new score.
    pub fn credit(&mut self, address: &Address, amount: u64) -> u64 {
        let score = self.scores.entry(address.clone()).or_insert(0);
        *score = score.saturating_add(amount);
        *score
    }

    /// Move the loser's whole score to the winner; the loser ends at zero.
    pub fn transfer(&mut self, loser: &Address, winner: &Address) -> ScoreTransfer {
        if loser == winner {
            let score = self.score(winner);
            return ScoreTransfer { moved: 0, winner_score: score };
        }

        let moved = self.scores.insert(loser.clone(), 0).unwrap_or(0);
        let winner_score = self.credit(winner, moved);
        ScoreTransfer { moved, winner_score }
    }

    /// Iterate entries in address order.
    pub fn entries(&self) -> impl Iterator<Item = (&Address, u64)> {
        self.scores.iter().map(|(a, s)| (a, *s))
    }

    /// Number of tracked addresses.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Check the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sum of every tracked score.
    pub fn total(&self) -> u64 {
        self.scores.values().fold(0u64, |acc, s| acc.saturating_add(*s))
    }

    /// Write every entry to the store. Returns how many were saved.
    pub fn persist<S: ScoreStore + ?Sized>(&self, store: &mut S) -> Result<usize, StoreError> {
        for (address, score) in &self.scores {
            store.save(address, *score)?;
        }
        Ok(self.scores.len())
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }
}
