//! World Changes
//!
//! Every registry mutation the sync controller performs is also recorded as a
//! change, so the rendering collaborator can create, move, rescale and destroy
//! sprites without diffing the registry itself.

use serde::{Serialize, Deserialize};
use crate::core::address::Address;
use crate::core::vec2::{GridPos, Vec2};

/// Where a change came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrigin {
    /// Applied optimistically from local input.
    Local,
    /// Applied from a server broadcast.
    Remote,
}

/// Change payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorldChangeData {
    /// Player registered
    PlayerJoined {
        address: Address,
        position: Vec2,
    },

    /// Remote player position snapped
    PlayerMoved {
        address: Address,
        position: Vec2,
    },

    /// Player mass/scale changed
    PlayerGrew {
        address: Address,
        mass: f32,
        scale: f32,
        score: u64,
    },

    /// Player removed after losing an elimination
    PlayerEliminated {
        loser: Address,
        winner: Address,
    },

    /// Pickup placed
    PickupSpawned {
        position: GridPos,
    },

    /// Pickup consumed
    PickupConsumed {
        position: GridPos,
        by: Address,
    },

    /// Global movement speed changed
    PaceChanged {
        speed: f32,
    },
}

/// A recorded world change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldChange {
    /// Monotonic sequence number within the session
    pub seq: u64,

    /// Optimistic or authoritative
    pub origin: ChangeOrigin,

    /// Change data
    pub data: WorldChangeData,
}

impl WorldChange {
    /// Create a new change record.
    pub fn new(seq: u64, origin: ChangeOrigin, data: WorldChangeData) -> Self {
        Self { seq, origin, data }
    }

    /// Player the change is about, if any.
    pub fn player(&self) -> Option<&Address> {
        match &self.data {
            WorldChangeData::PlayerJoined { address, .. }
            | WorldChangeData::PlayerMoved { address, .. }
            | WorldChangeData::PlayerGrew { address, .. } => Some(address),
            WorldChangeData::PlayerEliminated { loser, .. } => Some(loser),
            WorldChangeData::PickupConsumed { by, .. } => Some(by),
            WorldChangeData::PickupSpawned { .. } | WorldChangeData::PaceChanged { .. } => None,
        }
    }
}

/// Append-only change log, drained by the renderer.
#[derive(Clone, Debug, Default)]
pub struct ChangeLog {
    next_seq: u64,
    pending: Vec<WorldChange>,
}

impl ChangeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change.
    pub fn push(&mut self, origin: ChangeOrigin, data: WorldChangeData) {
        let change = WorldChange::new(self.next_seq, origin, data);
        self.next_seq += 1;
        self.pending.push(change);
    }

    /// Take pending changes (consumes them).
    pub fn take(&mut self) -> Vec<WorldChange> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_survives_take() {
        let mut log = ChangeLog::new();
        log.push(ChangeOrigin::Remote, WorldChangeData::PickupSpawned { position: GridPos::new(1, 1) });
        log.push(ChangeOrigin::Local, WorldChangeData::PaceChanged { speed: 299.0 });

        let first = log.take();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].seq, 0);
        assert_eq!(first[1].seq, 1);
        assert!(log.take().is_empty());

        log.push(ChangeOrigin::Remote, WorldChangeData::PickupSpawned { position: GridPos::new(2, 2) });
        assert_eq!(log.take()[0].seq, 2);
    }

    #[test]
    fn test_change_player() {
        let loser = Address::new("loser");
        let change = WorldChange::new(
            0,
            ChangeOrigin::Remote,
            WorldChangeData::PlayerEliminated { loser: loser.clone(), winner: Address::new("w") },
        );
        assert_eq!(change.player(), Some(&loser));
    }
}
