//! Entity Registry
//!
//! The two keyed collections the client keeps in sync with the server:
//! players by address and pickups by grid position.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::address::Address;
use crate::core::vec2::{GridPos, Vec2};
use crate::game::growth::{self, BASE_MASS};

// =============================================================================
// PLAYER ENTITY
// =============================================================================

/// A player avatar as seen by this client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntity {
    address: Address,
    name: String,

    /// Current position. Predicted locally for self, snapped from
    /// `player-move` for everyone else.
    pub position: Vec2,

    mass: f32,
    scale: f32,
}

impl PlayerEntity {
    /// Create a player at base mass and scale 1.0.
    pub fn new(address: Address, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            address,
            name: name.into(),
            position,
            mass: BASE_MASS,
            scale: growth::scale_for(0),
        }
    }

    /// Primary key.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Display name, fixed at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical mass used in elimination comparisons.
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Visual scale, derived from score.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Collision radius at the current scale.
    #[inline]
    pub fn radius(&self) -> f32 {
        growth::radius_for(self.scale)
    }

    /// Recompute scale from the player's current score.
    pub(crate) fn rescale(&mut self, score: u64) {
        self.scale = growth::scale_for(score);
    }

    /// Grow by one consumed pickup.
    pub(crate) fn eat_pickup(&mut self, new_score: u64) {
        self.mass = growth::mass_after_pickup(self.mass);
        self.rescale(new_score);
    }

    /// Absorb an eliminated player's mass.
    pub(crate) fn absorb(&mut self, loser_mass: f32, new_score: u64) {
        self.mass = growth::absorbed_mass(self.mass, loser_mass);
        self.rescale(new_score);
    }

    #[cfg(test)]
    pub(crate) fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
    }
}

// =============================================================================
// PICKUP ENTITY
// =============================================================================

/// A stationary consumable. Its position is its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupEntity {
    /// Grid position (also the registry key)
    pub position: GridPos,
}

impl PickupEntity {
    /// Create a pickup.
    pub fn new(position: GridPos) -> Self {
        Self { position }
    }

    /// Centre in continuous world space.
    pub fn center(&self) -> Vec2 {
        Vec2::from(self.position)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A player with this address is already registered.
    #[error("player {0} already registered")]
    PlayerExists(Address),

    /// No player with this address.
    #[error("player {0} not found")]
    PlayerNotFound(Address),

    /// No pickup at this position.
    #[error("no pickup at {0}")]
    PickupNotFound(GridPos),
}

/// Players and pickups known to this client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    players: BTreeMap<Address, PlayerEntity>,
    pickups: BTreeMap<GridPos, PickupEntity>,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player.
    ///
    /// Duplicate addresses are rejected and the live entity is left as is.
    pub fn add_player(
        &mut self,
        position: Vec2,
        address: Address,
        name: impl Into<String>,
    ) -> Result<&PlayerEntity, RegistryError> {
        use std::collections::btree_map::Entry;

        match self.players.entry(address) {
            Entry::Occupied(entry) => Err(RegistryError::PlayerExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                let player = PlayerEntity::new(entry.key().clone(), name, position);
                Ok(entry.insert(player))
            }
        }
    }

    /// Remove a player.
    pub fn remove_player(&mut self, address: &Address) -> Result<PlayerEntity, RegistryError> {
        self.players
            .remove(address)
            .ok_or_else(|| RegistryError::PlayerNotFound(address.clone()))
    }

    /// Get a player by address.
    pub fn get_player(&self, address: &Address) -> Option<&PlayerEntity> {
        self.players.get(address)
    }

    /// Get a player mutably by address.
    pub fn get_player_mut(&mut self, address: &Address) -> Option<&mut PlayerEntity> {
        self.players.get_mut(address)
    }

    /// Check a player is registered.
    pub fn contains_player(&self, address: &Address) -> bool {
        self.players.contains_key(address)
    }

    /// Iterate players in address order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.players.values()
    }

    /// Number of registered players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Place a pickup. An existing pickup at the same key is overwritten.
    pub fn add_pickup(&mut self, position: GridPos) -> &PickupEntity {
        if self.pickups.contains_key(&position) {
            debug!("Pickup at {} overwritten", position);
        }
        self.pickups.insert(position, PickupEntity::new(position));
        &self.pickups[&position]
    }

    /// Remove a pickup.
    pub fn remove_pickup(&mut self, position: GridPos) -> Result<PickupEntity, RegistryError> {
        self.pickups
            .remove(&position)
            .ok_or(RegistryError::PickupNotFound(position))
    }

    /// Check a pickup exists at `position`.
    pub fn contains_pickup(&self, position: GridPos) -> bool {
        self.pickups.contains_key(&position)
    }

    /// Iterate pickups in grid order.
    pub fn pickups(&self) -> impl Iterator<Item = &PickupEntity> {
        self.pickups.values()
    }

    /// Number of pickups.
    pub fn pickup_count(&self) -> usize {
        self.pickups.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
