//! Overlap Detection
//!
//! Stand-in for the physics collaborator's "overlap one entity against a
//! group" query. Only the local player is ever tested: remote consumptions
//! arrive as server events, never from local detection.

use crate::core::address::Address;
use crate::core::vec2::{GridPos, Vec2};
use crate::game::growth::{self, EliminationOutcome, PICKUP_RADIUS};
use crate::game::registry::{EntityRegistry, PlayerEntity};

/// Check if two circles overlap.
#[inline]
pub fn circles_overlap(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> bool {
    let combined = radius_a + radius_b;
    pos_a.distance_squared(pos_b) <= combined * combined
}

/// Pickups the player currently overlaps, in grid order.
pub fn touching_pickups(player: &PlayerEntity, registry: &EntityRegistry) -> Vec<GridPos> {
    registry
        .pickups()
        .filter(|pickup| {
            circles_overlap(player.position, player.radius(), pickup.center(), PICKUP_RADIUS)
        })
        .map(|pickup| pickup.position)
        .collect()
}

/// Overlapping players the given player is heavy enough to eliminate.
///
/// Equal-mass overlaps are skipped; ties never resolve.
pub fn edible_players(player: &PlayerEntity, registry: &EntityRegistry) -> Vec<Address> {
    registry
        .players()
        .filter(|other| other.address() != player.address())
        .filter(|other| {
            circles_overlap(player.position, player.radius(), other.position, other.radius())
        })
        .filter(|other| {
            growth::elimination_outcome(player.mass(), other.mass())
                == EliminationOutcome::FirstSurvives
        })
        .map(|other| other.address().clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circles_overlap() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);

        // Distance 10, combined radius 12
        assert!(circles_overlap(a, 6.0, b, 6.0));

        // Distance 20
        assert!(!circles_overlap(a, 6.0, Vec2::new(20.0, 0.0), 6.0));
    }

    #[test]
    fn test_touching_pickups() {
        let mut registry = EntityRegistry::new();
        let me = Address::new("me");
        registry.add_player(Vec2::new(50.0, 50.0), me.clone(), "me").unwrap();
        registry.add_pickup(GridPos::new(55, 50));
        registry.add_pickup(GridPos::new(500, 500));

        let player = registry.get_player(&me).unwrap();
        assert_eq!(touching_pickups(player, &registry), vec![GridPos::new(55, 50)]);
    }

    #[test]
    fn test_edible_players_needs_strictly_greater_mass() {
        let mut registry = EntityRegistry::new();
        let me = Address::new("me");
        let small = Address::new("small");
        let equal = Address::new("equal");

        registry.add_player(Vec2::new(0.0, 0.0), me.clone(), "me").unwrap();
        registry.add_player(Vec2::new(5.0, 0.0), small.clone(), "small").unwrap();
        registry.add_player(Vec2::new(0.0, 5.0), equal.clone(), "equal").unwrap();

        registry.get_player_mut(&me).unwrap().set_mass(20.0);
        registry.get_player_mut(&small).unwrap().set_mass(5.0);
        registry.get_player_mut(&equal).unwrap().set_mass(20.0);

        let player = registry.get_player(&me).unwrap();
        assert_eq!(edible_players(player, &registry), vec![small]);
    }
}
