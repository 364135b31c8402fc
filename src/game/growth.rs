//! Growth Rules
//!
//! Pure functions mapping score to visual scale, consumption to mass, and a
//! mass comparison to an elimination outcome. Nothing in here mutates world
//! state; the sync controller consults these and applies the result.

use serde::{Serialize, Deserialize};

// =============================================================================
// GAME CONSTANTS
// =============================================================================

/// Mass every player spawns with.
pub const BASE_MASS: f32 = 10.0;

/// Score credited per pickup consumed.
pub const PICKUP_SCORE: u64 = 1;

/// Mass gained per pickup consumed.
pub const PICKUP_MASS_GAIN: f32 = 1.0;

/// Score points per +1.0 of visual scale.
pub const SCALE_DIVISOR: f32 = 100.0;

/// Global movement speed at session start (world units/sec).
pub const BASE_SPEED: f32 = 300.0;

/// Global movement speed never drops below this.
pub const MIN_SPEED: f32 = 30.0;

/// Global speed lost per pickup consumed, by anyone.
pub const PICKUP_SPEED_PENALTY: f32 = 1.0;

/// Global speed lost per elimination, by anyone.
pub const ELIMINATION_SPEED_PENALTY: f32 = 20.0;

/// Collision radius of a player at scale 1.0.
pub const BASE_RADIUS: f32 = 16.0;

/// Collision radius of a pickup.
pub const PICKUP_RADIUS: f32 = 4.0;

// =============================================================================
// SCALE & MASS
// =============================================================================

/// Visual scale for a score: `1 + score / 100`.
#[inline]
pub fn scale_for(score: u64) -> f32 {
    1.0 + score as f32 / SCALE_DIVISOR
}

/// Collision radius for a visual scale.
#[inline]
pub fn radius_for(scale: f32) -> f32 {
    BASE_RADIUS * scale
}

/// Mass after consuming one pickup.
#[inline]
pub fn mass_after_pickup(mass: f32) -> f32 {
    mass + PICKUP_MASS_GAIN
}

/// Mass of the survivor after absorbing the loser.
#[inline]
pub fn absorbed_mass(winner_mass: f32, loser_mass: f32) -> f32 {
    winner_mass + loser_mass
}

// =============================================================================
// ELIMINATION
// =============================================================================

/// Result of comparing two overlapping players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationOutcome {
    /// First player is strictly heavier and absorbs the second.
    FirstSurvives,
    /// Second player is strictly heavier and absorbs the first.
    SecondSurvives,
    /// Equal mass: nobody is eliminated.
    Standoff,
}

impl EliminationOutcome {
    /// Mirror the outcome as if the arguments were swapped.
    pub fn swapped(self) -> Self {
        match self {
            Self::FirstSurvives => Self::SecondSurvives,
            Self::SecondSurvives => Self::FirstSurvives,
            Self::Standoff => Self::Standoff,
        }
    }
}

/// Decide who survives an overlap between masses `a` and `b`.
///
/// Strictly greater mass wins; ties never resolve. Incomparable masses
/// (NaN) are treated as a standoff.
pub fn elimination_outcome(mass_a: f32, mass_b: f32) -> EliminationOutcome {
    if mass_a > mass_b {
        EliminationOutcome::FirstSurvives
    } else if mass_b > mass_a {
        EliminationOutcome::SecondSurvives
    } else {
        EliminationOutcome::Standoff
    }
}

// =============================================================================
// GLOBAL PACE
// =============================================================================

/// Shared movement-speed scalar.
///
/// Every consumption anywhere in the arena slows everybody down, so game
/// pacing follows aggregate activity. Clamped at `floor`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pace {
    speed: f32,
    floor: f32,
}

impl Pace {
    /// Create a pace starting at `speed`, never dropping below `floor`.
    pub fn new(speed: f32, floor: f32) -> Self {
        Self {
            speed: speed.max(floor),
            floor,
        }
    }

    /// Current speed (world units/sec).
    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Configured floor.
    #[inline]
    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Reduce speed by `penalty`, clamped at the floor.
    pub fn slow_down(&mut self, penalty: f32) {
        self.speed = (self.speed - penalty).max(self.floor);
    }

    /// Apply the penalty for one pickup consumption.
    pub fn after_pickup(&mut self) {
        self.slow_down(PICKUP_SPEED_PENALTY);
    }

    /// Apply the penalty for one elimination.
    pub fn after_elimination(&mut self) {
        self.slow_down(ELIMINATION_SPEED_PENALTY);
    }
}

impl Default for Pace {
    fn default() -> Self {
        Self::new(BASE_SPEED, MIN_SPEED)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scale_for_zero_is_one() {
        assert_eq!(scale_for(0), 1.0);
        assert_eq!(scale_for(100), 2.0);
        assert_eq!(scale_for(50), 1.5);
    }

    #[test]
    fn test_elimination_strict_mass() {
        assert_eq!(elimination_outcome(20.0, 5.0), EliminationOutcome::FirstSurvives);
        assert_eq!(elimination_outcome(5.0, 20.0), EliminationOutcome::SecondSurvives);
        assert_eq!(elimination_outcome(10.0, 10.0), EliminationOutcome::Standoff);
        assert_eq!(elimination_outcome(f32::NAN, 10.0), EliminationOutcome::Standoff);
    }

    #[test]
    fn test_absorbed_mass() {
        assert_eq!(absorbed_mass(20.0, 5.0), 25.0);
        assert_eq!(mass_after_pickup(BASE_MASS), 11.0);
    }

    #[test]
    fn test_pace_penalties() {
        let mut pace = Pace::default();
        pace.after_pickup();
        assert_eq!(pace.speed(), BASE_SPEED - 1.0);
        pace.after_elimination();
        assert_eq!(pace.speed(), BASE_SPEED - 21.0);
    }

    #[test]
    fn test_pace_floor() {
        let mut pace = Pace::new(35.0, MIN_SPEED);
        pace.after_elimination();
        assert_eq!(pace.speed(), MIN_SPEED);

        // Start below floor is lifted to the floor
        assert_eq!(Pace::new(10.0, MIN_SPEED).speed(), MIN_SPEED);
    }

    proptest! {
        #[test]
        fn prop_scale_monotonic(a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(scale_for(lo) <= scale_for(hi));
        }

        #[test]
        fn prop_elimination_antisymmetric(a in 0.1f32..10_000.0, b in 0.1f32..10_000.0) {
            let forward = elimination_outcome(a, b);
            let backward = elimination_outcome(b, a);
            prop_assert_eq!(forward, backward.swapped());
            if a == b {
                prop_assert_eq!(forward, EliminationOutcome::Standoff);
            } else {
                prop_assert_ne!(forward, EliminationOutcome::Standoff);
            }
        }

        #[test]
        fn prop_speed_never_below_floor(pickups in 0usize..500, eliminations in 0usize..50) {
            let mut pace = Pace::default();
            for _ in 0..pickups {
                pace.after_pickup();
            }
            for _ in 0..eliminations {
                pace.after_elimination();
            }
            prop_assert!(pace.speed() >= MIN_SPEED);
        }
    }
}
