//! World Coordinates
//!
//! Two coordinate types live side by side:
//!
//! - [`Vec2`]: continuous f32 position of a player avatar. Mutated every
//!   frame by local prediction or by `player-move` snaps.
//! - [`GridPos`]: discrete integer position of a pickup. Pickups are keyed by
//!   their position, so the key must be exact. Never derive one by rounding a
//!   `Vec2`; take it from the server as-is.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

/// Continuous 2D vector in world units.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Squared length (avoids sqrt - prefer this for comparisons).
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Distance to another point. Prefer `distance_squared` when possible.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }

    /// Step toward `target` by at most `max_step`, never overshooting.
    pub fn move_toward(self, target: Self, max_step: f32) -> Self {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_step || dist == 0.0 {
            return target;
        }
        self + delta.scale(max_step / dist)
    }

    /// Clamp both components into `[0, width] x [0, height]`.
    ///
    /// Never panics: a negative bound pins the component to 0, a NaN bound
    /// leaves only the lower clamp in effect.
    #[inline]
    pub fn clamp_to_world(self, width: f32, height: f32) -> Self {
        Self {
            x: self.x.min(width).max(0.0),
            y: self.y.min(height).max(0.0),
        }
    }

    /// Check both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<GridPos> for Vec2 {
    fn from(pos: GridPos) -> Self {
        Self::new(pos.x as f32, pos.y as f32)
    }
}

impl fmt::Debug for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec2({:.2}, {:.2})", self.x, self.y)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// =============================================================================
// GRID POSITION
// =============================================================================

/// Discrete pickup coordinate. Doubles as the pickup's registry key.
///
/// Ordered (x, then y) so pickup iteration is deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// X cell
    pub x: i32,
    /// Y cell
    pub y: i32,
}

impl GridPos {
    /// Create a new grid position.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wire key used by `load-dots` snapshots (`"x y"`).
    pub fn key(&self) -> String {
        format!("{} {}", self.x, self.y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_add_sub() {
        let a = Vec2::new(3.0, 4.0);
        let b = Vec2::new(1.0, 2.0);
        assert_eq!(a + b, Vec2::new(4.0, 6.0));
        assert_eq!(a - b, Vec2::new(2.0, 2.0));
        assert_eq!(-b, Vec2::new(-1.0, -2.0));
    }

    #[test]
    fn test_vec2_length() {
        // 3-4-5 triangle
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.length_squared(), 25.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(Vec2::ZERO.distance(v), 5.0);
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = Vec2::new(3.0, 4.0).normalize();
        assert!((norm.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_move_toward_steps_and_stops() {
        let start = Vec2::new(0.0, 0.0);
        let target = Vec2::new(10.0, 0.0);

        let stepped = start.move_toward(target, 4.0);
        assert_eq!(stepped, Vec2::new(4.0, 0.0));

        // Never overshoots
        let arrived = stepped.move_toward(target, 100.0);
        assert_eq!(arrived, target);
    }

    #[test]
    fn test_clamp_to_world() {
        let outside = Vec2::new(-5.0, 2500.0);
        assert_eq!(outside.clamp_to_world(2000.0, 2000.0), Vec2::new(0.0, 2000.0));

        let inside = Vec2::new(10.0, 20.0);
        assert_eq!(inside.clamp_to_world(2000.0, 2000.0), inside);
    }

    #[test]
    fn test_clamp_to_world_degenerate_bounds() {
        let p = Vec2::new(50.0, 50.0);
        assert_eq!(p.clamp_to_world(-10.0, -10.0), Vec2::ZERO);
        assert_eq!(p.clamp_to_world(f32::NAN, f32::NAN), p);
        assert_eq!(p.clamp_to_world(f32::INFINITY, 20.0), Vec2::new(50.0, 20.0));
    }

    #[test]
    fn test_grid_pos_key_and_order() {
        assert_eq!(GridPos::new(50, -7).key(), "50 -7");
        assert!(GridPos::new(1, 9) < GridPos::new(2, 0));
        assert!(GridPos::new(1, 0) < GridPos::new(1, 1));
        assert_eq!(Vec2::from(GridPos::new(3, 4)), Vec2::new(3.0, 4.0));
    }
}
