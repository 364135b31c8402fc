//! Core primitives.
//!
//! Coordinates and identity shared by every other module.

pub mod vec2;
pub mod address;

// Re-export core types
pub use vec2::{Vec2, GridPos};
pub use address::Address;
