//! # Arena Sync
//!
//! Client-side state synchronization for a real-time multiplayer arena game:
//! players roam a bounded 2D world, absorb pickups to grow, and eliminate
//! strictly smaller players on contact.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ARENA SYNC                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - World vectors and integral grid keys      │
//! │  └── address.rs  - Player identity                           │
//! │                                                              │
//! │  game/           - World model (no I/O)                      │
//! │  ├── registry.rs - Known players and pickups                 │
//! │  ├── ledger.rs   - Address → score bookkeeping               │
//! │  ├── store.rs    - Cross-session score persistence           │
//! │  ├── growth.rs   - Mass, scale, elimination and pace rules   │
//! │  ├── collision.rs- Local overlap detection                   │
//! │  └── events.rs   - World change records for the renderer     │
//! │                                                              │
//! │  network/        - Reconciliation and transport glue         │
//! │  ├── protocol.rs - JSON array frames                         │
//! │  ├── sync.rs     - Server event dispatch + optimistic actions│
//! │  ├── session.rs  - Join, countdown, terminal transitions     │
//! │  └── client.rs   - Async driver                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! The server is trusted. Local consumptions are applied immediately and
//! announced; the server's echo of the same action finds the pickup or the
//! loser already gone and changes nothing, so every credit happens exactly
//! once. Positions are last-write-wins.
//!
//! Maps are `BTreeMap` throughout so iteration (and therefore overlap
//! resolution and persistence order) is deterministic.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::address::Address;
pub use core::vec2::{GridPos, Vec2};
pub use game::registry::{EntityRegistry, PlayerEntity, PickupEntity};
pub use game::ledger::ScoreLedger;
pub use game::store::{JsonFileScoreStore, MemoryScoreStore, ScoreStore};
pub use network::protocol::{InboundEvent, OutboundEvent};
pub use network::session::{GameSession, SessionConfig, SessionState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
