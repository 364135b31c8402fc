//! Game Logic Module
//!
//! World model and rules. No networking here.
//!
//! ## Module Structure
//!
//! - `registry`: Player and pickup collections
//! - `ledger`: Address → score bookkeeping
//! - `store`: Cross-session score persistence
//! - `growth`: Scale, mass, elimination and pace rules
//! - `collision`: Local overlap detection
//! - `events`: World change log for the renderer

pub mod registry;
pub mod ledger;
pub mod store;
pub mod growth;
pub mod collision;
pub mod events;

// Re-export key types
pub use registry::{EntityRegistry, PlayerEntity, PickupEntity, RegistryError};
pub use ledger::{ScoreLedger, ScoreTransfer};
pub use store::{ScoreStore, MemoryScoreStore, JsonFileScoreStore, StoreError};
pub use growth::{EliminationOutcome, Pace};
pub use events::{WorldChange, WorldChangeData, ChangeOrigin};
