//! Network Layer
//!
//! Everything between the wire and the world model: frame codec,
//! reconciliation of server events with optimistic local actions, the
//! session lifecycle and the async driver.

pub mod protocol;
pub mod sync;
pub mod session;
pub mod client;

pub use protocol::{InboundEvent, OutboundEvent, PlayerSnapshot, ProtocolError};
pub use sync::{Reaction, SyncController, SyncError};
pub use session::{GameSession, SessionConfig, SessionError, SessionState};
pub use client::{run_session, ClientChannels, ClientError, ClientReport};
