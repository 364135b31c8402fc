//! Protocol Messages
//!
//! Wire format between the client and the relay server. Every frame is a
//! JSON array whose first element is the event name and the rest its
//! positional arguments:
//!
//! ```text
//! ["player-move", {"x": 120.5, "y": 88.0}, "0xabc..."]
//! ["remove-dot", {"x": 50, "y": 50}, "0xdef..."]
//! ["game-ended"]
//! ```
//!
//! Frames are decoded into typed sum types at this boundary. Unknown event
//! names, wrong arity and malformed payloads are rejected here and never
//! reach the sync controller.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::core::address::Address;
use crate::core::vec2::{GridPos, Vec2};

// =============================================================================
// EVENT NAMES
// =============================================================================

/// Client → server: announce self.
pub const JOIN_GAME: &str = "join-game";
/// Client → server: local position.
pub const MOVE: &str = "move";
/// Client → server: local pickup consumption.
pub const DOT_EATEN: &str = "dot-eaten";
/// Client → server: local elimination of a smaller player.
pub const PLAYER_EATEN: &str = "player-eaten";

/// Server → client: player snapshot after join.
pub const LOAD_PLAYERS: &str = "load-players";
/// Server → client: pickup snapshot after join.
pub const LOAD_DOTS: &str = "load-dots";
/// Server → client: remote position.
pub const PLAYER_MOVE: &str = "player-move";
/// Server → client: remote join.
pub const PLAYER_ADDED: &str = "player-added";
/// Server → client: pickup spawned.
pub const ADD_DOT: &str = "add-dot";
/// Server → client: pickup consumed.
pub const REMOVE_DOT: &str = "remove-dot";
/// Server → client: elimination resolved.
pub const PLAYER_DEAD: &str = "player-dead";
/// Server → client: countdown reached zero.
pub const GAME_ENDED: &str = "game-ended";
/// Server → client: elapsed seconds tick.
pub const SECONDS: &str = "seconds";

// =============================================================================
// PAYLOADS
// =============================================================================

/// Entry of a `load-players` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Display name, if the server knows one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PlayerSnapshot {
    /// Position as a vector.
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Pickup position as it arrives on the wire. Must be integral.
#[derive(Debug, Clone, Copy, Deserialize)]
struct DotWire {
    x: f64,
    y: f64,
}

impl DotWire {
    fn to_grid(self) -> Result<GridPos, ProtocolError> {
        let integral = |v: f64| v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64;
        if !integral(self.x) || !integral(self.y) {
            return Err(ProtocolError::NonIntegralPosition { x: self.x, y: self.y });
        }
        Ok(GridPos::new(self.x as i32, self.y as i32))
    }
}

/// Elapsed seconds; JS servers may send `12.0` for `12`.
fn whole_seconds(raw: f64) -> Result<u32, ProtocolError> {
    if raw.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&raw) {
        Ok(raw as u32)
    } else {
        Err(ProtocolError::InvalidSeconds(raw))
    }
}

// =============================================================================
// SERVER -> CLIENT EVENTS
// =============================================================================

/// Events relayed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Every player currently in the game, self included.
    LoadPlayers(BTreeMap<Address, PlayerSnapshot>),

    /// Every pickup currently in the game.
    LoadDots(Vec<GridPos>),

    /// A remote player moved.
    PlayerMove { position: Vec2, address: Address },

    /// A remote player joined.
    PlayerAdded { position: Vec2, address: Address },

    /// A pickup spawned.
    AddDot(GridPos),

    /// A pickup was consumed by `address`.
    RemoveDot { position: GridPos, address: Address },

    /// `loser` was eliminated by `winner`.
    PlayerDead { loser: Address, winner: Address },

    /// The countdown reached zero.
    GameEnded,

    /// Seconds elapsed since the game started.
    Seconds(u32),
}

impl InboundEvent {
    /// Wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadPlayers(_) => LOAD_PLAYERS,
            Self::LoadDots(_) => LOAD_DOTS,
            Self::PlayerMove { .. } => PLAYER_MOVE,
            Self::PlayerAdded { .. } => PLAYER_ADDED,
            Self::AddDot(_) => ADD_DOT,
            Self::RemoveDot { .. } => REMOVE_DOT,
            Self::PlayerDead { .. } => PLAYER_DEAD,
            Self::GameEnded => GAME_ENDED,
            Self::Seconds(_) => SECONDS,
        }
    }

    /// Decode a JSON frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let (name, args) = split_frame(frame)?;

        match name.as_str() {
            LOAD_PLAYERS => {
                let [players] = expect_args::<1>(LOAD_PLAYERS, args)?;
                Ok(Self::LoadPlayers(arg(LOAD_PLAYERS, players)?))
            }
            LOAD_DOTS => {
                let [dots] = expect_args::<1>(LOAD_DOTS, args)?;
                let dots: BTreeMap<String, DotWire> = arg(LOAD_DOTS, dots)?;
                let positions = dots
                    .into_values()
                    .map(DotWire::to_grid)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::LoadDots(positions))
            }
            PLAYER_MOVE => {
                let [position, address] = expect_args::<2>(PLAYER_MOVE, args)?;
                Ok(Self::PlayerMove {
                    position: arg(PLAYER_MOVE, position)?,
                    address: arg(PLAYER_MOVE, address)?,
                })
            }
            PLAYER_ADDED => {
                let [position, address] = expect_args::<2>(PLAYER_ADDED, args)?;
                Ok(Self::PlayerAdded {
                    position: arg(PLAYER_ADDED, position)?,
                    address: arg(PLAYER_ADDED, address)?,
                })
            }
            ADD_DOT => {
                let [position] = expect_args::<1>(ADD_DOT, args)?;
                Ok(Self::AddDot(arg::<DotWire>(ADD_DOT, position)?.to_grid()?))
            }
            REMOVE_DOT => {
                let [position, address] = expect_args::<2>(REMOVE_DOT, args)?;
                Ok(Self::RemoveDot {
                    position: arg::<DotWire>(REMOVE_DOT, position)?.to_grid()?,
                    address: arg(REMOVE_DOT, address)?,
                })
            }
            PLAYER_DEAD => {
                let [loser, winner] = expect_args::<2>(PLAYER_DEAD, args)?;
                Ok(Self::PlayerDead {
                    loser: arg(PLAYER_DEAD, loser)?,
                    winner: arg(PLAYER_DEAD, winner)?,
                })
            }
            GAME_ENDED => {
                let [] = expect_args::<0>(GAME_ENDED, args)?;
                Ok(Self::GameEnded)
            }
            SECONDS => {
                let [elapsed] = expect_args::<1>(SECONDS, args)?;
                Ok(Self::Seconds(whole_seconds(arg(SECONDS, elapsed)?)?))
            }
            _ => Err(ProtocolError::UnknownEvent(name)),
        }
    }

    /// Encode as a JSON frame.
    pub fn to_frame(&self) -> String {
        let frame = match self {
            Self::LoadPlayers(players) => json!([LOAD_PLAYERS, players]),
            Self::LoadDots(dots) => {
                let keyed: BTreeMap<String, &GridPos> =
                    dots.iter().map(|pos| (pos.key(), pos)).collect();
                json!([LOAD_DOTS, keyed])
            }
            Self::PlayerMove { position, address } => json!([PLAYER_MOVE, position, address]),
            Self::PlayerAdded { position, address } => json!([PLAYER_ADDED, position, address]),
            Self::AddDot(position) => json!([ADD_DOT, position]),
            Self::RemoveDot { position, address } => json!([REMOVE_DOT, position, address]),
            Self::PlayerDead { loser, winner } => json!([PLAYER_DEAD, loser, winner]),
            Self::GameEnded => json!([GAME_ENDED]),
            Self::Seconds(elapsed) => json!([SECONDS, elapsed]),
        };
        frame.to_string()
    }
}

// =============================================================================
// CLIENT -> SERVER EVENTS
// =============================================================================

/// Intents emitted by the local client.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Announce self at a spawn position.
    JoinGame { position: Vec2, address: Address },

    /// Local position, every frame.
    Move { position: Vec2, address: Address },

    /// Local player consumed the pickup at `position`.
    DotEaten { position: GridPos, address: Address },

    /// Local player (`winner`) eliminated `loser`.
    PlayerEaten { loser: Address, winner: Address },
}

impl OutboundEvent {
    /// Wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinGame { .. } => JOIN_GAME,
            Self::Move { .. } => MOVE,
            Self::DotEaten { .. } => DOT_EATEN,
            Self::PlayerEaten { .. } => PLAYER_EATEN,
        }
    }

    /// Encode as a JSON frame.
    pub fn to_frame(&self) -> String {
        let frame = match self {
            Self::JoinGame { position, address } => json!([JOIN_GAME, position, address]),
            Self::Move { position, address } => json!([MOVE, position, address]),
            Self::DotEaten { position, address } => json!([DOT_EATEN, position, address]),
            Self::PlayerEaten { loser, winner } => json!([PLAYER_EATEN, loser, winner]),
        };
        frame.to_string()
    }

    /// Decode a JSON frame (relay side).
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let (name, args) = split_frame(frame)?;

        match name.as_str() {
            JOIN_GAME => {
                let [position, address] = expect_args::<2>(JOIN_GAME, args)?;
                Ok(Self::JoinGame {
                    position: arg(JOIN_GAME, position)?,
                    address: arg(JOIN_GAME, address)?,
                })
            }
            MOVE => {
                let [position, address] = expect_args::<2>(MOVE, args)?;
                Ok(Self::Move {
                    position: arg(MOVE, position)?,
                    address: arg(MOVE, address)?,
                })
            }
            DOT_EATEN => {
                let [position, address] = expect_args::<2>(DOT_EATEN, args)?;
                Ok(Self::DotEaten {
                    position: arg::<DotWire>(DOT_EATEN, position)?.to_grid()?,
                    address: arg(DOT_EATEN, address)?,
                })
            }
            PLAYER_EATEN => {
                let [loser, winner] = expect_args::<2>(PLAYER_EATEN, args)?;
                Ok(Self::PlayerEaten {
                    loser: arg(PLAYER_EATEN, loser)?,
                    winner: arg(PLAYER_EATEN, winner)?,
                })
            }
            _ => Err(ProtocolError::UnknownEvent(name)),
        }
    }
}

// =============================================================================
// ERRORS & HELPERS
// =============================================================================

/// Frame decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame is not valid JSON.
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is not a JSON array.
    #[error("frame is not an array")]
    NotAnArray,

    /// First element missing or not a string.
    #[error("frame has no event name")]
    MissingEventName,

    /// Event name not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Wrong number of arguments.
    #[error("{event}: expected {expected} argument(s), got {got}")]
    Arity {
        /// Event name
        event: &'static str,
        /// Expected argument count
        expected: usize,
        /// Received argument count
        got: usize,
    },

    /// An argument has the wrong shape.
    #[error("{event}: bad payload: {source}")]
    Payload {
        /// Event name
        event: &'static str,
        /// Underlying decode error
        source: serde_json::Error,
    },

    /// Pickup position with a fractional or out-of-range coordinate.
    #[error("pickup position ({x}, {y}) is not on the grid")]
    NonIntegralPosition {
        /// Received X
        x: f64,
        /// Received Y
        y: f64,
    },

    /// Elapsed seconds that are negative, fractional or out of range.
    #[error("seconds: {0} is not a whole number of seconds")]
    InvalidSeconds(f64),
}

fn split_frame(frame: &str) -> Result<(String, Vec<Value>), ProtocolError> {
    let value: Value = serde_json::from_str(frame)?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::NotAnArray);
    };
    if items.is_empty() {
        return Err(ProtocolError::MissingEventName);
    }
    match items.remove(0) {
        Value::String(name) => Ok((name, items)),
        _ => Err(ProtocolError::MissingEventName),
    }
}

fn expect_args<const N: usize>(
    event: &'static str,
    args: Vec<Value>,
) -> Result<[Value; N], ProtocolError> {
    let got = args.len();
    args.try_into()
        .map_err(|_| ProtocolError::Arity { event, expected: N, got })
}

fn arg<T: DeserializeOwned>(event: &'static str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|source| ProtocolError::Payload { event, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_player_move() {
        let event = InboundEvent::decode(r#"["player-move", {"x": 120.5, "y": 88}, "0xabc"]"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::PlayerMove {
                position: Vec2::new(120.5, 88.0),
                address: Address::new("0xabc"),
            }
        );
    }

    #[test]
    fn test_decode_load_snapshots() {
        let players = InboundEvent::decode(
            r#"["load-players", {"a": {"x": 1, "y": 2}, "b": {"x": 3, "y": 4, "name": "Bee"}}]"#,
        )
        .unwrap();
        let InboundEvent::LoadPlayers(players) = players else {
            panic!("Wrong event type");
        };
        assert_eq!(players.len(), 2);
        assert_eq!(players[&Address::new("b")].name.as_deref(), Some("Bee"));
        assert_eq!(players[&Address::new("a")].name, None);

        let dots = InboundEvent::decode(
            r#"["load-dots", {"50 50": {"x": 50, "y": 50}, "7 9": {"x": 7.0, "y": 9.0}}]"#,
        )
        .unwrap();
        let InboundEvent::LoadDots(mut dots) = dots else {
            panic!("Wrong event type");
        };
        dots.sort();
        assert_eq!(dots, vec![GridPos::new(7, 9), GridPos::new(50, 50)]);
    }

    #[test]
    fn test_decode_misc_events() {
        assert_eq!(InboundEvent::decode(r#"["game-ended"]"#).unwrap(), InboundEvent::GameEnded);
        assert_eq!(InboundEvent::decode(r#"["seconds", 12]"#).unwrap(), InboundEvent::Seconds(12));
        assert_eq!(
            InboundEvent::decode(r#"["player-dead", "b", "a"]"#).unwrap(),
            InboundEvent::PlayerDead { loser: Address::new("b"), winner: Address::new("a") }
        );
        assert_eq!(
            InboundEvent::decode(r#"["remove-dot", {"x": 50, "y": 50}, "a"]"#).unwrap(),
            InboundEvent::RemoveDot { position: GridPos::new(50, 50), address: Address::new("a") }
        );
    }

    #[test]
    fn test_rejects_unknown_event() {
        let result = InboundEvent::decode(r#"["teleport", 1]"#);
        assert!(matches!(result, Err(ProtocolError::UnknownEvent(name)) if name == "teleport"));
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert!(matches!(InboundEvent::decode("{"), Err(ProtocolError::Json(_))));
        assert!(matches!(InboundEvent::decode(r#"{"type": "move"}"#), Err(ProtocolError::NotAnArray)));
        assert!(matches!(InboundEvent::decode("[]"), Err(ProtocolError::MissingEventName)));
        assert!(matches!(InboundEvent::decode("[42]"), Err(ProtocolError::MissingEventName)));
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let result = InboundEvent::decode(r#"["remove-dot", {"x": 1, "y": 1}]"#);
        assert!(matches!(
            result,
            Err(ProtocolError::Arity { event: "remove-dot", expected: 2, got: 1 })
        ));

        let result = InboundEvent::decode(r#"["game-ended", true]"#);
        assert!(matches!(result, Err(ProtocolError::Arity { expected: 0, got: 1, .. })));
    }

    #[test]
    fn test_rejects_bad_payload() {
        let result = InboundEvent::decode(r#"["player-move", "north", "a"]"#);
        assert!(matches!(result, Err(ProtocolError::Payload { event: "player-move", .. })));

        let result = InboundEvent::decode(r#"["seconds", -3]"#);
        assert!(matches!(result, Err(ProtocolError::InvalidSeconds(_))));

        let result = InboundEvent::decode(r#"["seconds", "ten"]"#);
        assert!(matches!(result, Err(ProtocolError::Payload { .. })));
    }

    #[test]
    fn test_seconds_accepts_whole_floats() {
        assert_eq!(InboundEvent::decode(r#"["seconds", 12.0]"#).unwrap(), InboundEvent::Seconds(12));

        let result = InboundEvent::decode(r#"["seconds", 12.5]"#);
        assert!(matches!(result, Err(ProtocolError::InvalidSeconds(_))));
    }

    #[test]
    fn test_rejects_off_grid_pickup() {
        let result = InboundEvent::decode(r#"["add-dot", {"x": 50.5, "y": 50}]"#);
        assert!(matches!(result, Err(ProtocolError::NonIntegralPosition { .. })));
    }

    #[test]
    fn test_outbound_frames() {
        let frame = OutboundEvent::DotEaten {
            position: GridPos::new(50, 50),
            address: Address::new("me"),
        }
        .to_frame();
        assert_eq!(frame, r#"["dot-eaten",{"x":50,"y":50},"me"]"#);

        let frame = OutboundEvent::PlayerEaten {
            loser: Address::new("b"),
            winner: Address::new("a"),
        }
        .to_frame();
        assert_eq!(frame, r#"["player-eaten","b","a"]"#);
    }

    #[test]
    fn test_load_dots_frame_decodes_back() {
        let event = InboundEvent::LoadDots(vec![GridPos::new(1, 2), GridPos::new(3, 4)]);
        let decoded = InboundEvent::decode(&event.to_frame()).unwrap();
        let InboundEvent::LoadDots(mut dots) = decoded else {
            panic!("Wrong event type");
        };
        dots.sort();
        assert_eq!(dots, vec![GridPos::new(1, 2), GridPos::new(3, 4)]);
    }
}
