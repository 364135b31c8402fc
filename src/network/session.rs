//! Game Session Lifecycle
//!
//! Owns one player's participation in a match: join handshake, buffering of
//! events that arrive before the join, per-frame movement prediction, the
//! countdown and the terminal transitions.
//!
//! ```text
//! Idle ──join()──▶ Playing ──player-dead(self)──▶ Dead
//!                     │
//!                     └──────game-ended──────────▶ Ended
//! ```
//!
//! Terminal states are one-way: inbound events are dropped and nothing more
//! is sent.

use std::collections::VecDeque;
use std::path::PathBuf;

use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::core::address::Address;
use crate::core::vec2::{GridPos, Vec2};
use crate::game::collision;
use crate::game::events::WorldChange;
use crate::game::growth::{Pace, BASE_SPEED, MIN_SPEED};
use crate::game::store::{ScoreStore, StoreError};
use crate::network::protocol::{InboundEvent, OutboundEvent};
use crate::network::sync::{Reaction, SyncController};

/// Pointer distance under which the player stops moving.
pub const POINTER_DEAD_ZONE: f32 = 8.0;

/// Inbound events held while `Idle`. Later ones are dropped.
pub const EARLY_EVENT_LIMIT: usize = 1024;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Display name sent to the renderer.
    pub player_name: String,
    /// Identity subject; `None` means a random testing address.
    pub identity: Option<String>,
    /// Countdown duration (seconds).
    pub game_time: u32,
    /// World width (world units).
    pub world_width: f32,
    /// World height (world units).
    pub world_height: f32,
    /// Starting movement speed (units/sec).
    pub base_speed: f32,
    /// Movement speed floor (units/sec).
    pub min_speed: f32,
    /// Fixed spawn point; random inside the world when unset.
    pub spawn: Option<Vec2>,
    /// Pointer dead-zone radius.
    pub pointer_dead_zone: f32,
    /// Local frames per second.
    pub frame_rate: u32,
    /// JSON score file; in-memory scores when unset.
    pub score_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_name: "player".to_string(),
            identity: None,
            game_time: 120,
            world_width: 2000.0,
            world_height: 2000.0,
            base_speed: BASE_SPEED,
            min_speed: MIN_SPEED,
            spawn: None,
            pointer_dead_zone: POINTER_DEAD_ZONE,
            frame_rate: 60,
            score_file: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Values that don't parse, or that parse to a
    /// non-finite or out-of-range number, fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f32>().ok());
        let world_size = parse("ARENA_WORLD_SIZE").filter(|v| v.is_finite() && *v > 0.0);
        let speed = |key: &str| parse(key).filter(|v| v.is_finite() && *v >= 0.0);

        Self {
            player_name: lookup("ARENA_PLAYER_NAME").unwrap_or(defaults.player_name),
            identity: lookup("ARENA_IDENTITY"),
            game_time: lookup("ARENA_GAME_TIME")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.game_time),
            world_width: world_size.unwrap_or(defaults.world_width),
            world_height: world_size.unwrap_or(defaults.world_height),
            base_speed: speed("ARENA_BASE_SPEED").unwrap_or(defaults.base_speed),
            min_speed: speed("ARENA_MIN_SPEED").unwrap_or(defaults.min_speed),
            spawn: lookup("ARENA_SPAWN").and_then(|v| parse_point(&v)),
            pointer_dead_zone: defaults.pointer_dead_zone,
            frame_rate: lookup("ARENA_FRAME_RATE")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|rate| *rate > 0)
                .unwrap_or(defaults.frame_rate),
            score_file: lookup("ARENA_SCORE_FILE").map(PathBuf::from),
        }
    }

    /// Address for this configuration.
    pub fn address(&self) -> Address {
        match &self.identity {
            Some(subject) => Address::from_subject(subject),
            None => Address::random(),
        }
    }
}

/// Parse `"x,y"`.
fn parse_point(raw: &str) -> Option<Vec2> {
    let (x, y) = raw.split_once(',')?;
    let point = Vec2::new(x.trim().parse().ok()?, y.trim().parse().ok()?);
    point.is_finite().then_some(point)
}

/// Random coordinate in `[0, extent)`; 0 when the extent is unusable.
fn random_coord<R: Rng>(rng: &mut R, extent: f32) -> f32 {
    if extent.is_finite() && extent > 0.0 {
        rng.gen_range(0.0..extent)
    } else {
        0.0
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet joined. Inbound events are buffered.
    Idle,
    /// Joined and alive.
    Playing,
    /// Eliminated.
    Dead {
        /// Winner of the elimination
        by: Address,
    },
    /// Game over.
    Ended,
}

impl SessionState {
    /// Dead or Ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dead { .. } | Self::Ended)
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `join()` called twice.
    #[error("session already joined")]
    AlreadyJoined,

    /// Operation on a finished session.
    #[error("session is over")]
    Terminal,

    /// Score persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// SESSION
// =============================================================================

/// One player's game session.
#[derive(Debug)]
pub struct GameSession<S: ScoreStore> {
    config: SessionConfig,
    state: SessionState,
    controller: SyncController,
    store: S,
    early_events: VecDeque<InboundEvent>,
    remaining_seconds: u32,
}

impl<S: ScoreStore> GameSession<S> {
    /// Create an idle session for `address`.
    pub fn new(address: Address, config: SessionConfig, store: S) -> Self {
        let pace = Pace::new(config.base_speed, config.min_speed);
        let controller = SyncController::new(address, pace, config.game_time);

        Self {
            remaining_seconds: config.game_time,
            config,
            state: SessionState::Idle,
            controller,
            store,
            early_events: VecDeque::new(),
        }
    }

    /// Join at the configured spawn, or a random point inside the world.
    pub fn join(&mut self) -> Result<Vec2, SessionError> {
        let spawn = match self.config.spawn {
            Some(spawn) => spawn.clamp_to_world(self.config.world_width, self.config.world_height),
            None => {
                let mut rng = rand::thread_rng();
                Vec2::new(
                    random_coord(&mut rng, self.config.world_width),
                    random_coord(&mut rng, self.config.world_height),
                )
            }
        };
        self.join_at(spawn)?;
        Ok(spawn)
    }

    /// Register self at `spawn`, emit `join-game`, replay buffered events.
    pub fn join_at(&mut self, spawn: Vec2) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Playing => return Err(SessionError::AlreadyJoined),
            SessionState::Dead { .. } | SessionState::Ended => return Err(SessionError::Terminal),
        }

        // Self can't already be registered: load-players skips it while buffered.
        if let Err(e) = self.controller.join(spawn, &self.config.player_name, &self.store) {
            warn!("Join bookkeeping failed: {}", e);
        }
        self.state = SessionState::Playing;
        info!(
            "Joined as {} ({}) at {}",
            self.config.player_name,
            self.controller.self_address().short(),
            spawn
        );

        let buffered = std::mem::take(&mut self.early_events);
        if !buffered.is_empty() {
            debug!("Replaying {} early events", buffered.len());
        }
        for event in buffered {
            self.handle_inbound(event)?;
        }
        Ok(())
    }

    /// Feed a decoded server event.
    ///
    /// Only fails when persisting the ledger fails, on self-elimination or at
    /// game end; the terminal transition happens either way.
    pub fn handle_inbound(&mut self, event: InboundEvent) -> Result<(), SessionError> {
        match &self.state {
            SessionState::Idle => {
                if self.early_events.len() >= EARLY_EVENT_LIMIT {
                    warn!("Early event buffer full, dropping {}", event.name());
                } else {
                    trace!("Buffering {} until join", event.name());
                    self.early_events.push_back(event);
                }
                return Ok(());
            }
            SessionState::Dead { .. } | SessionState::Ended => {
                trace!("Dropping {} after session end", event.name());
                return Ok(());
            }
            SessionState::Playing => {}
        }

        match self.controller.apply(event, &self.store) {
            Reaction::None => {}
            Reaction::Clock { remaining } => {
                self.remaining_seconds = remaining;
            }
            Reaction::SelfEliminated { by } => {
                // Nothing reaches the ledger once dead, so save it now.
                let persisted = self.controller.ledger().persist(&mut self.store);
                info!(
                    "Game over for {}: eliminated by {}",
                    self.controller.self_address().short(),
                    by.short()
                );
                self.state = SessionState::Dead { by };
                let saved = persisted?;
                debug!("{} scores saved after elimination", saved);
            }
            Reaction::GameEnded => {
                let persisted = self.controller.ledger().persist(&mut self.store);
                self.state = SessionState::Ended;
                let saved = persisted?;
                info!(
                    "Game ended: final score {}, {} scores saved",
                    self.own_score(),
                    saved
                );
            }
        }
        Ok(())
    }

    /// Advance one local frame: move toward `pointer`, then resolve overlaps.
    pub fn frame(&mut self, pointer: Vec2, dt: f32) {
        if self.state != SessionState::Playing {
            return;
        }
        let Some(current) = self.controller.self_player().map(|p| p.position) else {
            return;
        };

        let next = predict_position(
            current,
            pointer,
            self.controller.pace().speed(),
            dt,
            self.config.pointer_dead_zone,
            (self.config.world_width, self.config.world_height),
        );
        self.controller.local_move(next);

        let (pickups, players) = match self.controller.self_player() {
            Some(me) => (
                collision::touching_pickups(me, self.controller.registry()),
                collision::edible_players(me, self.controller.registry()),
            ),
            None => return,
        };
        for position in pickups {
            self.controller.local_pickup_overlap(position, &self.store);
        }
        for address in players {
            self.controller.local_player_overlap(&address, &self.store);
        }
    }

    /// External physics reported an overlap with the pickup at `position`.
    pub fn report_pickup_overlap(&mut self, position: GridPos) -> bool {
        self.state == SessionState::Playing
            && self.controller.local_pickup_overlap(position, &self.store)
    }

    /// External physics reported an overlap with player `other`.
    pub fn report_player_overlap(&mut self, other: &Address) -> bool {
        self.state == SessionState::Playing
            && self.controller.local_player_overlap(other, &self.store)
    }

    /// Take queued outbound intents (consumes them).
    pub fn take_outbound(&mut self) -> Vec<OutboundEvent> {
        self.controller.take_outbound()
    }

    /// Take recorded world changes (consumes them).
    pub fn take_changes(&mut self) -> Vec<WorldChange> {
        self.controller.take_changes()
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Seconds left on the countdown.
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Local player's current score.
    pub fn own_score(&self) -> u64 {
        self.controller.ledger().score(self.controller.self_address())
    }

    /// Reconciliation state.
    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Score store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the session, returning its store.
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Step `current` toward `pointer` at `speed`, staying inside `world`.
///
/// Inside the dead-zone the player holds still.
pub fn predict_position(
    current: Vec2,
    pointer: Vec2,
    speed: f32,
    dt: f32,
    dead_zone: f32,
    world: (f32, f32),
) -> Vec2 {
    if !pointer.is_finite() || current.distance(pointer) <= dead_zone {
        return current;
    }
    let step = speed * dt.max(0.0);
    current
        .move_toward(pointer, step)
        .clamp_to_world(world.0, world.1)
}

// =============================================================================
// TESTS
// =============================================================================
