//! Sync Controller
//!
//! Dispatch table from inbound server event to handler, plus the optimistic
//! local actions that produce outbound intents.
//!
//! ## Reconciliation model
//!
//! Local consumption is applied immediately and announced to the server. The
//! server later relays the same action back (`remove-dot`, `player-dead`).
//! By then the pickup or the loser is already gone, so the echo finds
//! nothing to remove and credits nothing. Only our own actions are echoed:
//! when a remote player is credited for something we no longer hold, the
//! score still moves, and only the pace penalty is skipped.
//!
//! Positions are last-write-wins. There are no sequence numbers, so a stale
//! `player-move` delivered late will briefly snap a player backwards.

use tracing::{debug, info, trace, warn};

use crate::core::address::Address;
use crate::core::vec2::{GridPos, Vec2};
use crate::game::events::{ChangeLog, ChangeOrigin, WorldChange, WorldChangeData};
use crate::game::growth::{self, EliminationOutcome, Pace, PICKUP_SCORE};
use crate::game::ledger::ScoreLedger;
use crate::game::registry::{EntityRegistry, PlayerEntity, RegistryError};
use crate::game::store::ScoreStore;
use crate::network::protocol::{InboundEvent, OutboundEvent};

/// What the session has to do after an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing beyond the world mutation already applied.
    None,
    /// Update the countdown display.
    Clock {
        /// Seconds left on the countdown
        remaining: u32,
    },
    /// The local player was eliminated.
    SelfEliminated {
        /// Winner of the elimination
        by: Address,
    },
    /// The game is over.
    GameEnded,
}

/// Reconciliation failures. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The event refers to an entity this client does not have.
    #[error("desync: {0}")]
    Desync(#[from] RegistryError),

    /// A join for an address that is already registered.
    #[error("duplicate join from {0}")]
    DuplicateJoin(Address),
}

/// Client-side reconciliation state machine.
#[derive(Debug, Clone)]
pub struct SyncController {
    self_address: Address,
    game_time: u32,
    registry: EntityRegistry,
    ledger: ScoreLedger,
    pace: Pace,
    outbox: Vec<OutboundEvent>,
    changes: ChangeLog,
}

impl SyncController {
    /// Create a controller for the local player `self_address`.
    pub fn new(self_address: Address, pace: Pace, game_time: u32) -> Self {
        Self {
            self_address,
            game_time,
            registry: EntityRegistry::new(),
            ledger: ScoreLedger::new(),
            pace,
            outbox: Vec::new(),
            changes: ChangeLog::new(),
        }
    }

    /// Local player's address.
    pub fn self_address(&self) -> &Address {
        &self.self_address
    }

    /// Local player entity, while alive.
    pub fn self_player(&self) -> Option<&PlayerEntity> {
        self.registry.get_player(&self.self_address)
    }

    /// Known players and pickups.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Known scores.
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Current global pace.
    pub fn pace(&self) -> Pace {
        self.pace
    }

    /// Countdown duration in seconds.
    pub fn game_time(&self) -> u32 {
        self.game_time
    }

    /// Take queued outbound intents (consumes them).
    pub fn take_outbound(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Take recorded world changes (consumes them).
    pub fn take_changes(&mut self) -> Vec<WorldChange> {
        self.changes.take()
    }

    // =========================================================================
    // JOIN
    // =========================================================================

    /// Register the local player at its spawn point and emit `join-game`.
    pub fn join<S: ScoreStore + ?Sized>(
        &mut self,
        spawn: Vec2,
        name: &str,
        store: &S,
    ) -> Result<(), SyncError> {
        let address = self.self_address.clone();
        self.register(spawn, address.clone(), name.to_string(), ChangeOrigin::Local, store)?;
        self.outbox.push(OutboundEvent::JoinGame { position: spawn, address });
        Ok(())
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Apply a server event. Desync is logged and treated as already applied.
    pub fn apply<S: ScoreStore + ?Sized>(&mut self, event: InboundEvent, store: &S) -> Reaction {
        let name = event.name();
        match self.dispatch(event, store) {
            Ok(reaction) => reaction,
            Err(SyncError::Desync(e)) => {
                debug!("{} treated as already applied: {}", name, e);
                Reaction::None
            }
            Err(e @ SyncError::DuplicateJoin(_)) => {
                warn!("{} rejected: {}", name, e);
                Reaction::None
            }
        }
    }

    fn dispatch<S: ScoreStore + ?Sized>(
        &mut self,
        event: InboundEvent,
        store: &S,
    ) -> Result<Reaction, SyncError> {
        match event {
            InboundEvent::LoadPlayers(players) => {
                for (address, snapshot) in players {
                    if address == self.self_address {
                        continue;
                    }
                    let name = snapshot
                        .name
                        .clone()
                        .unwrap_or_else(|| address.short().to_string());
                    if let Err(e) =
                        self.register(snapshot.position(), address, name, ChangeOrigin::Remote, store)
                    {
                        warn!("load-players entry rejected: {}", e);
                    }
                }
                Ok(Reaction::None)
            }

            InboundEvent::LoadDots(dots) => {
                for position in dots {
                    self.spawn_pickup(position);
                }
                Ok(Reaction::None)
            }

            InboundEvent::PlayerMove { position, address } => {
                // Own position is predicted locally; relayed copies are stale.
                if address == self.self_address {
                    return Ok(Reaction::None);
                }
                let player = self
                    .registry
                    .get_player_mut(&address)
                    .ok_or_else(|| RegistryError::PlayerNotFound(address.clone()))?;
                player.position = position;
                trace!("{} moved to {}", address.short(), position);
                self.changes.push(
                    ChangeOrigin::Remote,
                    WorldChangeData::PlayerMoved { address, position },
                );
                Ok(Reaction::None)
            }

            InboundEvent::PlayerAdded { position, address } => {
                if address == self.self_address {
                    return Ok(Reaction::None);
                }
                let name = address.short().to_string();
                self.register(position, address, name, ChangeOrigin::Remote, store)?;
                Ok(Reaction::None)
            }

            InboundEvent::AddDot(position) => {
                self.spawn_pickup(position);
                Ok(Reaction::None)
            }

            InboundEvent::RemoveDot { position, address } => {
                self.consume_pickup(position, &address, ChangeOrigin::Remote, store)?;
                Ok(Reaction::None)
            }

            InboundEvent::PlayerDead { loser, winner } => {
                let applied = self.eliminate(&loser, &winner, ChangeOrigin::Remote, store);
                if loser == self.self_address {
                    if let Err(e) = applied {
                        debug!("Self elimination bookkeeping skipped: {}", e);
                    }
                    info!("Eliminated by {}", winner.short());
                    return Ok(Reaction::SelfEliminated { by: winner });
                }
                applied?;
                Ok(Reaction::None)
            }

            InboundEvent::GameEnded => Ok(Reaction::GameEnded),

            InboundEvent::Seconds(elapsed) => Ok(Reaction::Clock {
                remaining: self.game_time.saturating_sub(elapsed),
            }),
        }
    }

    // =========================================================================
    // LOCAL (OPTIMISTIC)
    // =========================================================================

    /// Move the local player and announce the new position.
    ///
    /// Returns false once the local player is gone.
    pub fn local_move(&mut self, position: Vec2) -> bool {
        let Some(player) = self.registry.get_player_mut(&self.self_address) else {
            return false;
        };
        player.position = position;
        self.outbox.push(OutboundEvent::Move {
            position,
            address: self.self_address.clone(),
        });
        true
    }

    /// Local player overlaps the pickup at `position`: announce and apply.
    ///
    /// Returns false if there is no such pickup (already consumed).
    pub fn local_pickup_overlap<S: ScoreStore + ?Sized>(
        &mut self,
        position: GridPos,
        store: &S,
    ) -> bool {
        if !self.registry.contains_pickup(position) || self.self_player().is_none() {
            return false;
        }

        let address = self.self_address.clone();
        self.outbox.push(OutboundEvent::DotEaten {
            position,
            address: address.clone(),
        });
        self.consume_pickup(position, &address, ChangeOrigin::Local, store)
            .is_ok()
    }

    /// Local player overlaps `other`: eliminate it if strictly lighter.
    ///
    /// Returns true if an elimination was announced and applied.
    pub fn local_player_overlap<S: ScoreStore + ?Sized>(
        &mut self,
        other: &Address,
        store: &S,
    ) -> bool {
        if *other == self.self_address {
            return false;
        }
        let (Some(me), Some(them)) = (self.self_player(), self.registry.get_player(other)) else {
            return false;
        };
        if growth::elimination_outcome(me.mass(), them.mass()) != EliminationOutcome::FirstSurvives {
            return false;
        }

        let winner = self.self_address.clone();
        self.outbox.push(OutboundEvent::PlayerEaten {
            loser: other.clone(),
            winner: winner.clone(),
        });
        self.eliminate(other, &winner, ChangeOrigin::Local, store).is_ok()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    fn register<S: ScoreStore + ?Sized>(
        &mut self,
        position: Vec2,
        address: Address,
        name: String,
        origin: ChangeOrigin,
        store: &S,
    ) -> Result<(), SyncError> {
        if self.registry.contains_player(&address) {
            return Err(SyncError::DuplicateJoin(address));
        }
        let score = self.ledger.hydrate(&address, store);
        self.registry.add_player(position, address.clone(), name)?;
        if let Some(player) = self.registry.get_player_mut(&address) {
            player.rescale(score);
        }

        debug!("Registered {} at {}", address.short(), position);
        self.changes.push(origin, WorldChangeData::PlayerJoined { address, position });
        Ok(())
    }

    fn spawn_pickup(&mut self, position: GridPos) {
        self.registry.add_pickup(position);
        self.changes.push(ChangeOrigin::Remote, WorldChangeData::PickupSpawned { position });
    }

    /// Remove the pickup, credit the consumer, grow it, slow everyone down.
    ///
    /// A missing pickup credits nothing when the consumer is the local
    /// player: that is the echo of our own `dot-eaten`. A remote consumer is
    /// still credited (its `add-dot` may never have reached us), but the
    /// pace penalty is skipped since we can't tell whether it was applied.
    fn consume_pickup<S: ScoreStore + ?Sized>(
        &mut self,
        position: GridPos,
        by: &Address,
        origin: ChangeOrigin,
        store: &S,
    ) -> Result<(), SyncError> {
        let present = match self.registry.remove_pickup(position) {
            Ok(_) => true,
            Err(e) if *by == self.self_address => return Err(e.into()),
            Err(e) => {
                debug!("{}, crediting {} anyway", e, by.short());
                false
            }
        };

        self.ledger.hydrate(by, store);
        let score = self.ledger.credit(by, PICKUP_SCORE);
        if present {
            self.changes.push(
                origin,
                WorldChangeData::PickupConsumed { position, by: by.clone() },
            );
        }

        if let Some(player) = self.registry.get_player_mut(by) {
            player.eat_pickup(score);
            let (mass, scale) = (player.mass(), player.scale());
            self.changes.push(
                origin,
                WorldChangeData::PlayerGrew { address: by.clone(), mass, scale, score },
            );
        } else {
            debug!("Pickup {} consumed by unknown player {}", position, by.short());
        }

        if present {
            self.pace.after_pickup();
            self.changes.push(origin, WorldChangeData::PaceChanged { speed: self.pace.speed() });
        }
        Ok(())
    }

    /// Remove the loser, move its score and mass to the winner, slow
    /// everyone down.
    ///
    /// A missing loser is the echo of our own `player-eaten` when the local
    /// player won, and changes nothing. With a remote winner the score
    /// transfer is still settled; mass growth and the pace penalty are
    /// skipped because the loser's mass is unknown.
    fn eliminate<S: ScoreStore + ?Sized>(
        &mut self,
        loser: &Address,
        winner: &Address,
        origin: ChangeOrigin,
        store: &S,
    ) -> Result<(), SyncError> {
        if loser == winner {
            debug!("Ignoring self-elimination of {}", loser.short());
            return Ok(());
        }

        let removed = match self.registry.remove_player(loser) {
            Ok(player) => Some(player),
            Err(e) if *winner == self.self_address => return Err(e.into()),
            Err(e) => {
                debug!("{}, settling score for {} anyway", e, winner.short());
                None
            }
        };

        self.ledger.hydrate(loser, store);
        self.ledger.hydrate(winner, store);
        let transfer = self.ledger.transfer(loser, winner);
        if removed.is_some() {
            self.changes.push(
                origin,
                WorldChangeData::PlayerEliminated { loser: loser.clone(), winner: winner.clone() },
            );
        }

        if let Some(player) = self.registry.get_player_mut(winner) {
            match &removed {
                Some(eaten) => player.absorb(eaten.mass(), transfer.winner_score),
                None => player.rescale(transfer.winner_score),
            }
            let (mass, scale) = (player.mass(), player.scale());
            self.changes.push(
                origin,
                WorldChangeData::PlayerGrew {
                    address: winner.clone(),
                    mass,
                    scale,
                    score: transfer.winner_score,
                },
            );
        } else {
            debug!("{} eliminated by unknown player {}", loser.short(), winner.short());
        }

        if removed.is_some() {
            self.pace.after_elimination();
            self.changes.push(origin, WorldChangeData::PaceChanged { speed: self.pace.speed() });
        }
        info!(
            "{} eliminated {} (+{} score)",
            winner.short(),
            loser.short(),
            transfer.moved
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
