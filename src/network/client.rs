//! Client Driver
//!
//! Runs a [`GameSession`] on a single tokio task: a frame interval drives
//! local prediction, inbound text frames are decoded and applied, outbound
//! intents are encoded and pushed to the transport after every step. World
//! changes are drained every step too, and forwarded to the renderer when
//! one is listening.
//!
//! The transport itself is whatever sits on the other ends of the channels.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::core::vec2::Vec2;
use crate::game::events::WorldChange;
use crate::game::store::ScoreStore;
use crate::network::protocol::InboundEvent;
use crate::network::session::{GameSession, SessionError};

/// Channel ends connecting a session to its transport and pointer source.
#[derive(Debug)]
pub struct ClientChannels {
    /// Raw server frames.
    pub inbound: mpsc::Receiver<String>,
    /// Encoded client frames.
    pub outbound: mpsc::Sender<String>,
    /// Latest pointer target in world coordinates.
    pub pointer: watch::Receiver<Vec2>,
    /// Renderer feed. Changes are discarded when `None` or when it lags.
    pub changes: Option<mpsc::Sender<WorldChange>>,
}

/// Driver errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport dropped its receiving end.
    #[error("outbound channel closed")]
    OutboundClosed,

    /// Session failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What a finished driver hands back.
#[derive(Debug)]
pub struct ClientReport<S: ScoreStore> {
    /// The session, in its final state.
    pub session: GameSession<S>,
    /// Frames simulated.
    pub frames: u64,
    /// Inbound frames rejected at decode.
    pub rejected: u64,
    /// World changes the renderer feed could not take.
    pub dropped_changes: u64,
}

/// Join and run `session` until it reaches a terminal state or the inbound
/// channel closes.
pub async fn run_session<S: ScoreStore>(
    mut session: GameSession<S>,
    channels: ClientChannels,
) -> Result<ClientReport<S>, ClientError> {
    let ClientChannels { mut inbound, outbound, pointer, changes } = channels;
    let mut dropped_changes = 0u64;

    let frame_rate = session.config().frame_rate.max(1);
    let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(frame_rate)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    session.join()?;
    flush(&mut session, &outbound).await?;
    dropped_changes += forward_changes(&mut session, changes.as_ref());

    let mut last_frame = Instant::now();
    let mut frames = 0u64;
    let mut rejected = 0u64;

    while !session.state().is_terminal() {
        tokio::select! {
            now = ticker.tick() => {
                let dt = now.saturating_duration_since(last_frame).as_secs_f32();
                last_frame = now;
                let target = *pointer.borrow();
                session.frame(target, dt);
                frames += 1;
            }
            frame = inbound.recv() => {
                let Some(text) = frame else {
                    info!("Inbound channel closed, stopping session");
                    break;
                };
                match InboundEvent::decode(&text) {
                    Ok(event) => {
                        trace!("<- {}", event.name());
                        session.handle_inbound(event)?;
                    }
                    Err(e) => {
                        rejected += 1;
                        warn!("Rejected inbound frame: {}", e);
                    }
                }
            }
        }
        flush(&mut session, &outbound).await?;
        dropped_changes += forward_changes(&mut session, changes.as_ref());
    }

    debug!(
        "Driver finished after {} frames ({} rejected inbound)",
        frames, rejected
    );
    Ok(ClientReport { session, frames, rejected, dropped_changes })
}

async fn flush<S: ScoreStore>(
    session: &mut GameSession<S>,
    outbound: &mpsc::Sender<String>,
) -> Result<(), ClientError> {
    for event in session.take_outbound() {
        trace!("-> {}", event.name());
        outbound
            .send(event.to_frame())
            .await
            .map_err(|_| ClientError::OutboundClosed)?;
    }
    Ok(())
}

/// Hand pending world changes to the renderer. Returns how many were lost.
fn forward_changes<S: ScoreStore>(
    session: &mut GameSession<S>,
    feed: Option<&mpsc::Sender<WorldChange>>,
) -> u64 {
    let pending = session.take_changes();
    let Some(feed) = feed else {
        return 0;
    };

    let mut dropped = 0;
    for change in pending {
        match feed.try_send(change) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => dropped += 1,
            Err(TrySendError::Closed(_)) => return 0,
        }
    }
    if dropped > 0 {
        trace!("Renderer lagging, dropped {} world changes", dropped);
    }
    dropped
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::Address;
    use crate::core::vec2::GridPos;
    use crate::game::events::WorldChangeData;
    use crate::game::store::MemoryScoreStore;
    use crate::network::protocol::OutboundEvent;
    use crate::network::session::{SessionConfig, SessionState};

    struct Harness {
        to_client: mpsc::Sender<String>,
        from_client: mpsc::Receiver<String>,
        _pointer: watch::Sender<Vec2>,
        changes: mpsc::Receiver<WorldChange>,
        handle: tokio::task::JoinHandle<Result<ClientReport<MemoryScoreStore>, ClientError>>,
    }

    fn start(config: SessionConfig) -> Harness {
        let (to_client, inbound) = mpsc::channel(64);
        let (outbound, from_client) = mpsc::channel(4096);
        let spawn = config.spawn.unwrap_or(Vec2::ZERO);
        let (pointer_tx, pointer) = watch::channel(spawn);
        let (changes_tx, changes) = mpsc::channel(4096);

        let session = GameSession::new(Address::new("me"), config, MemoryScoreStore::new());
        let handle = tokio::spawn(run_session(
            session,
            ClientChannels { inbound, outbound, pointer, changes: Some(changes_tx) },
        ));

        Harness { to_client, from_client, _pointer: pointer_tx, changes, handle }
    }

    async fn next_non_move(rx: &mut mpsc::Receiver<String>) -> OutboundEvent {
        loop {
            let frame = rx.recv().await.unwrap();
            let event = OutboundEvent::decode(&frame).unwrap();
            if !matches!(event, OutboundEvent::Move { .. }) {
                return event;
            }
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            spawn: Some(Vec2::new(100.0, 100.0)),
            frame_rate: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_join_then_game_ended() {
        let mut h = start(config());

        let join = next_non_move(&mut h.from_client).await;
        assert_eq!(
            join,
            OutboundEvent::JoinGame { position: Vec2::new(100.0, 100.0), address: Address::new("me") }
        );

        h.to_client.send(r#"["add-dot", {"x": 100, "y": 100}]"#.to_string()).await.unwrap();
        let eaten = next_non_move(&mut h.from_client).await;
        assert_eq!(
            eaten,
            OutboundEvent::DotEaten { position: GridPos::new(100, 100), address: Address::new("me") }
        );

        h.to_client.send(r#"["remove-dot", {"x": 100, "y": 100}, "me"]"#.to_string()).await.unwrap();
        h.to_client.send(r#"["game-ended"]"#.to_string()).await.unwrap();

        let report = h.handle.await.unwrap().unwrap();
        assert_eq!(report.session.state(), &SessionState::Ended);
        assert_eq!(report.session.store().get(&Address::new("me")), Some(1));

        // The renderer feed saw our join and the consumption
        let mut ours = Vec::new();
        while let Ok(change) = h.changes.try_recv() {
            if change.player() == Some(&Address::new("me")) {
                ours.push(change.data);
            }
        }
        assert!(matches!(ours.first(), Some(WorldChangeData::PlayerJoined { .. })));
        assert!(ours.iter().any(|d| matches!(d, WorldChangeData::PickupConsumed { .. })));
        assert_eq!(report.dropped_changes, 0);
    }

    #[tokio::test]
    async fn test_bad_frames_are_rejected_not_fatal() {
        let mut h = start(config());
        next_non_move(&mut h.from_client).await;

        h.to_client.send("not json".to_string()).await.unwrap();
        h.to_client.send(r#"["teleport", 1]"#.to_string()).await.unwrap();
        h.to_client.send(r#"["game-ended"]"#.to_string()).await.unwrap();

        let report = h.handle.await.unwrap().unwrap();
        assert_eq!(report.rejected, 2);
        assert_eq!(report.session.state(), &SessionState::Ended);
    }

    #[tokio::test]
    async fn test_self_death_stops_driver() {
        let mut h = start(config());
        next_non_move(&mut h.from_client).await;

        h.to_client.send(r#"["player-added", {"x": 0, "y": 0}, "rival"]"#.to_string()).await.unwrap();
        h.to_client.send(r#"["player-dead", "me", "rival"]"#.to_string()).await.unwrap();

        let report = h.handle.await.unwrap().unwrap();
        assert_eq!(
            report.session.state(),
            &SessionState::Dead { by: Address::new("rival") }
        );
    }

    #[tokio::test]
    async fn test_closed_inbound_stops_driver() {
        let mut h = start(config());
        next_non_move(&mut h.from_client).await;

        drop(h.to_client);

        let report = h.handle.await.unwrap().unwrap();
        assert_eq!(report.session.state(), &SessionState::Playing);
    }

    #[tokio::test]
    async fn test_closed_outbound_is_an_error() {
        let h = start(config());
        drop(h.from_client);

        let result = h.handle.await.unwrap();
        assert!(matches!(result, Err(ClientError::OutboundClosed)));
    }
}
