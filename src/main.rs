//! Arena Sync Demo
//!
//! Plays one session against an in-process loopback relay standing in for
//! the game server. The relay answers the join with a snapshot, scatters
//! dots along the pointer's path, echoes consumptions back, ticks the clock
//! and ends the game.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arena_sync::{
    VERSION,
    network::{
        client::{run_session, ClientChannels, ClientReport},
        protocol::PlayerSnapshot,
    },
    game::events::WorldChange,
    Address, GameSession, GridPos, InboundEvent, JsonFileScoreStore, MemoryScoreStore,
    OutboundEvent, ScoreStore, SessionConfig, Vec2,
};

/// Demo countdown unless `ARENA_GAME_TIME` says otherwise.
const DEMO_GAME_TIME: u32 = 10;

/// Dots kept on the field by the relay.
const DEMO_DOTS: usize = 40;

/// Radius of the pointer's circular sweep.
const SWEEP_RADIUS: f32 = 250.0;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena Sync v{}", VERSION);

    let mut config = SessionConfig::from_env();
    if std::env::var("ARENA_GAME_TIME").is_err() {
        config.game_time = DEMO_GAME_TIME;
    }
    let center = Vec2::new(config.world_width / 2.0, config.world_height / 2.0);
    config.spawn.get_or_insert(center + Vec2::new(SWEEP_RADIUS, 0.0));

    info!(
        "World {}x{}, {} s, speed {} (floor {})",
        config.world_width, config.world_height, config.game_time, config.base_speed, config.min_speed
    );

    match config.score_file.clone() {
        Some(path) => {
            let store = JsonFileScoreStore::open(&path)
                .with_context(|| format!("opening score file {}", path.display()))?;
            info!("Scores persisted to {}", path.display());
            play(config, store).await?;
        }
        None => {
            play(config, MemoryScoreStore::new()).await?;
        }
    }
    Ok(())
}

/// Run one session with the relay and pointer tasks, then report.
async fn play<S: ScoreStore>(config: SessionConfig, store: S) -> anyhow::Result<()> {
    let address = config.address();
    let center = Vec2::new(config.world_width / 2.0, config.world_height / 2.0);
    let game_time = config.game_time;

    let (to_client, inbound) = mpsc::channel(256);
    let (outbound, from_client) = mpsc::channel(256);
    let (pointer_tx, pointer) = watch::channel(center);
    let (changes_tx, changes) = mpsc::channel(1024);

    let relay = tokio::spawn(relay(from_client, to_client, center, game_time));
    let sweep = tokio::spawn(sweep_pointer(pointer_tx, center));
    let tally = tokio::spawn(tally_changes(changes));

    let session = GameSession::new(address, config, store);
    let channels = ClientChannels { inbound, outbound, pointer, changes: Some(changes_tx) };
    let report = run_session(session, channels).await?;

    sweep.abort();
    match relay.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Relay stopped: {:#}", e),
        Err(e) => warn!("Relay task failed: {}", e),
    }

    summarize(&report);
    match tally.await {
        Ok(per_player) => {
            for (address, count) in per_player {
                info!("{}: {} world changes", address.short(), count);
            }
        }
        Err(e) => warn!("Change tally task failed: {}", e),
    }
    Ok(())
}

/// Stand-in renderer: count world changes per player.
async fn tally_changes(mut changes: mpsc::Receiver<WorldChange>) -> BTreeMap<Address, usize> {
    let mut per_player = BTreeMap::new();
    while let Some(change) = changes.recv().await {
        if let Some(address) = change.player() {
            *per_player.entry(address.clone()).or_insert(0) += 1;
        }
    }
    per_player
}

fn summarize<S: ScoreStore>(report: &ClientReport<S>) {
    let session = &report.session;
    let controller = session.controller();

    info!("=== Session Results ===");
    info!("State: {:?}", session.state());
    info!(
        "Frames: {}, rejected inbound: {}, dropped changes: {}, final speed: {:.0}",
        report.frames,
        report.rejected,
        report.dropped_changes,
        controller.pace().speed()
    );

    let ledger = controller.ledger();
    match ledger.to_bytes() {
        Ok(snapshot) => info!(
            "Ledger: {} players, {} total score, {} byte snapshot",
            ledger.len(),
            ledger.total(),
            snapshot.len()
        ),
        Err(e) => warn!("Ledger snapshot failed: {}", e),
    }
    for (address, score) in ledger.entries() {
        let marker = if address == controller.self_address() { " (you)" } else { "" };
        info!("{}{}: {}", address.short(), marker, score);
    }
}

/// Move the pointer around the world center.
async fn sweep_pointer(pointer: watch::Sender<Vec2>, center: Vec2) {
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    let mut angle = 0.0f32;
    loop {
        ticker.tick().await;
        angle += 0.05;
        let target = center + Vec2::new(angle.cos(), angle.sin()).scale(SWEEP_RADIUS);
        if pointer.send(target).is_err() {
            return;
        }
    }
}

// =============================================================================
// LOOPBACK RELAY
// =============================================================================

/// Minimal server: one idle rival, dots on a ring, echo of every consumption.
async fn relay(
    mut from_client: mpsc::Receiver<String>,
    to_client: mpsc::Sender<String>,
    center: Vec2,
    game_time: u32,
) -> anyhow::Result<()> {
    let mut rng = StdRng::from_entropy();
    let rival = Address::random();
    let mut dots = BTreeSet::new();
    while dots.len() < DEMO_DOTS {
        dots.insert(ring_dot(&mut rng, center));
    }

    let mut clock = tokio::time::interval(Duration::from_secs(1));
    let mut elapsed = 0u32;
    let mut joined = false;

    loop {
        tokio::select! {
            _ = clock.tick(), if joined => {
                elapsed += 1;
                if elapsed >= game_time {
                    send(&to_client, InboundEvent::GameEnded).await?;
                    info!("Relay: game ended after {} s", elapsed);
                    return Ok(());
                }
                send(&to_client, InboundEvent::Seconds(elapsed)).await?;
            }
            frame = from_client.recv() => {
                let Some(frame) = frame else {
                    return Ok(());
                };
                let event = OutboundEvent::decode(&frame).context("client sent a bad frame")?;
                match event {
                    OutboundEvent::JoinGame { position, address } => {
                        joined = true;
                        let mut players = BTreeMap::new();
                        players.insert(rival.clone(), PlayerSnapshot {
                            x: center.x,
                            y: center.y,
                            name: Some("Rival".to_string()),
                        });
                        send(&to_client, InboundEvent::LoadPlayers(players)).await?;
                        send(&to_client, InboundEvent::LoadDots(dots.iter().copied().collect())).await?;
                        info!("Relay: {} joined at {}", address.short(), position);
                    }
                    OutboundEvent::Move { .. } => {}
                    OutboundEvent::DotEaten { position, address } => {
                        if dots.remove(&position) {
                            send(&to_client, InboundEvent::RemoveDot { position, address }).await?;
                            let fresh = ring_dot(&mut rng, center);
                            if dots.insert(fresh) {
                                send(&to_client, InboundEvent::AddDot(fresh)).await?;
                            }
                        }
                    }
                    OutboundEvent::PlayerEaten { loser, winner } => {
                        send(&to_client, InboundEvent::PlayerDead { loser, winner }).await?;
                    }
                }
            }
        }
    }
}

/// Random dot near the pointer's sweep ring.
fn ring_dot(rng: &mut StdRng, center: Vec2) -> GridPos {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let radius = SWEEP_RADIUS + rng.gen_range(-10.0..10.0);
    GridPos::new(
        (center.x + angle.cos() * radius).round() as i32,
        (center.y + angle.sin() * radius).round() as i32,
    )
}

async fn send(to_client: &mpsc::Sender<String>, event: InboundEvent) -> anyhow::Result<()> {
    to_client
        .send(event.to_frame())
        .await
        .context("client hung up")
}
