//! Arena session state and authoritative tick loop

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace};

use crate::util::time::{tick_period, Timer};

use super::collision::TileCollisionMap;
use super::snapshot::TickSnapshot;
use super::world::{Character, World};
use super::SessionCommand;

/// Queued commands between two ticks before connections start waiting
const COMMAND_QUEUE_CAPACITY: usize = 1024;
/// Snapshots buffered per subscriber before it starts lagging
const SNAPSHOT_BUFFER: usize = 64;

/// Handle to the running session, cloned into every connection
#[derive(Clone)]
pub struct SessionHandle {
    pub command_tx: mpsc::Sender<SessionCommand>,
    pub snapshot_tx: broadcast::Sender<Arc<TickSnapshot>>,
    player_count: Arc<AtomicUsize>,
    tick: Arc<AtomicU64>,
}

impl SessionHandle {
    /// Receive every snapshot produced from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TickSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }
}

/// The authoritative arena.
///
/// Owns the world exclusively; connections only reach it through the
/// command channel, and every command is applied between ticks.
pub struct GameSession {
    world: World,
    map: TileCollisionMap,
    rng: ChaCha8Rng,
    command_rx: mpsc::Receiver<SessionCommand>,
    snapshot_tx: broadcast::Sender<Arc<TickSnapshot>>,
    player_count: Arc<AtomicUsize>,
    tick: Arc<AtomicU64>,
}

impl GameSession {
    /// Create a session over `map`, seeding character assignment with `seed`
    pub fn new(map: TileCollisionMap, seed: u64) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_BUFFER);
        let player_count = Arc::new(AtomicUsize::new(0));
        let tick = Arc::new(AtomicU64::new(0));

        let handle = SessionHandle {
            command_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
            tick: tick.clone(),
        };

        let session = Self {
            world: World::new(),
            map,
            rng: ChaCha8Rng::seed_from_u64(seed),
            command_rx,
            snapshot_tx,
            player_count,
            tick,
        };

        (session, handle)
    }

    /// Run the fixed-rate tick loop until every command sender is gone
    pub async fn run(mut self) {
        info!(
            rows = self.map.rows(),
            cols = self.map.cols(),
            period_us = tick_period().as_micros() as u64,
            "Session started"
        );

        let mut tick_interval = interval(tick_period());
        // Late ticks are caught up one after another, never run concurrently
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut timer = Timer::new();

        loop {
            tick_interval.tick().await;

            let open = self.process_commands();
            let elapsed_ms = timer.lap_ms();
            self.run_tick(elapsed_ms);

            if !open {
                info!("All session handles dropped, stopping tick loop");
                break;
            }
        }
    }

    /// Apply every queued command. Returns false once all senders are gone.
    fn process_commands(&mut self) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect { conn_id } => {
                self.world.connect(conn_id);
                debug!(connections = self.world.connection_count(), "Connection count");
            }
            SessionCommand::Nickname { conn_id, nickname } => {
                let character = Character::random(&mut self.rng);
                self.world.spawn_player(conn_id, nickname.as_deref(), character);
            }
            SessionCommand::Input { conn_id, input } => {
                if !self.world.set_input(conn_id, input) {
                    debug!(conn_id = %conn_id, "Input for unknown connection dropped");
                }
            }
            SessionCommand::Fire { conn_id, angle } => {
                if !self.world.fire(conn_id, angle) {
                    trace!(conn_id = %conn_id, "Throw ignored");
                }
            }
            SessionCommand::Disconnect { conn_id } => {
                self.world.disconnect(conn_id);
                debug!(connections = self.world.connection_count(), "Connection count");
            }
        }
        self.player_count
            .store(self.world.players().len(), Ordering::Relaxed);
    }

    /// Simulate one tick and broadcast its snapshot.
    ///
    /// A panic inside the simulation is contained here so one bad tick does
    /// not stop the loop; nothing is broadcast for that tick.
    fn run_tick(&mut self, elapsed_ms: f64) -> Option<Arc<TickSnapshot>> {
        let world = &mut self.world;
        let map = &self.map;
        let snapshot = match catch_unwind(AssertUnwindSafe(|| world.step(map, elapsed_ms))) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(_) => {
                error!(tick = self.world.tick(), "Tick panicked, skipping broadcast");
                return None;
            }
        };

        self.tick.store(snapshot.tick, Ordering::Relaxed);
        self.player_count.store(snapshot.player_count, Ordering::Relaxed);
        trace!(
            tick = snapshot.tick,
            elapsed_ms,
            players = snapshot.player_count,
            snowballs = snapshot.snowballs.len(),
            "Tick"
        );

        // Fire-and-forget; no subscribers is not an error
        let _ = self.snapshot_tx.send(snapshot.clone());
        Some(snapshot)
    }

    /// Apply queued commands and run one tick with a fixed elapsed time
    #[cfg(test)]
    pub(crate) fn step(&mut self, elapsed_ms: f64) -> Option<Arc<TickSnapshot>> {
        self.process_commands();
        self.run_tick(elapsed_ms)
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
