//! The authoritative arena task: fixed tick loop plus serialized commands

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::util::time::Timer;
use crate::ws::hub::Hub;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::dispatch::Outbox;
use super::entities::{BombId, PlayerId};
use super::world::World;

/// Everything that may mutate the world, in arrival order
#[derive(Debug, Clone)]
pub enum ArenaCommand {
    /// A socket connected; its outbound queue joins the hub with the player
    Joined {
        player_id: PlayerId,
        outbound: mpsc::Sender<String>,
    },
    /// A parsed client message
    Input { player_id: PlayerId, msg: ClientMsg },
    /// A socket closed
    Left(PlayerId),
    /// A bomb's fuse ran out
    FuseElapsed(BombId),
}

/// Counters published by the arena for health checks
#[derive(Debug, Default)]
pub struct ArenaStats {
    pub tick: AtomicU64,
    pub players: AtomicUsize,
    pub projectiles: AtomicUsize,
    pub bombs: AtomicUsize,
    pub snapshots: AtomicU64,
    /// `f32` bits of the running average entities per snapshot
    pub avg_snapshot_entities: AtomicU32,
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub command_tx: mpsc::Sender<ArenaCommand>,
    pub stats: Arc<ArenaStats>,
}

impl ArenaHandle {
    pub fn player_count(&self) -> usize {
        self.stats.players.load(Ordering::Relaxed)
    }

    pub fn projectile_count(&self) -> usize {
        self.stats.projectiles.load(Ordering::Relaxed)
    }

    pub fn bomb_count(&self) -> usize {
        self.stats.bombs.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.stats.tick.load(Ordering::Relaxed)
    }

    pub fn snapshot_count(&self) -> u64 {
        self.stats.snapshots.load(Ordering::Relaxed)
    }

    pub fn avg_snapshot_entities(&self) -> f32 {
        f32::from_bits(self.stats.avg_snapshot_entities.load(Ordering::Relaxed))
    }
}

/// Owns the world; the only writer of entity state
pub struct GameArena {
    world: World,
    command_rx: mpsc::Receiver<ArenaCommand>,
    /// Weak so the loop ends once every handle is dropped
    fuse_tx: mpsc::WeakSender<ArenaCommand>,
    hub: Arc<Hub>,
    stats: Arc<ArenaStats>,
    outbox: Outbox,
}

impl GameArena {
    pub fn new(config: WorldConfig, hub: Arc<Hub>) -> (Self, ArenaHandle) {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let stats = Arc::new(ArenaStats::default());

        let handle = ArenaHandle {
            command_tx: command_tx.clone(),
            stats: stats.clone(),
        };

        let arena = Self {
            world: World::new(config),
            command_rx,
            fuse_tx: command_tx.downgrade(),
            hub,
            stats,
            outbox: Outbox::new(),
        };

        (arena, handle)
    }

    /// Run the tick loop until every command sender is gone
    pub async fn run(mut self) {
        let tick_duration = self.world.config().tick_duration();
        info!(
            tick_rate = self.world.config().tick_rate,
            platforms = self.world.config().platforms.len(),
            "Arena started"
        );

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let timer = Timer::new();
                    self.world.step(&mut self.outbox);
                    self.flush();

                    let elapsed = timer.elapsed_micros();
                    if elapsed > tick_duration.as_micros() as u64 {
                        warn!(
                            tick = self.world.tick(),
                            elapsed_micros = elapsed,
                            "Tick overran its budget"
                        );
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => {
                            self.handle_command(command);
                            self.flush();
                        }
                        None => break,
                    }
                }
            }
        }

        info!(tick = self.world.tick(), "Arena stopped");
    }

    fn handle_command(&mut self, command: ArenaCommand) {
        let outbox = &mut self.outbox;
        match command {
            ArenaCommand::Joined {
                player_id,
                outbound,
            } => {
                self.hub.register(player_id, outbound);
                self.world.add_player(player_id, outbox);
            }
            ArenaCommand::Left(player_id) => {
                self.hub.unregister(player_id);
                self.world.remove_player(player_id, outbox);
            }
            ArenaCommand::FuseElapsed(bomb_id) => {
                self.world.detonate(bomb_id, outbox);
            }
            ArenaCommand::Input { player_id, msg } => match msg {
                ClientMsg::Move {
                    x,
                    y,
                    velocity_y,
                    is_jumping,
                } => {
                    self.world
                        .apply_move(player_id, x, y, velocity_y, is_jumping, outbox);
                }
                ClientMsg::Shoot { target_x, target_y } => {
                    self.world.shoot(player_id, target_x, target_y, outbox);
                }
                ClientMsg::ThrowBomb { target_x, target_y } => {
                    if let Some(bomb_id) =
                        self.world.throw_bomb(player_id, target_x, target_y, outbox)
                    {
                        self.schedule_fuse(bomb_id);
                    }
                }
                ClientMsg::RequestRespawn => {
                    if !self.world.request_respawn(player_id, outbox) {
                        debug!(player_id = %player_id, "Ignoring respawn request");
                    }
                }
                ClientMsg::Ping { t } => {
                    outbox.send_to(player_id, ServerMsg::Pong { t });
                }
            },
        }
    }

    /// The fuse is a timer that feeds back into the command queue, so the
    /// explosion is serialized with every other mutation
    fn schedule_fuse(&mut self, bomb_id: BombId) {
        let Some(tx) = self.fuse_tx.upgrade() else {
            return;
        };
        let fuse = self.world.config().fuse_duration();

        let task = tokio::spawn(async move {
            tokio::time::sleep(fuse).await;
            if tx.send(ArenaCommand::FuseElapsed(bomb_id)).await.is_err() {
                debug!(bomb_id, "Arena gone before fuse elapsed");
            }
        });

        self.world.arm_fuse(bomb_id, task.abort_handle());
    }

    fn flush(&mut self) {
        for envelope in self.outbox.drain() {
            self.hub.deliver(&envelope);
        }

        let stores = self.world.stores();
        self.stats.tick.store(self.world.tick(), Ordering::Relaxed);
        self.stats.players.store(stores.players.len(), Ordering::Relaxed);
        self.stats
            .projectiles
            .store(stores.projectiles.len(), Ordering::Relaxed);
        self.stats.bombs.store(stores.bombs.len(), Ordering::Relaxed);

        let snapshots = self.world.snapshot_stats();
        self.stats
            .snapshots
            .store(snapshots.total_snapshots, Ordering::Relaxed);
        self.stats.avg_snapshot_entities.store(
            snapshots.avg_entities_per_snapshot.to_bits(),
            Ordering::Relaxed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;
    use uuid::Uuid;

    async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Value {
        let frame = rx.recv().await.expect("hub channel closed");
        serde_json::from_str(&frame).unwrap()
    }

    async fn next_of_type(rx: &mut mpsc::Receiver<String>, kind: &str) -> Value {
        loop {
            let value = next_frame(rx).await;
            if value["type"] == kind {
                return value;
            }
        }
    }

    async fn join(tx: &mpsc::Sender<ArenaCommand>, player_id: PlayerId) -> mpsc::Receiver<String> {
        let (outbound, rx) = Hub::channel();
        tx.send(ArenaCommand::Joined {
            player_id,
            outbound,
        })
        .await
        .unwrap();
        rx
    }

    fn fast_config() -> WorldConfig {
        WorldConfig {
            bomb_fuse_ms: 50,
            seed: Some(1),
            ..WorldConfig::default()
        }
    }

    #[tokio::test]
    async fn join_then_init_and_snapshots() {
        let hub = Arc::new(Hub::new());
        let (arena, handle) = GameArena::new(fast_config(), hub.clone());
        tokio::spawn(arena.run());

        let id = Uuid::from_u128(1);
        let mut rx = join(&handle.command_tx, id).await;

        let result = tokio::time::timeout(Duration::from_secs(2), async {
            let init = next_of_type(&mut rx, "init").await;
            assert_eq!(init["id"], id.to_string());
            next_of_type(&mut rx, "projectile_snapshot").await;
            next_of_type(&mut rx, "bomb_snapshot").await;
            // The previous tick's flush has published its stats by now
            next_of_type(&mut rx, "bomb_snapshot").await;
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(handle.player_count(), 1);
        assert_eq!(hub.connection_count(), 1);
        assert!(handle.snapshot_count() >= 2);
    }

    #[tokio::test]
    async fn late_joiner_sees_init_first() {
        let hub = Arc::new(Hub::new());
        let (arena, handle) = GameArena::new(fast_config(), hub.clone());
        tokio::spawn(arena.run());
        let tx = handle.command_tx.clone();

        let mut rx_a = join(&tx, Uuid::from_u128(1)).await;
        // Ticks are already flowing when the second player connects
        tokio::time::timeout(
            Duration::from_secs(2),
            next_of_type(&mut rx_a, "bomb_snapshot"),
        )
        .await
        .unwrap();

        let b = Uuid::from_u128(2);
        let mut rx_b = join(&tx, b).await;
        let first = tokio::time::timeout(Duration::from_secs(2), next_frame(&mut rx_b))
            .await
            .unwrap();
        assert_eq!(first["type"], "init");
        assert_eq!(first["id"], b.to_string());
    }

    #[tokio::test]
    async fn leaving_unregisters_connection() {
        let hub = Arc::new(Hub::new());
        let (arena, handle) = GameArena::new(fast_config(), hub.clone());
        tokio::spawn(arena.run());
        let tx = handle.command_tx.clone();

        let id = Uuid::from_u128(1);
        let mut rx = join(&tx, id).await;
        tx.send(ArenaCommand::Left(id)).await.unwrap();

        // The hub drops its sender, so the queue drains then closes
        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn fuse_explodes_bomb_exactly_once() {
        let hub = Arc::new(Hub::new());
        let (arena, handle) = GameArena::new(fast_config(), hub.clone());
        tokio::spawn(arena.run());

        let id = Uuid::from_u128(1);
        let tx = handle.command_tx.clone();
        let mut rx = join(&tx, id).await;
        tx.send(ArenaCommand::Input {
            player_id: id,
            msg: ClientMsg::ThrowBomb {
                target_x: 400.0,
                target_y: 110.0,
            },
        })
        .await
        .unwrap();

        let exploded = tokio::time::timeout(Duration::from_secs(2), async {
            let spawned = next_of_type(&mut rx, "bomb_spawned").await;
            let exploded = next_of_type(&mut rx, "bomb_exploded").await;
            assert_eq!(spawned["bomb"]["id"], exploded["id"]);
            exploded
        })
        .await
        .expect("bomb never exploded");

        // A stale fuse for the same bomb is a no-op
        let bomb_id = exploded["id"].as_u64().unwrap();
        tx.send(ArenaCommand::FuseElapsed(bomb_id)).await.unwrap();

        let again = tokio::time::timeout(
            Duration::from_millis(200),
            next_of_type(&mut rx, "bomb_exploded"),
        )
        .await;
        assert!(again.is_err());
        assert_eq!(handle.bomb_count(), 0);
    }

    #[tokio::test]
    async fn ping_answers_only_sender() {
        let hub = Arc::new(Hub::new());
        let (arena, handle) = GameArena::new(fast_config(), hub.clone());
        tokio::spawn(arena.run());

        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let tx = handle.command_tx.clone();
        let mut rx_a = join(&tx, a).await;
        let mut rx_b = join(&tx, b).await;
        tx.send(ArenaCommand::Input {
            player_id: a,
            msg: ClientMsg::Ping { t: 42 },
        })
        .await
        .unwrap();

        let pong = tokio::time::timeout(Duration::from_secs(2), next_of_type(&mut rx_a, "pong"))
            .await
            .unwrap();
        assert_eq!(pong["t"], 42);

        let other =
            tokio::time::timeout(Duration::from_millis(100), next_of_type(&mut rx_b, "pong"))
                .await;
        assert!(other.is_err());
    }
}
