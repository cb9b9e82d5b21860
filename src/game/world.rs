//! World state and the operations that mutate it
//!
//! Everything here is synchronous and single-writer: the arena task owns the
//! `World` and feeds it commands, fuse expiries and ticks one at a time.
//! Every operation writes its outbound messages into an [`Outbox`].

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::config::WorldConfig;
use crate::ws::protocol::{KillCause, ServerMsg, WorldInfo};

use super::combat::CombatSystem;
use super::dispatch::Outbox;
use super::entities::{Bomb, BombId, EntityStores, Player, PlayerId, Projectile, ProjectileId};
use super::geometry::direction;
use super::lifecycle::Lifecycle;
use super::physics::PhysicsSystem;
use super::snapshot::{SnapshotBuilder, SnapshotStats};

const FALLBACK_COLOR: &str = "#FFFFFF";

pub struct World {
    config: WorldConfig,
    stores: EntityStores,
    tick: u64,
    rng: ChaCha8Rng,
    snapshots: SnapshotBuilder,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            config,
            stores: EntityStores::new(),
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            snapshots: SnapshotBuilder::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn stores(&self) -> &EntityStores {
        &self.stores
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn snapshot_stats(&self) -> &SnapshotStats {
        self.snapshots.stats()
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.stores.players.get(id)
    }

    fn world_info(&self) -> WorldInfo {
        WorldInfo {
            width: self.config.world_width,
            height: self.config.world_height,
            gravity: self.config.gravity,
            jump_force: self.config.jump_force,
            player_size: self.config.player_size,
            tick_rate: self.config.tick_rate,
        }
    }

    /// New connection: spawn the player, send it the world, announce it to
    /// everyone else
    pub fn add_player(&mut self, id: PlayerId, outbox: &mut Outbox) {
        if self.stores.players.contains_key(&id) {
            debug!(player_id = %id, "Player already in arena");
            return;
        }

        let color = self
            .config
            .colors
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_COLOR.to_string());
        let player = Player::new(
            id,
            self.config.spawn_x,
            self.config.spawn_y,
            self.config.max_health,
            color,
        );
        let view = player.view();
        self.stores.players.insert(id, player);

        outbox.send_to(
            id,
            ServerMsg::Init {
                id,
                players: self
                    .stores
                    .players
                    .iter()
                    .map(|(pid, p)| (*pid, p.view()))
                    .collect(),
                platforms: self.config.platforms.clone(),
                world: self.world_info(),
            },
        );
        outbox.broadcast_except(id, ServerMsg::PlayerJoined { player: view });

        info!(
            player_id = %id,
            player_count = self.stores.players.len(),
            "Player joined arena"
        );
    }

    /// Disconnect: drop the player regardless of lifecycle state. Its
    /// projectiles and bombs stay in flight.
    pub fn remove_player(&mut self, id: PlayerId, outbox: &mut Outbox) -> bool {
        if self.stores.players.remove(&id).is_none() {
            return false;
        }

        outbox.broadcast(ServerMsg::PlayerLeft { id });

        info!(
            player_id = %id,
            player_count = self.stores.players.len(),
            "Player left arena"
        );
        true
    }

    /// Accept client-predicted kinematics from a live player, applying the
    /// platform landing correction
    pub fn apply_move(
        &mut self,
        id: PlayerId,
        x: f32,
        y: f32,
        velocity_y: f32,
        is_jumping: bool,
        outbox: &mut Outbox,
    ) -> bool {
        let Some(player) = self.stores.players.get_mut(&id) else {
            return false;
        };
        if !Lifecycle::accepts_input(player) {
            debug!(player_id = %id, "Ignoring move from dead player");
            return false;
        }

        let previous_y = player.y;
        player.x = x;
        player.y = y;
        player.velocity_y = velocity_y;
        player.is_jumping = is_jumping;

        if PhysicsSystem::land_on_platform(player, previous_y, &self.config).is_some() {
            outbox.send_to(
                id,
                ServerMsg::PositionCorrected {
                    x: player.x,
                    y: player.y,
                    velocity_y: player.velocity_y,
                    is_jumping: player.is_jumping,
                },
            );
        }

        outbox.broadcast_except(
            id,
            ServerMsg::PlayerMoved {
                id,
                x: player.x,
                y: player.y,
                velocity_y: player.velocity_y,
                is_jumping: player.is_jumping,
            },
        );
        true
    }

    /// Fire a projectile from the player's center towards the target
    pub fn shoot(
        &mut self,
        id: PlayerId,
        target_x: f32,
        target_y: f32,
        outbox: &mut Outbox,
    ) -> Option<ProjectileId> {
        let player = self.stores.players.get(&id).filter(|p| p.is_alive())?;
        let (cx, cy) = player.center(self.config.player_size);
        let Some((dx, dy)) = direction((cx, cy), (target_x, target_y)) else {
            debug!(player_id = %id, "Ignoring shot with zero-length aim");
            return None;
        };
        let color = player.color.clone();

        let projectile_id = self.stores.next_projectile_id();
        let projectile = Projectile {
            id: projectile_id,
            owner_id: id,
            x: cx,
            y: cy,
            velocity_x: dx * self.config.projectile_speed,
            velocity_y: dy * self.config.projectile_speed,
            color,
        };

        outbox.broadcast(ServerMsg::ProjectileSpawned {
            projectile: projectile.view(),
        });
        self.stores.projectiles.insert(projectile_id, projectile);
        Some(projectile_id)
    }

    /// Throw a bomb in an arc towards the target. The caller arms the fuse.
    pub fn throw_bomb(
        &mut self,
        id: PlayerId,
        target_x: f32,
        target_y: f32,
        outbox: &mut Outbox,
    ) -> Option<BombId> {
        let player = self.stores.players.get(&id).filter(|p| p.is_alive())?;
        let (cx, cy) = player.center(self.config.player_size);
        let Some((dx, dy)) = direction((cx, cy), (target_x, target_y)) else {
            debug!(player_id = %id, "Ignoring throw with zero-length aim");
            return None;
        };

        let bomb_id = self.stores.next_bomb_id();
        let bomb = Bomb {
            id: bomb_id,
            owner_id: id,
            x: cx,
            y: cy,
            vx: dx * self.config.bomb_throw_power,
            vy: dy * self.config.bomb_throw_power - self.config.bomb_arc_bias,
            fuse: None,
        };

        info!(player_id = %id, bomb_id, target_x, target_y, "Bomb thrown");

        outbox.broadcast(ServerMsg::BombSpawned { bomb: bomb.view() });
        self.stores.bombs.insert(bomb_id, bomb);
        Some(bomb_id)
    }

    /// Attach the pending fuse task to a live bomb
    pub fn arm_fuse(&mut self, bomb_id: BombId, fuse: AbortHandle) {
        match self.stores.bombs.get_mut(&bomb_id) {
            Some(bomb) => bomb.fuse = Some(fuse),
            None => fuse.abort(),
        }
    }

    /// Fuse expiry. A bomb that is already gone is a no-op.
    pub fn detonate(&mut self, bomb_id: BombId, outbox: &mut Outbox) -> bool {
        let Some(bomb) = self.stores.bombs.remove(&bomb_id) else {
            debug!(bomb_id, "Fuse fired for missing bomb");
            return false;
        };

        CombatSystem::explode(&bomb, &mut self.stores.players, &self.config, outbox);
        true
    }

    /// Dead -> Alive on the player's own request
    pub fn request_respawn(&mut self, id: PlayerId, outbox: &mut Outbox) -> bool {
        match self.stores.players.get_mut(&id) {
            Some(player) => Lifecycle::respawn(player, &self.config, outbox),
            None => false,
        }
    }

    /// One fixed simulation step: projectiles and hits, bomb physics, fall
    /// deaths, then the projectile and bomb snapshots. Combat events are
    /// always queued ahead of the snapshots that reflect their removals.
    pub fn step(&mut self, outbox: &mut Outbox) {
        self.tick += 1;

        self.step_projectiles(outbox);

        for bomb in self.stores.bombs.values_mut() {
            PhysicsSystem::step_bomb(bomb, &self.config);
        }

        for player in self.stores.players.values_mut() {
            Lifecycle::check_fall(player, &self.config, outbox);
        }

        outbox.broadcast(self.snapshots.projectiles(self.tick, &self.stores.projectiles));
        outbox.broadcast(self.snapshots.bombs(self.tick, &self.stores.bombs));
    }

    fn step_projectiles(&mut self, outbox: &mut Outbox) {
        let mut removed: Vec<ProjectileId> = Vec::new();

        for (id, projectile) in self.stores.projectiles.iter_mut() {
            PhysicsSystem::step_projectile(projectile);

            let target = CombatSystem::find_projectile_target(
                projectile,
                &self.stores.players,
                &self.config,
            );

            if let Some(target_id) = target {
                if let Some(victim) = self.stores.players.get_mut(&target_id) {
                    let hit = CombatSystem::damage_player(
                        victim,
                        self.config.projectile_damage,
                        projectile.owner_id,
                        KillCause::Projectile,
                        &self.config,
                        outbox,
                    );
                    debug!(
                        projectile_id = *id,
                        shooter_id = %projectile.owner_id,
                        target_id = %hit.target_id,
                        health = hit.health,
                        "Projectile hit"
                    );
                }
                removed.push(*id);
            } else if !PhysicsSystem::in_world(projectile.x, projectile.y, &self.config) {
                removed.push(*id);
            }
        }

        for id in removed {
            self.stores.projectiles.remove(&id);
        }
    }
}
