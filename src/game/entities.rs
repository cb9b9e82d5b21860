//! Entity stores: the authoritative world state

use std::collections::BTreeMap;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::ws::protocol::{BombPosition, BombView, KillCause, PlayerView, ProjectileView};

use super::geometry::Rect;

/// Connection-scoped player id
pub type PlayerId = Uuid;
pub type ProjectileId = u64;
pub type BombId = u64;

/// Lifecycle state of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead {
        killer_id: Option<PlayerId>,
        cause: KillCause,
    },
}

/// Player state (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub velocity_y: f32,
    pub is_jumping: bool,
    pub health: u32,
    pub life: LifeState,
    /// Display-only identity tag
    pub color: String,
}

impl Player {
    pub fn new(id: PlayerId, x: f32, y: f32, health: u32, color: String) -> Self {
        Self {
            id,
            x,
            y,
            velocity_y: 0.0,
            is_jumping: false,
            health,
            life: LifeState::Alive,
            color,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn center(&self, size: f32) -> (f32, f32) {
        (self.x + size / 2.0, self.y + size / 2.0)
    }

    pub fn hitbox(&self, size: f32) -> Rect {
        Rect::new(self.x, self.y, size, size)
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            x: self.x,
            y: self.y,
            velocity_y: self.velocity_y,
            is_jumping: self.is_jumping,
            color: self.color.clone(),
            health: self.health,
            is_dead: !self.is_alive(),
        }
    }
}

/// Straight-flying projectile
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Inherited from the owner at creation
    pub color: String,
}

impl Projectile {
    pub fn view(&self) -> ProjectileView {
        ProjectileView {
            id: self.id,
            owner_id: self.owner_id,
            x: self.x,
            y: self.y,
            velocity_x: self.velocity_x,
            velocity_y: self.velocity_y,
            color: self.color.clone(),
        }
    }
}

/// Thrown explosive waiting for its fuse
#[derive(Debug)]
pub struct Bomb {
    pub id: BombId,
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Pending fuse task, aborted when the bomb leaves the store
    pub fuse: Option<AbortHandle>,
}

impl Bomb {
    pub fn view(&self) -> BombView {
        BombView {
            id: self.id,
            owner_id: self.owner_id,
            x: self.x,
            y: self.y,
            vx: self.vx,
            vy: self.vy,
        }
    }

    pub fn position(&self) -> BombPosition {
        BombPosition {
            id: self.id,
            x: self.x,
            y: self.y,
        }
    }
}

impl Drop for Bomb {
    fn drop(&mut self) {
        if let Some(fuse) = self.fuse.take() {
            fuse.abort();
        }
    }
}

/// id -> entity maps. Ordered maps keep iteration deterministic: projectiles
/// and bombs iterate in creation order, players in id order.
#[derive(Debug, Default)]
pub struct EntityStores {
    pub players: BTreeMap<PlayerId, Player>,
    pub projectiles: BTreeMap<ProjectileId, Projectile>,
    pub bombs: BTreeMap<BombId, Bomb>,
    next_projectile_id: ProjectileId,
    next_bomb_id: BombId,
}

impl EntityStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic, never reused within a session
    pub fn next_projectile_id(&mut self) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;
        id
    }

    /// Monotonic, never reused within a session
    pub fn next_bomb_id(&mut self) -> BombId {
        let id = self.next_bomb_id;
        self.next_bomb_id += 1;
        id
    }
}
