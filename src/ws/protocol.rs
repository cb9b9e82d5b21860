//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::Platform;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Client-predicted kinematics (ignored while dead)
    Move {
        x: f32,
        y: f32,
        velocity_y: f32,
        is_jumping: bool,
    },

    /// Fire a projectile from the player center towards a world point
    Shoot { target_x: f32, target_y: f32 },

    /// Throw a bomb in an arc towards a world point
    ThrowBomb { target_x: f32, target_y: f32 },

    /// Leave the dead state
    RequestRespawn,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once to a new connection
    Init {
        id: Uuid,
        players: BTreeMap<Uuid, PlayerView>,
        platforms: Vec<Platform>,
        world: WorldInfo,
    },

    PlayerJoined {
        player: PlayerView,
    },

    PlayerMoved {
        id: Uuid,
        x: f32,
        y: f32,
        velocity_y: f32,
        is_jumping: bool,
    },

    /// Server overrode the reported position (platform landing)
    PositionCorrected {
        x: f32,
        y: f32,
        velocity_y: f32,
        is_jumping: bool,
    },

    PlayerLeft {
        id: Uuid,
    },

    ProjectileSpawned {
        projectile: ProjectileView,
    },

    /// Every live projectile after this tick's step and removals
    ProjectileSnapshot {
        tick: u64,
        projectiles: BTreeMap<u64, ProjectileView>,
    },

    BombSpawned {
        bomb: BombView,
    },

    /// Every live bomb position after this tick's physics
    BombSnapshot {
        tick: u64,
        bombs: Vec<BombPosition>,
    },

    BombExploded {
        id: u64,
        x: f32,
        y: f32,
        radius: f32,
    },

    HealthChanged {
        id: Uuid,
        health: u32,
    },

    /// Impact feedback, coordinates are the victim's center
    Damaged {
        id: Uuid,
        x: f32,
        y: f32,
    },

    Killed {
        victim_id: Uuid,
        /// `None` for environment deaths
        killer_id: Option<Uuid>,
        cause: KillCause,
    },

    Respawned {
        player: PlayerView,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// What killed a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillCause {
    Projectile,
    Bomb,
    /// Fell below the death line
    Fall,
}

/// Full player state as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub velocity_y: f32,
    pub is_jumping: bool,
    pub color: String,
    /// Health (0-100)
    pub health: u32,
    pub is_dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: u64,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub color: String,
}

/// Bomb at throw time, with its initial velocity for client prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BombView {
    pub id: u64,
    pub owner_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BombPosition {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

/// World tuning a client needs to predict its own movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldInfo {
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    pub jump_force: f32,
    pub player_size: f32,
    pub tick_rate: u32,
}
