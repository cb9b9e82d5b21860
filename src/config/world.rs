//! World tuning: every constant the simulation reads

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use super::{env_or, ConfigError};

/// Static axis-aligned platform (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Platform {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Simulation constants. All velocities and accelerations are per tick.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    pub world_width: f32,
    pub world_height: f32,

    /// Player gravity (client-side prediction, advertised in init)
    pub gravity: f32,
    /// Player jump impulse (negative = up)
    pub jump_force: f32,
    /// Side of the square player hitbox
    pub player_size: f32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub max_health: u32,
    /// Players below this Y die
    pub death_y: f32,

    pub projectile_speed: f32,
    pub projectile_damage: u32,
    /// Half extent of the square projectile hitbox
    pub projectile_half_size: f32,

    pub bomb_throw_power: f32,
    /// Extra upward velocity added to every throw
    pub bomb_arc_bias: f32,
    /// Collision radius of a bomb against platforms and the floor
    pub bomb_radius: f32,
    pub bomb_fuse_ms: u64,
    pub bomb_gravity: f32,
    /// Vertical restitution on bounce (< 1)
    pub bomb_bounce: f32,
    /// Horizontal damping on bounce (< 1)
    pub bomb_friction: f32,
    pub blast_radius: f32,
    pub blast_max_damage: u32,

    pub platforms: Vec<Platform>,
    pub colors: Vec<String>,
    /// Fixed RNG seed for color assignment, random when unset
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            world_width: 800.0,
            world_height: 600.0,

            gravity: 0.5,
            jump_force: -12.0,
            player_size: 20.0,
            spawn_x: 100.0,
            spawn_y: 100.0,
            max_health: 100,
            death_y: 1000.0,

            projectile_speed: 10.0,
            projectile_damage: 25,
            projectile_half_size: 2.0,

            bomb_throw_power: 7.0,
            bomb_arc_bias: 4.0,
            bomb_radius: 5.0,
            bomb_fuse_ms: 2000,
            bomb_gravity: 0.2,
            bomb_bounce: 0.5,
            bomb_friction: 0.8,
            blast_radius: 50.0,
            blast_max_damage: 50,

            platforms: vec![
                Platform::new(0.0, 500.0, 800.0, 20.0), // ground
                Platform::new(50.0, 200.0, 100.0, 20.0), // under spawn
                Platform::new(200.0, 400.0, 100.0, 20.0),
                Platform::new(400.0, 300.0, 100.0, 20.0),
                Platform::new(600.0, 200.0, 100.0, 20.0),
            ],
            colors: ["#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            seed: None,
        }
    }
}

impl WorldConfig {
    /// Defaults overridden by `ARENA_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();

        let platforms = match env::var("ARENA_PLATFORMS") {
            Ok(json) => serde_json::from_str(&json)?,
            Err(_) => d.platforms,
        };

        let seed = match env::var("ARENA_SEED") {
            Ok(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid("ARENA_SEED"))?),
            Err(_) => None,
        };

        let config = Self {
            tick_rate: env_or("ARENA_TICK_RATE", d.tick_rate)?,
            world_width: env_or("ARENA_WORLD_WIDTH", d.world_width)?,
            world_height: env_or("ARENA_WORLD_HEIGHT", d.world_height)?,

            gravity: env_or("ARENA_GRAVITY", d.gravity)?,
            jump_force: env_or("ARENA_JUMP_FORCE", d.jump_force)?,
            player_size: env_or("ARENA_PLAYER_SIZE", d.player_size)?,
            spawn_x: env_or("ARENA_SPAWN_X", d.spawn_x)?,
            spawn_y: env_or("ARENA_SPAWN_Y", d.spawn_y)?,
            max_health: env_or("ARENA_MAX_HEALTH", d.max_health)?,
            death_y: env_or("ARENA_DEATH_Y", d.death_y)?,

            projectile_speed: env_or("ARENA_PROJECTILE_SPEED", d.projectile_speed)?,
            projectile_damage: env_or("ARENA_PROJECTILE_DAMAGE", d.projectile_damage)?,
            projectile_half_size: env_or("ARENA_PROJECTILE_HALF_SIZE", d.projectile_half_size)?,

            bomb_throw_power: env_or("ARENA_BOMB_THROW_POWER", d.bomb_throw_power)?,
            bomb_arc_bias: env_or("ARENA_BOMB_ARC_BIAS", d.bomb_arc_bias)?,
            bomb_radius: env_or("ARENA_BOMB_RADIUS", d.bomb_radius)?,
            bomb_fuse_ms: env_or("ARENA_BOMB_FUSE_MS", d.bomb_fuse_ms)?,
            bomb_gravity: env_or("ARENA_BOMB_GRAVITY", d.bomb_gravity)?,
            bomb_bounce: env_or("ARENA_BOMB_BOUNCE", d.bomb_bounce)?,
            bomb_friction: env_or("ARENA_BOMB_FRICTION", d.bomb_friction)?,
            blast_radius: env_or("ARENA_BLAST_RADIUS", d.blast_radius)?,
            blast_max_damage: env_or("ARENA_BLAST_MAX_DAMAGE", d.blast_max_damage)?,

            platforms,
            colors: d.colors,
            seed,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // tokio intervals panic on a zero period
        if self.tick_rate == 0 || self.tick_duration().is_zero() {
            return Err(ConfigError::Invalid("ARENA_TICK_RATE"));
        }
        if self.blast_radius <= 0.0 {
            return Err(ConfigError::Invalid("ARENA_BLAST_RADIUS"));
        }
        if !(0.0..1.0).contains(&self.bomb_bounce) {
            return Err(ConfigError::Invalid("ARENA_BOMB_BOUNCE"));
        }
        if !(0.0..=1.0).contains(&self.bomb_friction) {
            return Err(ConfigError::Invalid("ARENA_BOMB_FRICTION"));
        }
        Ok(())
    }

    /// Wall-clock length of one tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate as u64)
    }

    pub fn fuse_duration(&self) -> Duration {
        Duration::from_millis(self.bomb_fuse_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_arena() {
        let config = WorldConfig::default();
        assert_eq!(config.platforms.len(), 5);
        assert_eq!(config.platforms[0], Platform::new(0.0, 500.0, 800.0, 20.0));
        assert_eq!(config.projectile_damage, 25);
        assert_eq!(config.blast_max_damage, 50);
        assert_eq!(config.colors.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tick_duration_follows_rate() {
        let config = WorldConfig::default();
        assert_eq!(config.tick_duration(), Duration::from_micros(16_666));
        assert_eq!(config.fuse_duration(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_tick_rate_without_a_period() {
        for tick_rate in [0, 1_000_001] {
            let config = WorldConfig {
                tick_rate,
                ..WorldConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid("ARENA_TICK_RATE"))
            ));
        }

        let fastest = WorldConfig {
            tick_rate: 1_000_000,
            ..WorldConfig::default()
        };
        assert!(fastest.validate().is_ok());
    }

    #[test]
    fn rejects_elastic_bounce() {
        let config = WorldConfig {
            bomb_bounce: 1.0,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn platform_layout_parses_from_json() {
        let json = r#"[{"x":0,"y":500,"width":800,"height":20}]"#;
        let platforms: Vec<Platform> = serde_json::from_str(json).unwrap();
        assert_eq!(platforms, vec![Platform::new(0.0, 500.0, 800.0, 20.0)]);
    }
}
