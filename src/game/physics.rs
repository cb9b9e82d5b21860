//! Per-tick integration for projectiles and bombs, platform support for players

use crate::config::{Platform, WorldConfig};

use super::entities::{Bomb, Player, Projectile};

/// Physics system for advancing dynamic entities one tick
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance a projectile in a straight line (no gravity)
    pub fn step_projectile(projectile: &mut Projectile) {
        projectile.x += projectile.velocity_x;
        projectile.y += projectile.velocity_y;
    }

    /// Inside [0, width] x [0, height]
    pub fn in_world(x: f32, y: f32, config: &WorldConfig) -> bool {
        (0.0..=config.world_width).contains(&x) && (0.0..=config.world_height).contains(&y)
    }

    /// Apply gravity, move, then resolve at most one platform bounce and the
    /// floor. Returns true if the bomb bounced this tick.
    pub fn step_bomb(bomb: &mut Bomb, config: &WorldConfig) -> bool {
        bomb.vy += config.bomb_gravity;
        bomb.x += bomb.vx;
        bomb.y += bomb.vy;

        let r = config.bomb_radius;
        let mut bounced = false;

        // First matching platform wins
        for platform in &config.platforms {
            if Self::bomb_hits_platform(bomb, platform, r) {
                bomb.y = platform.y - r;
                Self::bounce(bomb, config);
                bounced = true;
                break;
            }
        }

        if bomb.y + r > config.world_height {
            bomb.y = config.world_height - r;
            Self::bounce(bomb, config);
            bounced = true;
        }

        bounced
    }

    /// Bomb overlaps the platform horizontally and its bottom edge has crossed
    /// the top surface while falling
    fn bomb_hits_platform(bomb: &Bomb, platform: &Platform, r: f32) -> bool {
        let overlaps_x = bomb.x + r > platform.x && bomb.x - r < platform.x + platform.width;
        let crosses_top = bomb.y + r >= platform.y && bomb.y - r < platform.y;
        overlaps_x && crosses_top && bomb.vy > 0.0
    }

    fn bounce(bomb: &mut Bomb, config: &WorldConfig) {
        bomb.vy *= -config.bomb_bounce;
        bomb.vx *= config.bomb_friction;
    }

    /// Snap a falling player onto the first platform whose top surface its
    /// feet crossed since `previous_y`. Returns the platform landed on.
    pub fn land_on_platform<'a>(
        player: &mut Player,
        previous_y: f32,
        config: &'a WorldConfig,
    ) -> Option<&'a Platform> {
        if player.velocity_y <= 0.0 {
            return None;
        }

        let size = config.player_size;
        let previous_bottom = previous_y + size;
        let bottom = player.y + size;

        let platform = config.platforms.iter().find(|p| {
            let overlaps_x = player.x < p.x + p.width && player.x + size > p.x;
            overlaps_x && previous_bottom <= p.y && bottom >= p.y
        })?;

        player.y = platform.y - size;
        player.velocity_y = 0.0;
        player.is_jumping = false;
        Some(platform)
    }

    /// Below the world death line
    pub fn is_fallen(player: &Player, config: &WorldConfig) -> bool {
        player.y > config.death_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn bomb_at(x: f32, y: f32, vx: f32, vy: f32) -> Bomb {
        Bomb {
            id: 0,
            owner_id: Uuid::nil(),
            x,
            y,
            vx,
            vy,
            fuse: None,
        }
    }

    #[test]
    fn projectile_ignores_gravity() {
        let mut p = Projectile {
            id: 0,
            owner_id: Uuid::nil(),
            x: 10.0,
            y: 10.0,
            velocity_x: 10.0,
            velocity_y: 0.0,
            color: String::new(),
        };
        PhysicsSystem::step_projectile(&mut p);
        PhysicsSystem::step_projectile(&mut p);
        assert_eq!((p.x, p.y), (30.0, 10.0));
    }

    #[test]
    fn world_bounds_are_inclusive() {
        let config = WorldConfig::default();
        assert!(PhysicsSystem::in_world(0.0, 0.0, &config));
        assert!(PhysicsSystem::in_world(800.0, 600.0, &config));
        assert!(!PhysicsSystem::in_world(-0.1, 10.0, &config));
        assert!(!PhysicsSystem::in_world(10.0, 600.5, &config));
    }

    #[test]
    fn bomb_accelerates_in_free_fall() {
        let config = WorldConfig::default();
        let mut bomb = bomb_at(300.0, 50.0, 1.0, 0.0);
        assert!(!PhysicsSystem::step_bomb(&mut bomb, &config));
        assert!((bomb.vy - 0.2).abs() < 1e-6);
        assert!((bomb.y - 50.2).abs() < 1e-4);
        assert_eq!(bomb.x, 301.0);
    }

    #[test]
    fn bomb_bounces_off_platform_top() {
        let config = WorldConfig::default();
        // Over the ground platform (y = 500), bottom about to cross
        let mut bomb = bomb_at(100.0, 493.0, 2.0, 3.0);
        assert!(PhysicsSystem::step_bomb(&mut bomb, &config));
        assert_eq!(bomb.y, 495.0);
        assert!((bomb.vy - (-3.2 * 0.5)).abs() < 1e-5);
        assert!((bomb.vx - 1.6).abs() < 1e-6);
    }

    #[test]
    fn rising_bomb_passes_through_platform() {
        let config = WorldConfig::default();
        let mut bomb = bomb_at(250.0, 402.0, 0.0, -5.0);
        assert!(!PhysicsSystem::step_bomb(&mut bomb, &config));
        assert!(bomb.vy < 0.0);
    }

    #[test]
    fn first_platform_wins_on_overlap() {
        let mut config = WorldConfig::default();
        config.platforms = vec![
            Platform::new(0.0, 100.0, 50.0, 10.0),
            Platform::new(0.0, 102.0, 50.0, 10.0),
        ];
        let mut bomb = bomb_at(20.0, 97.0, 0.0, 2.0);
        PhysicsSystem::step_bomb(&mut bomb, &config);
        assert_eq!(bomb.y, 95.0);
    }

    #[test]
    fn bomb_bounces_off_world_floor() {
        let mut config = WorldConfig::default();
        config.platforms.clear();
        let mut bomb = bomb_at(400.0, 594.0, 0.0, 4.0);
        assert!(PhysicsSystem::step_bomb(&mut bomb, &config));
        assert_eq!(bomb.y, 595.0);
        assert!(bomb.vy < 0.0);
    }

    #[test]
    fn falling_player_snaps_to_platform() {
        let config = WorldConfig::default();
        let mut player = Player::new(Uuid::nil(), 220.0, 385.0, 100, String::new());
        player.velocity_y = 6.0;
        player.is_jumping = true;
        // Feet were at 378 (above 400), now at 405
        let landed = PhysicsSystem::land_on_platform(&mut player, 358.0, &config);
        assert_eq!(landed, Some(&config.platforms[2]));
        assert_eq!(player.y, 380.0);
        assert_eq!(player.velocity_y, 0.0);
        assert!(!player.is_jumping);
    }

    #[test]
    fn rising_player_is_not_snapped() {
        let config = WorldConfig::default();
        let mut player = Player::new(Uuid::nil(), 220.0, 385.0, 100, String::new());
        player.velocity_y = -6.0;
        assert!(PhysicsSystem::land_on_platform(&mut player, 358.0, &config).is_none());
        assert_eq!(player.y, 385.0);
    }

    #[test]
    fn player_already_below_surface_is_not_snapped() {
        let config = WorldConfig::default();
        let mut player = Player::new(Uuid::nil(), 220.0, 395.0, 100, String::new());
        player.velocity_y = 3.0;
        assert!(PhysicsSystem::land_on_platform(&mut player, 390.0, &config).is_none());
    }
}
