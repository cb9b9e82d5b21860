//! Combat system - hit detection, blast falloff, kill attribution

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::WorldConfig;
use crate::ws::protocol::{KillCause, ServerMsg};

use super::dispatch::Outbox;
use super::entities::{Bomb, Player, PlayerId, Projectile};
use super::geometry::{distance, Rect};
use super::lifecycle::Lifecycle;

/// Outcome of damage applied to one player
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub target_id: PlayerId,
    pub damage: u32,
    pub health: u32,
    pub target_killed: bool,
}

/// Combat system for resolving damage
pub struct CombatSystem;

impl CombatSystem {
    /// Subtract damage, clamped at zero. Returns (new_health, is_dead)
    pub fn apply_damage(current_health: u32, damage: u32) -> (u32, bool) {
        let new_health = current_health.saturating_sub(damage);
        (new_health, new_health == 0)
    }

    /// Linear falloff: `max_damage` at the center, 0 at and beyond `radius`
    pub fn blast_damage(distance: f32, radius: f32, max_damage: u32) -> u32 {
        if distance >= radius {
            return 0;
        }
        let falloff = 1.0 - distance / radius;
        (max_damage as f32 * falloff).round() as u32
    }

    pub fn projectile_hitbox(projectile: &Projectile, config: &WorldConfig) -> Rect {
        Rect::centered(projectile.x, projectile.y, config.projectile_half_size)
    }

    /// First live non-owner player whose hitbox the projectile overlaps
    pub fn find_projectile_target(
        projectile: &Projectile,
        players: &BTreeMap<PlayerId, Player>,
        config: &WorldConfig,
    ) -> Option<PlayerId> {
        let hitbox = Self::projectile_hitbox(projectile, config);
        players
            .values()
            .filter(|p| p.is_alive() && p.id != projectile.owner_id)
            .find(|p| hitbox.overlaps(&p.hitbox(config.player_size)))
            .map(|p| p.id)
    }

    /// Apply damage to a live player and emit, in order: health change,
    /// impact feedback, then the kill if this damage was lethal.
    pub fn damage_player(
        player: &mut Player,
        damage: u32,
        attacker_id: PlayerId,
        cause: KillCause,
        config: &WorldConfig,
        outbox: &mut Outbox,
    ) -> HitResult {
        let (new_health, is_dead) = Self::apply_damage(player.health, damage);
        player.health = new_health;

        let (cx, cy) = player.center(config.player_size);
        outbox.broadcast(ServerMsg::HealthChanged {
            id: player.id,
            health: new_health,
        });
        outbox.broadcast(ServerMsg::Damaged {
            id: player.id,
            x: cx,
            y: cy,
        });

        let target_killed =
            is_dead && Lifecycle::kill(player, Some(attacker_id), cause, outbox);

        HitResult {
            target_id: player.id,
            damage,
            health: new_health,
            target_killed,
        }
    }

    /// Detonate a bomb: announce the blast, then damage every live player in
    /// range. The caller removes the bomb.
    pub fn explode(
        bomb: &Bomb,
        players: &mut BTreeMap<PlayerId, Player>,
        config: &WorldConfig,
        outbox: &mut Outbox,
    ) -> Vec<HitResult> {
        info!(bomb_id = bomb.id, x = bomb.x, y = bomb.y, "Bomb exploded");

        outbox.broadcast(ServerMsg::BombExploded {
            id: bomb.id,
            x: bomb.x,
            y: bomb.y,
            radius: config.blast_radius,
        });

        let mut hits = Vec::new();
        for player in players.values_mut() {
            if !player.is_alive() {
                continue;
            }

            let (cx, cy) = player.center(config.player_size);
            let dist = distance(cx, cy, bomb.x, bomb.y);
            if dist > config.blast_radius {
                continue;
            }
            // May round to 0 near the edge; the victim still gets its events
            let damage = Self::blast_damage(dist, config.blast_radius, config.blast_max_damage);

            debug!(
                bomb_id = bomb.id,
                player_id = %player.id,
                distance = dist,
                damage,
                "Blast hit"
            );

            hits.push(Self::damage_player(
                player,
                damage,
                bomb.owner_id,
                KillCause::Bomb,
                config,
                outbox,
            ));
        }
        hits
    }
}
