//! Player lifecycle: Alive -> Dead -> (respawn) -> Alive

use tracing::info;

use crate::config::WorldConfig;
use crate::ws::protocol::{KillCause, ServerMsg};

use super::dispatch::Outbox;
use super::entities::{LifeState, Player, PlayerId};
use super::physics::PhysicsSystem;

pub struct Lifecycle;

impl Lifecycle {
    /// Movement and attack commands only count while alive
    pub fn accepts_input(player: &Player) -> bool {
        player.is_alive()
    }

    /// Alive -> Dead. Broadcasts the kill; a no-op for players already dead.
    pub fn kill(
        player: &mut Player,
        killer_id: Option<PlayerId>,
        cause: KillCause,
        outbox: &mut Outbox,
    ) -> bool {
        if !player.is_alive() {
            return false;
        }

        player.health = 0;
        player.life = LifeState::Dead { killer_id, cause };

        info!(
            victim_id = %player.id,
            killer_id = ?killer_id,
            cause = ?cause,
            "Player killed"
        );

        outbox.broadcast(ServerMsg::Killed {
            victim_id: player.id,
            killer_id,
            cause,
        });
        true
    }

    /// Kill a live player that dropped below the death line
    pub fn check_fall(player: &mut Player, config: &WorldConfig, outbox: &mut Outbox) -> bool {
        player.is_alive()
            && PhysicsSystem::is_fallen(player, config)
            && Self::kill(player, None, KillCause::Fall, outbox)
    }

    /// Dead -> Alive at the spawn point with full health. Ignored while alive.
    pub fn respawn(player: &mut Player, config: &WorldConfig, outbox: &mut Outbox) -> bool {
        if player.is_alive() {
            return false;
        }

        player.x = config.spawn_x;
        player.y = config.spawn_y;
        player.velocity_y = 0.0;
        player.is_jumping = false;
        player.health = config.max_health;
        player.life = LifeState::Alive;

        info!(player_id = %player.id, "Player respawned");

        outbox.broadcast(ServerMsg::Respawned {
            player: player.view(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn player() -> Player {
        Player::new(Uuid::from_u128(7), 100.0, 100.0, 100, "#00FF00".into())
    }

    #[test]
    fn kill_is_idempotent() {
        let mut p = player();
        let mut outbox = Outbox::new();
        let killer = Some(Uuid::from_u128(9));

        assert!(Lifecycle::kill(&mut p, killer, KillCause::Projectile, &mut outbox));
        assert!(!Lifecycle::kill(&mut p, None, KillCause::Fall, &mut outbox));

        assert_eq!(outbox.len(), 1);
        assert_eq!(
            p.life,
            LifeState::Dead {
                killer_id: killer,
                cause: KillCause::Projectile
            }
        );
        assert!(!Lifecycle::accepts_input(&p));
    }

    #[test]
    fn fall_death_fires_once() {
        let config = WorldConfig::default();
        let mut p = player();
        p.y = config.death_y + 1.0;
        let mut outbox = Outbox::new();

        assert!(Lifecycle::check_fall(&mut p, &config, &mut outbox));
        p.y += 50.0;
        assert!(!Lifecycle::check_fall(&mut p, &config, &mut outbox));

        let kills: Vec<_> = outbox
            .iter()
            .filter_map(|e| match &e.msg {
                ServerMsg::Killed { killer_id, cause, .. } => Some((*killer_id, *cause)),
                _ => None,
            })
            .collect();
        assert_eq!(kills, vec![(None, KillCause::Fall)]);
        assert_eq!(p.health, 0);
    }

    #[test]
    fn respawn_only_from_dead() {
        let config = WorldConfig::default();
        let mut p = player();
        let mut outbox = Outbox::new();

        p.health = 40;
        assert!(!Lifecycle::respawn(&mut p, &config, &mut outbox));
        assert_eq!(p.health, 40);
        assert!(outbox.is_empty());

        p.x = 500.0;
        p.velocity_y = 9.0;
        Lifecycle::kill(&mut p, None, KillCause::Fall, &mut outbox);
        assert!(Lifecycle::respawn(&mut p, &config, &mut outbox));

        assert!(p.is_alive());
        assert_eq!(p.health, 100);
        assert_eq!((p.x, p.y, p.velocity_y), (100.0, 100.0, 0.0));
        assert!(matches!(
            outbox.iter().last().map(|e| &e.msg),
            Some(ServerMsg::Respawned { player }) if player.id == p.id && !player.is_dead
        ));
    }
}
