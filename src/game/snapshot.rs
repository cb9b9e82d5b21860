//! Per-tick full-state snapshots of projectiles and bombs

use std::collections::BTreeMap;

use crate::ws::protocol::{BombPosition, ServerMsg};

use super::entities::{Bomb, BombId, Projectile, ProjectileId};

/// Builds the snapshot messages broadcast at the end of every tick
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every live projectile, keyed by id
    pub fn projectiles(
        &mut self,
        tick: u64,
        projectiles: &BTreeMap<ProjectileId, Projectile>,
    ) -> ServerMsg {
        self.stats.record(projectiles.len());
        ServerMsg::ProjectileSnapshot {
            tick,
            projectiles: projectiles
                .iter()
                .map(|(id, p)| (*id, p.view()))
                .collect(),
        }
    }

    /// Positions of every live bomb, in throw order
    pub fn bombs(&mut self, tick: u64, bombs: &BTreeMap<BombId, Bomb>) -> ServerMsg {
        self.stats.record(bombs.len());
        ServerMsg::BombSnapshot {
            tick,
            bombs: bombs.values().map(Bomb::position).collect::<Vec<BombPosition>>(),
        }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Snapshot volume stats for debugging
#[derive(Debug, Default, Clone)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub avg_entities_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, entity_count: usize) {
        self.total_snapshots += 1;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_entities_per_snapshot =
            self.avg_entities_per_snapshot * ((n - 1.0) / n) + (entity_count as f32 / n);
    }
}
