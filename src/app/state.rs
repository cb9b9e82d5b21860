//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{ArenaHandle, GameArena};
use crate::ws::hub::Hub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<Hub>,
    pub arena: ArenaHandle,
}

impl AppState {
    /// Build the state and the arena task that backs it. The caller spawns
    /// the arena.
    pub fn new(config: Config) -> (Self, GameArena) {
        let config = Arc::new(config);

        // Initialize connection hub
        let hub = Arc::new(Hub::new());

        // Initialize the arena (single writer of world state)
        let (arena, handle) = GameArena::new(config.world.clone(), hub.clone());

        let state = Self {
            config,
            hub,
            arena: handle,
        };

        (state, arena)
    }
}
