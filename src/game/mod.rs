//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod dispatch;
pub mod entities;
pub mod geometry;
pub mod lifecycle;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use arena::{ArenaCommand, ArenaHandle, GameArena};
