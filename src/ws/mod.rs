//! WebSocket transport: wire protocol, socket sessions, fan-out hub

pub mod handler;
pub mod hub;
pub mod protocol;
