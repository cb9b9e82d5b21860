//! Outbound message queue filled by the simulation and flushed by the arena

use crate::ws::protocol::ServerMsg;

use super::entities::PlayerId;

/// Who receives a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(PlayerId),
    Only(PlayerId),
}

impl Audience {
    pub fn includes(&self, id: PlayerId) -> bool {
        match self {
            Audience::All => true,
            Audience::AllExcept(excluded) => *excluded != id,
            Audience::Only(target) => *target == id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub audience: Audience,
    pub msg: ServerMsg,
}

/// Ordered outbound messages. Delivery order equals push order.
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broadcast(&mut self, msg: ServerMsg) {
        self.push(Audience::All, msg);
    }

    pub fn broadcast_except(&mut self, excluded: PlayerId, msg: ServerMsg) {
        self.push(Audience::AllExcept(excluded), msg);
    }

    pub fn send_to(&mut self, target: PlayerId, msg: ServerMsg) {
        self.push(Audience::Only(target), msg);
    }

    pub fn push(&mut self, audience: Audience, msg: ServerMsg) {
        self.envelopes.push(Envelope { audience, msg });
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Envelope> {
        self.envelopes.iter()
    }

    pub fn clear(&mut self) {
        self.envelopes.clear();
    }

    /// Take everything queued so far
    pub fn drain(&mut self) -> std::vec::Drain<'_, Envelope> {
        self.envelopes.drain(..)
    }
}
