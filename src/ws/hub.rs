//! Connection hub: fan-out of outbound messages to client sockets

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::game::dispatch::{Audience, Envelope};
use crate::game::entities::PlayerId;

/// Per-connection outbound queue depth
pub const OUTBOUND_BUFFER: usize = 256;

/// Registry of connected sockets, keyed by player id
pub struct Hub {
    clients: DashMap<PlayerId, mpsc::Sender<String>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Outbound queue for one connection. The receiver feeds the socket
    /// writer; the sender is registered by the arena on join.
    pub fn channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(OUTBOUND_BUFFER)
    }

    pub fn register(&self, player_id: PlayerId, tx: mpsc::Sender<String>) {
        self.clients.insert(player_id, tx);
    }

    pub fn unregister(&self, player_id: PlayerId) {
        self.clients.remove(&player_id);
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// Serialize once and hand the frame to every recipient. Never blocks:
    /// a full or closed queue drops the frame for that client only.
    pub fn deliver(&self, envelope: &Envelope) {
        let json = match serde_json::to_string(&envelope.msg) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound message");
                return;
            }
        };

        match envelope.audience {
            Audience::Only(player_id) => {
                if let Some(tx) = self.clients.get(&player_id) {
                    Self::offer(player_id, tx.value(), json);
                }
            }
            audience => {
                for entry in self.clients.iter() {
                    if audience.includes(*entry.key()) {
                        Self::offer(*entry.key(), entry.value(), json.clone());
                    }
                }
            }
        }
    }

    fn offer(player_id: PlayerId, tx: &mpsc::Sender<String>, json: String) {
        match tx.try_send(json) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(player_id = %player_id, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(player_id = %player_id, "Outbound queue closed");
            }
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::ServerMsg;
    use uuid::Uuid;

    fn connect(hub: &Hub, id: PlayerId) -> mpsc::Receiver<String> {
        let (tx, rx) = Hub::channel();
        hub.register(id, tx);
        rx
    }

    fn envelope(audience: Audience, t: u64) -> Envelope {
        Envelope {
            audience,
            msg: ServerMsg::Pong { t },
        }
    }

    #[test]
    fn routes_by_audience() {
        let hub = Hub::new();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let mut rx_a = connect(&hub, a);
        let mut rx_b = connect(&hub, b);

        hub.deliver(&envelope(Audience::All, 1));
        hub.deliver(&envelope(Audience::AllExcept(a), 2));
        hub.deliver(&envelope(Audience::Only(a), 3));

        let got_a: Vec<String> = std::iter::from_fn(|| rx_a.try_recv().ok()).collect();
        let got_b: Vec<String> = std::iter::from_fn(|| rx_b.try_recv().ok()).collect();

        assert_eq!(got_a, vec![r#"{"type":"pong","t":1}"#, r#"{"type":"pong","t":3}"#]);
        assert_eq!(got_b, vec![r#"{"type":"pong","t":1}"#, r#"{"type":"pong","t":2}"#]);
    }

    #[test]
    fn slow_client_does_not_block_others() {
        let hub = Hub::new();
        let slow = Uuid::from_u128(1);
        let fast = Uuid::from_u128(2);
        let _slow_rx = connect(&hub, slow);
        let mut fast_rx = connect(&hub, fast);

        for t in 0..(OUTBOUND_BUFFER as u64 + 10) {
            hub.deliver(&envelope(Audience::All, t));
            assert!(fast_rx.try_recv().is_ok());
        }
    }

    #[test]
    fn unregistered_client_receives_nothing() {
        let hub = Hub::new();
        let id = Uuid::from_u128(1);
        let mut rx = connect(&hub, id);
        hub.unregister(id);
        assert_eq!(hub.connection_count(), 0);

        hub.deliver(&envelope(Audience::Only(id), 1));
        assert!(tokio_test::block_on(rx.recv()).is_none());
    }
}
