//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::ArenaCommand;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::hub::Hub;
use crate::ws::protocol::ClientMsg;

/// WebSocket upgrade handler. Each socket is one player for its lifetime.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    // The arena registers the sender when it spawns the player, so init is
    // always the first frame on this socket
    let (outbound_tx, outbound_rx) = Hub::channel();
    let command_tx = state.arena.command_tx.clone();

    let joined = ArenaCommand::Joined {
        player_id,
        outbound: outbound_tx,
    };
    if command_tx.send(joined).await.is_err() {
        error!(player_id = %player_id, "Arena is not running");
        return;
    }

    run_session(player_id, ws_sink, ws_stream, outbound_rx, &command_tx).await;

    // Disconnect is a terminal lifecycle event for this player only
    if command_tx.send(ArenaCommand::Left(player_id)).await.is_err() {
        debug!(player_id = %player_id, "Arena gone before disconnect");
    }

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<String>,
    command_tx: &mpsc::Sender<ArenaCommand>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Spawn writer task: hub -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(json) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(json)).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if command_tx
                            .send(ArenaCommand::Input { player_id, msg })
                            .await
                            .is_err()
                        {
                            debug!(player_id = %player_id, "Arena command channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}
