//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::util::time::{unix_millis, uptime_secs};
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // The upgrade route must not carry a request timeout: the socket outlives it
    let http_routes = Router::new()
        .route("/health", get(health_handler))
        .layer(TimeoutLayer::new(Duration::from_secs(10)));

    Router::new()
        .merge(http_routes)
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: u64,
    tick: u64,
    connections: usize,
    players: usize,
    projectiles: usize,
    bombs: usize,
    snapshots: u64,
    avg_snapshot_entities: f32,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        server_time: unix_millis(),
        tick: state.arena.tick(),
        connections: state.hub.connection_count(),
        players: state.arena.player_count(),
        projectiles: state.arena.projectile_count(),
        bombs: state.arena.bomb_count(),
        snapshots: state.arena.snapshot_count(),
        avg_snapshot_entities: state.arena.avg_snapshot_entities(),
    })
}
