//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay exposes a single websocket endpoint, a health probe and a
//! read-only roster lookup. CORS is left open because browser clients are
//! served from other origins.

pub mod ws;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router};
use frames::model::RemoteUser;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::room;
use crate::state::AppState;

/// Build the relay router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .route("/rooms/{room_id}/users", get(room_users))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Roster of a room in join order; empty when nobody is in it.
async fn room_users(State(state): State<AppState>, Path(room_id): Path<String>) -> Json<Vec<RemoteUser>> {
    Json(room::list_users(&state, &room_id).await)
}
