//! Builds the axum `Router` for the client-facing surface, mirroring the
//! donor's `api::router`. Kept separate from `main.rs` so tests can mount
//! it against an in-process listener without going through the CLI.

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

pub fn router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws::ws_upgrade)).with_state(state)
}
