//! Routes for the event receiver

pub mod events;

use axum::{
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build the event routes
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(events::receive_event))
        .route("/stats", get(events::stats))
}
