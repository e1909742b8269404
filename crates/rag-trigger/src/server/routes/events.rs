//! CloudEvent delivery endpoint

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use crate::handler::HandlerStatsSnapshot;
use crate::server::state::AppState;
use crate::types::{CloudEvent, EventSummary};

/// POST / - Receive a storage notification
///
/// Always answers 200 so the delivery is acknowledged and never retried;
/// failures only show up in the logs and the returned summary.
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<EventSummary> {
    let event = match CloudEvent::from_http(&headers, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Rejected delivery: {}", e);
            return Json(EventSummary::unknown(e.to_string()));
        }
    };

    Json(state.handler().handle(&event).await)
}

/// GET /stats - Handler counters and ledger size
pub async fn stats(State(state): State<AppState>) -> Json<HandlerStatsSnapshot> {
    Json(state.handler().stats())
}
