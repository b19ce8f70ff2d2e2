//! Event emission handler.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use bridge_core::models::BridgeEvent;
use bridge_delivery::Bridge;

use crate::error::ApiError;

/// Request body for event emission.
#[derive(Debug, Deserialize)]
pub struct EmitEventRequest {
    /// Event type; only `integration_`-prefixed types are bridged.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Arbitrary structured payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Response for an accepted emission.
#[derive(Debug, Serialize)]
pub struct EmitEventResponse {
    /// Id assigned to this emission.
    pub event_id: String,
    /// Whether the event fell inside the bridged namespace.
    pub bridged: bool,
}

/// `POST /events`
///
/// Always accepts: delivery outcomes are asynchronous and events outside
/// the namespace are ignored by contract, not rejected.
pub async fn emit_event(
    State(bridge): State<Arc<Bridge>>,
    Json(request): Json<EmitEventRequest>,
) -> Result<(StatusCode, Json<EmitEventResponse>), ApiError> {
    let event = BridgeEvent::new(request.event_type, request.payload);
    let response =
        EmitEventResponse { event_id: event.id.to_string(), bridged: event.is_bridgeable() };

    bridge.emit(event).await?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}
