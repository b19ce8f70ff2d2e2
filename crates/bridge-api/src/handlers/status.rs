//! Bridge status handler.

use std::sync::Arc;

use axum::{extract::State, Json};

use bridge_delivery::{Bridge, BridgeStatus};

use crate::error::ApiError;

/// `GET /status`
pub async fn get_status(
    State(bridge): State<Arc<Bridge>>,
) -> Result<Json<BridgeStatus>, ApiError> {
    Ok(Json(bridge.status().await?))
}
