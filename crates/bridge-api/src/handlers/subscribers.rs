//! Subscriber CRUD and connectivity-probe handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bridge_core::{
    error::BridgeError,
    models::{SubscriberId, SubscriberView},
};
use bridge_delivery::Bridge;

use crate::error::ApiError;

/// Request body for subscriber registration.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriberRequest {
    /// Destination URL; must be `http` or `https`.
    pub url: String,
    /// Event-type patterns; defaults to the catch-all wildcard.
    #[serde(default)]
    pub events: Vec<String>,
}

/// Response for subscriber registration.
///
/// The only place the signing secret ever appears.
#[derive(Debug, Serialize)]
pub struct CreateSubscriberResponse {
    /// The registered subscriber, secret stripped.
    pub subscriber: SubscriberView,
    /// The signing secret; shown once, never re-exposed.
    pub secret: String,
}

/// Request body for enabling or disabling a subscriber.
#[derive(Debug, Deserialize)]
pub struct UpdateSubscriberRequest {
    /// New enabled state.
    pub enabled: bool,
}

/// Response for a queued connectivity probe.
#[derive(Debug, Serialize)]
pub struct TestSubscriberResponse {
    /// Always true; the probe's outcome lands in stats and the
    /// subscriber's delivery fields.
    pub queued: bool,
}

/// `GET /subscribers`
pub async fn list_subscribers(
    State(bridge): State<Arc<Bridge>>,
) -> Result<Json<Vec<SubscriberView>>, ApiError> {
    Ok(Json(bridge.list_subscribers().await?))
}

/// `POST /subscribers`
pub async fn create_subscriber(
    State(bridge): State<Arc<Bridge>>,
    Json(request): Json<CreateSubscriberRequest>,
) -> Result<(StatusCode, Json<CreateSubscriberResponse>), ApiError> {
    let (subscriber, secret) = bridge.create_subscriber(&request.url, request.events).await?;
    Ok((StatusCode::CREATED, Json(CreateSubscriberResponse { subscriber, secret })))
}

/// `PATCH /subscribers/{id}`
pub async fn update_subscriber(
    State(bridge): State<Arc<Bridge>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSubscriberRequest>,
) -> Result<Json<SubscriberView>, ApiError> {
    let id = SubscriberId::from(id);
    match bridge.set_subscriber_enabled(id, request.enabled).await? {
        Some(subscriber) => Ok(Json(subscriber)),
        None => Err(BridgeError::unknown_subscriber(id).into()),
    }
}

/// `DELETE /subscribers/{id}`
pub async fn delete_subscriber(
    State(bridge): State<Arc<Bridge>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let id = SubscriberId::from(id);
    if bridge.delete_subscriber(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(BridgeError::unknown_subscriber(id).into())
    }
}

/// `POST /subscribers/{id}/test`
pub async fn test_subscriber(
    State(bridge): State<Arc<Bridge>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<TestSubscriberResponse>), ApiError> {
    let id = SubscriberId::from(id);
    if bridge.test_subscriber(id).await? {
        Ok((StatusCode::ACCEPTED, Json(TestSubscriberResponse { queued: true })))
    } else {
        Err(BridgeError::unknown_subscriber(id).into())
    }
}
