//! HTTP server setup.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};

use bridge_delivery::Bridge;

use crate::handlers;

/// Creates the Axum router with all admin routes.
pub fn create_router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route(
            "/subscribers",
            get(handlers::list_subscribers).post(handlers::create_subscriber),
        )
        .route(
            "/subscribers/{id}",
            axum::routing::patch(handlers::update_subscriber)
                .delete(handlers::delete_subscriber),
        )
        .route("/subscribers/{id}/test", post(handlers::test_subscriber))
        .route("/events", post(handlers::emit_event))
        .route("/status", get(handlers::get_status))
        .with_state(bridge)
}

/// Starts the HTTP server.
pub async fn start_server(bridge: Arc<Bridge>, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(bridge);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
