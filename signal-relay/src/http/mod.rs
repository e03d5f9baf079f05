//! HTTP endpoints: the polling transport plus config, health and metrics.

pub mod health;
mod metrics;
mod signaling;

use crate::server::SignalRelay;
use crate::ws;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<SignalRelay>) -> Router {
    Router::new()
        .route("/config", get(config_handler))
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route(
            "/signaling",
            get(signaling::get_all)
                .put(signaling::create_session)
                .delete(signaling::delete_session),
        )
        .route(
            "/signaling/connection",
            get(signaling::list_connections)
                .put(signaling::create_connection)
                .delete(signaling::delete_connection),
        )
        .route(
            "/signaling/offer",
            get(signaling::get_offers).post(signaling::post_offer),
        )
        .route(
            "/signaling/answer",
            get(signaling::get_answers).post(signaling::post_answer),
        )
        .route(
            "/signaling/candidate",
            get(signaling::get_candidates).post(signaling::post_candidate),
        )
        .route("/ws", get(ws::ws_handler))
        .layer(Extension(relay))
}

/// Static capability announcement consumed by clients at startup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigResponse {
    use_web_socket: bool,
    startup_mode: String,
    logging: String,
}

async fn config_handler(Extension(relay): Extension<Arc<SignalRelay>>) -> Json<ConfigResponse> {
    let client = &relay.config().client;
    Json(ConfigResponse {
        use_web_socket: client.use_websocket,
        startup_mode: client.startup_mode.clone(),
        logging: client.logging.clone(),
    })
}
