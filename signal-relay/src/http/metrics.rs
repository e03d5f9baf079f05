//! Prometheus metrics endpoint.

use crate::server::SignalRelay;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format. Includes both gauges (current
/// state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<SignalRelay>>) -> Response {
    if !relay.config().http.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    let m = relay.metrics();

    // Gauges — current state
    let sessions = relay.session_count().await;
    let sockets = relay.socket_count().await;

    // Counters — monotonic since startup
    let sessions_created = m.sessions_created.load(Ordering::Relaxed);
    let offers = m.offers_total.load(Ordering::Relaxed);
    let answers = m.answers_total.load(Ordering::Relaxed);
    let candidates = m.candidates_total.load(Ordering::Relaxed);
    let socket_conns = m.socket_connections_total.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP signal_relay_sessions_active Number of registered polling sessions
# TYPE signal_relay_sessions_active gauge
signal_relay_sessions_active {sessions}

# HELP signal_relay_sockets_active Number of open WebSocket connections
# TYPE signal_relay_sockets_active gauge
signal_relay_sockets_active {sockets}

# HELP signal_relay_info Server information
# TYPE signal_relay_info gauge
signal_relay_info{{version="{version}"}} 1

# HELP signal_relay_sessions_created_total Total sessions created
# TYPE signal_relay_sessions_created_total counter
signal_relay_sessions_created_total {sessions_created}

# HELP signal_relay_offers_total Total offers posted
# TYPE signal_relay_offers_total counter
signal_relay_offers_total {offers}

# HELP signal_relay_answers_total Total answers posted
# TYPE signal_relay_answers_total counter
signal_relay_answers_total {answers}

# HELP signal_relay_candidates_total Total candidates posted
# TYPE signal_relay_candidates_total counter
signal_relay_candidates_total {candidates}

# HELP signal_relay_socket_connections_total Total WebSocket connections accepted
# TYPE signal_relay_socket_connections_total counter
signal_relay_socket_connections_total {socket_conns}

# HELP signal_relay_errors_total Total malformed or rejected requests
# TYPE signal_relay_errors_total counter
signal_relay_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
