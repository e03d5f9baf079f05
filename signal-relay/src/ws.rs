//! WebSocket push transport: socket lifecycle and message dispatch.
//!
//! One long-lived socket per peer. Outbound delivery goes through an
//! unbounded per-socket queue drained by a dedicated writer task, so a slow
//! or dead peer can never block a broadcast to the others.

use crate::server::SignalRelay;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use futures_util::{SinkExt, StreamExt};
use signal_core::PeerSink;
use signal_types::{SocketEvent, SocketRequest, Timestamp};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one connected socket: an identity plus its outbound queue.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    id: u64,
    outbound: mpsc::UnboundedSender<String>,
}

impl SocketHandle {
    fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id: NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed),
            outbound,
        }
    }
}

impl PartialEq for SocketHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SocketHandle {}

impl Hash for SocketHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PeerSink for SocketHandle {
    fn deliver(&self, event: &SocketEvent) {
        match serde_json::to_string(event) {
            Ok(text) => {
                // A closed receiver means the peer is gone; its events are
                // dropped without affecting anyone else.
                if self.outbound.send(text).is_err() {
                    tracing::debug!(socket = self.id, "dropping event for closed socket");
                }
            }
            Err(e) => tracing::error!(socket = self.id, "failed to serialize socket event: {e}"),
        }
    }
}

/// Upgrade handler for `GET /ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(relay): Extension<Arc<SignalRelay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: Arc<SignalRelay>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut inbox) = mpsc::unbounded_channel::<String>();
    let handle = SocketHandle::new(outbound);
    let socket_id = handle.id;

    let writer = tokio::spawn(async move {
        while let Some(text) = inbox.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    relay
        .metrics()
        .socket_connections_total
        .fetch_add(1, Ordering::Relaxed);
    relay.sockets().lock().await.on_open(handle.clone());
    tracing::info!(socket = socket_id, "socket connected");

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => dispatch(&relay, &handle, &text).await,
            Message::Close(_) => break,
            // Binary, ping and pong frames carry no signaling.
            _ => {}
        }
    }

    relay.sockets().lock().await.on_close(&handle);
    writer.abort();
    tracing::info!(socket = socket_id, "socket disconnected");
}

async fn dispatch(relay: &SignalRelay, handle: &SocketHandle, text: &str) {
    let request: SocketRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            // A malformed frame is this peer's problem only.
            tracing::warn!(socket = handle.id, "ignoring malformed message: {e}");
            relay.metrics().errors_total.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let now = Timestamp::now();
    let mut sockets = relay.sockets().lock().await;
    match request {
        SocketRequest::Connect { connection_id } => sockets.on_connect(handle, connection_id),
        SocketRequest::Disconnect { connection_id } => sockets.on_disconnect(handle, connection_id),
        SocketRequest::Offer { data } => {
            relay.metrics().offers_total.fetch_add(1, Ordering::Relaxed);
            sockets.on_offer(handle, data.connection_id, data.sdp, now);
        }
        SocketRequest::Answer { data } => {
            relay.metrics().answers_total.fetch_add(1, Ordering::Relaxed);
            sockets.on_answer(handle, data.connection_id, data.sdp, now);
        }
        SocketRequest::Candidate { data } => {
            relay
                .metrics()
                .candidates_total
                .fetch_add(1, Ordering::Relaxed);
            sockets.on_candidate(handle, data, now);
        }
    }
}
