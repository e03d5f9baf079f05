//! Shared relay state and coordination.
//!
//! `SignalRelay` owns the registry and the socket-transport state, each
//! behind its own async mutex. Every logical operation is one lock
//! acquisition with no await inside the critical section, so reads (the
//! staleness sweep) and writes (session deletion) always observe a
//! consistent snapshot and there is no nested cross-session locking.

use crate::config::Config;
use crate::ws::SocketHandle;
use signal_core::{PushSignaling, Registry};
use std::sync::atomic::AtomicU64;
use tokio::sync::Mutex;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total sessions created over the polling API.
    pub sessions_created: AtomicU64,
    /// Total offers posted (both transports).
    pub offers_total: AtomicU64,
    /// Total answers posted (both transports).
    pub answers_total: AtomicU64,
    /// Total candidates posted (both transports).
    pub candidates_total: AtomicU64,
    /// Total WebSocket connections accepted.
    pub socket_connections_total: AtomicU64,
    /// Total malformed or rejected requests.
    pub errors_total: AtomicU64,
}

/// Shared state behind every transport handler.
pub struct SignalRelay {
    config: Config,
    registry: Mutex<Registry>,
    sockets: Mutex<PushSignaling<SocketHandle>>,
    metrics: RelayMetrics,
}

impl std::fmt::Debug for SignalRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRelay")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl SignalRelay {
    /// Create relay state from configuration.
    pub fn new(config: Config) -> Self {
        let registry = Registry::with_stale_timeout(config.session.stale_timeout_ms);
        Self {
            config,
            registry: Mutex::new(registry),
            sockets: Mutex::new(PushSignaling::new()),
            metrics: RelayMetrics::default(),
        }
    }

    /// The relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The polling-transport registry.
    pub fn registry(&self) -> &Mutex<Registry> {
        &self.registry
    }

    /// The socket-transport state.
    pub fn sockets(&self) -> &Mutex<PushSignaling<SocketHandle>> {
        &self.sockets
    }

    /// Operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Number of registered polling sessions.
    pub async fn session_count(&self) -> usize {
        self.registry.lock().await.session_count()
    }

    /// Number of currently open sockets.
    pub async fn socket_count(&self) -> usize {
        self.sockets.lock().await.socket_count()
    }
}
