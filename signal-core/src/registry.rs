//! The authoritative in-memory signaling registry.
//!
//! Owns every session, its connection set and handshake artifact stores,
//! the connection pairing table, and the staleness sweep. All state is
//! volatile; both transports mutate it through this one type.

use crate::pair::Pair;
use signal_types::{
    Answer, Candidate, ConnectionId, Disconnection, Offer, SessionId, SignalError, SignalResult,
    Timestamp,
};
use std::collections::{HashMap, HashSet};

/// Default staleness timeout: a session untouched for this long is eligible
/// for reaping the next time one of its peers reads its connection list.
pub const DEFAULT_STALE_TIMEOUT_MS: u64 = 10_000;

/// Per-session state. Created and destroyed atomically with the session's
/// registration; no per-connection store outlives its owning session.
#[derive(Debug, Default)]
pub(crate) struct SessionEntry {
    pub(crate) connections: HashSet<ConnectionId>,
    pub(crate) offers: HashMap<ConnectionId, Offer>,
    pub(crate) answers: HashMap<ConnectionId, Answer>,
    pub(crate) candidates: HashMap<ConnectionId, Vec<Candidate>>,
    pub(crate) disconnections: Vec<Disconnection>,
    pub(crate) last_seen: Timestamp,
}

/// The session/connection registry shared by both transports.
#[derive(Debug)]
pub struct Registry {
    pub(crate) sessions: HashMap<SessionId, SessionEntry>,
    pub(crate) pairs: HashMap<ConnectionId, Pair<SessionId>>,
    stale_timeout_ms: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry with the default staleness timeout.
    pub fn new() -> Self {
        Self::with_stale_timeout(DEFAULT_STALE_TIMEOUT_MS)
    }

    /// Create a registry with a custom staleness timeout in milliseconds.
    pub fn with_stale_timeout(stale_timeout_ms: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            pairs: HashMap::new(),
            stale_timeout_ms,
        }
    }

    /// Clear all state. Used only by tests.
    pub fn reset(&mut self) {
        self.sessions.clear();
        self.pairs.clear();
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a session is currently registered.
    pub fn contains_session(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Register a session.
    ///
    /// A caller-supplied identifier is honored; re-registration resets that
    /// session's stores. Without one, a fresh unique identifier is
    /// generated.
    pub fn create_session(&mut self, id: Option<SessionId>, now: Timestamp) -> SessionId {
        let session_id = id.unwrap_or_else(SessionId::generate);
        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                last_seen: now,
                ..SessionEntry::default()
            },
        );
        tracing::debug!(session = %session_id, "registered session");
        session_id
    }

    /// Record that a session made an authenticated request.
    ///
    /// Possession of a known session identifier is the relay's only
    /// authentication; every polling request lands here first.
    pub fn touch(&mut self, session_id: &SessionId, now: Timestamp) -> SignalResult<()> {
        let entry = self.entry_mut(session_id)?;
        entry.last_seen = now;
        Ok(())
    }

    /// Add a connection identifier to a session's set. Idempotent.
    pub fn register_connection(
        &mut self,
        session_id: &SessionId,
        connection_id: ConnectionId,
    ) -> SignalResult<()> {
        let entry = self.entry_mut(session_id)?;
        entry.connections.insert(connection_id);
        Ok(())
    }

    /// Remove a connection from a session, tearing down its pairing and
    /// artifact entries on both sides.
    ///
    /// Side-effect free when the session does not hold the connection.
    pub fn delete_connection(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> SignalResult<()> {
        let owned = self.entry(session_id)?.connections.contains(connection_id);
        if owned {
            self.teardown_connection(session_id, connection_id);
        }
        Ok(())
    }

    /// Remove a session and every connection it holds. Idempotent.
    ///
    /// Each surviving peer that shared a pairing with a removed connection
    /// gets a [`Disconnection`] record, so polling clients can observe the
    /// loss later.
    pub fn delete_session(&mut self, session_id: &SessionId, now: Timestamp) {
        let Some(entry) = self.sessions.get(session_id) else {
            return;
        };
        let connections: Vec<ConnectionId> = entry.connections.iter().cloned().collect();

        for connection_id in connections {
            if let Some(peer_id) = self.teardown_connection(session_id, &connection_id) {
                if let Some(peer) = self.sessions.get_mut(&peer_id) {
                    peer.disconnections.push(Disconnection {
                        connection_id,
                        date_time: now,
                    });
                }
            }
        }

        self.sessions.remove(session_id);
        tracing::debug!(session = %session_id, "removed session");
    }

    /// Reap stale peers of `session_id`.
    ///
    /// For each of the session's connections with a pairing entry, the
    /// counterpart session is checked against the staleness timeout and
    /// deleted (with full cascade) if it has not been seen recently enough.
    /// Runs before any read of a connection list, never after, so a caller
    /// never observes a connection whose peer has already timed out.
    pub fn sweep(&mut self, session_id: &SessionId, now: Timestamp) {
        let Some(entry) = self.sessions.get(session_id) else {
            return;
        };

        // Resolve counterparts before mutating: reaping rewrites the very
        // tables being walked.
        let mut stale: Vec<SessionId> = Vec::new();
        for connection_id in &entry.connections {
            let Some(pair) = self.pairs.get(connection_id) else {
                continue;
            };
            let Some(peer_id) = pair.counterpart(session_id) else {
                continue;
            };
            let Some(peer) = self.sessions.get(peer_id) else {
                continue;
            };
            if now.millis_since(peer.last_seen) >= self.stale_timeout_ms
                && !stale.contains(peer_id)
            {
                stale.push(peer_id.clone());
            }
        }

        for peer_id in stale {
            tracing::info!(session = %peer_id, "reaping stale session");
            self.delete_session(&peer_id, now);
        }
    }

    /// Remove `connection_id` everywhere it is known: the owning session's
    /// set and stores, the pairing table, and the paired session's set and
    /// stores. Returns the surviving peer session, if any.
    fn teardown_connection(
        &mut self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Option<SessionId> {
        let peer_id = self
            .pairs
            .remove(connection_id)
            .and_then(|pair| pair.counterpart(session_id).cloned());

        if let Some(entry) = self.sessions.get_mut(session_id) {
            entry.purge_connection(connection_id);
        }

        let peer_id = peer_id.filter(|peer| peer != session_id)?;
        let peer = self.sessions.get_mut(&peer_id)?;
        peer.purge_connection(connection_id);
        Some(peer_id)
    }

    pub(crate) fn entry(&self, session_id: &SessionId) -> SignalResult<&SessionEntry> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| SignalError::SessionNotFound {
                session_id: session_id.clone(),
            })
    }

    pub(crate) fn entry_mut(&mut self, session_id: &SessionId) -> SignalResult<&mut SessionEntry> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| SignalError::SessionNotFound {
                session_id: session_id.clone(),
            })
    }
}

impl SessionEntry {
    fn purge_connection(&mut self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);
        self.offers.remove(connection_id);
        self.answers.remove(connection_id);
        self.candidates.remove(connection_id);
    }
}
