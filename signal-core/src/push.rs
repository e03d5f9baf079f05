//! Push-transport state machine: immediate relay over live sockets.
//!
//! No cursor and no buffering: events reach whoever is connected at the
//! moment they occur, and a peer that reconnects has missed whatever was
//! sent in between. Socket identity substitutes for the session identifier.
//!
//! Delivery is deliberately asymmetric, matching the observable contract of
//! the protocol: offers and candidates are flooded to every other socket,
//! answers are targeted at the pairing counterpart only.

use crate::pair::Pair;
use signal_types::{Answer, Candidate, CandidatePayload, ConnectionId, Offer, SocketEvent, Timestamp};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Delivery seam between the state machine and the socket layer.
///
/// Implementations must not block: a slow or dead peer may lose events but
/// must never delay delivery to anyone else.
pub trait PeerSink {
    /// Queue one event for delivery to this peer.
    fn deliver(&self, event: &SocketEvent);
}

/// Socket-transport signaling state: per-socket connection sets plus the
/// pairing relation, keyed by socket handle instead of session identifier.
#[derive(Debug)]
pub struct PushSignaling<S> {
    clients: HashMap<S, HashSet<ConnectionId>>,
    pairs: HashMap<ConnectionId, Pair<S>>,
}

impl<S> Default for PushSignaling<S> {
    fn default() -> Self {
        Self {
            clients: HashMap::new(),
            pairs: HashMap::new(),
        }
    }
}

impl<S: PeerSink + Clone + Eq + Hash> PushSignaling<S> {
    /// Create an empty push-transport state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open sockets.
    pub fn socket_count(&self) -> usize {
        self.clients.len()
    }

    /// A socket opened: register it with no connections yet.
    pub fn on_open(&mut self, socket: S) {
        self.clients.insert(socket, HashSet::new());
    }

    /// A socket closed: tell each paired counterpart its peer is gone, then
    /// forget the socket.
    pub fn on_close(&mut self, socket: &S) {
        let Some(connections) = self.clients.remove(socket) else {
            return;
        };
        for connection_id in connections {
            let Some(pair) = self.pairs.get(&connection_id) else {
                continue;
            };
            if let Some(peer) = pair.counterpart(socket) {
                peer.deliver(&SocketEvent::Disconnect { connection_id });
            }
        }
    }

    /// Claim a connection identifier and acknowledge to the caller.
    pub fn on_connect(&mut self, socket: &S, connection_id: ConnectionId) {
        self.connections_mut(socket).insert(connection_id.clone());
        socket.deliver(&SocketEvent::Connect {
            connection_id,
            polite: true,
        });
    }

    /// Release a connection: notify the paired counterpart, drop the
    /// pairing, and confirm to the caller.
    pub fn on_disconnect(&mut self, socket: &S, connection_id: ConnectionId) {
        if let Some(connections) = self.clients.get_mut(socket) {
            connections.remove(&connection_id);
        }
        if let Some(pair) = self.pairs.remove(&connection_id) {
            if let Some(peer) = pair.counterpart(socket) {
                peer.deliver(&SocketEvent::Disconnect {
                    connection_id: connection_id.clone(),
                });
            }
        }
        socket.deliver(&SocketEvent::Disconnect { connection_id });
    }

    /// Install the pending pairing for an offer and flood it to every other
    /// socket. The first peer to answer completes the pairing.
    pub fn on_offer(&mut self, socket: &S, connection_id: ConnectionId, sdp: String, now: Timestamp) {
        self.connections_mut(socket).insert(connection_id.clone());
        self.pairs
            .insert(connection_id.clone(), Pair::pending(socket.clone()));
        self.broadcast_except(
            socket,
            &SocketEvent::Offer {
                from: connection_id,
                to: String::new(),
                data: Offer::new(sdp, now),
            },
        );
    }

    /// Complete a pairing and deliver the answer to the offering socket
    /// only. An answer with no pairing is dropped silently.
    pub fn on_answer(&mut self, socket: &S, connection_id: ConnectionId, sdp: String, now: Timestamp) {
        self.connections_mut(socket).insert(connection_id.clone());

        let Some(pair) = self.pairs.get(&connection_id) else {
            return;
        };
        let Some(offerer) = pair.counterpart(socket).cloned() else {
            return;
        };
        self.pairs.insert(
            connection_id.clone(),
            Pair::complete(offerer.clone(), socket.clone()),
        );
        offerer.deliver(&SocketEvent::Answer {
            from: connection_id,
            to: String::new(),
            data: Answer::new(sdp, now),
        });
    }

    /// Flood a candidate to every other socket, mirroring offer delivery.
    pub fn on_candidate(&mut self, socket: &S, payload: CandidatePayload, now: Timestamp) {
        let CandidatePayload {
            connection_id,
            candidate,
            sdp_m_line_index,
            sdp_mid,
        } = payload;
        self.broadcast_except(
            socket,
            &SocketEvent::Candidate {
                from: connection_id,
                to: String::new(),
                data: Candidate::new(candidate, sdp_m_line_index, sdp_mid, now),
            },
        );
    }

    /// Deliver an event to every open socket except the sender.
    pub fn broadcast_except(&self, sender: &S, event: &SocketEvent) {
        for socket in self.clients.keys() {
            if socket != sender {
                socket.deliver(event);
            }
        }
    }

    fn connections_mut(&mut self, socket: &S) -> &mut HashSet<ConnectionId> {
        self.clients.entry(socket.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A peer that records everything delivered to it.
    #[derive(Debug, Clone)]
    struct TestPeer {
        id: u32,
        received: Rc<RefCell<Vec<SocketEvent>>>,
    }

    impl TestPeer {
        fn new(id: u32) -> Self {
            Self {
                id,
                received: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn received(&self) -> Vec<SocketEvent> {
            self.received.borrow().clone()
        }
    }

    impl PartialEq for TestPeer {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for TestPeer {}

    impl Hash for TestPeer {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl PeerSink for TestPeer {
        fn deliver(&self, event: &SocketEvent) {
            self.received.borrow_mut().push(event.clone());
        }
    }

    fn t(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn open_three() -> (PushSignaling<TestPeer>, TestPeer, TestPeer, TestPeer) {
        let mut signaling = PushSignaling::new();
        let a = TestPeer::new(1);
        let b = TestPeer::new(2);
        let c = TestPeer::new(3);
        signaling.on_open(a.clone());
        signaling.on_open(b.clone());
        signaling.on_open(c.clone());
        (signaling, a, b, c)
    }

    #[test]
    fn connect_is_acknowledged_to_the_caller_only() {
        let (mut signaling, a, b, _) = open_three();
        signaling.on_connect(&a, ConnectionId::new("c1"));

        assert_eq!(
            a.received(),
            vec![SocketEvent::Connect {
                connection_id: ConnectionId::new("c1"),
                polite: true,
            }]
        );
        assert!(b.received().is_empty());
    }

    #[test]
    fn offers_flood_every_other_socket() {
        let (mut signaling, a, b, c) = open_three();
        signaling.on_offer(&a, ConnectionId::new("c1"), "hello sdp".into(), t(100));

        let expected = SocketEvent::Offer {
            from: ConnectionId::new("c1"),
            to: String::new(),
            data: Offer::new("hello sdp", t(100)),
        };
        assert!(a.received().is_empty());
        assert_eq!(b.received(), vec![expected.clone()]);
        assert_eq!(c.received(), vec![expected]);
    }

    #[test]
    fn answers_target_the_offerer_only() {
        let (mut signaling, a, b, c) = open_three();
        signaling.on_offer(&a, ConnectionId::new("c1"), "offer".into(), t(1));
        signaling.on_answer(&b, ConnectionId::new("c1"), "answer".into(), t(2));

        let answers: Vec<SocketEvent> = a
            .received()
            .into_iter()
            .filter(|event| matches!(event, SocketEvent::Answer { .. }))
            .collect();
        assert_eq!(
            answers,
            vec![SocketEvent::Answer {
                from: ConnectionId::new("c1"),
                to: String::new(),
                data: Answer::new("answer", t(2)),
            }]
        );
        // The third socket saw the offer but must not see the answer.
        assert!(!c
            .received()
            .iter()
            .any(|event| matches!(event, SocketEvent::Answer { .. })));
    }

    #[test]
    fn candidates_flood_like_offers_not_like_answers() {
        // Pinned on purpose: a strict 1:1 relay would target the paired
        // peer, but the contract floods candidates to every other socket.
        let (mut signaling, a, b, c) = open_three();
        signaling.on_offer(&a, ConnectionId::new("c1"), "offer".into(), t(1));
        signaling.on_answer(&b, ConnectionId::new("c1"), "answer".into(), t(2));

        signaling.on_candidate(
            &a,
            CandidatePayload {
                connection_id: ConnectionId::new("c1"),
                candidate: "cand".into(),
                sdp_m_line_index: 0,
                sdp_mid: "0".into(),
            },
            t(3),
        );

        let saw_candidate = |peer: &TestPeer| {
            peer.received()
                .iter()
                .any(|event| matches!(event, SocketEvent::Candidate { .. }))
        };
        assert!(!saw_candidate(&a));
        assert!(saw_candidate(&b));
        assert!(saw_candidate(&c), "flood reaches unpaired sockets too");
    }

    #[test]
    fn answer_without_a_pairing_is_dropped() {
        let (mut signaling, a, b, _) = open_three();
        signaling.on_answer(&b, ConnectionId::new("c1"), "answer".into(), t(1));

        assert!(a.received().is_empty());
        assert!(b.received().is_empty());
    }

    #[test]
    fn disconnect_notifies_the_peer_and_echoes_to_the_caller() {
        let (mut signaling, a, b, _) = open_three();
        signaling.on_offer(&a, ConnectionId::new("c1"), "offer".into(), t(1));
        signaling.on_answer(&b, ConnectionId::new("c1"), "answer".into(), t(2));

        signaling.on_disconnect(&b, ConnectionId::new("c1"));

        let disconnect = SocketEvent::Disconnect {
            connection_id: ConnectionId::new("c1"),
        };
        assert!(a.received().contains(&disconnect));
        assert!(b.received().contains(&disconnect));
    }

    #[test]
    fn socket_close_notifies_paired_counterparts() {
        let (mut signaling, a, b, c) = open_three();
        signaling.on_offer(&a, ConnectionId::new("c1"), "offer".into(), t(1));
        signaling.on_answer(&b, ConnectionId::new("c1"), "answer".into(), t(2));

        signaling.on_close(&a);

        assert!(b.received().contains(&SocketEvent::Disconnect {
            connection_id: ConnectionId::new("c1"),
        }));
        assert!(!c
            .received()
            .iter()
            .any(|event| matches!(event, SocketEvent::Disconnect { .. })));
        assert_eq!(signaling.socket_count(), 2);
    }

    #[test]
    fn close_of_unpaired_socket_is_quiet() {
        let (mut signaling, a, b, _) = open_three();
        signaling.on_connect(&a, ConnectionId::new("c1"));
        signaling.on_close(&a);

        assert!(b.received().is_empty());
    }
}
