//! Pull-transport operations: cursor-filtered views over the registry.
//!
//! Polling clients pass a `fromTime` cursor and receive every event strictly
//! newer than it. Reads that include a connection list run the staleness
//! sweep first.

use crate::pair::Pair;
use crate::registry::Registry;
use signal_types::{
    Answer, Candidate, ConnectionId, Offer, SessionId, SignalMessage, SignalResult, Timestamp,
};

impl Registry {
    /// Register a connection and return its `connect` envelope.
    pub fn create_connection(
        &mut self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        now: Timestamp,
    ) -> SignalResult<SignalMessage> {
        self.register_connection(session_id, connection_id.clone())?;
        Ok(SignalMessage::Connect {
            connection_id,
            date_time: now,
        })
    }

    /// The caller's own connections, each stamped with the current time.
    ///
    /// The timestamp reports liveness, not creation order: a connection is
    /// "current as of this poll". Stale peers are reaped before the list is
    /// read.
    pub fn list_connections(
        &mut self,
        session_id: &SessionId,
        now: Timestamp,
    ) -> SignalResult<Vec<SignalMessage>> {
        self.sweep(session_id, now);
        let entry = self.entry(session_id)?;
        Ok(entry
            .connections
            .iter()
            .cloned()
            .map(|connection_id| SignalMessage::Connect {
                connection_id,
                date_time: now,
            })
            .collect())
    }

    /// Store an offer and (re)install the pending pairing for its
    /// connection. Last writer wins; there is no conflict detection.
    pub fn post_offer(
        &mut self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        sdp: String,
        now: Timestamp,
    ) -> SignalResult<()> {
        let entry = self.entry_mut(session_id)?;
        entry
            .offers
            .insert(connection_id.clone(), Offer::new(sdp, now));
        self.pairs
            .insert(connection_id, Pair::pending(session_id.clone()));
        Ok(())
    }

    /// Offers posted by any *other* session, newer than `from_time`.
    ///
    /// A session answers offers made by others; its own offers are never
    /// echoed back.
    pub fn get_offers(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> SignalResult<Vec<SignalMessage>> {
        self.entry(session_id)?;
        let mut offers = Vec::new();
        for (owner, entry) in &self.sessions {
            if owner == session_id {
                continue;
            }
            for (connection_id, offer) in &entry.offers {
                if offer.date_time > from_time {
                    offers.push(SignalMessage::Offer {
                        connection_id: connection_id.clone(),
                        sdp: offer.sdp.clone(),
                        polite: offer.polite,
                        date_time: offer.date_time,
                    });
                }
            }
        }
        Ok(offers)
    }

    /// Answer an offer, completing its pairing.
    ///
    /// The connection is registered on the answering session. An answer with
    /// no pairing is tolerated as a silent success (it may simply have
    /// raced the offer). Otherwise the answer lands in the *offerer's*
    /// store, where that session polls for it, and the offerer's earlier
    /// candidates are restamped so the answerer's next candidate poll sees
    /// them.
    pub fn post_answer(
        &mut self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        sdp: String,
        now: Timestamp,
    ) -> SignalResult<()> {
        self.register_connection(session_id, connection_id.clone())?;

        let Some(pair) = self.pairs.get(&connection_id) else {
            return Ok(());
        };
        let Some(offerer) = pair.counterpart(session_id).cloned() else {
            return Ok(());
        };

        self.pairs.insert(
            connection_id.clone(),
            Pair::complete(offerer.clone(), session_id.clone()),
        );

        let Some(peer) = self.sessions.get_mut(&offerer) else {
            return Ok(());
        };
        peer.answers
            .insert(connection_id.clone(), Answer::new(sdp, now));
        if let Some(candidates) = peer.candidates.get_mut(&connection_id) {
            for candidate in candidates {
                candidate.date_time = now;
            }
        }
        Ok(())
    }

    /// Answers to offers this session posted, newer than `from_time`.
    pub fn get_answers(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> SignalResult<Vec<SignalMessage>> {
        let entry = self.entry(session_id)?;
        Ok(entry
            .answers
            .iter()
            .filter(|(_, answer)| answer.date_time > from_time)
            .map(|(connection_id, answer)| SignalMessage::Answer {
                connection_id: connection_id.clone(),
                sdp: answer.sdp.clone(),
                date_time: answer.date_time,
            })
            .collect())
    }

    /// Append a candidate to the caller's trickle sequence for a connection.
    pub fn post_candidate(
        &mut self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        candidate: Candidate,
    ) -> SignalResult<()> {
        let entry = self.entry_mut(session_id)?;
        entry
            .candidates
            .entry(connection_id)
            .or_default()
            .push(candidate);
        Ok(())
    }

    /// The paired peer's candidates for each of the caller's completed
    /// pairings, newer than `from_time`, in posting order.
    ///
    /// Clients read their peer's trickle, never their own.
    pub fn get_candidates(
        &self,
        session_id: &SessionId,
        from_time: Timestamp,
    ) -> SignalResult<Vec<SignalMessage>> {
        let entry = self.entry(session_id)?;
        let mut messages = Vec::new();
        for connection_id in &entry.connections {
            let Some(pair) = self.pairs.get(connection_id) else {
                continue;
            };
            if !pair.is_complete() {
                continue;
            }
            let Some(peer_id) = pair.counterpart(session_id) else {
                continue;
            };
            let Some(peer) = self.sessions.get(peer_id) else {
                continue;
            };
            let Some(candidates) = peer.candidates.get(connection_id) else {
                continue;
            };
            for candidate in candidates {
                if candidate.date_time > from_time {
                    messages.push(SignalMessage::Candidate {
                        connection_id: connection_id.clone(),
                        candidate: candidate.candidate.clone(),
                        sdp_m_line_index: candidate.sdp_m_line_index,
                        sdp_mid: candidate.sdp_mid.clone(),
                        date_time: candidate.date_time,
                    });
                }
            }
        }
        Ok(messages)
    }

    /// Everything that happened since `from_time`, merged and sorted
    /// ascending by timestamp. The canonical polling endpoint.
    pub fn get_all(
        &mut self,
        session_id: &SessionId,
        from_time: Timestamp,
        now: Timestamp,
    ) -> SignalResult<Vec<SignalMessage>> {
        self.sweep(session_id, now);

        let entry = self.entry(session_id)?;
        let mut messages: Vec<SignalMessage> = entry
            .connections
            .iter()
            .cloned()
            .map(|connection_id| SignalMessage::Connect {
                connection_id,
                date_time: now,
            })
            .collect();
        messages.extend(
            entry
                .disconnections
                .iter()
                .filter(|record| record.date_time > from_time)
                .map(|record| SignalMessage::Disconnect {
                    connection_id: record.connection_id.clone(),
                    date_time: record.date_time,
                }),
        );

        messages.extend(self.get_offers(session_id, from_time)?);
        messages.extend(self.get_answers(session_id, from_time)?);
        messages.extend(self.get_candidates(session_id, from_time)?);

        // Stable sort: ties keep insertion order.
        messages.sort_by_key(|message| message.date_time());
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_types::SignalError;

    fn t(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn two_sessions(registry: &mut Registry) -> (SessionId, SessionId) {
        let s1 = registry.create_session(Some(SessionId::new("session 1")), t(0));
        let s2 = registry.create_session(Some(SessionId::new("session 2")), t(0));
        (s1, s2)
    }

    #[test]
    fn create_connection_returns_connect_envelope() {
        let mut registry = Registry::new();
        let (s1, _) = two_sessions(&mut registry);

        let message = registry
            .create_connection(&s1, ConnectionId::new("c1"), t(10))
            .unwrap();
        assert_eq!(
            message,
            SignalMessage::Connect {
                connection_id: ConnectionId::new("c1"),
                date_time: t(10),
            }
        );
    }

    #[test]
    fn operations_require_a_known_session() {
        let mut registry = Registry::new();
        let ghost = SessionId::new("ghost");
        let err = registry
            .create_connection(&ghost, ConnectionId::new("c1"), t(0))
            .unwrap_err();
        assert!(matches!(err, SignalError::SessionNotFound { .. }));
        assert!(registry.get_offers(&ghost, t(0)).is_err());
        assert!(registry.get_all(&ghost, t(0), t(0)).is_err());
    }

    #[test]
    fn offers_are_visible_to_others_never_to_the_poster() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        registry
            .post_offer(&s1, ConnectionId::new("c1"), "hello sdp".into(), t(100))
            .unwrap();

        assert!(registry.get_offers(&s1, t(0)).unwrap().is_empty());

        let offers = registry.get_offers(&s2, t(0)).unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(
            offers[0],
            SignalMessage::Offer {
                connection_id: ConnectionId::new("c1"),
                sdp: "hello sdp".into(),
                polite: false,
                date_time: t(100),
            }
        );
    }

    #[test]
    fn offers_respect_the_cursor() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        registry
            .post_offer(&s1, ConnectionId::new("c1"), "x".into(), t(100))
            .unwrap();

        assert_eq!(registry.get_offers(&s2, t(99)).unwrap().len(), 1);
        // The cursor is strict: an event at exactly fromTime is old news.
        assert!(registry.get_offers(&s2, t(100)).unwrap().is_empty());
    }

    #[test]
    fn answer_completes_the_pairing_and_reaches_the_offerer() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");

        registry.post_offer(&s1, c1.clone(), "x".into(), t(1)).unwrap();
        registry
            .post_answer(&s2, c1.clone(), "y".into(), t(2))
            .unwrap();

        let answers = registry.get_answers(&s1, t(0)).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(
            answers[0],
            SignalMessage::Answer {
                connection_id: c1.clone(),
                sdp: "y".into(),
                date_time: t(2),
            }
        );

        // Answers are not visible to their poster.
        assert!(registry.get_answers(&s2, t(0)).unwrap().is_empty());

        let pair = registry.pairs.get(&c1).unwrap();
        assert!(pair.is_complete());
        assert_eq!(pair.offerer(), &s1);
        assert_eq!(pair.answerer(), Some(&s2));
    }

    #[test]
    fn answer_without_an_offer_is_a_silent_success() {
        let mut registry = Registry::new();
        let (_, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");

        registry
            .post_answer(&s2, c1.clone(), "y".into(), t(2))
            .unwrap();

        // The connection is still registered on the answerer.
        assert!(registry.entry(&s2).unwrap().connections.contains(&c1));
        assert!(!registry.pairs.contains_key(&c1));
    }

    #[test]
    fn candidates_trickle_in_order_and_respect_the_cursor() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");

        registry.post_offer(&s1, c1.clone(), "x".into(), t(1)).unwrap();
        registry
            .post_candidate(&s1, c1.clone(), Candidate::new("cand 1", 0, "0", t(10)))
            .unwrap();
        registry
            .post_candidate(&s1, c1.clone(), Candidate::new("cand 2", 0, "0", t(20)))
            .unwrap();
        registry
            .post_answer(&s2, c1.clone(), "y".into(), t(5))
            .unwrap();

        // t(5) restamped both candidates; repost to restore distinct times.
        registry
            .post_candidate(&s1, c1.clone(), Candidate::new("cand 3", 0, "0", t(30)))
            .unwrap();

        let all = registry.get_candidates(&s2, t(0)).unwrap();
        let lines: Vec<&str> = all
            .iter()
            .map(|message| match message {
                SignalMessage::Candidate { candidate, .. } => candidate.as_str(),
                other => panic!("unexpected message: {other:?}"),
            })
            .collect();
        assert_eq!(lines, ["cand 1", "cand 2", "cand 3"]);

        // A cursor between the restamp and the last post keeps only the tail.
        let tail = registry.get_candidates(&s2, t(5)).unwrap();
        assert_eq!(tail.len(), 1);

        // The poster never reads back its own trickle.
        assert!(registry.get_candidates(&s1, t(0)).unwrap().is_empty());
    }

    #[test]
    fn answer_restamps_earlier_candidates() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");

        registry.post_offer(&s1, c1.clone(), "x".into(), t(1)).unwrap();
        registry
            .post_candidate(&s1, c1.clone(), Candidate::new("early", 0, "0", t(2)))
            .unwrap();
        registry
            .post_answer(&s2, c1.clone(), "y".into(), t(50))
            .unwrap();

        // The answerer polls from a cursor past the original post time and
        // still sees the candidate: the answer re-exposed it.
        let candidates = registry.get_candidates(&s2, t(10)).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].date_time(), t(50));
    }

    #[test]
    fn candidates_require_a_completed_pairing() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");

        registry.register_connection(&s2, c1.clone()).unwrap();
        registry.post_offer(&s1, c1.clone(), "x".into(), t(1)).unwrap();
        registry
            .post_candidate(&s1, c1.clone(), Candidate::new("early", 0, "0", t(2)))
            .unwrap();

        // Pairing still pending: nothing to read yet.
        assert!(registry.get_candidates(&s2, t(0)).unwrap().is_empty());
    }

    #[test]
    fn list_connections_stamps_the_poll_time() {
        let mut registry = Registry::new();
        let (s1, _) = two_sessions(&mut registry);
        registry
            .register_connection(&s1, ConnectionId::new("c1"))
            .unwrap();

        let connections = registry.list_connections(&s1, t(777)).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].date_time(), t(777));
    }

    #[test]
    fn get_all_merges_and_sorts_by_time() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");
        let c2 = ConnectionId::new("c2");

        registry.post_offer(&s1, c2.clone(), "later".into(), t(40)).unwrap();
        registry.post_offer(&s1, c1.clone(), "x".into(), t(10)).unwrap();
        registry
            .post_answer(&s2, c1.clone(), "y".into(), t(20))
            .unwrap();
        registry
            .post_candidate(&s1, c1.clone(), Candidate::new("cand", 0, "0", t(30)))
            .unwrap();

        let messages = registry.get_all(&s2, t(0), t(100)).unwrap();
        let times: Vec<u64> = messages
            .iter()
            .map(|message| message.date_time().millis())
            .collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);

        // Offers from s1, own connection stamped `now`, and the candidate.
        assert!(messages
            .iter()
            .any(|m| matches!(m, SignalMessage::Offer { date_time, .. } if *date_time == t(10))));
        assert!(messages
            .iter()
            .any(|m| matches!(m, SignalMessage::Candidate { .. })));
        assert!(messages
            .iter()
            .any(|m| matches!(m, SignalMessage::Connect { date_time, .. } if *date_time == t(100))));
    }

    #[test]
    fn get_all_reports_disconnections_after_a_reap() {
        let mut registry = Registry::new();
        let (s1, s2) = two_sessions(&mut registry);
        let c1 = ConnectionId::new("c1");

        registry.register_connection(&s1, c1.clone()).unwrap();
        registry.post_offer(&s1, c1.clone(), "x".into(), t(1)).unwrap();
        registry
            .post_answer(&s2, c1.clone(), "y".into(), t(2))
            .unwrap();

        // s2 never polls again; s1's next getAll reaps it and reports the loss.
        registry.touch(&s1, t(30_000)).unwrap();
        let messages = registry.get_all(&s1, t(0), t(30_000)).unwrap();
        assert!(messages.iter().any(|m| matches!(
            m,
            SignalMessage::Disconnect { connection_id, .. } if *connection_id == c1
        )));
        assert!(!registry.contains_session(&s2));
    }

    #[test]
    fn round_trip_offer_answer_teardown() {
        let mut registry = Registry::new();
        let a = registry.create_session(Some(SessionId::new("A")), t(0));
        let b = registry.create_session(Some(SessionId::new("B")), t(0));
        let c1 = ConnectionId::new("c1");
        let c2 = ConnectionId::new("c2");

        registry.create_connection(&a, c1.clone(), t(1)).unwrap();
        registry.create_connection(&b, c2.clone(), t(1)).unwrap();

        registry.post_offer(&a, c1.clone(), "x".into(), t(2)).unwrap();
        let offers = registry.get_offers(&b, t(0)).unwrap();
        assert_eq!(
            offers,
            vec![SignalMessage::Offer {
                connection_id: c1.clone(),
                sdp: "x".into(),
                polite: false,
                date_time: t(2),
            }]
        );

        registry.post_answer(&b, c1.clone(), "y".into(), t(3)).unwrap();
        let answers = registry.get_answers(&a, t(0)).unwrap();
        assert_eq!(
            answers,
            vec![SignalMessage::Answer {
                connection_id: c1.clone(),
                sdp: "y".into(),
                date_time: t(3),
            }]
        );

        registry.delete_connection(&b, &c1).unwrap();
        assert!(!registry.entry(&a).unwrap().connections.contains(&c1));

        registry.delete_session(&a, t(4));
        registry.delete_session(&b, t(4));
        assert_eq!(registry.session_count(), 0);
        assert!(registry.pairs.is_empty());
    }
}
