//! Protocol messages for both signaling transports.
//!
//! The pull transport wraps every event in a [`SignalMessage`] envelope with
//! a `type` discriminator and a `dateTime` polling cursor. The push transport
//! exchanges [`SocketRequest`] (client to relay) and [`SocketEvent`] (relay
//! to client) frames with no cursor.

use crate::{Answer, Candidate, ConnectionId, Offer, Timestamp};
use serde::{Deserialize, Serialize};

/// One event in a polling response, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    /// A connection currently registered on the queried session.
    Connect {
        /// The registered connection.
        connection_id: ConnectionId,
        /// Time of the poll, not of creation: this reports liveness.
        date_time: Timestamp,
    },
    /// An offer posted by another session, awaiting an answer.
    Offer {
        /// The connection the offer names.
        connection_id: ConnectionId,
        /// Offered session description.
        sdp: String,
        /// Perfect-negotiation politeness flag.
        polite: bool,
        /// When the offer was posted.
        date_time: Timestamp,
    },
    /// An answer to an offer this session posted.
    Answer {
        /// The connection the answer names.
        connection_id: ConnectionId,
        /// Answered session description.
        sdp: String,
        /// When the answer was posted.
        date_time: Timestamp,
    },
    /// An ICE candidate trickled by the paired peer.
    Candidate {
        /// The connection the candidate belongs to.
        connection_id: ConnectionId,
        /// The candidate line.
        candidate: String,
        /// Index of the media description this candidate belongs to.
        sdp_m_line_index: u32,
        /// Identifier of the associated media stream.
        sdp_mid: String,
        /// When the candidate was posted (or re-exposed by an answer).
        date_time: Timestamp,
    },
    /// A peer session vanished while paired with this one.
    Disconnect {
        /// The connection whose counterpart disappeared.
        connection_id: ConnectionId,
        /// When the counterpart was removed.
        date_time: Timestamp,
    },
}

impl SignalMessage {
    /// The event's timestamp, used for cursor filtering and merge ordering.
    pub fn date_time(&self) -> Timestamp {
        match self {
            SignalMessage::Connect { date_time, .. }
            | SignalMessage::Offer { date_time, .. }
            | SignalMessage::Answer { date_time, .. }
            | SignalMessage::Candidate { date_time, .. }
            | SignalMessage::Disconnect { date_time, .. } => *date_time,
        }
    }
}

/// Body of an offer post: the connection being offered and its SDP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    /// The connection the offer names.
    pub connection_id: ConnectionId,
    /// Offered session description.
    pub sdp: String,
}

/// Body of an answer post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    /// The connection the answer names.
    pub connection_id: ConnectionId,
    /// Answered session description.
    pub sdp: String,
}

/// Body of a candidate post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePayload {
    /// The connection the candidate belongs to.
    pub connection_id: ConnectionId,
    /// The candidate line.
    pub candidate: String,
    /// Index of the media description this candidate belongs to.
    pub sdp_m_line_index: u32,
    /// Identifier of the associated media stream.
    pub sdp_mid: String,
}

/// A frame received from a connected socket, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SocketRequest {
    /// Claim a connection identifier.
    Connect {
        /// The connection being claimed.
        connection_id: ConnectionId,
    },
    /// Release a connection identifier.
    Disconnect {
        /// The connection being released.
        connection_id: ConnectionId,
    },
    /// Post an offer for relay.
    Offer {
        /// The offer payload.
        data: OfferPayload,
    },
    /// Post an answer for relay.
    Answer {
        /// The answer payload.
        data: AnswerPayload,
    },
    /// Post a candidate for relay.
    Candidate {
        /// The candidate payload.
        data: CandidatePayload,
    },
}

/// A frame delivered to a connected socket, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SocketEvent {
    /// Acknowledgement of a connect request, echoed to the caller only.
    Connect {
        /// The claimed connection.
        connection_id: ConnectionId,
        /// Always true: the socket transport assigns politeness to the
        /// connecting side.
        polite: bool,
    },
    /// A connection was released, by request or by socket closure.
    Disconnect {
        /// The released connection.
        connection_id: ConnectionId,
    },
    /// An offer relayed from another peer (flooded to all other sockets).
    Offer {
        /// Connection the offer names.
        from: ConnectionId,
        /// Unused targeting field, kept empty on the wire.
        to: String,
        /// The offer artifact.
        data: Offer,
    },
    /// An answer relayed to the offering peer (targeted).
    Answer {
        /// Connection the answer names.
        from: ConnectionId,
        /// Unused targeting field, kept empty on the wire.
        to: String,
        /// The answer artifact.
        data: Answer,
    },
    /// A candidate relayed from another peer (flooded to all other sockets).
    Candidate {
        /// Connection the candidate belongs to.
        from: ConnectionId,
        /// Unused targeting field, kept empty on the wire.
        to: String,
        /// The candidate artifact.
        data: Candidate,
    },
}
