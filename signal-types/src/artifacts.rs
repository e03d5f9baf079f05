//! Handshake artifacts exchanged through the relay.
//!
//! These are immutable-after-construction value records. The relay stores
//! and forwards them without inspecting the SDP or candidate strings.

use crate::{ConnectionId, Timestamp};
use serde::{Deserialize, Serialize};

/// A session description offer posted by the initiating peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// SDP payload describing the offered session.
    pub sdp: String,
    /// When the offer was posted.
    pub date_time: Timestamp,
    /// Perfect-negotiation politeness flag. Always false for offers created
    /// by this relay; carried for forward compatibility.
    pub polite: bool,
}

impl Offer {
    /// Create an offer stamped at `date_time`.
    pub fn new(sdp: impl Into<String>, date_time: Timestamp) -> Self {
        Self {
            sdp: sdp.into(),
            date_time,
            polite: false,
        }
    }
}

/// A session description answer completing a pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// SDP payload describing the answered session.
    pub sdp: String,
    /// When the answer was posted.
    pub date_time: Timestamp,
}

impl Answer {
    /// Create an answer stamped at `date_time`.
    pub fn new(sdp: impl Into<String>, date_time: Timestamp) -> Self {
        Self {
            sdp: sdp.into(),
            date_time,
        }
    }
}

/// A trickled ICE candidate, one of possibly many per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The candidate line.
    pub candidate: String,
    /// Index of the media description this candidate belongs to.
    pub sdp_m_line_index: u32,
    /// Identifier of the media stream the candidate is associated with.
    pub sdp_mid: String,
    /// When the candidate was posted. Refreshed when an answer completes
    /// the pairing, so earlier trickle stays visible to the answering side.
    pub date_time: Timestamp,
}

impl Candidate {
    /// Create a candidate stamped at `date_time`.
    pub fn new(
        candidate: impl Into<String>,
        sdp_m_line_index: u32,
        sdp_mid: impl Into<String>,
        date_time: Timestamp,
    ) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_m_line_index,
            sdp_mid: sdp_mid.into(),
            date_time,
        }
    }
}

/// A record that a peer's session vanished while a pairing was live.
///
/// Appended to the surviving session's log so a polling client can observe
/// the loss as a synthetic disconnect event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disconnection {
    /// The connection whose counterpart disappeared.
    pub connection_id: ConnectionId,
    /// When the counterpart was removed.
    pub date_time: Timestamp,
}
