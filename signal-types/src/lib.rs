//! # signal-types
//!
//! Wire format types for the WebRTC signaling relay.
//!
//! This crate provides the foundational types used across the relay crates:
//! - [`SessionId`], [`ConnectionId`], [`Timestamp`] - identity and ordering types
//! - [`Offer`], [`Answer`], [`Candidate`], [`Disconnection`] - handshake artifacts
//! - [`SignalMessage`] - the pull-transport event envelope
//! - [`SocketRequest`], [`SocketEvent`] - the push-transport message pair
//! - [`SignalError`] - error types
//!
//! Everything serializes as camelCase JSON, matching the JavaScript peers
//! this protocol talks to.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod artifacts;
mod error;
mod ids;
mod messages;

pub use artifacts::{Answer, Candidate, Disconnection, Offer};
pub use error::{SignalError, SignalResult};
pub use ids::{ConnectionId, SessionId, Timestamp};
pub use messages::{
    AnswerPayload, CandidatePayload, OfferPayload, SignalMessage, SocketEvent, SocketRequest,
};
