//! # signal-core
//!
//! Pure logic for the WebRTC signaling relay (no I/O, instant tests).
//!
//! This crate implements the session/connection registry and the pairing
//! state machine shared by both transports, without any network I/O:
//! - [`Registry`] - sessions, pairing table, artifact stores, staleness sweep,
//!   and the cursor-filtered polling operations
//! - [`PushSignaling`] - the socket-transport state machine, generic over a
//!   [`PeerSink`] delivery seam so tests run against a recording mock
//! - [`Pair`] - the two-slot relation linking both legs of a connection
//!
//! ## Design Philosophy
//!
//! Every operation takes the current time as an explicit [`signal_types::Timestamp`]
//! argument. The clock lives with the caller, so state transitions are
//! deterministic and staleness tests never sleep.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pair;
mod poll;
pub mod push;
pub mod registry;

pub use pair::Pair;
pub use push::{PeerSink, PushSignaling};
pub use registry::{Registry, DEFAULT_STALE_TIMEOUT_MS};
