//! Polling-transport handlers.
//!
//! Session identity arrives in the `session-id` header; the polling cursor
//! in the `fromtime` query parameter. Every route except session creation
//! authenticates by touching the session, which doubles as the liveness
//! signal the staleness sweep reads.

use crate::error::ApiError;
use crate::server::SignalRelay;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use signal_types::{
    AnswerPayload, Candidate, CandidatePayload, ConnectionId, OfferPayload, SessionId,
    SignalError, SignalMessage, Timestamp,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const SESSION_HEADER: &str = "session-id";

/// Polling cursor: events strictly newer than this are returned.
#[derive(Debug, Default, Deserialize)]
pub struct TimeQuery {
    #[serde(default)]
    fromtime: u64,
}

impl TimeQuery {
    fn cursor(&self) -> Timestamp {
        Timestamp::from_millis(self.fromtime)
    }
}

/// Body of a connection create/delete request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionBody {
    connection_id: Option<ConnectionId>,
}

impl ConnectionBody {
    fn require(self) -> Result<ConnectionId, ApiError> {
        self.connection_id.ok_or(ApiError::Signal(SignalError::MissingField {
            field: "connectionId",
        }))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    session_id: SessionId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDeleted {
    connection_id: ConnectionId,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    connections: Vec<SignalMessage>,
}

#[derive(Debug, Serialize)]
pub struct OffersResponse {
    offers: Vec<SignalMessage>,
}

#[derive(Debug, Serialize)]
pub struct AnswersResponse {
    answers: Vec<SignalMessage>,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    candidates: Vec<SignalMessage>,
}

#[derive(Debug, Serialize)]
pub struct AllMessagesResponse {
    messages: Vec<SignalMessage>,
}

fn session_id(headers: &HeaderMap) -> Result<SessionId, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(SessionId::from)
        .ok_or(ApiError::MissingSessionId)
}

/// `PUT /signaling`: register a session.
///
/// A `session-id` header is honored (re-registration resets that session);
/// otherwise a fresh identifier is generated and returned.
pub async fn create_session(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
) -> Json<SessionResponse> {
    let requested = session_id(&headers).ok();
    let now = Timestamp::now();
    let session_id = relay.registry().lock().await.create_session(requested, now);
    relay
        .metrics()
        .sessions_created
        .fetch_add(1, Ordering::Relaxed);
    Json(SessionResponse { session_id })
}

/// `DELETE /signaling`: remove a session and everything it holds.
pub async fn delete_session(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    registry.delete_session(&session_id, now);
    Ok(Json(SessionResponse { session_id }))
}

/// `GET /signaling?fromtime=`: everything since the cursor, merged.
pub async fn get_all(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Query(query): Query<TimeQuery>,
) -> Result<Json<AllMessagesResponse>, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let messages = registry.get_all(&session_id, query.cursor(), now)?;
    Ok(Json(AllMessagesResponse { messages }))
}

/// `PUT /signaling/connection`: register a connection identifier.
pub async fn create_connection(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Json(body): Json<ConnectionBody>,
) -> Result<Json<SignalMessage>, ApiError> {
    let session_id = session_id(&headers)?;
    let connection_id = body.require()?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let message = registry.create_connection(&session_id, connection_id, now)?;
    Ok(Json(message))
}

/// `DELETE /signaling/connection`: tear a connection down on both sides.
pub async fn delete_connection(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Json(body): Json<ConnectionBody>,
) -> Result<Json<ConnectionDeleted>, ApiError> {
    let session_id = session_id(&headers)?;
    let connection_id = body.require()?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    registry.delete_connection(&session_id, &connection_id)?;
    Ok(Json(ConnectionDeleted { connection_id }))
}

/// `GET /signaling/connection`: the caller's live connections.
pub async fn list_connections(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
) -> Result<Json<ConnectionsResponse>, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let connections = registry.list_connections(&session_id, now)?;
    Ok(Json(ConnectionsResponse { connections }))
}

/// `POST /signaling/offer`: post an offer for others to answer.
pub async fn post_offer(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Json(body): Json<OfferPayload>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    registry.post_offer(&session_id, body.connection_id, body.sdp, now)?;
    relay.metrics().offers_total.fetch_add(1, Ordering::Relaxed);
    Ok(StatusCode::OK)
}

/// `GET /signaling/offer?fromtime=`: offers posted by other sessions.
pub async fn get_offers(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Query(query): Query<TimeQuery>,
) -> Result<Json<OffersResponse>, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let offers = registry.get_offers(&session_id, query.cursor())?;
    Ok(Json(OffersResponse { offers }))
}

/// `POST /signaling/answer`: answer an offer, completing the pairing.
pub async fn post_answer(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Json(body): Json<AnswerPayload>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    registry.post_answer(&session_id, body.connection_id, body.sdp, now)?;
    relay.metrics().answers_total.fetch_add(1, Ordering::Relaxed);
    Ok(StatusCode::OK)
}

/// `GET /signaling/answer?fromtime=`: answers to the caller's offers.
pub async fn get_answers(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Query(query): Query<TimeQuery>,
) -> Result<Json<AnswersResponse>, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let answers = registry.get_answers(&session_id, query.cursor())?;
    Ok(Json(AnswersResponse { answers }))
}

/// `POST /signaling/candidate`: append to the caller's trickle sequence.
pub async fn post_candidate(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Json(body): Json<CandidatePayload>,
) -> Result<StatusCode, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let candidate = Candidate::new(body.candidate, body.sdp_m_line_index, body.sdp_mid, now);
    registry.post_candidate(&session_id, body.connection_id, candidate)?;
    relay
        .metrics()
        .candidates_total
        .fetch_add(1, Ordering::Relaxed);
    Ok(StatusCode::OK)
}

/// `GET /signaling/candidate?fromtime=`: the paired peers' trickle.
pub async fn get_candidates(
    Extension(relay): Extension<Arc<SignalRelay>>,
    headers: HeaderMap,
    Query(query): Query<TimeQuery>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let session_id = session_id(&headers)?;
    let now = Timestamp::now();
    let mut registry = relay.registry().lock().await;
    registry.touch(&session_id, now)?;
    let candidates = registry.get_candidates(&session_id, query.cursor())?;
    Ok(Json(CandidatesResponse { candidates }))
}
