//! # Negotiation Round Routes
//!
//! The responder's accept/decline surface.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sidepot_core::NegotiationId;
use sidepot_negotiation::{ChallengeStatus, ChallengeTerms, Negotiation};

use crate::error::AppError;
use crate::routes::caller;
use crate::state::AppState;

/// Body for `POST /v1/negotiations/{id}/accept`.
#[derive(Debug, Default, Deserialize)]
pub struct AcceptRequest {
    /// When true the challenge goes straight to `ACCEPTED` and the
    /// responder's deposit is taken; otherwise it returns to `PENDING`
    /// for the normal acceptance flow.
    #[serde(default)]
    pub finalize: bool,
}

/// Response for an accepted round.
#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    /// The challenge terms now in force.
    pub new_terms: ChallengeTerms,
    /// The challenge status after acceptance.
    pub challenge_status: ChallengeStatus,
    /// The resolved round.
    pub negotiation: Negotiation,
}

/// Body for `POST /v1/negotiations/{id}/decline`.
#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    /// Optional human-readable reason.
    pub reason: Option<String>,
}

/// Response for a declined round.
#[derive(Debug, Serialize)]
pub struct DeclineResponse {
    /// The challenge status after the decline.
    pub challenge_status: ChallengeStatus,
    /// The resolved round.
    pub negotiation: Negotiation,
}

/// `POST /v1/negotiations/{id}/accept`.
pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AcceptRequest>,
) -> Result<Json<AcceptResponse>, AppError> {
    let responder = caller(&headers)?;
    let outcome = state
        .negotiation
        .accept(&NegotiationId::from_uuid(id), responder, body.finalize)
        .await?;
    Ok(Json(AcceptResponse {
        new_terms: outcome.new_terms,
        challenge_status: outcome.challenge_status,
        negotiation: outcome.negotiation,
    }))
}

/// `POST /v1/negotiations/{id}/decline`.
pub async fn decline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<DeclineRequest>,
) -> Result<Json<DeclineResponse>, AppError> {
    let responder = caller(&headers)?;
    let outcome = state
        .negotiation
        .decline(&NegotiationId::from_uuid(id), responder, body.reason)
        .await?;
    Ok(Json(DeclineResponse {
        challenge_status: outcome.challenge_status,
        negotiation: outcome.negotiation,
    }))
}
