//! # Challenge Routes
//!
//! Creation, retrieval, and the negotiation sub-resources of a challenge.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use sidepot_core::{ChallengeId, PartyId};
use sidepot_negotiation::{Challenge, Negotiation};

use crate::error::AppError;
use crate::routes::{caller, TermsBody};
use crate::state::AppState;

/// Body for `POST /v1/challenges`.
#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    /// The party being challenged.
    pub recipient: Uuid,
    /// Initial terms.
    #[serde(flatten)]
    pub terms: TermsBody,
}

/// `POST /v1/challenges` — the caller challenges `recipient`.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateChallengeRequest>,
) -> Result<(StatusCode, Json<Challenge>), AppError> {
    let initiator = caller(&headers)?;
    let recipient = PartyId::from_uuid(body.recipient);
    let challenge = state
        .negotiation
        .create_challenge(initiator, recipient, body.terms.into_terms()?)
        .await?;
    Ok((StatusCode::CREATED, Json(challenge)))
}

/// `GET /v1/challenges/{id}`.
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Challenge>, AppError> {
    let challenge = state
        .negotiation
        .challenge(&ChallengeId::from_uuid(id))
        .await?;
    Ok(Json(challenge))
}

/// `POST /v1/challenges/{id}/negotiations` — the caller counter-proposes.
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<TermsBody>,
) -> Result<(StatusCode, Json<Negotiation>), AppError> {
    let proposer = caller(&headers)?;
    let round = state
        .negotiation
        .submit(&ChallengeId::from_uuid(id), proposer, body.into_terms()?)
        .await?;
    Ok((StatusCode::CREATED, Json(round)))
}

/// `GET /v1/challenges/{id}/negotiations` — rounds, newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Negotiation>>, AppError> {
    let rounds = state
        .negotiation
        .list(&ChallengeId::from_uuid(id))
        .await?;
    Ok(Json(rounds))
}
