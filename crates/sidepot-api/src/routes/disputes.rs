//! # Dispute Routes
//!
//! Dispute opening (a collaborator-owned trigger) plus the monitor's
//! operational hooks: list active, resolve now.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sidepot_core::{ChallengeId, DisputeId};
use sidepot_dispute::{Dispute, DisputeOutcome};

use crate::error::AppError;
use crate::state::AppState;

/// Body for `POST /v1/challenges/{id}/disputes`.
#[derive(Debug, Deserialize)]
pub struct OpenDisputeRequest {
    /// How long the community may vote before settlement.
    pub voting_window_secs: u64,
}

/// Response for `POST /v1/disputes/{id}/resolve`.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// The decided outcome, or `None` when another worker already holds
    /// the claim.
    pub outcome: Option<DisputeOutcome>,
}

/// `POST /v1/challenges/{id}/disputes`.
pub async fn open(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<OpenDisputeRequest>,
) -> Result<(StatusCode, Json<Dispute>), AppError> {
    let dispute = state
        .monitor
        .open_dispute(
            &ChallengeId::from_uuid(id),
            Duration::from_secs(body.voting_window_secs),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dispute)))
}

/// `GET /v1/disputes` — unresolved disputes.
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<Dispute>>, AppError> {
    Ok(Json(state.monitor.list_active().await?))
}

/// `POST /v1/disputes/{id}/resolve` — manual settlement override.
pub async fn resolve_now(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResolveResponse>, AppError> {
    let outcome = state
        .monitor
        .resolve_now(&DisputeId::from_uuid(id))
        .await?;
    Ok(Json(ResolveResponse { outcome }))
}
