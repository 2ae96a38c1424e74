//! # Route Modules
//!
//! Handlers delegate to the domain services; no business logic lives here.

pub mod challenges;
pub mod disputes;
pub mod negotiations;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use sidepot_core::{PartyId, TokenSymbol};
use sidepot_negotiation::ChallengeTerms;

use crate::error::AppError;
use crate::state::AppState;

/// Assemble all v1 routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/challenges", post(challenges::create))
        .route("/v1/challenges/:id", get(challenges::fetch))
        .route(
            "/v1/challenges/:id/negotiations",
            post(challenges::submit).get(challenges::list),
        )
        .route("/v1/negotiations/:id/accept", post(negotiations::accept))
        .route("/v1/negotiations/:id/decline", post(negotiations::decline))
        .route("/v1/challenges/:id/disputes", post(disputes::open))
        .route("/v1/disputes", get(disputes::list_active))
        .route("/v1/disputes/:id/resolve", post(disputes::resolve_now))
}

/// The caller's verified identity, as resolved by the identity provider
/// upstream and forwarded in the `x-party-id` header.
pub(crate) fn caller(headers: &HeaderMap) -> Result<PartyId, AppError> {
    let value = headers
        .get("x-party-id")
        .ok_or_else(|| AppError::Unauthorized("missing x-party-id header".to_string()))?;
    let raw = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed x-party-id header".to_string()))?;
    let uuid = Uuid::parse_str(raw)
        .map_err(|_| AppError::Unauthorized(format!("invalid party id: {raw:?}")))?;
    Ok(PartyId::from_uuid(uuid))
}

/// Challenge terms as they arrive on the wire.
#[derive(Debug, Deserialize)]
pub struct TermsBody {
    /// Free-text challenge description.
    pub description: String,
    /// Wager amount per party.
    pub wager: Decimal,
    /// Wager token symbol.
    pub token: String,
    /// Days until expiry.
    pub expiry_days: u32,
}

impl TermsBody {
    /// Validate and convert into domain terms.
    pub(crate) fn into_terms(self) -> Result<ChallengeTerms, AppError> {
        let token = TokenSymbol::new(self.token)?;
        Ok(ChallengeTerms {
            description: self.description,
            wager: self.wager,
            token,
            expiry_days: self.expiry_days,
        })
    }
}
