//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from the negotiation, escrow, and dispute crates to
//! HTTP status codes with a JSON error body. Internal error details are
//! never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sidepot_core::{StoreError, ValidationError};
use sidepot_dispute::DisputeError;
use sidepot_escrow::EscrowError;
use sidepot_negotiation::NegotiationError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "ESCROW_PENDING").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller identity missing or unparseable (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is not allowed to act on this resource (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The round's escrow hold is not confirmed yet (409, distinct code so
    /// clients know to wait rather than retry blindly).
    #[error("escrow not ready: {0}")]
    EscrowPending(String),

    /// An external dependency could not be reached (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::EscrowPending(_) => (StatusCode::CONFLICT, "ESCROW_PENDING"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error details to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "dependency unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::Conflict(_) => Self::Conflict(err.to_string()),
            StoreError::Unavailable(_) => Self::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<EscrowError> for AppError {
    fn from(err: EscrowError) -> Self {
        match &err {
            EscrowError::InsufficientFunds { .. } | EscrowError::UnsupportedToken(_) => {
                Self::Validation(err.to_string())
            }
            EscrowError::LedgerUnavailable(_) => Self::ServiceUnavailable(err.to_string()),
            EscrowError::NotFound(_) => Self::NotFound(err.to_string()),
            EscrowError::AlreadyCompleted(_) | EscrowError::InvalidTransition { .. } => {
                Self::Conflict(err.to_string())
            }
            EscrowError::WinnerNotParty { .. } => Self::Forbidden(err.to_string()),
            EscrowError::BreakdownInconsistent { .. } => Self::Internal(err.to_string()),
            EscrowError::Validation(inner) => Self::Validation(inner.to_string()),
        }
    }
}

impl From<NegotiationError> for AppError {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::NotAParticipant { .. } | NegotiationError::NotAuthorized { .. } => {
                Self::Forbidden(err.to_string())
            }
            NegotiationError::SelfChallenge(_) => Self::Validation(err.to_string()),
            NegotiationError::InvalidChallengeState { .. }
            | NegotiationError::NegotiationInFlight { .. }
            | NegotiationError::AlreadyResponded { .. }
            | NegotiationError::StaleRound { .. } => Self::Conflict(err.to_string()),
            NegotiationError::EscrowPending { .. } => Self::EscrowPending(err.to_string()),
            NegotiationError::Validation(inner) => inner.into(),
            NegotiationError::Escrow(inner) => inner.into(),
            NegotiationError::Store(inner) => inner.into(),
        }
    }
}

impl From<DisputeError> for AppError {
    fn from(err: DisputeError) -> Self {
        match err {
            DisputeError::NotDisputable { .. } => Self::Conflict(err.to_string()),
            DisputeError::EscrowMissing { .. } => Self::Conflict(err.to_string()),
            DisputeError::Escrow(inner) => inner.into(),
            DisputeError::Store(inner) => inner.into(),
        }
    }
}
