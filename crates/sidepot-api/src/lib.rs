//! # sidepot-api — Axum API Service
//!
//! The HTTP surface of the sidepot stack. Assembles the challenge,
//! negotiation, and dispute routers over shared [`AppState`].
//!
//! ## Routes
//!
//! - `POST /v1/challenges` — create a challenge
//! - `GET  /v1/challenges/{id}` — fetch a challenge
//! - `POST /v1/challenges/{id}/negotiations` — submit a counter-offer
//! - `GET  /v1/challenges/{id}/negotiations` — list rounds, newest first
//! - `POST /v1/negotiations/{id}/accept` — accept a round
//! - `POST /v1/negotiations/{id}/decline` — decline a round
//! - `POST /v1/challenges/{id}/disputes` — open a dispute
//! - `GET  /v1/disputes` — list unresolved disputes
//! - `POST /v1/disputes/{id}/resolve` — manual settlement override
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers — they delegate to the domain
//!   services and map errors through [`AppError`].
//! - The caller's verified identity arrives in the `x-party-id` header;
//!   resolving it is the identity provider's concern upstream.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router with tracing middleware.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
