//! # sidepot-negotiation — Counter-Offer Protocol
//!
//! Owns the bidirectional counter-offer state machine between the two
//! parties of a challenge:
//!
//! - **Challenge** ([`challenge`]): the negotiable agreement — terms,
//!   composite status, the single outstanding-round slot, the monotonic
//!   round counter, and the append-only history log.
//!
//! - **Round** ([`round`]): one [`Negotiation`] round
//!   (`PendingResponse → Accepted | Declined`), with its terms snapshot,
//!   computed money flow, and escrow binding.
//!
//! - **Store** ([`store`]): the [`ChallengeStore`] persistence port.
//!   Round writes commit as a single conditional batch guarded on the
//!   challenge's `active_negotiation_id` and `negotiation_count`, so a
//!   stale client can never resolve a superseded round.
//!
//! - **Service** ([`service`]): [`NegotiationService`] — submit, accept,
//!   decline, and list, orchestrating escrow holds through
//!   `sidepot_escrow` and emitting fire-and-forget notifications.
//!
//! ## Ordering Guarantee
//!
//! Within one challenge, submit/accept/decline are linearized by the
//! store's compare-and-set guard. Across challenges no ordering is implied.

pub mod challenge;
pub mod error;
pub mod notify;
pub mod round;
pub mod service;
pub mod store;

// Re-export primary types for ergonomic imports.
pub use challenge::{
    Challenge, ChallengeStatus, ChallengeTerms, HistoryEntry, HistoryEvent, NegotiationDirection,
};
pub use error::NegotiationError;
pub use notify::{Notifier, NullNotifier, TracingNotifier};
pub use round::{MoneyFlow, Negotiation, NegotiationStatus};
pub use service::{AcceptOutcome, DeclineOutcome, NegotiationService};
pub use store::{ChallengeGuard, ChallengeStore, InMemoryChallengeStore};
