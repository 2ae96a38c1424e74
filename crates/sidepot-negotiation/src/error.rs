//! # Negotiation Error Types
//!
//! The protocol error taxonomy: authorization failures and validation are
//! rejected before any side effect, state conflicts surface conditional-
//! update failures that are safe to retry with fresh state, and
//! `EscrowPending` is the one deliberate in-between — the round exists but
//! cannot be accepted until its hold is confirmed.

use thiserror::Error;

use sidepot_core::{ChallengeId, NegotiationId, PartyId, StoreError, ValidationError};
use sidepot_escrow::EscrowError;

use crate::challenge::ChallengeStatus;
use crate::round::NegotiationStatus;

/// Errors produced by the negotiation protocol.
#[derive(Error, Debug)]
pub enum NegotiationError {
    /// The acting party is not a participant of the challenge.
    #[error("party {party} is not a participant of {challenge_id}")]
    NotAParticipant {
        /// The rejected party.
        party: PartyId,
        /// The challenge in question.
        challenge_id: ChallengeId,
    },

    /// A challenge cannot negotiate against itself.
    #[error("initiator and recipient must differ, got {0} twice")]
    SelfChallenge(PartyId),

    /// The challenge status does not permit renegotiation.
    #[error("challenge {challenge_id} in status {status} cannot be renegotiated")]
    InvalidChallengeState {
        /// The challenge in question.
        challenge_id: ChallengeId,
        /// Its current status.
        status: ChallengeStatus,
    },

    /// Another round is already awaiting a response.
    #[error("challenge {challenge_id} already has round {active} awaiting response")]
    NegotiationInFlight {
        /// The challenge in question.
        challenge_id: ChallengeId,
        /// The outstanding round.
        active: NegotiationId,
    },

    /// The acting party is not this round's designated responder.
    #[error("party {party} is not the responder of {negotiation_id}")]
    NotAuthorized {
        /// The rejected party.
        party: PartyId,
        /// The round in question.
        negotiation_id: NegotiationId,
    },

    /// The round has already been accepted or declined.
    #[error("round {negotiation_id} already responded to: {status}")]
    AlreadyResponded {
        /// The round in question.
        negotiation_id: NegotiationId,
        /// Its resolved status.
        status: NegotiationStatus,
    },

    /// The round is no longer the challenge's outstanding round.
    #[error("round {negotiation_id} has been superseded")]
    StaleRound {
        /// The superseded round.
        negotiation_id: NegotiationId,
    },

    /// The round carries a positive wager but its escrow hold is not ready.
    ///
    /// Surfaced to the responder as a specific "escrow not ready" state so
    /// they know to wait rather than retry blindly.
    #[error("round {negotiation_id} has no confirmed escrow hold yet")]
    EscrowPending {
        /// The round in question.
        negotiation_id: NegotiationId,
    },

    /// Input validation failure, rejected before any side effect.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Escrow operation failure.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
