//! # Dispute Error Types

use rust_decimal::Decimal;
use thiserror::Error;

use sidepot_core::{ChallengeId, StoreError};
use sidepot_escrow::EscrowError;
use sidepot_negotiation::ChallengeStatus;

/// Errors produced by dispute resolution.
#[derive(Error, Debug)]
pub enum DisputeError {
    /// Disputes may only be opened on accepted challenges.
    #[error("challenge {challenge_id} in status {status} cannot be disputed")]
    NotDisputable {
        /// The challenge in question.
        challenge_id: ChallengeId,
        /// Its current status.
        status: ChallengeStatus,
    },

    /// The disputed challenge carries a wager but no bound escrow hold.
    #[error("challenge {challenge_id} has no escrow hold bound for its {wager} wager")]
    EscrowMissing {
        /// The challenge in question.
        challenge_id: ChallengeId,
        /// The disputed wager.
        wager: Decimal,
    },

    /// Escrow settlement failure.
    #[error(transparent)]
    Escrow(#[from] EscrowError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
