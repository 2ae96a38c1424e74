//! # Escrow Error Types
//!
//! Structured error hierarchy for the escrow subsystem. Transport failures
//! (`LedgerUnavailable`) are recoverable and must never be conflated with
//! validation or integrity failures — callers branch on the variant.

use rust_decimal::Decimal;
use thiserror::Error;

use sidepot_core::{EscrowId, PartyId, TokenSymbol, ValidationError};

/// Errors produced by escrow operations.
#[derive(Error, Debug)]
pub enum EscrowError {
    /// The initiating party's available balance is below the wager.
    #[error("insufficient funds: {party} holds {available} {token}, needs {required}")]
    InsufficientFunds {
        /// The party whose balance fell short.
        party: PartyId,
        /// Wager token.
        token: TokenSymbol,
        /// Amount required.
        required: Decimal,
        /// Amount available.
        available: Decimal,
    },

    /// The ledger does not recognize the token symbol.
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),

    /// The ledger could not be reached (transport failure or timeout).
    ///
    /// Recoverable: negotiation submission proceeds without a hold and the
    /// responder is blocked at accept time instead.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// No hold exists with the given identifier.
    #[error("escrow hold not found: {0}")]
    NotFound(EscrowId),

    /// The hold was already completed with a different outcome.
    #[error("escrow hold {0} already completed")]
    AlreadyCompleted(EscrowId),

    /// The named winner is not a party to the hold.
    #[error("party {party} is not a participant of escrow hold {escrow_id}")]
    WinnerNotParty {
        /// The hold in question.
        escrow_id: EscrowId,
        /// The rejected winner.
        party: PartyId,
    },

    /// The requested status transition is not allowed.
    #[error("invalid escrow transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status name.
        from: String,
        /// Attempted target status name.
        to: String,
    },

    /// The hold's derived money figures are mutually inconsistent.
    ///
    /// Integrity violation — always fatal for the operation, logged loudly,
    /// never auto-recovered.
    #[error(
        "escrow breakdown inconsistent for {escrow_id}: fee {fee} + payout {winner_payout} != pot {total_pot}"
    )]
    BreakdownInconsistent {
        /// The hold in question.
        escrow_id: EscrowId,
        /// Recorded fee.
        fee: Decimal,
        /// Recorded winner payout.
        winner_payout: Decimal,
        /// Recorded pot.
        total_pot: Decimal,
    },

    /// Input validation failure, rejected before any ledger call.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
