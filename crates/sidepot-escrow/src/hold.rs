//! # Escrow Hold State Machine
//!
//! Models a ledger-side deposit commitment with a validated status enum.
//!
//! ## Transition Graph
//!
//! ```text
//! PendingAcceptance ──accept()──▶ Accepted ──complete()/refund_tie()──▶ Completed
//!        │                           │
//!        └──────────cancel()─────────┴──▶ Cancelled
//! ```
//!
//! A validated enum is used rather than typestate: holds are persisted and
//! shipped across the API where the status is not known at compile time,
//! and cancellation is reachable from two states. Invalid transitions
//! return [`EscrowError::InvalidTransition`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sidepot_core::{ChallengeId, EscrowId, FeeBreakdown, PartyId, Timestamp, TokenSymbol};

use crate::error::EscrowError;

// ── Status ─────────────────────────────────────────────────────────────

/// The lifecycle status of an escrow hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// The first party has deposited; awaiting the counterparty.
    PendingAcceptance,
    /// Both parties have deposited; the pot is live.
    Accepted,
    /// Funds have been paid out or refunded (terminal).
    Completed,
    /// The hold was cancelled and deposits returned (terminal).
    Cancelled,
}

impl EscrowStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingAcceptance => "PENDING_ACCEPTANCE",
            Self::Accepted => "ACCEPTED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Valid target statuses from this status.
    pub fn valid_transitions(&self) -> &'static [EscrowStatus] {
        match self {
            Self::PendingAcceptance => &[Self::Accepted, Self::Cancelled],
            Self::Accepted => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transition Record ──────────────────────────────────────────────────

/// A record of a single hold status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldTransitionRecord {
    /// Status before the transition.
    pub from_status: EscrowStatus,
    /// Status after the transition.
    pub to_status: EscrowStatus,
    /// When the transition occurred (UTC).
    pub timestamp: Timestamp,
    /// Why the transition occurred.
    pub reason: String,
}

// ── Receipts ───────────────────────────────────────────────────────────

/// Receipt for a decisive-winner payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    /// The settled hold.
    pub escrow_id: EscrowId,
    /// The party that received the payout.
    pub winner: PartyId,
    /// Amount paid to the winner.
    pub amount: Decimal,
    /// Fee collected by the platform.
    pub fee: Decimal,
    /// Wager token.
    pub token: TokenSymbol,
    /// Ledger transaction reference.
    pub ledger_reference: String,
    /// When the ledger confirmed the settlement.
    pub settled_at: Timestamp,
}

/// Receipts for a tie refund — both depositors are paid back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieRefundReceipts {
    /// The settled hold.
    pub escrow_id: EscrowId,
    /// Amount refunded to each party.
    pub refund_per_party: Decimal,
    /// Fee retained by the platform.
    pub fee: Decimal,
    /// Wager token.
    pub token: TokenSymbol,
    /// Ledger reference for the challenger refund.
    pub challenger_reference: String,
    /// Ledger reference for the challengee refund.
    pub challengee_reference: String,
    /// When the ledger confirmed the refund.
    pub refunded_at: Timestamp,
}

// ── The Hold ───────────────────────────────────────────────────────────

/// A ledger-side deposit commitment for one negotiation round's wager.
///
/// The `breakdown` is derived by the fee calculator at creation and never
/// edited independently. Every status change is appended to `transitions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowHold {
    /// Ledger transaction reference.
    pub id: EscrowId,
    /// The challenge this hold backs.
    pub challenge_id: ChallengeId,
    /// The party that deposited at creation.
    pub challenger: PartyId,
    /// The counterparty expected to match the deposit.
    pub challengee: PartyId,
    /// Wager amount per party.
    pub amount: Decimal,
    /// Wager token.
    pub token: TokenSymbol,
    /// Current lifecycle status.
    pub status: EscrowStatus,
    /// Derived pot/fee/payout figures.
    pub breakdown: FeeBreakdown,
    /// Receipt stored after a decisive-winner settlement.
    pub payout_receipt: Option<PayoutReceipt>,
    /// Receipts stored after a tie refund.
    pub tie_receipts: Option<TieRefundReceipts>,
    /// Append-only status transition log.
    pub transitions: Vec<HoldTransitionRecord>,
    /// When the hold was created.
    pub created_at: Timestamp,
    /// When the hold last changed.
    pub updated_at: Timestamp,
}

impl EscrowHold {
    /// Create a hold in `PendingAcceptance` with a derived breakdown.
    pub fn new(
        id: EscrowId,
        challenge_id: ChallengeId,
        challenger: PartyId,
        challengee: PartyId,
        amount: Decimal,
        token: TokenSymbol,
        breakdown: FeeBreakdown,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            challenge_id,
            challenger,
            challengee,
            amount,
            token,
            status: EscrowStatus::PendingAcceptance,
            breakdown,
            payout_receipt: None,
            tie_receipts: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given party is one of the two depositors.
    pub fn is_party(&self, party: &PartyId) -> bool {
        self.challenger == *party || self.challengee == *party
    }

    /// Attempt a status transition with runtime validation.
    ///
    /// Records the transition on success.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidTransition`] if the transition is not
    /// allowed from the current status.
    pub fn try_transition(
        &mut self,
        to: EscrowStatus,
        reason: impl Into<String>,
    ) -> Result<(), EscrowError> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(EscrowError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        let now = Timestamp::now();
        self.transitions.push(HoldTransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: now,
            reason: reason.into(),
        });
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}
