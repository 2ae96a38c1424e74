//! # Negotiation Round
//!
//! One proposer→responder counter-offer cycle. A round is created in
//! `PendingResponse` and mutated exactly once, by the responder's accept
//! or decline; it is immutable thereafter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sidepot_core::{fees, ChallengeId, EscrowId, FeeBreakdown, NegotiationId, PartyId, Timestamp};

use crate::challenge::{ChallengeTerms, NegotiationDirection};
use crate::error::NegotiationError;

// ── Status ─────────────────────────────────────────────────────────────

/// The lifecycle status of a negotiation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationStatus {
    /// Awaiting the responder's decision.
    PendingResponse,
    /// The responder accepted the proposal (terminal).
    Accepted,
    /// The responder declined the proposal (terminal).
    Declined,
}

impl NegotiationStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingResponse => "PENDING_RESPONSE",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }
}

impl std::fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Money Flow ─────────────────────────────────────────────────────────

/// The money consequences of a proposal, computed when the proposed wager
/// is positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyFlow {
    /// Proposed wager minus original wager.
    pub delta: Decimal,
    /// Percentage change relative to the original wager (`None` when the
    /// original wager was zero).
    pub percent_change: Option<Decimal>,
    /// Additional deposit each party must commit.
    pub per_party_deposit_adjustment: Decimal,
    /// Pot/fee/payout figures at the proposed wager.
    pub breakdown: FeeBreakdown,
}

impl MoneyFlow {
    /// Compute the flow from an original to a proposed wager.
    pub fn compute(original: Decimal, proposed: Decimal) -> Self {
        let diff = fees::diff(original, proposed);
        Self {
            delta: diff.delta,
            percent_change: diff.percent_change,
            per_party_deposit_adjustment: diff.per_party_deposit_adjustment,
            breakdown: fees::breakdown(proposed),
        }
    }
}

// ── The Round ──────────────────────────────────────────────────────────

/// One round of counter-offer on a challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Negotiation {
    /// Unique round identifier.
    pub id: NegotiationId,
    /// The challenge being renegotiated.
    pub challenge_id: ChallengeId,
    /// The proposing party.
    pub from_party: PartyId,
    /// The responding party.
    pub to_party: PartyId,
    /// Which side proposed.
    pub direction: NegotiationDirection,
    /// Challenge terms at round start.
    pub original_terms: ChallengeTerms,
    /// The counter-offer.
    pub proposed_terms: ChallengeTerms,
    /// Current lifecycle status.
    pub status: NegotiationStatus,
    /// Money consequences of the proposal (present when the proposed wager
    /// is positive).
    pub money_flow: Option<MoneyFlow>,
    /// The hold opened for this round's wager, if the ledger call
    /// succeeded. `None` with a positive wager means "escrow pending".
    pub escrow_binding: Option<EscrowId>,
    /// This round's number on the challenge; strictly increasing.
    pub round_number: u32,
    /// The previously submitted round, forming a back-chain (never a cycle).
    pub previous_negotiation_id: Option<NegotiationId>,
    /// The responder's stated reason when declined.
    pub decline_reason: Option<String>,
    /// When the round was proposed.
    pub created_at: Timestamp,
    /// When the responder resolved the round.
    pub responded_at: Option<Timestamp>,
}

impl Negotiation {
    /// Create a round in `PendingResponse`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        challenge_id: ChallengeId,
        from_party: PartyId,
        to_party: PartyId,
        direction: NegotiationDirection,
        original_terms: ChallengeTerms,
        proposed_terms: ChallengeTerms,
        money_flow: Option<MoneyFlow>,
        escrow_binding: Option<EscrowId>,
        round_number: u32,
        previous_negotiation_id: Option<NegotiationId>,
    ) -> Self {
        Self {
            id: NegotiationId::new(),
            challenge_id,
            from_party,
            to_party,
            direction,
            original_terms,
            proposed_terms,
            status: NegotiationStatus::PendingResponse,
            money_flow,
            escrow_binding,
            round_number,
            previous_negotiation_id,
            decline_reason: None,
            created_at: Timestamp::now(),
            responded_at: None,
        }
    }

    /// Mark the round accepted. Fails if already resolved.
    pub fn accept(&mut self) -> Result<(), NegotiationError> {
        self.require_pending()?;
        self.status = NegotiationStatus::Accepted;
        self.responded_at = Some(Timestamp::now());
        Ok(())
    }

    /// Mark the round declined with an optional reason. Fails if already
    /// resolved.
    pub fn decline(&mut self, reason: Option<String>) -> Result<(), NegotiationError> {
        self.require_pending()?;
        self.status = NegotiationStatus::Declined;
        self.decline_reason = reason;
        self.responded_at = Some(Timestamp::now());
        Ok(())
    }

    fn require_pending(&self) -> Result<(), NegotiationError> {
        if self.status != NegotiationStatus::PendingResponse {
            return Err(NegotiationError::AlreadyResponded {
                negotiation_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}
