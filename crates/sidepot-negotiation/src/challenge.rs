//! # Challenge — The Negotiable Agreement
//!
//! A challenge binds two parties to free-text terms with a wager. Its
//! composite status reflects both the negotiation protocol and eventual
//! dispute settlement:
//!
//! ```text
//! Pending ──submit()──▶ Negotiating ──accept()──▶ Pending | Accepted
//!                            │                        │
//!                       decline()                 dispute settlement
//!                            │                        │
//!                            ▼                        ▼
//!                       Negotiating       Completed | Failed | TieResolved
//! ```
//!
//! A challenge is never deleted, only terminalized. The history log is
//! append-only: round summaries are pushed and never mutated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sidepot_core::{
    ChallengeId, EscrowId, NegotiationId, PartyId, Timestamp, TokenSymbol, ValidationError,
};

// ── Status ─────────────────────────────────────────────────────────────

/// The composite lifecycle status of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    /// Sent, awaiting acceptance under the current terms.
    Pending,
    /// A counter-offer round is (or was) in play.
    Negotiating,
    /// Both parties agreed; the challenge is live.
    Accepted,
    /// Settled in the recipient's favor (terminal).
    Completed,
    /// Settled in the initiator's favor (terminal).
    Failed,
    /// Settled as a tie with both parties refunded (terminal).
    TieResolved,
    /// Dispute settlement errored; awaiting retry or operator action.
    ResolutionFailed,
}

impl ChallengeStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Negotiating => "NEGOTIATING",
            Self::Accepted => "ACCEPTED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::TieResolved => "TIE_RESOLVED",
            Self::ResolutionFailed => "RESOLUTION_FAILED",
        }
    }

    /// Whether this status is terminal (settled, no further mutation).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TieResolved)
    }

    /// Whether a new counter-offer round may be opened in this status.
    pub fn can_renegotiate(&self) -> bool {
        matches!(self, Self::Pending | Self::Negotiating | Self::Accepted)
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Direction ──────────────────────────────────────────────────────────

/// Which party proposed a negotiation round.
///
/// A closed tagged variant — direction is never a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationDirection {
    /// The challenge initiator proposed to the recipient.
    InitiatorToRecipient,
    /// The challenge recipient proposed to the initiator.
    RecipientToInitiator,
}

impl NegotiationDirection {
    /// The canonical string name of this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitiatorToRecipient => "INITIATOR_TO_RECIPIENT",
            Self::RecipientToInitiator => "RECIPIENT_TO_INITIATOR",
        }
    }
}

impl std::fmt::Display for NegotiationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Terms ──────────────────────────────────────────────────────────────

/// The negotiable terms of a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTerms {
    /// Free-text description of the challenge.
    pub description: String,
    /// Wager amount per party (≥ 0; zero means no money at stake).
    pub wager: Decimal,
    /// Wager token.
    pub token: TokenSymbol,
    /// Days until the challenge expires.
    pub expiry_days: u32,
}

impl ChallengeTerms {
    /// Validate the terms. Rejected before any side effect.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.wager < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount(self.wager));
        }
        if self.expiry_days == 0 {
            return Err(ValidationError::InvalidExpiryWindow(self.expiry_days));
        }
        Ok(())
    }
}

// ── History ────────────────────────────────────────────────────────────

/// What happened in a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryEvent {
    /// A counter-offer round was submitted.
    RoundSubmitted,
    /// The responder accepted the round.
    RoundAccepted,
    /// The responder declined the round.
    RoundDeclined,
}

impl HistoryEvent {
    /// The canonical string name of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundSubmitted => "ROUND_SUBMITTED",
            Self::RoundAccepted => "ROUND_ACCEPTED",
            Self::RoundDeclined => "ROUND_DECLINED",
        }
    }
}

/// One entry of the append-only negotiation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The round this entry summarizes.
    pub negotiation_id: NegotiationId,
    /// The round's number on the challenge.
    pub round_number: u32,
    /// What happened.
    pub event: HistoryEvent,
    /// The party that acted.
    pub actor: PartyId,
    /// The round's proposed wager at the time of the event.
    pub wager: Decimal,
    /// When the event occurred.
    pub timestamp: Timestamp,
}

// ── The Challenge ──────────────────────────────────────────────────────

/// A peer challenge between two parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Unique challenge identifier.
    pub id: ChallengeId,
    /// The party that sent the challenge.
    pub initiator: PartyId,
    /// The party the challenge was sent to.
    pub recipient: PartyId,
    /// Current agreed (or pending) terms.
    pub terms: ChallengeTerms,
    /// Composite lifecycle status.
    pub status: ChallengeStatus,
    /// The single outstanding round, if any.
    pub active_negotiation_id: Option<NegotiationId>,
    /// Monotonic round counter; never decreases.
    pub negotiation_count: u32,
    /// Append-only log of round summaries.
    pub history: Vec<HistoryEntry>,
    /// The currently bound escrow hold, if any.
    pub escrow_binding: Option<EscrowId>,
    /// When the challenge was created.
    pub created_at: Timestamp,
    /// When the challenge last changed.
    pub updated_at: Timestamp,
}

impl Challenge {
    /// Create a new challenge in `Pending` with validated terms.
    pub fn new(
        initiator: PartyId,
        recipient: PartyId,
        terms: ChallengeTerms,
    ) -> Result<Self, ValidationError> {
        terms.validate()?;
        let now = Timestamp::now();
        Ok(Self {
            id: ChallengeId::new(),
            initiator,
            recipient,
            terms,
            status: ChallengeStatus::Pending,
            active_negotiation_id: None,
            negotiation_count: 0,
            history: Vec::new(),
            escrow_binding: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the party is one of the two participants.
    pub fn is_participant(&self, party: &PartyId) -> bool {
        self.initiator == *party || self.recipient == *party
    }

    /// The other participant, if `party` is a participant at all.
    pub fn counterpart(&self, party: &PartyId) -> Option<PartyId> {
        if *party == self.initiator {
            Some(self.recipient)
        } else if *party == self.recipient {
            Some(self.initiator)
        } else {
            None
        }
    }

    /// The direction of a proposal made by `proposer`.
    pub fn direction_of(&self, proposer: &PartyId) -> Option<NegotiationDirection> {
        if *proposer == self.initiator {
            Some(NegotiationDirection::InitiatorToRecipient)
        } else if *proposer == self.recipient {
            Some(NegotiationDirection::RecipientToInitiator)
        } else {
            None
        }
    }

    /// The most recently submitted round, forming the predecessor link of
    /// the next round's back-chain.
    pub fn last_submitted_round(&self) -> Option<NegotiationId> {
        self.history
            .iter()
            .rev()
            .find(|entry| entry.event == HistoryEvent::RoundSubmitted)
            .map(|entry| entry.negotiation_id)
    }

    /// Append a history entry.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms(wager: Decimal) -> ChallengeTerms {
        ChallengeTerms {
            description: "30 pull-ups a day for a week".to_string(),
            wager,
            token: TokenSymbol::new("USDC").unwrap(),
            expiry_days: 7,
        }
    }

    #[test]
    fn new_challenge_is_pending() {
        let challenge = Challenge::new(PartyId::new(), PartyId::new(), terms(dec!(10))).unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Pending);
        assert_eq!(challenge.negotiation_count, 0);
        assert!(challenge.active_negotiation_id.is_none());
        assert!(challenge.escrow_binding.is_none());
        assert!(challenge.history.is_empty());
    }

    #[test]
    fn rejects_negative_wager() {
        let result = Challenge::new(PartyId::new(), PartyId::new(), terms(dec!(-1)));
        assert!(matches!(result, Err(ValidationError::NegativeAmount(_))));
    }

    #[test]
    fn rejects_empty_description() {
        let mut t = terms(dec!(10));
        t.description = "   ".to_string();
        let result = Challenge::new(PartyId::new(), PartyId::new(), t);
        assert!(matches!(result, Err(ValidationError::EmptyDescription)));
    }

    #[test]
    fn rejects_zero_expiry() {
        let mut t = terms(dec!(10));
        t.expiry_days = 0;
        let result = Challenge::new(PartyId::new(), PartyId::new(), t);
        assert!(matches!(result, Err(ValidationError::InvalidExpiryWindow(0))));
    }

    #[test]
    fn participants_and_counterparts() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let challenge = Challenge::new(a, b, terms(dec!(10))).unwrap();
        assert!(challenge.is_participant(&a));
        assert!(challenge.is_participant(&b));
        assert!(!challenge.is_participant(&PartyId::new()));
        assert_eq!(challenge.counterpart(&a), Some(b));
        assert_eq!(challenge.counterpart(&b), Some(a));
        assert_eq!(challenge.counterpart(&PartyId::new()), None);
    }

    #[test]
    fn direction_depends_on_proposer() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let challenge = Challenge::new(a, b, terms(dec!(10))).unwrap();
        assert_eq!(
            challenge.direction_of(&a),
            Some(NegotiationDirection::InitiatorToRecipient)
        );
        assert_eq!(
            challenge.direction_of(&b),
            Some(NegotiationDirection::RecipientToInitiator)
        );
        assert_eq!(challenge.direction_of(&PartyId::new()), None);
    }

    #[test]
    fn status_predicates() {
        assert!(ChallengeStatus::Pending.can_renegotiate());
        assert!(ChallengeStatus::Negotiating.can_renegotiate());
        assert!(ChallengeStatus::Accepted.can_renegotiate());
        assert!(!ChallengeStatus::Completed.can_renegotiate());
        assert!(!ChallengeStatus::Failed.can_renegotiate());

        assert!(ChallengeStatus::Completed.is_terminal());
        assert!(ChallengeStatus::Failed.is_terminal());
        assert!(ChallengeStatus::TieResolved.is_terminal());
        assert!(!ChallengeStatus::ResolutionFailed.is_terminal());
        assert!(!ChallengeStatus::Negotiating.is_terminal());
    }

    #[test]
    fn last_submitted_round_follows_history() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let mut challenge = Challenge::new(a, b, terms(dec!(10))).unwrap();
        assert_eq!(challenge.last_submitted_round(), None);

        let first = NegotiationId::new();
        challenge.record(HistoryEntry {
            negotiation_id: first,
            round_number: 1,
            event: HistoryEvent::RoundSubmitted,
            actor: a,
            wager: dec!(15),
            timestamp: Timestamp::now(),
        });
        challenge.record(HistoryEntry {
            negotiation_id: first,
            round_number: 1,
            event: HistoryEvent::RoundDeclined,
            actor: b,
            wager: dec!(15),
            timestamp: Timestamp::now(),
        });
        assert_eq!(challenge.last_submitted_round(), Some(first));

        let second = NegotiationId::new();
        challenge.record(HistoryEntry {
            negotiation_id: second,
            round_number: 2,
            event: HistoryEvent::RoundSubmitted,
            actor: b,
            wager: dec!(12),
            timestamp: Timestamp::now(),
        });
        assert_eq!(challenge.last_submitted_round(), Some(second));
    }

    #[test]
    fn status_serde_uses_canonical_names() {
        let json = serde_json::to_string(&ChallengeStatus::TieResolved).unwrap();
        assert_eq!(json, "\"TIE_RESOLVED\"");
        let json = serde_json::to_string(&NegotiationDirection::RecipientToInitiator).unwrap();
        assert_eq!(json, "\"RECIPIENT_TO_INITIATOR\"");
    }
}
