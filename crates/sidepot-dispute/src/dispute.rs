//! # Dispute Record
//!
//! A contested challenge outcome under community vote. The wager and token
//! are copied from the challenge when the dispute opens and are immutable
//! thereafter; the voting deadline is set once at creation.
//!
//! ## Lifecycle
//!
//! ```text
//! Voting ──claim──▶ Resolving ──settled──▶ Resolved
//!    ▲                  │
//!    │              settlement error
//!    │                  ▼
//!    └──(re-swept)── ResolutionFailed
//! ```
//!
//! `resolved` transitions `false → true` exactly once, enforced by the
//! store's conditional updates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sidepot_core::{ChallengeId, DisputeId, Timestamp, TokenSymbol};

use sidepot_negotiation::Challenge;

// ── Status ─────────────────────────────────────────────────────────────

/// The lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// Votes are being collected until the deadline.
    Voting,
    /// A monitor worker has claimed the dispute and is settling it.
    Resolving,
    /// Funds settled and the outcome recorded (terminal).
    Resolved,
    /// Settlement errored; eligible for re-sweep or operator retry.
    ResolutionFailed,
}

impl DisputeStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voting => "VOTING",
            Self::Resolving => "RESOLVING",
            Self::Resolved => "RESOLVED",
            Self::ResolutionFailed => "RESOLUTION_FAILED",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tally ──────────────────────────────────────────────────────────────

/// Snapshot of the vote counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Votes asserting the challenge was completed.
    pub completed: u64,
    /// Votes asserting it was not.
    pub not_completed: u64,
}

impl VoteTally {
    /// The outcome this tally decides. Equal counts — including zero votes
    /// on both sides — are a tie, never a default winner.
    pub fn outcome(&self) -> DisputeOutcome {
        match self.completed.cmp(&self.not_completed) {
            std::cmp::Ordering::Greater => DisputeOutcome::RecipientWins,
            std::cmp::Ordering::Less => DisputeOutcome::InitiatorWins,
            std::cmp::Ordering::Equal => DisputeOutcome::Tie,
        }
    }
}

/// The decided outcome of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeOutcome {
    /// The community judged the challenge completed; the recipient wins.
    RecipientWins,
    /// The community judged it not completed; the initiator wins.
    InitiatorWins,
    /// Equal votes; both parties refunded minus fee.
    Tie,
}

impl DisputeOutcome {
    /// The canonical string name of this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecipientWins => "RECIPIENT_WINS",
            Self::InitiatorWins => "INITIATOR_WINS",
            Self::Tie => "TIE",
        }
    }
}

impl std::fmt::Display for DisputeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── The Dispute ────────────────────────────────────────────────────────

/// A contested challenge outcome under community vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    /// Unique dispute identifier.
    pub id: DisputeId,
    /// The contested challenge.
    pub challenge_id: ChallengeId,
    /// Wager snapshot taken at open time.
    pub wager: Decimal,
    /// Token snapshot taken at open time.
    pub token: TokenSymbol,
    /// Votes asserting completion.
    pub completed_votes: u64,
    /// Votes asserting non-completion.
    pub not_completed_votes: u64,
    /// Fixed voting deadline, set once at creation.
    pub voting_ends_at: Timestamp,
    /// Current lifecycle status.
    pub status: DisputeStatus,
    /// Re-entrancy guard; flips `false → true` exactly once.
    pub resolved: bool,
    /// The decided outcome, stored at resolution.
    pub final_result: Option<DisputeOutcome>,
    /// The tally snapshot, stored at resolution.
    pub final_tally: Option<VoteTally>,
    /// The last settlement error, stored on failure.
    pub last_error: Option<String>,
    /// When the dispute was opened.
    pub opened_at: Timestamp,
    /// When the dispute was resolved.
    pub resolved_at: Option<Timestamp>,
}

impl Dispute {
    /// Open a dispute over a challenge, snapshotting its wager and token.
    pub fn open(challenge: &Challenge, voting_window_secs: i64) -> Self {
        let now = Timestamp::now();
        Self {
            id: DisputeId::new(),
            challenge_id: challenge.id,
            wager: challenge.terms.wager,
            token: challenge.terms.token.clone(),
            completed_votes: 0,
            not_completed_votes: 0,
            voting_ends_at: now.plus_seconds(voting_window_secs),
            status: DisputeStatus::Voting,
            resolved: false,
            final_result: None,
            final_tally: None,
            last_error: None,
            opened_at: now,
            resolved_at: None,
        }
    }

    /// Snapshot the current vote counters.
    pub fn tally(&self) -> VoteTally {
        VoteTally {
            completed: self.completed_votes,
            not_completed: self.not_completed_votes,
        }
    }

    /// Whether the voting window has elapsed.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.voting_ends_at <= now
    }
}
