//! # Notification Port
//!
//! Fire-and-forget delivery of protocol events to the two parties. The
//! dispatcher behind this port (push, websocket, email) is an external
//! collaborator; a delivery failure must never roll back the state
//! transition that triggered it, so the port is infallible by contract —
//! implementations swallow and log their own errors.

use sidepot_core::ChallengeId;

use crate::challenge::Challenge;
use crate::round::Negotiation;

/// Outbound protocol event sink.
pub trait Notifier: Send + Sync {
    /// A counter-offer round was submitted to the responder.
    fn round_submitted(&self, challenge: &Challenge, round: &Negotiation);

    /// A round was accepted.
    fn round_accepted(&self, challenge: &Challenge, round: &Negotiation);

    /// A round was declined.
    fn round_declined(&self, challenge: &Challenge, round: &Negotiation);

    /// A dispute on the challenge was resolved.
    fn dispute_resolved(&self, challenge_id: &ChallengeId, outcome: &str);
}

/// Notifier that emits structured tracing events. The default for
/// development deployments.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn round_submitted(&self, challenge: &Challenge, round: &Negotiation) {
        tracing::info!(
            challenge_id = %challenge.id,
            negotiation_id = %round.id,
            to = %round.to_party,
            round = round.round_number,
            wager = %round.proposed_terms.wager,
            "negotiation received"
        );
    }

    fn round_accepted(&self, challenge: &Challenge, round: &Negotiation) {
        tracing::info!(
            challenge_id = %challenge.id,
            negotiation_id = %round.id,
            to = %round.from_party,
            "negotiation accepted"
        );
    }

    fn round_declined(&self, challenge: &Challenge, round: &Negotiation) {
        tracing::info!(
            challenge_id = %challenge.id,
            negotiation_id = %round.id,
            to = %round.from_party,
            reason = round.decline_reason.as_deref().unwrap_or("none given"),
            "negotiation declined"
        );
    }

    fn dispute_resolved(&self, challenge_id: &ChallengeId, outcome: &str) {
        tracing::info!(challenge_id = %challenge_id, outcome, "dispute resolved");
    }
}

/// Notifier that drops everything. For tests that do not assert delivery.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn round_submitted(&self, _challenge: &Challenge, _round: &Negotiation) {}
    fn round_accepted(&self, _challenge: &Challenge, _round: &Negotiation) {}
    fn round_declined(&self, _challenge: &Challenge, _round: &Negotiation) {}
    fn dispute_resolved(&self, _challenge_id: &ChallengeId, _outcome: &str) {}
}
