//! # Negotiation Service
//!
//! Orchestrates the counter-offer protocol: validates the actor and the
//! challenge state, opens escrow holds for positive wagers, and commits
//! every round write as a single conditional batch against the store.
//!
//! ## Outage Tolerance
//!
//! A ledger outage during submission does not block the protocol: the
//! round is recorded with `escrow_binding = None` and the responder is
//! stopped at accept time with `EscrowPending` instead. Everything else
//! the ledger refuses (insufficient funds, unknown token) aborts the
//! submission before any state is written.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use sidepot_core::{ChallengeId, NegotiationId, PartyId, StoreError, Timestamp};
use sidepot_escrow::{EscrowError, EscrowManager, EscrowStatus};

use crate::challenge::{
    Challenge, ChallengeStatus, ChallengeTerms, HistoryEntry, HistoryEvent,
};
use crate::error::NegotiationError;
use crate::notify::Notifier;
use crate::round::{MoneyFlow, Negotiation};
use crate::store::{ChallengeGuard, ChallengeStore};

/// Result of accepting a round.
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    /// The resolved round.
    pub negotiation: Negotiation,
    /// The challenge terms now in force.
    pub new_terms: ChallengeTerms,
    /// The challenge status after acceptance.
    pub challenge_status: ChallengeStatus,
}

/// Result of declining a round.
#[derive(Debug, Clone)]
pub struct DeclineOutcome {
    /// The resolved round.
    pub negotiation: Negotiation,
    /// The challenge status after the decline.
    pub challenge_status: ChallengeStatus,
}

/// The counter-offer protocol service.
///
/// Constructed per process with injected store, escrow manager, and
/// notifier — no global state, so tests run many instances side by side.
pub struct NegotiationService {
    store: Arc<dyn ChallengeStore>,
    escrow: Arc<EscrowManager>,
    notifier: Arc<dyn Notifier>,
}

impl NegotiationService {
    /// Create a service over the given collaborators.
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        escrow: Arc<EscrowManager>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            escrow,
            notifier,
        }
    }

    /// The escrow manager this service settles through.
    pub fn escrow(&self) -> &Arc<EscrowManager> {
        &self.escrow
    }

    /// Create a new challenge in `Pending`.
    pub async fn create_challenge(
        &self,
        initiator: PartyId,
        recipient: PartyId,
        terms: ChallengeTerms,
    ) -> Result<Challenge, NegotiationError> {
        if initiator == recipient {
            return Err(NegotiationError::SelfChallenge(initiator));
        }
        let challenge = Challenge::new(initiator, recipient, terms)?;
        self.store.insert_challenge(challenge.clone()).await?;
        info!(challenge_id = %challenge.id, wager = %challenge.terms.wager, "challenge created");
        Ok(challenge)
    }

    /// Fetch a challenge.
    pub async fn challenge(&self, id: &ChallengeId) -> Result<Challenge, NegotiationError> {
        Ok(self.store.challenge(id).await?)
    }

    /// All rounds of a challenge, newest first.
    pub async fn list(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Negotiation>, NegotiationError> {
        Ok(self.store.negotiations_for(challenge_id).await?)
    }

    /// Submit a counter-offer round.
    ///
    /// Either participant may propose — the protocol is symmetric. Only
    /// one round may be outstanding; a second submission fails with
    /// [`NegotiationError::NegotiationInFlight`], including under a
    /// concurrent race (surfaced through the store's conditional commit).
    pub async fn submit(
        &self,
        challenge_id: &ChallengeId,
        proposer: PartyId,
        proposed_terms: ChallengeTerms,
    ) -> Result<Negotiation, NegotiationError> {
        let mut challenge = self.store.challenge(challenge_id).await?;

        let responder =
            challenge
                .counterpart(&proposer)
                .ok_or(NegotiationError::NotAParticipant {
                    party: proposer,
                    challenge_id: *challenge_id,
                })?;
        if !challenge.status.can_renegotiate() {
            return Err(NegotiationError::InvalidChallengeState {
                challenge_id: *challenge_id,
                status: challenge.status,
            });
        }
        if let Some(active) = challenge.active_negotiation_id {
            return Err(NegotiationError::NegotiationInFlight {
                challenge_id: *challenge_id,
                active,
            });
        }
        proposed_terms.validate()?;

        let money_flow = (proposed_terms.wager > Decimal::ZERO)
            .then(|| MoneyFlow::compute(challenge.terms.wager, proposed_terms.wager));

        // A positive wager needs a hold. A ledger outage leaves the round
        // unbound rather than blocking the protocol; every other escrow
        // failure aborts the submission.
        let escrow_binding = if proposed_terms.wager > Decimal::ZERO {
            match self
                .escrow
                .create(
                    proposed_terms.wager,
                    proposed_terms.token.clone(),
                    proposer,
                    responder,
                    *challenge_id,
                )
                .await
            {
                Ok(hold) => Some(hold.id),
                Err(EscrowError::LedgerUnavailable(msg)) => {
                    warn!(
                        challenge_id = %challenge_id,
                        error = %msg,
                        "ledger unavailable, recording round without escrow hold"
                    );
                    None
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };

        // direction_of cannot fail here: the participant check passed.
        let direction = challenge
            .direction_of(&proposer)
            .ok_or(NegotiationError::NotAParticipant {
                party: proposer,
                challenge_id: *challenge_id,
            })?;

        let round = Negotiation::new(
            *challenge_id,
            proposer,
            responder,
            direction,
            challenge.terms.clone(),
            proposed_terms,
            money_flow,
            escrow_binding,
            challenge.negotiation_count + 1,
            challenge.last_submitted_round(),
        );

        let guard = ChallengeGuard {
            active_negotiation_id: None,
            negotiation_count: challenge.negotiation_count,
        };
        challenge.status = ChallengeStatus::Negotiating;
        challenge.active_negotiation_id = Some(round.id);
        challenge.negotiation_count = round.round_number;
        challenge.record(HistoryEntry {
            negotiation_id: round.id,
            round_number: round.round_number,
            event: HistoryEvent::RoundSubmitted,
            actor: proposer,
            wager: round.proposed_terms.wager,
            timestamp: Timestamp::now(),
        });
        challenge.updated_at = Timestamp::now();

        let challenge_id = challenge.id;
        if let Err(e) = self
            .store
            .commit_round(challenge.clone(), round.clone(), guard)
            .await
        {
            // The round lost a race or the store failed: release its hold
            // so nothing dangles in PendingAcceptance.
            if let Some(escrow_id) = round.escrow_binding {
                if let Err(cancel_err) = self.escrow.cancel(&escrow_id).await {
                    warn!(
                        escrow_id = %escrow_id,
                        error = %cancel_err,
                        "failed to release hold after rejected commit"
                    );
                }
            }
            return Err(self.classify_submit_conflict(&challenge_id, e).await);
        }

        info!(
            challenge_id = %challenge_id,
            negotiation_id = %round.id,
            round = round.round_number,
            "negotiation round submitted"
        );
        self.notifier.round_submitted(&challenge, &round);
        Ok(round)
    }

    /// Accept a round. Only the designated responder may accept, and only
    /// while the round is still the challenge's outstanding round.
    ///
    /// With `finalize` the challenge goes straight to `Accepted` and the
    /// round's hold is confirmed (the responder's deposit is taken);
    /// otherwise the challenge returns to `Pending` for the normal
    /// acceptance flow and the hold stays in `PendingAcceptance`.
    pub async fn accept(
        &self,
        negotiation_id: &NegotiationId,
        responder: PartyId,
        finalize: bool,
    ) -> Result<AcceptOutcome, NegotiationError> {
        let mut round = self.store.negotiation(negotiation_id).await?;
        let mut challenge = self
            .authorize_response(&round, &responder)
            .await?;

        // A positive-wager round is only acceptable once its hold exists
        // and is still live.
        if round.proposed_terms.wager > Decimal::ZERO {
            let escrow_id = round
                .escrow_binding
                .ok_or(NegotiationError::EscrowPending {
                    negotiation_id: round.id,
                })?;
            let hold = self
                .escrow
                .hold(&escrow_id)
                .ok_or(NegotiationError::EscrowPending {
                    negotiation_id: round.id,
                })?;
            match hold.status {
                EscrowStatus::PendingAcceptance => {
                    if finalize {
                        self.escrow.accept(&escrow_id).await?;
                    }
                }
                EscrowStatus::Accepted => {}
                EscrowStatus::Cancelled | EscrowStatus::Completed => {
                    return Err(NegotiationError::EscrowPending {
                        negotiation_id: round.id,
                    });
                }
            }
        }

        let guard = ChallengeGuard {
            active_negotiation_id: Some(round.id),
            negotiation_count: challenge.negotiation_count,
        };
        round.accept()?;
        let superseded = challenge
            .escrow_binding
            .filter(|old| Some(*old) != round.escrow_binding);
        challenge.terms = round.proposed_terms.clone();
        challenge.escrow_binding = round.escrow_binding;
        challenge.status = if finalize {
            ChallengeStatus::Accepted
        } else {
            ChallengeStatus::Pending
        };
        challenge.active_negotiation_id = None;
        challenge.record(HistoryEntry {
            negotiation_id: round.id,
            round_number: round.round_number,
            event: HistoryEvent::RoundAccepted,
            actor: responder,
            wager: round.proposed_terms.wager,
            timestamp: Timestamp::now(),
        });
        challenge.updated_at = Timestamp::now();

        self.store
            .commit_resolution(challenge.clone(), round.clone(), guard)
            .await
            .map_err(|e| self.classify_resolution_conflict(&round, e))?;

        // The old hold is unreachable from the challenge now; release it.
        // Cancel is idempotent, so a failure here is retryable by an
        // operator without risk of double refund.
        if let Some(old) = superseded {
            if let Err(e) = self.escrow.cancel(&old).await {
                warn!(escrow_id = %old, error = %e, "failed to cancel superseded hold");
            }
        }

        info!(
            challenge_id = %challenge.id,
            negotiation_id = %round.id,
            status = %challenge.status,
            "negotiation round accepted"
        );
        self.notifier.round_accepted(&challenge, &round);
        Ok(AcceptOutcome {
            new_terms: challenge.terms.clone(),
            challenge_status: challenge.status,
            negotiation: round,
        })
    }

    /// Decline a round with an optional reason. The challenge stays in
    /// `Negotiating` and further rounds are permitted.
    pub async fn decline(
        &self,
        negotiation_id: &NegotiationId,
        responder: PartyId,
        reason: Option<String>,
    ) -> Result<DeclineOutcome, NegotiationError> {
        let mut round = self.store.negotiation(negotiation_id).await?;
        let mut challenge = self
            .authorize_response(&round, &responder)
            .await?;

        let guard = ChallengeGuard {
            active_negotiation_id: Some(round.id),
            negotiation_count: challenge.negotiation_count,
        };
        round.decline(reason)?;
        challenge.status = ChallengeStatus::Negotiating;
        challenge.active_negotiation_id = None;
        challenge.record(HistoryEntry {
            negotiation_id: round.id,
            round_number: round.round_number,
            event: HistoryEvent::RoundDeclined,
            actor: responder,
            wager: round.proposed_terms.wager,
            timestamp: Timestamp::now(),
        });
        challenge.updated_at = Timestamp::now();

        self.store
            .commit_resolution(challenge.clone(), round.clone(), guard)
            .await
            .map_err(|e| self.classify_resolution_conflict(&round, e))?;

        // A declined round must never leave its hold dangling. Cancel is
        // idempotent; a ledger failure here is logged, not fatal, and
        // converges on retry.
        if let Some(escrow_id) = round.escrow_binding {
            if let Err(e) = self.escrow.cancel(&escrow_id).await {
                tracing::error!(
                    escrow_id = %escrow_id,
                    negotiation_id = %round.id,
                    error = %e,
                    "declined round's hold could not be cancelled"
                );
            }
        }

        info!(
            challenge_id = %challenge.id,
            negotiation_id = %round.id,
            "negotiation round declined"
        );
        self.notifier.round_declined(&challenge, &round);
        Ok(DeclineOutcome {
            challenge_status: challenge.status,
            negotiation: round,
        })
    }

    /// Shared accept/decline precondition checks: the round must still be
    /// open, the actor must be its responder, and the challenge must still
    /// point at it as the outstanding round.
    async fn authorize_response(
        &self,
        round: &Negotiation,
        responder: &PartyId,
    ) -> Result<Challenge, NegotiationError> {
        if round.status.is_terminal() {
            return Err(NegotiationError::AlreadyResponded {
                negotiation_id: round.id,
                status: round.status,
            });
        }
        if *responder != round.to_party {
            return Err(NegotiationError::NotAuthorized {
                party: *responder,
                negotiation_id: round.id,
            });
        }
        let challenge = self.store.challenge(&round.challenge_id).await?;
        if challenge.active_negotiation_id != Some(round.id) {
            return Err(NegotiationError::StaleRound {
                negotiation_id: round.id,
            });
        }
        Ok(challenge)
    }

    /// A submit-time commit conflict means another round won the race.
    /// Re-read the challenge to report the round that beat us.
    async fn classify_submit_conflict(
        &self,
        challenge_id: &ChallengeId,
        err: StoreError,
    ) -> NegotiationError {
        if matches!(err, StoreError::Conflict(_)) {
            if let Ok(fresh) = self.store.challenge(challenge_id).await {
                if let Some(active) = fresh.active_negotiation_id {
                    return NegotiationError::NegotiationInFlight {
                        challenge_id: *challenge_id,
                        active,
                    };
                }
            }
        }
        NegotiationError::Store(err)
    }

    /// A resolution-time commit conflict means the round was superseded
    /// between our read and write.
    fn classify_resolution_conflict(
        &self,
        round: &Negotiation,
        err: StoreError,
    ) -> NegotiationError {
        if matches!(err, StoreError::Conflict(_)) {
            return NegotiationError::StaleRound {
                negotiation_id: round.id,
            };
        }
        NegotiationError::Store(err)
    }
}

impl std::fmt::Debug for NegotiationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiationService").finish_non_exhaustive()
    }
}
