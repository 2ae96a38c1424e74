//! # Dispute Resolution Monitor
//!
//! A timer-driven reconciler. Each cycle sweeps disputes whose voting
//! window has elapsed, claims each one through the store's compare-and-set,
//! tallies the votes, settles funds through the escrow manager, and
//! terminalizes the challenge.
//!
//! Disputes within a cycle resolve concurrently and independently — one
//! bad dispute never stops the rest of the batch. The claim discipline
//! makes any number of monitor replicas safe: a lost claim is a skip, not
//! an error, and settlement happens exactly once per dispute.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use sidepot_core::{ChallengeId, DisputeId, StoreError, Timestamp};
use sidepot_escrow::EscrowManager;
use sidepot_negotiation::{ChallengeStatus, ChallengeStore, Notifier};

use crate::dispute::{Dispute, DisputeOutcome};
use crate::error::DisputeError;
use crate::store::DisputeStore;

/// Monitor tuning. The poll interval is operational, not load-bearing for
/// correctness — the claim discipline holds at any cadence.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often the sweep runs.
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
        }
    }
}

/// Counters for one sweep cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    /// Disputes found past their deadline.
    pub due: usize,
    /// Settled this cycle.
    pub resolved: usize,
    /// Claimed by another worker.
    pub skipped: usize,
    /// Failed settlement (left for retry).
    pub failed: usize,
}

/// The periodic dispute reconciler.
pub struct DisputeMonitor {
    disputes: Arc<dyn DisputeStore>,
    challenges: Arc<dyn ChallengeStore>,
    escrow: Arc<EscrowManager>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
}

impl DisputeMonitor {
    /// Create a monitor over the given collaborators.
    pub fn new(
        disputes: Arc<dyn DisputeStore>,
        challenges: Arc<dyn ChallengeStore>,
        escrow: Arc<EscrowManager>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            disputes,
            challenges,
            escrow,
            notifier,
            config,
        }
    }

    /// Open a dispute over an accepted challenge, snapshotting its wager
    /// and fixing the voting deadline.
    pub async fn open_dispute(
        &self,
        challenge_id: &ChallengeId,
        voting_window: Duration,
    ) -> Result<Dispute, DisputeError> {
        let challenge = self.challenges.challenge(challenge_id).await?;
        if challenge.status != ChallengeStatus::Accepted {
            return Err(DisputeError::NotDisputable {
                challenge_id: *challenge_id,
                status: challenge.status,
            });
        }
        let dispute = Dispute::open(&challenge, voting_window.as_secs() as i64);
        self.disputes.insert(dispute.clone()).await?;
        info!(
            dispute_id = %dispute.id,
            challenge_id = %challenge_id,
            voting_ends_at = %dispute.voting_ends_at,
            "dispute opened"
        );
        Ok(dispute)
    }

    /// All unresolved disputes (operational hook).
    pub async fn list_active(&self) -> Result<Vec<Dispute>, DisputeError> {
        Ok(self.disputes.active().await?)
    }

    /// Fetch a dispute.
    pub async fn dispute(&self, id: &DisputeId) -> Result<Dispute, DisputeError> {
        Ok(self.disputes.dispute(id).await?)
    }

    /// Manual override: settle a dispute immediately, ignoring its
    /// deadline but honoring the claim discipline. Returns `None` when
    /// another worker already holds (or finished) the claim — invoking
    /// this twice concurrently settles funds exactly once.
    pub async fn resolve_now(
        &self,
        id: &DisputeId,
    ) -> Result<Option<DisputeOutcome>, DisputeError> {
        self.resolve_one(id).await
    }

    /// Run the sweep forever at the configured interval.
    pub async fn run(self: Arc<Self>) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "starting dispute resolution monitor"
        );
        loop {
            poll.tick().await;
            match Arc::clone(&self).run_cycle().await {
                Ok(stats) if stats.due > 0 => {
                    info!(
                        due = stats.due,
                        resolved = stats.resolved,
                        skipped = stats.skipped,
                        failed = stats.failed,
                        "dispute sweep complete"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "dispute sweep failed"),
            }
        }
    }

    /// One sweep: query due disputes and resolve them concurrently.
    /// Per-dispute failures are isolated; the cycle always completes.
    pub async fn run_cycle(self: Arc<Self>) -> Result<CycleStats, DisputeError> {
        let now = Timestamp::now();
        let due = self.disputes.due(now).await?;
        let mut stats = CycleStats {
            due: due.len(),
            ..CycleStats::default()
        };
        if due.is_empty() {
            return Ok(stats);
        }

        let mut tasks = JoinSet::new();
        for dispute in due {
            let monitor = Arc::clone(&self);
            let id = dispute.id;
            tasks.spawn(async move { monitor.resolve_one(&id).await });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(_))) => stats.resolved += 1,
                Ok(Ok(None)) => stats.skipped += 1,
                // Already logged with context inside resolve_one.
                Ok(Err(_)) => stats.failed += 1,
                Err(join_err) => {
                    stats.failed += 1;
                    error!(error = %join_err, "dispute resolution task aborted");
                }
            }
        }
        Ok(stats)
    }

    /// Claim and settle one dispute. `Ok(None)` means another worker owns
    /// the claim. On a settlement error the dispute flips to
    /// `ResolutionFailed` (still unresolved, so a later sweep retries) and
    /// the challenge is flagged.
    async fn resolve_one(
        &self,
        id: &DisputeId,
    ) -> Result<Option<DisputeOutcome>, DisputeError> {
        let dispute = match self.disputes.claim(id).await {
            Ok(dispute) => dispute,
            Err(StoreError::Conflict(reason)) => {
                debug!(dispute_id = %id, reason, "dispute claim lost, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match self.settle(&dispute).await {
            Ok(outcome) => {
                self.disputes
                    .mark_resolved(id, outcome, dispute.tally())
                    .await?;
                info!(
                    dispute_id = %id,
                    challenge_id = %dispute.challenge_id,
                    outcome = %outcome,
                    completed_votes = dispute.completed_votes,
                    not_completed_votes = dispute.not_completed_votes,
                    "dispute resolved"
                );
                self.notifier
                    .dispute_resolved(&dispute.challenge_id, outcome.as_str());
                Ok(Some(outcome))
            }
            Err(e) => {
                error!(
                    dispute_id = %id,
                    challenge_id = %dispute.challenge_id,
                    error = %e,
                    "dispute settlement failed, leaving for retry"
                );
                if let Err(mark_err) = self.disputes.mark_failed(id, &e.to_string()).await {
                    error!(dispute_id = %id, error = %mark_err, "failed to record settlement failure");
                }
                self.flag_challenge(&dispute.challenge_id).await;
                Err(e)
            }
        }
    }

    /// Tally the votes and move the funds. The challenge terminalizes
    /// according to the outcome; the dispute record itself is updated by
    /// the caller.
    async fn settle(&self, dispute: &Dispute) -> Result<DisputeOutcome, DisputeError> {
        let outcome = dispute.tally().outcome();
        let mut challenge = self.challenges.challenge(&dispute.challenge_id).await?;

        // Zero-wager disputes settle status only; there are no funds.
        if dispute.wager > Decimal::ZERO {
            let escrow_id = challenge
                .escrow_binding
                .ok_or(DisputeError::EscrowMissing {
                    challenge_id: challenge.id,
                    wager: dispute.wager,
                })?;
            match outcome {
                DisputeOutcome::Tie => {
                    self.escrow.refund_tie(&escrow_id).await?;
                }
                DisputeOutcome::RecipientWins => {
                    self.escrow.complete(&escrow_id, &challenge.recipient).await?;
                }
                DisputeOutcome::InitiatorWins => {
                    self.escrow.complete(&escrow_id, &challenge.initiator).await?;
                }
            }
        }

        challenge.status = match outcome {
            DisputeOutcome::RecipientWins => ChallengeStatus::Completed,
            DisputeOutcome::InitiatorWins => ChallengeStatus::Failed,
            DisputeOutcome::Tie => ChallengeStatus::TieResolved,
        };
        challenge.updated_at = Timestamp::now();
        self.challenges.update_challenge(challenge).await?;
        Ok(outcome)
    }

    /// Best-effort: flag the challenge while its dispute awaits retry.
    async fn flag_challenge(&self, challenge_id: &ChallengeId) {
        match self.challenges.challenge(challenge_id).await {
            Ok(mut challenge) => {
                challenge.status = ChallengeStatus::ResolutionFailed;
                challenge.updated_at = Timestamp::now();
                if let Err(e) = self.challenges.update_challenge(challenge).await {
                    error!(challenge_id = %challenge_id, error = %e, "failed to flag challenge");
                }
            }
            Err(e) => {
                error!(challenge_id = %challenge_id, error = %e, "failed to load challenge for flagging");
            }
        }
    }
}

impl std::fmt::Debug for DisputeMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisputeMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDisputeStore;
    use rust_decimal_macros::dec;
    use sidepot_core::{PartyId, TokenSymbol};
    use sidepot_escrow::{InMemoryLedger, Ledger};
    use sidepot_negotiation::{
        Challenge, ChallengeTerms, InMemoryChallengeStore, NegotiationService, NullNotifier,
    };

    fn usdc() -> TokenSymbol {
        TokenSymbol::new("USDC").unwrap()
    }

    fn terms(wager: Decimal) -> ChallengeTerms {
        ChallengeTerms {
            description: "cold shower every day in March".to_string(),
            wager,
            token: usdc(),
            expiry_days: 31,
        }
    }

    struct Fixture {
        negotiation: NegotiationService,
        monitor: Arc<DisputeMonitor>,
        disputes: Arc<InMemoryDisputeStore>,
        ledger: Arc<InMemoryLedger>,
        initiator: PartyId,
        recipient: PartyId,
    }

    fn fixture() -> Fixture {
        let initiator = PartyId::new();
        let recipient = PartyId::new();
        let ledger = Arc::new(InMemoryLedger::new(PartyId::new(), [usdc()]));
        ledger.credit(initiator, usdc(), dec!(1000));
        ledger.credit(recipient, usdc(), dec!(1000));
        let escrow = Arc::new(EscrowManager::new(ledger.clone()));
        let challenges = Arc::new(InMemoryChallengeStore::new());
        let disputes = Arc::new(InMemoryDisputeStore::new());
        let negotiation = NegotiationService::new(
            challenges.clone(),
            escrow.clone(),
            Arc::new(NullNotifier),
        );
        let monitor = Arc::new(DisputeMonitor::new(
            disputes.clone(),
            challenges,
            escrow,
            Arc::new(NullNotifier),
            MonitorConfig::default(),
        ));
        Fixture {
            negotiation,
            monitor,
            disputes,
            ledger,
            initiator,
            recipient,
        }
    }

    /// An accepted challenge with a live (both-deposits) escrow hold.
    async fn accepted_challenge(fx: &Fixture, wager: Decimal) -> Challenge {
        let challenge = fx
            .negotiation
            .create_challenge(fx.initiator, fx.recipient, terms(wager))
            .await
            .unwrap();
        let round = fx
            .negotiation
            .submit(&challenge.id, fx.initiator, terms(wager))
            .await
            .unwrap();
        fx.negotiation
            .accept(&round.id, fx.recipient, true)
            .await
            .unwrap();
        fx.negotiation.challenge(&challenge.id).await.unwrap()
    }

    #[tokio::test]
    async fn open_dispute_requires_accepted_challenge() {
        let fx = fixture();
        let challenge = fx
            .negotiation
            .create_challenge(fx.initiator, fx.recipient, terms(dec!(5)))
            .await
            .unwrap();
        let result = fx
            .monitor
            .open_dispute(&challenge.id, Duration::from_secs(3600))
            .await;
        assert!(matches!(result, Err(DisputeError::NotDisputable { .. })));
    }

    #[tokio::test]
    async fn zero_votes_resolve_as_tie_with_refunds() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(1)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::ZERO)
            .await
            .unwrap();

        let stats = fx.monitor.clone().run_cycle().await.unwrap();
        assert_eq!(stats.due, 1);
        assert_eq!(stats.resolved, 1);

        let stored = fx.monitor.dispute(&dispute.id).await.unwrap();
        assert!(stored.resolved);
        assert_eq!(stored.final_result, Some(DisputeOutcome::Tie));
        assert_eq!(
            stored.final_tally,
            Some(crate::dispute::VoteTally {
                completed: 0,
                not_completed: 0
            })
        );

        // Each party deposited 1 and got 0.975 back; 0.05 went to fees.
        assert_eq!(
            fx.ledger.balance_of(&fx.initiator, &usdc()).await.unwrap(),
            dec!(999.975)
        );
        assert_eq!(
            fx.ledger.balance_of(&fx.recipient, &usdc()).await.unwrap(),
            dec!(999.975)
        );

        let settled = fx.negotiation.challenge(&challenge.id).await.unwrap();
        assert_eq!(settled.status, ChallengeStatus::TieResolved);
    }

    #[tokio::test]
    async fn majority_completed_pays_recipient() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::ZERO)
            .await
            .unwrap();
        for _ in 0..3 {
            fx.disputes.record_vote(&dispute.id, true).await.unwrap();
        }
        fx.disputes.record_vote(&dispute.id, false).await.unwrap();

        let stats = fx.monitor.clone().run_cycle().await.unwrap();
        assert_eq!(stats.resolved, 1);

        let stored = fx.monitor.dispute(&dispute.id).await.unwrap();
        assert_eq!(stored.final_result, Some(DisputeOutcome::RecipientWins));

        // Recipient deposited 5 and received the 9.75 payout of the 10 pot.
        assert_eq!(
            fx.ledger.balance_of(&fx.recipient, &usdc()).await.unwrap(),
            dec!(1004.75)
        );
        assert_eq!(
            fx.ledger.balance_of(&fx.initiator, &usdc()).await.unwrap(),
            dec!(995)
        );

        let settled = fx.negotiation.challenge(&challenge.id).await.unwrap();
        assert_eq!(settled.status, ChallengeStatus::Completed);
    }

    #[tokio::test]
    async fn majority_not_completed_pays_initiator() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::ZERO)
            .await
            .unwrap();
        fx.disputes.record_vote(&dispute.id, false).await.unwrap();

        fx.monitor.clone().run_cycle().await.unwrap();

        let stored = fx.monitor.dispute(&dispute.id).await.unwrap();
        assert_eq!(stored.final_result, Some(DisputeOutcome::InitiatorWins));
        assert_eq!(
            fx.ledger.balance_of(&fx.initiator, &usdc()).await.unwrap(),
            dec!(1004.75)
        );

        let settled = fx.negotiation.challenge(&challenge.id).await.unwrap();
        assert_eq!(settled.status, ChallengeStatus::Failed);
    }

    #[tokio::test]
    async fn sweep_ignores_disputes_still_voting() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        fx.monitor
            .open_dispute(&challenge.id, Duration::from_secs(3600))
            .await
            .unwrap();

        let stats = fx.monitor.clone().run_cycle().await.unwrap();
        assert_eq!(stats.due, 0);
        assert_eq!(stats.resolved, 0);
    }

    #[tokio::test]
    async fn resolve_now_overrides_the_deadline() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::from_secs(3600))
            .await
            .unwrap();

        let outcome = fx.monitor.resolve_now(&dispute.id).await.unwrap();
        assert_eq!(outcome, Some(DisputeOutcome::Tie));
        assert!(fx.monitor.dispute(&dispute.id).await.unwrap().resolved);
    }

    #[tokio::test]
    async fn concurrent_resolve_now_settles_exactly_once() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::ZERO)
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            fx.monitor.resolve_now(&dispute.id),
            fx.monitor.resolve_now(&dispute.id)
        );
        let outcomes = [first.unwrap(), second.unwrap()];
        // Exactly one call performed the settlement.
        assert_eq!(outcomes.iter().filter(|o| o.is_some()).count(), 1);

        // Tie refund applied once: each party is at 1000 - 5 + 4.875.
        assert_eq!(
            fx.ledger.balance_of(&fx.initiator, &usdc()).await.unwrap(),
            dec!(999.875)
        );
        assert_eq!(
            fx.ledger.balance_of(&fx.recipient, &usdc()).await.unwrap(),
            dec!(999.875)
        );
    }

    #[tokio::test]
    async fn failed_settlement_is_retried_by_a_later_cycle() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::ZERO)
            .await
            .unwrap();

        fx.ledger.set_offline(true);
        let stats = fx.monitor.clone().run_cycle().await.unwrap();
        assert_eq!(stats.failed, 1);

        let stored = fx.monitor.dispute(&dispute.id).await.unwrap();
        assert_eq!(stored.status, crate::dispute::DisputeStatus::ResolutionFailed);
        assert!(!stored.resolved);
        assert!(stored.last_error.is_some());
        let flagged = fx.negotiation.challenge(&challenge.id).await.unwrap();
        assert_eq!(flagged.status, ChallengeStatus::ResolutionFailed);

        // The outage clears; the next sweep settles the dispute.
        fx.ledger.set_offline(false);
        let stats = fx.monitor.clone().run_cycle().await.unwrap();
        assert_eq!(stats.resolved, 1);
        let stored = fx.monitor.dispute(&dispute.id).await.unwrap();
        assert!(stored.resolved);
        let settled = fx.negotiation.challenge(&challenge.id).await.unwrap();
        assert_eq!(settled.status, ChallengeStatus::TieResolved);
    }

    #[tokio::test]
    async fn list_active_excludes_resolved() {
        let fx = fixture();
        let challenge = accepted_challenge(&fx, dec!(5)).await;
        let dispute = fx
            .monitor
            .open_dispute(&challenge.id, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(fx.monitor.list_active().await.unwrap().len(), 1);

        fx.monitor.resolve_now(&dispute.id).await.unwrap();
        assert!(fx.monitor.list_active().await.unwrap().is_empty());
    }
}
