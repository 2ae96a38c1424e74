//! # Dispute Store Port
//!
//! Persistence abstraction for dispute records. The safety property for
//! multiple monitor replicas lives here: [`DisputeStore::claim`] is an
//! explicit compare-and-set that moves a dispute into `Resolving` only if
//! `resolved` is still false and no other worker holds the claim, and
//! [`DisputeStore::mark_resolved`] flips `resolved` `false → true` under
//! the same discipline. A lost race is a [`StoreError::Conflict`], which
//! callers treat as "another worker owns it" and skip.

use async_trait::async_trait;
use dashmap::DashMap;

use sidepot_core::{DisputeId, StoreError, Timestamp};

use crate::dispute::{Dispute, DisputeOutcome, DisputeStatus, VoteTally};

/// Persistence port for disputes.
#[async_trait]
pub trait DisputeStore: Send + Sync {
    /// Insert a new dispute. Fails with `Conflict` if the id exists.
    async fn insert(&self, dispute: Dispute) -> Result<(), StoreError>;

    /// Fetch a dispute by id.
    async fn dispute(&self, id: &DisputeId) -> Result<Dispute, StoreError>;

    /// Record one community vote. Fails with `Conflict` once the dispute
    /// has left the `Voting` status.
    async fn record_vote(&self, id: &DisputeId, completed: bool) -> Result<Dispute, StoreError>;

    /// Disputes whose voting window has elapsed and that still need
    /// settlement: `resolved = false`, deadline ≤ `now`, status `Voting`
    /// or `ResolutionFailed` (failed settlements are re-swept).
    async fn due(&self, now: Timestamp) -> Result<Vec<Dispute>, StoreError>;

    /// All unresolved disputes.
    async fn active(&self) -> Result<Vec<Dispute>, StoreError>;

    /// Atomically claim a dispute for settlement (`→ Resolving`).
    ///
    /// Fails with `Conflict` if the dispute is already resolved or another
    /// worker holds the claim.
    async fn claim(&self, id: &DisputeId) -> Result<Dispute, StoreError>;

    /// Terminalize a claimed dispute: `resolved` flips to true, the
    /// outcome and tally snapshot are stored. Fails with `Conflict`
    /// unless the dispute is currently `Resolving` with `resolved = false`.
    async fn mark_resolved(
        &self,
        id: &DisputeId,
        outcome: DisputeOutcome,
        tally: VoteTally,
    ) -> Result<(), StoreError>;

    /// Record a settlement failure on a claimed dispute: status becomes
    /// `ResolutionFailed`, `resolved` stays false so a later sweep retries.
    async fn mark_failed(&self, id: &DisputeId, error: &str) -> Result<(), StoreError>;
}

/// In-memory dispute store backed by `DashMap`. The entry guard makes
/// every conditional update atomic per dispute.
#[derive(Debug, Default)]
pub struct InMemoryDisputeStore {
    disputes: DashMap<DisputeId, Dispute>,
}

impl InMemoryDisputeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DisputeStore for InMemoryDisputeStore {
    async fn insert(&self, dispute: Dispute) -> Result<(), StoreError> {
        let id = dispute.id;
        if self.disputes.contains_key(&id) {
            return Err(StoreError::Conflict(format!("dispute {id} already exists")));
        }
        self.disputes.insert(id, dispute);
        Ok(())
    }

    async fn dispute(&self, id: &DisputeId) -> Result<Dispute, StoreError> {
        self.disputes
            .get(id)
            .map(|d| d.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn record_vote(&self, id: &DisputeId, completed: bool) -> Result<Dispute, StoreError> {
        let mut entry = self
            .disputes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let dispute = entry.value_mut();
        if dispute.status != DisputeStatus::Voting {
            return Err(StoreError::Conflict(format!(
                "dispute {id} is {} and no longer accepts votes",
                dispute.status
            )));
        }
        if completed {
            dispute.completed_votes += 1;
        } else {
            dispute.not_completed_votes += 1;
        }
        Ok(dispute.clone())
    }

    async fn due(&self, now: Timestamp) -> Result<Vec<Dispute>, StoreError> {
        Ok(self
            .disputes
            .iter()
            .filter(|entry| {
                let d = entry.value();
                !d.resolved
                    && d.is_due(now)
                    && matches!(
                        d.status,
                        DisputeStatus::Voting | DisputeStatus::ResolutionFailed
                    )
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn active(&self) -> Result<Vec<Dispute>, StoreError> {
        Ok(self
            .disputes
            .iter()
            .filter(|entry| !entry.value().resolved)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn claim(&self, id: &DisputeId) -> Result<Dispute, StoreError> {
        let mut entry = self
            .disputes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let dispute = entry.value_mut();
        if dispute.resolved {
            return Err(StoreError::Conflict(format!(
                "dispute {id} is already resolved"
            )));
        }
        if dispute.status == DisputeStatus::Resolving {
            return Err(StoreError::Conflict(format!(
                "dispute {id} is claimed by another worker"
            )));
        }
        dispute.status = DisputeStatus::Resolving;
        Ok(dispute.clone())
    }

    async fn mark_resolved(
        &self,
        id: &DisputeId,
        outcome: DisputeOutcome,
        tally: VoteTally,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .disputes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let dispute = entry.value_mut();
        if dispute.resolved || dispute.status != DisputeStatus::Resolving {
            return Err(StoreError::Conflict(format!(
                "dispute {id} cannot be resolved from status {} (resolved={})",
                dispute.status, dispute.resolved
            )));
        }
        dispute.resolved = true;
        dispute.status = DisputeStatus::Resolved;
        dispute.final_result = Some(outcome);
        dispute.final_tally = Some(tally);
        dispute.resolved_at = Some(Timestamp::now());
        Ok(())
    }

    async fn mark_failed(&self, id: &DisputeId, error: &str) -> Result<(), StoreError> {
        let mut entry = self
            .disputes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let dispute = entry.value_mut();
        if dispute.resolved || dispute.status != DisputeStatus::Resolving {
            return Err(StoreError::Conflict(format!(
                "dispute {id} cannot be failed from status {} (resolved={})",
                dispute.status, dispute.resolved
            )));
        }
        dispute.status = DisputeStatus::ResolutionFailed;
        dispute.last_error = Some(error.to_string());
        Ok(())
    }
}
