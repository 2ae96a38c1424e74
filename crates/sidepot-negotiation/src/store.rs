//! # Challenge Store Port
//!
//! Persistence abstraction over challenge and negotiation records. The
//! protocol's ordering guarantee lives here: every round write commits as
//! a single conditional batch guarded by [`ChallengeGuard`] — the stored
//! challenge must still carry the expected `active_negotiation_id` and
//! `negotiation_count`, otherwise the commit is rejected with
//! [`StoreError::Conflict`] and no write occurs.
//!
//! [`InMemoryChallengeStore`] is the reference implementation. The
//! challenge's map entry guard is the linearization point: guard check,
//! negotiation write, and challenge write all happen under it, so
//! concurrent submits or a stale accept can never interleave on the same
//! challenge.

use async_trait::async_trait;
use dashmap::DashMap;

use sidepot_core::{ChallengeId, NegotiationId, StoreError};

use crate::challenge::Challenge;
use crate::round::Negotiation;

/// Expected challenge state for a conditional commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeGuard {
    /// Expected outstanding round.
    pub active_negotiation_id: Option<NegotiationId>,
    /// Expected round counter.
    pub negotiation_count: u32,
}

/// Persistence port for challenges and their negotiation rounds.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert a new challenge. Fails with `Conflict` if the id exists.
    async fn insert_challenge(&self, challenge: Challenge) -> Result<(), StoreError>;

    /// Fetch a challenge by id.
    async fn challenge(&self, id: &ChallengeId) -> Result<Challenge, StoreError>;

    /// Overwrite a challenge unconditionally (dispute settlement path).
    async fn update_challenge(&self, challenge: Challenge) -> Result<(), StoreError>;

    /// Fetch a negotiation round by id.
    async fn negotiation(&self, id: &NegotiationId) -> Result<Negotiation, StoreError>;

    /// All rounds of a challenge, newest first.
    async fn negotiations_for(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Negotiation>, StoreError>;

    /// Atomically insert a new round and update its challenge, iff the
    /// stored challenge still matches `guard`.
    async fn commit_round(
        &self,
        challenge: Challenge,
        round: Negotiation,
        guard: ChallengeGuard,
    ) -> Result<(), StoreError>;

    /// Atomically update a resolved round and its challenge, iff the
    /// stored challenge still matches `guard`.
    async fn commit_resolution(
        &self,
        challenge: Challenge,
        round: Negotiation,
        guard: ChallengeGuard,
    ) -> Result<(), StoreError>;
}

/// In-memory challenge store backed by `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryChallengeStore {
    challenges: DashMap<ChallengeId, Challenge>,
    negotiations: DashMap<NegotiationId, Negotiation>,
}

impl InMemoryChallengeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the stored challenge against the guard. Must be called with
    /// the challenge entry guard held.
    fn check_guard(stored: &Challenge, guard: &ChallengeGuard) -> Result<(), StoreError> {
        if stored.active_negotiation_id != guard.active_negotiation_id
            || stored.negotiation_count != guard.negotiation_count
        {
            return Err(StoreError::Conflict(format!(
                "challenge {} changed: active={:?} count={}",
                stored.id, stored.active_negotiation_id, stored.negotiation_count
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn insert_challenge(&self, challenge: Challenge) -> Result<(), StoreError> {
        let id = challenge.id;
        if self.challenges.contains_key(&id) {
            return Err(StoreError::Conflict(format!(
                "challenge {id} already exists"
            )));
        }
        self.challenges.insert(id, challenge);
        Ok(())
    }

    async fn challenge(&self, id: &ChallengeId) -> Result<Challenge, StoreError> {
        self.challenges
            .get(id)
            .map(|c| c.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_challenge(&self, challenge: Challenge) -> Result<(), StoreError> {
        let mut entry = self
            .challenges
            .get_mut(&challenge.id)
            .ok_or_else(|| StoreError::NotFound(challenge.id.to_string()))?;
        *entry.value_mut() = challenge;
        Ok(())
    }

    async fn negotiation(&self, id: &NegotiationId) -> Result<Negotiation, StoreError> {
        self.negotiations
            .get(id)
            .map(|n| n.value().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn negotiations_for(
        &self,
        challenge_id: &ChallengeId,
    ) -> Result<Vec<Negotiation>, StoreError> {
        let mut rounds: Vec<Negotiation> = self
            .negotiations
            .iter()
            .filter(|entry| entry.value().challenge_id == *challenge_id)
            .map(|entry| entry.value().clone())
            .collect();
        rounds.sort_by(|a, b| b.round_number.cmp(&a.round_number));
        Ok(rounds)
    }

    async fn commit_round(
        &self,
        challenge: Challenge,
        round: Negotiation,
        guard: ChallengeGuard,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .challenges
            .get_mut(&challenge.id)
            .ok_or_else(|| StoreError::NotFound(challenge.id.to_string()))?;
        Self::check_guard(entry.value(), &guard)?;
        self.negotiations.insert(round.id, round);
        *entry.value_mut() = challenge;
        Ok(())
    }

    async fn commit_resolution(
        &self,
        challenge: Challenge,
        round: Negotiation,
        guard: ChallengeGuard,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .challenges
            .get_mut(&challenge.id)
            .ok_or_else(|| StoreError::NotFound(challenge.id.to_string()))?;
        Self::check_guard(entry.value(), &guard)?;
        self.negotiations.insert(round.id, round);
        *entry.value_mut() = challenge;
        Ok(())
    }
}
