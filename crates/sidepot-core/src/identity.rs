//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier namespace in the sidepot stack.
//! You cannot pass a `NegotiationId` where an `EscrowId` is expected —
//! cross-namespace confusion is a compile error, not a runtime surprise.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a participant (challenge party).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(pub Uuid);

/// Unique identifier for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId(pub Uuid);

/// Unique identifier for a single negotiation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NegotiationId(pub Uuid);

/// Unique identifier for a dispute proceeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisputeId(pub Uuid);

/// Unique identifier for an escrow hold (ledger transaction reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowId(pub Uuid);

impl PartyId {
    /// Generate a new random party identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a party identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl ChallengeId {
    /// Generate a new random challenge identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a challenge identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl NegotiationId {
    /// Generate a new random negotiation identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a negotiation identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl DisputeId {
    /// Generate a new random dispute identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a dispute identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl EscrowId {
    /// Generate a new random escrow identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an escrow identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PartyId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for NegotiationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for DisputeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for EscrowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "party:{}", self.0)
    }
}

impl std::fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "challenge:{}", self.0)
    }
}

impl std::fmt::Display for NegotiationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "negotiation:{}", self.0)
    }
}

impl std::fmt::Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}

impl std::fmt::Display for EscrowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}
