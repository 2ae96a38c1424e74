//! # Error Types — Shared Vocabulary
//!
//! The validation and persistence errors used across the sidepot stack.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! Domain crates define their own richer error enums and embed these via
//! `#[from]` — validation failures are rejected before any side effect,
//! and store conflicts are safe to retry with fresh state.

use rust_decimal::Decimal;
use thiserror::Error;

/// Input validation failure. Always rejected before any side effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Monetary amounts must be non-negative.
    #[error("amount must be non-negative, got {0}")]
    NegativeAmount(Decimal),

    /// An escrow hold requires a strictly positive wager.
    #[error("escrow hold requires a positive wager, got {0}")]
    NonPositiveWager(Decimal),

    /// Token symbol failed validation.
    #[error("invalid token symbol {symbol:?}: {reason}")]
    InvalidToken {
        /// The rejected symbol.
        symbol: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Timestamp failed to parse.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Challenge terms require a description.
    #[error("challenge description must not be empty")]
    EmptyDescription,

    /// Expiry window must be at least one day.
    #[error("expiry window must be at least 1 day, got {0}")]
    InvalidExpiryWindow(u32),
}

/// Persistence-layer failure.
///
/// `Conflict` is the conditional-commit rejection: the record changed
/// between read and write. Callers treat it as a state conflict and retry
/// with fresh state; it never indicates data loss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A conditional commit was rejected because the guard no longer matches.
    #[error("conditional commit rejected: {0}")]
    Conflict(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn validation_error_messages() {
        let err = ValidationError::NegativeAmount(dec!(-5));
        assert!(err.to_string().contains("-5"));

        let err = ValidationError::InvalidToken {
            symbol: "xx".to_string(),
            reason: "too short".to_string(),
        };
        assert!(err.to_string().contains("xx"));
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn store_error_messages() {
        assert!(StoreError::NotFound("challenge:abc".into())
            .to_string()
            .contains("challenge:abc"));
        assert!(StoreError::Conflict("stale round".into())
            .to_string()
            .contains("stale round"));
    }
}
