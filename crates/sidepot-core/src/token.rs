//! # Token Symbols
//!
//! Validated newtype for wager denominations. A [`TokenSymbol`] is an
//! uppercase ASCII alphanumeric string of 2–12 characters (e.g., "USDC",
//! "SOL"). Which symbols a deployment actually honors is the ledger's
//! decision — this type only guarantees the string is well-formed.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated wager token symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenSymbol(String);

impl TokenSymbol {
    /// Create a token symbol, validating its form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidToken`] when the symbol is not
    /// 2–12 uppercase ASCII alphanumeric characters.
    pub fn new(symbol: impl Into<String>) -> Result<Self, ValidationError> {
        let symbol = symbol.into();
        if symbol.len() < 2 || symbol.len() > 12 {
            return Err(ValidationError::InvalidToken {
                symbol,
                reason: "length must be 2-12 characters".to_string(),
            });
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(ValidationError::InvalidToken {
                symbol,
                reason: "only uppercase ASCII letters and digits allowed".to_string(),
            });
        }
        Ok(Self(symbol))
    }

    /// Access the symbol string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
