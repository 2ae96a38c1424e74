//! # sidepot-core — Foundational Types
//!
//! The bedrock of the sidepot stack. Defines the primitives every other
//! crate builds on:
//!
//! - **Identity** ([`identity`]): UUID newtypes for every identifier
//!   namespace (`PartyId`, `ChallengeId`, `NegotiationId`, `DisputeId`,
//!   `EscrowId`). No bare strings or raw UUIDs cross a crate boundary.
//!
//! - **Temporal** ([`temporal`]): UTC-only, seconds-precision [`Timestamp`]
//!   with RFC 3339 `Z` rendering and deadline arithmetic.
//!
//! - **Token** ([`token`]): validated [`TokenSymbol`] newtype for wager
//!   denominations.
//!
//! - **Fees** ([`fees`]): the pure fee calculator. Pot, fee, payout, and
//!   tie-refund figures derive from a wager amount through exact
//!   [`rust_decimal::Decimal`] arithmetic — monetary values are never
//!   floats, and rounding happens only at display.
//!
//! - **Error** ([`error`]): the shared validation and persistence error
//!   vocabulary.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sidepot-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod fees;
pub mod identity;
pub mod temporal;
pub mod token;

// Re-export primary types for ergonomic imports.
pub use error::{StoreError, ValidationError};
pub use fees::{FeeBreakdown, WagerDiff, DEFAULT_FEE_RATE};
pub use identity::{ChallengeId, DisputeId, EscrowId, NegotiationId, PartyId};
pub use temporal::Timestamp;
pub use token::TokenSymbol;
