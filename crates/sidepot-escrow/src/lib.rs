//! # sidepot-escrow — Escrow Lifecycle Management
//!
//! Wraps the external ledger service and owns the escrow hold lifecycle:
//!
//! - **Hold** ([`hold`]): the [`EscrowHold`] record and its validated
//!   status machine (`PendingAcceptance → Accepted → Completed | Cancelled`)
//!   with an append-only transition log.
//!
//! - **Ledger** ([`ledger`]): the async [`Ledger`] port abstracting the
//!   external settlement service, plus [`InMemoryLedger`], a reference
//!   implementation with per-party token balances used in development and
//!   tests.
//!
//! - **Manager** ([`manager`]): [`EscrowManager`], the lifecycle
//!   orchestrator. Ledger confirmation is the commit point — local hold
//!   state only advances after the ledger acknowledges, and repeated
//!   completion calls replay the stored receipt instead of settling twice.
//!
//! ## Crate Policy
//!
//! - Monetary figures always derive from `sidepot_core::fees`; a hold whose
//!   breakdown fails the consistency check is an integrity violation and is
//!   refused loudly.

pub mod error;
pub mod hold;
pub mod ledger;
pub mod manager;

// Re-export primary types for ergonomic imports.
pub use error::EscrowError;
pub use hold::{EscrowHold, EscrowStatus, HoldTransitionRecord, PayoutReceipt, TieRefundReceipts};
pub use ledger::{HoldRequest, InMemoryLedger, Ledger, LedgerReceipt};
pub use manager::EscrowManager;
