//! # sidepot-dispute — Dispute Resolution Monitor
//!
//! Resolves contested challenge outcomes through timed community voting:
//!
//! - **Dispute** ([`dispute`]): the dispute record with its vote counters,
//!   fixed voting deadline, and the `resolved` re-entrancy guard. The
//!   wager snapshot is taken at open time — later renegotiation cannot
//!   retroactively change a dispute already open.
//!
//! - **Store** ([`store`]): the [`DisputeStore`] port. The claim operation
//!   is an explicit compare-and-set — a dispute is moved to `Resolving`
//!   only if `resolved` is still false, so any number of monitor replicas
//!   settle each dispute exactly once.
//!
//! - **Monitor** ([`monitor`]): the periodic reconciler. Each cycle sweeps
//!   disputes past their deadline, claims them, tallies votes (absence of
//!   votes is a tie, not a default winner), settles funds through
//!   `sidepot_escrow`, and terminalizes the challenge. A failed settlement
//!   flips the dispute to `ResolutionFailed` with `resolved` still false,
//!   so a later cycle or an operator retry can settle it — a dispute is
//!   never silently lost.

pub mod dispute;
pub mod error;
pub mod monitor;
pub mod store;

// Re-export primary types for ergonomic imports.
pub use dispute::{Dispute, DisputeOutcome, DisputeStatus, VoteTally};
pub use error::DisputeError;
pub use monitor::{CycleStats, DisputeMonitor, MonitorConfig};
pub use store::{DisputeStore, InMemoryDisputeStore};
