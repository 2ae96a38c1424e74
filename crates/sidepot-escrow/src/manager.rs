//! # Escrow Lifecycle Manager
//!
//! Orchestrates hold creation, cancellation, acceptance, and settlement
//! against the [`Ledger`] port. Ledger confirmation is the commit point:
//! local hold state only advances after the ledger acknowledges, so a
//! transport failure never leaves phantom local state.
//!
//! Settlement operations are idempotent. A repeated `complete` with the
//! same winner replays the stored receipt instead of paying twice; a
//! repeated `cancel` is a no-op.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{error, info};

use sidepot_core::{fees, ChallengeId, EscrowId, PartyId, TokenSymbol, ValidationError};

use crate::error::EscrowError;
use crate::hold::{EscrowHold, EscrowStatus, PayoutReceipt, TieRefundReceipts};
use crate::ledger::{HoldRequest, Ledger};

/// Escrow lifecycle manager.
///
/// Holds are kept in memory keyed by [`EscrowId`]; the ledger is the
/// external system of record for funds. Hydrate from persistence with
/// [`EscrowManager::insert`].
pub struct EscrowManager {
    ledger: Arc<dyn Ledger>,
    holds: DashMap<EscrowId, EscrowHold>,
}

impl EscrowManager {
    /// Create a manager over the given ledger.
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            holds: DashMap::new(),
        }
    }

    /// Fetch a hold by identifier.
    pub fn hold(&self, id: &EscrowId) -> Option<EscrowHold> {
        self.holds.get(id).map(|h| h.value().clone())
    }

    /// Insert a hold record directly (hydration from persistence).
    pub fn insert(&self, hold: EscrowHold) {
        self.holds.insert(hold.id, hold);
    }

    /// Open a hold for a positive wager: derives the breakdown, debits the
    /// challenger through the ledger, and records the hold in
    /// `PendingAcceptance`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NonPositiveWager`] before any ledger call.
    /// - [`EscrowError::InsufficientFunds`] / [`EscrowError::UnsupportedToken`]
    ///   from the ledger.
    /// - [`EscrowError::LedgerUnavailable`] on transport failure — the
    ///   caller decides whether the surrounding operation survives.
    pub async fn create(
        &self,
        wager: Decimal,
        token: TokenSymbol,
        challenger: PartyId,
        challengee: PartyId,
        challenge_id: ChallengeId,
    ) -> Result<EscrowHold, EscrowError> {
        if wager <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveWager(wager).into());
        }
        let breakdown = fees::breakdown(wager);

        let id = self
            .ledger
            .create_hold(HoldRequest {
                challenge_id,
                challenger,
                challengee,
                amount: wager,
                token: token.clone(),
            })
            .await?;

        let hold = EscrowHold::new(
            id,
            challenge_id,
            challenger,
            challengee,
            wager,
            token,
            breakdown,
        );
        self.holds.insert(id, hold.clone());
        info!(escrow_id = %id, challenge_id = %challenge_id, wager = %wager, "escrow hold created");
        Ok(hold)
    }

    /// Cancel a hold and return its deposits.
    ///
    /// No-op if the hold is already cancelled, so retried declines
    /// converge instead of erroring.
    pub async fn cancel(&self, id: &EscrowId) -> Result<(), EscrowError> {
        let status = self.status_of(id)?;
        match status {
            EscrowStatus::Cancelled => return Ok(()),
            EscrowStatus::Completed => {
                return Err(EscrowError::InvalidTransition {
                    from: status.as_str().to_string(),
                    to: EscrowStatus::Cancelled.as_str().to_string(),
                })
            }
            EscrowStatus::PendingAcceptance | EscrowStatus::Accepted => {}
        }

        self.ledger.cancel_hold(id).await?;

        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let hold = entry.value_mut();
        // A concurrent cancel may have won the race after the ledger call.
        if hold.status == EscrowStatus::Cancelled {
            return Ok(());
        }
        hold.try_transition(EscrowStatus::Cancelled, "hold cancelled, deposits returned")?;
        info!(escrow_id = %id, "escrow hold cancelled");
        Ok(())
    }

    /// Record the challengee's matching deposit (`PendingAcceptance → Accepted`).
    pub async fn accept(&self, id: &EscrowId) -> Result<EscrowHold, EscrowError> {
        let status = self.status_of(id)?;
        if status != EscrowStatus::PendingAcceptance {
            return Err(EscrowError::InvalidTransition {
                from: status.as_str().to_string(),
                to: EscrowStatus::Accepted.as_str().to_string(),
            });
        }

        self.ledger.confirm_hold(id).await?;

        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let hold = entry.value_mut();
        hold.try_transition(EscrowStatus::Accepted, "counterparty deposit confirmed")?;
        info!(escrow_id = %id, "escrow hold accepted");
        Ok(hold.clone())
    }

    /// Settle a live hold to a decisive winner.
    ///
    /// Pays `winner_payout` to the winner and the fee to the platform
    /// collection account. A repeat call with the same winner replays the
    /// stored receipt; a repeat with a different winner (or after a tie
    /// refund) fails with [`EscrowError::AlreadyCompleted`].
    pub async fn complete(
        &self,
        id: &EscrowId,
        winner: &PartyId,
    ) -> Result<PayoutReceipt, EscrowError> {
        let hold = self.hold(id).ok_or(EscrowError::NotFound(*id))?;
        if !hold.is_party(winner) {
            return Err(EscrowError::WinnerNotParty {
                escrow_id: *id,
                party: *winner,
            });
        }
        if hold.status == EscrowStatus::Completed {
            return match &hold.payout_receipt {
                Some(receipt) if receipt.winner == *winner => {
                    info!(escrow_id = %id, "repeated completion, replaying stored receipt");
                    Ok(receipt.clone())
                }
                _ => Err(EscrowError::AlreadyCompleted(*id)),
            };
        }
        if hold.status != EscrowStatus::Accepted {
            return Err(EscrowError::InvalidTransition {
                from: hold.status.as_str().to_string(),
                to: EscrowStatus::Completed.as_str().to_string(),
            });
        }
        self.ensure_consistent(&hold)?;

        let ledger_receipt = self
            .ledger
            .settle_hold(id, winner, hold.breakdown.winner_payout, hold.breakdown.fee)
            .await?;

        let receipt = PayoutReceipt {
            escrow_id: *id,
            winner: *winner,
            amount: hold.breakdown.winner_payout,
            fee: hold.breakdown.fee,
            token: hold.token.clone(),
            ledger_reference: ledger_receipt.reference,
            settled_at: ledger_receipt.recorded_at,
        };

        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let stored = entry.value_mut();
        stored.try_transition(EscrowStatus::Completed, "winner payout settled")?;
        stored.payout_receipt = Some(receipt.clone());
        info!(escrow_id = %id, winner = %winner, payout = %receipt.amount, "escrow hold completed");
        Ok(receipt)
    }

    /// Refund a live hold as a tie: both depositors receive half the
    /// post-fee pot, the fee goes to the platform account.
    ///
    /// A repeat call replays the stored receipts.
    pub async fn refund_tie(&self, id: &EscrowId) -> Result<TieRefundReceipts, EscrowError> {
        let hold = self.hold(id).ok_or(EscrowError::NotFound(*id))?;
        if hold.status == EscrowStatus::Completed {
            return match &hold.tie_receipts {
                Some(receipts) => {
                    info!(escrow_id = %id, "repeated tie refund, replaying stored receipts");
                    Ok(receipts.clone())
                }
                None => Err(EscrowError::AlreadyCompleted(*id)),
            };
        }
        if hold.status != EscrowStatus::Accepted {
            return Err(EscrowError::InvalidTransition {
                from: hold.status.as_str().to_string(),
                to: EscrowStatus::Completed.as_str().to_string(),
            });
        }
        self.ensure_consistent(&hold)?;
        let refund_per_party = fees::tie_refund(&hold.breakdown);

        let (challenger_receipt, challengee_receipt) = self
            .ledger
            .refund_hold(id, refund_per_party, hold.breakdown.fee)
            .await?;

        let receipts = TieRefundReceipts {
            escrow_id: *id,
            refund_per_party,
            fee: hold.breakdown.fee,
            token: hold.token.clone(),
            challenger_reference: challenger_receipt.reference,
            challengee_reference: challengee_receipt.reference,
            refunded_at: challenger_receipt.recorded_at,
        };

        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let stored = entry.value_mut();
        stored.try_transition(EscrowStatus::Completed, "tie refund settled")?;
        stored.tie_receipts = Some(receipts.clone());
        info!(escrow_id = %id, refund = %refund_per_party, "escrow hold refunded as tie");
        Ok(receipts)
    }

    fn status_of(&self, id: &EscrowId) -> Result<EscrowStatus, EscrowError> {
        self.holds
            .get(id)
            .map(|h| h.status)
            .ok_or(EscrowError::NotFound(*id))
    }

    /// Refuse to settle a hold whose money figures disagree. This is an
    /// integrity violation, not a business error.
    fn ensure_consistent(&self, hold: &EscrowHold) -> Result<(), EscrowError> {
        if hold.breakdown.is_consistent() {
            return Ok(());
        }
        error!(
            escrow_id = %hold.id,
            fee = %hold.breakdown.fee,
            payout = %hold.breakdown.winner_payout,
            pot = %hold.breakdown.total_pot,
            "escrow breakdown inconsistent, refusing settlement"
        );
        Err(EscrowError::BreakdownInconsistent {
            escrow_id: hold.id,
            fee: hold.breakdown.fee,
            winner_payout: hold.breakdown.winner_payout,
            total_pot: hold.breakdown.total_pot,
        })
    }
}

impl std::fmt::Debug for EscrowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowManager")
            .field("holds", &self.holds.len())
            .finish()
    }
}
