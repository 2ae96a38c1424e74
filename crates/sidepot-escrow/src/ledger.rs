//! # Ledger Port
//!
//! The async [`Ledger`] trait abstracts the external settlement service:
//! deposits, releases, and balance queries are network calls with their own
//! retry and timeout semantics, treated as opaque here. Implementations
//! must surface transport failures as [`EscrowError::LedgerUnavailable`] —
//! never as success.
//!
//! [`InMemoryLedger`] is the reference implementation: per-party token
//! balances, double-entry hold accounting, and a platform fee account. It
//! backs development deployments and every test in the workspace, and can
//! be switched "offline" to exercise outage paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sidepot_core::{ChallengeId, EscrowId, PartyId, Timestamp, TokenSymbol};

use crate::error::EscrowError;

// ── Wire Types ─────────────────────────────────────────────────────────

/// Request to open a new hold. The challenger's deposit is taken
/// immediately; the challengee's on confirmation.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    /// The challenge this hold backs.
    pub challenge_id: ChallengeId,
    /// The party depositing now.
    pub challenger: PartyId,
    /// The party expected to match the deposit.
    pub challengee: PartyId,
    /// Wager amount per party.
    pub amount: Decimal,
    /// Wager token.
    pub token: TokenSymbol,
}

/// Confirmation of a single ledger-side transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Opaque ledger transaction reference.
    pub reference: String,
    /// The credited party.
    pub party: PartyId,
    /// Transfer token.
    pub token: TokenSymbol,
    /// Transfer amount.
    pub amount: Decimal,
    /// When the ledger recorded the transfer.
    pub recorded_at: Timestamp,
}

// ── The Port ───────────────────────────────────────────────────────────

/// Abstraction over the external escrow/settlement ledger.
///
/// All methods are blocking I/O from the caller's perspective; callers
/// apply bounded timeouts and treat a timeout as `LedgerUnavailable`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Open a hold, debiting the challenger's deposit.
    async fn create_hold(&self, request: HoldRequest) -> Result<EscrowId, EscrowError>;

    /// Record the challengee's matching deposit.
    async fn confirm_hold(&self, id: &EscrowId) -> Result<(), EscrowError>;

    /// Release the hold, returning all recorded deposits. Idempotent:
    /// cancelling an already-released hold is a no-op.
    async fn cancel_hold(&self, id: &EscrowId) -> Result<(), EscrowError>;

    /// Pay `payout` to the winner and `fee` to the platform account.
    async fn settle_hold(
        &self,
        id: &EscrowId,
        winner: &PartyId,
        payout: Decimal,
        fee: Decimal,
    ) -> Result<LedgerReceipt, EscrowError>;

    /// Refund `refund_per_party` to each depositor and `fee` to the
    /// platform account.
    async fn refund_hold(
        &self,
        id: &EscrowId,
        refund_per_party: Decimal,
        fee: Decimal,
    ) -> Result<(LedgerReceipt, LedgerReceipt), EscrowError>;

    /// The party's available balance in the given token.
    async fn balance_of(&self, party: &PartyId, token: &TokenSymbol)
        -> Result<Decimal, EscrowError>;
}

// ── In-Memory Reference Implementation ─────────────────────────────────

#[derive(Debug, Clone)]
struct LedgerHold {
    challenger: PartyId,
    challengee: PartyId,
    token: TokenSymbol,
    amount: Decimal,
    challenger_deposited: bool,
    challengee_deposited: bool,
    released: bool,
}

/// In-memory ledger with per-party token balances.
///
/// Thread-safe via `DashMap`; balance check and debit run under a single
/// entry guard so concurrent holds cannot overdraw an account.
pub struct InMemoryLedger {
    fee_account: PartyId,
    supported: HashSet<TokenSymbol>,
    balances: DashMap<(PartyId, TokenSymbol), Decimal>,
    holds: DashMap<EscrowId, LedgerHold>,
    offline: AtomicBool,
}

impl InMemoryLedger {
    /// Create a ledger with the given platform fee account and supported
    /// token symbols.
    pub fn new(fee_account: PartyId, tokens: impl IntoIterator<Item = TokenSymbol>) -> Self {
        Self {
            fee_account,
            supported: tokens.into_iter().collect(),
            balances: DashMap::new(),
            holds: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// Credit a party's balance (test and dev seeding).
    pub fn credit(&self, party: PartyId, token: TokenSymbol, amount: Decimal) {
        *self.balances.entry((party, token)).or_insert(Decimal::ZERO) += amount;
    }

    /// Simulate a ledger outage: while offline, every call returns
    /// [`EscrowError::LedgerUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The platform fee collection account.
    pub fn fee_account(&self) -> &PartyId {
        &self.fee_account
    }

    fn ensure_online(&self) -> Result<(), EscrowError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(EscrowError::LedgerUnavailable(
                "ledger offline".to_string(),
            ));
        }
        Ok(())
    }

    /// Debit `amount` from a party's balance, failing on insufficient funds.
    /// Check and mutation run under the entry guard.
    fn debit(
        &self,
        party: &PartyId,
        token: &TokenSymbol,
        amount: Decimal,
    ) -> Result<(), EscrowError> {
        let mut balance = self
            .balances
            .entry((*party, token.clone()))
            .or_insert(Decimal::ZERO);
        if *balance < amount {
            return Err(EscrowError::InsufficientFunds {
                party: *party,
                token: token.clone(),
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn receipt(&self, party: &PartyId, token: &TokenSymbol, amount: Decimal) -> LedgerReceipt {
        self.credit(*party, token.clone(), amount);
        LedgerReceipt {
            reference: format!("txn:{}", Uuid::new_v4()),
            party: *party,
            token: token.clone(),
            amount,
            recorded_at: Timestamp::now(),
        }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create_hold(&self, request: HoldRequest) -> Result<EscrowId, EscrowError> {
        self.ensure_online()?;
        if !self.supported.contains(&request.token) {
            return Err(EscrowError::UnsupportedToken(
                request.token.as_str().to_string(),
            ));
        }
        self.debit(&request.challenger, &request.token, request.amount)?;
        let id = EscrowId::new();
        self.holds.insert(
            id,
            LedgerHold {
                challenger: request.challenger,
                challengee: request.challengee,
                token: request.token,
                amount: request.amount,
                challenger_deposited: true,
                challengee_deposited: false,
                released: false,
            },
        );
        Ok(id)
    }

    async fn confirm_hold(&self, id: &EscrowId) -> Result<(), EscrowError> {
        self.ensure_online()?;
        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let hold = entry.value_mut();
        if hold.released {
            return Err(EscrowError::InvalidTransition {
                from: "CANCELLED".to_string(),
                to: "ACCEPTED".to_string(),
            });
        }
        if hold.challengee_deposited {
            return Ok(());
        }
        let (challengee, token, amount) = (hold.challengee, hold.token.clone(), hold.amount);
        self.debit(&challengee, &token, amount)?;
        hold.challengee_deposited = true;
        Ok(())
    }

    async fn cancel_hold(&self, id: &EscrowId) -> Result<(), EscrowError> {
        self.ensure_online()?;
        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let hold = entry.value_mut();
        if hold.released {
            return Ok(());
        }
        if hold.challenger_deposited {
            self.credit(hold.challenger, hold.token.clone(), hold.amount);
        }
        if hold.challengee_deposited {
            self.credit(hold.challengee, hold.token.clone(), hold.amount);
        }
        hold.released = true;
        Ok(())
    }

    async fn settle_hold(
        &self,
        id: &EscrowId,
        winner: &PartyId,
        payout: Decimal,
        fee: Decimal,
    ) -> Result<LedgerReceipt, EscrowError> {
        self.ensure_online()?;
        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let hold = entry.value_mut();
        if hold.released {
            return Err(EscrowError::AlreadyCompleted(*id));
        }
        if !hold.challengee_deposited {
            return Err(EscrowError::InvalidTransition {
                from: "PENDING_ACCEPTANCE".to_string(),
                to: "COMPLETED".to_string(),
            });
        }
        if *winner != hold.challenger && *winner != hold.challengee {
            return Err(EscrowError::WinnerNotParty {
                escrow_id: *id,
                party: *winner,
            });
        }
        let pot = hold.amount + hold.amount;
        if payout + fee != pot {
            return Err(EscrowError::BreakdownInconsistent {
                escrow_id: *id,
                fee,
                winner_payout: payout,
                total_pot: pot,
            });
        }
        hold.released = true;
        let token = hold.token.clone();
        let receipt = self.receipt(winner, &token, payout);
        let fee_account = self.fee_account;
        self.credit(fee_account, token, fee);
        Ok(receipt)
    }

    async fn refund_hold(
        &self,
        id: &EscrowId,
        refund_per_party: Decimal,
        fee: Decimal,
    ) -> Result<(LedgerReceipt, LedgerReceipt), EscrowError> {
        self.ensure_online()?;
        let mut entry = self.holds.get_mut(id).ok_or(EscrowError::NotFound(*id))?;
        let hold = entry.value_mut();
        if hold.released {
            return Err(EscrowError::AlreadyCompleted(*id));
        }
        if !hold.challengee_deposited {
            return Err(EscrowError::InvalidTransition {
                from: "PENDING_ACCEPTANCE".to_string(),
                to: "COMPLETED".to_string(),
            });
        }
        let pot = hold.amount + hold.amount;
        if refund_per_party + refund_per_party + fee != pot {
            return Err(EscrowError::BreakdownInconsistent {
                escrow_id: *id,
                fee,
                winner_payout: refund_per_party + refund_per_party,
                total_pot: pot,
            });
        }
        hold.released = true;
        let (challenger, challengee, token) =
            (hold.challenger, hold.challengee, hold.token.clone());
        let challenger_receipt = self.receipt(&challenger, &token, refund_per_party);
        let challengee_receipt = self.receipt(&challengee, &token, refund_per_party);
        let fee_account = self.fee_account;
        self.credit(fee_account, token, fee);
        Ok((challenger_receipt, challengee_receipt))
    }

    async fn balance_of(
        &self,
        party: &PartyId,
        token: &TokenSymbol,
    ) -> Result<Decimal, EscrowError> {
        self.ensure_online()?;
        Ok(self
            .balances
            .get(&(*party, token.clone()))
            .map(|b| *b)
            .unwrap_or(Decimal::ZERO))
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("holds", &self.holds.len())
            .field("accounts", &self.balances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usdc() -> TokenSymbol {
        TokenSymbol::new("USDC").unwrap()
    }

    fn seeded_ledger(challenger: PartyId, challengee: PartyId) -> InMemoryLedger {
        let ledger = InMemoryLedger::new(PartyId::new(), [usdc()]);
        ledger.credit(challenger, usdc(), dec!(100));
        ledger.credit(challengee, usdc(), dec!(100));
        ledger
    }

    fn request(challenger: PartyId, challengee: PartyId, amount: Decimal) -> HoldRequest {
        HoldRequest {
            challenge_id: ChallengeId::new(),
            challenger,
            challengee,
            amount,
            token: usdc(),
        }
    }

    #[tokio::test]
    async fn create_debits_challenger() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        assert_eq!(ledger.balance_of(&a, &usdc()).await.unwrap(), dec!(90));
        assert_eq!(ledger.balance_of(&b, &usdc()).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn create_rejects_insufficient_funds() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let result = ledger.create_hold(request(a, b, dec!(1000))).await;
        assert!(matches!(result, Err(EscrowError::InsufficientFunds { .. })));
        // Balance untouched on rejection.
        assert_eq!(ledger.balance_of(&a, &usdc()).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn create_rejects_unknown_token() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let mut req = request(a, b, dec!(10));
        req.token = TokenSymbol::new("DOGE").unwrap();
        let result = ledger.create_hold(req).await;
        assert!(matches!(result, Err(EscrowError::UnsupportedToken(_))));
    }

    #[tokio::test]
    async fn confirm_debits_challengee() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let id = ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        ledger.confirm_hold(&id).await.unwrap();
        assert_eq!(ledger.balance_of(&b, &usdc()).await.unwrap(), dec!(90));
    }

    #[tokio::test]
    async fn cancel_refunds_deposits() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let id = ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        ledger.confirm_hold(&id).await.unwrap();
        ledger.cancel_hold(&id).await.unwrap();
        assert_eq!(ledger.balance_of(&a, &usdc()).await.unwrap(), dec!(100));
        assert_eq!(ledger.balance_of(&b, &usdc()).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let id = ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        ledger.cancel_hold(&id).await.unwrap();
        ledger.cancel_hold(&id).await.unwrap();
        // Single refund despite the repeat.
        assert_eq!(ledger.balance_of(&a, &usdc()).await.unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn settle_pays_winner_and_fee_account() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let fee_account = *ledger.fee_account();
        let id = ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        ledger.confirm_hold(&id).await.unwrap();
        let receipt = ledger
            .settle_hold(&id, &b, dec!(19.5), dec!(0.5))
            .await
            .unwrap();
        assert_eq!(receipt.amount, dec!(19.5));
        assert_eq!(ledger.balance_of(&b, &usdc()).await.unwrap(), dec!(109.5));
        assert_eq!(
            ledger.balance_of(&fee_account, &usdc()).await.unwrap(),
            dec!(0.5)
        );
    }

    #[tokio::test]
    async fn settle_twice_fails() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let id = ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        ledger.confirm_hold(&id).await.unwrap();
        ledger
            .settle_hold(&id, &b, dec!(19.5), dec!(0.5))
            .await
            .unwrap();
        let result = ledger.settle_hold(&id, &b, dec!(19.5), dec!(0.5)).await;
        assert!(matches!(result, Err(EscrowError::AlreadyCompleted(_))));
    }

    #[tokio::test]
    async fn settle_rejects_mismatched_figures() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let id = ledger.create_hold(request(a, b, dec!(10))).await.unwrap();
        ledger.confirm_hold(&id).await.unwrap();
        let result = ledger.settle_hold(&id, &b, dec!(19.5), dec!(0.6)).await;
        assert!(matches!(
            result,
            Err(EscrowError::BreakdownInconsistent { .. })
        ));
    }

    #[tokio::test]
    async fn refund_pays_both_parties() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        let id = ledger.create_hold(request(a, b, dec!(1))).await.unwrap();
        ledger.confirm_hold(&id).await.unwrap();
        let (ra, rb) = ledger
            .refund_hold(&id, dec!(0.975), dec!(0.05))
            .await
            .unwrap();
        assert_eq!(ra.amount, dec!(0.975));
        assert_eq!(rb.amount, dec!(0.975));
        assert_eq!(ledger.balance_of(&a, &usdc()).await.unwrap(), dec!(99.975));
        assert_eq!(ledger.balance_of(&b, &usdc()).await.unwrap(), dec!(99.975));
    }

    #[tokio::test]
    async fn offline_ledger_is_unavailable() {
        let (a, b) = (PartyId::new(), PartyId::new());
        let ledger = seeded_ledger(a, b);
        ledger.set_offline(true);
        let result = ledger.create_hold(request(a, b, dec!(10))).await;
        assert!(matches!(result, Err(EscrowError::LedgerUnavailable(_))));
        ledger.set_offline(false);
        assert!(ledger.create_hold(request(a, b, dec!(10))).await.is_ok());
    }
}
