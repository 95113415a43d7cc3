//! In-memory ledger store
//!
//! Holds accounts, pending transfers, and committed transfer ids in
//! `FxHashMap`s. Applies accepted intents from a [`BatchResult`] so
//! multi-batch flows can be exercised without a real store.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::debug;

use super::{AccountBalance, LedgerSnapshot, apply_intent};
use crate::core_types::{AccountId, TransferId};
use crate::transfer::state::{PendingTransfer, Resolution};
use crate::transfer::types::{BatchResult, IntentKind, MutationIntent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Account {0} already exists")]
    AccountExists(AccountId),

    #[error("Pending transfer {0} not found")]
    PendingNotFound(TransferId),

    #[error("Pending transfer {0} already resolved")]
    AlreadyResolved(TransferId),

    #[error("Transfer {0} debits and credits the same account")]
    SameAccount(TransferId),

    #[error("Transfer {id}: {reason}")]
    Balance { id: TransferId, reason: &'static str },
}

#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    accounts: FxHashMap<AccountId, AccountBalance>,
    pending: FxHashMap<TransferId, PendingTransfer>,
    transfers: FxHashSet<TransferId>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_account(
        &mut self,
        id: AccountId,
        balance: AccountBalance,
    ) -> Result<(), StoreError> {
        if self.accounts.contains_key(&id) {
            return Err(StoreError::AccountExists(id));
        }
        self.accounts.insert(id, balance);
        Ok(())
    }

    /// Seed a pending transfer created outside this ledger's batches
    ///
    /// An unresolved reservation is held on both accounts.
    pub fn insert_pending(&mut self, pending: PendingTransfer) -> Result<(), StoreError> {
        if pending.debit_account_id == pending.credit_account_id {
            return Err(StoreError::SameAccount(pending.id));
        }
        if !pending.state.is_terminal() {
            let mut debit = self.account(pending.debit_account_id)?;
            let mut credit = self.account(pending.credit_account_id)?;
            let balance_err = |reason| StoreError::Balance {
                id: pending.id,
                reason,
            };
            debit.reserve_debit(pending.amount).map_err(balance_err)?;
            credit.reserve_credit(pending.amount).map_err(balance_err)?;
            self.accounts.insert(pending.debit_account_id, debit);
            self.accounts.insert(pending.credit_account_id, credit);
        }
        self.transfers.insert(pending.id);
        self.pending.insert(pending.id, pending);
        Ok(())
    }

    pub fn balance(&self, id: AccountId) -> Option<AccountBalance> {
        self.accounts.get(&id).copied()
    }

    pub fn pending(&self, id: TransferId) -> Option<&PendingTransfer> {
        self.pending.get(&id)
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Time out a pending transfer and release its reservation
    pub fn expire_pending(&mut self, id: TransferId) -> Result<(), StoreError> {
        let pending = self
            .pending
            .get(&id)
            .cloned()
            .ok_or(StoreError::PendingNotFound(id))?;
        let state = pending
            .state
            .transition(Resolution::Expire)
            .map_err(|_| StoreError::AlreadyResolved(id))?;

        let mut debit = self.account(pending.debit_account_id)?;
        let mut credit = self.account(pending.credit_account_id)?;
        let balance_err = |reason| StoreError::Balance { id, reason };
        debit
            .settle_reserved_debit(pending.amount, 0)
            .map_err(balance_err)?;
        credit
            .settle_reserved_credit(pending.amount, 0)
            .map_err(balance_err)?;

        self.accounts.insert(pending.debit_account_id, debit);
        self.accounts.insert(pending.credit_account_id, credit);
        self.pending.insert(id, PendingTransfer { state, ..pending });
        debug!(pending_id = id, "Pending transfer expired");
        Ok(())
    }

    /// Apply every accepted intent of a batch, in order
    ///
    /// All or nothing: the batch is applied to a staged copy that replaces
    /// the ledger only if every intent succeeds.
    pub fn apply(&mut self, result: &BatchResult) -> Result<usize, StoreError> {
        let mut staged = self.clone();
        let mut applied = 0;
        for intent in result.intents() {
            staged.apply_one(intent)?;
            applied += 1;
        }
        *self = staged;
        Ok(applied)
    }

    fn apply_one(&mut self, intent: &MutationIntent) -> Result<(), StoreError> {
        if intent.debit_account_id == intent.credit_account_id {
            return Err(StoreError::SameAccount(intent.transfer_id));
        }
        let resolved = match intent.kind {
            IntentKind::Post | IntentKind::Void => {
                let pending_id = intent.pending_id.unwrap_or_default();
                Some(
                    self.pending
                        .get(&pending_id)
                        .cloned()
                        .ok_or(StoreError::PendingNotFound(pending_id))?,
                )
            }
            IntentKind::Direct | IntentKind::Reserve => None,
        };

        let mut debit = self.account(intent.debit_account_id)?;
        let mut credit = self.account(intent.credit_account_id)?;
        let record = apply_intent(intent, resolved.as_ref(), &mut debit, &mut credit).map_err(
            |reason| StoreError::Balance {
                id: intent.transfer_id,
                reason,
            },
        )?;

        self.accounts.insert(intent.debit_account_id, debit);
        self.accounts.insert(intent.credit_account_id, credit);
        if let Some(record) = record {
            self.pending.insert(record.id, record);
        }
        self.transfers.insert(intent.transfer_id);
        Ok(())
    }

    fn account(&self, id: AccountId) -> Result<AccountBalance, StoreError> {
        self.balance(id).ok_or(StoreError::AccountNotFound(id))
    }
}

impl LedgerSnapshot for MemoryLedger {
    fn lookup_pending(&self, id: TransferId) -> Option<PendingTransfer> {
        self.pending.get(&id).cloned()
    }

    fn account_balance_snapshot(&self, account_id: AccountId) -> Option<AccountBalance> {
        self.balance(account_id)
    }

    fn transfer_exists(&self, id: TransferId) -> bool {
        self.transfers.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::TransferFlags;
    use crate::transfer::error::RejectReason;
    use crate::transfer::state::PendingState;
    use crate::transfer::types::Outcome;

    fn direct(index: u32, id: TransferId, amount: u64) -> MutationIntent {
        MutationIntent {
            index,
            transfer_id: id,
            kind: IntentKind::Direct,
            debit_account_id: 1,
            credit_account_id: 2,
            amount,
            pending_id: None,
            timeout: 0,
            ledger: 0,
            code: 0,
            flags: TransferFlags::NONE,
        }
    }

    fn ledger() -> MemoryLedger {
        let mut ledger = MemoryLedger::new();
        ledger.create_account(1, AccountBalance::new(60)).unwrap();
        ledger.create_account(2, AccountBalance::new(0)).unwrap();
        ledger
    }

    #[test]
    fn test_duplicate_account() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.create_account(1, AccountBalance::new(0)),
            Err(StoreError::AccountExists(1))
        );
    }

    #[test]
    fn test_expire_releases_reservation() {
        let mut ledger = ledger();
        ledger
            .insert_pending(PendingTransfer::new(10, 1, 2, 40))
            .unwrap();
        assert_eq!(ledger.balance(1).unwrap().reserved, 40);

        ledger.expire_pending(10).unwrap();

        assert_eq!(ledger.balance(1).unwrap(), AccountBalance::new(60));
        assert_eq!(ledger.pending(10).unwrap().state, PendingState::Expired);
        assert_eq!(
            ledger.expire_pending(10),
            Err(StoreError::AlreadyResolved(10))
        );
        assert!(ledger.transfer_exists(10));
    }

    #[test]
    fn test_insert_pending_requires_funds() {
        let mut ledger = ledger();
        let err = ledger
            .insert_pending(PendingTransfer::new(10, 1, 2, 61))
            .unwrap_err();
        assert!(matches!(err, StoreError::Balance { id: 10, .. }));
        assert!(ledger.pending(10).is_none());
    }

    #[test]
    fn test_same_account_pending_rejected() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.insert_pending(PendingTransfer::new(9, 1, 1, 40)),
            Err(StoreError::SameAccount(9))
        );
        assert!(ledger.pending(9).is_none());
        assert!(!ledger.transfer_exists(9));
        assert_eq!(ledger.balance(1).unwrap(), AccountBalance::new(60));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut ledger = ledger();
        let result = BatchResult::new(vec![
            Outcome::Accept(direct(0, 5, 30)),
            Outcome::Reject(RejectReason::InsufficientBalance),
            Outcome::Accept(direct(2, 7, 40)),
        ]);

        let err = ledger.apply(&result).unwrap_err();

        assert!(matches!(err, StoreError::Balance { id: 7, .. }));
        assert_eq!(ledger.balance(1).unwrap(), AccountBalance::new(60));
        assert_eq!(ledger.balance(2).unwrap(), AccountBalance::new(0));
        assert_eq!(ledger.transfer_count(), 0);
    }

    #[test]
    fn test_apply_same_account_intent() {
        let mut ledger = ledger();
        let mut intent = direct(0, 5, 10);
        intent.credit_account_id = 1;
        let result = BatchResult::new(vec![Outcome::Accept(intent)]);
        assert_eq!(ledger.apply(&result), Err(StoreError::SameAccount(5)));
        assert_eq!(ledger.balance(1).unwrap(), AccountBalance::new(60));
    }

    #[test]
    fn test_expire_unknown() {
        let mut ledger = ledger();
        assert_eq!(
            ledger.expire_pending(99),
            Err(StoreError::PendingNotFound(99))
        );
    }
}
