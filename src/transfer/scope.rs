//! Batch-local overlay of provisional ledger effects
//!
//! Two layers sit on top of the [`LedgerSnapshot`]:
//! - `committed`: effects of chains that already closed successfully
//! - `open`: effects of the chain currently being walked
//!
//! Reads go `open` → `committed` → snapshot. Closing a chain either folds
//! `open` into `committed` or throws it away.

use rustc_hash::{FxHashMap, FxHashSet};

use super::adapters::{AccountBalance, LedgerSnapshot, apply_intent};
use super::error::RejectReason;
use super::state::PendingTransfer;
use super::types::MutationIntent;
use crate::core_types::{AccountId, TransferId};

#[derive(Debug, Default)]
struct Overlay {
    balances: FxHashMap<AccountId, AccountBalance>,
    pending: FxHashMap<TransferId, PendingTransfer>,
    ids: FxHashSet<TransferId>,
}

impl Overlay {
    fn is_empty(&self) -> bool {
        self.balances.is_empty() && self.pending.is_empty() && self.ids.is_empty()
    }

    fn absorb(&mut self, other: Overlay) {
        self.balances.extend(other.balances);
        self.pending.extend(other.pending);
        self.ids.extend(other.ids);
    }
}

pub(crate) struct Scope<'a> {
    snapshot: &'a dyn LedgerSnapshot,
    committed: Overlay,
    open: Overlay,
}

impl<'a> Scope<'a> {
    pub fn new(snapshot: &'a dyn LedgerSnapshot) -> Self {
        Self {
            snapshot,
            committed: Overlay::default(),
            open: Overlay::default(),
        }
    }

    pub fn balance(&self, id: AccountId) -> Option<AccountBalance> {
        self.open
            .balances
            .get(&id)
            .or_else(|| self.committed.balances.get(&id))
            .copied()
            .or_else(|| self.snapshot.account_balance_snapshot(id))
    }

    pub fn pending(&self, id: TransferId) -> Option<PendingTransfer> {
        self.open
            .pending
            .get(&id)
            .or_else(|| self.committed.pending.get(&id))
            .cloned()
            .or_else(|| self.snapshot.lookup_pending(id))
    }

    pub fn transfer_exists(&self, id: TransferId) -> bool {
        self.open.ids.contains(&id)
            || self.committed.ids.contains(&id)
            || self.snapshot.transfer_exists(id)
    }

    /// Record the effects of an accepted intent in the open layer
    pub fn apply(
        &mut self,
        intent: &MutationIntent,
        resolved: Option<&PendingTransfer>,
    ) -> Result<(), RejectReason> {
        if intent.debit_account_id == intent.credit_account_id {
            return Err(RejectReason::AccountsMustBeDifferent);
        }
        let mut debit = self
            .balance(intent.debit_account_id)
            .ok_or(RejectReason::AccountNotFound)?;
        let mut credit = self
            .balance(intent.credit_account_id)
            .ok_or(RejectReason::AccountNotFound)?;

        let record = apply_intent(intent, resolved, &mut debit, &mut credit)
            .map_err(|_| RejectReason::InsufficientBalance)?;

        self.open.balances.insert(intent.debit_account_id, debit);
        self.open.balances.insert(intent.credit_account_id, credit);
        if let Some(record) = record {
            self.open.pending.insert(record.id, record);
        }
        self.open.ids.insert(intent.transfer_id);
        Ok(())
    }

    /// Close the open chain, keeping its effects
    pub fn commit(&mut self) {
        let open = std::mem::take(&mut self.open);
        self.committed.absorb(open);
    }

    /// Close the open chain, discarding its effects
    pub fn rollback(&mut self) {
        self.open = Overlay::default();
    }

    pub fn has_open_effects(&self) -> bool {
        !self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::TransferFlags;
    use crate::transfer::adapters::MemoryLedger;
    use crate::transfer::types::IntentKind;

    fn direct(id: TransferId, amount: u64) -> MutationIntent {
        MutationIntent {
            index: 0,
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
        ledger.create_account(1, AccountBalance::new(100)).unwrap();
        ledger.create_account(2, AccountBalance::new(0)).unwrap();
        ledger
    }

    #[test]
    fn test_commit_makes_effects_visible() {
        let ledger = ledger();
        let mut scope = Scope::new(&ledger);

        scope.apply(&direct(7, 30), None).unwrap();
        assert!(scope.has_open_effects());
        scope.commit();
        assert!(!scope.has_open_effects());

        assert_eq!(scope.balance(1).unwrap().available, 70);
        assert_eq!(scope.balance(2).unwrap().available, 30);
        assert!(scope.transfer_exists(7));
        // snapshot untouched
        assert_eq!(ledger.balance(1).unwrap().available, 100);
    }

    #[test]
    fn test_rollback_discards_effects() {
        let ledger = ledger();
        let mut scope = Scope::new(&ledger);

        scope.apply(&direct(7, 30), None).unwrap();
        scope.commit();
        scope.apply(&direct(8, 50), None).unwrap();
        assert_eq!(scope.balance(1).unwrap().available, 20);
        scope.rollback();

        assert_eq!(scope.balance(1).unwrap().available, 70);
        assert!(scope.transfer_exists(7));
        assert!(!scope.transfer_exists(8));
    }

    #[test]
    fn test_apply_same_account_leaves_scope_untouched() {
        let ledger = ledger();
        let mut scope = Scope::new(&ledger);
        let mut intent = direct(7, 30);
        intent.credit_account_id = 1;
        assert_eq!(
            scope.apply(&intent, None),
            Err(RejectReason::AccountsMustBeDifferent)
        );
        assert!(!scope.has_open_effects());
    }

    #[test]
    fn test_apply_unknown_account() {
        let ledger = ledger();
        let mut scope = Scope::new(&ledger);
        let mut intent = direct(7, 30);
        intent.credit_account_id = 99;
        assert_eq!(
            scope.apply(&intent, None),
            Err(RejectReason::AccountNotFound)
        );
    }
}
