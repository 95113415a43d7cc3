//! Ledger Snapshot Adapters
//!
//! The validator never owns accounts or pending transfers. It reads them
//! through [`LedgerSnapshot`], a point-in-time view supplied by the ledger
//! store. [`MemoryLedger`] is an in-process implementation used by tests
//! and the demo binary.

pub mod memory;

pub use memory::{MemoryLedger, StoreError};

use serde::{Deserialize, Serialize};

use super::state::{PendingState, PendingTransfer};
use super::types::{IntentKind, MutationIntent};
use crate::core_types::{AccountId, Amount, TransferId};

/// Read-only view into the ledger store
///
/// Implementations must return the same answers for the duration of one
/// batch; the caller serializes batches.
pub trait LedgerSnapshot {
    /// Look up a pending transfer by id. Transfers that were never pending
    /// are reported as `None`.
    fn lookup_pending(&self, id: TransferId) -> Option<PendingTransfer>;

    /// Current balance of an account, `None` if it does not exist
    fn account_balance_snapshot(&self, account_id: AccountId) -> Option<AccountBalance>;

    /// True if a transfer with this id was already committed
    fn transfer_exists(&self, id: TransferId) -> bool;
}

/// Balance figures the validator needs for one account
///
/// # Invariants
/// - `available` is what the account can still be debited
/// - `reserved` is held by unresolved pending debits
/// - `credit_capacity` is how much more the account may be credited,
///   `None` meaning unlimited; pending credits already count against it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub available: Amount,
    #[serde(default)]
    pub reserved: Amount,
    #[serde(default)]
    pub credit_capacity: Option<Amount>,
}

impl AccountBalance {
    pub fn new(available: Amount) -> Self {
        Self {
            available,
            reserved: 0,
            credit_capacity: None,
        }
    }

    pub fn with_credit_capacity(mut self, capacity: Amount) -> Self {
        self.credit_capacity = Some(capacity);
        self
    }

    /// Largest amount the account can still be credited
    #[inline]
    pub fn creditable(&self) -> Amount {
        self.credit_capacity.unwrap_or(Amount::MAX)
    }

    /// Move funds out of available
    pub fn debit(&mut self, amount: Amount) -> Result<(), &'static str> {
        self.available = self
            .available
            .checked_sub(amount)
            .ok_or("Insufficient funds")?;
        Ok(())
    }

    /// Move funds into available, consuming credit capacity
    pub fn credit(&mut self, amount: Amount) -> Result<(), &'static str> {
        self.consume_capacity(amount)?;
        self.available = self
            .available
            .checked_add(amount)
            .ok_or("Credit overflow")?;
        Ok(())
    }

    /// Hold funds for a pending debit
    pub fn reserve_debit(&mut self, amount: Amount) -> Result<(), &'static str> {
        self.debit(amount)?;
        self.reserved = self
            .reserved
            .checked_add(amount)
            .ok_or("Reserve overflow")?;
        Ok(())
    }

    /// Hold credit capacity for a pending credit
    pub fn reserve_credit(&mut self, amount: Amount) -> Result<(), &'static str> {
        self.consume_capacity(amount)
    }

    /// Resolve a pending debit of `reserved`, of which `posted` is spent
    /// and the remainder returns to available
    pub fn settle_reserved_debit(
        &mut self,
        reserved: Amount,
        posted: Amount,
    ) -> Result<(), &'static str> {
        let released = reserved.checked_sub(posted).ok_or("Posted above reserve")?;
        self.reserved = self
            .reserved
            .checked_sub(reserved)
            .ok_or("Reserve underflow")?;
        self.available = self
            .available
            .checked_add(released)
            .ok_or("Release overflow")?;
        Ok(())
    }

    /// Resolve a pending credit of `reserved`, of which `posted` lands in
    /// available and the remainder returns to credit capacity
    pub fn settle_reserved_credit(
        &mut self,
        reserved: Amount,
        posted: Amount,
    ) -> Result<(), &'static str> {
        let released = reserved.checked_sub(posted).ok_or("Posted above reserve")?;
        if let Some(capacity) = self.credit_capacity {
            self.credit_capacity = Some(capacity.saturating_add(released));
        }
        self.available = self
            .available
            .checked_add(posted)
            .ok_or("Credit overflow")?;
        Ok(())
    }

    fn consume_capacity(&mut self, amount: Amount) -> Result<(), &'static str> {
        if let Some(capacity) = self.credit_capacity {
            self.credit_capacity = Some(
                capacity
                    .checked_sub(amount)
                    .ok_or("Credit capacity exceeded")?,
            );
        }
        Ok(())
    }
}

/// Apply an accepted intent to the two accounts it touches
///
/// `resolved` is the pending transfer for `Post`/`Void` intents. Returns
/// the pending transfer record to store, if the intent creates or
/// resolves one.
pub(crate) fn apply_intent(
    intent: &MutationIntent,
    resolved: Option<&PendingTransfer>,
    debit: &mut AccountBalance,
    credit: &mut AccountBalance,
) -> Result<Option<PendingTransfer>, &'static str> {
    match intent.kind {
        IntentKind::Direct => {
            debit.debit(intent.amount)?;
            credit.credit(intent.amount)?;
            Ok(None)
        }
        IntentKind::Reserve => {
            debit.reserve_debit(intent.amount)?;
            credit.reserve_credit(intent.amount)?;
            Ok(Some(PendingTransfer {
                id: intent.transfer_id,
                debit_account_id: intent.debit_account_id,
                credit_account_id: intent.credit_account_id,
                amount: intent.amount,
                ledger: intent.ledger,
                code: intent.code,
                timeout: intent.timeout,
                state: PendingState::Pending,
            }))
        }
        IntentKind::Post | IntentKind::Void => {
            let pending = resolved.ok_or("Pending transfer missing")?;
            let (posted, state) = if intent.kind == IntentKind::Post {
                (intent.amount, PendingState::Posted)
            } else {
                (0, PendingState::Voided)
            };
            debit.settle_reserved_debit(pending.amount, posted)?;
            credit.settle_reserved_credit(pending.amount, posted)?;
            Ok(Some(PendingTransfer {
                state,
                ..pending.clone()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_and_credit() {
        let mut a = AccountBalance::new(100);
        a.debit(40).unwrap();
        assert_eq!(a.available, 60);
        assert!(a.debit(61).is_err());

        let mut b = AccountBalance::new(0).with_credit_capacity(50);
        b.credit(30).unwrap();
        assert_eq!(b.available, 30);
        assert_eq!(b.credit_capacity, Some(20));
        assert!(b.credit(21).is_err());
    }

    #[test]
    fn test_reserve_then_partial_settle() {
        let mut debit = AccountBalance::new(100);
        let mut credit = AccountBalance::new(0).with_credit_capacity(100);

        debit.reserve_debit(80).unwrap();
        credit.reserve_credit(80).unwrap();
        assert_eq!((debit.available, debit.reserved), (20, 80));
        assert_eq!(credit.credit_capacity, Some(20));

        debit.settle_reserved_debit(80, 50).unwrap();
        credit.settle_reserved_credit(80, 50).unwrap();
        assert_eq!((debit.available, debit.reserved), (50, 0));
        assert_eq!(credit.available, 50);
        assert_eq!(credit.credit_capacity, Some(50));
    }

    #[test]
    fn test_unlimited_credit_capacity() {
        let mut a = AccountBalance::new(0);
        assert_eq!(a.creditable(), Amount::MAX);
        a.credit(1_000_000).unwrap();
        assert_eq!(a.credit_capacity, None);
    }
}
