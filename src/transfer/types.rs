//! Transfer Core Types
//!
//! Input records, accepted mutation intents, and per-batch outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::RejectReason;
use crate::core_types::{AccountId, Amount, BatchIndex, LedgerId, TransferId};
use crate::flags::TransferFlags;

/// A submitted transfer, as deserialized by the transport layer
///
/// `flags` is kept raw here; it only becomes a [`TransferFlags`] once the
/// coordinator decodes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    #[serde(default)]
    pub debit_account_id: AccountId,
    #[serde(default)]
    pub credit_account_id: AccountId,
    #[serde(default)]
    pub amount: Amount,
    /// Pending transfer being posted or voided (0 = none)
    #[serde(default)]
    pub pending_id: TransferId,
    /// Reservation timeout in seconds, pending transfers only
    #[serde(default)]
    pub timeout: u32,
    #[serde(default)]
    pub ledger: LedgerId,
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub flags: u32,
}

impl Transfer {
    pub fn new(
        id: TransferId,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: Amount,
    ) -> Self {
        Self {
            id,
            debit_account_id,
            credit_account_id,
            amount,
            ..Default::default()
        }
    }

    /// Build a post/void for `pending_id`; accounts are taken from the
    /// pending transfer
    pub fn resolving(id: TransferId, pending_id: TransferId, amount: Amount) -> Self {
        Self {
            id,
            amount,
            pending_id,
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: TransferFlags) -> Self {
        self.flags = flags.encode();
        self
    }

    pub fn with_raw_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ledger(mut self, ledger: LedgerId, code: u16) -> Self {
        self.ledger = ledger;
        self.code = code;
        self
    }
}

/// What an accepted transfer does to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    /// Single-phase transfer, moves funds immediately
    Direct,
    /// Phase one: reserve funds
    Reserve,
    /// Phase two: finalize a reservation
    Post,
    /// Phase two: release a reservation
    Void,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Direct => "direct",
            IntentKind::Reserve => "reserve",
            IntentKind::Post => "post",
            IntentKind::Void => "void",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An approved transfer, ready to hand to the ledger store
///
/// For `Post`/`Void` the accounts are those of the resolved pending
/// transfer and `pending_id` is set. `amount` is final: at-most clamping
/// and post defaulting have already been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationIntent {
    pub index: BatchIndex,
    pub transfer_id: TransferId,
    pub kind: IntentKind,
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
    pub amount: Amount,
    pub pending_id: Option<TransferId>,
    pub timeout: u32,
    pub ledger: LedgerId,
    pub code: u16,
    pub flags: TransferFlags,
}

/// Per-transfer result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accept(MutationIntent),
    Reject(RejectReason),
}

impl Outcome {
    #[inline]
    pub fn is_accept(&self) -> bool {
        matches!(self, Outcome::Accept(_))
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Outcome::Accept(_) => None,
            Outcome::Reject(reason) => Some(*reason),
        }
    }

    pub fn intent(&self) -> Option<&MutationIntent> {
        match self {
            Outcome::Accept(intent) => Some(intent),
            Outcome::Reject(_) => None,
        }
    }
}

/// Outcomes of one batch, aligned 1:1 with the input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    outcomes: Vec<Outcome>,
}

impl BatchResult {
    pub(crate) fn new(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Accepted intents in application order
    pub fn intents(&self) -> impl Iterator<Item = &MutationIntent> {
        self.outcomes.iter().filter_map(Outcome::intent)
    }

    /// `(index, reason)` for every rejected transfer, in input order
    pub fn rejections(&self) -> Vec<(BatchIndex, RejectReason)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.reason().map(|r| (i as BatchIndex, r)))
            .collect()
    }

    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accept()).count()
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(index: BatchIndex) -> MutationIntent {
        MutationIntent {
            index,
            transfer_id: index as u64 + 1,
            kind: IntentKind::Direct,
            debit_account_id: 1,
            credit_account_id: 2,
            amount: 10,
            pending_id: None,
            timeout: 0,
            ledger: 0,
            code: 0,
            flags: TransferFlags::NONE,
        }
    }

    #[test]
    fn test_batch_result_views() {
        let result = BatchResult::new(vec![
            Outcome::Accept(intent(0)),
            Outcome::Reject(RejectReason::InsufficientBalance),
            Outcome::Accept(intent(2)),
        ]);

        assert_eq!(result.len(), 3);
        assert_eq!(result.accepted_count(), 2);
        let ids: Vec<_> = result.intents().map(|i| i.transfer_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            result.rejections(),
            vec![(1, RejectReason::InsufficientBalance)]
        );

        let outcomes = result.into_outcomes();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2], Outcome::Accept(intent(2)));
    }

    #[test]
    fn test_transfer_builder() {
        let t = Transfer::resolving(9, 4, 0).with_flags(TransferFlags::VOID_PENDING_TRANSFER);
        assert_eq!(t.pending_id, 4);
        assert_eq!(t.flags, 8);
        assert_eq!(t.debit_account_id, 0);

        let t = Transfer::new(1, 1, 2, 10).with_ledger(700, 42);
        assert_eq!((t.ledger, t.code), (700, 42));
    }

    #[test]
    fn test_transfer_json_defaults() {
        let t: Transfer = serde_json::from_str(r#"{"id": 1, "flags": 1}"#).unwrap();
        let expected = Transfer {
            id: 1,
            flags: 1,
            ..Default::default()
        };
        assert_eq!(t, expected);
    }
}
