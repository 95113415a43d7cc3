//! Transfer Coordinator
//!
//! Walks a batch left to right, decodes each transfer's flags, validates it
//! against the ledger snapshot plus the effects of earlier transfers in the
//! batch, and groups linked transfers into chains that commit or fail as a
//! unit.
//!
//! # Chain handling
//!
//! ```text
//! [A linked] [B linked] [C]        one chain, closes at C
//! [A linked] [B linked]<end>       chain still open at batch end
//! ```
//!
//! Outcomes of the open chain sit in a `ChainBuffer` until the chain
//! closes. If any member failed, every buffered acceptance is rewritten to
//! `LinkedTransferFailed` and the chain's provisional effects are dropped.
//! The first failing member keeps its own reason. Members after it are not
//! evaluated.

use tracing::{debug, info, warn};

use super::adapters::LedgerSnapshot;
use super::error::{BatchError, RejectReason};
use super::scope::Scope;
use super::state::{PendingTransfer, Resolution};
use super::types::{BatchResult, IntentKind, MutationIntent, Outcome, Transfer};
use crate::config::ValidatorConfig;
use crate::core_types::{Amount, BatchIndex};
use crate::flags::TransferFlags;

/// Provisional outcomes of the chain currently being walked
#[derive(Debug, Default)]
struct ChainBuffer {
    start: BatchIndex,
    outcomes: Vec<Outcome>,
    /// Index and reason of the first member that failed on its own
    failure: Option<(BatchIndex, RejectReason)>,
}

impl ChainBuffer {
    #[inline]
    fn is_broken(&self) -> bool {
        self.failure.is_some()
    }

    fn push(&mut self, index: BatchIndex, outcome: Outcome) {
        if self.outcomes.is_empty() {
            self.start = index;
        }
        if let Outcome::Reject(reason) = &outcome
            && self.failure.is_none()
        {
            self.failure = Some((index, *reason));
        }
        self.outcomes.push(outcome);
    }

    /// Finish the chain and hand back its final outcomes in order
    fn close(&mut self, scope: &mut Scope<'_>) -> Vec<Outcome> {
        let outcomes = std::mem::take(&mut self.outcomes);
        let Some((failed_index, reason)) = self.failure.take() else {
            scope.commit();
            return outcomes;
        };

        scope.rollback();
        if outcomes.len() > 1 {
            warn!(
                chain_start = self.start,
                chain_len = outcomes.len(),
                failed_index = failed_index,
                reason = reason.as_str(),
                "Linked chain rolled back"
            );
        }

        outcomes
            .into_iter()
            .map(|outcome| match outcome {
                Outcome::Accept(_) => Outcome::Reject(RejectReason::LinkedTransferFailed),
                rejected => rejected,
            })
            .collect()
    }
}

/// Transfer Coordinator - validates batches against a ledger snapshot
#[derive(Debug, Clone, Default)]
pub struct TransferCoordinator {
    config: ValidatorConfig,
}

impl TransferCoordinator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a batch, producing one outcome per transfer
    ///
    /// The snapshot is only read. Accepted intents must be applied by the
    /// caller, in order, before the next batch is validated.
    ///
    /// # Errors
    /// [`BatchError::BatchTooLarge`] if the batch exceeds `max_batch_size`;
    /// nothing is evaluated in that case.
    pub fn validate(
        &self,
        snapshot: &dyn LedgerSnapshot,
        batch: &[Transfer],
    ) -> Result<BatchResult, BatchError> {
        if batch.len() > self.config.max_batch_size {
            warn!(
                batch_size = batch.len(),
                max = self.config.max_batch_size,
                "Batch refused"
            );
            return Err(BatchError::BatchTooLarge {
                len: batch.len(),
                max: self.config.max_batch_size,
            });
        }

        let mut scope = Scope::new(snapshot);
        let mut chain = ChainBuffer::default();
        let mut outcomes = Vec::with_capacity(batch.len());

        for (i, transfer) in batch.iter().enumerate() {
            let index = i as BatchIndex;
            let linked = TransferFlags::chain_bit(transfer.flags);
            let is_last = i + 1 == batch.len();

            let outcome = if linked && is_last {
                Outcome::Reject(RejectReason::LinkedChainOpen)
            } else if chain.is_broken() {
                Outcome::Reject(RejectReason::LinkedTransferFailed)
            } else {
                execute(&mut scope, index, transfer)
            };

            match &outcome {
                Outcome::Accept(intent) => debug!(
                    index = index,
                    transfer_id = transfer.id,
                    kind = %intent.kind,
                    amount = intent.amount,
                    "Transfer provisionally accepted"
                ),
                Outcome::Reject(reason) => debug!(
                    index = index,
                    transfer_id = transfer.id,
                    flags = transfer.flags,
                    reason = reason.as_str(),
                    "Transfer rejected"
                ),
            }

            chain.push(index, outcome);
            if !linked || is_last {
                outcomes.extend(chain.close(&mut scope));
            }
        }

        let result = BatchResult::new(outcomes);
        info!(
            batch_size = batch.len(),
            accepted = result.accepted_count(),
            rejected = batch.len() - result.accepted_count(),
            "Batch validated"
        );
        Ok(result)
    }
}

/// Evaluate one transfer and record its effects in the open scope
fn execute(scope: &mut Scope<'_>, index: BatchIndex, transfer: &Transfer) -> Outcome {
    let (intent, resolved) = match evaluate(scope, index, transfer) {
        Ok(evaluated) => evaluated,
        Err(reason) => return Outcome::Reject(reason),
    };
    match scope.apply(&intent, resolved.as_ref()) {
        Ok(()) => Outcome::Accept(intent),
        Err(reason) => Outcome::Reject(reason),
    }
}

/// Validate a single transfer against the current scope
///
/// Returns the intent plus the pending transfer it resolves, if any.
fn evaluate(
    scope: &Scope<'_>,
    index: BatchIndex,
    transfer: &Transfer,
) -> Result<(MutationIntent, Option<PendingTransfer>), RejectReason> {
    let flags = TransferFlags::decode(transfer.flags)?;
    check_flag_combination(flags)?;
    check_structure(transfer, flags)?;

    if scope.transfer_exists(transfer.id) {
        return Err(RejectReason::TransferIdAlreadyExists);
    }

    if flags.is_resolution() {
        evaluate_resolution(scope, index, transfer, flags)
    } else {
        evaluate_amount_bearing(scope, index, transfer, flags).map(|intent| (intent, None))
    }
}

fn check_flag_combination(flags: TransferFlags) -> Result<(), RejectReason> {
    if flags.has_post_pending_transfer() && flags.has_void_pending_transfer() {
        return Err(RejectReason::InvalidFlagCombination);
    }
    if flags.has_pending() && flags.is_resolution() {
        return Err(RejectReason::InvalidFlagCombination);
    }
    Ok(())
}

fn check_structure(transfer: &Transfer, flags: TransferFlags) -> Result<(), RejectReason> {
    if transfer.id == 0 {
        return Err(RejectReason::IdMustNotBeZero);
    }
    if flags.is_resolution() {
        if transfer.pending_id == transfer.id {
            return Err(RejectReason::PendingIdMustBeDifferent);
        }
    } else if transfer.pending_id != 0 {
        return Err(RejectReason::PendingIdMustBeZero);
    }
    if transfer.timeout != 0 && !flags.has_pending() {
        return Err(RejectReason::TimeoutReservedForPendingTransfer);
    }
    Ok(())
}

/// Post or void of an existing reservation
fn evaluate_resolution(
    scope: &Scope<'_>,
    index: BatchIndex,
    transfer: &Transfer,
    flags: TransferFlags,
) -> Result<(MutationIntent, Option<PendingTransfer>), RejectReason> {
    if transfer.pending_id == 0 {
        return Err(RejectReason::PendingTransferNotFound);
    }
    let pending = scope
        .pending(transfer.pending_id)
        .ok_or(RejectReason::PendingTransferNotFound)?;

    let (kind, resolution) = if flags.has_post_pending_transfer() {
        (IntentKind::Post, Resolution::Post)
    } else {
        (IntentKind::Void, Resolution::Void)
    };
    pending.state.transition(resolution)?;
    if pending.debit_account_id == pending.credit_account_id {
        return Err(RejectReason::AccountsMustBeDifferent);
    }

    let debit_differs =
        transfer.debit_account_id != 0 && transfer.debit_account_id != pending.debit_account_id;
    let credit_differs =
        transfer.credit_account_id != 0 && transfer.credit_account_id != pending.credit_account_id;
    if debit_differs || credit_differs {
        return Err(RejectReason::PendingTransferHasDifferentAccounts);
    }

    let amount = match kind {
        IntentKind::Post => {
            // zero posts the full reservation
            let requested = if transfer.amount == 0 {
                pending.amount
            } else {
                transfer.amount
            };
            if requested > pending.amount {
                return Err(RejectReason::AmountExceedsLimit);
            }
            requested
        }
        _ => pending.amount,
    };

    let intent = MutationIntent {
        index,
        transfer_id: transfer.id,
        kind,
        debit_account_id: pending.debit_account_id,
        credit_account_id: pending.credit_account_id,
        amount,
        pending_id: Some(pending.id),
        timeout: 0,
        ledger: pending.ledger,
        code: pending.code,
        flags,
    };
    Ok((intent, Some(pending)))
}

/// Single-phase transfer or a new reservation
fn evaluate_amount_bearing(
    scope: &Scope<'_>,
    index: BatchIndex,
    transfer: &Transfer,
    flags: TransferFlags,
) -> Result<MutationIntent, RejectReason> {
    if transfer.debit_account_id == transfer.credit_account_id {
        return Err(RejectReason::AccountsMustBeDifferent);
    }
    if transfer.amount == 0 {
        return Err(RejectReason::AmountMustNotBeZero);
    }

    let debit = scope
        .balance(transfer.debit_account_id)
        .ok_or(RejectReason::AccountNotFound)?;
    let credit = scope
        .balance(transfer.credit_account_id)
        .ok_or(RejectReason::AccountNotFound)?;

    // Each side bounds the amount on its own; the tighter bound wins.
    let amount = limit_amount(transfer.amount, debit.available, flags.has_debits_at_most())?;
    let amount = limit_amount(amount, credit.creditable(), flags.has_credits_at_most())?;

    let kind = if flags.has_pending() {
        IntentKind::Reserve
    } else {
        IntentKind::Direct
    };

    Ok(MutationIntent {
        index,
        transfer_id: transfer.id,
        kind,
        debit_account_id: transfer.debit_account_id,
        credit_account_id: transfer.credit_account_id,
        amount,
        pending_id: None,
        timeout: transfer.timeout,
        ledger: transfer.ledger,
        code: transfer.code,
        flags,
    })
}

/// Clamp `requested` to `limit` when the side is "at most", otherwise
/// require it to fit
fn limit_amount(requested: Amount, limit: Amount, at_most: bool) -> Result<Amount, RejectReason> {
    if requested <= limit {
        Ok(requested)
    } else if at_most && limit > 0 {
        Ok(limit)
    } else {
        Err(RejectReason::InsufficientBalance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::adapters::{AccountBalance, MemoryLedger};

    fn ledger() -> MemoryLedger {
        let mut ledger = MemoryLedger::new();
        ledger.create_account(1, AccountBalance::new(100)).unwrap();
        ledger.create_account(2, AccountBalance::new(0)).unwrap();
        ledger
    }

    #[test]
    fn test_limit_amount() {
        assert_eq!(limit_amount(50, 100, false), Ok(50));
        assert_eq!(limit_amount(150, 100, true), Ok(100));
        assert_eq!(
            limit_amount(150, 100, false),
            Err(RejectReason::InsufficientBalance)
        );
        assert_eq!(
            limit_amount(150, 0, true),
            Err(RejectReason::InsufficientBalance)
        );
    }

    #[test]
    fn test_flag_combination_precedence() {
        let flags = TransferFlags::POST_PENDING_TRANSFER | TransferFlags::VOID_PENDING_TRANSFER;
        assert_eq!(
            check_flag_combination(flags),
            Err(RejectReason::InvalidFlagCombination)
        );
        let flags = TransferFlags::PENDING | TransferFlags::VOID_PENDING_TRANSFER;
        assert_eq!(
            check_flag_combination(flags),
            Err(RejectReason::InvalidFlagCombination)
        );
        let flags = TransferFlags::DEBITS_AT_MOST | TransferFlags::CREDITS_AT_MOST;
        assert_eq!(check_flag_combination(flags), Ok(()));
    }

    #[test]
    fn test_structure_checks() {
        let none = TransferFlags::NONE;
        assert_eq!(
            check_structure(&Transfer::new(0, 1, 2, 10), none),
            Err(RejectReason::IdMustNotBeZero)
        );
        assert_eq!(
            check_structure(&Transfer::resolving(5, 4, 0), none),
            Err(RejectReason::PendingIdMustBeZero)
        );
        assert_eq!(
            check_structure(
                &Transfer::resolving(5, 5, 0),
                TransferFlags::VOID_PENDING_TRANSFER
            ),
            Err(RejectReason::PendingIdMustBeDifferent)
        );
        assert_eq!(
            check_structure(&Transfer::new(5, 1, 2, 10).with_timeout(30), none),
            Err(RejectReason::TimeoutReservedForPendingTransfer)
        );
        assert_eq!(
            check_structure(
                &Transfer::new(5, 1, 2, 10).with_timeout(30),
                TransferFlags::PENDING
            ),
            Ok(())
        );
    }

    #[test]
    fn test_evaluate_does_not_touch_scope() {
        let ledger = ledger();
        let scope = Scope::new(&ledger);
        let (intent, resolved) = evaluate(&scope, 0, &Transfer::new(9, 1, 2, 40)).unwrap();
        assert_eq!(intent.kind, IntentKind::Direct);
        assert!(resolved.is_none());
        assert!(!scope.has_open_effects());
    }

    #[test]
    fn test_intent_carries_ledger_and_code() {
        let ledger = ledger();
        let batch = [Transfer::new(3, 1, 2, 10).with_ledger(700, 42)];
        let result = TransferCoordinator::default()
            .validate(&ledger, &batch)
            .unwrap();
        let intent = result.intents().next().unwrap();
        assert_eq!((intent.ledger, intent.code), (700, 42));
    }

    #[test]
    fn test_batch_too_large() {
        let ledger = ledger();
        let coordinator = TransferCoordinator::new(ValidatorConfig { max_batch_size: 2 });
        let batch = vec![Transfer::new(1, 1, 2, 1); 3];
        assert_eq!(
            coordinator.validate(&ledger, &batch),
            Err(BatchError::BatchTooLarge { len: 3, max: 2 })
        );
    }

    #[test]
    fn test_empty_batch() {
        let ledger = ledger();
        let result = TransferCoordinator::default()
            .validate(&ledger, &[])
            .unwrap();
        assert!(result.is_empty());
    }
}
