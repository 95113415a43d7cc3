//! Transfer Error Types
//!
//! Per-transfer rejection reasons and batch-level errors.

use thiserror::Error;

/// Reason a single transfer was rejected
///
/// Numeric codes are stable and are what clients see on the wire.
/// Codes 1..=2 are chain outcomes, 3..=11 are flag and structural checks,
/// 12..=15 concern the referenced pending transfer, and 16..=17 are
/// reported on behalf of the ledger store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    // === Chain Outcomes ===
    #[error("Another transfer in the linked chain failed")]
    LinkedTransferFailed,

    #[error("Linked chain is still open at the end of the batch")]
    LinkedChainOpen,

    // === Flag Errors ===
    #[error("Reserved flag bits are set")]
    InvalidFlags,

    #[error("Flag combination is not allowed")]
    InvalidFlagCombination,

    // === Structural Errors ===
    #[error("Transfer id must not be zero")]
    IdMustNotBeZero,

    #[error("pending_id must be zero unless posting or voiding")]
    PendingIdMustBeZero,

    #[error("pending_id must differ from the transfer id")]
    PendingIdMustBeDifferent,

    #[error("timeout is reserved for pending transfers")]
    TimeoutReservedForPendingTransfer,

    #[error("Transfer id already exists")]
    TransferIdAlreadyExists,

    #[error("Debit and credit accounts must be different")]
    AccountsMustBeDifferent,

    #[error("Amount must not be zero")]
    AmountMustNotBeZero,

    // === Pending Transfer Errors ===
    #[error("Pending transfer not found")]
    PendingTransferNotFound,

    #[error("Pending transfer already posted, voided or expired")]
    PendingTransferAlreadyResolved,

    #[error("Accounts differ from the pending transfer")]
    PendingTransferHasDifferentAccounts,

    #[error("Amount exceeds the pending reservation")]
    AmountExceedsLimit,

    // === Ledger Store Errors ===
    #[error("Account not found")]
    AccountNotFound,

    #[error("Insufficient balance")]
    InsufficientBalance,
}

impl RejectReason {
    /// Stable numeric result code
    pub fn code(&self) -> u32 {
        match self {
            RejectReason::LinkedTransferFailed => 1,
            RejectReason::LinkedChainOpen => 2,
            RejectReason::InvalidFlags => 3,
            RejectReason::InvalidFlagCombination => 4,
            RejectReason::IdMustNotBeZero => 5,
            RejectReason::PendingIdMustBeZero => 6,
            RejectReason::PendingIdMustBeDifferent => 7,
            RejectReason::TimeoutReservedForPendingTransfer => 8,
            RejectReason::TransferIdAlreadyExists => 9,
            RejectReason::AccountsMustBeDifferent => 10,
            RejectReason::AmountMustNotBeZero => 11,
            RejectReason::PendingTransferNotFound => 12,
            RejectReason::PendingTransferAlreadyResolved => 13,
            RejectReason::PendingTransferHasDifferentAccounts => 14,
            RejectReason::AmountExceedsLimit => 15,
            RejectReason::AccountNotFound => 16,
            RejectReason::InsufficientBalance => 17,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::LinkedTransferFailed => "LINKED_TRANSFER_FAILED",
            RejectReason::LinkedChainOpen => "LINKED_CHAIN_OPEN",
            RejectReason::InvalidFlags => "INVALID_FLAGS",
            RejectReason::InvalidFlagCombination => "INVALID_FLAG_COMBINATION",
            RejectReason::IdMustNotBeZero => "ID_MUST_NOT_BE_ZERO",
            RejectReason::PendingIdMustBeZero => "PENDING_ID_MUST_BE_ZERO",
            RejectReason::PendingIdMustBeDifferent => "PENDING_ID_MUST_BE_DIFFERENT",
            RejectReason::TimeoutReservedForPendingTransfer => {
                "TIMEOUT_RESERVED_FOR_PENDING_TRANSFER"
            }
            RejectReason::TransferIdAlreadyExists => "TRANSFER_ID_ALREADY_EXISTS",
            RejectReason::AccountsMustBeDifferent => "ACCOUNTS_MUST_BE_DIFFERENT",
            RejectReason::AmountMustNotBeZero => "AMOUNT_MUST_NOT_BE_ZERO",
            RejectReason::PendingTransferNotFound => "PENDING_TRANSFER_NOT_FOUND",
            RejectReason::PendingTransferAlreadyResolved => "PENDING_TRANSFER_ALREADY_RESOLVED",
            RejectReason::PendingTransferHasDifferentAccounts => {
                "PENDING_TRANSFER_HAS_DIFFERENT_ACCOUNTS"
            }
            RejectReason::AmountExceedsLimit => "AMOUNT_EXCEEDS_LIMIT",
            RejectReason::AccountNotFound => "ACCOUNT_NOT_FOUND",
            RejectReason::InsufficientBalance => "INSUFFICIENT_BALANCE",
        }
    }

    /// True for reasons produced by chain propagation rather than by the
    /// transfer's own content
    #[inline]
    pub fn is_chain_outcome(&self) -> bool {
        matches!(
            self,
            RejectReason::LinkedTransferFailed | RejectReason::LinkedChainOpen
        )
    }
}

/// Errors that reject a batch as a whole, before any transfer is evaluated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch of {len} transfers exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
}
