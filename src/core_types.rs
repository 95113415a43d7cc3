//! Core types used throughout the validator
//!
//! Fundamental type aliases shared by every module. Id `0` is reserved
//! as "none" for all identifiers.

/// Transfer ID - unique within the ledger.
pub type TransferId = u64;

/// Account ID - owned and created by the external ledger store.
pub type AccountId = u64;

/// Amount in the ledger's smallest unit.
pub type Amount = u64;

/// Ledger partition identifier.
pub type LedgerId = u32;

/// Position of a transfer inside its submission batch.
pub type BatchIndex = u32;
