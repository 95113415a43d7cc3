//! Transfer Intent - flag codec and batch validator for a double-entry ledger
//!
//! Each submitted transfer carries a 32-bit flags field. This crate decodes
//! it, checks that the combination is legal for the transfer's context, and
//! walks a batch in order, committing or failing linked chains as a unit.
//! Accepted transfers become [`MutationIntent`]s for the ledger store.
//!
//! # Modules
//!
//! - [`core_types`] - Id and amount aliases
//! - [`flags`] - Flag codec (`TransferFlags`)
//! - [`transfer`] - Validator, chain coordinator, pending-transfer states
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup
//! - [`batch_io`] - JSON scenario loading

// Core types - must be first!
pub mod core_types;

pub mod batch_io;
pub mod config;
pub mod flags;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use core_types::{AccountId, Amount, BatchIndex, LedgerId, TransferId};
pub use flags::TransferFlags;
pub use transfer::{
    AccountBalance, BatchError, BatchResult, IntentKind, LedgerSnapshot, MemoryLedger,
    MutationIntent, Outcome, PendingState, PendingTransfer, RejectReason, Transfer,
    TransferCoordinator,
};
