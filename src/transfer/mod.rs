//! Transfer Intent Validation
//!
//! Turns a batch of submitted transfers into per-transfer outcomes:
//! an accepted [`MutationIntent`] for the ledger store, or a [`RejectReason`].
//!
//! # Transfer Kinds
//!
//! ```text
//! flags                      intent    effect
//! ─────────────────────────  ────────  ─────────────────────────────────
//! (none)                     DIRECT    debit → credit immediately
//! pending                    RESERVE   hold amount on both accounts
//! post_pending_transfer      POST      finalize ≤ reserved amount
//! void_pending_transfer      VOID      release the reservation
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Decode-First**: raw flags are decoded before anything else looks at them
//! 2. **Resolve-Once**: a pending transfer is posted, voided, or expired exactly once
//! 3. **Chain Atomicity**: a linked chain is accepted whole or rejected whole
//! 4. **Read-Only Snapshot**: validation never mutates the ledger store

pub mod adapters;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod types;

mod scope;

// Re-exports for convenience
pub use adapters::{AccountBalance, LedgerSnapshot, MemoryLedger, StoreError};
pub use coordinator::TransferCoordinator;
pub use error::{BatchError, RejectReason};
pub use state::{PendingState, PendingTransfer, Resolution};
pub use types::{BatchResult, IntentKind, MutationIntent, Outcome, Transfer};
