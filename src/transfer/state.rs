//! Pending Transfer State Machine
//!
//! ```text
//! PENDING ──post──▶ POSTED   (terminal)
//!    │
//!    ├────void──▶ VOIDED     (terminal)
//!    │
//!    └──expire──▶ EXPIRED    (terminal, driven by the ledger store's timeout)
//! ```
//!
//! Any transition out of a terminal state fails with
//! [`RejectReason::PendingTransferAlreadyResolved`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::RejectReason;
use crate::core_types::{AccountId, Amount, LedgerId, TransferId};

/// Pending transfer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingState {
    /// Amount reserved on both accounts, not yet resolved
    Pending,

    /// Terminal: finalized, possibly for less than the reservation
    Posted,

    /// Terminal: cancelled, reservation released
    Voided,

    /// Terminal: timed out, reservation released
    Expired,
}

/// A transition applied to a pending transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Post,
    Void,
    Expire,
}

impl PendingState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PendingState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingState::Pending => "PENDING",
            PendingState::Posted => "POSTED",
            PendingState::Voided => "VOIDED",
            PendingState::Expired => "EXPIRED",
        }
    }

    /// Apply a resolution, returning the new state
    pub fn transition(self, resolution: Resolution) -> Result<PendingState, RejectReason> {
        if self.is_terminal() {
            return Err(RejectReason::PendingTransferAlreadyResolved);
        }
        Ok(match resolution {
            Resolution::Post => PendingState::Posted,
            Resolution::Void => PendingState::Voided,
            Resolution::Expire => PendingState::Expired,
        })
    }
}

impl fmt::Display for PendingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A two-phase reservation as seen by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub id: TransferId,
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
    /// Reserved amount
    pub amount: Amount,
    #[serde(default)]
    pub ledger: LedgerId,
    #[serde(default)]
    pub code: u16,
    /// Seconds until the store expires the reservation (0 = never)
    #[serde(default)]
    pub timeout: u32,
    #[serde(default = "PendingTransfer::default_state")]
    pub state: PendingState,
}

impl PendingTransfer {
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
            ledger: 0,
            code: 0,
            timeout: 0,
            state: PendingState::Pending,
        }
    }

    fn default_state() -> PendingState {
        PendingState::Pending
    }
}
