//! Transfer Flag Codec
//!
//! The `flags` field of a transfer is a `u32` bitmask. Only the low six bits
//! carry meaning; every other bit is reserved and makes the transfer invalid.
//!
//! ```text
//! bit  5               4              3                      2                      1        0
//!      credits_at_most debits_at_most void_pending_transfer  post_pending_transfer  pending  linked
//! ```
//!
//! A [`TransferFlags`] value can only be obtained through [`TransferFlags::decode`]
//! (or the named constants), so code holding one never sees reserved bits.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::transfer::error::RejectReason;

/// Validated set of transfer flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TransferFlags(u32);

impl TransferFlags {
    pub const NONE: Self = Self(0);
    /// Chain this transfer with the next one in the batch
    pub const LINKED: Self = Self(1 << 0);
    /// Reserve the amount without finalizing (two-phase, phase one)
    pub const PENDING: Self = Self(1 << 1);
    /// Finalize a pending transfer, possibly for a smaller amount
    pub const POST_PENDING_TRANSFER: Self = Self(1 << 2);
    /// Cancel a pending transfer and release the reservation
    pub const VOID_PENDING_TRANSFER: Self = Self(1 << 3);
    /// Debit side amount is an upper bound
    pub const DEBITS_AT_MOST: Self = Self(1 << 4);
    /// Credit side amount is an upper bound
    pub const CREDITS_AT_MOST: Self = Self(1 << 5);

    /// Mask of every recognized bit
    pub const KNOWN_BITS: u32 = 0b0011_1111;

    const NAMED: [(Self, &'static str); 6] = [
        (Self::LINKED, "linked"),
        (Self::PENDING, "pending"),
        (Self::POST_PENDING_TRANSFER, "post_pending_transfer"),
        (Self::VOID_PENDING_TRANSFER, "void_pending_transfer"),
        (Self::DEBITS_AT_MOST, "debits_at_most"),
        (Self::CREDITS_AT_MOST, "credits_at_most"),
    ];

    /// Decode a raw bitmask
    ///
    /// # Errors
    /// [`RejectReason::InvalidFlags`] if any reserved bit (6..32) is set.
    #[inline]
    pub const fn decode(raw: u32) -> Result<Self, RejectReason> {
        if raw & !Self::KNOWN_BITS != 0 {
            return Err(RejectReason::InvalidFlags);
        }
        Ok(Self(raw))
    }

    /// Encode back to the wire bitmask (exact inverse of `decode`)
    #[inline]
    pub const fn encode(self) -> u32 {
        self.0
    }

    /// Read the `linked` bit straight from a raw bitmask.
    ///
    /// Chain boundaries depend only on bit 0, so this is valid even when
    /// `raw` carries reserved bits and fails to decode.
    #[inline]
    pub const fn chain_bit(raw: u32) -> bool {
        raw & Self::LINKED.0 != 0
    }

    /// Return a copy with `other`'s flags added
    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Return a copy with `other`'s flags cleared
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn has_linked(self) -> bool {
        self.contains(Self::LINKED)
    }

    #[inline]
    pub const fn has_pending(self) -> bool {
        self.contains(Self::PENDING)
    }

    #[inline]
    pub const fn has_post_pending_transfer(self) -> bool {
        self.contains(Self::POST_PENDING_TRANSFER)
    }

    #[inline]
    pub const fn has_void_pending_transfer(self) -> bool {
        self.contains(Self::VOID_PENDING_TRANSFER)
    }

    #[inline]
    pub const fn has_debits_at_most(self) -> bool {
        self.contains(Self::DEBITS_AT_MOST)
    }

    #[inline]
    pub const fn has_credits_at_most(self) -> bool {
        self.contains(Self::CREDITS_AT_MOST)
    }

    /// True if this transfer resolves (posts or voids) a pending transfer
    #[inline]
    pub const fn is_resolution(self) -> bool {
        self.has_post_pending_transfer() || self.has_void_pending_transfer()
    }

    /// Names of the set flags, lowest bit first
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl BitOr for TransferFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl TryFrom<u32> for TransferFlags {
    type Error = RejectReason;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::decode(raw)
    }
}

impl From<TransferFlags> for u32 {
    fn from(flags: TransferFlags) -> Self {
        flags.encode()
    }
}

impl fmt::Display for TransferFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.names().collect();
        write!(f, "{}", names.join("|"))
    }
}
