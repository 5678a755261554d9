// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed invalidation reasons.
//!
//! Every GPU object carries a [`ReasonSet`] accumulating why its native
//! object is stale. Reasons keep their identity until the native object is
//! regenerated: callers (and destroy hooks) can ask "was it the data, or
//! just a setting?" and react differently.
//!
//! # Well-known reasons
//!
//! - [`SETTING`] — an own property of the object changed.
//! - [`DATA`] — the attached payload or resource data changed.
//! - [`CHILD_DATA`] — a dependency reported a change; used by the forwarding
//!   listeners that stitch the dependency graph together.
//! - [`LIFE_TIME`] — the cache's lifetime policy expired the native object.
//!   Cleared on regeneration like any other reason.
//! - [`DECONSTRUCT`] — the object was torn down. Sticky: survives
//!   [`ReasonSet::clear`] and can never be unset.
//!
//! Applications may define further reasons with [`Reason::new`] using
//! indices 8 through 61. Indices 62 and 63 are reserved for the two
//! lifecycle reasons above.

use crate::error::{Error, Result};

/// One cause of invalidation, identified by a small index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reason(u8);

/// An own property of the object changed.
pub const SETTING: Reason = Reason::new(0);

/// The attached payload or resource data changed.
pub const DATA: Reason = Reason::new(1);

/// A dependency reported a change.
pub const CHILD_DATA: Reason = Reason::new(2);

/// The cache's lifetime policy expired the native object.
pub const LIFE_TIME: Reason = Reason(62);

/// The object was deconstructed. Sticky.
pub const DECONSTRUCT: Reason = Reason(63);

impl Reason {
    /// Creates a reason with the given index.
    ///
    /// Indices 0–7 are claimed by the well-known constants in this module;
    /// applications should use 8–61.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 62 or above (reserved for [`LIFE_TIME`] and
    /// [`DECONSTRUCT`]).
    #[must_use]
    pub const fn new(index: u8) -> Self {
        assert!(index < 62, "reason indices 62 and 63 are reserved");
        Self(index)
    }

    /// Returns the reason's index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    const fn bit(self) -> u64 {
        1 << self.0
    }
}

impl core::fmt::Debug for Reason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            0 => write!(f, "SETTING"),
            1 => write!(f, "DATA"),
            2 => write!(f, "CHILD_DATA"),
            62 => write!(f, "LIFE_TIME"),
            63 => write!(f, "DECONSTRUCT"),
            n => write!(f, "Reason({n})"),
        }
    }
}

/// An immutable set of reasons, used for listener filters and snapshots.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReasonMask(u64);

impl ReasonMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// Returns a mask containing only `reason`.
    #[must_use]
    pub const fn only(reason: Reason) -> Self {
        Self(reason.bit())
    }

    /// Returns this mask with `reason` added.
    #[must_use]
    pub const fn with(self, reason: Reason) -> Self {
        Self(self.0 | reason.bit())
    }

    /// Returns the union of both masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if `reason` is in the mask.
    #[must_use]
    pub const fn contains(self, reason: Reason) -> bool {
        self.0 & reason.bit() != 0
    }

    /// Returns `true` if no reason is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw bit representation (bit `n` = reason index `n`).
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Reconstructs a mask from [`Self::bits`].
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl core::fmt::Debug for ReasonMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ReasonMask[")?;
        let mut first = true;
        for index in 0..=63 {
            if self.0 & (1 << index) != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{:?}", Reason(index))?;
                first = false;
            }
        }
        write!(f, "]")
    }
}

/// The per-object accumulator of pending invalidation reasons.
///
/// Two reasons carry flag semantics on top of plain membership:
///
/// - [`LIFE_TIME`] behaves like any recorded reason but is also queryable
///   via [`Self::life_time_reached`]; it is reset by [`Self::clear`].
/// - [`DECONSTRUCT`] is monotonic. Once set it survives [`Self::clear`],
///   and [`Self::set_deconstructed`] refuses to revert it.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ReasonSet(u64);

impl ReasonSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Records a reason. Recording [`DECONSTRUCT`] sets the sticky flag.
    pub fn add(&mut self, reason: Reason) {
        self.0 |= reason.bit();
    }

    /// Returns `true` if `reason` was recorded since the last clear.
    #[must_use]
    pub const fn has(self, reason: Reason) -> bool {
        self.0 & reason.bit() != 0
    }

    /// Returns `true` if any reason (including the lifecycle flags) is
    /// pending.
    #[must_use]
    pub const fn any(self) -> bool {
        self.0 != 0
    }

    /// Clears all recorded reasons and the life-time flag. The deconstruct
    /// flag survives.
    pub fn clear(&mut self) {
        self.0 &= DECONSTRUCT.bit();
    }

    /// Returns `true` if the lifetime policy expired the native object.
    #[must_use]
    pub const fn life_time_reached(self) -> bool {
        self.has(LIFE_TIME)
    }

    /// Returns `true` if the object was deconstructed.
    #[must_use]
    pub const fn deconstructed(self) -> bool {
        self.has(DECONSTRUCT)
    }

    /// Sets or re-affirms the deconstruct flag.
    ///
    /// Setting `true` is idempotent. Setting `false` after the flag was set
    /// fails with [`Error::InvalidOperation`]; the flag is monotonic.
    pub fn set_deconstructed(&mut self, value: bool) -> Result<()> {
        if value {
            self.0 |= DECONSTRUCT.bit();
            Ok(())
        } else if self.deconstructed() {
            Err(Error::InvalidOperation(
                "deconstruct reason cannot be reverted",
            ))
        } else {
            Ok(())
        }
    }

    /// Returns the set as a [`ReasonMask`] snapshot.
    #[must_use]
    pub const fn mask(self) -> ReasonMask {
        ReasonMask(self.0)
    }
}

impl core::fmt::Debug for ReasonSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ReasonSet{:?}", self.mask())
    }
}
