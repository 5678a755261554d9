// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Step identity for pass stores.

use core::fmt;

/// A handle to a step in a [`RenderPass`](crate::RenderPass) or
/// [`ComputePass`](crate::ComputePass).
///
/// Contains both a slot index and a generation counter so that stale
/// handles can be detected after a step is removed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId {
    /// Slot index into the pass's step store.
    pub(crate) idx: u32,
    /// Generation counter, must match the store's generation for the slot.
    pub(crate) generation: u32,
}

impl StepId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepId({}@gen{})", self.idx, self.generation)
    }
}
