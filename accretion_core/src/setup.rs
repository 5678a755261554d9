// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The setup gate for objects that are configured once, then sealed.
//!
//! Some wrappers (bind group layouts, render targets) collect their
//! configuration through a setup callback and reject mutation afterwards.
//! [`SetupPhase`] tracks the three states of that protocol:
//!
//! - **not setup** — nothing happened yet. A manual setup may begin; a
//!   derived read performs an implicit empty setup instead of failing.
//! - **in setup** — the setup callback is running. Derived reads fail with
//!   [`Error::NotInSetup`]; beginning again fails.
//! - **ready** — terminal. A later manual setup fails with
//!   [`Error::DoubleSetup`].
//!
//! A failed setup reverts to **not setup**, so the caller may fix its
//! configuration and retry.
//!
//! [`SetupToken`] is the defusing half: the setup object handed to the
//! callback carries a clone, and every mutator checks it first. When the
//! setup ends (completed or aborted), the token is defused, so a setup
//! object stashed by the callback and used later fails with
//! [`Error::NotInSetup`] instead of mutating a sealed object.

use alloc::rc::Rc;
use core::cell::Cell;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    NotSetup,
    InSetup,
    Ready,
}

/// Tracks the setup state of one object.
#[derive(Debug)]
pub struct SetupPhase {
    phase: Cell<Phase>,
}

impl Default for SetupPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupPhase {
    /// Creates a gate in the **not setup** state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Cell::new(Phase::NotSetup),
        }
    }

    /// Returns `true` once setup completed (explicitly or implicitly).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase.get() == Phase::Ready
    }

    /// Returns `true` while a setup callback is running.
    #[must_use]
    pub fn is_in_setup(&self) -> bool {
        self.phase.get() == Phase::InSetup
    }

    /// Starts a manual setup and returns its live token.
    ///
    /// # Errors
    ///
    /// [`Error::DoubleSetup`] if setup already completed, and
    /// [`Error::InvalidOperation`] if a setup is currently running.
    pub fn begin(&self) -> Result<SetupToken> {
        match self.phase.get() {
            Phase::NotSetup => {
                self.phase.set(Phase::InSetup);
                Ok(SetupToken::live())
            }
            Phase::InSetup => Err(Error::InvalidOperation("setup is already in progress")),
            Phase::Ready => Err(Error::DoubleSetup),
        }
    }

    /// Seals the object and defuses `token`.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSetup`] if `token` was already defused.
    pub fn complete(&self, token: &SetupToken) -> Result<()> {
        token.ensure_in_setup("setup has already ended")?;
        token.defuse();
        self.phase.set(Phase::Ready);
        Ok(())
    }

    /// Abandons a running setup, reverting to **not setup** so the caller
    /// can retry. Does nothing if `token` was already defused.
    pub fn abort(&self, token: &SetupToken) {
        if token.is_live() {
            token.defuse();
            self.phase.set(Phase::NotSetup);
        }
    }

    /// Gate for derived reads (identifiers, native objects).
    ///
    /// In the **not setup** state this performs the implicit empty setup
    /// and returns `true`; when already ready it returns `false`.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSetup`] with the message `what` while a setup callback
    /// is running.
    pub fn ensure_ready_for_read(&self, what: &'static str) -> Result<bool> {
        match self.phase.get() {
            Phase::NotSetup => {
                self.phase.set(Phase::Ready);
                Ok(true)
            }
            Phase::InSetup => Err(Error::NotInSetup(what)),
            Phase::Ready => Ok(false),
        }
    }
}

/// Liveness marker of one setup run, shared with the setup object.
#[derive(Clone, Debug)]
pub struct SetupToken {
    live: Rc<Cell<bool>>,
}

impl SetupToken {
    fn live() -> Self {
        Self {
            live: Rc::new(Cell::new(true)),
        }
    }

    fn defuse(&self) {
        self.live.set(false);
    }

    fn is_live(&self) -> bool {
        self.live.get()
    }

    /// Fails with [`Error::NotInSetup`] (using the message `what`) once the
    /// setup this token belongs to has ended.
    pub fn ensure_in_setup(&self, what: &'static str) -> Result<()> {
        if self.live.get() {
            Ok(())
        } else {
            Err(Error::NotInSetup(what))
        }
    }
}
