// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::cell::RefCell;

use crate::binding::BindGroupLayout;
use crate::error::Result;

/// Per-device map from structural identifiers to canonical
/// [`BindGroupLayout`]s.
///
/// The registry is owned by the device (not by its shared interior), so
/// dropping the device releases every canonical layout even while resource
/// wrappers are still alive.
#[derive(Default)]
pub struct LayoutRegistry {
    entries: RefCell<BTreeMap<String, BindGroupLayout>>,
}

impl core::fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl LayoutRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `layout` under its structural identifier.
    ///
    /// Re-inserting the same layout object is a no-op. Inserting a
    /// *different* object with the same identifier replaces the previous
    /// entry; outstanding handles to the replaced layout stay valid, they
    /// just stop being canonical.
    ///
    /// # Errors
    ///
    /// The identifier-read errors of [`BindGroupLayout::identifier`].
    pub fn insert(&self, layout: &BindGroupLayout) -> Result<()> {
        let key = layout.identifier()?;
        let mut entries = self.entries.borrow_mut();
        match entries.get(&key) {
            Some(existing) if BindGroupLayout::ptr_eq(existing, layout) => {}
            _ => {
                entries.insert(key, layout.clone());
            }
        }
        Ok(())
    }

    /// Returns the canonical layout for `layout`'s structure.
    ///
    /// If a layout with the same identifier is already registered, that one
    /// wins and `layout` is discarded by the caller; otherwise `layout`
    /// itself becomes canonical. This is the path shader construction
    /// takes, so equal shader structures share native layouts.
    ///
    /// # Errors
    ///
    /// The identifier-read errors of [`BindGroupLayout::identifier`].
    pub fn canonical(&self, layout: &BindGroupLayout) -> Result<BindGroupLayout> {
        let key = layout.identifier()?;
        let mut entries = self.entries.borrow_mut();
        if let Some(existing) = entries.get(&key) {
            return Ok(existing.clone());
        }
        entries.insert(key, layout.clone());
        Ok(layout.clone())
    }

    /// Looks up a layout by identifier.
    #[must_use]
    pub fn lookup(&self, identifier: &str) -> Option<BindGroupLayout> {
        self.entries.borrow().get(identifier).cloned()
    }

    /// Number of registered layouts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
