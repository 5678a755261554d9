// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt::Write as _;

use crate::backend::{AccessMode, BindGroupLayoutDescriptor, LayoutEntry, NativeKey, StageSet};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::{Error, Result};
use crate::memory::MemoryLayout;
use crate::object::{GpuObject, GpuResource, ListenerId, ObjectKind};
use crate::reason::{CHILD_DATA, SETTING};
use crate::setup::{SetupPhase, SetupToken};
use crate::trace::SetupCompletedEvent;

/// One sealed binding slot of a [`BindGroupLayout`].
pub(crate) struct BindingSlot {
    pub(crate) index: u32,
    pub(crate) name: String,
    pub(crate) layout: MemoryLayout,
    pub(crate) visibility: StageSet,
    pub(crate) access: AccessMode,
    listener: ListenerId,
}

#[derive(Debug)]
struct StagedBinding {
    index: u32,
    name: String,
    layout: MemoryLayout,
    visibility: StageSet,
    access: AccessMode,
}

struct BindGroupLayoutInner {
    object: GpuObject,
    phase: SetupPhase,
    bindings: RefCell<Vec<BindingSlot>>,
    identifier: RefCell<String>,
    native: NativeCell<NativeKey>,
}

impl BindGroupLayoutInner {
    /// Rebuilds the cached structural identifier from the sealed slots.
    /// Registered as the object's first listener, so it runs before any
    /// dependent hears about a change.
    fn recompute_identifier(&self) {
        let mut out = String::new();
        for slot in self.bindings.borrow().iter() {
            let _ = write!(
                out,
                "b{}:{}:{}:{}:{};",
                slot.index,
                slot.name,
                slot.access.token(),
                slot.visibility.bits(),
                slot.layout.kind().as_str(),
            );
        }
        *self.identifier.borrow_mut() = out;
    }
}

impl Drop for BindGroupLayoutInner {
    fn drop(&mut self) {
        for slot in self.bindings.get_mut() {
            slot.layout.remove_invalidation_listener(slot.listener);
        }
    }
}

/// A sealed declaration of named binding slots, deduplicated structurally.
///
/// Configure it once through [`setup`](Self::setup); any derived read
/// ([`identifier`](Self::identifier), [`native`](Self::native)) before that
/// seals it empty instead. The structural identifier is a deterministic
/// function of the slots (index, name, access, visibility, memory-layout
/// kind), so layouts built independently for the same shader structure
/// collide in the [`LayoutRegistry`](crate::binding::LayoutRegistry) — which
/// is the point.
#[derive(Clone)]
pub struct BindGroupLayout {
    inner: Rc<BindGroupLayoutInner>,
}

impl core::fmt::Debug for BindGroupLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BindGroupLayout")
            .field("tag", &self.inner.object.tag())
            .field("identifier", &*self.inner.identifier.borrow())
            .finish_non_exhaustive()
    }
}

impl BindGroupLayout {
    /// Creates an unsealed layout with no bindings.
    #[must_use]
    pub fn new(device: &GpuDevice) -> Self {
        let inner = Rc::new(BindGroupLayoutInner {
            object: GpuObject::new(device.shared().clone(), ObjectKind::BindGroupLayout),
            phase: SetupPhase::new(),
            bindings: RefCell::new(Vec::new()),
            identifier: RefCell::new(String::new()),
            native: NativeCell::new(CacheLifetime::Persistent),
        });
        let weak = Rc::downgrade(&inner);
        let _ = inner.object.add_invalidation_listener(None, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.recompute_identifier();
            }
        });
        Self { inner }
    }

    /// Returns `true` if both handles refer to the same layout object.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Runs `f` with a setup object collecting binding declarations, then
    /// validates and seals them.
    ///
    /// On any failure — from `f` itself or from validation — the layout
    /// reverts to the unsealed state so the caller can retry.
    ///
    /// # Errors
    ///
    /// [`Error::DoubleSetup`] once sealed (explicitly or by a read),
    /// [`Error::InvalidConfiguration`] for duplicate names or
    /// non-contiguous indices, and whatever `f` returns.
    pub fn setup(&self, f: impl FnOnce(BindGroupLayoutSetup) -> Result<()>) -> Result<()> {
        let token = self.inner.phase.begin()?;
        let staged = Rc::new(RefCell::new(Vec::new()));
        let setup = BindGroupLayoutSetup {
            token: token.clone(),
            staged: staged.clone(),
        };
        if let Err(e) = f(setup) {
            self.inner.phase.abort(&token);
            return Err(e);
        }
        if let Err(e) = self.apply(staged.take()) {
            self.inner.phase.abort(&token);
            return Err(e);
        }
        self.inner.phase.complete(&token)?;
        self.inner.object.device().trace(|t| {
            t.setup_completed(&SetupCompletedEvent {
                object: self.inner.object.tag(),
            });
        });
        self.inner.object.invalidate(SETTING);
        Ok(())
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "binding counts are tiny; position always fits u32"
    )]
    fn apply(&self, staged: Vec<StagedBinding>) -> Result<()> {
        let mut sorted = staged;
        sorted.sort_by_key(|binding| binding.index);
        for (position, binding) in sorted.iter().enumerate() {
            // Catches gaps and duplicate indices both.
            if binding.index != position as u32 {
                return Err(Error::InvalidConfiguration(alloc::format!(
                    "binding indices must be contiguous from 0; index {} is out of place",
                    binding.index
                )));
            }
        }
        for (i, binding) in sorted.iter().enumerate() {
            if sorted[..i].iter().any(|other| other.name == binding.name) {
                return Err(Error::InvalidConfiguration(alloc::format!(
                    "binding name `{}` is declared twice",
                    binding.name
                )));
            }
        }

        let mut slots = Vec::with_capacity(sorted.len());
        for binding in sorted {
            let weak = Rc::downgrade(&self.inner);
            let listener = binding.layout.add_invalidation_listener(None, move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.object.trigger_auto_update(CHILD_DATA);
                }
            });
            slots.push(BindingSlot {
                index: binding.index,
                name: binding.name,
                layout: binding.layout,
                visibility: binding.visibility,
                access: binding.access,
                listener,
            });
        }
        *self.inner.bindings.borrow_mut() = slots;
        Ok(())
    }

    /// The structural identifier. Seals the layout empty when called before
    /// any setup.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSetup`] while the setup callback is running, and
    /// [`Error::UseAfterDeconstruct`] after teardown.
    pub fn identifier(&self) -> Result<String> {
        self.ensure_ready()?;
        Ok(self.inner.identifier.borrow().clone())
    }

    /// The native bind group layout, regenerated through the read protocol.
    ///
    /// # Errors
    ///
    /// The gate errors of [`identifier`](Self::identifier), plus the read
    /// protocol errors of [`NativeCell::read`].
    pub fn native(&self) -> Result<NativeKey> {
        self.ensure_ready()?;
        let device = self.inner.object.device().clone();
        self.inner.native.read(
            &self.inner.object,
            || {
                let entries: Vec<LayoutEntry> = self
                    .inner
                    .bindings
                    .borrow()
                    .iter()
                    .map(|slot| LayoutEntry {
                        binding: slot.index,
                        visibility: slot.visibility,
                        access: slot.access,
                        kind: slot.layout.binding_kind(),
                    })
                    .collect();
                device.with_backend(|b| b.create_bind_group_layout(&BindGroupLayoutDescriptor { entries }))
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Number of sealed binding slots (0 before setup).
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    pub(crate) fn with_slots<R>(&self, f: impl FnOnce(&[BindingSlot]) -> R) -> R {
        f(&self.inner.bindings.borrow())
    }

    /// Tears the layout down: destroys the cached native object and stops
    /// listening on the binding memory layouts. Terminal.
    pub fn deconstruct(&self) {
        for slot in self.inner.bindings.borrow().iter() {
            slot.layout.remove_invalidation_listener(slot.listener);
        }
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.inner.object.is_deconstructed() {
            return Err(Error::UseAfterDeconstruct {
                object: self.inner.object.kind().as_str(),
            });
        }
        let implicit = self
            .inner
            .phase
            .ensure_ready_for_read("bind group layout is still being set up")?;
        if implicit {
            self.inner.object.device().trace(|t| {
                t.setup_completed(&SetupCompletedEvent {
                    object: self.inner.object.tag(),
                });
            });
        }
        Ok(())
    }
}

impl GpuResource for BindGroupLayout {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

/// The mutation surface handed to a [`BindGroupLayout::setup`] callback.
///
/// Cloning or stashing it past the callback is allowed but useless: every
/// method checks the setup token and fails with
/// [`Error::NotInSetup`] once the setup has ended.
#[derive(Clone)]
pub struct BindGroupLayoutSetup {
    token: SetupToken,
    staged: Rc<RefCell<Vec<StagedBinding>>>,
}

impl core::fmt::Debug for BindGroupLayoutSetup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BindGroupLayoutSetup")
            .field("staged", &self.staged.borrow().len())
            .finish_non_exhaustive()
    }
}

impl BindGroupLayoutSetup {
    /// Declares one binding slot.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSetup`] once the owning setup has ended.
    pub fn add_binding(
        &self,
        index: u32,
        name: &str,
        layout: impl Into<MemoryLayout>,
        visibility: StageSet,
        access: AccessMode,
    ) -> Result<()> {
        self.token
            .ensure_in_setup("bind group layout setup has ended; bindings can no longer be added")?;
        self.staged.borrow_mut().push(StagedBinding {
            index,
            name: name.into(),
            layout: layout.into(),
            visibility,
            access,
        });
        Ok(())
    }
}
