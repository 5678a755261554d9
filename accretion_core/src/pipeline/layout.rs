// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::backend::{NativeKey, PipelineLayoutDescriptor};
use crate::binding::BindGroupLayout;
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::{Error, Result};
use crate::object::{GpuObject, GpuResource, ListenerId, ObjectKind};
use crate::reason::{CHILD_DATA, SETTING};

struct GroupSlot {
    layout: BindGroupLayout,
    listener: ListenerId,
}

struct PipelineLayoutInner {
    object: GpuObject,
    groups: RefCell<Vec<GroupSlot>>,
    native: NativeCell<NativeKey>,
}

impl Drop for PipelineLayoutInner {
    fn drop(&mut self) {
        for slot in self.groups.get_mut() {
            slot.layout.remove_invalidation_listener(slot.listener);
        }
    }
}

/// The ordered set of bind group layouts a pipeline binds against.
///
/// Structural changes anywhere below arrive as `CHILD_DATA` and expire the
/// native layout. [`replace_group`](Self::replace_group) swaps one group
/// layout for a structurally compatible one; pipelines built on this
/// layout keep working and regenerate on their next read.
#[derive(Clone)]
pub struct PipelineLayout {
    inner: Rc<PipelineLayoutInner>,
}

impl core::fmt::Debug for PipelineLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PipelineLayout")
            .field("tag", &self.inner.object.tag())
            .field("groups", &self.inner.groups.borrow().len())
            .finish_non_exhaustive()
    }
}

impl PipelineLayout {
    /// Creates a layout over the given group layouts, in group order.
    #[must_use]
    pub fn new(device: &GpuDevice, layouts: &[BindGroupLayout]) -> Self {
        let inner = Rc::new(PipelineLayoutInner {
            object: GpuObject::new(device.shared().clone(), ObjectKind::PipelineLayout),
            groups: RefCell::new(Vec::with_capacity(layouts.len())),
            native: NativeCell::new(CacheLifetime::Persistent),
        });
        let this = Self { inner };
        let slots = layouts
            .iter()
            .map(|layout| GroupSlot {
                layout: layout.clone(),
                listener: this.forward_from(layout),
            })
            .collect();
        *this.inner.groups.borrow_mut() = slots;
        this
    }

    fn forward_from(&self, layout: &BindGroupLayout) -> ListenerId {
        let weak = Rc::downgrade(&self.inner);
        layout.add_invalidation_listener(None, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.object.trigger_auto_update(CHILD_DATA);
            }
        })
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.inner.groups.borrow().len()
    }

    /// The layout at `index`, if in range.
    #[must_use]
    pub fn group(&self, index: usize) -> Option<BindGroupLayout> {
        self.inner
            .groups
            .borrow()
            .get(index)
            .map(|slot| slot.layout.clone())
    }

    /// Swaps the group at `index` for `replacement`.
    ///
    /// The replacement must be structurally compatible with the group it
    /// replaces: same binding count, same binding names in the same order,
    /// same memory layout kinds, and visibility covering at least the
    /// stages the original declared. Access modes may differ; they do not
    /// affect how pipelines bind.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] for an out-of-range index,
    /// [`Error::ReplacementIncompatible`] when the structures disagree,
    /// and [`Error::UseAfterDeconstruct`] after teardown.
    pub fn replace_group(&self, index: usize, replacement: &BindGroupLayout) -> Result<()> {
        if self.inner.object.is_deconstructed() {
            return Err(Error::UseAfterDeconstruct {
                object: self.inner.object.kind().as_str(),
            });
        }
        let current = self.group(index).ok_or_else(|| {
            Error::InvalidConfiguration(alloc::format!("pipeline layout has no group {index}"))
        })?;
        // Force both through their setup gates before comparing.
        current.identifier()?;
        replacement.identifier()?;
        Self::check_compatible(&current, replacement)?;

        let listener = self.forward_from(replacement);
        {
            let mut groups = self.inner.groups.borrow_mut();
            let slot = &mut groups[index];
            slot.layout.remove_invalidation_listener(slot.listener);
            *slot = GroupSlot {
                layout: replacement.clone(),
                listener,
            };
        }
        self.inner.object.invalidate(SETTING);
        Ok(())
    }

    fn check_compatible(current: &BindGroupLayout, replacement: &BindGroupLayout) -> Result<()> {
        current.with_slots(|a| {
            replacement.with_slots(|b| {
                if a.len() != b.len() {
                    return Err(Error::ReplacementIncompatible(alloc::format!(
                        "expected {} bindings, replacement has {}",
                        a.len(),
                        b.len()
                    )));
                }
                for (have, got) in a.iter().zip(b) {
                    if have.name != got.name {
                        return Err(Error::ReplacementIncompatible(alloc::format!(
                            "binding {} is named `{}`, replacement names it `{}`",
                            have.index,
                            have.name,
                            got.name
                        )));
                    }
                    if have.layout.kind() != got.layout.kind() {
                        return Err(Error::ReplacementIncompatible(alloc::format!(
                            "binding `{}` changes memory layout kind",
                            have.name
                        )));
                    }
                    if !got.visibility.is_superset(have.visibility) {
                        return Err(Error::ReplacementIncompatible(alloc::format!(
                            "binding `{}` loses stage visibility",
                            have.name
                        )));
                    }
                }
                Ok(())
            })
        })
    }

    /// The native pipeline layout, regenerated through the read protocol.
    ///
    /// # Errors
    ///
    /// The read protocol errors of this layout and of each group layout.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let groups = inner.groups.borrow();
                let mut keys = Vec::with_capacity(groups.len());
                for slot in groups.iter() {
                    keys.push(slot.layout.native()?);
                }
                drop(groups);
                device.with_backend(|b| {
                    b.create_pipeline_layout(&PipelineLayoutDescriptor { groups: keys })
                })
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the layout down and stops listening on its groups. The group
    /// layouts themselves are left alone. Terminal.
    pub fn deconstruct(&self) {
        for slot in self.inner.groups.borrow().iter() {
            slot.layout.remove_invalidation_listener(slot.listener);
        }
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for PipelineLayout {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccessMode, BufferBindingKind, StageSet};
    use crate::memory::BufferMemoryLayout;
    use crate::testing::{TestBackend, TestHandle};
    use alloc::boxed::Box;

    fn make_device() -> (GpuDevice, TestHandle) {
        let backend = TestBackend::new();
        let handle = backend.handle();
        (GpuDevice::new(Box::new(backend)), handle)
    }

    fn layout_with(
        device: &GpuDevice,
        name: &str,
        visibility: StageSet,
        access: AccessMode,
    ) -> BindGroupLayout {
        let memory = BufferMemoryLayout::new(device, BufferBindingKind::Uniform);
        let layout = BindGroupLayout::new(device);
        layout
            .setup(|s| s.add_binding(0, name, memory, visibility, access))
            .unwrap();
        layout
    }

    #[test]
    fn group_structure_change_expires_the_native() {
        let (device, handle) = make_device();
        let memory = BufferMemoryLayout::new(&device, BufferBindingKind::Uniform);
        let group = BindGroupLayout::new(&device);
        group
            .setup(|s| s.add_binding(0, "frame", memory.clone(), StageSet::VERTEX, AccessMode::Read))
            .unwrap();
        let layout = PipelineLayout::new(&device, core::slice::from_ref(&group));

        let first = layout.native().unwrap();
        assert_eq!(handle.created(), 2, "group layout and pipeline layout");

        // memory layout -> group layout -> pipeline layout
        memory.set_min_size(32);
        assert!(layout.invalidation_reasons().has(CHILD_DATA));
        assert_ne!(layout.native().unwrap(), first);
        assert_eq!(handle.created(), 4);
        assert_eq!(handle.destroyed(), 2);
    }

    #[test]
    fn incompatible_replacements_are_rejected() {
        let (device, _handle) = make_device();
        let group = layout_with(
            &device,
            "frame",
            StageSet::VERTEX.union(StageSet::FRAGMENT),
            AccessMode::Read,
        );
        let layout = PipelineLayout::new(&device, core::slice::from_ref(&group));
        layout.native().unwrap();

        let renamed = layout_with(
            &device,
            "lights",
            StageSet::VERTEX.union(StageSet::FRAGMENT),
            AccessMode::Read,
        );
        assert!(matches!(
            layout.replace_group(0, &renamed),
            Err(Error::ReplacementIncompatible(_))
        ));

        let narrowed = layout_with(&device, "frame", StageSet::VERTEX, AccessMode::Read);
        assert!(matches!(
            layout.replace_group(0, &narrowed),
            Err(Error::ReplacementIncompatible(_))
        ));

        // Widened visibility and a different access mode are both fine.
        let widened = layout_with(
            &device,
            "frame",
            StageSet::VERTEX.union(StageSet::FRAGMENT).union(StageSet::COMPUTE),
            AccessMode::ReadWrite,
        );
        layout.replace_group(0, &widened).unwrap();
    }

    #[test]
    fn replacement_rewires_the_forwarding_listener() {
        let (device, handle) = make_device();
        let original = layout_with(&device, "frame", StageSet::VERTEX, AccessMode::Read);
        let layout = PipelineLayout::new(&device, core::slice::from_ref(&original));
        layout.native().unwrap();
        let baseline = handle.created();

        let replacement = layout_with(&device, "frame", StageSet::VERTEX, AccessMode::Read);
        layout.replace_group(0, &replacement).unwrap();
        layout.native().unwrap();
        // Changes on the detached original no longer reach the layout.
        let settled = layout.native().unwrap();
        original.deconstruct();
        assert_eq!(layout.native().unwrap(), settled);
        assert!(handle.created() > baseline);
    }

    #[test]
    fn out_of_range_replacement_is_invalid() {
        let (device, _handle) = make_device();
        let layout = PipelineLayout::new(&device, &[]);
        let group = layout_with(&device, "frame", StageSet::VERTEX, AccessMode::Read);
        assert!(matches!(
            layout.replace_group(0, &group),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
