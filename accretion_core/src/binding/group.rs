// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::backend::{BindGroupDescriptor, BindGroupEntry, NativeKey};
use crate::binding::{BindData, BindGroupLayout};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::error::{Error, Result};
use crate::object::{GpuObject, GpuResource, ListenerId, ObjectKind};
use crate::reason::{CHILD_DATA, DATA};

struct BoundData {
    data: BindData,
    listener: ListenerId,
}

struct BindGroupInner {
    object: GpuObject,
    layout: BindGroupLayout,
    layout_listener: Cell<Option<ListenerId>>,
    bound: RefCell<BTreeMap<String, BoundData>>,
    native: NativeCell<NativeKey>,
}

impl Drop for BindGroupInner {
    fn drop(&mut self) {
        if let Some(id) = self.layout_listener.take() {
            self.layout.remove_invalidation_listener(id);
        }
        for item in self.bound.get_mut().values() {
            item.data.object().remove_invalidation_listener(item.listener);
        }
    }
}

/// A bind group: one [`BindGroupLayout`] plus concrete data per named slot.
///
/// The group listens on its layout and on every attached resource, so any
/// change below it surfaces as a `CHILD_DATA` invalidation here and the
/// native object regenerates on the next [`native`](Self::native) read.
/// Attaching data is itself a hard `DATA` invalidation, independent of the
/// auto-update flag.
#[derive(Clone)]
pub struct BindGroup {
    inner: Rc<BindGroupInner>,
}

impl core::fmt::Debug for BindGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BindGroup")
            .field("tag", &self.inner.object.tag())
            .field("bound", &self.inner.bound.borrow().len())
            .finish_non_exhaustive()
    }
}

impl BindGroup {
    /// Creates an empty group for `layout`.
    #[must_use]
    pub fn new(layout: &BindGroupLayout) -> Self {
        let inner = Rc::new(BindGroupInner {
            object: GpuObject::new(layout.object().device().clone(), ObjectKind::BindGroup),
            layout: layout.clone(),
            layout_listener: Cell::new(None),
            bound: RefCell::new(BTreeMap::new()),
            native: NativeCell::new(CacheLifetime::Persistent),
        });
        let weak = Rc::downgrade(&inner);
        let id = layout.add_invalidation_listener(None, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.object.trigger_auto_update(CHILD_DATA);
            }
        });
        inner.layout_listener.set(Some(id));
        Self { inner }
    }

    /// The layout this group was created for.
    #[must_use]
    pub fn layout(&self) -> &BindGroupLayout {
        &self.inner.layout
    }

    /// Attaches (or replaces) the data for the named binding.
    ///
    /// The group starts listening on the new resource and stops listening
    /// on the replaced one, then records a hard `DATA` invalidation.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the layout declares no binding `name`,
    /// [`Error::InvalidConfiguration`] when the data kind does not satisfy
    /// the slot's memory layout, and [`Error::UseAfterDeconstruct`] after
    /// teardown.
    pub fn set_data(&self, name: &str, data: impl Into<BindData>) -> Result<()> {
        if self.inner.object.is_deconstructed() {
            return Err(Error::UseAfterDeconstruct {
                object: self.inner.object.kind().as_str(),
            });
        }
        let data = data.into();

        let expected = self.inner.layout.with_slots(|slots| {
            slots
                .iter()
                .find(|slot| slot.name == name)
                .map(|slot| slot.layout.kind())
                .ok_or_else(|| Error::NotFound {
                    what: "binding",
                    name: name.into(),
                })
        })?;
        let got = data.memory_kind();
        if got != expected {
            return Err(Error::InvalidConfiguration(alloc::format!(
                "binding `{name}` expects {} data but got {}",
                expected.as_str(),
                got.as_str(),
            )));
        }

        if let Some(old) = self.inner.bound.borrow_mut().remove(name) {
            old.data.object().remove_invalidation_listener(old.listener);
        }
        let weak = Rc::downgrade(&self.inner);
        let listener = data.add_invalidation_listener(None, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.object.trigger_auto_update(CHILD_DATA);
            }
        });
        self.inner
            .bound
            .borrow_mut()
            .insert(name.into(), BoundData { data, listener });
        self.inner.object.invalidate(DATA);
        Ok(())
    }

    /// The data currently attached to the named binding, if any.
    #[must_use]
    pub fn data(&self, name: &str) -> Option<BindData> {
        self.inner
            .bound
            .borrow()
            .get(name)
            .map(|item| item.data.clone())
    }

    /// The native bind group, regenerated through the read protocol.
    ///
    /// Generation resolves every declared binding in index order, reading
    /// the attached resources' natives along the way.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] (`data for binding `…` is not set`) for a
    /// declared slot with nothing attached, plus the read protocol errors
    /// of the group and of each resolved resource.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let layout_key = inner.layout.native()?;
                let entries = inner.layout.with_slots(|slots| {
                    let bound = inner.bound.borrow();
                    let mut entries = Vec::with_capacity(slots.len());
                    for slot in slots {
                        let Some(item) = bound.get(&slot.name) else {
                            return Err(Error::NotFound {
                                what: "data for binding",
                                name: slot.name.clone(),
                            });
                        };
                        entries.push(BindGroupEntry {
                            binding: slot.index,
                            resource: item.data.resolve()?,
                        });
                    }
                    Ok(entries)
                })?;
                device.with_backend(|b| {
                    b.create_bind_group(&BindGroupDescriptor {
                        layout: layout_key,
                        entries,
                    })
                })
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the group down: destroys the cached native object and stops
    /// listening on the layout and every attached resource. Terminal.
    pub fn deconstruct(&self) {
        if let Some(id) = self.inner.layout_listener.take() {
            self.inner.layout.remove_invalidation_listener(id);
        }
        for item in self.inner.bound.borrow().values() {
            item.data.object().remove_invalidation_listener(item.listener);
        }
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for BindGroup {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        AccessMode, BindingResource, BufferBindingKind, BufferUsage, StageSet, TextureDimension,
    };
    use crate::buffer::GpuBuffer;
    use crate::device::GpuDevice;
    use crate::memory::{BufferMemoryLayout, TextureMemoryLayout};
    use crate::testing::{TestBackend, TestHandle};
    use alloc::boxed::Box;
    use alloc::string::ToString;

    fn make_device() -> (GpuDevice, TestHandle) {
        let backend = TestBackend::new();
        let handle = backend.handle();
        (GpuDevice::new(Box::new(backend)), handle)
    }

    fn frame_layout(device: &GpuDevice) -> (BindGroupLayout, BufferMemoryLayout) {
        let buffer = BufferMemoryLayout::new(device, BufferBindingKind::Uniform);
        let layout = BindGroupLayout::new(device);
        layout
            .setup(|s| {
                s.add_binding(
                    0,
                    "frame",
                    buffer.clone(),
                    StageSet::VERTEX.union(StageSet::FRAGMENT),
                    AccessMode::Read,
                )
            })
            .unwrap();
        (layout, buffer)
    }

    fn uniform_buffer(device: &GpuDevice) -> GpuBuffer {
        GpuBuffer::new(
            device,
            256,
            BufferUsage::UNIFORM.union(BufferUsage::COPY_DST),
        )
    }

    #[test]
    fn missing_data_yields_canonical_error() {
        let (device, _handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);

        let err = group.native().unwrap_err();
        assert_eq!(err.to_string(), "data for binding `frame` is not set");

        group.set_data("frame", uniform_buffer(&device)).unwrap();
        group.native().unwrap();
    }

    #[test]
    fn failed_generation_is_retryable_with_same_state() {
        let (device, handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);

        assert!(group.native().is_err());
        assert!(group.native().is_err(), "identical failure on retry");

        group.set_data("frame", uniform_buffer(&device)).unwrap();
        let key = group.native().unwrap();
        assert_eq!(group.native().unwrap(), key);
        // layout + buffer + group
        assert_eq!(handle.created(), 3);
    }

    #[test]
    fn generated_entries_reference_resolved_natives() {
        let (device, handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);
        let buffer = uniform_buffer(&device);
        group.set_data("frame", buffer.clone()).unwrap();
        group.native().unwrap();

        let entries = handle.last_bind_group_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].binding, 0);
        assert_eq!(
            entries[0].resource,
            BindingResource::Buffer {
                key: buffer.native().unwrap(),
                offset: 0,
                size: 256,
            }
        );
    }

    #[test]
    fn unknown_binding_name_is_not_found() {
        let (device, _handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);
        assert!(matches!(
            group.set_data("ghost", uniform_buffer(&device)),
            Err(Error::NotFound { what: "binding", .. })
        ));
    }

    #[test]
    fn kind_mismatch_is_invalid_configuration() {
        let (device, _handle) = make_device();
        let texture_layout = TextureMemoryLayout::new(&device, TextureDimension::D2);
        let layout = BindGroupLayout::new(&device);
        layout
            .setup(|s| {
                s.add_binding(
                    0,
                    "albedo",
                    texture_layout,
                    StageSet::FRAGMENT,
                    AccessMode::Read,
                )
            })
            .unwrap();

        let group = BindGroup::new(&layout);
        assert!(matches!(
            group.set_data("albedo", uniform_buffer(&device)),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn buffer_setting_change_propagates_to_group() {
        let (device, handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);
        let buffer = uniform_buffer(&device);
        group.set_data("frame", buffer.clone()).unwrap();

        let first = group.native().unwrap();
        buffer.set_size(512);
        let second = group.native().unwrap();
        assert_ne!(first, second);
        // Buffer and group both regenerated; the layout did not.
        assert_eq!(handle.created(), 5);
        assert_eq!(handle.destroyed(), 2);
    }

    #[test]
    fn replacing_data_detaches_the_old_resource() {
        let (device, _handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);

        let first = uniform_buffer(&device);
        let second = uniform_buffer(&device);
        group.set_data("frame", first.clone()).unwrap();
        group.native().unwrap();

        group.set_data("frame", second).unwrap();
        let replaced = group.native().unwrap();

        // The detached buffer no longer reaches the group.
        first.set_size(1024);
        assert_eq!(group.native().unwrap(), replaced);
    }

    #[test]
    fn layout_chain_propagates_depth_first() {
        let (device, handle) = make_device();
        let (layout, memory) = frame_layout(&device);
        let group = BindGroup::new(&layout);
        group.set_data("frame", uniform_buffer(&device)).unwrap();
        group.native().unwrap();
        assert_eq!(handle.created(), 3);

        // memory layout -> bind group layout -> bind group
        memory.set_min_size(64);
        assert!(group.invalidation_reasons().has(CHILD_DATA));
        group.native().unwrap();
        assert_eq!(handle.created(), 5, "layout and group regenerated");
        assert_eq!(handle.destroyed(), 2);
    }

    #[test]
    fn deconstructed_group_rejects_reads_and_mutation() {
        let (device, handle) = make_device();
        let (layout, _) = frame_layout(&device);
        let group = BindGroup::new(&layout);
        group.set_data("frame", uniform_buffer(&device)).unwrap();
        group.native().unwrap();

        group.deconstruct();
        assert_eq!(handle.destroyed(), 1, "only the group's native");
        assert!(matches!(
            group.native(),
            Err(Error::UseAfterDeconstruct { .. })
        ));
        assert!(matches!(
            group.set_data("frame", uniform_buffer(&device)),
            Err(Error::UseAfterDeconstruct { .. })
        ));
    }
}
