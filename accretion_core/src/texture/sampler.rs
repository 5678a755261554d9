// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::cell::Cell;

use crate::backend::{AddressMode, CompareFunction, FilterMode, NativeKey, SamplerDescriptor};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::Result;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::SETTING;

struct SamplerInner {
    object: GpuObject,
    min_filter: Cell<FilterMode>,
    mag_filter: Cell<FilterMode>,
    address_mode: Cell<AddressMode>,
    compare: Cell<Option<CompareFunction>>,
    native: NativeCell<NativeKey>,
}

/// A texture sampler. Filtering by default; setting a compare function
/// turns it into a comparison sampler for shadow lookups.
#[derive(Clone)]
pub struct GpuSampler {
    inner: Rc<SamplerInner>,
}

impl core::fmt::Debug for GpuSampler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuSampler")
            .field("tag", &self.inner.object.tag())
            .field("min_filter", &self.inner.min_filter.get())
            .field("mag_filter", &self.inner.mag_filter.get())
            .finish_non_exhaustive()
    }
}

impl GpuSampler {
    /// Creates a linear clamping sampler.
    #[must_use]
    pub fn new(device: &GpuDevice) -> Self {
        Self {
            inner: Rc::new(SamplerInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::Sampler),
                min_filter: Cell::new(FilterMode::Linear),
                mag_filter: Cell::new(FilterMode::Linear),
                address_mode: Cell::new(AddressMode::ClampToEdge),
                compare: Cell::new(None),
                native: NativeCell::new(CacheLifetime::Persistent),
            }),
        }
    }

    /// Minification filter.
    #[must_use]
    pub fn min_filter(&self) -> FilterMode {
        self.inner.min_filter.get()
    }

    /// Changes the minification filter. Soft invalidation.
    pub fn set_min_filter(&self, filter: FilterMode) {
        if self.inner.min_filter.replace(filter) != filter {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Magnification filter.
    #[must_use]
    pub fn mag_filter(&self) -> FilterMode {
        self.inner.mag_filter.get()
    }

    /// Changes the magnification filter. Soft invalidation.
    pub fn set_mag_filter(&self, filter: FilterMode) {
        if self.inner.mag_filter.replace(filter) != filter {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Address mode applied on all axes.
    #[must_use]
    pub fn address_mode(&self) -> AddressMode {
        self.inner.address_mode.get()
    }

    /// Changes the address mode. Soft invalidation.
    pub fn set_address_mode(&self, mode: AddressMode) {
        if self.inner.address_mode.replace(mode) != mode {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Compare function, when this is a comparison sampler.
    #[must_use]
    pub fn compare(&self) -> Option<CompareFunction> {
        self.inner.compare.get()
    }

    /// Sets or clears the compare function. Soft invalidation.
    pub fn set_compare(&self, compare: Option<CompareFunction>) {
        if self.inner.compare.replace(compare) != compare {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// The native sampler, regenerated through the read protocol.
    ///
    /// # Errors
    ///
    /// The read protocol errors.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let desc = SamplerDescriptor {
                    min_filter: inner.min_filter.get(),
                    mag_filter: inner.mag_filter.get(),
                    address_mode: inner.address_mode.get(),
                    compare: inner.compare.get(),
                };
                device.with_backend(|b| b.create_sampler(&desc))
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the sampler down and destroys the native object. Terminal.
    pub fn deconstruct(&self) {
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for GpuSampler {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestBackend, TestHandle};
    use alloc::boxed::Box;

    fn make_device() -> (GpuDevice, TestHandle) {
        let backend = TestBackend::new();
        let handle = backend.handle();
        (GpuDevice::new(Box::new(backend)), handle)
    }

    #[test]
    fn filter_change_regenerates_once() {
        let (device, handle) = make_device();
        let sampler = GpuSampler::new(&device);
        let first = sampler.native().unwrap();

        sampler.set_min_filter(FilterMode::Nearest);
        sampler.set_mag_filter(FilterMode::Nearest);
        let second = sampler.native().unwrap();

        assert_ne!(first, second);
        assert_eq!(handle.created(), 2, "both changes coalesce into one rebuild");
    }

    #[test]
    fn becoming_a_comparison_sampler_invalidates() {
        let (device, handle) = make_device();
        let sampler = GpuSampler::new(&device);
        sampler.native().unwrap();

        sampler.set_compare(Some(CompareFunction::LessEqual));
        sampler.native().unwrap();
        assert_eq!(handle.created(), 2);
        assert_eq!(handle.destroyed(), 1);
    }
}
