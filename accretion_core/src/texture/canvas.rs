// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::cell::Cell;

use crate::backend::{FrameViewSource, NativeKey, TextureFormat};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::Result;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::SETTING;

struct CanvasInner {
    object: GpuObject,
    size: Cell<[u32; 2]>,
    format: Cell<TextureFormat>,
    native: NativeCell<NativeKey>,
}

/// The presentation surface of a device.
///
/// The surface hands out one view per frame. The acquired view is cached
/// for the frame it was acquired in and expires when
/// [`GpuDevice::start_new_frame`] moves the counter, so repeated reads
/// within a frame share the view.
#[derive(Clone)]
pub struct CanvasTexture {
    inner: Rc<CanvasInner>,
}

impl core::fmt::Debug for CanvasTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasTexture")
            .field("tag", &self.inner.object.tag())
            .field("size", &self.inner.size.get())
            .field("format", &self.inner.format.get())
            .finish_non_exhaustive()
    }
}

impl CanvasTexture {
    /// Creates a canvas texture of `size` pixels.
    #[must_use]
    pub fn new(device: &GpuDevice, size: [u32; 2], format: TextureFormat) -> Self {
        Self {
            inner: Rc::new(CanvasInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::CanvasTexture),
                size: Cell::new(size),
                format: Cell::new(format),
                native: NativeCell::new(CacheLifetime::Frame),
            }),
        }
    }

    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.inner.size.get()
    }

    /// Changes the size, typically on a window resize. Soft invalidation.
    pub fn set_size(&self, size: [u32; 2]) {
        if self.inner.size.replace(size) != size {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Surface format.
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.inner.format.get()
    }

    /// Changes the surface format. Soft invalidation.
    pub fn set_format(&self, format: TextureFormat) {
        if self.inner.format.replace(format) != format {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Acquires this frame's surface view, shared by reads within the
    /// frame.
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
                device.with_backend(|b| {
                    b.acquire_frame_view(FrameViewSource::Canvas {
                        size: inner.size.get(),
                        format: inner.format.get(),
                    })
                })
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the texture down and releases any held view. Terminal.
    pub fn deconstruct(&self) {
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for CanvasTexture {
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
    fn view_is_shared_within_a_frame() {
        let (device, handle) = make_device();
        let canvas = CanvasTexture::new(&device, [800, 600], TextureFormat::Bgra8Unorm);

        let first = canvas.native().unwrap();
        assert_eq!(canvas.native().unwrap(), first);
        assert_eq!(handle.created(), 1);

        device.start_new_frame();
        let second = canvas.native().unwrap();
        assert_ne!(first, second);
        assert_eq!(handle.destroyed(), 1);
    }

    #[test]
    fn resize_expires_the_view_within_the_frame() {
        let (device, handle) = make_device();
        let canvas = CanvasTexture::new(&device, [800, 600], TextureFormat::Bgra8Unorm);

        let first = canvas.native().unwrap();
        canvas.set_size([400, 300]);
        assert_ne!(canvas.native().unwrap(), first);
        assert_eq!(handle.created(), 2);
    }
}
