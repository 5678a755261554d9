// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::cell::Cell;

use crate::backend::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::Result;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::SETTING;
use crate::texture::TextureNative;

struct FrameBufferInner {
    object: GpuObject,
    size: Cell<[u32; 2]>,
    format: Cell<TextureFormat>,
    sample_count: Cell<u32>,
    native: NativeCell<TextureNative>,
}

/// A texture that render passes draw into and shaders sample from.
///
/// Persistent: the native texture and view survive across frames until a
/// setting changes. Resizing is the common invalidation, usually driven
/// through [`RenderTargets::resize`](crate::texture::RenderTargets::resize).
#[derive(Clone)]
pub struct FrameBufferTexture {
    inner: Rc<FrameBufferInner>,
}

impl core::fmt::Debug for FrameBufferTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBufferTexture")
            .field("tag", &self.inner.object.tag())
            .field("size", &self.inner.size.get())
            .field("format", &self.inner.format.get())
            .finish_non_exhaustive()
    }
}

impl FrameBufferTexture {
    /// Creates a frame buffer texture of `size` pixels.
    #[must_use]
    pub fn new(device: &GpuDevice, size: [u32; 2], format: TextureFormat) -> Self {
        Self {
            inner: Rc::new(FrameBufferInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::FrameBufferTexture),
                size: Cell::new(size),
                format: Cell::new(format),
                sample_count: Cell::new(1),
                native: NativeCell::new(CacheLifetime::Persistent),
            }),
        }
    }

    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.inner.size.get()
    }

    /// Changes the size. Soft invalidation.
    pub fn set_size(&self, size: [u32; 2]) {
        if self.inner.size.replace(size) != size {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Texel format.
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.inner.format.get()
    }

    /// Changes the format. Soft invalidation.
    pub fn set_format(&self, format: TextureFormat) {
        if self.inner.format.replace(format) != format {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Samples per texel.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.inner.sample_count.get()
    }

    /// Changes the sample count. Soft invalidation.
    pub fn set_sample_count(&self, sample_count: u32) {
        if self.inner.sample_count.replace(sample_count) != sample_count {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// The native texture and view, regenerated through the read protocol.
    ///
    /// # Errors
    ///
    /// The read protocol errors.
    pub fn native(&self) -> Result<TextureNative> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let [width, height] = inner.size.get();
                let desc = TextureDescriptor {
                    size: [width, height, 1],
                    format: inner.format.get(),
                    usage: TextureUsage::TEXTURE_BINDING.union(TextureUsage::RENDER_ATTACHMENT),
                    dimension: TextureDimension::D2,
                    mip_level_count: 1,
                    sample_count: inner.sample_count.get(),
                };
                let Some(texture) = device.with_backend(|b| b.create_texture(&desc))? else {
                    return Ok(None);
                };
                let Some(view) = device.with_backend(|b| b.create_texture_view(texture))? else {
                    device.with_backend(|b| b.destroy(texture));
                    return Ok(None);
                };
                Ok(Some(TextureNative { texture, view }))
            },
            |native, _| {
                device.with_backend(|b| {
                    b.destroy(native.view);
                    b.destroy(native.texture);
                });
            },
        )
    }

    /// Tears the texture down and destroys both native keys. Terminal.
    pub fn deconstruct(&self) {
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |native, _| {
            device.with_backend(|b| {
                b.destroy(native.view);
                b.destroy(native.texture);
            });
        });
    }
}

impl GpuResource for FrameBufferTexture {
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
    fn resize_destroys_view_and_texture_together() {
        let (device, handle) = make_device();
        let fb = FrameBufferTexture::new(&device, [800, 600], TextureFormat::Rgba8Unorm);

        let first = fb.native().unwrap();
        assert_ne!(first.texture, first.view);
        assert_eq!(handle.created(), 2);

        fb.set_size([1024, 768]);
        let second = fb.native().unwrap();
        assert_ne!(first.texture, second.texture);
        assert_eq!(handle.created(), 4);
        assert_eq!(handle.destroyed(), 2);
    }

    #[test]
    fn declined_view_rolls_back_the_texture() {
        let (device, handle) = make_device();
        let fb = FrameBufferTexture::new(&device, [64, 64], TextureFormat::Rgba8Unorm);

        handle.decline_call(2);
        assert!(fb.native().is_err());
        assert_eq!(handle.created(), 1, "only the texture was created");
        assert_eq!(handle.destroyed(), 1, "and it was rolled back");

        fb.native().unwrap();
        assert_eq!(handle.created(), 3);
    }
}
