// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::backend::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::{Error, Result};
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::DATA;
use crate::texture::TextureNative;

/// Pixel data for an [`ImageTexture`], tightly packed rows.
#[derive(Clone)]
pub struct ImageSource {
    /// Raw texel bytes.
    pub pixels: Vec<u8>,
    /// Width and height in pixels.
    pub size: [u32; 2],
}

impl core::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageSource")
            .field("bytes", &self.pixels.len())
            .field("size", &self.size)
            .finish()
    }
}

struct ImageInner {
    object: GpuObject,
    format: Cell<TextureFormat>,
    source: RefCell<Option<ImageSource>>,
    native: NativeCell<TextureNative>,
}

/// A sampled texture whose pixels come from memory.
///
/// Attaching a source is a hard `DATA` invalidation. Generation sizes the
/// texture to whatever source is current at that moment and uploads it, so
/// the latest attached source always wins.
#[derive(Clone)]
pub struct ImageTexture {
    inner: Rc<ImageInner>,
}

impl core::fmt::Debug for ImageTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageTexture")
            .field("tag", &self.inner.object.tag())
            .field("format", &self.inner.format.get())
            .field("source", &self.inner.source.borrow())
            .finish_non_exhaustive()
    }
}

impl ImageTexture {
    /// Creates an image texture with no source yet.
    #[must_use]
    pub fn new(device: &GpuDevice, format: TextureFormat) -> Self {
        Self {
            inner: Rc::new(ImageInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::ImageTexture),
                format: Cell::new(format),
                source: RefCell::new(None),
                native: NativeCell::new(CacheLifetime::Persistent),
            }),
        }
    }

    /// Texel format.
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.inner.format.get()
    }

    /// Attaches new pixel data. Hard invalidation: the native texture is
    /// rebuilt on the next read whether or not auto-update is on.
    pub fn set_source(&self, source: ImageSource) {
        *self.inner.source.borrow_mut() = Some(source);
        self.inner.object.invalidate(DATA);
    }

    /// Size of the current source, if one is attached.
    #[must_use]
    pub fn source_size(&self) -> Option<[u32; 2]> {
        self.inner.source.borrow().as_ref().map(|s| s.size)
    }

    /// The native texture and view, regenerated through the read protocol.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] when no source was attached, plus
    /// the read protocol errors and backend upload failures.
    pub fn native(&self) -> Result<TextureNative> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let source = inner.source.borrow();
                let Some(source) = source.as_ref() else {
                    return Err(Error::InvalidConfiguration(
                        "image texture has no source data".into(),
                    ));
                };
                let [width, height] = source.size;
                let desc = TextureDescriptor {
                    size: [width, height, 1],
                    format: inner.format.get(),
                    usage: TextureUsage::TEXTURE_BINDING.union(TextureUsage::COPY_DST),
                    dimension: TextureDimension::D2,
                    mip_level_count: 1,
                    sample_count: 1,
                };
                let Some(texture) = device.with_backend(|b| b.create_texture(&desc))? else {
                    return Ok(None);
                };
                let Some(view) = device.with_backend(|b| b.create_texture_view(texture))? else {
                    device.with_backend(|b| b.destroy(texture));
                    return Ok(None);
                };
                device.with_backend(|b| {
                    b.copy_image_to_texture(texture, &source.pixels, [width, height, 1])
                })?;
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

impl GpuResource for ImageTexture {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}
