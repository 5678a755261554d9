// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GPU buffers with lazily created native objects.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::backend::{BufferDescriptor, BufferUsage, NativeKey};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::Result;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::SETTING;

struct BufferInner {
    object: GpuObject,
    size: Cell<u64>,
    usage: Cell<BufferUsage>,
    initial: RefCell<Option<Vec<u8>>>,
    native: NativeCell<NativeKey>,
}

/// A persistent GPU buffer.
///
/// The native buffer is created on the first [`native`](Self::native) read
/// and recreated whenever a setting such as [`set_size`](Self::set_size)
/// invalidates it. Initial contents given to [`with_data`](Self::with_data)
/// are re-uploaded after every recreation; [`write`](Self::write) goes
/// straight to the current native object and survives nothing.
#[derive(Clone)]
pub struct GpuBuffer {
    inner: Rc<BufferInner>,
}

impl core::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("tag", &self.inner.object.tag())
            .field("size", &self.inner.size.get())
            .field("usage", &self.inner.usage.get())
            .finish_non_exhaustive()
    }
}

impl GpuBuffer {
    /// Creates a buffer of `size` bytes with undefined contents.
    #[must_use]
    pub fn new(device: &GpuDevice, size: u64, usage: BufferUsage) -> Self {
        Self {
            inner: Rc::new(BufferInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::Buffer),
                size: Cell::new(size),
                usage: Cell::new(usage),
                initial: RefCell::new(None),
                native: NativeCell::new(CacheLifetime::Persistent),
            }),
        }
    }

    /// Creates a buffer sized to `data`, uploaded after every generation.
    #[must_use]
    pub fn with_data(device: &GpuDevice, data: &[u8], usage: BufferUsage) -> Self {
        let buffer = Self::new(device, data.len() as u64, usage.union(BufferUsage::COPY_DST));
        *buffer.inner.initial.borrow_mut() = Some(data.to_vec());
        buffer
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.size.get()
    }

    /// Changes the size. Soft invalidation, honored on the next read when
    /// auto-update is on.
    pub fn set_size(&self, size: u64) {
        if self.inner.size.replace(size) != size {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Usage flags.
    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.inner.usage.get()
    }

    /// Changes the usage flags. Soft invalidation.
    pub fn set_usage(&self, usage: BufferUsage) {
        if self.inner.usage.replace(usage) != usage {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// The native buffer, regenerated through the read protocol.
    ///
    /// # Errors
    ///
    /// The read protocol errors, plus any backend failure while uploading
    /// initial contents.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let desc = BufferDescriptor {
                    size: inner.size.get(),
                    usage: inner.usage.get(),
                };
                let Some(key) = device.with_backend(|b| b.create_buffer(&desc))? else {
                    return Ok(None);
                };
                if let Some(bytes) = inner.initial.borrow().as_ref() {
                    device.with_backend(|b| b.write_buffer(key, 0, bytes))?;
                }
                Ok(Some(key))
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Writes raw bytes at `offset` into the native buffer, creating it
    /// first if needed. Requires [`BufferUsage::COPY_DST`].
    ///
    /// # Errors
    ///
    /// The read protocol errors of [`native`](Self::native), plus backend
    /// write failures.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let key = self.native()?;
        self.inner
            .object
            .device()
            .with_backend(|b| b.write_buffer(key, offset, data))
    }

    /// Writes a slice of plain-old-data values at `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_slice<T: bytemuck::NoUninit>(&self, offset: u64, data: &[T]) -> Result<()> {
        self.write(offset, bytemuck::cast_slice(data))
    }

    /// Reads the whole buffer back. Blocks until the copy completes.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn read(&self) -> Result<Vec<u8>> {
        let key = self.native()?;
        let size = self.inner.size.get();
        self.inner
            .object
            .device()
            .with_backend(|b| b.read_buffer(key, 0, size))
    }

    /// Tears the buffer down and destroys the native object. Terminal.
    pub fn deconstruct(&self) {
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for GpuBuffer {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}
