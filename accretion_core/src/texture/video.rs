// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::cell::Cell;

use crate::backend::{FrameViewSource, NativeKey};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::Result;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::SETTING;

struct VideoInner {
    object: GpuObject,
    size: Cell<[u32; 2]>,
    native: NativeCell<NativeKey>,
}

/// A texture backed by an external video stream.
///
/// The stream produces a new frame whenever it pleases, so the acquired
/// view is only trusted for a single read: every [`native`](Self::native)
/// call expires the previous view with a `LIFE_TIME` invalidation and
/// acquires a fresh one.
#[derive(Clone)]
pub struct VideoTexture {
    inner: Rc<VideoInner>,
}

impl core::fmt::Debug for VideoTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VideoTexture")
            .field("tag", &self.inner.object.tag())
            .field("size", &self.inner.size.get())
            .finish_non_exhaustive()
    }
}

impl VideoTexture {
    /// Creates a video texture of `size` pixels.
    #[must_use]
    pub fn new(device: &GpuDevice, size: [u32; 2]) -> Self {
        Self {
            inner: Rc::new(VideoInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::VideoTexture),
                size: Cell::new(size),
                native: NativeCell::new(CacheLifetime::Single),
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

    /// Acquires the current video frame's view. Never cached across reads.
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
                    b.acquire_frame_view(FrameViewSource::Video {
                        size: inner.size.get(),
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

impl GpuResource for VideoTexture {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reason::LIFE_TIME;
    use crate::testing::{TestBackend, TestHandle};
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    fn make_device() -> (GpuDevice, TestHandle) {
        let backend = TestBackend::new();
        let handle = backend.handle();
        (GpuDevice::new(Box::new(backend)), handle)
    }

    #[test]
    fn every_read_acquires_a_fresh_view() {
        let (device, handle) = make_device();
        let video = VideoTexture::new(&device, [1280, 720]);

        let first = video.native().unwrap();
        let second = video.native().unwrap();
        assert_ne!(first, second);
        assert_eq!(handle.created(), 2);
        assert_eq!(handle.destroyed(), 1, "the stale view was released");
    }

    #[test]
    fn expiry_notifies_listeners_with_life_time() {
        let (device, _handle) = make_device();
        let video = VideoTexture::new(&device, [640, 480]);
        let heard = Rc::new(RefCell::new(alloc::vec::Vec::new()));
        let sink = heard.clone();
        video.add_invalidation_listener(None, move |reason| {
            sink.borrow_mut().push(reason);
        });

        video.native().unwrap();
        assert!(heard.borrow().is_empty(), "first read expires nothing");

        video.native().unwrap();
        assert_eq!(*heard.borrow(), &[LIFE_TIME]);
    }
}
