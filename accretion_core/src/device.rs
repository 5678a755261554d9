// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The device: owner of the injected backend and the per-device state.
//!
//! [`GpuDevice`] is the root object of the crate. It owns the injected
//! [`GpuBackend`], the external frame counter, the trace sink, and the
//! per-device [`LayoutRegistry`]. Resource wrappers do not hold the device
//! itself; they hold an [`Rc`] of its shared interior, so dropping the
//! device (and with it the registry) releases canonical layouts while
//! outstanding wrappers stay safe to drop.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use crate::backend::{CommandStream, GpuBackend};
use crate::binding::LayoutRegistry;
#[cfg(feature = "trace")]
use crate::trace::TraceSink;
use crate::trace::{FrameStartedEvent, StreamSubmittedEvent, Tracer};

/// Per-device state shared by every resource wrapper.
///
/// This is the part of the device that resources keep alive. The
/// [`LayoutRegistry`] deliberately lives outside it, on [`GpuDevice`]
/// itself, so that registry entries (which hold resources, which hold this)
/// never form a reference cycle.
pub(crate) struct DeviceShared {
    backend: RefCell<Box<dyn GpuBackend>>,
    frame: Cell<u64>,
    next_object: Cell<u64>,
    tracer: RefCell<Tracer>,
}

impl DeviceShared {
    /// Current value of the external frame counter.
    pub(crate) fn frame_index(&self) -> u64 {
        self.frame.get()
    }

    /// Hands out the next object id. Ids are unique per device and never
    /// reused.
    pub(crate) fn allocate_object_id(&self) -> u64 {
        let id = self.next_object.get();
        self.next_object.set(id + 1);
        id
    }

    /// Runs `f` with exclusive access to the backend.
    ///
    /// The borrow is held only for the duration of `f`, so hooks that need
    /// several backend calls make several short borrows instead of nesting.
    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&mut dyn GpuBackend) -> R) -> R {
        f(self.backend.borrow_mut().as_mut())
    }

    /// Runs `f` with exclusive access to the tracer.
    pub(crate) fn trace(&self, f: impl FnOnce(&mut Tracer)) {
        f(&mut self.tracer.borrow_mut());
    }
}

/// The root object: an injected native API plus per-device bookkeeping.
///
/// # Frames
///
/// The frame counter is advanced only by [`start_new_frame`]; nothing inside
/// the crate ever advances it. Per-frame caches compare their recorded frame
/// index against it on every read.
///
/// # Ownership
///
/// `GpuDevice` is not itself reference counted. Resources created from it
/// keep its shared interior alive, so the device value can be dropped before
/// or after its resources without ordering hazards.
///
/// [`start_new_frame`]: GpuDevice::start_new_frame
pub struct GpuDevice {
    shared: Rc<DeviceShared>,
    layouts: LayoutRegistry,
}

impl core::fmt::Debug for GpuDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuDevice")
            .field("frame", &self.shared.frame_index())
            .field("layouts", &self.layouts.len())
            .finish_non_exhaustive()
    }
}

impl GpuDevice {
    /// Creates a device around an injected backend.
    #[must_use]
    pub fn new(backend: Box<dyn GpuBackend>) -> Self {
        Self {
            shared: Rc::new(DeviceShared {
                backend: RefCell::new(backend),
                frame: Cell::new(0),
                next_object: Cell::new(0),
                tracer: RefCell::new(Tracer::none()),
            }),
            layouts: LayoutRegistry::new(),
        }
    }

    /// Advances the external frame counter.
    ///
    /// Call this exactly once per host frame, before any reads that frame.
    /// Frame-lifetime caches regenerate on their first read after this.
    pub fn start_new_frame(&self) {
        let frame_index = self.shared.frame.get() + 1;
        self.shared.frame.set(frame_index);
        self.shared
            .trace(|t| t.frame_started(&FrameStartedEvent { frame_index }));
    }

    /// Current value of the external frame counter.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.shared.frame_index()
    }

    /// The per-device registry of canonical bind group layouts.
    #[must_use]
    pub fn layout_registry(&self) -> &LayoutRegistry {
        &self.layouts
    }

    /// Submits a recorded command stream to the backend queue.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "command streams are far below 2^32 entries"
    )]
    pub fn submit(&self, stream: &CommandStream) {
        self.shared.with_backend(|b| b.submit(stream));
        self.shared.trace(|t| {
            t.stream_submitted(&StreamSubmittedEvent {
                frame_index: self.shared.frame_index(),
                commands: stream.len() as u32,
                elided: stream.elided(),
            });
        });
    }

    /// Installs or removes the trace sink.
    #[cfg(feature = "trace")]
    pub fn set_trace_sink(&self, sink: Option<Box<dyn TraceSink>>) {
        self.shared.trace(|t| t.set_sink(sink));
    }

    pub(crate) fn shared(&self) -> &Rc<DeviceShared> {
        &self.shared
    }
}
