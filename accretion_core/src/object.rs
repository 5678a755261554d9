// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Invalidatable objects and the listener graph.
//!
//! [`GpuObject`] is the embedded state every resource wrapper carries: its
//! identity, the pending [`ReasonSet`], the auto-update flag, and the
//! registered invalidation listeners. [`GpuResource`] exposes that state
//! uniformly, so dependency wiring reads the same on every wrapper.
//!
//! Invalidation is synchronous and depth-first: recording a reason
//! immediately runs the listeners in registration order, and a listener
//! that invalidates a dependent object recurses before the next listener
//! runs. The dependency graph is acyclic by construction (resources listen
//! only on the objects they were built from), so recursion terminates; a
//! listener that reaches back up the chain is a bug in the caller's wiring,
//! not a state this module defends against.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::device::DeviceShared;
use crate::reason::{DECONSTRUCT, Reason, ReasonMask, ReasonSet};
use crate::trace::DeconstructedEvent;
#[cfg(feature = "trace-rich")]
use crate::trace::InvalidatedEvent;

/// What kind of resource an object is. Used for diagnostics only; the
/// lifecycle machinery treats all kinds identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A [`GpuBuffer`](crate::buffer::GpuBuffer).
    Buffer,
    /// An [`ImageTexture`](crate::texture::ImageTexture).
    ImageTexture,
    /// A [`FrameBufferTexture`](crate::texture::FrameBufferTexture).
    FrameBufferTexture,
    /// A [`VideoTexture`](crate::texture::VideoTexture).
    VideoTexture,
    /// A [`CanvasTexture`](crate::texture::CanvasTexture).
    CanvasTexture,
    /// A [`GpuSampler`](crate::texture::GpuSampler).
    Sampler,
    /// A [`BufferMemoryLayout`](crate::memory::BufferMemoryLayout).
    BufferLayout,
    /// A [`TextureMemoryLayout`](crate::memory::TextureMemoryLayout).
    TextureLayout,
    /// A [`SamplerMemoryLayout`](crate::memory::SamplerMemoryLayout).
    SamplerLayout,
    /// A [`BindGroupLayout`](crate::binding::BindGroupLayout).
    BindGroupLayout,
    /// A [`BindGroup`](crate::binding::BindGroup).
    BindGroup,
    /// A [`ShaderModule`](crate::shader::ShaderModule).
    Shader,
    /// A [`PipelineLayout`](crate::pipeline::PipelineLayout).
    PipelineLayout,
    /// A [`RenderPipeline`](crate::pipeline::RenderPipeline).
    RenderPipeline,
    /// A [`ComputePipeline`](crate::pipeline::ComputePipeline).
    ComputePipeline,
    /// A [`RenderTargets`](crate::texture::RenderTargets).
    RenderTargets,
}

impl ObjectKind {
    /// Stable lowercase name, used in trace output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::ImageTexture => "image-texture",
            Self::FrameBufferTexture => "frame-buffer-texture",
            Self::VideoTexture => "video-texture",
            Self::CanvasTexture => "canvas-texture",
            Self::Sampler => "sampler",
            Self::BufferLayout => "buffer-layout",
            Self::TextureLayout => "texture-layout",
            Self::SamplerLayout => "sampler-layout",
            Self::BindGroupLayout => "bind-group-layout",
            Self::BindGroup => "bind-group",
            Self::Shader => "shader",
            Self::PipelineLayout => "pipeline-layout",
            Self::RenderPipeline => "render-pipeline",
            Self::ComputePipeline => "compute-pipeline",
            Self::RenderTargets => "render-targets",
        }
    }
}

/// A compact identity snapshot of an object: its kind and per-device id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectTag {
    /// The object's kind.
    pub kind: ObjectKind,
    /// The object's per-device id.
    pub id: u64,
}

impl core::fmt::Debug for ObjectTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.kind.as_str(), self.id)
    }
}

/// Handle to a registered invalidation listener, used for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerSlot {
    id: ListenerId,
    filter: Option<ReasonMask>,
    removed: Cell<bool>,
    callback: Box<dyn Fn(Reason)>,
}

/// The embedded lifecycle state of a resource wrapper.
///
/// Wrappers construct one of these at creation and return it from
/// [`GpuResource::object`]. All mutation goes through shared references;
/// the crate is single threaded by contract.
pub struct GpuObject {
    device: Rc<DeviceShared>,
    kind: ObjectKind,
    id: u64,
    reasons: Cell<ReasonSet>,
    auto_update: Cell<bool>,
    listeners: RefCell<Vec<Rc<ListenerSlot>>>,
    next_listener: Cell<u64>,
}

impl core::fmt::Debug for GpuObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuObject")
            .field("tag", &self.tag())
            .field("reasons", &self.reasons.get())
            .field("auto_update", &self.auto_update.get())
            .finish_non_exhaustive()
    }
}

impl GpuObject {
    pub(crate) fn new(device: Rc<DeviceShared>, kind: ObjectKind) -> Self {
        let id = device.allocate_object_id();
        Self {
            device,
            kind,
            id,
            reasons: Cell::new(ReasonSet::new()),
            auto_update: Cell::new(true),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    /// The object's kind.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The object's identity snapshot.
    #[must_use]
    pub fn tag(&self) -> ObjectTag {
        ObjectTag {
            kind: self.kind,
            id: self.id,
        }
    }

    pub(crate) fn device(&self) -> &Rc<DeviceShared> {
        &self.device
    }

    /// Records `reason` and synchronously notifies listeners in
    /// registration order.
    pub fn invalidate(&self, reason: Reason) {
        let mut set = self.reasons.get();
        set.add(reason);
        self.reasons.set(set);
        #[cfg(feature = "trace-rich")]
        self.device.trace(|t| {
            t.invalidated(&InvalidatedEvent {
                object: self.tag(),
                reason,
            });
        });
        self.notify(reason);
    }

    /// Like [`invalidate`](Self::invalidate), but a no-op while auto-update
    /// is disabled. Property setters and dependency forwarding go through
    /// this; direct data changes call `invalidate` unconditionally.
    pub fn trigger_auto_update(&self, reason: Reason) {
        if self.auto_update.get() {
            self.invalidate(reason);
        }
    }

    /// Whether [`trigger_auto_update`](Self::trigger_auto_update) currently
    /// invalidates. Defaults to `true`.
    #[must_use]
    pub fn auto_update(&self) -> bool {
        self.auto_update.get()
    }

    /// Enables or disables auto-update.
    pub fn set_auto_update(&self, enabled: bool) {
        self.auto_update.set(enabled);
    }

    /// Snapshot of the reasons recorded since the caches last regenerated.
    #[must_use]
    pub fn invalidation_reasons(&self) -> ReasonSet {
        self.reasons.get()
    }

    /// Returns `true` once the object has been deconstructed.
    #[must_use]
    pub fn is_deconstructed(&self) -> bool {
        self.reasons.get().deconstructed()
    }

    /// Registers a listener, optionally restricted to the reasons in
    /// `filter`. Listeners run in registration order; a listener registered
    /// while a notification is in flight does not observe that
    /// notification.
    pub fn add_invalidation_listener(
        &self,
        filter: Option<ReasonMask>,
        callback: impl Fn(Reason) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push(Rc::new(ListenerSlot {
            id,
            filter,
            removed: Cell::new(false),
            callback: Box::new(callback),
        }));
        id
    }

    /// Removes a listener. Silently does nothing when `id` is unknown or
    /// was already removed.
    pub fn remove_invalidation_listener(&self, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(slot) = listeners.iter().find(|slot| slot.id == id) {
            slot.removed.set(true);
        }
        listeners.retain(|slot| !slot.removed.get());
    }

    /// Records the deconstruct reason, emits the trace event, and notifies
    /// listeners. Returns `false` (doing nothing) on repeat calls.
    pub(crate) fn mark_deconstructed(&self) -> bool {
        let mut set = self.reasons.get();
        if set.deconstructed() {
            return false;
        }
        set.add(DECONSTRUCT);
        self.reasons.set(set);
        self.device
            .trace(|t| t.deconstructed(&DeconstructedEvent { object: self.tag() }));
        self.notify(DECONSTRUCT);
        true
    }

    /// Clears the recorded reasons after a successful regeneration. The
    /// deconstruct flag survives.
    pub(crate) fn clear_reasons(&self) {
        let mut set = self.reasons.get();
        set.clear();
        self.reasons.set(set);
    }

    fn notify(&self, reason: Reason) {
        // Snapshot so callbacks may add or remove listeners freely. Removal
        // during the walk is honored via the tombstone flag.
        let snapshot: Vec<Rc<ListenerSlot>> = self.listeners.borrow().clone();
        for slot in snapshot {
            if slot.removed.get() {
                continue;
            }
            if let Some(filter) = slot.filter
                && !filter.contains(reason)
            {
                continue;
            }
            (slot.callback)(reason);
        }
    }
}

/// Uniform access to the lifecycle state of a resource wrapper.
///
/// Every wrapper in the crate implements this by returning its embedded
/// [`GpuObject`]; all other methods are forwarding defaults. Dependency
/// wiring is written against this trait:
///
/// ```text
/// let id = dependency.add_invalidation_listener(None, move |_| {
///     dependent.trigger_auto_update(CHILD_DATA);
/// });
/// ```
pub trait GpuResource {
    /// The embedded lifecycle state.
    fn object(&self) -> &GpuObject;

    /// Records `reason` and synchronously notifies listeners.
    fn invalidate(&self, reason: Reason) {
        self.object().invalidate(reason);
    }

    /// Records `reason` and notifies listeners, unless auto-update is
    /// disabled.
    fn trigger_auto_update(&self, reason: Reason) {
        self.object().trigger_auto_update(reason);
    }

    /// Whether auto-update is enabled for this object.
    fn auto_update(&self) -> bool {
        self.object().auto_update()
    }

    /// Enables or disables auto-update.
    fn set_auto_update(&self, enabled: bool) {
        self.object().set_auto_update(enabled);
    }

    /// Snapshot of the pending invalidation reasons.
    fn invalidation_reasons(&self) -> ReasonSet {
        self.object().invalidation_reasons()
    }

    /// Returns `true` once the object has been deconstructed.
    fn is_deconstructed(&self) -> bool {
        self.object().is_deconstructed()
    }

    /// Registers an invalidation listener. See
    /// [`GpuObject::add_invalidation_listener`].
    fn add_invalidation_listener(
        &self,
        filter: Option<ReasonMask>,
        callback: impl Fn(Reason) + 'static,
    ) -> ListenerId {
        self.object().add_invalidation_listener(filter, callback)
    }

    /// Removes a listener; silent when absent.
    fn remove_invalidation_listener(&self, id: ListenerId) {
        self.object().remove_invalidation_listener(id);
    }
}
