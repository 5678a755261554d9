// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Memory layouts: the declared shape of a bindable resource.
//!
//! A memory layout describes how a binding's data is shaped (uniform vs
//! storage buffer, texture dimensionality and sample kind, sampler flavor)
//! without referencing any concrete resource. Bind group layouts are built
//! from these, and bind groups later check attached data against them.
//!
//! Layouts are invalidatable like every other wrapper: changing a property
//! triggers auto-update, so a bind group layout listening on its bindings
//! recomputes its structural identifier and dependents regenerate.

use alloc::rc::Rc;
use core::cell::Cell;

use crate::backend::{
    BindingKind, BufferBindingKind, SamplerKind, TextureDimension, TextureSampleKind,
};
use crate::device::GpuDevice;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::reason::SETTING;

/// Coarse classification of a [`MemoryLayout`], used in structural
/// identifiers and replacement-compatibility checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryLayoutKind {
    /// A buffer binding.
    Buffer,
    /// A sampled texture binding.
    Texture,
    /// A sampler binding.
    Sampler,
}

impl MemoryLayoutKind {
    /// Stable lowercase token, used in structural identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Texture => "texture",
            Self::Sampler => "sampler",
        }
    }
}

struct BufferMemoryLayoutInner {
    object: GpuObject,
    kind: Cell<BufferBindingKind>,
    min_size: Cell<u64>,
}

/// The shape of a buffer binding.
#[derive(Clone)]
pub struct BufferMemoryLayout {
    inner: Rc<BufferMemoryLayoutInner>,
}

impl core::fmt::Debug for BufferMemoryLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferMemoryLayout")
            .field("tag", &self.inner.object.tag())
            .field("kind", &self.inner.kind.get())
            .field("min_size", &self.inner.min_size.get())
            .finish()
    }
}

impl BufferMemoryLayout {
    /// Creates a buffer layout with no minimum size constraint.
    #[must_use]
    pub fn new(device: &GpuDevice, kind: BufferBindingKind) -> Self {
        Self {
            inner: Rc::new(BufferMemoryLayoutInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::BufferLayout),
                kind: Cell::new(kind),
                min_size: Cell::new(0),
            }),
        }
    }

    /// Uniform or storage.
    #[must_use]
    pub fn kind(&self) -> BufferBindingKind {
        self.inner.kind.get()
    }

    /// Switches between uniform and storage.
    pub fn set_kind(&self, kind: BufferBindingKind) {
        self.inner.kind.set(kind);
        self.trigger_auto_update(SETTING);
    }

    /// Minimum binding size in bytes (0 = unconstrained).
    #[must_use]
    pub fn min_size(&self) -> u64 {
        self.inner.min_size.get()
    }

    /// Sets the minimum binding size.
    pub fn set_min_size(&self, min_size: u64) {
        self.inner.min_size.set(min_size);
        self.trigger_auto_update(SETTING);
    }

    /// Tears the layout down. Terminal; repeat calls do nothing.
    pub fn deconstruct(&self) {
        self.inner.object.mark_deconstructed();
    }
}

impl GpuResource for BufferMemoryLayout {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

struct TextureMemoryLayoutInner {
    object: GpuObject,
    dimension: Cell<TextureDimension>,
    sample: Cell<TextureSampleKind>,
    multisampled: Cell<bool>,
}

/// The shape of a sampled texture binding.
#[derive(Clone)]
pub struct TextureMemoryLayout {
    inner: Rc<TextureMemoryLayoutInner>,
}

impl core::fmt::Debug for TextureMemoryLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TextureMemoryLayout")
            .field("tag", &self.inner.object.tag())
            .field("dimension", &self.inner.dimension.get())
            .field("sample", &self.inner.sample.get())
            .field("multisampled", &self.inner.multisampled.get())
            .finish()
    }
}

impl TextureMemoryLayout {
    /// Creates a texture layout sampled as filterable float, not
    /// multisampled.
    #[must_use]
    pub fn new(device: &GpuDevice, dimension: TextureDimension) -> Self {
        Self {
            inner: Rc::new(TextureMemoryLayoutInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::TextureLayout),
                dimension: Cell::new(dimension),
                sample: Cell::new(TextureSampleKind::Float),
                multisampled: Cell::new(false),
            }),
        }
    }

    /// Dimensionality.
    #[must_use]
    pub fn dimension(&self) -> TextureDimension {
        self.inner.dimension.get()
    }

    /// Sets the dimensionality.
    pub fn set_dimension(&self, dimension: TextureDimension) {
        self.inner.dimension.set(dimension);
        self.trigger_auto_update(SETTING);
    }

    /// How shaders read the texture.
    #[must_use]
    pub fn sample_kind(&self) -> TextureSampleKind {
        self.inner.sample.get()
    }

    /// Sets the sample kind.
    pub fn set_sample_kind(&self, sample: TextureSampleKind) {
        self.inner.sample.set(sample);
        self.trigger_auto_update(SETTING);
    }

    /// Whether the bound texture is multisampled.
    #[must_use]
    pub fn multisampled(&self) -> bool {
        self.inner.multisampled.get()
    }

    /// Sets the multisampled flag.
    pub fn set_multisampled(&self, multisampled: bool) {
        self.inner.multisampled.set(multisampled);
        self.trigger_auto_update(SETTING);
    }

    /// Tears the layout down. Terminal; repeat calls do nothing.
    pub fn deconstruct(&self) {
        self.inner.object.mark_deconstructed();
    }
}

impl GpuResource for TextureMemoryLayout {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

struct SamplerMemoryLayoutInner {
    object: GpuObject,
    kind: Cell<SamplerKind>,
}

/// The shape of a sampler binding.
#[derive(Clone)]
pub struct SamplerMemoryLayout {
    inner: Rc<SamplerMemoryLayoutInner>,
}

impl core::fmt::Debug for SamplerMemoryLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SamplerMemoryLayout")
            .field("tag", &self.inner.object.tag())
            .field("kind", &self.inner.kind.get())
            .finish()
    }
}

impl SamplerMemoryLayout {
    /// Creates a sampler layout.
    #[must_use]
    pub fn new(device: &GpuDevice, kind: SamplerKind) -> Self {
        Self {
            inner: Rc::new(SamplerMemoryLayoutInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::SamplerLayout),
                kind: Cell::new(kind),
            }),
        }
    }

    /// Filtering or comparison.
    #[must_use]
    pub fn kind(&self) -> SamplerKind {
        self.inner.kind.get()
    }

    /// Sets the sampler flavor.
    pub fn set_kind(&self, kind: SamplerKind) {
        self.inner.kind.set(kind);
        self.trigger_auto_update(SETTING);
    }

    /// Tears the layout down. Terminal; repeat calls do nothing.
    pub fn deconstruct(&self) {
        self.inner.object.mark_deconstructed();
    }
}

impl GpuResource for SamplerMemoryLayout {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

/// Any memory layout. The union is closed: bindings are buffers, textures,
/// or samplers, and matches over this enum are exhaustive on purpose.
#[derive(Clone, Debug)]
pub enum MemoryLayout {
    /// A buffer layout.
    Buffer(BufferMemoryLayout),
    /// A texture layout.
    Texture(TextureMemoryLayout),
    /// A sampler layout.
    Sampler(SamplerMemoryLayout),
}

impl MemoryLayout {
    /// Builds a fresh layout matching a reflected binding shape.
    #[must_use]
    pub fn from_binding(device: &GpuDevice, kind: BindingKind) -> Self {
        match kind {
            BindingKind::Buffer { kind, min_size } => {
                let layout = BufferMemoryLayout::new(device, kind);
                layout.inner.min_size.set(min_size);
                Self::Buffer(layout)
            }
            BindingKind::Texture {
                dimension,
                sample,
                multisampled,
            } => {
                let layout = TextureMemoryLayout::new(device, dimension);
                layout.inner.sample.set(sample);
                layout.inner.multisampled.set(multisampled);
                Self::Texture(layout)
            }
            BindingKind::Sampler { kind } => Self::Sampler(SamplerMemoryLayout::new(device, kind)),
        }
    }

    /// Coarse classification.
    #[must_use]
    pub fn kind(&self) -> MemoryLayoutKind {
        match self {
            Self::Buffer(_) => MemoryLayoutKind::Buffer,
            Self::Texture(_) => MemoryLayoutKind::Texture,
            Self::Sampler(_) => MemoryLayoutKind::Sampler,
        }
    }

    /// Snapshot of the current shape as a backend descriptor entry.
    #[must_use]
    pub fn binding_kind(&self) -> BindingKind {
        match self {
            Self::Buffer(layout) => BindingKind::Buffer {
                kind: layout.kind(),
                min_size: layout.min_size(),
            },
            Self::Texture(layout) => BindingKind::Texture {
                dimension: layout.dimension(),
                sample: layout.sample_kind(),
                multisampled: layout.multisampled(),
            },
            Self::Sampler(layout) => BindingKind::Sampler {
                kind: layout.kind(),
            },
        }
    }
}

impl GpuResource for MemoryLayout {
    fn object(&self) -> &GpuObject {
        match self {
            Self::Buffer(layout) => layout.object(),
            Self::Texture(layout) => layout.object(),
            Self::Sampler(layout) => layout.object(),
        }
    }
}

impl From<BufferMemoryLayout> for MemoryLayout {
    fn from(layout: BufferMemoryLayout) -> Self {
        Self::Buffer(layout)
    }
}

impl From<TextureMemoryLayout> for MemoryLayout {
    fn from(layout: TextureMemoryLayout) -> Self {
        Self::Texture(layout)
    }
}

impl From<SamplerMemoryLayout> for MemoryLayout {
    fn from(layout: SamplerMemoryLayout) -> Self {
        Self::Sampler(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBackend;
    use alloc::boxed::Box;
    use alloc::rc::Rc;

    fn make_device() -> GpuDevice {
        GpuDevice::new(Box::new(TestBackend::new()))
    }

    #[test]
    fn setters_go_through_auto_update() {
        let device = make_device();
        let layout = BufferMemoryLayout::new(&device, BufferBindingKind::Uniform);
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let _ = layout.add_invalidation_listener(None, move |_| {
            counter.set(counter.get() + 1);
        });

        layout.set_min_size(256);
        assert_eq!(hits.get(), 1);
        assert!(layout.invalidation_reasons().has(SETTING));

        layout.set_auto_update(false);
        layout.set_min_size(512);
        assert_eq!(hits.get(), 1, "auto-update disabled");
        assert_eq!(layout.min_size(), 512, "the property still changed");
    }

    #[test]
    fn binding_kind_snapshots_state() {
        let device = make_device();
        let layout = TextureMemoryLayout::new(&device, TextureDimension::D2);
        layout.set_sample_kind(TextureSampleKind::Depth);
        assert_eq!(
            MemoryLayout::from(layout).binding_kind(),
            BindingKind::Texture {
                dimension: TextureDimension::D2,
                sample: TextureSampleKind::Depth,
                multisampled: false,
            }
        );
    }

    #[test]
    fn from_binding_round_trips_shape() {
        let device = make_device();
        let kind = BindingKind::Buffer {
            kind: BufferBindingKind::Storage,
            min_size: 64,
        };
        let layout = MemoryLayout::from_binding(&device, kind);
        assert_eq!(layout.kind(), MemoryLayoutKind::Buffer);
        assert_eq!(layout.binding_kind(), kind);
    }
}
