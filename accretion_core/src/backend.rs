// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The native-API seam.
//!
//! The crate never talks to a GPU API directly. Everything it needs from one
//! is expressed by the [`GpuBackend`] trait: creation of native objects
//! (returning opaque [`NativeKey`]s), destruction, data transfer, and
//! submission of recorded [`CommandStream`]s. A backend is injected into the
//! device at construction, so tests run against counting fakes and
//! production runs against a real API adapter, with identical lifecycle
//! behavior.
//!
//! Everything here is synchronous by contract: `create_*` calls block until
//! the native object exists (or creation failed), `read_buffer` blocks until
//! the bytes are available, and `acquire_frame_view` blocks until the
//! current frame's surface is ready.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::Result;

/// An opaque handle to a backend-managed native object.
///
/// Keys are assigned by the backend and never interpreted by the core; two
/// reads of the same fresh cache return the same key, which is the crate's
/// notion of "the identical cached instance".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeKey(pub u64);

/// A single shader stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
    /// Compute stage.
    Compute,
}

/// A set of shader stages, used for binding visibility.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StageSet(u8);

impl StageSet {
    /// The empty set.
    pub const NONE: Self = Self(0);
    /// Visible to the vertex stage.
    pub const VERTEX: Self = Self(1);
    /// Visible to the fragment stage.
    pub const FRAGMENT: Self = Self(1 << 1);
    /// Visible to the compute stage.
    pub const COMPUTE: Self = Self(1 << 2);

    /// Returns the union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if every stage in `other` is also in `self`.
    #[must_use]
    pub const fn is_superset(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `stage` is in the set.
    #[must_use]
    pub const fn contains(self, stage: Self) -> bool {
        self.0 & stage.0 == stage.0 && stage.0 != 0
    }

    /// Returns `true` if no stage is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw bits, stable across runs (used in structural
    /// identifiers).
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl From<ShaderStage> for StageSet {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
            ShaderStage::Compute => Self::COMPUTE,
        }
    }
}

impl core::fmt::Debug for StageSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "StageSet(")?;
        let mut first = true;
        for (bit, name) in [
            (Self::VERTEX, "VERTEX"),
            (Self::FRAGMENT, "FRAGMENT"),
            (Self::COMPUTE, "COMPUTE"),
        ] {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

/// How a shader accesses a bound resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Read-only.
    Read,
    /// Write-only.
    Write,
    /// Read and write.
    ReadWrite,
}

impl AccessMode {
    /// Short stable token used in structural identifiers.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::ReadWrite => "rw",
        }
    }
}

/// Buffer binding flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferBindingKind {
    /// Uniform buffer.
    Uniform,
    /// Storage buffer.
    Storage,
}

/// How a sampled texture is read in shaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSampleKind {
    /// Filterable float.
    Float,
    /// Depth comparison.
    Depth,
    /// Unsigned integer.
    Uint,
    /// Signed integer.
    Sint,
}

/// Texture dimensionality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    /// One-dimensional.
    D1,
    /// Two-dimensional.
    D2,
    /// Three-dimensional.
    D3,
}

/// Sampler binding flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// Filtering sampler.
    Filtering,
    /// Comparison (shadow) sampler.
    Comparison,
}

/// Texel format. The set is deliberately small; backends map it onto their
/// own format enums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit BGRA, unsigned normalized (common swap-chain format).
    Bgra8Unorm,
    /// 8-bit single channel.
    R8Unorm,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns `true` for depth/stencil formats.
    #[must_use]
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32Float)
    }
}

/// Minification/magnification filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Texture addressing outside `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Repeat with mirroring.
    MirrorRepeat,
}

/// Depth/stencil comparison function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if less.
    Less,
    /// Passes if equal.
    Equal,
    /// Passes if less or equal.
    LessEqual,
    /// Passes if greater.
    Greater,
    /// Passes if not equal.
    NotEqual,
    /// Passes if greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Primitive assembly topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Points.
    PointList,
    /// Separate lines.
    LineList,
    /// Connected lines.
    LineStrip,
    /// Separate triangles.
    TriangleList,
    /// Connected triangles.
    TriangleStrip,
}

/// Index element format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

/// Vertex attribute element format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
}

/// Per-vertex or per-instance stepping of a vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexStep {
    /// Advance per vertex.
    Vertex,
    /// Advance per instance.
    Instance,
}

/// One attribute within a vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexAttribute {
    /// Shader location.
    pub location: u32,
    /// Element format.
    pub format: VertexFormat,
    /// Byte offset from the start of the stride.
    pub offset: u64,
}

/// Layout of one vertex buffer slot.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexBufferLayout {
    /// Stride in bytes.
    pub stride: u64,
    /// Stepping mode.
    pub step: VertexStep,
    /// Attributes sourced from this buffer.
    pub attributes: Vec<VertexAttribute>,
}

/// The shape of one binding, shared between shader reflection input and
/// native bind-group-layout descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// A buffer binding.
    Buffer {
        /// Uniform or storage.
        kind: BufferBindingKind,
        /// Minimum binding size in bytes (0 = unconstrained).
        min_size: u64,
    },
    /// A sampled texture binding.
    Texture {
        /// Dimensionality.
        dimension: TextureDimension,
        /// Sample kind.
        sample: TextureSampleKind,
        /// Multisampled source.
        multisampled: bool,
    },
    /// A sampler binding.
    Sampler {
        /// Filtering or comparison.
        kind: SamplerKind,
    },
}

/// Buffer usage set.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferUsage(u8);

impl BufferUsage {
    /// Source of copy operations.
    pub const COPY_SRC: Self = Self(1);
    /// Destination of copy operations (required for [`write`]).
    ///
    /// [`write`]: crate::buffer::GpuBuffer::write
    pub const COPY_DST: Self = Self(1 << 1);
    /// Bindable as a uniform buffer.
    pub const UNIFORM: Self = Self(1 << 2);
    /// Bindable as a storage buffer.
    pub const STORAGE: Self = Self(1 << 3);
    /// Bindable as a vertex buffer.
    pub const VERTEX: Self = Self(1 << 4);
    /// Bindable as an index buffer.
    pub const INDEX: Self = Self(1 << 5);

    /// Returns the union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if every usage in `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::fmt::Debug for BufferUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BufferUsage({:#04x})", self.0)
    }
}

/// Texture usage set.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextureUsage(u8);

impl TextureUsage {
    /// Source of copy operations.
    pub const COPY_SRC: Self = Self(1);
    /// Destination of copy operations.
    pub const COPY_DST: Self = Self(1 << 1);
    /// Bindable as a sampled texture.
    pub const TEXTURE_BINDING: Self = Self(1 << 2);
    /// Usable as a render attachment.
    pub const RENDER_ATTACHMENT: Self = Self(1 << 3);

    /// Returns the union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if every usage in `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::fmt::Debug for TextureUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "TextureUsage({:#04x})", self.0)
    }
}

/// Descriptor for [`GpuBackend::create_buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Usage set.
    pub usage: BufferUsage,
}

/// Descriptor for [`GpuBackend::create_texture`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Extent in texels (width, height, depth-or-layers).
    pub size: [u32; 3],
    /// Texel format.
    pub format: TextureFormat,
    /// Usage set.
    pub usage: TextureUsage,
    /// Dimensionality.
    pub dimension: TextureDimension,
    /// Number of mip levels.
    pub mip_level_count: u32,
    /// Samples per texel (1 = not multisampled).
    pub sample_count: u32,
}

/// Descriptor for [`GpuBackend::create_sampler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerDescriptor {
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Addressing mode (all axes).
    pub address_mode: AddressMode,
    /// Comparison function; `Some` makes this a comparison sampler.
    pub compare: Option<CompareFunction>,
}

/// One entry of a [`BindGroupLayoutDescriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEntry {
    /// Binding index within the group.
    pub binding: u32,
    /// Stages the binding is visible to.
    pub visibility: StageSet,
    /// Access mode.
    pub access: AccessMode,
    /// Binding shape.
    pub kind: BindingKind,
}

/// Descriptor for [`GpuBackend::create_bind_group_layout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindGroupLayoutDescriptor {
    /// Entries sorted by binding index.
    pub entries: Vec<LayoutEntry>,
}

/// A concrete resource slotted into a bind group entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingResource {
    /// A buffer range.
    Buffer {
        /// Buffer key.
        key: NativeKey,
        /// Byte offset.
        offset: u64,
        /// Bound byte size.
        size: u64,
    },
    /// A sampler.
    Sampler {
        /// Sampler key.
        key: NativeKey,
    },
    /// A texture view.
    TextureView {
        /// View key.
        key: NativeKey,
    },
}

/// One entry of a [`BindGroupDescriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindGroupEntry {
    /// Binding index within the group.
    pub binding: u32,
    /// The bound resource.
    pub resource: BindingResource,
}

/// Descriptor for [`GpuBackend::create_bind_group`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindGroupDescriptor {
    /// Native key of the group's layout.
    pub layout: NativeKey,
    /// Entries sorted by binding index.
    pub entries: Vec<BindGroupEntry>,
}

/// Descriptor for [`GpuBackend::create_pipeline_layout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineLayoutDescriptor {
    /// Native keys of the group layouts, by group index.
    pub groups: Vec<NativeKey>,
}

/// Descriptor for [`GpuBackend::create_render_pipeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPipelineDescriptor {
    /// Shader module key.
    pub shader: NativeKey,
    /// Pipeline layout key.
    pub layout: NativeKey,
    /// Vertex entry point name.
    pub vertex_entry: String,
    /// Fragment entry point name, if any.
    pub fragment_entry: Option<String>,
    /// Vertex buffer layouts by slot.
    pub vertex_buffers: Vec<VertexBufferLayout>,
    /// Color target formats by attachment index.
    pub color_formats: Vec<TextureFormat>,
    /// Depth/stencil target format, if any.
    pub depth_format: Option<TextureFormat>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// Depth comparison function.
    pub depth_compare: CompareFunction,
}

/// Descriptor for [`GpuBackend::create_compute_pipeline`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputePipelineDescriptor {
    /// Shader module key.
    pub shader: NativeKey,
    /// Pipeline layout key.
    pub layout: NativeKey,
    /// Compute entry point name.
    pub entry: String,
}

/// The external surface a per-frame view is acquired from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameViewSource {
    /// A presentable canvas/swap-chain surface.
    Canvas {
        /// Surface extent in pixels.
        size: [u32; 2],
        /// Surface format.
        format: TextureFormat,
    },
    /// An external video frame.
    Video {
        /// Frame extent in pixels.
        size: [u32; 2],
    },
}

/// A color attachment of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorAttachment {
    /// Texture view rendered into.
    pub view: NativeKey,
    /// Clear color; `None` loads the existing contents.
    pub clear: Option<[f64; 4]>,
}

/// The depth/stencil attachment of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthAttachment {
    /// Texture view rendered into.
    pub view: NativeKey,
    /// Clear depth; `None` loads the existing contents.
    pub clear_depth: Option<f32>,
}

/// One recorded instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Open a render pass on the given attachments.
    BeginRenderPass {
        /// Color attachments by index.
        color: Vec<ColorAttachment>,
        /// Optional depth/stencil attachment.
        depth: Option<DepthAttachment>,
    },
    /// Close the current render pass.
    EndRenderPass,
    /// Open a compute pass.
    BeginComputePass,
    /// Close the current compute pass.
    EndComputePass,
    /// Bind a render or compute pipeline.
    SetPipeline(NativeKey),
    /// Bind a bind group to a group slot.
    SetBindGroup {
        /// Group slot.
        group: u32,
        /// Bind group key.
        key: NativeKey,
    },
    /// Bind a vertex buffer to a slot.
    SetVertexBuffer {
        /// Vertex buffer slot.
        slot: u32,
        /// Buffer key.
        key: NativeKey,
    },
    /// Bind the index buffer.
    SetIndexBuffer {
        /// Buffer key.
        key: NativeKey,
        /// Index element format.
        format: IndexFormat,
    },
    /// Non-indexed draw.
    Draw {
        /// Number of vertices.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Number of indices.
        index_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Workgroups along x.
        x: u32,
        /// Workgroups along y.
        y: u32,
        /// Workgroups along z.
        z: u32,
    },
}

/// An ordered list of [`Command`]s produced by pass execution and consumed
/// whole by [`GpuBackend::submit`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandStream {
    commands: Vec<Command>,
    elided: u32,
}

impl CommandStream {
    /// Creates an empty stream.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
            elided: 0,
        }
    }

    /// Appends a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Records that a redundant binding was skipped.
    pub fn record_elision(&mut self) {
        self.elided += 1;
    }

    /// The recorded commands in order.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of bindings skipped as redundant during recording.
    #[must_use]
    pub const fn elided(&self) -> u32 {
        self.elided
    }
}

/// Capability surface of a WebGPU-like native API.
///
/// Implementations own the mapping from [`NativeKey`]s to live API objects.
/// The core calls `create_*` from generate hooks, `destroy` from destroy
/// hooks and deconstruction, and `submit` when an execution context
/// finishes.
///
/// `create_*` methods distinguish two failure shapes: `Ok(None)` means the
/// backend declined to produce the object (surfaced to callers as
/// [`GenerationFailed`](crate::error::Error::GenerationFailed), leaving the
/// cache empty for retry); `Err(_)` propagates as-is.
///
/// `destroy` is infallible by signature. A backend whose API can fail on
/// teardown must absorb that failure itself; the lifecycle protocol never
/// observes it.
pub trait GpuBackend {
    /// Creates a buffer.
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<Option<NativeKey>>;

    /// Creates a texture.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<Option<NativeKey>>;

    /// Creates a full view of `texture`.
    fn create_texture_view(&mut self, texture: NativeKey) -> Result<Option<NativeKey>>;

    /// Creates a sampler.
    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> Result<Option<NativeKey>>;

    /// Creates a shader module from source text.
    fn create_shader_module(&mut self, source: &str) -> Result<Option<NativeKey>>;

    /// Creates a bind group layout.
    fn create_bind_group_layout(
        &mut self,
        desc: &BindGroupLayoutDescriptor,
    ) -> Result<Option<NativeKey>>;

    /// Creates a bind group.
    fn create_bind_group(&mut self, desc: &BindGroupDescriptor) -> Result<Option<NativeKey>>;

    /// Creates a pipeline layout.
    fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDescriptor,
    ) -> Result<Option<NativeKey>>;

    /// Creates a render pipeline. Blocks until compilation finishes.
    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> Result<Option<NativeKey>>;

    /// Creates a compute pipeline. Blocks until compilation finishes.
    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor,
    ) -> Result<Option<NativeKey>>;

    /// Acquires a view of the current frame's external surface.
    fn acquire_frame_view(&mut self, source: FrameViewSource) -> Result<Option<NativeKey>>;

    /// Destroys a native object. Never fails.
    fn destroy(&mut self, key: NativeKey);

    /// Writes bytes into a buffer at `offset`.
    fn write_buffer(&mut self, buffer: NativeKey, offset: u64, data: &[u8]) -> Result<()>;

    /// Reads `len` bytes from a buffer at `offset`. Blocks until available.
    fn read_buffer(&mut self, buffer: NativeKey, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Uploads pixel data into a texture.
    fn copy_image_to_texture(
        &mut self,
        texture: NativeKey,
        data: &[u8],
        size: [u32; 3],
    ) -> Result<()>;

    /// Submits a recorded command stream to the queue.
    fn submit(&mut self, stream: &CommandStream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_set_superset() {
        let vf = StageSet::VERTEX.union(StageSet::FRAGMENT);
        assert!(vf.is_superset(StageSet::VERTEX));
        assert!(vf.is_superset(vf));
        assert!(!StageSet::VERTEX.is_superset(vf));
        assert!(vf.is_superset(StageSet::NONE), "empty set is a subset");
    }

    #[test]
    fn usage_contains() {
        let usage = BufferUsage::UNIFORM.union(BufferUsage::COPY_DST);
        assert!(usage.contains(BufferUsage::UNIFORM));
        assert!(!usage.contains(BufferUsage::VERTEX));
    }

    #[test]
    fn depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(TextureFormat::Depth24PlusStencil8.is_depth());
        assert!(!TextureFormat::Rgba8Unorm.is_depth());
    }

    #[test]
    fn stream_tracks_elisions() {
        let mut stream = CommandStream::new();
        stream.push(Command::SetPipeline(NativeKey(1)));
        stream.record_elision();
        stream.record_elision();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.elided(), 2);
    }
}
