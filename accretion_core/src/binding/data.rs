// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::backend::BindingResource;
use crate::buffer::GpuBuffer;
use crate::error::Result;
use crate::memory::MemoryLayoutKind;
use crate::object::{GpuObject, GpuResource};
use crate::texture::{CanvasTexture, FrameBufferTexture, GpuSampler, ImageTexture, VideoTexture};

/// A concrete resource attached to a bind group slot.
///
/// The union is closed: these six resource kinds are the only things a
/// binding can carry, and matches over it are exhaustive on purpose — a new
/// kind must be threaded through every consumer.
#[derive(Clone, Debug)]
pub enum BindData {
    /// A uniform or storage buffer.
    Buffer(GpuBuffer),
    /// A sampler.
    Sampler(GpuSampler),
    /// A texture uploaded from image pixels.
    ImageTexture(ImageTexture),
    /// An offscreen render target texture.
    FrameBufferTexture(FrameBufferTexture),
    /// A per-read external video frame.
    VideoTexture(VideoTexture),
    /// A per-frame presentable surface.
    CanvasTexture(CanvasTexture),
}

impl BindData {
    /// The memory layout classification this data satisfies.
    #[must_use]
    pub fn memory_kind(&self) -> MemoryLayoutKind {
        match self {
            Self::Buffer(_) => MemoryLayoutKind::Buffer,
            Self::Sampler(_) => MemoryLayoutKind::Sampler,
            Self::ImageTexture(_)
            | Self::FrameBufferTexture(_)
            | Self::VideoTexture(_)
            | Self::CanvasTexture(_) => MemoryLayoutKind::Texture,
        }
    }

    /// Reads the underlying native object(s) and produces the backend
    /// binding entry. Runs the owner's full read protocol, so a stale
    /// dependency regenerates here.
    pub(crate) fn resolve(&self) -> Result<BindingResource> {
        Ok(match self {
            Self::Buffer(buffer) => BindingResource::Buffer {
                key: buffer.native()?,
                offset: 0,
                size: buffer.size(),
            },
            Self::Sampler(sampler) => BindingResource::Sampler {
                key: sampler.native()?,
            },
            Self::ImageTexture(texture) => BindingResource::TextureView {
                key: texture.native()?.view,
            },
            Self::FrameBufferTexture(texture) => BindingResource::TextureView {
                key: texture.native()?.view,
            },
            Self::VideoTexture(texture) => BindingResource::TextureView {
                key: texture.native()?,
            },
            Self::CanvasTexture(texture) => BindingResource::TextureView {
                key: texture.native()?,
            },
        })
    }
}

impl GpuResource for BindData {
    fn object(&self) -> &GpuObject {
        match self {
            Self::Buffer(buffer) => buffer.object(),
            Self::Sampler(sampler) => sampler.object(),
            Self::ImageTexture(texture) => texture.object(),
            Self::FrameBufferTexture(texture) => texture.object(),
            Self::VideoTexture(texture) => texture.object(),
            Self::CanvasTexture(texture) => texture.object(),
        }
    }
}

impl From<GpuBuffer> for BindData {
    fn from(buffer: GpuBuffer) -> Self {
        Self::Buffer(buffer)
    }
}

impl From<GpuSampler> for BindData {
    fn from(sampler: GpuSampler) -> Self {
        Self::Sampler(sampler)
    }
}

impl From<ImageTexture> for BindData {
    fn from(texture: ImageTexture) -> Self {
        Self::ImageTexture(texture)
    }
}

impl From<FrameBufferTexture> for BindData {
    fn from(texture: FrameBufferTexture) -> Self {
        Self::FrameBufferTexture(texture)
    }
}

impl From<VideoTexture> for BindData {
    fn from(texture: VideoTexture) -> Self {
        Self::VideoTexture(texture)
    }
}

impl From<CanvasTexture> for BindData {
    fn from(texture: CanvasTexture) -> Self {
        Self::CanvasTexture(texture)
    }
}
