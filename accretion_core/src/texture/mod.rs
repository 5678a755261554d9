// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Texture resources, samplers, and render targets.
//!
//! Four texture wrappers cover the ways pixels reach the GPU:
//!
//! - [`ImageTexture`]: pixels uploaded from memory, persistent.
//! - [`FrameBufferTexture`]: rendered into and sampled from, persistent.
//! - [`VideoTexture`]: an external video frame, valid for a single read.
//! - [`CanvasTexture`]: the presentation surface, valid for one frame.
//!
//! [`RenderTargets`] groups such textures into the attachment set of a
//! render pass. It is setup-gated like a bind group layout and owns no
//! native object itself; [`RenderTargets::resolve`] reads the natives of
//! its attachments on demand.

mod canvas;
mod frame_buffer;
mod image;
mod sampler;
mod targets;
mod video;

pub use canvas::CanvasTexture;
pub use frame_buffer::FrameBufferTexture;
pub use image::{ImageSource, ImageTexture};
pub use sampler::GpuSampler;
pub use targets::{RenderTargets, RenderTargetsSetup, ResolvedTargets, TargetTexture};
pub use video::VideoTexture;

use crate::backend::NativeKey;
use crate::cache::NativeValue;

/// The pair of backend keys a sampled texture owns.
///
/// The view is what bind groups and render passes consume; the texture is
/// the allocation behind it and counts as the primary key in traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureNative {
    /// The texture allocation.
    pub texture: NativeKey,
    /// A full view of it.
    pub view: NativeKey,
}

impl NativeValue for TextureNative {
    fn native_key(self) -> NativeKey {
        self.texture
    }
}
