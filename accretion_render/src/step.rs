// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Step definitions: everything one draw or dispatch needs.

use alloc::vec::Vec;

use accretion_core::backend::IndexFormat;
use accretion_core::binding::BindGroup;
use accretion_core::buffer::GpuBuffer;
use accretion_core::pipeline::{ComputePipeline, RenderPipeline};

/// How a render step draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCall {
    /// Non-indexed draw.
    Vertices {
        /// Number of vertices.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// Indexed draw; the step must carry an index buffer.
    Indexed {
        /// Number of indices.
        index_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
}

/// A single draw in a [`RenderPass`](crate::RenderPass).
///
/// Steps hold live resource handles, not native keys: execution reads each
/// resource's native object at submit time, so a step keeps working across
/// invalidations and regenerations of anything it references.
#[derive(Clone, Debug)]
pub struct RenderStep {
    /// The pipeline to draw with.
    pub pipeline: RenderPipeline,
    /// Bind groups by group index.
    pub bind_groups: Vec<(u32, BindGroup)>,
    /// Vertex buffers by slot.
    pub vertex_buffers: Vec<(u32, GpuBuffer)>,
    /// Index buffer and element format, for indexed draws.
    pub index: Option<(GpuBuffer, IndexFormat)>,
    /// The draw call itself.
    pub draw: DrawCall,
}

/// A single dispatch in a [`ComputePass`](crate::ComputePass).
#[derive(Clone, Debug)]
pub struct ComputeStep {
    /// The pipeline to dispatch.
    pub pipeline: ComputePipeline,
    /// Bind groups by group index.
    pub bind_groups: Vec<(u32, BindGroup)>,
    /// Workgroup counts along x, y, and z.
    pub workgroups: [u32; 3],
}
