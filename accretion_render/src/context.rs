// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command recording with redundant-binding elision.

use alloc::collections::BTreeMap;

use accretion_core::backend::{Command, CommandStream, IndexFormat, NativeKey};
use accretion_core::texture::ResolvedTargets;

/// Records the commands of one or more passes into a single
/// [`CommandStream`].
///
/// The context tracks what is currently bound and drops `Set*` commands
/// that would bind the same native object again. Binding state resets at
/// every pass boundary; nothing is assumed to survive into the next pass.
/// Elisions are counted on the stream for diagnostics.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    stream: CommandStream,
    pipeline: Option<NativeKey>,
    bind_groups: BTreeMap<u32, NativeKey>,
    vertex_buffers: BTreeMap<u32, NativeKey>,
}

impl ExecutionContext {
    /// Creates a context with an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded so far.
    #[must_use]
    pub fn stream(&self) -> &CommandStream {
        &self.stream
    }

    /// Finishes recording and hands the stream over, ready for
    /// [`GpuDevice::submit`](accretion_core::device::GpuDevice::submit).
    #[must_use]
    pub fn finish(self) -> CommandStream {
        self.stream
    }

    fn reset_bindings(&mut self) {
        self.pipeline = None;
        self.bind_groups.clear();
        self.vertex_buffers.clear();
    }

    pub(crate) fn begin_render_pass(&mut self, targets: &ResolvedTargets) {
        self.reset_bindings();
        self.stream.push(Command::BeginRenderPass {
            color: targets.color.clone(),
            depth: targets.depth,
        });
    }

    pub(crate) fn end_render_pass(&mut self) {
        self.stream.push(Command::EndRenderPass);
        self.reset_bindings();
    }

    pub(crate) fn begin_compute_pass(&mut self) {
        self.reset_bindings();
        self.stream.push(Command::BeginComputePass);
    }

    pub(crate) fn end_compute_pass(&mut self) {
        self.stream.push(Command::EndComputePass);
        self.reset_bindings();
    }

    pub(crate) fn set_pipeline(&mut self, key: NativeKey) {
        if self.pipeline == Some(key) {
            self.stream.record_elision();
            return;
        }
        self.pipeline = Some(key);
        self.stream.push(Command::SetPipeline(key));
    }

    pub(crate) fn set_bind_group(&mut self, group: u32, key: NativeKey) {
        if self.bind_groups.get(&group) == Some(&key) {
            self.stream.record_elision();
            return;
        }
        self.bind_groups.insert(group, key);
        self.stream.push(Command::SetBindGroup { group, key });
    }

    pub(crate) fn set_vertex_buffer(&mut self, slot: u32, key: NativeKey) {
        if self.vertex_buffers.get(&slot) == Some(&key) {
            self.stream.record_elision();
            return;
        }
        self.vertex_buffers.insert(slot, key);
        self.stream.push(Command::SetVertexBuffer { slot, key });
    }

    pub(crate) fn set_index_buffer(&mut self, key: NativeKey, format: IndexFormat) {
        self.stream.push(Command::SetIndexBuffer { key, format });
    }

    pub(crate) fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.stream.push(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    pub(crate) fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        self.stream.push(Command::DrawIndexed {
            index_count,
            instance_count,
        });
    }

    pub(crate) fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.stream.push(Command::Dispatch { x, y, z });
    }
}
