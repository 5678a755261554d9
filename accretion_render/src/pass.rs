// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass stores: ordered step lists recorded into an execution context.

use alloc::vec::Vec;

use accretion_core::error::Result;
use accretion_core::texture::RenderTargets;

use crate::context::ExecutionContext;
use crate::id::StepId;
use crate::step::{ComputeStep, DrawCall, RenderStep};

/// Generational slot store shared by both pass kinds.
///
/// Freed slots are recycled under a bumped generation, so a [`StepId`]
/// issued before a removal never resolves to the step that reused the
/// slot.
#[derive(Debug)]
struct StepStore<T> {
    slots: Vec<Option<T>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    order: Vec<u32>,
}

impl<T> Default for StepStore<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl<T> StepStore<T> {
    fn add(&mut self, step: T) -> StepId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.slots[idx as usize] = Some(step);
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "a pass holds nowhere near 2^32 steps"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Some(step));
            self.generation.push(0);
            idx
        };
        self.order.push(idx);
        StepId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn remove(&mut self, id: StepId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.slots[id.idx as usize] = None;
        // Stale handles must fail from now on.
        self.generation[id.idx as usize] += 1;
        self.free_list.push(id.idx);
        self.order.retain(|&idx| idx != id.idx);
        true
    }

    fn is_alive(&self, id: StepId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].is_some()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    /// Live steps in insertion order.
    fn iter(&self) -> impl Iterator<Item = &T> {
        self.order
            .iter()
            .filter_map(|&idx| self.slots[idx as usize].as_ref())
    }
}

/// An ordered collection of [`RenderStep`]s drawing into one
/// [`RenderTargets`].
///
/// Steps are addressed by generational [`StepId`] handles; removed slots
/// are recycled and stale handles fail validation instead of touching the
/// wrong step. Execution walks the steps in insertion order, reads every
/// referenced native object through its read protocol, and records the
/// pass into an [`ExecutionContext`].
#[derive(Debug)]
pub struct RenderPass {
    targets: RenderTargets,
    steps: StepStore<RenderStep>,
}

impl RenderPass {
    /// Creates an empty pass drawing into `targets`.
    #[must_use]
    pub fn new(targets: &RenderTargets) -> Self {
        Self {
            targets: targets.clone(),
            steps: StepStore::default(),
        }
    }

    /// The attachment set this pass draws into.
    #[must_use]
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Appends a step and returns its handle.
    pub fn add_step(&mut self, step: RenderStep) -> StepId {
        self.steps.add(step)
    }

    /// Removes a step, freeing its slot for reuse.
    ///
    /// Returns `false` for a stale or already removed handle; removal is
    /// never an error.
    pub fn remove_step(&mut self, id: StepId) -> bool {
        self.steps.remove(id)
    }

    /// Returns whether the handle refers to a live step.
    #[must_use]
    pub fn is_alive(&self, id: StepId) -> bool {
        self.steps.is_alive(id)
    }

    /// Number of live steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Records this pass into `ctx`, in step insertion order.
    ///
    /// Every referenced resource is read through its native read protocol,
    /// so stale objects regenerate here. Redundant bindings between
    /// consecutive steps are elided by the context.
    ///
    /// # Errors
    ///
    /// Whatever any involved read protocol surfaces, including the
    /// attachment resolution of the targets. On error the context keeps
    /// the partially recorded pass; callers normally drop it unsubmitted.
    pub fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        let resolved = self.targets.resolve()?;
        ctx.begin_render_pass(&resolved);
        for step in self.steps.iter() {
            ctx.set_pipeline(step.pipeline.native()?);
            for (group, bind_group) in &step.bind_groups {
                ctx.set_bind_group(*group, bind_group.native()?);
            }
            for (slot, buffer) in &step.vertex_buffers {
                ctx.set_vertex_buffer(*slot, buffer.native()?);
            }
            if let Some((buffer, format)) = &step.index {
                ctx.set_index_buffer(buffer.native()?, *format);
            }
            match step.draw {
                DrawCall::Vertices {
                    vertex_count,
                    instance_count,
                } => ctx.draw(vertex_count, instance_count),
                DrawCall::Indexed {
                    index_count,
                    instance_count,
                } => ctx.draw_indexed(index_count, instance_count),
            }
        }
        ctx.end_render_pass();
        Ok(())
    }
}

/// An ordered collection of [`ComputeStep`]s.
///
/// Mirrors [`RenderPass`] without an attachment set: dispatches need only
/// a pipeline and bind groups.
#[derive(Debug, Default)]
pub struct ComputePass {
    steps: StepStore<ComputeStep>,
}

impl ComputePass {
    /// Creates an empty pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step and returns its handle.
    pub fn add_step(&mut self, step: ComputeStep) -> StepId {
        self.steps.add(step)
    }

    /// Removes a step, freeing its slot for reuse.
    ///
    /// Returns `false` for a stale or already removed handle.
    pub fn remove_step(&mut self, id: StepId) -> bool {
        self.steps.remove(id)
    }

    /// Returns whether the handle refers to a live step.
    #[must_use]
    pub fn is_alive(&self, id: StepId) -> bool {
        self.steps.is_alive(id)
    }

    /// Number of live steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Records this pass into `ctx`, in step insertion order.
    ///
    /// # Errors
    ///
    /// Whatever any involved read protocol surfaces. On error the context
    /// keeps the partially recorded pass.
    pub fn execute(&self, ctx: &mut ExecutionContext) -> Result<()> {
        ctx.begin_compute_pass();
        for step in self.steps.iter() {
            ctx.set_pipeline(step.pipeline.native()?);
            for (group, bind_group) in &step.bind_groups {
                ctx.set_bind_group(*group, bind_group.native()?);
            }
            let [x, y, z] = step.workgroups;
            ctx.dispatch(x, y, z);
        }
        ctx.end_compute_pass();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accretion_core::backend::{
        AccessMode, BindingKind, BufferBindingKind, BufferUsage, Command, IndexFormat, ShaderStage,
        StageSet, TextureFormat,
    };
    use accretion_core::binding::BindGroup;
    use accretion_core::buffer::GpuBuffer;
    use accretion_core::device::GpuDevice;
    use accretion_core::pipeline::{ComputePipeline, RenderPipeline};
    use accretion_core::shader::{
        BindingReflection, EntryPointReflection, GroupReflection, ShaderModule, ShaderReflection,
    };
    use accretion_core::texture::FrameBufferTexture;
    use accretion_harness::counting_device;
    use alloc::vec;

    extern crate alloc;

    struct Scene {
        device: GpuDevice,
        pipeline: RenderPipeline,
        group: BindGroup,
        vertices: GpuBuffer,
    }

    fn reflection() -> ShaderReflection {
        ShaderReflection {
            groups: vec![GroupReflection {
                index: 0,
                bindings: vec![BindingReflection {
                    index: 0,
                    name: "frame".into(),
                    visibility: StageSet::VERTEX,
                    access: AccessMode::Read,
                    kind: BindingKind::Buffer {
                        kind: BufferBindingKind::Uniform,
                        min_size: 64,
                    },
                }],
            }],
            entry_points: vec![
                EntryPointReflection {
                    name: "vs_main".into(),
                    stage: ShaderStage::Vertex,
                    workgroup_size: [1, 1, 1],
                    vertex_buffers: vec![],
                },
                EntryPointReflection {
                    name: "fs_main".into(),
                    stage: ShaderStage::Fragment,
                    workgroup_size: [1, 1, 1],
                    vertex_buffers: vec![],
                },
            ],
        }
    }

    fn compute_reflection() -> ShaderReflection {
        ShaderReflection {
            groups: vec![GroupReflection {
                index: 0,
                bindings: vec![BindingReflection {
                    index: 0,
                    name: "cells".into(),
                    visibility: StageSet::COMPUTE,
                    access: AccessMode::ReadWrite,
                    kind: BindingKind::Buffer {
                        kind: BufferBindingKind::Storage,
                        min_size: 256,
                    },
                }],
            }],
            entry_points: vec![EntryPointReflection {
                name: "cs_main".into(),
                stage: ShaderStage::Compute,
                workgroup_size: [8, 8, 1],
                vertex_buffers: vec![],
            }],
        }
    }

    fn scene() -> (Scene, accretion_harness::CountingHandle) {
        let (device, handle) = counting_device();
        let shader = ShaderModule::new(&device, "mesh", reflection()).unwrap();
        let color = FrameBufferTexture::new(&device, [64, 64], TextureFormat::Rgba8Unorm);
        let targets = RenderTargets::new(&device);
        targets.setup(|s| s.add_color(color, None)).unwrap();
        let pipeline = RenderPipeline::new(&shader, "vs_main", Some("fs_main"), &targets).unwrap();
        let group = BindGroup::new(&shader.group_layouts()[0]);
        group
            .set_data(
                "frame",
                GpuBuffer::new(&device, 64, BufferUsage::UNIFORM.union(BufferUsage::COPY_DST)),
            )
            .unwrap();
        let vertices = GpuBuffer::new(&device, 36 * 12, BufferUsage::VERTEX);
        let scene = Scene {
            device,
            pipeline,
            group,
            vertices,
        };
        (scene, handle)
    }

    fn step(scene: &Scene) -> RenderStep {
        RenderStep {
            pipeline: scene.pipeline.clone(),
            bind_groups: vec![(0, scene.group.clone())],
            vertex_buffers: vec![(0, scene.vertices.clone())],
            index: None,
            draw: DrawCall::Vertices {
                vertex_count: 36,
                instance_count: 1,
            },
        }
    }

    #[test]
    fn repeated_bindings_are_elided() {
        let (scene, handle) = scene();
        let mut pass = RenderPass::new(scene.pipeline.targets());
        pass.add_step(step(&scene));
        pass.add_step(step(&scene));

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).unwrap();
        let stream = ctx.finish();

        // One pipeline, one group, one vertex buffer, then two draws.
        let draws = stream
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .count();
        let pipelines = stream
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetPipeline(_)))
            .count();
        assert_eq!(draws, 2);
        assert_eq!(pipelines, 1);
        assert_eq!(stream.elided(), 3);

        scene.device.submit(&stream);
        assert_eq!(handle.submits(), 1);
    }

    #[test]
    fn missing_group_data_surfaces_from_execute() {
        let (scene, _handle) = scene();
        let empty = BindGroup::new(scene.group.layout());
        let mut pass = RenderPass::new(scene.pipeline.targets());
        let mut step = step(&scene);
        step.bind_groups = vec![(0, empty)];
        pass.add_step(step);

        let mut ctx = ExecutionContext::new();
        let err = pass.execute(&mut ctx).unwrap_err();
        assert_eq!(
            alloc::string::ToString::to_string(&err),
            "data for binding `frame` is not set"
        );
    }

    #[test]
    fn removed_steps_stop_drawing_and_handles_go_stale() {
        let (scene, _handle) = scene();
        let mut pass = RenderPass::new(scene.pipeline.targets());
        let first = pass.add_step(step(&scene));
        let second = pass.add_step(step(&scene));

        assert!(pass.remove_step(first));
        assert!(!pass.remove_step(first), "second removal is a no-op");
        assert!(pass.is_alive(second));
        assert_eq!(pass.step_count(), 1);

        // The freed slot is recycled under a new generation.
        let third = pass.add_step(step(&scene));
        assert_eq!(third.index(), first.index());
        assert_ne!(third.generation(), first.generation());
        assert!(!pass.is_alive(first));

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).unwrap();
        let draws = ctx
            .finish()
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .count();
        assert_eq!(draws, 2);
    }

    #[test]
    fn indexed_steps_bind_the_index_buffer() {
        let (scene, _handle) = scene();
        let indices = GpuBuffer::new(&scene.device, 72, BufferUsage::INDEX);
        let mut pass = RenderPass::new(scene.pipeline.targets());
        let mut indexed = step(&scene);
        indexed.index = Some((indices, IndexFormat::Uint16));
        indexed.draw = DrawCall::Indexed {
            index_count: 36,
            instance_count: 1,
        };
        pass.add_step(indexed);

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).unwrap();
        let stream = ctx.finish();
        assert!(stream
            .commands()
            .iter()
            .any(|c| matches!(c, Command::SetIndexBuffer { .. })));
        assert!(stream
            .commands()
            .iter()
            .any(|c| matches!(c, Command::DrawIndexed { index_count: 36, .. })));
    }

    #[test]
    fn binding_state_resets_between_passes() {
        let (scene, _handle) = scene();
        let mut pass = RenderPass::new(scene.pipeline.targets());
        pass.add_step(step(&scene));

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).unwrap();
        pass.execute(&mut ctx).unwrap();
        let stream = ctx.finish();

        let pipelines = stream
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetPipeline(_)))
            .count();
        assert_eq!(pipelines, 2, "second pass re-binds everything");
    }

    #[test]
    fn compute_pass_dispatches_in_order() {
        let (device, _handle) = counting_device();
        let shader = ShaderModule::new(&device, "sim", compute_reflection()).unwrap();
        let pipeline = ComputePipeline::new(&shader, "cs_main").unwrap();
        let group = BindGroup::new(&shader.group_layouts()[0]);
        group
            .set_data("cells", GpuBuffer::new(&device, 256, BufferUsage::STORAGE))
            .unwrap();

        let mut pass = ComputePass::new();
        pass.add_step(ComputeStep {
            pipeline: pipeline.clone(),
            bind_groups: vec![(0, group.clone())],
            workgroups: [4, 4, 1],
        });
        pass.add_step(ComputeStep {
            pipeline,
            bind_groups: vec![(0, group)],
            workgroups: [2, 1, 1],
        });

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).unwrap();
        let stream = ctx.finish();

        let dispatches: Vec<_> = stream
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::Dispatch { x, y, z } => Some([*x, *y, *z]),
                _ => None,
            })
            .collect();
        assert_eq!(dispatches, vec![[4, 4, 1], [2, 1, 1]]);
        // Shared pipeline and group are bound once.
        assert_eq!(stream.elided(), 2);
        assert!(matches!(
            stream.commands().first(),
            Some(Command::BeginComputePass)
        ));
        assert!(matches!(
            stream.commands().last(),
            Some(Command::EndComputePass)
        ));
    }

    #[test]
    fn compute_steps_remove_like_render_steps() {
        let (device, _handle) = counting_device();
        let shader = ShaderModule::new(&device, "sim", compute_reflection()).unwrap();
        let pipeline = ComputePipeline::new(&shader, "cs_main").unwrap();
        let group = BindGroup::new(&shader.group_layouts()[0]);
        group
            .set_data("cells", GpuBuffer::new(&device, 256, BufferUsage::STORAGE))
            .unwrap();

        let mut pass = ComputePass::new();
        let id = pass.add_step(ComputeStep {
            pipeline,
            bind_groups: vec![(0, group)],
            workgroups: [1, 1, 1],
        });
        assert!(pass.remove_step(id));
        assert!(!pass.remove_step(id));
        assert_eq!(pass.step_count(), 0);

        let mut ctx = ExecutionContext::new();
        pass.execute(&mut ctx).unwrap();
        let stream = ctx.finish();
        assert!(!stream
            .commands()
            .iter()
            .any(|c| matches!(c, Command::Dispatch { .. })));
    }
}
