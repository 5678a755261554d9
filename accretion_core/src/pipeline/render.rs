// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::string::String;
use core::cell::Cell;

use crate::backend::{
    CompareFunction, NativeKey, PrimitiveTopology, RenderPipelineDescriptor, ShaderStage,
};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::error::{Error, Result};
use crate::object::{GpuObject, GpuResource, ListenerId, ObjectKind};
use crate::pipeline::PipelineLayout;
use crate::reason::{CHILD_DATA, SETTING};
use crate::shader::ShaderModule;
use crate::texture::RenderTargets;

struct RenderPipelineInner {
    object: GpuObject,
    shader: ShaderModule,
    vertex_entry: String,
    fragment_entry: Option<String>,
    targets: RenderTargets,
    topology: Cell<PrimitiveTopology>,
    depth_write: Cell<bool>,
    depth_compare: Cell<CompareFunction>,
    shader_listener: Cell<Option<ListenerId>>,
    layout_listener: Cell<Option<ListenerId>>,
    targets_listener: Cell<Option<ListenerId>>,
    native: NativeCell<NativeKey>,
}

impl Drop for RenderPipelineInner {
    fn drop(&mut self) {
        if let Some(id) = self.shader_listener.take() {
            self.shader.remove_invalidation_listener(id);
        }
        if let Some(id) = self.layout_listener.take() {
            self.shader.pipeline_layout().remove_invalidation_listener(id);
        }
        if let Some(id) = self.targets_listener.take() {
            self.targets.remove_invalidation_listener(id);
        }
    }
}

/// A render pipeline tied to a shader and an attachment set.
///
/// The pipeline mirrors whatever its inputs become: a change in the
/// shader's layouts or in the target formats flows in as `CHILD_DATA` and
/// the native pipeline recompiles on the next read.
#[derive(Clone)]
pub struct RenderPipeline {
    inner: Rc<RenderPipelineInner>,
}

impl core::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("tag", &self.inner.object.tag())
            .field("vertex_entry", &self.inner.vertex_entry)
            .field("fragment_entry", &self.inner.fragment_entry)
            .finish_non_exhaustive()
    }
}

impl RenderPipeline {
    /// Creates a render pipeline for `shader` drawing into `targets`.
    ///
    /// Defaults: triangle list topology, depth writes on, depth compare
    /// `Less`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when an entry point does not exist and
    /// [`Error::InvalidConfiguration`] when it runs in the wrong stage.
    pub fn new(
        shader: &ShaderModule,
        vertex_entry: &str,
        fragment_entry: Option<&str>,
        targets: &RenderTargets,
    ) -> Result<Self> {
        let vertex = shader.entry_point(vertex_entry)?;
        if vertex.stage != ShaderStage::Vertex {
            return Err(Error::InvalidConfiguration(alloc::format!(
                "entry point `{vertex_entry}` is not a vertex entry point"
            )));
        }
        if let Some(name) = fragment_entry {
            let fragment = shader.entry_point(name)?;
            if fragment.stage != ShaderStage::Fragment {
                return Err(Error::InvalidConfiguration(alloc::format!(
                    "entry point `{name}` is not a fragment entry point"
                )));
            }
        }

        let inner = Rc::new(RenderPipelineInner {
            object: GpuObject::new(
                shader.object().device().clone(),
                ObjectKind::RenderPipeline,
            ),
            shader: shader.clone(),
            vertex_entry: vertex_entry.into(),
            fragment_entry: fragment_entry.map(String::from),
            targets: targets.clone(),
            topology: Cell::new(PrimitiveTopology::TriangleList),
            depth_write: Cell::new(true),
            depth_compare: Cell::new(CompareFunction::Less),
            shader_listener: Cell::new(None),
            layout_listener: Cell::new(None),
            targets_listener: Cell::new(None),
            native: NativeCell::new(CacheLifetime::Persistent),
        });
        let this = Self { inner };
        this.inner
            .shader_listener
            .set(Some(this.forward_from(shader.object())));
        this.inner
            .layout_listener
            .set(Some(this.forward_from(shader.pipeline_layout().object())));
        this.inner
            .targets_listener
            .set(Some(this.forward_from(targets.object())));
        Ok(this)
    }

    fn forward_from(&self, child: &GpuObject) -> ListenerId {
        let weak = Rc::downgrade(&self.inner);
        child.add_invalidation_listener(None, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.object.trigger_auto_update(CHILD_DATA);
            }
        })
    }

    /// The shader this pipeline runs.
    #[must_use]
    pub fn shader(&self) -> &ShaderModule {
        &self.inner.shader
    }

    /// The pipeline layout, shared with the shader.
    #[must_use]
    pub fn pipeline_layout(&self) -> &PipelineLayout {
        self.inner.shader.pipeline_layout()
    }

    /// The attachment set this pipeline draws into.
    #[must_use]
    pub fn targets(&self) -> &RenderTargets {
        &self.inner.targets
    }

    /// Primitive topology.
    #[must_use]
    pub fn topology(&self) -> PrimitiveTopology {
        self.inner.topology.get()
    }

    /// Changes the topology. Soft invalidation.
    pub fn set_topology(&self, topology: PrimitiveTopology) {
        if self.inner.topology.replace(topology) != topology {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Whether depth writes are enabled.
    #[must_use]
    pub fn depth_write(&self) -> bool {
        self.inner.depth_write.get()
    }

    /// Toggles depth writes. Soft invalidation.
    pub fn set_depth_write(&self, depth_write: bool) {
        if self.inner.depth_write.replace(depth_write) != depth_write {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// Depth comparison function.
    #[must_use]
    pub fn depth_compare(&self) -> CompareFunction {
        self.inner.depth_compare.get()
    }

    /// Changes the depth comparison. Soft invalidation.
    pub fn set_depth_compare(&self, compare: CompareFunction) {
        if self.inner.depth_compare.replace(compare) != compare {
            self.inner.object.trigger_auto_update(SETTING);
        }
    }

    /// The native pipeline, recompiled through the read protocol.
    ///
    /// # Errors
    ///
    /// The read protocol errors of the pipeline, the shader, the pipeline
    /// layout, and the target formats.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let shader = inner.shader.native()?;
                let layout = inner.shader.pipeline_layout().native()?;
                let color_formats = inner.targets.color_formats()?;
                let depth_format = inner.targets.depth_format()?;
                let vertex_buffers = inner
                    .shader
                    .entry_point(&inner.vertex_entry)?
                    .vertex_buffers
                    .clone();
                let desc = RenderPipelineDescriptor {
                    shader,
                    layout,
                    vertex_entry: inner.vertex_entry.clone(),
                    fragment_entry: inner.fragment_entry.clone(),
                    vertex_buffers,
                    color_formats,
                    depth_format,
                    topology: inner.topology.get(),
                    depth_write: inner.depth_write.get(),
                    depth_compare: inner.depth_compare.get(),
                };
                device.with_backend(|b| b.create_render_pipeline(&desc))
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the pipeline down and stops listening on shader, layout, and
    /// targets. Terminal.
    pub fn deconstruct(&self) {
        if let Some(id) = self.inner.shader_listener.take() {
            self.inner.shader.remove_invalidation_listener(id);
        }
        if let Some(id) = self.inner.layout_listener.take() {
            self.inner
                .shader
                .pipeline_layout()
                .remove_invalidation_listener(id);
        }
        if let Some(id) = self.inner.targets_listener.take() {
            self.inner.targets.remove_invalidation_listener(id);
        }
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for RenderPipeline {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}
