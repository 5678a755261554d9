// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::string::String;
use core::cell::Cell;

use crate::backend::{ComputePipelineDescriptor, NativeKey, ShaderStage};
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::error::{Error, Result};
use crate::object::{GpuObject, GpuResource, ListenerId, ObjectKind};
use crate::pipeline::PipelineLayout;
use crate::reason::CHILD_DATA;
use crate::shader::ShaderModule;

struct ComputePipelineInner {
    object: GpuObject,
    shader: ShaderModule,
    entry: String,
    shader_listener: Cell<Option<ListenerId>>,
    layout_listener: Cell<Option<ListenerId>>,
    native: NativeCell<NativeKey>,
}

impl Drop for ComputePipelineInner {
    fn drop(&mut self) {
        if let Some(id) = self.shader_listener.take() {
            self.shader.remove_invalidation_listener(id);
        }
        if let Some(id) = self.layout_listener.take() {
            self.shader.pipeline_layout().remove_invalidation_listener(id);
        }
    }
}

/// A compute pipeline for one compute entry point.
#[derive(Clone)]
pub struct ComputePipeline {
    inner: Rc<ComputePipelineInner>,
}

impl core::fmt::Debug for ComputePipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComputePipeline")
            .field("tag", &self.inner.object.tag())
            .field("entry", &self.inner.entry)
            .finish_non_exhaustive()
    }
}

impl ComputePipeline {
    /// Creates a compute pipeline for `entry` in `shader`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the entry point does not exist and
    /// [`Error::InvalidConfiguration`] when it is not a compute entry
    /// point.
    pub fn new(shader: &ShaderModule, entry: &str) -> Result<Self> {
        let reflected = shader.entry_point(entry)?;
        if reflected.stage != ShaderStage::Compute {
            return Err(Error::InvalidConfiguration(alloc::format!(
                "entry point `{entry}` is not a compute entry point"
            )));
        }

        let inner = Rc::new(ComputePipelineInner {
            object: GpuObject::new(
                shader.object().device().clone(),
                ObjectKind::ComputePipeline,
            ),
            shader: shader.clone(),
            entry: entry.into(),
            shader_listener: Cell::new(None),
            layout_listener: Cell::new(None),
            native: NativeCell::new(CacheLifetime::Persistent),
        });
        let this = Self { inner };
        this.inner
            .shader_listener
            .set(Some(this.forward_from(shader.object())));
        this.inner
            .layout_listener
            .set(Some(this.forward_from(shader.pipeline_layout().object())));
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

    /// The entry point's workgroup size, from reflection.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the reflection lost the entry point.
    pub fn workgroup_size(&self) -> Result<[u32; 3]> {
        Ok(self.inner.shader.entry_point(&self.inner.entry)?.workgroup_size)
    }

    /// The native pipeline, recompiled through the read protocol.
    ///
    /// # Errors
    ///
    /// The read protocol errors of the pipeline, the shader, and the
    /// pipeline layout.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || {
                let desc = ComputePipelineDescriptor {
                    shader: inner.shader.native()?,
                    layout: inner.shader.pipeline_layout().native()?,
                    entry: inner.entry.clone(),
                };
                device.with_backend(|b| b.create_compute_pipeline(&desc))
            },
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the pipeline down and stops listening on the shader and its
    /// layout. Terminal.
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
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for ComputePipeline {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AccessMode, BindingKind, BufferBindingKind, StageSet};
    use crate::device::GpuDevice;
    use crate::shader::{
        BindingReflection, EntryPointReflection, GroupReflection, ShaderReflection,
    };
    use crate::testing::{TestBackend, TestHandle};
    use alloc::boxed::Box;
    use alloc::vec;

    fn make_device() -> (GpuDevice, TestHandle) {
        let backend = TestBackend::new();
        let handle = backend.handle();
        (GpuDevice::new(Box::new(backend)), handle)
    }

    fn reduce_reflection() -> ShaderReflection {
        ShaderReflection {
            groups: vec![GroupReflection {
                index: 0,
                bindings: vec![BindingReflection {
                    index: 0,
                    name: "values".into(),
                    visibility: StageSet::COMPUTE,
                    access: AccessMode::ReadWrite,
                    kind: BindingKind::Buffer {
                        kind: BufferBindingKind::Storage,
                        min_size: 4,
                    },
                }],
            }],
            entry_points: vec![EntryPointReflection {
                name: "reduce".into(),
                stage: ShaderStage::Compute,
                workgroup_size: [64, 1, 1],
                vertex_buffers: vec![],
            }],
        }
    }

    #[test]
    fn non_compute_entry_is_rejected() {
        let (device, _handle) = make_device();
        let mut reflection = reduce_reflection();
        reflection.entry_points[0].stage = ShaderStage::Vertex;
        let shader = ShaderModule::new(&device, "reduce", reflection).unwrap();
        assert!(matches!(
            ComputePipeline::new(&shader, "reduce"),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn layout_replacement_recompiles_the_pipeline() {
        let (device, handle) = make_device();
        let shader = ShaderModule::new(&device, "reduce", reduce_reflection()).unwrap();
        let pipeline = ComputePipeline::new(&shader, "reduce").unwrap();
        assert_eq!(pipeline.workgroup_size().unwrap(), [64, 1, 1]);

        let first = pipeline.native().unwrap();
        let creations = handle.created();

        // A compatible group swap reaches the pipeline through its layout.
        let replacement = ShaderModule::new(&device, "reduce2", reduce_reflection())
            .unwrap()
            .group_layouts()[0]
            .clone();
        shader.pipeline_layout().replace_group(0, &replacement).unwrap();
        assert_ne!(pipeline.native().unwrap(), first);
        // One new pipeline layout and one new pipeline.
        assert_eq!(handle.created(), creations + 2);
    }
}
