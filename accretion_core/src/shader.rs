// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shader modules and the reflection data that drives layout creation.
//!
//! Reflection is an input here, not a product: whoever compiles or ships
//! the shader source also supplies a [`ShaderReflection`] describing its
//! bind groups and entry points. Construction turns that description into
//! real [`BindGroupLayout`]s, deduplicated through the device's
//! [`LayoutRegistry`](crate::binding::LayoutRegistry), and one
//! [`PipelineLayout`] covering all groups.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::backend::{AccessMode, BindingKind, NativeKey, ShaderStage, StageSet, VertexBufferLayout};
use crate::binding::BindGroupLayout;
use crate::cache::{CacheLifetime, NativeCell, deconstruct_native};
use crate::device::GpuDevice;
use crate::error::{Error, Result};
use crate::memory::MemoryLayout;
use crate::object::{GpuObject, GpuResource, ObjectKind};
use crate::pipeline::PipelineLayout;

/// One binding as the shader declares it.
#[derive(Clone, Debug)]
pub struct BindingReflection {
    /// Binding index within the group.
    pub index: u32,
    /// Binding name in the shader source.
    pub name: String,
    /// Stages that reference the binding.
    pub visibility: StageSet,
    /// How the shader accesses it.
    pub access: AccessMode,
    /// The resource shape behind the binding.
    pub kind: BindingKind,
}

/// One bind group as the shader declares it.
#[derive(Clone, Debug)]
pub struct GroupReflection {
    /// Group index in the shader.
    pub index: u32,
    /// Bindings of the group.
    pub bindings: Vec<BindingReflection>,
}

/// One entry point of the shader.
#[derive(Clone, Debug)]
pub struct EntryPointReflection {
    /// Function name.
    pub name: String,
    /// Stage the entry point runs in.
    pub stage: ShaderStage,
    /// Workgroup size; meaningful for compute entry points.
    pub workgroup_size: [u32; 3],
    /// Vertex buffer layouts consumed; meaningful for vertex entry points.
    pub vertex_buffers: Vec<VertexBufferLayout>,
}

/// Everything the shader compiler learned about a module.
#[derive(Clone, Debug, Default)]
pub struct ShaderReflection {
    /// Declared bind groups.
    pub groups: Vec<GroupReflection>,
    /// Declared entry points.
    pub entry_points: Vec<EntryPointReflection>,
}

struct ShaderInner {
    object: GpuObject,
    source: String,
    reflection: ShaderReflection,
    group_layouts: Vec<BindGroupLayout>,
    pipeline_layout: PipelineLayout,
    native: NativeCell<NativeKey>,
}

/// A compiled shader module plus the layouts derived from its reflection.
///
/// Two shaders declaring structurally equal groups end up sharing the same
/// [`BindGroupLayout`] objects, so bind groups built for one bind to the
/// other as well.
#[derive(Clone)]
pub struct ShaderModule {
    inner: Rc<ShaderInner>,
}

impl core::fmt::Debug for ShaderModule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShaderModule")
            .field("tag", &self.inner.object.tag())
            .field("groups", &self.inner.group_layouts.len())
            .field("entry_points", &self.inner.reflection.entry_points.len())
            .finish_non_exhaustive()
    }
}

impl ShaderModule {
    /// Builds a shader module from source text and its reflection.
    ///
    /// Group layouts are created eagerly and deduplicated against the
    /// device registry; the native module itself is created lazily on the
    /// first [`native`](Self::native) read.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] when group indices are not
    /// contiguous from zero or a group's bindings are malformed.
    pub fn new(device: &GpuDevice, source: &str, reflection: ShaderReflection) -> Result<Self> {
        let mut groups: Vec<&GroupReflection> = reflection.groups.iter().collect();
        groups.sort_by_key(|g| g.index);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "shaders declare a handful of groups; the position always fits u32"
        )]
        for (position, group) in groups.iter().enumerate() {
            if group.index != position as u32 {
                return Err(Error::InvalidConfiguration(alloc::format!(
                    "bind group indices must be contiguous from zero, found group {}",
                    group.index
                )));
            }
        }

        let mut group_layouts = Vec::with_capacity(groups.len());
        for group in &groups {
            let layout = BindGroupLayout::new(device);
            layout.setup(|s| {
                for binding in &group.bindings {
                    s.add_binding(
                        binding.index,
                        &binding.name,
                        MemoryLayout::from_binding(device, binding.kind),
                        binding.visibility,
                        binding.access,
                    )?;
                }
                Ok(())
            })?;
            group_layouts.push(device.layout_registry().canonical(&layout)?);
        }
        let pipeline_layout = PipelineLayout::new(device, &group_layouts);

        Ok(Self {
            inner: Rc::new(ShaderInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::Shader),
                source: source.into(),
                reflection,
                group_layouts,
                pipeline_layout,
                native: NativeCell::new(CacheLifetime::Persistent),
            }),
        })
    }

    /// The shader source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// The reflection this module was built from.
    #[must_use]
    pub fn reflection(&self) -> &ShaderReflection {
        &self.inner.reflection
    }

    /// The canonical group layouts, indexed by group.
    #[must_use]
    pub fn group_layouts(&self) -> &[BindGroupLayout] {
        &self.inner.group_layouts
    }

    /// The pipeline layout covering all groups.
    #[must_use]
    pub fn pipeline_layout(&self) -> &PipelineLayout {
        &self.inner.pipeline_layout
    }

    /// Looks up an entry point by name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the shader declares no such entry point.
    pub fn entry_point(&self, name: &str) -> Result<&EntryPointReflection> {
        self.inner
            .reflection
            .entry_points
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::NotFound {
                what: "entry point",
                name: name.into(),
            })
    }

    /// The native shader module, compiled on first read.
    ///
    /// # Errors
    ///
    /// The read protocol errors.
    pub fn native(&self) -> Result<NativeKey> {
        let inner = &self.inner;
        let device = inner.object.device().clone();
        inner.native.read(
            &inner.object,
            || device.with_backend(|b| b.create_shader_module(&inner.source)),
            |key, _| device.with_backend(|b| b.destroy(key)),
        )
    }

    /// Tears the module down. The shared group layouts are left alone;
    /// other shaders may hold them. Terminal.
    pub fn deconstruct(&self) {
        let device = self.inner.object.device().clone();
        deconstruct_native(&self.inner.object, &self.inner.native, |key, _| {
            device.with_backend(|b| b.destroy(key));
        });
    }
}

impl GpuResource for ShaderModule {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BufferBindingKind;
    use crate::testing::{TestBackend, TestHandle};
    use alloc::boxed::Box;
    use alloc::string::ToString;
    use alloc::vec;

    fn make_device() -> (GpuDevice, TestHandle) {
        let backend = TestBackend::new();
        let handle = backend.handle();
        (GpuDevice::new(Box::new(backend)), handle)
    }

    fn uniform_binding(index: u32, name: &str) -> BindingReflection {
        BindingReflection {
            index,
            name: name.into(),
            visibility: StageSet::VERTEX.union(StageSet::FRAGMENT),
            access: AccessMode::Read,
            kind: BindingKind::Buffer {
                kind: BufferBindingKind::Uniform,
                min_size: 64,
            },
        }
    }

    fn frame_reflection() -> ShaderReflection {
        ShaderReflection {
            groups: vec![GroupReflection {
                index: 0,
                bindings: vec![uniform_binding(0, "frame")],
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

    #[test]
    fn equal_structures_share_one_layout() {
        let (device, _handle) = make_device();
        let a = ShaderModule::new(&device, "shader a", frame_reflection()).unwrap();
        let b = ShaderModule::new(&device, "shader b", frame_reflection()).unwrap();

        assert!(BindGroupLayout::ptr_eq(
            &a.group_layouts()[0],
            &b.group_layouts()[0],
        ));
        assert_eq!(device.layout_registry().len(), 1);
    }

    #[test]
    fn noncontiguous_group_indices_are_rejected() {
        let (device, _handle) = make_device();
        let reflection = ShaderReflection {
            groups: vec![GroupReflection {
                index: 1,
                bindings: vec![uniform_binding(0, "frame")],
            }],
            entry_points: vec![],
        };
        assert!(matches!(
            ShaderModule::new(&device, "bad", reflection),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_entry_point_is_not_found() {
        let (device, _handle) = make_device();
        let shader = ShaderModule::new(&device, "shader", frame_reflection()).unwrap();
        shader.entry_point("vs_main").unwrap();

        let err = shader.entry_point("fs_shadow").unwrap_err();
        assert_eq!(err.to_string(), "entry point `fs_shadow` is not set");
    }

    #[test]
    fn module_compiles_once_and_caches() {
        let (device, handle) = make_device();
        let shader = ShaderModule::new(&device, "shader", frame_reflection()).unwrap();
        assert_eq!(handle.created(), 0, "layout natives stay lazy");

        let key = shader.native().unwrap();
        assert_eq!(shader.native().unwrap(), key);
        assert_eq!(handle.created(), 1);
    }
}
