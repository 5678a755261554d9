// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::backend::{ColorAttachment, DepthAttachment, NativeKey, TextureFormat};
use crate::device::GpuDevice;
use crate::error::{Error, Result};
use crate::object::{GpuObject, GpuResource, ListenerId, ObjectKind};
use crate::reason::{CHILD_DATA, SETTING};
use crate::setup::{SetupPhase, SetupToken};
use crate::texture::{CanvasTexture, FrameBufferTexture};
use crate::trace::SetupCompletedEvent;

/// A texture that can serve as a color attachment.
#[derive(Clone, Debug)]
pub enum TargetTexture {
    /// An offscreen frame buffer.
    FrameBuffer(FrameBufferTexture),
    /// The presentation surface.
    Canvas(CanvasTexture),
}

impl TargetTexture {
    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        match self {
            Self::FrameBuffer(t) => t.size(),
            Self::Canvas(t) => t.size(),
        }
    }

    /// Texel format.
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        match self {
            Self::FrameBuffer(t) => t.format(),
            Self::Canvas(t) => t.format(),
        }
    }

    fn set_size(&self, size: [u32; 2]) {
        match self {
            Self::FrameBuffer(t) => t.set_size(size),
            Self::Canvas(t) => t.set_size(size),
        }
    }

    fn view_key(&self) -> Result<NativeKey> {
        match self {
            Self::FrameBuffer(t) => Ok(t.native()?.view),
            Self::Canvas(t) => t.native(),
        }
    }
}

impl GpuResource for TargetTexture {
    fn object(&self) -> &GpuObject {
        match self {
            Self::FrameBuffer(t) => t.object(),
            Self::Canvas(t) => t.object(),
        }
    }
}

impl From<FrameBufferTexture> for TargetTexture {
    fn from(texture: FrameBufferTexture) -> Self {
        Self::FrameBuffer(texture)
    }
}

impl From<CanvasTexture> for TargetTexture {
    fn from(texture: CanvasTexture) -> Self {
        Self::Canvas(texture)
    }
}

struct ColorSlot {
    texture: TargetTexture,
    clear: Option<[f64; 4]>,
    listener: ListenerId,
}

struct DepthSlot {
    texture: FrameBufferTexture,
    clear_depth: Option<f32>,
    listener: ListenerId,
}

#[derive(Default)]
struct StagedTargets {
    colors: Vec<(TargetTexture, Option<[f64; 4]>)>,
    depth: Option<(FrameBufferTexture, Option<f32>)>,
}

struct TargetsInner {
    object: GpuObject,
    phase: SetupPhase,
    colors: RefCell<Vec<ColorSlot>>,
    depth: RefCell<Option<DepthSlot>>,
}

impl Drop for TargetsInner {
    fn drop(&mut self) {
        for slot in self.colors.get_mut() {
            slot.texture.object().remove_invalidation_listener(slot.listener);
        }
        if let Some(slot) = self.depth.get_mut() {
            slot.texture.object().remove_invalidation_listener(slot.listener);
        }
    }
}

/// The attachment set a render pass draws into.
///
/// Setup-gated like a bind group layout: attachments are declared inside
/// [`setup`](Self::setup) and frozen afterwards. The set owns no native
/// object of its own; [`resolve`](Self::resolve) reads its attachments'
/// natives on demand, so a canvas attachment picks up the current frame's
/// surface view automatically.
#[derive(Clone)]
pub struct RenderTargets {
    inner: Rc<TargetsInner>,
}

impl core::fmt::Debug for RenderTargets {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderTargets")
            .field("tag", &self.inner.object.tag())
            .field("colors", &self.inner.colors.borrow().len())
            .field("has_depth", &self.inner.depth.borrow().is_some())
            .finish_non_exhaustive()
    }
}

/// The backend-ready form of a [`RenderTargets`], produced by
/// [`RenderTargets::resolve`].
#[derive(Clone, Debug)]
pub struct ResolvedTargets {
    /// Color attachments in declaration order.
    pub color: Vec<ColorAttachment>,
    /// The depth attachment, if declared.
    pub depth: Option<DepthAttachment>,
    /// Common size of all attachments.
    pub size: [u32; 2],
}

impl RenderTargets {
    /// Creates an attachment set with nothing declared yet.
    #[must_use]
    pub fn new(device: &GpuDevice) -> Self {
        Self {
            inner: Rc::new(TargetsInner {
                object: GpuObject::new(device.shared().clone(), ObjectKind::RenderTargets),
                phase: SetupPhase::new(),
                colors: RefCell::new(Vec::new()),
                depth: RefCell::new(None),
            }),
        }
    }

    /// Runs the one-time setup, declaring attachments through the passed
    /// [`RenderTargetsSetup`].
    ///
    /// # Errors
    ///
    /// [`Error::DoubleSetup`] if setup already ran (including implicitly),
    /// [`Error::InvalidConfiguration`] for a non-depth format in the depth
    /// slot, and whatever `f` itself returns. On error the set returns to
    /// its pre-setup state and setup may be retried.
    pub fn setup(&self, f: impl FnOnce(RenderTargetsSetup) -> Result<()>) -> Result<()> {
        let token = self.inner.phase.begin()?;
        let staged = Rc::new(RefCell::new(StagedTargets::default()));
        let setup = RenderTargetsSetup {
            token: token.clone(),
            staged: staged.clone(),
        };
        if let Err(e) = f(setup) {
            self.inner.phase.abort(&token);
            return Err(e);
        }
        if let Err(e) = self.apply(staged.take()) {
            self.inner.phase.abort(&token);
            return Err(e);
        }
        self.inner.phase.complete(&token)?;
        self.inner.object.device().trace(|t| {
            t.setup_completed(&SetupCompletedEvent {
                object: self.inner.object.tag(),
            });
        });
        self.inner.object.invalidate(SETTING);
        Ok(())
    }

    fn apply(&self, staged: StagedTargets) -> Result<()> {
        if let Some((texture, _)) = &staged.depth
            && !texture.format().is_depth()
        {
            return Err(Error::InvalidConfiguration(alloc::format!(
                "depth attachment format {:?} is not a depth format",
                texture.format()
            )));
        }
        let mut colors = Vec::with_capacity(staged.colors.len());
        for (texture, clear) in staged.colors {
            let listener = self.forward_from(texture.object());
            colors.push(ColorSlot {
                texture,
                clear,
                listener,
            });
        }
        *self.inner.colors.borrow_mut() = colors;
        *self.inner.depth.borrow_mut() = staged.depth.map(|(texture, clear_depth)| {
            let listener = self.forward_from(texture.object());
            DepthSlot {
                texture,
                clear_depth,
                listener,
            }
        });
        Ok(())
    }

    fn forward_from(&self, child: &GpuObject) -> ListenerId {
        let weak = Rc::downgrade(&self.inner);
        child.add_invalidation_listener(None, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.object.trigger_auto_update(CHILD_DATA);
            }
        })
    }

    /// Resizes every attachment, typically on a window resize. The change
    /// flows back as a `CHILD_DATA` invalidation of this set.
    ///
    /// # Errors
    ///
    /// The setup gate errors.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.ensure_ready()?;
        for slot in self.inner.colors.borrow().iter() {
            slot.texture.set_size([width, height]);
        }
        if let Some(slot) = self.inner.depth.borrow().as_ref() {
            slot.texture.set_size([width, height]);
        }
        Ok(())
    }

    /// Color attachment formats in declaration order.
    ///
    /// # Errors
    ///
    /// The setup gate errors.
    pub fn color_formats(&self) -> Result<Vec<TextureFormat>> {
        self.ensure_ready()?;
        Ok(self
            .inner
            .colors
            .borrow()
            .iter()
            .map(|slot| slot.texture.format())
            .collect())
    }

    /// The depth attachment format, if one is declared.
    ///
    /// # Errors
    ///
    /// The setup gate errors.
    pub fn depth_format(&self) -> Result<Option<TextureFormat>> {
        self.ensure_ready()?;
        Ok(self
            .inner
            .depth
            .borrow()
            .as_ref()
            .map(|slot| slot.texture.format()))
    }

    /// Reads every attachment's native view and assembles the pass-ready
    /// attachment lists.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] when nothing is attached or the
    /// attachment sizes disagree, plus the setup gate errors and each
    /// attachment's read protocol errors.
    pub fn resolve(&self) -> Result<ResolvedTargets> {
        self.ensure_ready()?;
        let colors = self.inner.colors.borrow();
        let depth = self.inner.depth.borrow();

        let mut size = None;
        for current in colors
            .iter()
            .map(|slot| slot.texture.size())
            .chain(depth.iter().map(|slot| slot.texture.size()))
        {
            match size {
                None => size = Some(current),
                Some(expected) if expected == current => {}
                Some(expected) => {
                    return Err(Error::InvalidConfiguration(alloc::format!(
                        "attachment sizes differ: {expected:?} vs {current:?}"
                    )));
                }
            }
        }
        let Some(size) = size else {
            return Err(Error::InvalidConfiguration(
                "render targets have no attachments".into(),
            ));
        };

        let mut color = Vec::with_capacity(colors.len());
        for slot in colors.iter() {
            color.push(ColorAttachment {
                view: slot.texture.view_key()?,
                clear: slot.clear,
            });
        }
        let depth = match depth.as_ref() {
            Some(slot) => Some(DepthAttachment {
                view: slot.texture.native()?.view,
                clear_depth: slot.clear_depth,
            }),
            None => None,
        };
        self.inner.object.clear_reasons();
        Ok(ResolvedTargets { color, depth, size })
    }

    /// Tears the set down and stops listening on its attachments. The
    /// attachments themselves are left alone. Terminal.
    pub fn deconstruct(&self) {
        for slot in self.inner.colors.borrow().iter() {
            slot.texture.object().remove_invalidation_listener(slot.listener);
        }
        if let Some(slot) = self.inner.depth.borrow().as_ref() {
            slot.texture.object().remove_invalidation_listener(slot.listener);
        }
        self.inner.object.mark_deconstructed();
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.inner.object.is_deconstructed() {
            return Err(Error::UseAfterDeconstruct {
                object: self.inner.object.kind().as_str(),
            });
        }
        let implicit = self
            .inner
            .phase
            .ensure_ready_for_read("render targets are still being set up")?;
        if implicit {
            self.inner.object.device().trace(|t| {
                t.setup_completed(&SetupCompletedEvent {
                    object: self.inner.object.tag(),
                });
            });
        }
        Ok(())
    }
}

impl GpuResource for RenderTargets {
    fn object(&self) -> &GpuObject {
        &self.inner.object
    }
}

/// Declaration surface passed to [`RenderTargets::setup`]. Dead once setup
/// ends.
#[derive(Clone)]
pub struct RenderTargetsSetup {
    token: SetupToken,
    staged: Rc<RefCell<StagedTargets>>,
}

impl core::fmt::Debug for RenderTargetsSetup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderTargetsSetup")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl RenderTargetsSetup {
    /// Appends a color attachment. `clear` of `None` keeps the previous
    /// contents.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSetup`] when called after setup ended.
    pub fn add_color(
        &self,
        texture: impl Into<TargetTexture>,
        clear: Option<[f64; 4]>,
    ) -> Result<()> {
        self.token
            .ensure_in_setup("render targets setup has ended; attachments can no longer be added")?;
        self.staged.borrow_mut().colors.push((texture.into(), clear));
        Ok(())
    }

    /// Sets the depth attachment. The texture format must be a depth
    /// format.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSetup`] when called after setup ended.
    pub fn set_depth(&self, texture: &FrameBufferTexture, clear_depth: Option<f32>) -> Result<()> {
        self.token
            .ensure_in_setup("render targets setup has ended; attachments can no longer be added")?;
        self.staged.borrow_mut().depth = Some((texture.clone(), clear_depth));
        Ok(())
    }
}
