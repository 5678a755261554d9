// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumented in-memory GPU backend for tests and demos.
//!
//! [`CountingBackend`] honors the full [`GpuBackend`] contract without
//! touching a real GPU: creation calls hand out sequential keys, destroy
//! calls retire them, and submitted command streams are captured whole.
//! A [`CountingHandle`] stays usable after the backend is boxed into a
//! [`GpuDevice`](accretion_core::device::GpuDevice) and can script the
//! backend to decline or fail a specific upcoming creation call.

#![no_std]

extern crate alloc;

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use accretion_core::backend::{
    BindGroupDescriptor, BindGroupLayoutDescriptor, BufferDescriptor, CommandStream,
    ComputePipelineDescriptor, FrameViewSource, GpuBackend, NativeKey, PipelineLayoutDescriptor,
    RenderPipelineDescriptor, SamplerDescriptor, TextureDescriptor,
};
use accretion_core::device::GpuDevice;
use accretion_core::error::{Error, Result};

#[derive(Debug, Default)]
struct BackendState {
    next_key: Cell<u64>,
    calls: Cell<u32>,
    created: Cell<u32>,
    destroyed: Cell<u32>,
    submits: Cell<u32>,
    buffer_writes: Cell<u32>,
    image_copies: Cell<u32>,
    decline_call: Cell<Option<u32>>,
    fail_call: Cell<Option<u32>>,
    alive: RefCell<BTreeSet<u64>>,
    streams: RefCell<Vec<CommandStream>>,
}

impl BackendState {
    fn next(&self) -> Result<Option<NativeKey>> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.fail_call.get() == Some(call) {
            self.fail_call.set(None);
            return Err(Error::InvalidOperation("scripted backend failure"));
        }
        if self.decline_call.get() == Some(call) {
            self.decline_call.set(None);
            return Ok(None);
        }
        let key = self.next_key.get() + 1;
        self.next_key.set(key);
        self.created.set(self.created.get() + 1);
        self.alive.borrow_mut().insert(key);
        Ok(Some(NativeKey(key)))
    }
}

/// A [`GpuBackend`] that counts calls and records command streams.
#[derive(Debug, Default)]
pub struct CountingBackend {
    state: Rc<BackendState>,
}

impl CountingBackend {
    /// Creates a backend with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle observing this backend, valid after the backend moves
    /// into a device.
    #[must_use]
    pub fn handle(&self) -> CountingHandle {
        CountingHandle {
            state: self.state.clone(),
        }
    }
}

/// Creates a device driven by a [`CountingBackend`] plus the handle
/// observing it. The usual test fixture.
#[must_use]
pub fn counting_device() -> (GpuDevice, CountingHandle) {
    let backend = CountingBackend::new();
    let handle = backend.handle();
    (GpuDevice::new(Box::new(backend)), handle)
}

/// Observer and script surface for a [`CountingBackend`].
#[derive(Clone, Debug)]
pub struct CountingHandle {
    state: Rc<BackendState>,
}

impl CountingHandle {
    /// Successful creation calls so far.
    #[must_use]
    pub fn created(&self) -> u32 {
        self.state.created.get()
    }

    /// Destroy calls so far.
    #[must_use]
    pub fn destroyed(&self) -> u32 {
        self.state.destroyed.get()
    }

    /// Native objects currently alive.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.state.alive.borrow().len()
    }

    /// Whether a specific key is alive.
    #[must_use]
    pub fn is_alive(&self, key: NativeKey) -> bool {
        self.state.alive.borrow().contains(&key.0)
    }

    /// Streams submitted so far.
    #[must_use]
    pub fn submits(&self) -> u32 {
        self.state.submits.get()
    }

    /// Buffer write calls so far.
    #[must_use]
    pub fn buffer_writes(&self) -> u32 {
        self.state.buffer_writes.get()
    }

    /// Image upload calls so far.
    #[must_use]
    pub fn image_copies(&self) -> u32 {
        self.state.image_copies.get()
    }

    /// Copies of every submitted stream, oldest first.
    #[must_use]
    pub fn streams(&self) -> Vec<CommandStream> {
        self.state.streams.borrow().clone()
    }

    /// The most recently submitted stream, if any.
    #[must_use]
    pub fn last_stream(&self) -> Option<CommandStream> {
        self.state.streams.borrow().last().cloned()
    }

    /// The next creation call returns `Ok(None)`.
    pub fn decline_next(&self) {
        self.decline_call(self.state.calls.get() + 1);
    }

    /// The `call`th creation call (1-based over the backend's whole life)
    /// returns `Ok(None)`.
    pub fn decline_call(&self, call: u32) {
        self.state.decline_call.set(Some(call));
    }

    /// The next creation call fails with a scripted error.
    pub fn fail_next(&self) {
        self.fail_call(self.state.calls.get() + 1);
    }

    /// The `call`th creation call fails with a scripted error.
    pub fn fail_call(&self, call: u32) {
        self.state.fail_call.set(Some(call));
    }
}

impl GpuBackend for CountingBackend {
    fn create_buffer(&mut self, _desc: &BufferDescriptor) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_texture(&mut self, _desc: &TextureDescriptor) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_texture_view(&mut self, _texture: NativeKey) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_sampler(&mut self, _desc: &SamplerDescriptor) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_shader_module(&mut self, _source: &str) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_bind_group_layout(
        &mut self,
        _desc: &BindGroupLayoutDescriptor,
    ) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_bind_group(&mut self, _desc: &BindGroupDescriptor) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_pipeline_layout(
        &mut self,
        _desc: &PipelineLayoutDescriptor,
    ) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_render_pipeline(
        &mut self,
        _desc: &RenderPipelineDescriptor,
    ) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn create_compute_pipeline(
        &mut self,
        _desc: &ComputePipelineDescriptor,
    ) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn acquire_frame_view(&mut self, _source: FrameViewSource) -> Result<Option<NativeKey>> {
        self.state.next()
    }

    fn destroy(&mut self, key: NativeKey) {
        self.state.destroyed.set(self.state.destroyed.get() + 1);
        self.state.alive.borrow_mut().remove(&key.0);
    }

    fn write_buffer(&mut self, _buffer: NativeKey, _offset: u64, _data: &[u8]) -> Result<()> {
        self.state.buffer_writes.set(self.state.buffer_writes.get() + 1);
        Ok(())
    }

    fn read_buffer(&mut self, _buffer: NativeKey, _offset: u64, len: u64) -> Result<Vec<u8>> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "harness reads stay far below usize::MAX"
        )]
        let len = len as usize;
        Ok(vec![0; len])
    }

    fn copy_image_to_texture(
        &mut self,
        _texture: NativeKey,
        _data: &[u8],
        _size: [u32; 3],
    ) -> Result<()> {
        self.state.image_copies.set(self.state.image_copies.get() + 1);
        Ok(())
    }

    fn submit(&mut self, stream: &CommandStream) {
        self.state.submits.set(self.state.submits.get() + 1);
        self.state.streams.borrow_mut().push(stream.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accretion_core::backend::BufferUsage;
    use accretion_core::buffer::GpuBuffer;
    use accretion_core::error::Error;

    #[test]
    fn alive_tracking_follows_create_and_destroy() {
        let (device, handle) = counting_device();
        let buffer = GpuBuffer::new(&device, 64, BufferUsage::UNIFORM);
        let key = buffer.native().unwrap();
        assert!(handle.is_alive(key));
        assert_eq!(handle.alive(), 1);

        buffer.deconstruct();
        assert!(!handle.is_alive(key));
        assert_eq!(handle.alive(), 0);
        assert_eq!(handle.destroyed(), 1);
    }

    #[test]
    fn scripted_calls_hit_the_right_creation() {
        let (device, handle) = counting_device();
        let first = GpuBuffer::new(&device, 16, BufferUsage::UNIFORM);
        let second = GpuBuffer::new(&device, 16, BufferUsage::UNIFORM);

        handle.decline_call(2);
        first.native().unwrap();
        assert!(matches!(
            second.native(),
            Err(Error::GenerationFailed { .. })
        ));

        handle.fail_next();
        assert!(matches!(
            second.native(),
            Err(Error::InvalidOperation(_))
        ));
        second.native().unwrap();
    }
}
