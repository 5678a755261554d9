// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scriptable in-memory backend for the crate's own tests.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::backend::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BufferDescriptor,
    CommandStream, ComputePipelineDescriptor, FrameViewSource, GpuBackend, NativeKey,
    PipelineLayoutDescriptor, RenderPipelineDescriptor, SamplerDescriptor, TextureDescriptor,
};
use crate::error::{Error, Result};

#[derive(Default)]
struct TestState {
    next_key: Cell<u64>,
    calls: Cell<u32>,
    created: Cell<u32>,
    destroyed: Cell<u32>,
    submits: Cell<u32>,
    buffer_writes: Cell<u32>,
    image_copies: Cell<u32>,
    decline_call: Cell<Option<u32>>,
    fail_call: Cell<Option<u32>>,
    streams: RefCell<Vec<CommandStream>>,
    bind_group_entries: RefCell<Vec<BindGroupEntry>>,
}

impl TestState {
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
        Ok(Some(NativeKey(key)))
    }
}

/// Backend double that hands out sequential keys and counts calls.
pub(crate) struct TestBackend {
    state: Rc<TestState>,
}

impl TestBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(TestState::default()),
        }
    }

    /// A handle that stays valid after the backend is boxed into a device.
    pub(crate) fn handle(&self) -> TestHandle {
        TestHandle {
            state: self.state.clone(),
        }
    }
}

/// Observer and script surface for a [`TestBackend`].
#[derive(Clone)]
pub(crate) struct TestHandle {
    state: Rc<TestState>,
}

impl TestHandle {
    pub(crate) fn created(&self) -> u32 {
        self.state.created.get()
    }

    pub(crate) fn destroyed(&self) -> u32 {
        self.state.destroyed.get()
    }

    pub(crate) fn submits(&self) -> u32 {
        self.state.submits.get()
    }

    pub(crate) fn buffer_writes(&self) -> u32 {
        self.state.buffer_writes.get()
    }

    pub(crate) fn image_copies(&self) -> u32 {
        self.state.image_copies.get()
    }

    /// The next creation call returns `Ok(None)`.
    pub(crate) fn decline_next(&self) {
        self.decline_call(self.state.calls.get() + 1);
    }

    /// The `call`th creation call (1-based, counting from backend start)
    /// returns `Ok(None)`.
    pub(crate) fn decline_call(&self, call: u32) {
        self.state.decline_call.set(Some(call));
    }

    /// The next creation call returns an error.
    pub(crate) fn fail_next(&self) {
        self.state.fail_call.set(Some(self.state.calls.get() + 1));
    }

    pub(crate) fn streams(&self) -> Vec<CommandStream> {
        self.state.streams.borrow().clone()
    }

    /// Entries of the most recently requested bind group.
    pub(crate) fn last_bind_group_entries(&self) -> Vec<BindGroupEntry> {
        self.state.bind_group_entries.borrow().clone()
    }
}

impl GpuBackend for TestBackend {
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

    fn create_bind_group(&mut self, desc: &BindGroupDescriptor) -> Result<Option<NativeKey>> {
        *self.state.bind_group_entries.borrow_mut() = desc.entries.clone();
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

    fn destroy(&mut self, _key: NativeKey) {
        self.state.destroyed.set(self.state.destroyed.get() + 1);
    }

    fn write_buffer(&mut self, _buffer: NativeKey, _offset: u64, _data: &[u8]) -> Result<()> {
        self.state.buffer_writes.set(self.state.buffer_writes.get() + 1);
        Ok(())
    }

    fn read_buffer(&mut self, _buffer: NativeKey, _offset: u64, len: u64) -> Result<Vec<u8>> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tests never read buffers anywhere near usize::MAX"
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
