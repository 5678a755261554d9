// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! shared byte buffer as fixed-size little-endian records. [`decode`] reads
//! them back as an iterator of [`RecordedEvent`]; [`replay`] re-dispatches
//! a recording into any other sink.
//!
//! The device owns its sink, so the recorder hands out a [`RecorderHandle`]
//! up front: the handle shares the buffer and stays usable after the sink
//! is boxed into a [`GpuDevice`](accretion_core::device::GpuDevice).

use std::cell::RefCell;
use std::rc::Rc;

use accretion_core::backend::NativeKey;
use accretion_core::object::{ObjectKind, ObjectTag};
use accretion_core::reason::{DECONSTRUCT, LIFE_TIME, Reason, ReasonMask};
use accretion_core::trace::{
    DeconstructedEvent, FrameStartedEvent, InvalidatedEvent, NativeDestroyedEvent,
    NativeGeneratedEvent, SetupCompletedEvent, StreamSubmittedEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_STARTED: u8 = 1;
const TAG_NATIVE_GENERATED: u8 = 2;
const TAG_NATIVE_DESTROYED: u8 = 3;
const TAG_SETUP_COMPLETED: u8 = 4;
const TAG_DECONSTRUCTED: u8 = 5;
const TAG_STREAM_SUBMITTED: u8 = 6;
const TAG_INVALIDATED: u8 = 7;

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn kind_code(kind: ObjectKind) -> u8 {
    match kind {
        ObjectKind::Buffer => 0,
        ObjectKind::ImageTexture => 1,
        ObjectKind::FrameBufferTexture => 2,
        ObjectKind::VideoTexture => 3,
        ObjectKind::CanvasTexture => 4,
        ObjectKind::Sampler => 5,
        ObjectKind::BufferLayout => 6,
        ObjectKind::TextureLayout => 7,
        ObjectKind::SamplerLayout => 8,
        ObjectKind::BindGroupLayout => 9,
        ObjectKind::BindGroup => 10,
        ObjectKind::Shader => 11,
        ObjectKind::PipelineLayout => 12,
        ObjectKind::RenderPipeline => 13,
        ObjectKind::ComputePipeline => 14,
        ObjectKind::RenderTargets => 15,
    }
}

fn kind_from_code(code: u8) -> Option<ObjectKind> {
    Some(match code {
        0 => ObjectKind::Buffer,
        1 => ObjectKind::ImageTexture,
        2 => ObjectKind::FrameBufferTexture,
        3 => ObjectKind::VideoTexture,
        4 => ObjectKind::CanvasTexture,
        5 => ObjectKind::Sampler,
        6 => ObjectKind::BufferLayout,
        7 => ObjectKind::TextureLayout,
        8 => ObjectKind::SamplerLayout,
        9 => ObjectKind::BindGroupLayout,
        10 => ObjectKind::BindGroup,
        11 => ObjectKind::Shader,
        12 => ObjectKind::PipelineLayout,
        13 => ObjectKind::RenderPipeline,
        14 => ObjectKind::ComputePipeline,
        15 => ObjectKind::RenderTargets,
        _ => return None,
    })
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_object(buf: &mut Vec<u8>, tag: ObjectTag) {
    buf.push(kind_code(tag.kind));
    write_u64(buf, tag.id);
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle observing the recording, valid after the sink moves into a
    /// device.
    #[must_use]
    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle {
            buf: self.buf.clone(),
        }
    }
}

/// Shared view of a [`RecorderSink`]'s buffer.
#[derive(Clone, Debug)]
pub struct RecorderHandle {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl RecorderHandle {
    /// Snapshot of the recorded bytes.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.buf.borrow().clone()
    }

    /// Number of recorded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.borrow().len()
    }

    /// Returns `true` if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.borrow().is_empty()
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_started(&mut self, e: &FrameStartedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_FRAME_STARTED);
        write_u64(&mut buf, e.frame_index);
    }

    fn on_native_generated(&mut self, e: &NativeGeneratedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_NATIVE_GENERATED);
        write_object(&mut buf, e.object);
        write_u64(&mut buf, e.key.0);
        write_u64(&mut buf, e.frame_index);
    }

    fn on_native_destroyed(&mut self, e: &NativeDestroyedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_NATIVE_DESTROYED);
        write_object(&mut buf, e.object);
        write_u64(&mut buf, e.key.0);
        write_u64(&mut buf, e.reasons.bits());
    }

    fn on_setup_completed(&mut self, e: &SetupCompletedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_SETUP_COMPLETED);
        write_object(&mut buf, e.object);
    }

    fn on_deconstructed(&mut self, e: &DeconstructedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_DECONSTRUCTED);
        write_object(&mut buf, e.object);
    }

    fn on_stream_submitted(&mut self, e: &StreamSubmittedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_STREAM_SUBMITTED);
        write_u64(&mut buf, e.frame_index);
        write_u32(&mut buf, e.commands);
        write_u32(&mut buf, e.elided);
    }

    fn on_invalidated(&mut self, e: &InvalidatedEvent) {
        let mut buf = self.buf.borrow_mut();
        buf.push(TAG_INVALIDATED);
        write_object(&mut buf, e.object);
        buf.push(e.reason.index());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`FrameStartedEvent`].
    FrameStarted(FrameStartedEvent),
    /// A [`NativeGeneratedEvent`].
    NativeGenerated(NativeGeneratedEvent),
    /// A [`NativeDestroyedEvent`].
    NativeDestroyed(NativeDestroyedEvent),
    /// A [`SetupCompletedEvent`].
    SetupCompleted(SetupCompletedEvent),
    /// A [`DeconstructedEvent`].
    Deconstructed(DeconstructedEvent),
    /// A [`StreamSubmittedEvent`].
    StreamSubmitted(StreamSubmittedEvent),
    /// An [`InvalidatedEvent`].
    Invalidated(InvalidatedEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Re-dispatches a recording into another sink, in recorded order.
///
/// This is the playback half of the recorder: capture a session with a
/// device-installed [`RecorderSink`], then replay the bytes through a
/// [`PrettyPrintSink`](crate::pretty::PrettyPrintSink) or any custom sink.
pub fn replay(bytes: &[u8], sink: &mut dyn TraceSink) {
    for event in decode(bytes) {
        match event {
            RecordedEvent::FrameStarted(e) => sink.on_frame_started(&e),
            RecordedEvent::NativeGenerated(e) => sink.on_native_generated(&e),
            RecordedEvent::NativeDestroyed(e) => sink.on_native_destroyed(&e),
            RecordedEvent::SetupCompleted(e) => sink.on_setup_completed(&e),
            RecordedEvent::Deconstructed(e) => sink.on_deconstructed(&e),
            RecordedEvent::StreamSubmitted(e) => sink.on_stream_submitted(&e),
            RecordedEvent::Invalidated(e) => sink.on_invalidated(&e),
        }
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_object(&mut self) -> Option<ObjectTag> {
        let kind = kind_from_code(self.read_u8()?)?;
        let id = self.read_u64()?;
        Some(ObjectTag { kind, id })
    }

    fn read_reason(&mut self) -> Option<Reason> {
        // `Reason::new` rejects the reserved indices, so map those first
        // and refuse anything out of range instead of panicking on
        // corrupted input.
        match self.read_u8()? {
            n if n < 62 => Some(Reason::new(n)),
            62 => Some(LIFE_TIME),
            63 => Some(DECONSTRUCT),
            _ => None,
        }
    }

    fn decode_frame_started(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameStarted(FrameStartedEvent {
            frame_index: self.read_u64()?,
        }))
    }

    fn decode_native_generated(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::NativeGenerated(NativeGeneratedEvent {
            object: self.read_object()?,
            key: NativeKey(self.read_u64()?),
            frame_index: self.read_u64()?,
        }))
    }

    fn decode_native_destroyed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::NativeDestroyed(NativeDestroyedEvent {
            object: self.read_object()?,
            key: NativeKey(self.read_u64()?),
            reasons: ReasonMask::from_bits(self.read_u64()?),
        }))
    }

    fn decode_setup_completed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SetupCompleted(SetupCompletedEvent {
            object: self.read_object()?,
        }))
    }

    fn decode_deconstructed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Deconstructed(DeconstructedEvent {
            object: self.read_object()?,
        }))
    }

    fn decode_stream_submitted(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StreamSubmitted(StreamSubmittedEvent {
            frame_index: self.read_u64()?,
            commands: self.read_u32()?,
            elided: self.read_u32()?,
        }))
    }

    fn decode_invalidated(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Invalidated(InvalidatedEvent {
            object: self.read_object()?,
            reason: self.read_reason()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_STARTED => self.decode_frame_started(),
            TAG_NATIVE_GENERATED => self.decode_native_generated(),
            TAG_NATIVE_DESTROYED => self.decode_native_destroyed(),
            TAG_SETUP_COMPLETED => self.decode_setup_completed(),
            TAG_DECONSTRUCTED => self.decode_deconstructed(),
            TAG_STREAM_SUBMITTED => self.decode_stream_submitted(),
            TAG_INVALIDATED => self.decode_invalidated(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use accretion_core::reason::{CHILD_DATA, DATA, SETTING};

    fn tag(kind: ObjectKind, id: u64) -> ObjectTag {
        ObjectTag { kind, id }
    }

    fn sample_generated() -> NativeGeneratedEvent {
        NativeGeneratedEvent {
            object: tag(ObjectKind::Buffer, 3),
            key: NativeKey(17),
            frame_index: 2,
        }
    }

    fn sample_destroyed() -> NativeDestroyedEvent {
        NativeDestroyedEvent {
            object: tag(ObjectKind::RenderPipeline, 9),
            key: NativeKey(41),
            reasons: ReasonMask::only(DATA).with(CHILD_DATA),
        }
    }

    #[test]
    fn round_trip_frame_started() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_frame_started(&FrameStartedEvent { frame_index: 7 });

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::FrameStarted(e) => assert_eq!(e.frame_index, 7),
            other => panic!("expected FrameStarted, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_native_generated() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        let orig = sample_generated();
        rec.on_native_generated(&orig);

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::NativeGenerated(e) => {
                assert_eq!(e.object, orig.object);
                assert_eq!(e.key, orig.key);
                assert_eq!(e.frame_index, orig.frame_index);
            }
            other => panic!("expected NativeGenerated, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_native_destroyed_keeps_reasons() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        let orig = sample_destroyed();
        rec.on_native_destroyed(&orig);

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::NativeDestroyed(e) => {
                assert_eq!(e.object, orig.object);
                assert_eq!(e.key, orig.key);
                assert!(e.reasons.contains(DATA));
                assert!(e.reasons.contains(CHILD_DATA));
                assert!(!e.reasons.contains(SETTING));
            }
            other => panic!("expected NativeDestroyed, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_setup_and_deconstruct() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_setup_completed(&SetupCompletedEvent {
            object: tag(ObjectKind::RenderTargets, 4),
        });
        rec.on_deconstructed(&DeconstructedEvent {
            object: tag(ObjectKind::CanvasTexture, 5),
        });

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::SetupCompleted(e) => {
                assert_eq!(e.object, tag(ObjectKind::RenderTargets, 4));
            }
            other => panic!("expected SetupCompleted, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Deconstructed(e) => {
                assert_eq!(e.object, tag(ObjectKind::CanvasTexture, 5));
            }
            other => panic!("expected Deconstructed, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_stream_submitted() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_stream_submitted(&StreamSubmittedEvent {
            frame_index: 12,
            commands: 40,
            elided: 9,
        });

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::StreamSubmitted(e) => {
                assert_eq!(e.frame_index, 12);
                assert_eq!(e.commands, 40);
                assert_eq!(e.elided, 9);
            }
            other => panic!("expected StreamSubmitted, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_invalidated_reserved_reason() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_invalidated(&InvalidatedEvent {
            object: tag(ObjectKind::CanvasTexture, 2),
            reason: LIFE_TIME,
        });
        rec.on_invalidated(&InvalidatedEvent {
            object: tag(ObjectKind::CanvasTexture, 2),
            reason: SETTING,
        });

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::Invalidated(e) => assert_eq!(e.reason, LIFE_TIME),
            other => panic!("expected Invalidated, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Invalidated(e) => assert_eq!(e.reason, SETTING),
            other => panic!("expected Invalidated, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_multiple_events() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_frame_started(&FrameStartedEvent { frame_index: 1 });
        rec.on_native_generated(&sample_generated());
        rec.on_native_destroyed(&sample_destroyed());
        rec.on_stream_submitted(&StreamSubmittedEvent {
            frame_index: 1,
            commands: 6,
            elided: 0,
        });

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], RecordedEvent::FrameStarted(_)));
        assert!(matches!(events[1], RecordedEvent::NativeGenerated(_)));
        assert!(matches!(events[2], RecordedEvent::NativeDestroyed(_)));
        assert!(matches!(events[3], RecordedEvent::StreamSubmitted(_)));
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_stops_cleanly() {
        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_native_generated(&sample_generated());
        rec.on_native_generated(&sample_generated());

        let bytes = handle.bytes();
        // Cut into the middle of the second record.
        let events: Vec<_> = decode(&bytes[..bytes.len() - 5]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn unknown_tag_stops_iteration() {
        let events: Vec<_> = decode(&[0xFF, 1, 2, 3]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn replay_dispatches_every_event() {
        #[derive(Default)]
        struct Counting {
            frames: u32,
            generated: u32,
            destroyed: u32,
            invalidated: u32,
        }
        impl TraceSink for Counting {
            fn on_frame_started(&mut self, _: &FrameStartedEvent) {
                self.frames += 1;
            }
            fn on_native_generated(&mut self, _: &NativeGeneratedEvent) {
                self.generated += 1;
            }
            fn on_native_destroyed(&mut self, _: &NativeDestroyedEvent) {
                self.destroyed += 1;
            }
            fn on_invalidated(&mut self, _: &InvalidatedEvent) {
                self.invalidated += 1;
            }
        }

        let mut rec = RecorderSink::new();
        let handle = rec.handle();
        rec.on_frame_started(&FrameStartedEvent { frame_index: 0 });
        rec.on_native_generated(&sample_generated());
        rec.on_native_destroyed(&sample_destroyed());
        rec.on_invalidated(&InvalidatedEvent {
            object: tag(ObjectKind::Buffer, 3),
            reason: DATA,
        });

        let mut sink = Counting::default();
        replay(&handle.bytes(), &mut sink);
        assert_eq!(sink.frames, 1);
        assert_eq!(sink.generated, 1);
        assert_eq!(sink.destroyed, 1);
        assert_eq!(sink.invalidated, 1);
    }

    #[test]
    fn device_installed_recorder_captures_the_lifecycle() {
        use accretion_core::backend::BufferUsage;
        use accretion_core::buffer::GpuBuffer;
        use accretion_harness::counting_device;

        let (device, _backend) = counting_device();
        let rec = RecorderSink::new();
        let handle = rec.handle();
        device.set_trace_sink(Some(Box::new(rec)));

        let buffer = GpuBuffer::new(&device, 64, BufferUsage::UNIFORM);
        let key = buffer.native().unwrap();
        device.start_new_frame();
        buffer.deconstruct();

        let events: Vec<_> = decode(&handle.bytes()).collect();
        assert_eq!(events.len(), 4, "generate, frame, deconstruct, destroy");
        assert!(matches!(
            &events[0],
            RecordedEvent::NativeGenerated(e) if e.key == key
        ));
        assert!(matches!(
            &events[1],
            RecordedEvent::FrameStarted(e) if e.frame_index == 1
        ));
        assert!(matches!(&events[2], RecordedEvent::Deconstructed(_)));
        assert!(matches!(
            &events[3],
            RecordedEvent::NativeDestroyed(e) if e.reasons.contains(DECONSTRUCT)
        ));
    }
}
