// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the object lifecycle.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! lifecycle machinery calls as native objects are generated, destroyed, and
//! invalidated. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional boxed sink owned by the device. When the
//! `trace` feature is **off**, every `Tracer` method compiles to nothing
//! (zero overhead). When **on**, each method performs a single `Option`
//! branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`InvalidatedEvent`] and the
//!   corresponding `TraceSink` method. Invalidation is by far the
//!   highest-frequency event, so it lives behind its own gate.

#[cfg(feature = "trace")]
use alloc::boxed::Box;

use crate::backend::NativeKey;
use crate::object::ObjectTag;
#[cfg(feature = "trace-rich")]
use crate::reason::Reason;
use crate::reason::ReasonMask;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the external frame counter advances.
#[derive(Clone, Copy, Debug)]
pub struct FrameStartedEvent {
    /// The new frame index.
    pub frame_index: u64,
}

/// Emitted when a cache read produced a fresh native object.
#[derive(Clone, Copy, Debug)]
pub struct NativeGeneratedEvent {
    /// The owning object.
    pub object: ObjectTag,
    /// The new native key.
    pub key: NativeKey,
    /// Frame index at generation time.
    pub frame_index: u64,
}

/// Emitted when a cached native object was handed to its destroy hook.
#[derive(Clone, Copy, Debug)]
pub struct NativeDestroyedEvent {
    /// The owning object.
    pub object: ObjectTag,
    /// The key that was destroyed.
    pub key: NativeKey,
    /// The accumulated reasons that forced the destruction.
    pub reasons: ReasonMask,
}

/// Emitted when an object's setup phase completes.
#[derive(Clone, Copy, Debug)]
pub struct SetupCompletedEvent {
    /// The object that became ready.
    pub object: ObjectTag,
}

/// Emitted when an object is deconstructed.
#[derive(Clone, Copy, Debug)]
pub struct DeconstructedEvent {
    /// The object that was torn down.
    pub object: ObjectTag,
}

/// Emitted when a command stream is submitted to the backend.
#[derive(Clone, Copy, Debug)]
pub struct StreamSubmittedEvent {
    /// Frame index at submission time.
    pub frame_index: u64,
    /// Number of commands in the stream.
    pub commands: u32,
    /// Number of redundant bindings elided during recording.
    pub elided: u32,
}

/// Emitted on every invalidation (requires `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct InvalidatedEvent {
    /// The object that was invalidated.
    pub object: ObjectTag,
    /// The recorded reason.
    pub reason: Reason,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the lifecycle machinery.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when the frame counter advances.
    fn on_frame_started(&mut self, e: &FrameStartedEvent) {
        _ = e;
    }

    /// Called when a generate hook produced a native object.
    fn on_native_generated(&mut self, e: &NativeGeneratedEvent) {
        _ = e;
    }

    /// Called when a cached native object was destroyed.
    fn on_native_destroyed(&mut self, e: &NativeDestroyedEvent) {
        _ = e;
    }

    /// Called when an object's setup phase completes.
    fn on_setup_completed(&mut self, e: &SetupCompletedEvent) {
        _ = e;
    }

    /// Called when an object is deconstructed.
    fn on_deconstructed(&mut self, e: &DeconstructedEvent) {
        _ = e;
    }

    /// Called when a command stream is submitted.
    fn on_stream_submitted(&mut self, e: &StreamSubmittedEvent) {
        _ = e;
    }

    /// Called on every invalidation (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_invalidated(&mut self, e: &InvalidatedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional owned [`TraceSink`].
///
/// The device holds one of these for its whole lifetime, so unlike a
/// per-call tracer it owns its sink. When the `trace` feature is **off**,
/// every method compiles to nothing. When **on**, each method checks the
/// inner `Option` (one branch) before dispatching to the sink.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Creates a tracer that dispatches to the given sink.
    #[cfg(feature = "trace")]
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Replaces the sink. `None` silences the tracer.
    #[cfg(feature = "trace")]
    #[inline]
    pub fn set_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.sink = sink;
    }

    /// Emits a [`FrameStartedEvent`].
    #[inline]
    pub fn frame_started(&mut self, e: &FrameStartedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_started(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`NativeGeneratedEvent`].
    #[inline]
    pub fn native_generated(&mut self, e: &NativeGeneratedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_native_generated(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`NativeDestroyedEvent`].
    #[inline]
    pub fn native_destroyed(&mut self, e: &NativeDestroyedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_native_destroyed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SetupCompletedEvent`].
    #[inline]
    pub fn setup_completed(&mut self, e: &SetupCompletedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_setup_completed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DeconstructedEvent`].
    #[inline]
    pub fn deconstructed(&mut self, e: &DeconstructedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_deconstructed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StreamSubmittedEvent`].
    #[inline]
    pub fn stream_submitted(&mut self, e: &StreamSubmittedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stream_submitted(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`InvalidatedEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn invalidated(&mut self, e: &InvalidatedEvent) {
        if let Some(s) = &mut self.sink {
            s.on_invalidated(e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
