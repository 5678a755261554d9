// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Lifecycle
//! events carry no timestamps; lines appear in emission order.

use std::io::Write;

use accretion_core::trace::{
    DeconstructedEvent, FrameStartedEvent, InvalidatedEvent, NativeDestroyedEvent,
    NativeGeneratedEvent, SetupCompletedEvent, StreamSubmittedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_started(&mut self, e: &FrameStartedEvent) {
        let _ = writeln!(self.writer, "[frame] index={}", e.frame_index);
    }

    fn on_native_generated(&mut self, e: &NativeGeneratedEvent) {
        let _ = writeln!(
            self.writer,
            "[generate] {:?} key={} frame={}",
            e.object, e.key.0, e.frame_index,
        );
    }

    fn on_native_destroyed(&mut self, e: &NativeDestroyedEvent) {
        let _ = writeln!(
            self.writer,
            "[destroy] {:?} key={} reasons={:?}",
            e.object, e.key.0, e.reasons,
        );
    }

    fn on_setup_completed(&mut self, e: &SetupCompletedEvent) {
        let _ = writeln!(self.writer, "[setup] {:?}", e.object);
    }

    fn on_deconstructed(&mut self, e: &DeconstructedEvent) {
        let _ = writeln!(self.writer, "[deconstruct] {:?}", e.object);
    }

    fn on_stream_submitted(&mut self, e: &StreamSubmittedEvent) {
        let _ = writeln!(
            self.writer,
            "[submit] frame={} commands={} elided={}",
            e.frame_index, e.commands, e.elided,
        );
    }

    fn on_invalidated(&mut self, e: &InvalidatedEvent) {
        let _ = writeln!(
            self.writer,
            "[invalidate] {:?} reason={:?}",
            e.object, e.reason,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accretion_core::backend::NativeKey;
    use accretion_core::object::{ObjectKind, ObjectTag};
    use accretion_core::reason::{DATA, DECONSTRUCT, ReasonMask};

    #[test]
    fn pretty_print_generate() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_native_generated(&NativeGeneratedEvent {
            object: ObjectTag {
                kind: ObjectKind::Buffer,
                id: 0,
            },
            key: NativeKey(5),
            frame_index: 3,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[generate]"), "got: {output}");
        assert!(output.contains("buffer#0"), "got: {output}");
        assert!(output.contains("key=5"), "got: {output}");
    }

    #[test]
    fn pretty_print_destroy_names_reasons() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_native_destroyed(&NativeDestroyedEvent {
            object: ObjectTag {
                kind: ObjectKind::RenderPipeline,
                id: 2,
            },
            key: NativeKey(8),
            reasons: ReasonMask::only(DATA).with(DECONSTRUCT),
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[destroy]"), "got: {output}");
        assert!(output.contains("DATA"), "got: {output}");
        assert!(output.contains("DECONSTRUCT"), "got: {output}");
    }

    #[test]
    fn pretty_print_frame_and_submit() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_started(&FrameStartedEvent { frame_index: 4 });
        sink.on_stream_submitted(&StreamSubmittedEvent {
            frame_index: 4,
            commands: 11,
            elided: 2,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[frame] index=4"), "got: {output}");
        assert!(
            output.contains("[submit] frame=4 commands=11 elided=2"),
            "got: {output}"
        );
    }
}
