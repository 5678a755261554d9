// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Lifecycle events carry no wall-clock time, so each event's ordinal
//! position in the recording becomes its microsecond timestamp; the viewer
//! shows emission order rather than real durations.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for (ts, recorded) in decode(bytes).enumerate() {
        match recorded {
            RecordedEvent::FrameStarted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameStarted",
                    "cat": "Frame",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::NativeGenerated(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "NativeGenerated",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.object.id,
                    "s": "t",
                    "args": {
                        "object": format!("{:?}", e.object),
                        "key": e.key.0,
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::NativeDestroyed(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "NativeDestroyed",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.object.id,
                    "s": "t",
                    "args": {
                        "object": format!("{:?}", e.object),
                        "key": e.key.0,
                        "reasons": format!("{:?}", e.reasons),
                    }
                }));
            }
            RecordedEvent::SetupCompleted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "SetupCompleted",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.object.id,
                    "s": "t",
                    "args": {
                        "object": format!("{:?}", e.object),
                    }
                }));
            }
            RecordedEvent::Deconstructed(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Deconstructed",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.object.id,
                    "s": "t",
                    "args": {
                        "object": format!("{:?}", e.object),
                    }
                }));
            }
            RecordedEvent::StreamSubmitted(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "StreamSubmitted",
                    "cat": "Frame",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "commands": e.commands,
                        "elided": e.elided,
                    }
                }));
            }
            RecordedEvent::Invalidated(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Invalidated",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.object.id,
                    "s": "p",
                    "args": {
                        "object": format!("{:?}", e.object),
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
