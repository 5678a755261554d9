// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native-object lifecycle and invalidation graph for GPU rendering.
//!
//! `accretion_core` wraps backend GPU objects (buffers, textures, bind
//! groups, pipelines) in handles that know when their native counterpart
//! is stale. Objects form a dependency graph through invalidation
//! listeners; a change anywhere below propagates upward synchronously, and
//! native objects regenerate lazily on the next read. The crate is
//! `no_std` compatible (with `alloc`) and single-threaded: all handles are
//! `Rc`-based and a device and everything created from it stay on one
//! thread.
//!
//! # Architecture
//!
//! Every resource follows the same lifecycle around its cached native
//! object:
//!
//! ```text
//!   set_x() ──► invalidate(reason) ──► listeners fire ──► parents record
//!                      │                                   CHILD_DATA
//!                      ▼
//!               ReasonSet (pending)
//!                      │
//!   native() ──► read protocol: lifetime check ──► destroy stale
//!                      │                                │
//!                      ▼                                ▼
//!               cached? return it          generate() ──► cache + clear
//! ```
//!
//! **[`object`]** — [`GpuObject`](object::GpuObject) identity, the pending
//! [`ReasonSet`](reason::ReasonSet), and ordered invalidation listeners.
//!
//! **[`reason`]** — Invalidation reasons as bit indices, with the reserved
//! lifetime and deconstruct bits.
//!
//! **[`cache`]** — [`NativeCell`](cache::NativeCell) and the read protocol
//! that regenerates native objects, with per-resource lifetimes.
//!
//! **[`setup`]** — The one-time setup gate used by bind group layouts and
//! render targets, including implicit sealing on first read.
//!
//! **[`device`]** — [`GpuDevice`](device::GpuDevice): backend ownership,
//! the frame counter, and the layout registry.
//!
//! **[`binding`]** — Bind group layouts with structural identifiers,
//! per-device deduplication, and bind groups that resolve named data.
//!
//! **[`memory`]** — Memory layout descriptions bindings are declared
//! against.
//!
//! **[`buffer`]**, **[`texture`]** — Concrete resources, including the
//! frame-scoped canvas surface and single-read video textures.
//!
//! **[`shader`]**, **[`pipeline`]** — Reflection-driven shader modules and
//! the pipelines compiled from them.
//!
//! **[`backend`]** — The [`GpuBackend`](backend::GpuBackend) trait and the
//! descriptor types handed across it.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for lifecycle instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-object
//!   invalidation events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod binding;
pub mod buffer;
pub mod cache;
pub mod device;
pub mod error;
pub mod memory;
pub mod object;
pub mod pipeline;
pub mod reason;
pub mod setup;
pub mod shader;
pub mod texture;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;
