// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pass recording and execution for accretion resources.
//!
//! `accretion_render` sits on top of [`accretion_core`]: passes hold live
//! resource handles, and executing a pass reads each referenced native
//! object through its read protocol, so invalidated resources regenerate
//! exactly when they are next drawn. It defines:
//!
//! - [`RenderPass`] / [`ComputePass`] — ordered step lists addressed by
//!   generational [`StepId`] handles
//! - [`RenderStep`] / [`ComputeStep`] — everything one draw or dispatch
//!   needs
//! - [`ExecutionContext`] — command recording with redundant-binding
//!   elision, producing the stream
//!   [`GpuDevice::submit`](accretion_core::device::GpuDevice::submit)
//!   consumes

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod context;
mod id;
mod pass;
mod step;

pub use context::ExecutionContext;
pub use id::StepId;
pub use pass::{ComputePass, RenderPass};
pub use step::{ComputeStep, DrawCall, RenderStep};
