// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipelines and the layout tying them to their bind groups.
//!
//! A [`PipelineLayout`] orders the bind group layouts a pipeline consumes.
//! It is usually built by [`ShaderModule`](crate::shader::ShaderModule)
//! construction, but groups can later be swapped for structurally
//! compatible replacements without touching the pipelines on top.

mod compute;
mod layout;
mod render;

pub use compute::ComputePipeline;
pub use layout::PipelineLayout;
pub use render::RenderPipeline;
