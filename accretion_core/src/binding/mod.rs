// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bind group layouts, bind groups, and the structural layout registry.
//!
//! A [`BindGroupLayout`] declares *named, indexed slots* with a memory
//! layout, visibility, and access mode each. It is configured once through
//! a setup callback, then sealed; reading it before any setup performs an
//! implicit empty setup. From the sealed slots it derives a deterministic
//! **structural identifier** — two layouts describing the same binding
//! structure produce the same string, regardless of creation order or
//! object identity.
//!
//! The per-device [`LayoutRegistry`] maps identifiers to canonical layout
//! objects, so independently constructed shaders that declare the same
//! group structure share one native layout (and bind groups made for one
//! are valid for the other).
//!
//! A [`BindGroup`] pairs a layout with concrete [`BindData`] attached by
//! binding name. It listens on its layout and on each attached resource,
//! so a change anywhere below regenerates its native object on the next
//! read. Reading a group that is missing data for a declared binding fails
//! with [`Error::NotFound`]: `data for binding `frame` is not set`.
//!
//! [`Error::NotFound`]: crate::error::Error::NotFound

mod data;
mod group;
mod layout;
mod registry;

pub use data::BindData;
pub use group::BindGroup;
pub use layout::{BindGroupLayout, BindGroupLayoutSetup};
pub use registry::LayoutRegistry;

pub(crate) use layout::BindingSlot;
