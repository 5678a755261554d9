// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared across the crate.
//!
//! Every fallible operation returns [`Result`]. Errors are raised at the
//! point of detection and propagate synchronously up the call stack; nothing
//! in this crate panics on caller mistakes that the contract declares
//! recoverable (stale data, misuse of the setup phase, failed native
//! generation).

use alloc::string::String;

use thiserror::Error;

/// Alias for `core::result::Result` with the crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported by lifecycle, graph, and recording operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A named thing (binding, entry point, group) does not exist where it
    /// was looked up.
    #[error("{what} `{name}` is not set")]
    NotFound {
        /// Noun phrase for the missing thing, e.g. `"data for binding"`.
        what: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// An object's declared configuration is contradictory or incomplete.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The object was deconstructed; it can never produce a native object
    /// again.
    #[error("{object} was deconstructed and can no longer be used")]
    UseAfterDeconstruct {
        /// Kind name of the deconstructed object.
        object: &'static str,
    },

    /// `setup` was called after the setup phase already completed.
    #[error("setup was already completed")]
    DoubleSetup,

    /// A setup-phase operation ran outside the setup phase, or a
    /// setup-derived property was read before setup completed.
    #[error("{0}")]
    NotInSetup(&'static str),

    /// The backend declined to produce a native object. The cache stays
    /// empty, so the same read can be retried.
    #[error("the backend produced no native object for {object}")]
    GenerationFailed {
        /// Kind name of the object whose generation failed.
        object: &'static str,
    },

    /// A bind group layout replacement is not structurally compatible with
    /// the layout it would replace.
    #[error("bind group layout replacement is incompatible: {0}")]
    ReplacementIncompatible(String),

    /// An operation contradicts a monotonic state, e.g. reverting the
    /// deconstruct flag.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn not_found_mentions_the_name() {
        let err = Error::NotFound {
            what: "data for binding",
            name: "frame".to_string(),
        };
        assert_eq!(err.to_string(), "data for binding `frame` is not set");
    }

    #[test]
    fn use_after_deconstruct_names_the_object() {
        let err = Error::UseAfterDeconstruct {
            object: "render pipeline",
        };
        assert!(err.to_string().contains("render pipeline"), "got: {err}");
    }
}
