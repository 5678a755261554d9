// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The native-object cache and its read protocol.
//!
//! Every resource wrapper owns a [`NativeCell`] holding its backend object,
//! regenerated lazily through [`NativeCell::read`]. A read walks a fixed
//! sequence:
//!
//! 1. Reject reads on deconstructed objects.
//! 2. Apply the [`CacheLifetime`] policy: a [`Single`] cell expires its
//!    cached value on every read, a [`Frame`] cell expires it when the
//!    device frame counter moved since generation. Expiry is an ordinary
//!    [`LIFE_TIME`] invalidation, so dependents hear about it.
//! 3. If a value is cached and any reason is pending, hand the value to the
//!    destroy hook together with the accumulated [`ReasonSet`]. The hook
//!    cannot fail.
//! 4. If no value is cached (fresh cell, or just destroyed), run the
//!    generate hook. An `Err` propagates and an `Ok(None)` becomes
//!    [`Error::GenerationFailed`]; either way the cell stays empty and the
//!    reasons stay pending, so the next read retries from step 3 onward.
//! 5. On success, record the generation frame, clear the reasons, and
//!    return the cached value.
//!
//! Reads are therefore idempotent while nothing is invalidated: a second
//! read in the same state runs no hooks at all.
//!
//! [`Single`]: CacheLifetime::Single
//! [`Frame`]: CacheLifetime::Frame
//! [`LIFE_TIME`]: crate::reason::LIFE_TIME

use core::cell::Cell;

use crate::backend::NativeKey;
use crate::error::{Error, Result};
use crate::object::GpuObject;
use crate::reason::{LIFE_TIME, ReasonSet};
use crate::trace::{NativeDestroyedEvent, NativeGeneratedEvent};

/// How long a cached native object stays valid on its own.
///
/// Invalidation reasons expire a value regardless of lifetime; the lifetime
/// only adds a time-based bound on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLifetime {
    /// Valid until invalidated.
    Persistent,
    /// Valid for the frame it was generated in.
    Frame,
    /// Valid for a single read.
    Single,
}

/// A value a [`NativeCell`] can hold.
///
/// The cache is generic over the cached shape so a wrapper can keep more
/// than one backend key per native object (a texture keeps the texture and
/// its view). [`native_key`](Self::native_key) picks the primary key
/// reported in trace events.
pub trait NativeValue: Copy {
    /// The primary backend key of this value.
    fn native_key(self) -> NativeKey;
}

impl NativeValue for NativeKey {
    fn native_key(self) -> NativeKey {
        self
    }
}

/// Lazily regenerated storage for one native object.
#[derive(Debug)]
pub struct NativeCell<T: NativeValue> {
    lifetime: CacheLifetime,
    value: Cell<Option<T>>,
    generated_frame: Cell<u64>,
}

impl<T: NativeValue> NativeCell<T> {
    /// Creates an empty cell with the given lifetime.
    #[must_use]
    pub const fn new(lifetime: CacheLifetime) -> Self {
        Self {
            lifetime,
            value: Cell::new(None),
            generated_frame: Cell::new(0),
        }
    }

    /// The cell's lifetime policy.
    #[must_use]
    pub const fn lifetime(&self) -> CacheLifetime {
        self.lifetime
    }

    /// The cached value, without running the read protocol.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        self.value.get()
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.value.take()
    }

    /// Runs the read protocol and returns the (possibly fresh) native
    /// value.
    ///
    /// `generate` produces a new value; returning `Ok(None)` means the
    /// backend declined, surfaced as [`Error::GenerationFailed`]. `destroy`
    /// receives the outgoing value and the reasons that expired it.
    ///
    /// # Errors
    ///
    /// [`Error::UseAfterDeconstruct`] when the object was deconstructed,
    /// [`Error::GenerationFailed`] when `generate` declined, and any error
    /// `generate` itself returns.
    pub fn read(
        &self,
        object: &GpuObject,
        generate: impl FnOnce() -> Result<Option<T>>,
        destroy: impl FnOnce(T, ReasonSet),
    ) -> Result<T> {
        if object.is_deconstructed() {
            return Err(Error::UseAfterDeconstruct {
                object: object.kind().as_str(),
            });
        }

        match self.lifetime {
            CacheLifetime::Persistent => {}
            CacheLifetime::Frame => {
                let expired = self.value.get().is_some()
                    && self.generated_frame.get() != object.device().frame_index();
                if expired {
                    object.invalidate(LIFE_TIME);
                }
            }
            CacheLifetime::Single => {
                if self.value.get().is_some() {
                    object.invalidate(LIFE_TIME);
                }
            }
        }

        let reasons = object.invalidation_reasons();
        if reasons.any()
            && let Some(stale) = self.value.take()
        {
            object.device().trace(|t| {
                t.native_destroyed(&NativeDestroyedEvent {
                    object: object.tag(),
                    key: stale.native_key(),
                    reasons: reasons.mask(),
                });
            });
            destroy(stale, reasons);
        }

        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let fresh = generate()?.ok_or(Error::GenerationFailed {
            object: object.kind().as_str(),
        })?;
        let frame_index = object.device().frame_index();
        self.value.set(Some(fresh));
        self.generated_frame.set(frame_index);
        object.device().trace(|t| {
            t.native_generated(&NativeGeneratedEvent {
                object: object.tag(),
                key: fresh.native_key(),
                frame_index,
            });
        });
        object.clear_reasons();
        Ok(fresh)
    }
}

/// Shared deconstruction path for wrappers that cache a native value.
///
/// Marks the object deconstructed (a no-op on repeat calls), and if a value
/// is still cached, hands it to `destroy` with the post-deconstruct reason
/// set. The wrapper remains safe to drop afterwards; only reads fail.
pub(crate) fn deconstruct_native<T: NativeValue>(
    object: &GpuObject,
    cell: &NativeCell<T>,
    destroy: impl FnOnce(T, ReasonSet),
) {
    if !object.mark_deconstructed() {
        return;
    }
    if let Some(value) = cell.take() {
        let reasons = object.invalidation_reasons();
        object.device().trace(|t| {
            t.native_destroyed(&NativeDestroyedEvent {
                object: object.tag(),
                key: value.native_key(),
                reasons: reasons.mask(),
            });
        });
        destroy(value, reasons);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GpuDevice;
    use crate::object::ObjectKind;
    use crate::reason::DATA;
    use crate::testing::TestBackend;
    use alloc::boxed::Box;
    use alloc::rc::Rc;

    struct Probe {
        generates: Cell<u32>,
        destroys: Cell<u32>,
        destroy_reasons: Cell<ReasonSet>,
    }

    impl Probe {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                generates: Cell::new(0),
                destroys: Cell::new(0),
                destroy_reasons: Cell::new(ReasonSet::new()),
            })
        }
    }

    fn fixture() -> (GpuDevice, GpuObject) {
        let device = GpuDevice::new(Box::new(TestBackend::new()));
        let object = GpuObject::new(device.shared().clone(), ObjectKind::Buffer);
        (device, object)
    }

    fn read(cell: &NativeCell<NativeKey>, object: &GpuObject, probe: &Rc<Probe>) -> Result<NativeKey> {
        let generate = {
            let probe = probe.clone();
            move || {
                probe.generates.set(probe.generates.get() + 1);
                Ok(Some(NativeKey(u64::from(probe.generates.get()))))
            }
        };
        let destroy = {
            let probe = probe.clone();
            move |_value, reasons| {
                probe.destroys.set(probe.destroys.get() + 1);
                probe.destroy_reasons.set(reasons);
            }
        };
        cell.read(object, generate, destroy)
    }

    #[test]
    fn fresh_read_is_idempotent() {
        let (_device, object) = fixture();
        let cell = NativeCell::new(CacheLifetime::Persistent);
        let probe = Probe::new();

        let first = read(&cell, &object, &probe).unwrap();
        let second = read(&cell, &object, &probe).unwrap();
        assert_eq!(first, second, "same cached instance");
        assert_eq!(probe.generates.get(), 1);
        assert_eq!(probe.destroys.get(), 0);
    }

    #[test]
    fn invalidation_destroys_once_then_regenerates() {
        let (_device, object) = fixture();
        let cell = NativeCell::new(CacheLifetime::Persistent);
        let probe = Probe::new();

        let first = read(&cell, &object, &probe).unwrap();
        object.invalidate(DATA);
        let second = read(&cell, &object, &probe).unwrap();

        assert_ne!(first, second);
        assert_eq!(probe.generates.get(), 2);
        assert_eq!(probe.destroys.get(), 1);
        assert!(probe.destroy_reasons.get().has(DATA), "hook saw the reason");
        assert!(
            !object.invalidation_reasons().any(),
            "reasons cleared after regeneration"
        );
    }

    #[test]
    fn single_lifetime_regenerates_every_read() {
        let (_device, object) = fixture();
        let cell = NativeCell::new(CacheLifetime::Single);
        let probe = Probe::new();

        for _ in 0..3 {
            read(&cell, &object, &probe).unwrap();
        }
        assert_eq!(probe.generates.get(), 3);
        assert_eq!(probe.destroys.get(), 2, "no value to destroy on first read");
        assert!(probe.destroy_reasons.get().life_time_reached());
    }

    #[test]
    fn frame_lifetime_follows_counter() {
        let (device, object) = fixture();
        let cell = NativeCell::new(CacheLifetime::Frame);
        let probe = Probe::new();

        read(&cell, &object, &probe).unwrap();
        read(&cell, &object, &probe).unwrap();
        assert_eq!(probe.generates.get(), 1, "cached within the frame");

        device.start_new_frame();
        read(&cell, &object, &probe).unwrap();
        assert_eq!(probe.generates.get(), 2);
        assert_eq!(probe.destroys.get(), 1);
        assert!(probe.destroy_reasons.get().life_time_reached());
    }

    #[test]
    fn declined_generation_is_retryable() {
        let (_device, object) = fixture();
        let cell = NativeCell::new(CacheLifetime::Persistent);
        let probe = Probe::new();

        read(&cell, &object, &probe).unwrap();
        object.invalidate(DATA);

        let declined = cell.read(&object, || Ok(None), |_, _| {});
        assert_eq!(
            declined,
            Err(Error::GenerationFailed { object: "buffer" })
        );
        assert!(
            object.invalidation_reasons().has(DATA),
            "reasons survive a failed generation"
        );

        let retried = read(&cell, &object, &probe).unwrap();
        assert_eq!(retried, NativeKey(2));
        assert!(!object.invalidation_reasons().any());
    }

    #[test]
    fn generate_error_propagates_and_cell_stays_empty() {
        let (_device, object) = fixture();
        let cell: NativeCell<NativeKey> = NativeCell::new(CacheLifetime::Persistent);
        let probe = Probe::new();

        let failed = cell.read(
            &object,
            || Err(Error::InvalidConfiguration("shader refused".into())),
            |_, _| {},
        );
        assert!(failed.is_err());
        assert!(cell.peek().is_none());

        read(&cell, &object, &probe).unwrap();
        assert_eq!(probe.generates.get(), 1);
        assert_eq!(probe.destroys.get(), 0);
    }

    #[test]
    fn deconstructed_cell_rejects_reads() {
        let (_device, object) = fixture();
        let cell = NativeCell::new(CacheLifetime::Persistent);
        let probe = Probe::new();

        read(&cell, &object, &probe).unwrap();
        deconstruct_native(&object, &cell, |_value, reasons| {
            probe.destroys.set(probe.destroys.get() + 1);
            probe.destroy_reasons.set(reasons);
        });

        assert_eq!(probe.destroys.get(), 1);
        assert!(probe.destroy_reasons.get().deconstructed());
        assert_eq!(
            read(&cell, &object, &probe),
            Err(Error::UseAfterDeconstruct { object: "buffer" })
        );
        assert_eq!(probe.generates.get(), 1, "no regeneration after teardown");
    }

    #[test]
    fn deconstruct_without_value_skips_destroy() {
        let (_device, object) = fixture();
        let cell: NativeCell<NativeKey> = NativeCell::new(CacheLifetime::Persistent);
        let mut destroyed = false;
        deconstruct_native(&object, &cell, |_, _| destroyed = true);
        assert!(!destroyed);
        assert!(object.is_deconstructed());
    }
}
