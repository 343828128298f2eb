//
// lib.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

//! Scoped, nestable overrides of POSIX signal dispositions and the signal
//! mask.
//!
//! Signal dispositions and the blocked-signal set are process-global state.
//! Code that calls `sigaction()` or `sigprocmask()` directly cannot safely
//! nest: if library A overrides a handler, then calls into library B which
//! overrides it again, both need to unwind their own layer, in LIFO order,
//! possibly from different threads. [`SignalStack`] does that bookkeeping:
//! every change records what was active before it, and `restore()` /
//! `restore_mask()` reinstate exactly the layer beneath.
//!
//! ```
//! use sigstack::Signal;
//! use sigstack::SignalStack;
//!
//! let signals = SignalStack::new();
//!
//! signals.ignore(Signal::SIGPROF)?;
//! assert!(signals.is_ignored(Signal::SIGPROF));
//!
//! // Undo just that layer
//! signals.restore(Signal::SIGPROF)?;
//! assert!(!signals.is_ignored(Signal::SIGPROF));
//! # Ok::<(), sigstack::Error>(())
//! ```
//!
//! A single stack instance is the unit of synchronization. Two independent
//! instances, or direct `sigaction()`/`sigprocmask()` calls made behind the
//! stack's back, race on the same process-global state and can invalidate the
//! recorded history. That is a caller responsibility; see [`SignalStack`].

pub mod disposition;
pub mod error;
pub mod stack;

mod mask;
mod sys;

pub use crate::disposition::Disposition;
pub use crate::disposition::HandlerFn;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::stack::SignalStack;

// The nix types that appear in the public API
pub use nix::sys::signal::SaFlags;
pub use nix::sys::signal::SigSet;
pub use nix::sys::signal::Signal;
