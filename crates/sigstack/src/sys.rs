//
// sys.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

// Thin wrappers over the platform's signal primitives. Everything else in the
// crate goes through these five calls; none of them touch crate state.
//
// `nix` covers `sigprocmask()` but has no query-only form of `sigaction()`
// and no `sigpending()` wrapper, so those two go through `libc` directly.
//
// Note that on Linux `sigprocmask()` only affects the calling thread in a
// multi-threaded process, while on macOS it applies process-wide. We take
// whatever the platform gives us here, same as callers of the raw primitive
// would.

use std::mem::MaybeUninit;
use std::ptr;

use nix::errno::Errno;
use nix::sys::signal::sigprocmask;
use nix::sys::signal::SigSet;
use nix::sys::signal::SigmaskHow;
use nix::sys::signal::Signal;

/// Install `new` as the disposition of `signal`, atomically handing back the
/// previously installed disposition.
pub(crate) fn swap_disposition(
    signal: Signal,
    new: &libc::sigaction,
) -> std::result::Result<libc::sigaction, Errno> {
    let mut prior = MaybeUninit::<libc::sigaction>::uninit();
    let rc = unsafe { libc::sigaction(signal as libc::c_int, new, prior.as_mut_ptr()) };
    Errno::result(rc)?;
    Ok(unsafe { prior.assume_init() })
}

/// Report the currently installed disposition of `signal` without changing it.
pub(crate) fn query_disposition(signal: Signal) -> std::result::Result<libc::sigaction, Errno> {
    let mut current = MaybeUninit::<libc::sigaction>::uninit();
    let rc = unsafe { libc::sigaction(signal as libc::c_int, ptr::null(), current.as_mut_ptr()) };
    Errno::result(rc)?;
    Ok(unsafe { current.assume_init() })
}

/// Apply `set` to the blocked-signal set with the given semantics
/// (`SIG_BLOCK`, `SIG_UNBLOCK` or `SIG_SETMASK`), handing back the previously
/// blocked set.
pub(crate) fn change_mask(how: SigmaskHow, set: &SigSet) -> std::result::Result<SigSet, Errno> {
    let mut prior = SigSet::empty();
    sigprocmask(how, Some(set), Some(&mut prior))?;
    Ok(prior)
}

/// Report the currently blocked set without changing it.
pub(crate) fn query_mask() -> std::result::Result<SigSet, Errno> {
    let mut current = SigSet::empty();
    sigprocmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current))?;
    Ok(current)
}

/// Report the set of signals raised while blocked and awaiting delivery.
pub(crate) fn query_pending() -> std::result::Result<SigSet, Errno> {
    let mut raw = MaybeUninit::<libc::sigset_t>::uninit();
    let rc = unsafe { libc::sigpending(raw.as_mut_ptr()) };
    Errno::result(rc)?;

    let raw = unsafe { raw.assume_init() };
    let mut pending = SigSet::empty();
    for signal in Signal::iterator() {
        if unsafe { libc::sigismember(&raw, signal as libc::c_int) } == 1 {
            pending.add(signal);
        }
    }

    Ok(pending)
}
