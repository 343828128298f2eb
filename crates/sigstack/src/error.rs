//
// error.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::Signal;

pub type Result<T> = std::result::Result<T, Error>;

/// A rejection from the platform's signal primitives.
///
/// This is the only failure kind in the crate: the underlying `sigaction()`
/// or `sigprocmask()` call returned an error, e.g. for an uncatchable signal
/// like `SIGKILL`. Failures never leave partial state behind; the recorded
/// history only grows after the platform call has succeeded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The platform refused to change the disposition of `signal`.
    Disposition { signal: Signal, errno: Errno },

    /// The platform refused to change the blocked-signal set.
    Mask { errno: Errno },
}

impl Error {
    pub fn errno(&self) -> Errno {
        match self {
            Error::Disposition { errno, .. } => *errno,
            Error::Mask { errno } => *errno,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Disposition { signal, errno } => {
                write!(f, "Can't change disposition of {signal}: {errno}")
            },
            Error::Mask { errno } => {
                write!(f, "Can't change the blocked-signal set: {errno}")
            },
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
