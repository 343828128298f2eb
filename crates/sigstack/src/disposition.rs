//
// disposition.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::mem::MaybeUninit;

use nix::sys::signal::SaFlags;
use nix::sys::signal::Signal;

use crate::error::Error;
use crate::error::Result;
use crate::sys;

/// An old-school handler function, invoked with the signal number.
pub type HandlerFn = extern "C" fn(libc::c_int);

/// A signal disposition: what the process does when a signal is delivered.
///
/// One of the default action, ignore, a plain handler function, or an
/// advanced (`SA_SIGINFO`) record carrying flags and a set of signals blocked
/// while the handler runs. Immutable once created.
#[derive(Clone, Copy)]
pub struct Disposition {
    raw: libc::sigaction,
}

impl Disposition {
    /// The platform's default action (`SIG_DFL`).
    pub fn default_action() -> Self {
        Self::from_parts(libc::SIG_DFL, SaFlags::empty(), empty_raw_set())
    }

    /// Discard the signal on delivery (`SIG_IGN`).
    pub fn ignore() -> Self {
        Self::from_parts(libc::SIG_IGN, SaFlags::empty(), empty_raw_set())
    }

    /// Run `handler` on delivery.
    pub fn handler(handler: HandlerFn) -> Self {
        Self::handler_with_flags(handler, SaFlags::empty())
    }

    /// Run `handler` on delivery, with explicit `sigaction()` flags.
    pub fn handler_with_flags(handler: HandlerFn, flags: SaFlags) -> Self {
        Self::from_parts(handler as usize as libc::sighandler_t, flags, empty_raw_set())
    }

    /// Run `handler` on delivery, with explicit flags and a set of signals to
    /// block while the handler executes.
    pub fn handler_with_mask(
        handler: HandlerFn,
        flags: SaFlags,
        blocked: impl IntoIterator<Item = Signal>,
    ) -> Self {
        let mut mask = empty_raw_set();
        for signal in blocked {
            unsafe { libc::sigaddset(&mut mask, signal as libc::c_int) };
        }
        Self::from_parts(handler as usize as libc::sighandler_t, flags, mask)
    }

    fn from_parts(action: libc::sighandler_t, flags: SaFlags, mask: libc::sigset_t) -> Self {
        let mut raw: libc::sigaction = unsafe { std::mem::zeroed() };
        raw.sa_sigaction = action;
        raw.sa_flags = flags.bits();
        raw.sa_mask = mask;
        Self { raw }
    }

    pub(crate) fn from_raw(raw: libc::sigaction) -> Self {
        Self { raw }
    }

    pub(crate) fn as_raw(&self) -> &libc::sigaction {
        &self.raw
    }

    /// Report the disposition currently installed for `signal`, falling back
    /// to a default-shaped record if the platform can't be queried.
    pub(crate) fn live(signal: Signal) -> Self {
        match sys::query_disposition(signal) {
            Ok(raw) => Self::from_raw(raw),
            Err(errno) => {
                log::warn!("Can't query disposition of {signal}: {errno}");
                Self::default_action()
            },
        }
    }

    /// Whether this is an advanced (`SA_SIGINFO`) disposition. Advanced
    /// dispositions classify as none of [`is_default()`], [`is_ignore()`] or
    /// [`is_handler()`].
    ///
    /// [`is_default()`]: Self::is_default
    /// [`is_ignore()`]: Self::is_ignore
    /// [`is_handler()`]: Self::is_handler
    pub fn is_siginfo(&self) -> bool {
        self.raw.sa_flags & libc::SA_SIGINFO != 0
    }

    pub fn is_default(&self) -> bool {
        !self.is_siginfo() && self.raw.sa_sigaction == libc::SIG_DFL
    }

    pub fn is_ignore(&self) -> bool {
        !self.is_siginfo() && self.raw.sa_sigaction == libc::SIG_IGN
    }

    /// Whether this disposition runs a plain handler function, i.e. is
    /// neither default, ignore, nor an advanced record.
    pub fn is_handler(&self) -> bool {
        !self.is_siginfo() &&
            self.raw.sa_sigaction != libc::SIG_DFL &&
            self.raw.sa_sigaction != libc::SIG_IGN
    }

    /// The handler function, for plain-handler dispositions.
    pub fn handler_fn(&self) -> Option<HandlerFn> {
        if !self.is_handler() {
            return None;
        }
        Some(unsafe { std::mem::transmute::<libc::sighandler_t, HandlerFn>(self.raw.sa_sigaction) })
    }

    pub fn flags(&self) -> SaFlags {
        SaFlags::from_bits_truncate(self.raw.sa_flags)
    }
}

impl fmt::Debug for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_siginfo() {
            write!(f, "Disposition::Advanced({:?})", self.flags())
        } else if self.is_ignore() {
            write!(f, "Disposition::Ignore")
        } else if self.is_default() {
            write!(f, "Disposition::Default")
        } else {
            write!(f, "Disposition::Handler({:#x})", self.raw.sa_sigaction)
        }
    }
}

fn empty_raw_set() -> libc::sigset_t {
    let mut raw = MaybeUninit::<libc::sigset_t>::uninit();
    unsafe {
        libc::sigemptyset(raw.as_mut_ptr());
        raw.assume_init()
    }
}

/// Per-signal stacks of disposition records.
///
/// For every signal with a non-empty stack, the oldest entry is the baseline:
/// the disposition that was live before the stack first touched that signal,
/// captured exactly once, on the first install. The newest entry mirrors what
/// the platform currently has installed; every operation maintains that
/// correspondence.
///
/// No locking here; `SignalStack` serializes access.
pub(crate) struct DispositionHistory {
    records: HashMap<Signal, Vec<Disposition>>,
}

impl DispositionHistory {
    pub(crate) fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Install `disposition` for `signal` and push it on the signal's stack.
    ///
    /// The platform swap returns the previously active disposition; if this
    /// is the first time `signal` is touched, that prior disposition is
    /// recorded first, as the baseline. Neither the platform state nor the
    /// stack changes when the swap fails.
    pub(crate) fn install(&mut self, signal: Signal, disposition: Disposition) -> Result<()> {
        let prior = sys::swap_disposition(signal, disposition.as_raw())
            .map_err(|errno| Error::Disposition { signal, errno })?;

        let records = self.records.entry(signal).or_default();
        if records.is_empty() {
            records.push(Disposition::from_raw(prior));
        }
        records.push(disposition);

        Ok(())
    }

    /// The newest recorded entry for `signal`, or the live platform
    /// disposition if the stack never touched it. Never fails.
    pub(crate) fn peek(&self, signal: Signal) -> Disposition {
        match self.records.get(&signal).and_then(|records| records.last()) {
            Some(newest) => *newest,
            None => Disposition::live(signal),
        }
    }

    /// Pop the newest override and reinstate the entry beneath it.
    ///
    /// With no recorded stack this only seeds the baseline from the live
    /// disposition, without installing anything. With just the baseline left
    /// it is a no-op; restoring can't unwind past the baseline.
    pub(crate) fn restore(&mut self, signal: Signal) -> Result<()> {
        match self.records.entry(signal) {
            Entry::Vacant(entry) => {
                let raw = sys::query_disposition(signal)
                    .map_err(|errno| Error::Disposition { signal, errno })?;
                entry.insert(vec![Disposition::from_raw(raw)]);
                Ok(())
            },
            Entry::Occupied(mut entry) => {
                let records = entry.get_mut();
                if records.len() <= 1 {
                    return Ok(());
                }

                let beneath = records[records.len() - 2];
                sys::swap_disposition(signal, beneath.as_raw())
                    .map_err(|errno| Error::Disposition { signal, errno })?;
                records.pop();
                Ok(())
            },
        }
    }

    /// Reinstate the recorded baseline for `signal` and push it as the new
    /// top, leaving the layers in between undone but still recorded.
    ///
    /// The baseline is whatever was live before the first install, not
    /// necessarily the platform default; `SignalStack::set_default()` is the
    /// explicit way to get `SIG_DFL`. An untouched signal only gets its
    /// stack seeded (baseline and top, both equal to the live disposition),
    /// with no install.
    pub(crate) fn reset(&mut self, signal: Signal) -> Result<()> {
        match self.records.entry(signal) {
            Entry::Vacant(entry) => {
                let raw = sys::query_disposition(signal)
                    .map_err(|errno| Error::Disposition { signal, errno })?;
                let live = Disposition::from_raw(raw);
                entry.insert(vec![live, live]);
                Ok(())
            },
            Entry::Occupied(mut entry) => {
                let records = entry.get_mut();
                let baseline = records[0];

                if records.len() > 1 {
                    sys::swap_disposition(signal, baseline.as_raw())
                        .map_err(|errno| Error::Disposition { signal, errno })?;
                }
                records.push(baseline);
                Ok(())
            },
        }
    }

    /// `reset()`, then discard every recorded layer above the baseline.
    pub(crate) fn clear(&mut self, signal: Signal) -> Result<()> {
        self.reset(signal)?;
        if let Some(records) = self.records.get_mut(&signal) {
            records.truncate(1);
        }
        Ok(())
    }

    /// Number of recorded entries for `signal` (0 if never touched; 1 means
    /// only the baseline).
    pub(crate) fn depth(&self, signal: Signal) -> usize {
        self.records.get(&signal).map_or(0, |records| records.len())
    }
}
