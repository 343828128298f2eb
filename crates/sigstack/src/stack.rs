//
// stack.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use nix::sys::signal::SaFlags;
use nix::sys::signal::Signal;
use parking_lot::RwLock;

use crate::disposition::Disposition;
use crate::disposition::DispositionHistory;
use crate::disposition::HandlerFn;
use crate::error::Result;
use crate::mask;
use crate::mask::MaskHistory;
use crate::sys;

struct Inner {
    dispositions: DispositionHistory,
    masks: MaskHistory,
}

/// Scoped, nestable overrides of signal dispositions and the signal mask.
///
/// Each disposition change and each mask change records the state it
/// replaced; [`restore()`] and [`restore_mask()`] undo exactly the newest
/// layer, so independent callers can nest overrides and unwind them in LIFO
/// order. One reader/writer lock serializes all operations on an instance:
/// mutations hold it exclusively for their full duration, including the
/// platform call, while classification queries share it.
///
/// Signal state is process-global. The recorded history is only meaningful
/// while every disposition/mask change goes through the same `SignalStack`:
/// a second instance, or direct `sigaction()`/`sigprocmask()` calls, race
/// with this one and can leave the recorded top out of sync with the live
/// state. The lock also cannot order these operations relative to signal
/// delivery itself.
///
/// [`restore()`]: Self::restore
/// [`restore_mask()`]: Self::restore_mask
pub struct SignalStack {
    inner: RwLock<Inner>,
}

impl SignalStack {
    /// Create a stack with empty disposition history and the currently
    /// blocked set recorded as the mask baseline.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                dispositions: DispositionHistory::new(),
                masks: MaskHistory::new(),
            }),
        }
    }

    // --- Dispositions ------------------------------------------------------

    /// Install `disposition` for `signal`, remembering what it replaced.
    ///
    /// The first install on a given signal also captures the baseline: the
    /// disposition that was live before this stack ever touched the signal.
    /// Fails if the platform rejects the change (e.g. for `SIGKILL`), in
    /// which case neither the live state nor the history is modified.
    pub fn install(&self, signal: Signal, disposition: Disposition) -> Result<()> {
        self.inner.write().dispositions.install(signal, disposition)
    }

    /// Install a plain handler function for `signal`.
    pub fn install_handler(&self, signal: Signal, handler: HandlerFn) -> Result<()> {
        self.install(signal, Disposition::handler(handler))
    }

    /// Install a handler function with explicit `sigaction()` flags.
    pub fn install_handler_with_flags(
        &self,
        signal: Signal,
        handler: HandlerFn,
        flags: SaFlags,
    ) -> Result<()> {
        self.install(signal, Disposition::handler_with_flags(handler, flags))
    }

    /// Install a handler function with explicit flags and a set of signals
    /// blocked while the handler executes.
    pub fn install_handler_with_mask(
        &self,
        signal: Signal,
        handler: HandlerFn,
        flags: SaFlags,
        blocked: impl IntoIterator<Item = Signal>,
    ) -> Result<()> {
        self.install(signal, Disposition::handler_with_mask(handler, flags, blocked))
    }

    /// Install the ignore disposition for `signal`.
    pub fn ignore(&self, signal: Signal) -> Result<()> {
        self.install(signal, Disposition::ignore())
    }

    /// Install the platform default action for `signal`. This is the
    /// explicit route to `SIG_DFL`; [`reset()`] returns to the recorded
    /// baseline instead, which need not be the default.
    ///
    /// [`reset()`]: Self::reset
    pub fn set_default(&self, signal: Signal) -> Result<()> {
        self.install(signal, Disposition::default_action())
    }

    /// The newest recorded disposition for `signal`, or the live platform
    /// disposition if this stack never touched it. Never fails.
    pub fn peek(&self, signal: Signal) -> Disposition {
        self.inner.read().dispositions.peek(signal)
    }

    /// Undo the newest override of `signal`, reinstating the layer beneath.
    ///
    /// Restoring a signal with no recorded history just seeds its baseline
    /// from the live disposition; restoring with only the baseline left is a
    /// no-op. Both return success, so unwinding is idempotent at the floor.
    pub fn restore(&self, signal: Signal) -> Result<()> {
        self.inner.write().dispositions.restore(signal)
    }

    /// Reinstall the baseline disposition of `signal` and push it as the new
    /// top. The undone layers stay recorded; use [`clear()`] to drop them.
    ///
    /// [`clear()`]: Self::clear
    pub fn reset(&self, signal: Signal) -> Result<()> {
        self.inner.write().dispositions.reset(signal)
    }

    /// Return `signal` to its baseline disposition and forget every recorded
    /// override, leaving only the baseline entry.
    pub fn clear(&self, signal: Signal) -> Result<()> {
        self.inner.write().dispositions.clear(signal)
    }

    /// Number of recorded entries for `signal`: 0 if never touched, 1 if
    /// only the baseline is recorded.
    pub fn depth(&self, signal: Signal) -> usize {
        self.inner.read().dispositions.depth(signal)
    }

    /// Whether the *live* disposition of `signal` is ignore. Advanced
    /// (`SA_SIGINFO`) dispositions report `false`; classify those through
    /// [`peek()`] and [`Disposition::is_siginfo()`].
    ///
    /// [`peek()`]: Self::peek
    pub fn is_ignored(&self, signal: Signal) -> bool {
        let _guard = self.inner.read();
        Disposition::live(signal).is_ignore()
    }

    /// Whether the *live* disposition of `signal` is the platform default.
    /// Advanced dispositions report `false`.
    pub fn is_defaulted(&self, signal: Signal) -> bool {
        let _guard = self.inner.read();
        Disposition::live(signal).is_default()
    }

    /// Whether the *live* disposition of `signal` runs a plain handler
    /// function. Advanced dispositions report `false`.
    pub fn is_handled(&self, signal: Signal) -> bool {
        let _guard = self.inner.read();
        Disposition::live(signal).is_handler()
    }

    // --- Signal mask -------------------------------------------------------

    /// Add `signals` to the blocked set, remembering the prior set for
    /// [`restore_mask()`].
    ///
    /// [`restore_mask()`]: Self::restore_mask
    pub fn block(&self, signals: impl IntoIterator<Item = Signal>) -> Result<()> {
        self.inner.write().masks.block(mask::sigset_of(signals))
    }

    /// Remove `signals` from the blocked set, remembering the prior set.
    pub fn unblock(&self, signals: impl IntoIterator<Item = Signal>) -> Result<()> {
        self.inner.write().masks.unblock(mask::sigset_of(signals))
    }

    /// Block every signal except `signals` (and the unmaskable `SIGKILL`
    /// and `SIGSTOP`).
    pub fn block_except(&self, signals: impl IntoIterator<Item = Signal>) -> Result<()> {
        self.inner
            .write()
            .masks
            .block(mask::complement(&mask::sigset_of(signals)))
    }

    /// Unblock every signal except `signals`.
    pub fn unblock_except(&self, signals: impl IntoIterator<Item = Signal>) -> Result<()> {
        self.inner
            .write()
            .masks
            .unblock(mask::complement(&mask::sigset_of(signals)))
    }

    /// Undo the newest mask change, reinstating the snapshot beneath it as
    /// the full blocked set. A no-op success when only the baseline remains.
    pub fn restore_mask(&self) -> Result<()> {
        self.inner.write().masks.restore()
    }

    /// Reinstate the baseline blocked set and forget every recorded mask
    /// change.
    pub fn clear_mask(&self) -> Result<()> {
        self.inner.write().masks.clear()
    }

    /// Number of recorded mask snapshots, including the baseline.
    pub fn mask_depth(&self) -> usize {
        self.inner.read().masks.depth()
    }

    /// Whether `signal` has been raised while blocked and is awaiting
    /// delivery. This queries the live pending set; it does not report
    /// whether the signal is currently blocked.
    pub fn is_pending(&self, signal: Signal) -> bool {
        let _guard = self.inner.read();
        match sys::query_pending() {
            Ok(pending) => pending.contains(signal),
            Err(errno) => {
                log::warn!("Can't query pending signals: {errno}");
                false
            },
        }
    }
}

impl Default for SignalStack {
    fn default() -> Self {
        Self::new()
    }
}
