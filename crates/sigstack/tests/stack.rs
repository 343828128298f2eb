//
// stack.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

// Behavioral tests for `SignalStack`. Dispositions are process-global and
// the test harness runs tests on concurrent threads, so every disposition
// test owns a distinct signal number. Mask tests additionally serialize on
// `MASK_LOCK` since on some platforms `sigprocmask()` applies process-wide.

use std::sync::Mutex;
use std::sync::MutexGuard;

use assert_matches::assert_matches;
use nix::sys::signal::raise;
use sigstack::Disposition;
use sigstack::Error;
use sigstack::SaFlags;
use sigstack::SigSet;
use sigstack::Signal;
use sigstack::SignalStack;

extern "C" fn handler_a(_signal: libc::c_int) {}
extern "C" fn handler_b(_signal: libc::c_int) {}

static MASK_LOCK: Mutex<()> = Mutex::new(());

fn mask_lock() -> MutexGuard<'static, ()> {
    MASK_LOCK.lock().unwrap_or_else(|err| err.into_inner())
}

fn handler_of(disposition: Disposition) -> Option<usize> {
    disposition.handler_fn().map(|f| f as usize)
}

fn assert_same_mask(lhs: &SigSet, rhs: &SigSet) {
    for signal in Signal::iterator() {
        assert_eq!(lhs.contains(signal), rhs.contains(signal), "{signal}");
    }
}

#[test]
fn test_install_restore_is_lifo() -> anyhow::Result<()> {
    let signal = Signal::SIGUSR1;
    let stack = SignalStack::new();

    // Untouched: peek reports the live disposition without recording anything
    assert!(stack.peek(signal).is_default());
    assert_eq!(stack.depth(signal), 0);

    stack.install_handler(signal, handler_a)?;
    assert_eq!(handler_of(stack.peek(signal)), Some(handler_a as usize));
    assert!(stack.is_handled(signal));

    stack.install_handler(signal, handler_b)?;
    assert_eq!(handler_of(stack.peek(signal)), Some(handler_b as usize));

    stack.restore(signal)?;
    assert_eq!(handler_of(stack.peek(signal)), Some(handler_a as usize));

    stack.restore(signal)?;
    assert!(stack.peek(signal).is_default());
    assert!(stack.is_defaulted(signal));
    assert_eq!(stack.depth(signal), 1);

    Ok(())
}

#[test]
fn test_restore_without_history_is_idempotent() -> anyhow::Result<()> {
    let signal = Signal::SIGUSR2;
    let stack = SignalStack::new();

    stack.restore(signal)?;
    assert_eq!(stack.depth(signal), 1);
    assert!(stack.is_defaulted(signal));

    stack.restore(signal)?;
    assert_eq!(stack.depth(signal), 1);
    assert!(stack.is_defaulted(signal));

    Ok(())
}

#[test]
fn test_baseline_is_captured_exactly_once() -> anyhow::Result<()> {
    let signal = Signal::SIGHUP;

    // Make the pre-stack disposition something other than the default
    unsafe { libc::signal(signal as libc::c_int, libc::SIG_IGN) };

    let stack = SignalStack::new();
    stack.install_handler(signal, handler_a)?;
    stack.install_handler(signal, handler_b)?;
    assert_eq!(stack.depth(signal), 3);

    stack.restore(signal)?;
    stack.restore(signal)?;
    assert!(stack.is_ignored(signal));
    assert_eq!(stack.depth(signal), 1);

    // A later install must not re-capture a baseline
    stack.install_handler(signal, handler_a)?;
    assert_eq!(stack.depth(signal), 2);
    stack.restore(signal)?;
    assert!(stack.is_ignored(signal));

    Ok(())
}

#[test]
fn test_reset_returns_to_baseline_not_default() -> anyhow::Result<()> {
    let signal = Signal::SIGALRM;

    unsafe { libc::signal(signal as libc::c_int, libc::SIG_IGN) };

    let stack = SignalStack::new();
    stack.install_handler(signal, handler_a)?;
    stack.install_handler(signal, handler_b)?;

    stack.reset(signal)?;
    assert!(stack.is_ignored(signal));
    assert_eq!(stack.depth(signal), 4);

    // The undone layers are still recorded: restoring pops the reset layer
    stack.restore(signal)?;
    assert_eq!(handler_of(stack.peek(signal)), Some(handler_b as usize));
    assert!(stack.is_handled(signal));

    Ok(())
}

#[test]
fn test_reset_on_untouched_signal_only_seeds() -> anyhow::Result<()> {
    let signal = Signal::SIGPROF;
    let stack = SignalStack::new();

    stack.reset(signal)?;
    assert_eq!(stack.depth(signal), 2);
    assert!(stack.is_defaulted(signal));

    stack.restore(signal)?;
    assert_eq!(stack.depth(signal), 1);

    Ok(())
}

#[test]
fn test_clear_truncates_to_baseline() -> anyhow::Result<()> {
    let signal = Signal::SIGQUIT;
    let stack = SignalStack::new();

    stack.install_handler(signal, handler_a)?;
    stack.install_handler(signal, handler_b)?;
    stack.install_handler(signal, handler_a)?;
    assert_eq!(stack.depth(signal), 4);

    stack.clear(signal)?;
    assert_eq!(stack.depth(signal), 1);
    assert!(stack.is_defaulted(signal));

    // Nothing left to undo
    stack.restore(signal)?;
    assert_eq!(stack.depth(signal), 1);

    Ok(())
}

#[test]
fn test_ignore_then_restore() -> anyhow::Result<()> {
    let signal = Signal::SIGWINCH;
    let stack = SignalStack::new();

    assert!(!stack.is_ignored(signal));
    stack.ignore(signal)?;
    assert!(stack.is_ignored(signal));

    stack.restore(signal)?;
    assert!(!stack.is_ignored(signal));
    assert!(stack.is_defaulted(signal));

    Ok(())
}

#[test]
fn test_set_default_and_reset_diverge() -> anyhow::Result<()> {
    let signal = Signal::SIGTTOU;

    unsafe { libc::signal(signal as libc::c_int, libc::SIG_IGN) };

    let stack = SignalStack::new();
    stack.install_handler(signal, handler_a)?;

    stack.set_default(signal)?;
    assert!(stack.is_defaulted(signal));

    stack.reset(signal)?;
    assert!(stack.is_ignored(signal));

    Ok(())
}

#[test]
fn test_uncatchable_signal_is_rejected_cleanly() {
    let stack = SignalStack::new();

    let err = stack.install_handler(Signal::SIGKILL, handler_a).unwrap_err();
    assert_matches!(err, Error::Disposition {
        signal: Signal::SIGKILL,
        ..
    });

    // No baseline was recorded for the failed install
    assert_eq!(stack.depth(Signal::SIGKILL), 0);
}

#[test]
fn test_siginfo_disposition_classifies_as_none() -> anyhow::Result<()> {
    let signal = Signal::SIGVTALRM;
    let stack = SignalStack::new();

    stack.install(
        signal,
        Disposition::handler_with_flags(handler_a, SaFlags::SA_SIGINFO),
    )?;

    assert!(stack.peek(signal).is_siginfo());
    assert!(!stack.is_ignored(signal));
    assert!(!stack.is_defaulted(signal));
    assert!(!stack.is_handled(signal));

    stack.restore(signal)?;
    assert!(stack.is_defaulted(signal));

    Ok(())
}

#[test]
fn test_mask_round_trip() -> anyhow::Result<()> {
    let _guard = mask_lock();

    let before = SigSet::thread_get_mask()?;
    let stack = SignalStack::new();

    stack.block([Signal::SIGUSR1, Signal::SIGUSR2])?;
    let blocked = SigSet::thread_get_mask()?;
    assert!(blocked.contains(Signal::SIGUSR1));
    assert!(blocked.contains(Signal::SIGUSR2));

    stack.block([Signal::SIGUSR2])?;
    assert_eq!(stack.mask_depth(), 3);

    stack.restore_mask()?;
    stack.restore_mask()?;
    assert_same_mask(&before, &SigSet::thread_get_mask()?);
    assert_eq!(stack.mask_depth(), 1);

    // Floor: nothing beneath the baseline
    stack.restore_mask()?;
    assert_eq!(stack.mask_depth(), 1);

    Ok(())
}

#[test]
fn test_clear_mask_reinstates_baseline() -> anyhow::Result<()> {
    let _guard = mask_lock();

    let before = SigSet::thread_get_mask()?;
    let stack = SignalStack::new();

    stack.block([Signal::SIGTSTP])?;
    stack.block([Signal::SIGTTIN])?;
    assert_eq!(stack.mask_depth(), 3);

    stack.clear_mask()?;
    assert_eq!(stack.mask_depth(), 1);
    assert_same_mask(&before, &SigSet::thread_get_mask()?);

    Ok(())
}

#[test]
fn test_block_except_blocks_the_complement() -> anyhow::Result<()> {
    let _guard = mask_lock();

    let before = SigSet::thread_get_mask()?;
    let stack = SignalStack::new();

    stack.block_except([Signal::SIGCHLD])?;
    let blocked = SigSet::thread_get_mask()?;
    assert!(blocked.contains(Signal::SIGHUP));
    assert!(blocked.contains(Signal::SIGUSR1));
    assert!(!blocked.contains(Signal::SIGCHLD));
    assert!(!blocked.contains(Signal::SIGKILL));

    stack.restore_mask()?;
    assert_same_mask(&before, &SigSet::thread_get_mask()?);

    Ok(())
}

#[test]
fn test_unblock_except_keeps_the_named_signals() -> anyhow::Result<()> {
    let _guard = mask_lock();

    let stack = SignalStack::new();
    stack.block([Signal::SIGTERM, Signal::SIGINT])?;

    stack.unblock_except([Signal::SIGTERM])?;
    let blocked = SigSet::thread_get_mask()?;
    assert!(blocked.contains(Signal::SIGTERM));
    assert!(!blocked.contains(Signal::SIGINT));

    stack.clear_mask()?;

    Ok(())
}

#[test]
fn test_pending_signal_is_reported() -> anyhow::Result<()> {
    let _guard = mask_lock();

    let stack = SignalStack::new();

    // SIGURG: safe to deliver, its default action is to be discarded
    stack.block([Signal::SIGURG])?;
    assert!(!stack.is_pending(Signal::SIGURG));

    raise(Signal::SIGURG)?;
    assert!(stack.is_pending(Signal::SIGURG));

    stack.unblock([Signal::SIGURG])?;
    assert!(!stack.is_pending(Signal::SIGURG));

    stack.clear_mask()?;

    Ok(())
}

#[test]
fn test_concurrent_overrides_are_serialized() {
    let stack = SignalStack::new();

    std::thread::scope(|scope| {
        for signal in [Signal::SIGIO, Signal::SIGSYS] {
            let stack = &stack;
            scope.spawn(move || {
                for _ in 0..100 {
                    stack.install_handler(signal, handler_a).unwrap();
                    stack.install_handler(signal, handler_b).unwrap();
                    stack.restore(signal).unwrap();
                    stack.restore(signal).unwrap();
                }
            });
        }
    });

    assert_eq!(stack.depth(Signal::SIGIO), 1);
    assert_eq!(stack.depth(Signal::SIGSYS), 1);
    assert!(stack.is_defaulted(Signal::SIGIO));
    assert!(stack.is_defaulted(Signal::SIGSYS));
}
