//
// mask.rs
//
// Copyright (C) 2026 Posit Software, PBC. All rights reserved.
//
//

use nix::sys::signal::SigSet;
use nix::sys::signal::SigmaskHow;
use nix::sys::signal::Signal;

use crate::error::Error;
use crate::error::Result;
use crate::sys;

/// One stack of full blocked-set snapshots.
///
/// Every successful `block()`/`unblock()` pushes the complete blocked set
/// that resulted from the change, computed from the prior set the platform
/// hands back atomically. `restore()` and `clear()` therefore reinstate a
/// popped entry with plain `SIG_SETMASK` overwrite semantics.
///
/// The stack is seeded with one baseline entry, the blocked set observed at
/// construction time. Restoring can't unwind past the baseline.
///
/// No locking here; `SignalStack` serializes access.
pub(crate) struct MaskHistory {
    snapshots: Vec<SigSet>,
}

impl MaskHistory {
    pub(crate) fn new() -> Self {
        let baseline = match sys::query_mask() {
            Ok(current) => current,
            Err(errno) => {
                log::warn!("Can't query the blocked-signal set: {errno}; seeding an empty baseline");
                SigSet::empty()
            },
        };

        Self {
            snapshots: vec![baseline],
        }
    }

    /// Add `requested` to the blocked set and push the resulting snapshot.
    pub(crate) fn block(&mut self, requested: SigSet) -> Result<()> {
        let prior = sys::change_mask(SigmaskHow::SIG_BLOCK, &requested)
            .map_err(|errno| Error::Mask { errno })?;
        self.snapshots.push(union(&prior, &requested));
        Ok(())
    }

    /// Remove `requested` from the blocked set and push the resulting
    /// snapshot.
    pub(crate) fn unblock(&mut self, requested: SigSet) -> Result<()> {
        let prior = sys::change_mask(SigmaskHow::SIG_UNBLOCK, &requested)
            .map_err(|errno| Error::Mask { errno })?;
        self.snapshots.push(difference(&prior, &requested));
        Ok(())
    }

    /// Reinstate the snapshot beneath the top and pop the top. A stack with
    /// only the baseline is left alone.
    pub(crate) fn restore(&mut self) -> Result<()> {
        if self.snapshots.len() <= 1 {
            return Ok(());
        }

        let beneath = self.snapshots[self.snapshots.len() - 2];
        sys::change_mask(SigmaskHow::SIG_SETMASK, &beneath).map_err(|errno| Error::Mask { errno })?;
        self.snapshots.pop();
        Ok(())
    }

    /// Reinstate the baseline snapshot and discard everything above it.
    pub(crate) fn clear(&mut self) -> Result<()> {
        if self.snapshots.len() <= 1 {
            return Ok(());
        }

        let baseline = self.snapshots[0];
        sys::change_mask(SigmaskHow::SIG_SETMASK, &baseline)
            .map_err(|errno| Error::Mask { errno })?;
        self.snapshots.truncate(1);
        Ok(())
    }

    pub(crate) fn depth(&self) -> usize {
        self.snapshots.len()
    }
}

/// Collect an iterator of signals into a `SigSet`.
pub(crate) fn sigset_of(signals: impl IntoIterator<Item = Signal>) -> SigSet {
    let mut set = SigSet::empty();
    for signal in signals {
        set.add(signal);
    }
    set
}

/// Every signal except the ones in `set`. `SIGKILL` and `SIGSTOP` are left
/// out unconditionally: the kernel strips them from any mask, so including
/// them would only make our snapshots disagree with the live blocked set.
pub(crate) fn complement(set: &SigSet) -> SigSet {
    let mut out = SigSet::empty();
    for signal in Signal::iterator() {
        if signal == Signal::SIGKILL || signal == Signal::SIGSTOP {
            continue;
        }
        if !set.contains(signal) {
            out.add(signal);
        }
    }
    out
}

fn union(lhs: &SigSet, rhs: &SigSet) -> SigSet {
    let mut out = SigSet::empty();
    for signal in Signal::iterator() {
        if lhs.contains(signal) || rhs.contains(signal) {
            out.add(signal);
        }
    }
    out
}

fn difference(lhs: &SigSet, rhs: &SigSet) -> SigSet {
    let mut out = SigSet::empty();
    for signal in Signal::iterator() {
        if lhs.contains(signal) && !rhs.contains(signal) {
            out.add(signal);
        }
    }
    out
}
