//! Breakpoints and step tracking.
//!
//! [`DebugSupport`] is the cloneable handle tools use to edit breakpoints.
//! The controller takes an immutable snapshot of the collection at every
//! frame boundary, so the instruction loop reads breakpoints without taking
//! a lock.

pub mod breakpoints;
pub mod step;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use slog::{Logger, debug, o};

pub use breakpoints::{Breakpoint, BreakpointSet};
pub use step::{SHADOW_STACK_LIMIT, StepTracker};

/// Notification raised by every breakpoint mutation.
#[derive(Clone, Debug)]
pub struct BreakpointsChanged {
    pub before: Arc<BreakpointSet>,
    pub after: Arc<BreakpointSet>,
}

impl BreakpointsChanged {
    /// Addresses whose breakpoint records differ between the two snapshots.
    pub fn affected_addresses(&self) -> BTreeSet<u16> {
        let mut addresses = BTreeSet::new();
        for bp in self.before.iter() {
            if self.after.get(bp.address, bp.partition) != Some(bp) {
                addresses.insert(bp.address);
            }
        }
        for bp in self.after.iter() {
            if self.before.get(bp.address, bp.partition) != Some(bp) {
                addresses.insert(bp.address);
            }
        }
        addresses
    }
}

type BreakpointListener = Box<dyn FnMut(&BreakpointsChanged) + Send>;

#[derive(Default)]
struct DebugState {
    breakpoints: Arc<BreakpointSet>,
    last_breakpoint: Option<u16>,
    imminent_breakpoint: Option<u16>,
}

#[derive(Clone)]
pub struct DebugSupport {
    state: Arc<Mutex<DebugState>>,
    listeners: Arc<Mutex<Vec<BreakpointListener>>>,
    logger: Logger,
}

impl Default for DebugSupport {
    fn default() -> Self {
        Self::new(Logger::root(slog::Discard, o!()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl DebugSupport {
    pub fn new(logger: Logger) -> Self {
        Self {
            state: Arc::new(Mutex::new(DebugState::default())),
            listeners: Arc::new(Mutex::new(Vec::new())),
            logger,
        }
    }

    pub fn subscribe(&self, listener: impl FnMut(&BreakpointsChanged) + Send + 'static) {
        lock(&self.listeners).push(Box::new(listener));
    }

    /// Current breakpoint collection. Cheap: shares the snapshot.
    pub fn breakpoints(&self) -> Arc<BreakpointSet> {
        lock(&self.state).breakpoints.clone()
    }

    /// Add or replace a breakpoint. Returns true if the collection changed.
    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> bool {
        debug!(self.logger, "add breakpoint"; "address" => format!("{:04X}", breakpoint.address));
        self.mutate(|set| set.insert(breakpoint))
    }

    /// Returns false when no breakpoint existed under the key.
    pub fn remove_breakpoint(&self, address: u16, partition: Option<i32>) -> bool {
        debug!(self.logger, "remove breakpoint"; "address" => format!("{address:04X}"));
        self.mutate(|set| set.remove(address, partition))
    }

    pub fn erase_all_breakpoints(&self) -> bool {
        debug!(self.logger, "erase all breakpoints");
        self.mutate(BreakpointSet::clear)
    }

    /// Apply a copy-on-write mutation and raise exactly one change notification.
    fn mutate(&self, f: impl FnOnce(&mut BreakpointSet) -> bool) -> bool {
        let (changed, event) = {
            let mut state = lock(&self.state);
            let before = state.breakpoints.clone();
            let changed = f(Arc::make_mut(&mut state.breakpoints));
            let after = state.breakpoints.clone();
            (changed, BreakpointsChanged { before, after })
        };
        for listener in lock(&self.listeners).iter_mut() {
            listener(&event);
        }
        changed
    }

    pub fn last_breakpoint(&self) -> Option<u16> {
        lock(&self.state).last_breakpoint
    }

    pub fn imminent_breakpoint(&self) -> Option<u16> {
        lock(&self.state).imminent_breakpoint
    }

    /// Publish the step tracker's markers after a run.
    pub fn update_markers(&self, tracker: &StepTracker) {
        let mut state = lock(&self.state);
        state.last_breakpoint = tracker.last_breakpoint;
        state.imminent_breakpoint = tracker.imminent_breakpoint;
    }

    pub fn clear_markers(&self) {
        let mut state = lock(&self.state);
        state.last_breakpoint = None;
        state.imminent_breakpoint = None;
    }
}
