use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::debug::{BreakpointSet, StepTracker};

/// How a run request ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TerminationMode {
    /// Run whole frames until cancelled.
    #[default]
    Normal,
    /// Run until the active [`DebugStepMode`] reports an event.
    DebugEvent,
    /// Run until the program counter reaches the termination point.
    UntilExecutionPoint,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DebugStepMode {
    #[default]
    NoDebug,
    StopAtBreakpoint,
    StepInto,
    StepOver,
    StepOut,
}

/// Why the last run request returned control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    FrameCompleted,
    Breakpoint { address: u16 },
    StepCompleted { address: u16 },
    ExecutionPointReached { address: u16 },
    Cancelled,
}

/// Cooperative cancellation flag shared between the controller and its worker.
///
/// Besides the flag it doubles as the worker's pacing timer:
/// [`wait_timeout`](Self::wait_timeout) sleeps until the deadline or until
/// [`cancel`](Self::cancel) is called, whichever comes first.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for up to `timeout`. Returns true if cancelled before or during the wait.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = signal
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

/// Describes how the next run loop invocation terminates.
///
/// Owned by the controller session and reconfigured at the start of every
/// run request; the machine reads it once per frame and the frame engine
/// consults the step tracker between instructions.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub termination_mode: TerminationMode,
    pub debug_step_mode: DebugStepMode,
    /// Memory partition the termination point must be paged into; `None` matches any.
    pub termination_partition: Option<i32>,
    pub termination_point: Option<u16>,
    pub last_termination_reason: Option<TerminationReason>,
    pub cancellation: CancellationToken,
    /// Snapshot of the active breakpoint collection for this run.
    pub breakpoints: Arc<BreakpointSet>,
    pub step: StepTracker,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the context for a new run request.
    pub fn prepare(&mut self, mode: TerminationMode, step_mode: DebugStepMode) {
        self.termination_mode = mode;
        self.debug_step_mode = step_mode;
        self.termination_partition = None;
        self.termination_point = None;
        self.last_termination_reason = None;
        self.step.begin_run();
    }

    /// Run until execution reaches `address`, optionally only while `partition` is paged in.
    pub fn prepare_until(&mut self, address: u16, partition: Option<i32>) {
        self.prepare(TerminationMode::UntilExecutionPoint, DebugStepMode::NoDebug);
        self.termination_point = Some(address);
        self.termination_partition = partition;
    }

    pub fn is_debug_run(&self) -> bool {
        self.termination_mode == TerminationMode::DebugEvent
            && self.debug_step_mode != DebugStepMode::NoDebug
    }
}
