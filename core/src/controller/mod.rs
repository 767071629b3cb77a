//! Background execution of a [`Machine`] with start/pause/stop/step control.
//!
//! The controller owns a session (the machine plus its [`ExecutionContext`]).
//! A run request moves the session onto a worker thread, which hands it back
//! through its `JoinHandle` when the run ends. While the worker runs, nothing
//! else touches the machine, so the per-instruction path takes no locks.

mod stats;

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::JoinHandle;
use std::time::Instant;

use slog::{Logger, debug, info, o, trace, warn};
use thiserror::Error;

use crate::core::context::{
    CancellationToken, DebugStepMode, ExecutionContext, TerminationMode, TerminationReason,
};
use crate::core::machine::Machine;
use crate::debug::DebugSupport;

pub use stats::FrameStats;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MachineState {
    #[default]
    None,
    Running,
    Pausing,
    Paused,
    Stopping,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{operation} is not allowed while the machine is {state:?}")]
    InvalidOperation {
        operation: &'static str,
        state: MachineState,
    },
    #[error("machine worker thread panicked; the machine is no longer available")]
    WorkerPanicked,
}

/// Notifications published to controller listeners.
///
/// Frame events and the pause a run raises on its own come from the worker
/// thread. The transitions made by [`MachineController::pause`],
/// [`MachineController::stop`] and the run requests are raised on the thread
/// that called them.
pub enum ControllerEvent<'a> {
    StateChanged {
        old: MachineState,
        new: MachineState,
    },
    /// Raised after every frame run. `normal` is false when the frame was cut
    /// short by a debug event, an execution point or cancellation.
    FrameCompleted {
        normal: bool,
        machine: &'a dyn Machine,
    },
}

type Listener = Box<dyn FnMut(&ControllerEvent<'_>) + Send>;

struct Session {
    machine: Box<dyn Machine>,
    ctx: ExecutionContext,
}

struct Shared {
    state: Mutex<MachineState>,
    stats: Mutex<FrameStats>,
    listeners: Mutex<Vec<Listener>>,
    cancellation: Mutex<CancellationToken>,
    logger: Logger,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Shared {
    fn state(&self) -> MachineState {
        *lock(&self.state)
    }

    /// Move to `new` if the current state is one of `from`. Listeners run after the lock is released.
    fn transition(&self, from: &[MachineState], new: MachineState) -> Result<MachineState, MachineState> {
        let old = {
            let mut state = lock(&self.state);
            if !from.contains(&state) {
                return Err(*state);
            }
            std::mem::replace(&mut *state, new)
        };
        debug!(self.logger, "state changed"; "old" => ?old, "new" => ?new);
        self.emit(&ControllerEvent::StateChanged { old, new });
        Ok(old)
    }

    fn emit(&self, event: &ControllerEvent<'_>) {
        for listener in lock(&self.listeners).iter_mut() {
            listener(event);
        }
    }
}

/// Cancels whatever run the controller currently has in flight.
///
/// Obtained from [`MachineController::cancel_handle`]; usable from any thread,
/// including while a blocking step call is waiting. The handle does not keep
/// the controller alive, so a listener may hold one. Once the controller is
/// dropped, `cancel` does nothing.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Weak<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.cancellation).cancel();
        }
    }
}

pub struct MachineController {
    shared: Arc<Shared>,
    session: Option<Session>,
    worker: Option<JoinHandle<Session>>,
    debug: DebugSupport,
    lost: bool,
}

impl MachineController {
    pub fn new(machine: Box<dyn Machine>, logger: Logger) -> Self {
        let logger = logger.new(o!("machine" => machine.name().to_string()));
        let debug = DebugSupport::new(logger.new(o!("component" => "debug")));
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MachineState::None),
                stats: Mutex::new(FrameStats::default()),
                listeners: Mutex::new(Vec::new()),
                cancellation: Mutex::new(CancellationToken::new()),
                logger,
            }),
            session: Some(Session {
                machine,
                ctx: ExecutionContext::new(),
            }),
            worker: None,
            debug,
            lost: false,
        }
    }

    pub fn subscribe(&self, listener: impl FnMut(&ControllerEvent<'_>) + Send + 'static) {
        lock(&self.shared.listeners).push(Box::new(listener));
    }

    pub fn state(&self) -> MachineState {
        self.shared.state()
    }

    pub fn stats(&self) -> FrameStats {
        *lock(&self.shared.stats)
    }

    /// Breakpoint editing handle shared with this controller.
    pub fn debug(&self) -> &DebugSupport {
        &self.debug
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// The machine, when no run is in flight.
    pub fn machine(&mut self) -> Option<&dyn Machine> {
        self.reclaim_finished();
        self.session.as_ref().map(|s| &*s.machine)
    }

    pub fn machine_mut(&mut self) -> Option<&mut (dyn Machine + 'static)> {
        self.reclaim_finished();
        self.session.as_mut().map(|s| &mut *s.machine)
    }

    /// Execution context of the last run, when no run is in flight.
    pub fn context(&mut self) -> Option<&ExecutionContext> {
        self.reclaim_finished();
        self.session.as_ref().map(|s| &s.ctx)
    }

    pub fn last_termination_reason(&mut self) -> Option<TerminationReason> {
        self.context().and_then(|ctx| ctx.last_termination_reason)
    }

    /// Run whole frames, paced to wall-clock frame time.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        self.begin_run("start", TerminationMode::Normal, DebugStepMode::NoDebug, None)
    }

    /// Run whole frames, stopping at execution breakpoints.
    pub fn start_debug(&mut self) -> Result<(), ControllerError> {
        self.begin_run(
            "start_debug",
            TerminationMode::DebugEvent,
            DebugStepMode::StopAtBreakpoint,
            None,
        )
    }

    /// Run until execution reaches `address`, optionally only in `partition`.
    pub fn run_until(&mut self, address: u16, partition: Option<i32>) -> Result<(), ControllerError> {
        self.begin_run(
            "run_until",
            TerminationMode::UntilExecutionPoint,
            DebugStepMode::NoDebug,
            Some((address, partition)),
        )
    }

    /// Cancel the run and wait for the worker. Both the Pausing and the Paused
    /// transitions are published on the calling thread, before this returns.
    pub fn pause(&mut self) -> Result<(), ControllerError> {
        self.guard_lost()?;
        if let Err(state) = self
            .shared
            .transition(&[MachineState::Running], MachineState::Pausing)
        {
            return Err(self.invalid("pause", state));
        }
        self.cancel();
        self.join_worker()?;
        let _ = self
            .shared
            .transition(&[MachineState::Pausing], MachineState::Paused);
        Ok(())
    }

    /// Like [`pause`](Self::pause), the Stopping and Stopped transitions are
    /// published on the calling thread. Frame statistics and the breakpoint
    /// markers are cleared before Stopped is announced.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        self.guard_lost()?;
        let old = self
            .shared
            .transition(&[MachineState::Running, MachineState::Paused], MachineState::Stopping)
            .map_err(|state| self.invalid("stop", state))?;
        if old == MachineState::Running {
            self.cancel();
        }
        self.join_worker()?;
        *lock(&self.shared.stats) = FrameStats::default();
        self.debug.clear_markers();
        if let Some(session) = self.session.as_mut() {
            session.ctx.step.reset();
        }
        let _ = self
            .shared
            .transition(&[MachineState::Stopping], MachineState::Stopped);
        Ok(())
    }

    /// Stop (if active), reset the hardware and start again.
    pub fn restart(&mut self) -> Result<(), ControllerError> {
        if matches!(self.state(), MachineState::Running | MachineState::Paused) {
            self.stop()?;
        }
        self.start()
    }

    /// Execute exactly one instruction and wait until paused.
    pub fn step_into(&mut self) -> Result<(), ControllerError> {
        self.step("step_into", DebugStepMode::StepInto)
    }

    /// Step, running calls, block instructions and HALT through to completion.
    pub fn step_over(&mut self) -> Result<(), ControllerError> {
        self.step("step_over", DebugStepMode::StepOver)
    }

    /// Run until the current subroutine returns.
    pub fn step_out(&mut self) -> Result<(), ControllerError> {
        self.step("step_out", DebugStepMode::StepOut)
    }

    /// Block until the current run pauses itself (debug event, execution point
    /// or a [`CancelHandle`] cancel).
    pub fn wait_for_pause(&mut self) -> Result<(), ControllerError> {
        self.join_worker()
    }

    fn step(&mut self, operation: &'static str, mode: DebugStepMode) -> Result<(), ControllerError> {
        self.begin_run(operation, TerminationMode::DebugEvent, mode, None)?;
        self.join_worker()
    }

    fn begin_run(
        &mut self,
        operation: &'static str,
        mode: TerminationMode,
        step_mode: DebugStepMode,
        until: Option<(u16, Option<i32>)>,
    ) -> Result<(), ControllerError> {
        self.guard_lost()?;
        let state = self.state();
        if !matches!(
            state,
            MachineState::None | MachineState::Paused | MachineState::Stopped
        ) {
            return Err(self.invalid(operation, state));
        }
        self.join_worker()?;
        let Some(mut session) = self.session.take() else {
            return Err(ControllerError::WorkerPanicked);
        };

        if matches!(state, MachineState::None | MachineState::Stopped) {
            session.machine.hard_reset();
            session.ctx.step.reset();
            *lock(&self.shared.stats) = FrameStats::default();
        }

        match until {
            Some((address, partition)) => session.ctx.prepare_until(address, partition),
            None => session.ctx.prepare(mode, step_mode),
        }
        let token = CancellationToken::new();
        session.ctx.cancellation = token.clone();
        session.ctx.breakpoints = self.debug.breakpoints();
        *lock(&self.shared.cancellation) = token;

        let _ = self.shared.transition(&[state], MachineState::Running);

        let shared = self.shared.clone();
        let debug = self.debug.clone();
        self.worker = Some(std::thread::spawn(move || run_worker(session, &shared, &debug)));
        Ok(())
    }

    /// Collect the session from a worker that already finished on its own.
    fn reclaim_finished(&mut self) {
        if self.worker.as_ref().is_some_and(|w| w.is_finished()) {
            let _ = self.join_worker();
        }
    }

    fn join_worker(&mut self) -> Result<(), ControllerError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(_) => {
                warn!(self.shared.logger, "machine worker panicked");
                self.lost = true;
                *lock(&self.shared.state) = MachineState::Stopped;
                Err(ControllerError::WorkerPanicked)
            }
        }
    }

    fn cancel(&self) {
        lock(&self.shared.cancellation).cancel();
    }

    fn guard_lost(&self) -> Result<(), ControllerError> {
        if self.lost {
            return Err(ControllerError::WorkerPanicked);
        }
        Ok(())
    }

    fn invalid(&self, operation: &'static str, state: MachineState) -> ControllerError {
        warn!(self.shared.logger, "invalid controller operation"; "operation" => operation, "state" => ?state);
        ControllerError::InvalidOperation { operation, state }
    }
}

impl Drop for MachineController {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel();
            let _ = self.join_worker();
        }
    }
}

fn run_worker(mut session: Session, shared: &Shared, debug: &DebugSupport) -> Session {
    let Session { machine, ctx } = &mut session;
    let paced = ctx.termination_mode == TerminationMode::Normal;
    let frame_duration = machine.frame_duration();
    let mut next_frame = Instant::now();

    loop {
        if ctx.cancellation.is_cancelled() {
            ctx.last_termination_reason = Some(TerminationReason::Cancelled);
            break;
        }

        // Edits made while running take effect from the next frame.
        ctx.breakpoints = debug.breakpoints();
        let frame_begin = Instant::now();
        let completed = machine.execute_frame(ctx);
        let cpu_time = frame_begin.elapsed();

        shared.emit(&ControllerEvent::FrameCompleted {
            normal: completed,
            machine: &**machine,
        });
        if !completed {
            lock(&shared.stats).record_partial(cpu_time);
            break;
        }

        let mut cancelled = false;
        if paced {
            next_frame += frame_duration;
            let now = Instant::now();
            if next_frame > now {
                cancelled = ctx.cancellation.wait_timeout(next_frame - now);
            } else {
                trace!(shared.logger, "frame overran its time budget";
                    "late_us" => (now - next_frame).as_micros() as u64);
                next_frame = now;
            }
        }
        lock(&shared.stats).record(cpu_time, frame_begin.elapsed());

        if cancelled {
            ctx.last_termination_reason = Some(TerminationReason::Cancelled);
            break;
        }
    }

    debug.update_markers(&ctx.step);
    match ctx.last_termination_reason {
        Some(TerminationReason::Cancelled) | None => {}
        Some(reason) => {
            info!(shared.logger, "execution stopped"; "reason" => ?reason, "pc" => format!("{:04X}", machine.cpu().regs.pc));
        }
    }
    // Pause/Stop have already moved the state on; anything else pauses here.
    let _ = shared.transition(&[MachineState::Running], MachineState::Paused);
    session
}
