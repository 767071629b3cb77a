use crate::core::Bus;
use crate::core::context::{DebugStepMode, ExecutionContext, TerminationMode, TerminationReason};
use crate::cpu::z80::{Z80, decode};

/// Bus extension used by the frame loop.
pub trait FrameBus: Bus {
    /// Nominal frame length in tacts at multiplier 1.
    fn frame_tacts(&self) -> u32;

    /// A new frame starts at CPU clock `frame_start`, running `multiplier` times faster.
    fn begin_frame(&mut self, _frame_start: u64, _multiplier: u32) {}

    /// The frame finished; flush rendering and audio.
    fn end_frame(&mut self) {}

    /// Memory partition paged in at `addr` (ROM pages < 0, RAM banks >= 0).
    fn partition_of(&self, _addr: u16) -> i32 {
        0
    }

    /// Side-effect-free read for decoding.
    fn peek(&self, addr: u16) -> u8;
}

/// Drives the CPU through frames, carrying overflow tacts across boundaries.
#[derive(Clone, Debug)]
pub struct FrameEngine {
    frame_start: u64,
    overflow: u64,
    multiplier: u32,
    pending_multiplier: u32,
    frame_completed: bool,
    frames: u64,
}

impl Default for FrameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEngine {
    pub fn new() -> Self {
        Self {
            frame_start: 0,
            overflow: 0,
            multiplier: 1,
            pending_multiplier: 1,
            frame_completed: true,
            frames: 0,
        }
    }

    /// Reset frame bookkeeping to CPU clock 0. The multiplier setting survives.
    pub fn reset(&mut self) {
        self.frame_start = 0;
        self.overflow = 0;
        self.frame_completed = true;
        self.frames = 0;
    }

    /// Start a fresh frame at CPU clock 0, as after a soft reset. The frame
    /// counter survives.
    pub fn restart_frame(&mut self) {
        self.frame_start = 0;
        self.overflow = 0;
        self.frame_completed = true;
    }

    /// Takes effect at the next frame boundary. Values below 1 are clamped.
    pub fn set_clock_multiplier(&mut self, multiplier: u32) {
        self.pending_multiplier = multiplier.max(1);
    }

    pub fn clock_multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn frame_completed(&self) -> bool {
        self.frame_completed
    }

    /// Tacts the last completed frame ran past its nominal end.
    pub fn frame_overflow(&self) -> u64 {
        self.overflow
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn frame_start(&self) -> u64 {
        self.frame_start
    }

    /// Execute until the frame ends or the context asks to stop.
    /// Returns true when the frame completed.
    pub fn execute_frame<B: FrameBus + ?Sized>(
        &mut self,
        cpu: &mut Z80,
        bus: &mut B,
        ctx: &mut ExecutionContext,
    ) -> bool {
        if self.frame_completed {
            self.multiplier = self.pending_multiplier;
            bus.begin_frame(self.frame_start, self.multiplier);
            self.frame_completed = false;
        }
        let frame_len = bus.frame_tacts() as u64 * self.multiplier as u64;

        let debug_run = ctx.is_debug_run();
        if debug_run && !ctx.step.is_armed() {
            let pc = cpu.regs.pc;
            let bytes = [0, 1, 2, 3].map(|i| bus.peek(pc.wrapping_add(i)));
            ctx.step.arm(ctx.debug_step_mode, pc, decode(bytes));
        }

        loop {
            if cpu.at_instruction_boundary()
                && let Some(reason) = self.check_termination(cpu, bus, ctx)
            {
                if let TerminationReason::Breakpoint { address } = reason {
                    ctx.step.last_breakpoint = Some(address);
                }
                ctx.last_termination_reason = Some(reason);
                return false;
            }

            cpu.execute_cycle(bus);
            ctx.step.record(cpu.flow);

            let rel = cpu.tacts - self.frame_start;
            if rel >= frame_len {
                self.overflow = rel - frame_len;
                self.frame_start += frame_len;
                self.frame_completed = true;
                self.frames += 1;
                bus.end_frame();
                ctx.last_termination_reason = Some(TerminationReason::FrameCompleted);
                return true;
            }

            if debug_run && ctx.cancellation.is_cancelled() {
                ctx.last_termination_reason = Some(TerminationReason::Cancelled);
                return false;
            }
        }
    }

    fn check_termination<B: FrameBus + ?Sized>(
        &self,
        cpu: &Z80,
        bus: &B,
        ctx: &ExecutionContext,
    ) -> Option<TerminationReason> {
        let pc = cpu.regs.pc;
        match ctx.termination_mode {
            TerminationMode::Normal => None,
            TerminationMode::UntilExecutionPoint => {
                let at_point = ctx.termination_point == Some(pc)
                    && ctx.termination_partition.is_none_or(|p| p == bus.partition_of(pc));
                at_point.then_some(TerminationReason::ExecutionPointReached { address: pc })
            }
            TerminationMode::DebugEvent => {
                if ctx.debug_step_mode == DebugStepMode::NoDebug {
                    return None;
                }
                // Stepping only honours breakpoints once it has moved off the start address.
                let may_break = match ctx.debug_step_mode {
                    DebugStepMode::StopAtBreakpoint => ctx.step.breakpoint_allowed(pc),
                    _ => ctx.step.instructions_executed() > 0,
                };
                if may_break && ctx.breakpoints.should_break(pc, bus.partition_of(pc))
                {
                    return Some(TerminationReason::Breakpoint { address: pc });
                }
                ctx.step.step_reached(pc, cpu.halted())
            }
        }
    }
}
