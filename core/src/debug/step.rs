use std::collections::VecDeque;

use crate::core::context::{DebugStepMode, TerminationReason};
use crate::cpu::z80::{Decoded, Flow, FlowEvent};

/// Maximum depth of the step-out shadow stack. The oldest entry is dropped beyond it.
pub const SHADOW_STACK_LIMIT: usize = 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum StepPlan {
    #[default]
    None,
    Into,
    OverTo(u16),
    OverHalt,
    Out { depth: usize },
}

/// Per-session step tracking: the shadow call stack, the breakpoint most
/// recently stopped at, and the stopping condition of the current step request.
#[derive(Clone, Debug, Default)]
pub struct StepTracker {
    stack: VecDeque<u16>,
    pub last_breakpoint: Option<u16>,
    /// Address step-out is expected to return to.
    pub imminent_breakpoint: Option<u16>,
    plan: StepPlan,
    armed: bool,
    executed: u64,
    returned_out: bool,
}

impl StepTracker {
    pub(crate) fn begin_run(&mut self) {
        self.plan = StepPlan::None;
        self.armed = false;
        self.executed = 0;
        self.returned_out = false;
    }

    /// Forget all call tracking (machine reset or controller stop).
    pub fn reset(&mut self) {
        self.begin_run();
        self.stack.clear();
        self.last_breakpoint = None;
        self.imminent_breakpoint = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Fix the stopping condition from the instruction at `pc` when the run starts.
    pub fn arm(&mut self, mode: DebugStepMode, pc: u16, current: Decoded) {
        self.plan = match mode {
            DebugStepMode::StepInto => StepPlan::Into,
            DebugStepMode::StepOver => match current.descriptor.flow {
                Flow::Call | Flow::Restart | Flow::Loop | Flow::Repeat => {
                    StepPlan::OverTo(pc.wrapping_add(current.length as u16))
                }
                Flow::Halt => StepPlan::OverHalt,
                _ => StepPlan::Into,
            },
            DebugStepMode::StepOut => {
                self.imminent_breakpoint = self.stack.back().copied();
                StepPlan::Out { depth: self.stack.len() }
            }
            DebugStepMode::NoDebug | DebugStepMode::StopAtBreakpoint => StepPlan::None,
        };
        self.armed = true;
    }

    /// Account for one completed execution cycle.
    pub fn record(&mut self, flow: FlowEvent) {
        self.executed += 1;
        self.last_breakpoint = None;
        match flow {
            FlowEvent::None => {}
            FlowEvent::Call { return_addr } => {
                if self.stack.len() == SHADOW_STACK_LIMIT {
                    self.stack.pop_front();
                }
                self.stack.push_back(return_addr);
            }
            FlowEvent::Return => {
                self.stack.pop_back();
                if let StepPlan::Out { depth } = self.plan
                    && (depth == 0 || self.stack.len() < depth)
                {
                    self.returned_out = true;
                }
            }
        }
    }

    /// Breakpoints are ignored at the address just stopped at until something executes.
    pub fn breakpoint_allowed(&self, pc: u16) -> bool {
        self.executed > 0 || self.last_breakpoint != Some(pc)
    }

    /// Evaluate the step condition at an instruction boundary.
    pub fn step_reached(&self, pc: u16, halted: bool) -> Option<TerminationReason> {
        if self.executed == 0 {
            return None;
        }
        let reached = match self.plan {
            StepPlan::None => false,
            StepPlan::Into => true,
            StepPlan::OverTo(target) => pc == target,
            StepPlan::OverHalt => !halted,
            StepPlan::Out { .. } => self.returned_out,
        };
        reached.then_some(TerminationReason::StepCompleted { address: pc })
    }
}
