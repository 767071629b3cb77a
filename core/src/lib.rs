pub mod controller;
pub mod core;
pub mod cpu;
pub mod debug;
pub mod device;

pub mod prelude {
    pub use crate::controller::{ControllerError, ControllerEvent, MachineController, MachineState};
    pub use crate::core::machine::{InputButton, Machine};
    pub use crate::core::{
        Bus, DebugStepMode, ExecutionContext, FrameBus, FrameEngine, TerminationMode,
        bus::InterruptState,
    };
    pub use crate::cpu::Z80;
    pub use crate::debug::{Breakpoint, DebugSupport};
}
