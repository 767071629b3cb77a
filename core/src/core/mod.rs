pub mod bus;
pub mod context;
pub mod frame;
pub mod machine;

pub use bus::{Bus, InterruptState};
pub use context::{
    CancellationToken, DebugStepMode, ExecutionContext, TerminationMode, TerminationReason,
};
pub use frame::{FrameBus, FrameEngine};
pub use machine::{InputButton, Machine};
