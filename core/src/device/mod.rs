pub mod beeper;
pub mod ear;
pub mod keyboard;
pub mod screen;

pub use beeper::{BEEPER_SAMPLE_RATE, BeeperDevice};
pub use ear::{EarInput, PulseEar};
pub use keyboard::{KEYBOARD_INPUT_MAP, KeyboardDevice, SpectrumKey};
pub use screen::{
    PALETTE, RenderingTable, SCREEN_HEIGHT, SCREEN_WIDTH, ScreenConfig, ScreenDevice, TactInfo,
    TactPhase,
};
