pub mod registry;
pub mod rom_loader;
pub mod simplez80;
pub mod spectrum;

pub use simplez80::SimpleZ80System;
pub use spectrum::{SpectrumMachine, SpectrumModel};
