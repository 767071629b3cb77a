//! ZX Spectrum 48K, 128K and +3.

mod bus;
mod memory;
mod model;

use std::time::Duration;

use slog::Logger;
use spectra_core::core::machine::{InputButton, Machine};
use spectra_core::core::{ExecutionContext, FrameBus, FrameEngine};
use spectra_core::cpu::z80::Z80;
use spectra_core::device::{EarInput, KEYBOARD_INPUT_MAP, SCREEN_HEIGHT, SCREEN_WIDTH, SpectrumKey};

use crate::registry::MachineEntry;
use crate::rom_loader::{RomLoadError, RomSet};

pub use bus::SpectrumBus;
pub use memory::{Page, SpectrumMemory};
pub use model::{PAGE_SIZE, SpectrumModel};

pub struct SpectrumMachine {
    model: SpectrumModel,
    cpu: Z80,
    bus: SpectrumBus,
    engine: FrameEngine,
}

impl SpectrumMachine {
    /// Build a powered-on machine from the model's ROM pages laid out back to back.
    pub fn new(model: SpectrumModel, rom: Vec<u8>, logger: Logger) -> Self {
        let logger = logger.new(slog::o!("model" => model.name()));
        let mut machine = Self {
            model,
            cpu: Z80::new(),
            bus: SpectrumBus::new(model, rom, logger),
            engine: FrameEngine::new(),
        };
        machine.hard_reset();
        machine
    }

    pub fn from_rom_set(
        model: SpectrumModel,
        rom_set: &RomSet,
        logger: Logger,
    ) -> Result<Self, RomLoadError> {
        let rom = model.rom_region().load(rom_set)?;
        Ok(Self::new(model, rom, logger))
    }

    pub fn model(&self) -> SpectrumModel {
        self.model
    }

    pub fn memory(&self) -> &SpectrumMemory {
        &self.bus.memory
    }

    pub fn bus(&self) -> &SpectrumBus {
        &self.bus
    }

    /// Attach (or detach) a tape player or other EAR source.
    pub fn set_ear_input(&mut self, ear: Option<Box<dyn EarInput>>) {
        self.bus.set_ear_input(ear);
    }

    pub fn set_key(&mut self, key: SpectrumKey, pressed: bool) {
        self.bus.keyboard.set_key(key, pressed);
    }

    pub fn key_status(&self, key: SpectrumKey) -> bool {
        self.bus.keyboard.key_status(key)
    }

    pub fn border(&self) -> u8 {
        self.bus.screen.border()
    }
}

impl Machine for SpectrumMachine {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn frame_duration(&self) -> Duration {
        let nanos = self.frame_tacts() as u64 * 1_000_000_000 / self.model.clock_hz() as u64;
        Duration::from_nanos(nanos)
    }

    fn frame_tacts(&self) -> u32 {
        self.bus.frame_tacts()
    }

    fn execute_frame(&mut self, ctx: &mut ExecutionContext) -> bool {
        self.engine.execute_frame(&mut self.cpu, &mut self.bus, ctx)
    }

    fn frame_completed(&self) -> bool {
        self.engine.frame_completed()
    }

    fn frame_overflow(&self) -> u64 {
        self.engine.frame_overflow()
    }

    fn frame_count(&self) -> u64 {
        self.engine.frame_count()
    }

    fn set_clock_multiplier(&mut self, multiplier: u32) {
        self.engine.set_clock_multiplier(multiplier);
    }

    fn clock_multiplier(&self) -> u32 {
        self.engine.clock_multiplier()
    }

    fn hard_reset(&mut self) {
        self.cpu.hard_reset();
        self.bus.reset();
        self.engine.reset();
    }

    /// The reset button: CPU and paging latches, RAM survives.
    fn soft_reset(&mut self) {
        self.cpu.soft_reset();
        self.engine.restart_frame();
        self.bus.memory.reset_paging();
    }

    fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        self.bus.screen.render_rgb(buffer);
    }

    fn pixel_buffer(&self) -> &[u8] {
        self.bus.screen.pixels()
    }

    fn audio_samples(&self) -> &[i16] {
        self.bus.beeper.samples()
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        if let Some(key) = SpectrumKey::from_id(button) {
            self.set_key(key, pressed);
        }
    }

    fn input_map(&self) -> &[InputButton] {
        KEYBOARD_INPUT_MAP
    }

    fn read_memory(&self, addr: u16) -> u8 {
        self.bus.memory.read(addr)
    }

    fn write_memory(&mut self, addr: u16, data: u8) {
        self.bus.memory.write(addr, data);
    }

    fn partition(&self, index: i32) -> Option<&[u8]> {
        self.bus.memory.partition(index)
    }

    fn contention_frame(&self) -> u64 {
        self.bus.contention_frame()
    }

    fn contention_total(&self) -> u64 {
        self.bus.contention_total()
    }
}

fn create(
    model: SpectrumModel,
    rom_set: &RomSet,
    logger: Logger,
) -> Result<Box<dyn Machine>, RomLoadError> {
    Ok(Box::new(SpectrumMachine::from_rom_set(model, rom_set, logger)?))
}

fn create_48k(rom_set: &RomSet, logger: Logger) -> Result<Box<dyn Machine>, RomLoadError> {
    create(SpectrumModel::Zx48, rom_set, logger)
}

fn create_128k(rom_set: &RomSet, logger: Logger) -> Result<Box<dyn Machine>, RomLoadError> {
    create(SpectrumModel::Zx128, rom_set, logger)
}

fn create_plus3(rom_set: &RomSet, logger: Logger) -> Result<Box<dyn Machine>, RomLoadError> {
    create(SpectrumModel::Plus3, rom_set, logger)
}

inventory::submit! {
    MachineEntry::new("48k", "spec48", "ZX Spectrum 48K", create_48k)
}

inventory::submit! {
    MachineEntry::new("128k", "spec128", "ZX Spectrum 128K", create_128k)
}

inventory::submit! {
    MachineEntry::new("plus3", "specpl3", "ZX Spectrum +3", create_plus3)
}
