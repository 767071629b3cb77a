use std::time::Duration;

use spectra_core::core::bus::InterruptState;
use spectra_core::core::machine::{InputButton, Machine};
use spectra_core::core::{Bus, ExecutionContext, FrameBus, FrameEngine};
use spectra_core::cpu::{CpuStateTrait, Z80State, z80::Z80};

/// Flat 64K RAM bus with no contention. The only device is an optional
/// frame interrupt asserted for the first `irq_tacts` of every frame.
pub struct FlatBus {
    ram: Box<[u8; 0x10000]>,
    frame_tacts: u32,
    irq_tacts: u32,
    frame_start: u64,
    multiplier: u32,
    /// Value returned by every port read.
    pub port_value: u8,
    pub io_writes: Vec<(u16, u8)>,
}

impl Bus for FlatBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }

    fn io_read(&mut self, _port: u16) -> u8 {
        self.port_value
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.io_writes.push((port, data));
    }

    fn check_interrupts(&self, tacts: u64) -> InterruptState {
        let rel = tacts.saturating_sub(self.frame_start) / self.multiplier as u64;
        InterruptState {
            irq: rel < self.irq_tacts as u64,
            irq_vector: 0xFF,
            ..InterruptState::default()
        }
    }
}

impl FrameBus for FlatBus {
    fn frame_tacts(&self) -> u32 {
        self.frame_tacts
    }

    fn begin_frame(&mut self, frame_start: u64, multiplier: u32) {
        self.frame_start = frame_start;
        self.multiplier = multiplier.max(1);
    }

    fn partition_of(&self, addr: u16) -> i32 {
        (addr >> 14) as i32
    }

    fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }
}

/// A Z80 on flat RAM, for exercising the controller and debugger without ROMs.
pub struct SimpleZ80System {
    pub cpu: Z80,
    pub bus: FlatBus,
    engine: FrameEngine,
    program: Vec<(u16, Vec<u8>)>,
}

impl Default for SimpleZ80System {
    fn default() -> Self {
        Self::new(69_888)
    }
}

impl SimpleZ80System {
    pub fn new(frame_tacts: u32) -> Self {
        Self {
            cpu: Z80::new(),
            bus: FlatBus {
                ram: Box::new([0; 0x10000]),
                frame_tacts,
                irq_tacts: 0,
                frame_start: 0,
                multiplier: 1,
                port_value: 0xFF,
                io_writes: Vec::new(),
            },
            engine: FrameEngine::new(),
            program: Vec::new(),
        }
    }

    /// Assert IRQ for the first `tacts` of each frame (0 disables it).
    pub fn with_frame_interrupt(mut self, tacts: u32) -> Self {
        self.bus.irq_tacts = tacts;
        self
    }

    /// Copy `data` to `offset`. The program is reloaded on every hard reset.
    pub fn load_program(&mut self, offset: u16, data: &[u8]) {
        self.program.push((offset, data.to_vec()));
        self.copy_in(offset, data);
    }

    fn copy_in(&mut self, offset: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.bus.ram[offset.wrapping_add(i as u16) as usize] = byte;
        }
    }

    pub fn get_cpu_state(&self) -> Z80State {
        self.cpu.snapshot()
    }

    pub fn frame_start(&self) -> u64 {
        self.engine.frame_start()
    }
}

impl Machine for SimpleZ80System {
    fn name(&self) -> &str {
        "flat"
    }

    fn display_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn frame_duration(&self) -> Duration {
        // 3.5 MHz.
        Duration::from_nanos(self.bus.frame_tacts as u64 * 2_000 / 7)
    }

    fn frame_tacts(&self) -> u32 {
        self.bus.frame_tacts
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
        self.engine.reset();
        self.bus.ram.fill(0);
        self.bus.io_writes.clear();
        self.bus.frame_start = 0;
        for (offset, data) in std::mem::take(&mut self.program) {
            self.copy_in(offset, &data);
            self.program.push((offset, data));
        }
    }

    fn soft_reset(&mut self) {
        self.cpu.soft_reset();
        self.engine.restart_frame();
    }

    fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    fn render_frame(&self, _buffer: &mut [u8]) {}

    fn set_input(&mut self, _button: u8, _pressed: bool) {}

    fn input_map(&self) -> &[InputButton] {
        &[]
    }

    fn read_memory(&self, addr: u16) -> u8 {
        self.bus.ram[addr as usize]
    }

    fn write_memory(&mut self, addr: u16, data: u8) {
        self.bus.ram[addr as usize] = data;
    }

    fn partition(&self, index: i32) -> Option<&[u8]> {
        let index = usize::try_from(index).ok()?;
        self.bus.ram.get(index * 0x4000..(index + 1) * 0x4000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_core::core::{DebugStepMode, TerminationMode};

    #[test]
    fn hard_reset_reloads_the_program() {
        let mut system = SimpleZ80System::new(1_000);
        system.load_program(0x0000, &[0x3E, 0x42, 0x32, 0x00, 0x80, 0x18, 0xFE]);
        let mut ctx = ExecutionContext::new();
        ctx.prepare(TerminationMode::Normal, DebugStepMode::NoDebug);
        assert!(system.execute_frame(&mut ctx));
        assert_eq!(system.read_memory(0x8000), 0x42);

        system.hard_reset();
        assert_eq!(system.read_memory(0x8000), 0);
        assert_eq!(system.read_memory(0x0001), 0x42);
        assert_eq!(system.frame_count(), 0);
    }

    #[test]
    fn frame_interrupt_wakes_halt() {
        let mut system = SimpleZ80System::new(1_000).with_frame_interrupt(32);
        // IM 1; EI; HALT, with RET at 0x0038.
        system.load_program(0x0000, &[0xED, 0x56, 0xFB, 0x76, 0x18, 0xFD]);
        system.load_program(0x0038, &[0xFB, 0xC9]);
        system.cpu.regs.sp = 0xF000;
        let mut ctx = ExecutionContext::new();
        ctx.prepare(TerminationMode::Normal, DebugStepMode::NoDebug);

        assert!(system.execute_frame(&mut ctx));
        assert!(system.cpu.halted());
        assert!(system.execute_frame(&mut ctx));
        // The interrupt at the start of frame two woke the CPU, which halted again.
        assert!(system.cpu.halted());
        assert_eq!(system.cpu.regs.pc, 0x0004);
    }
}
