#![allow(dead_code)]

use spectra_core::core::bus::InterruptState;
use spectra_core::core::{Bus, FrameBus};
use spectra_core::cpu::z80::Z80;

/// Minimal bus for testing: flat 64KB read/write memory, scripted ports,
/// optional fixed contention over 0x4000-0x7FFF, and a log of every
/// address the CPU put on the bus.
pub struct TestBus {
    pub memory: Box<[u8; 0x10000]>,
    /// Value returned by every port read.
    pub port_value: u8,
    pub io_writes: Vec<(u16, u8)>,
    pub io_reads: Vec<u16>,
    pub nmi: bool,
    pub irq: bool,
    pub irq_vector: u8,
    /// Extra tacts for every access in 0x4000-0x7FFF.
    pub contention: u32,
    /// Addresses reported through `memory_delay`, one per T-cycle group.
    pub accesses: Vec<u16>,
    pub frame_tacts: u32,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            port_value: 0xFF,
            io_writes: Vec::new(),
            io_reads: Vec::new(),
            nmi: false,
            irq: false,
            irq_vector: 0xFF,
            contention: 0,
            accesses: Vec::new(),
            frame_tacts: 69_888,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.io_reads.push(port);
        self.port_value
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.io_writes.push((port, data));
    }

    fn memory_delay(&mut self, addr: u16, _tacts: u64) -> u32 {
        self.accesses.push(addr);
        if (0x4000..0x8000).contains(&addr) { self.contention } else { 0 }
    }

    fn check_interrupts(&self, _tacts: u64) -> InterruptState {
        InterruptState {
            nmi: self.nmi,
            irq: self.irq,
            irq_vector: self.irq_vector,
        }
    }
}

impl FrameBus for TestBus {
    fn frame_tacts(&self) -> u32 {
        self.frame_tacts
    }

    fn partition_of(&self, addr: u16) -> i32 {
        (addr >> 14) as i32
    }

    fn peek(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }
}

/// Execute one instruction and return the T-states it took.
pub fn run_instruction(cpu: &mut Z80, bus: &mut TestBus) -> u64 {
    let start = cpu.tacts;
    cpu.execute_cycle(bus);
    cpu.tacts - start
}

/// A CPU with all registers and flags zeroed, PC at `pc`, SP at 0xF000.
pub fn cpu_at(pc: u16) -> Z80 {
    let mut cpu = Z80::new();
    cpu.regs.a = 0;
    cpu.regs.f = 0;
    cpu.regs.sp = 0xF000;
    cpu.regs.pc = pc;
    cpu
}
