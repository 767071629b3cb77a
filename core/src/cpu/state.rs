//! CPU state snapshot types and traits

use crate::cpu::z80::{Prefix, Registers};

/// Trait for CPU types that can provide state snapshots
pub trait CpuStateTrait {
    type Snapshot;
    fn snapshot(&self) -> Self::Snapshot;
}

/// Z80 CPU state snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Z80State {
    pub regs: Registers,
    pub iff1: bool,      // Interrupt flip-flop 1
    pub iff2: bool,      // Interrupt flip-flop 2
    pub im: u8,          // Interrupt mode (0, 1, 2)
    pub signals: u8,     // Reset/interrupt/NMI/halted bit set
    pub tacts: u64,      // T-states since reset
    pub p: bool,         // LD A,I/R tracker
    pub q: u8,           // Copy of F when flags modified, 0 otherwise
    pub last_opcode: u8,
    pub prefix: Prefix,
}
