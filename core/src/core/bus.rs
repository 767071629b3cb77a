/// Interrupt lines sampled by the CPU at an instruction boundary.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct InterruptState {
    /// Non-maskable interrupt line. The CPU latches its rising edge.
    pub nmi: bool,
    /// Maskable interrupt line (level-triggered, gated by IFF1).
    pub irq: bool,
    /// Byte the interrupting device places on the data bus (IM 2 vector low byte).
    pub irq_vector: u8,
}

/// Memory and I/O interface the Z80 engine executes against.
///
/// Timing is driven by the CPU: before every memory access the engine asks
/// [`memory_delay`](Self::memory_delay) how many extra tacts the access is
/// stalled for, and before every I/O access it asks [`io_tacts`](Self::io_tacts)
/// for the complete length of the I/O cycle. Both receive the CPU clock at the
/// start of the access, so implementations can use them to follow the clock
/// (for example to catch up screen rendering before a write lands).
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    /// Read from the I/O port address space. Unattached ports float high.
    fn io_read(&mut self, _port: u16) -> u8 {
        0xFF
    }

    fn io_write(&mut self, _port: u16, _data: u8) {}

    /// Extra tacts inserted before an access to `addr` starting at CPU clock `tacts`.
    /// Also used for internal cycles that leave `addr` on the address bus.
    fn memory_delay(&mut self, _addr: u16, _tacts: u64) -> u32 {
        0
    }

    /// Total tacts of an I/O cycle on `port` starting at CPU clock `tacts`,
    /// contention included. An uncontended cycle is 4 tacts.
    fn io_tacts(&mut self, _port: u16, _tacts: u64) -> u32 {
        4
    }

    /// Sample the interrupt lines at CPU clock `tacts`.
    fn check_interrupts(&self, _tacts: u64) -> InterruptState {
        InterruptState::default()
    }
}
