mod alu;
mod bit;
mod block;
mod branch;
mod load_store;
pub mod registers;
mod stack;
pub mod tables;

use crate::core::Bus;
use crate::cpu::state::{CpuStateTrait, Z80State};
pub use registers::Registers;
pub use tables::{Decoded, Fetch, Flow, Op, OpDescriptor, Prefix, decode};
use tables::{CB, ED, INDEXED, MAIN};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Undocumented (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Undocumented (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// CPU signal lines, kept as a bit set in [`Z80::signals`].
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Reset = 0x01,
    Interrupt = 0x02,
    Nmi = 0x04,
    Halted = 0x08,
}

/// Control transfer performed by the most recent execution cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowEvent {
    #[default]
    None,
    /// Taken call, RST, or accepted interrupt. `return_addr` is the pushed address.
    Call { return_addr: u16 },
    /// Taken RET, RET cc, RETI or RETN.
    Return,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexMode {
    HL,
    IX,
    IY,
}

pub struct Z80 {
    pub regs: Registers,

    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub signals: u8,
    /// T-states executed since the last reset.
    pub tacts: u64,
    pub ei_delay: bool,
    pub p: bool,           // Set after LD A,I / LD A,R for interrupt PV behavior
    pub q: u8,             // Copy of F when instruction modifies flags, 0 otherwise (for SCF/CCF X/Y)
    pub(crate) prev_q: u8, // Previous instruction's q value
    pub last_opcode: u8,
    pub prefix: Prefix,
    pub flow: FlowEvent,

    pub(crate) index_mode: IndexMode,
    /// A DD/FD prefix was fetched and the next cycle continues the same instruction.
    pub(crate) prefix_pending: bool,
    pub(crate) nmi_previous: bool,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            iff1: false,
            iff2: false,
            im: 0,
            signals: 0,
            tacts: 0,
            ei_delay: false,
            p: false,
            q: 0,
            prev_q: 0,
            last_opcode: 0,
            prefix: Prefix::None,
            flow: FlowEvent::None,
            index_mode: IndexMode::HL,
            prefix_pending: false,
            nmi_previous: false,
        };
        cpu.hard_reset();
        cpu
    }

    /// Power-on reset: all registers cleared except AF and SP, which read all-ones.
    pub fn hard_reset(&mut self) {
        self.regs = Registers { a: 0xFF, f: 0xFF, sp: 0xFFFF, ..Default::default() };
        self.tacts = 0;
        self.reset_control();
    }

    /// Like [`hard_reset`](Self::hard_reset) but BC, DE, HL, IX, IY and the
    /// shadow set keep their values.
    pub fn soft_reset(&mut self) {
        self.reset_line();
        self.tacts = 0;
    }

    /// The RESET pin sampled mid-run: registers as for a soft reset, while the
    /// clock keeps counting.
    fn reset_line(&mut self) {
        self.regs.set_af(0xFFFF);
        self.regs.sp = 0xFFFF;
        self.regs.pc = 0;
        self.regs.wz = 0;
        self.regs.i = 0;
        self.regs.r = 0;
        self.reset_control();
    }

    fn reset_control(&mut self) {
        self.iff1 = false;
        self.iff2 = false;
        self.im = 0;
        self.signals = 0;
        self.ei_delay = false;
        self.p = false;
        self.q = 0;
        self.prev_q = 0;
        self.last_opcode = 0;
        self.prefix = Prefix::None;
        self.flow = FlowEvent::None;
        self.index_mode = IndexMode::HL;
        self.prefix_pending = false;
        self.nmi_previous = false;
    }

    /// Assert the RESET line; a soft reset happens at the next cycle.
    pub fn request_reset(&mut self) {
        self.set_signal(Signal::Reset, true);
    }

    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals & signal as u8 != 0
    }

    pub(crate) fn set_signal(&mut self, signal: Signal, on: bool) {
        if on {
            self.signals |= signal as u8;
        } else {
            self.signals &= !(signal as u8);
        }
    }

    pub fn halted(&self) -> bool {
        self.has_signal(Signal::Halted)
    }

    /// True when the last cycle performed a return.
    pub fn ret_executed(&self) -> bool {
        self.flow == FlowEvent::Return
    }

    /// False while a DD/FD prefix chain is in progress.
    pub fn at_instruction_boundary(&self) -> bool {
        !self.prefix_pending
    }

    // --- Flag helpers ---

    #[inline]
    pub(crate) fn flag(&self, flag: Flag) -> bool {
        self.regs.f & flag as u8 != 0
    }

    /// Store a freshly computed flag byte.
    #[inline]
    pub(crate) fn set_flags(&mut self, f: u8) {
        self.regs.f = f;
        self.q = f;
    }

    // --- Register index helpers ---

    pub fn get_reg8(&self, index: u8) -> u8 {
        match index {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => unreachable!("get_reg8 called with index {}", index),
        }
    }

    pub fn set_reg8(&mut self, index: u8, val: u8) {
        match index {
            0 => self.regs.b = val,
            1 => self.regs.c = val,
            2 => self.regs.d = val,
            3 => self.regs.e = val,
            4 => self.regs.h = val,
            5 => self.regs.l = val,
            7 => self.regs.a = val,
            _ => unreachable!("set_reg8 called with index {}", index),
        }
    }

    /// 8-bit register by index, with H/L replaced by IXH/IXL or IYH/IYL under a DD/FD prefix.
    /// Index 6 is not a register; callers handle (HL)/(IX+d)/(IY+d) themselves.
    pub(crate) fn get_reg8_ix(&self, index: u8) -> u8 {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => self.regs.ixh(),
            (5, IndexMode::IX) => self.regs.ixl(),
            (4, IndexMode::IY) => self.regs.iyh(),
            (5, IndexMode::IY) => self.regs.iyl(),
            _ => self.get_reg8(index),
        }
    }

    pub(crate) fn set_reg8_ix(&mut self, index: u8, val: u8) {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => self.regs.set_ixh(val),
            (5, IndexMode::IX) => self.regs.set_ixl(val),
            (4, IndexMode::IY) => self.regs.set_iyh(val),
            (5, IndexMode::IY) => self.regs.set_iyl(val),
            _ => self.set_reg8(index, val),
        }
    }

    /// HL, IX or IY depending on the active prefix.
    pub(crate) fn index_reg(&self) -> u16 {
        match self.index_mode {
            IndexMode::HL => self.regs.get_hl(),
            IndexMode::IX => self.regs.ix,
            IndexMode::IY => self.regs.iy,
        }
    }

    pub(crate) fn set_index_reg(&mut self, val: u16) {
        match self.index_mode {
            IndexMode::HL => self.regs.set_hl(val),
            IndexMode::IX => self.regs.ix = val,
            IndexMode::IY => self.regs.iy = val,
        }
    }

    /// Register pair by index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    pub(crate) fn get_rp(&self, index: u8) -> u16 {
        match index {
            0 => self.regs.get_bc(),
            1 => self.regs.get_de(),
            2 => self.index_reg(),
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_rp(&mut self, index: u8, val: u16) {
        match index {
            0 => self.regs.set_bc(val),
            1 => self.regs.set_de(val),
            2 => self.set_index_reg(val),
            _ => self.regs.sp = val,
        }
    }

    /// Register pair for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn get_rp_af(&self, index: u8) -> u16 {
        if index == 3 { self.regs.get_af() } else { self.get_rp(index) }
    }

    pub(crate) fn set_rp_af(&mut self, index: u8, val: u16) {
        if index == 3 { self.regs.set_af(val) } else { self.set_rp(index, val) }
    }

    // --- Bus cycles ---
    //
    // Every M-cycle reports the address it places on the bus so the machine can
    // apply contention before the access lands.

    #[inline]
    fn contend<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) {
        self.tacts += bus.memory_delay(addr, self.tacts) as u64;
    }

    /// M1: opcode read plus refresh, 4 T.
    pub(crate) fn fetch_opcode<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        self.contend(bus, pc);
        let op = bus.read(pc);
        self.tacts += 4;
        self.regs.pc = pc.wrapping_add(1);
        self.regs.refresh();
        op
    }

    /// Memory read cycle, 3 T.
    pub(crate) fn read_mem<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u8 {
        self.contend(bus, addr);
        let val = bus.read(addr);
        self.tacts += 3;
        val
    }

    /// Memory write cycle, 3 T.
    pub(crate) fn write_mem<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, val: u8) {
        self.contend(bus, addr);
        bus.write(addr, val);
        self.tacts += 3;
    }

    /// `count` internal 1 T cycles with `addr` left on the bus.
    pub(crate) fn internal<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, count: u32) {
        for _ in 0..count {
            self.contend(bus, addr);
            self.tacts += 1;
        }
    }

    pub(crate) fn fetch_byte<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        let val = self.read_mem(bus, pc);
        self.regs.pc = pc.wrapping_add(1);
        val
    }

    pub(crate) fn fetch_word<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn port_in<B: Bus + ?Sized>(&mut self, bus: &mut B, port: u16) -> u8 {
        let tacts = bus.io_tacts(port, self.tacts);
        let val = bus.io_read(port);
        self.tacts += tacts as u64;
        val
    }

    pub(crate) fn port_out<B: Bus + ?Sized>(&mut self, bus: &mut B, port: u16, val: u8) {
        let tacts = bus.io_tacts(port, self.tacts);
        bus.io_write(port, val);
        self.tacts += tacts as u64;
    }

    /// Effective address of the `(HL)` operand. Under DD/FD this fetches the
    /// displacement and spends the 5 T address computation.
    pub(crate) fn memory_operand<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        if self.index_mode == IndexMode::HL {
            return self.regs.get_hl();
        }
        let d = self.fetch_byte(bus) as i8;
        self.internal(bus, self.regs.pc.wrapping_sub(1), 5);
        let addr = self.index_reg().wrapping_add(d as i16 as u16);
        self.regs.wz = addr;
        addr
    }

    // --- Execution ---

    /// Execute one complete instruction, or accept one interrupt.
    pub fn execute_cycle<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.flow = FlowEvent::None;

        if self.prefix_pending {
            self.prefix_pending = false;
            self.execute_indexed(bus);
            return;
        }

        if self.has_signal(Signal::Reset) {
            self.reset_line();
            self.tacts += 3;
            return;
        }

        if self.ei_delay {
            self.ei_delay = false;
        } else if self.accept_interrupt(bus) {
            return;
        }

        self.prefix = Prefix::None;
        self.index_mode = IndexMode::HL;
        self.p = false;
        self.prev_q = self.q;
        self.q = 0;

        if self.halted() {
            // HALT re-executes NOPs without advancing PC.
            let pc = self.regs.pc;
            self.contend(bus, pc);
            self.tacts += 4;
            self.regs.refresh();
            return;
        }

        let opcode = self.fetch_opcode(bus);
        self.last_opcode = opcode;
        match opcode {
            0xCB => {
                let op = self.fetch_opcode(bus);
                self.prefix = Prefix::Cb;
                self.last_opcode = op;
                self.execute_cb(&CB[op as usize], op, bus);
            }
            0xED => {
                let op = self.fetch_opcode(bus);
                self.prefix = Prefix::Ed;
                self.last_opcode = op;
                self.execute_ed(&ED[op as usize], op, bus);
            }
            0xDD | 0xFD => {
                self.select_index(opcode);
                self.execute_indexed(bus);
            }
            _ => self.execute(&MAIN[opcode as usize], opcode, bus),
        }
    }

    fn select_index(&mut self, prefix: u8) {
        if prefix == 0xDD {
            self.index_mode = IndexMode::IX;
            self.prefix = Prefix::Dd;
        } else {
            self.index_mode = IndexMode::IY;
            self.prefix = Prefix::Fd;
        }
    }

    /// Continue after a DD/FD prefix.
    fn execute_indexed<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let op = self.fetch_opcode(bus);
        self.last_opcode = op;
        match op {
            0xDD | 0xFD => {
                // The earlier prefix acts as a 4 T no-op; the latest one wins.
                self.select_index(op);
                self.prefix_pending = true;
            }
            0xED => {
                self.index_mode = IndexMode::HL;
                self.prefix = Prefix::Ed;
                let ed = self.fetch_opcode(bus);
                self.last_opcode = ed;
                self.execute_ed(&ED[ed as usize], ed, bus);
            }
            0xCB => self.execute_index_cb(bus),
            _ => self.execute(&INDEXED[op as usize], op, bus),
        }
    }

    fn execute<B: Bus + ?Sized>(&mut self, desc: &OpDescriptor, opcode: u8, bus: &mut B) {
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let p = y >> 1;
        match desc.op {
            Op::Nop => {}
            Op::LdRpNn => self.op_ld_rp_nn(p, bus),
            Op::LdIndA => self.op_ld_ind_a(p, bus),
            Op::LdAInd => self.op_ld_a_ind(p, bus),
            Op::LdNnHl => self.op_ld_nn_hl(bus),
            Op::LdHlNn => self.op_ld_hl_nn(bus),
            Op::LdNnA => self.op_ld_nn_a(bus),
            Op::LdANn => self.op_ld_a_nn(bus),
            Op::IncRp => self.op_inc_dec_rp(p, true, bus),
            Op::DecRp => self.op_inc_dec_rp(p, false, bus),
            Op::IncR => self.op_inc_dec_r(y, true),
            Op::DecR => self.op_inc_dec_r(y, false),
            Op::IncMem => self.op_inc_dec_mem(true, bus),
            Op::DecMem => self.op_inc_dec_mem(false, bus),
            Op::LdRN => self.op_ld_r_n(y, bus),
            Op::LdMemN => self.op_ld_mem_n(bus),
            Op::Rlca | Op::Rrca | Op::Rla | Op::Rra => self.op_rotate_a(y),
            Op::ExAf => self.regs.exchange_af(),
            Op::AddHlRp => self.op_add_hl_rp(p, bus),
            Op::Djnz => self.op_djnz(bus),
            Op::Jr => self.op_jr(bus),
            Op::JrCc => self.op_jr_cc(y - 4, bus),
            Op::Daa => self.op_daa(),
            Op::Cpl => self.op_cpl(),
            Op::Scf => self.op_scf(),
            Op::Ccf => self.op_ccf(),
            Op::LdRR => self.op_ld_r_r(y, z),
            Op::LdRMem => self.op_ld_r_mem(y, bus),
            Op::LdMemR => self.op_ld_mem_r(z, bus),
            Op::Halt => self.set_signal(Signal::Halted, true),
            Op::AluR => {
                let val = self.get_reg8_ix(z);
                self.perform_alu_op(y, val);
            }
            Op::AluMem => {
                let addr = self.memory_operand(bus);
                let val = self.read_mem(bus, addr);
                self.perform_alu_op(y, val);
            }
            Op::AluN => {
                let val = self.fetch_byte(bus);
                self.perform_alu_op(y, val);
            }
            Op::RetCc => self.op_ret_cc(y, bus),
            Op::Pop => self.op_pop(p, bus),
            Op::JpCc => self.op_jp_cc(y, bus),
            Op::Jp => self.op_jp(bus),
            Op::CallCc => self.op_call_cc(y, bus),
            Op::Call => self.op_call(bus),
            Op::Push => self.op_push(p, bus),
            Op::Rst => self.op_rst(y, bus),
            Op::Ret => self.op_ret(bus),
            Op::Exx => self.regs.exchange_main(),
            Op::JpHl => self.regs.pc = self.index_reg(),
            Op::LdSpHl => {
                let ir = self.regs.get_ir();
                self.internal(bus, ir, 2);
                self.regs.sp = self.index_reg();
            }
            Op::ExSpHl => self.op_ex_sp_hl(bus),
            Op::ExDeHl => {
                let de = self.regs.get_de();
                self.regs.set_de(self.regs.get_hl());
                self.regs.set_hl(de);
            }
            Op::OutNA => self.op_out_n_a(bus),
            Op::InAN => self.op_in_a_n(bus),
            Op::Di => {
                self.iff1 = false;
                self.iff2 = false;
            }
            Op::Ei => {
                self.iff1 = true;
                self.iff2 = true;
                self.ei_delay = true;
            }
            // Prefix bytes never reach the main dispatch.
            Op::PrefixCb | Op::PrefixDd | Op::PrefixEd | Op::PrefixFd => {}
            _ => unreachable!("{:?} dispatched from the main table", desc.op),
        }
    }

    fn execute_ed<B: Bus + ?Sized>(&mut self, desc: &OpDescriptor, opcode: u8, bus: &mut B) {
        let y = (opcode >> 3) & 0x07;
        let p = y >> 1;
        let dec = opcode & 0x08 != 0;
        match desc.op {
            Op::InRC => self.op_in_r_c(y, bus),
            Op::OutCR => self.op_out_c_r(y, bus),
            Op::SbcHl => self.op_sbc_hl(p, bus),
            Op::AdcHl => self.op_adc_hl(p, bus),
            Op::LdNnRp => self.op_ld_nn_rp(p, bus),
            Op::LdRpInd => self.op_ld_rp_ind_nn(p, bus),
            Op::Neg => self.op_neg(),
            Op::Retn => {
                self.iff1 = self.iff2;
                self.op_ret(bus);
            }
            Op::Im => self.im = [0, 0, 1, 2][(y & 3) as usize],
            Op::LdIA | Op::LdRA => {
                let ir = self.regs.get_ir();
                self.internal(bus, ir, 1);
                if desc.op == Op::LdIA {
                    self.regs.i = self.regs.a;
                } else {
                    self.regs.r = self.regs.a;
                }
            }
            Op::LdAI | Op::LdAR => self.op_ld_a_ir(desc.op == Op::LdAI, bus),
            Op::Rrd => self.op_rrd_rld(false, bus),
            Op::Rld => self.op_rrd_rld(true, bus),
            Op::Ldi => self.op_ldi(dec, false, bus),
            Op::Ldir => self.op_ldi(dec, true, bus),
            Op::Cpi => self.op_cpi(dec, false, bus),
            Op::Cpir => self.op_cpi(dec, true, bus),
            Op::Ini => self.op_ini(dec, false, bus),
            Op::Inir => self.op_ini(dec, true, bus),
            Op::Outi => self.op_outi(dec, false, bus),
            Op::Otir => self.op_outi(dec, true, bus),
            Op::EdNop => {}
            _ => unreachable!("{:?} dispatched from the ED table", desc.op),
        }
    }

    // --- Interrupts ---

    fn accept_interrupt<B: Bus + ?Sized>(&mut self, bus: &mut B) -> bool {
        let ints = bus.check_interrupts(self.tacts);

        // NMI: edge-triggered (higher priority than IRQ)
        if ints.nmi && !self.nmi_previous {
            self.set_signal(Signal::Nmi, true);
        }
        self.nmi_previous = ints.nmi;
        self.set_signal(Signal::Interrupt, ints.irq);

        if self.has_signal(Signal::Nmi) {
            self.set_signal(Signal::Nmi, false);
            self.nmi(bus);
            return true;
        }
        // IRQ: level-triggered, masked by IFF1
        if ints.irq && self.iff1 {
            self.irq(bus, ints.irq_vector);
            return true;
        }
        false
    }

    fn leave_halt(&mut self) {
        self.set_signal(Signal::Halted, false);
    }

    /// NMI response, 11 T: M1(5) + push(6), jump to 0x0066. IFF2 keeps the old IFF1.
    fn nmi<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.leave_halt();
        self.iff1 = false;
        self.p = false;
        self.prev_q = self.q;
        self.q = 0;
        let pc = self.regs.pc;
        self.contend(bus, pc);
        self.tacts += 5;
        self.regs.refresh();
        self.push_word(bus, pc);
        self.regs.pc = 0x0066;
        self.regs.wz = 0x0066;
        self.flow = FlowEvent::Call { return_addr: pc };
    }

    /// Maskable interrupt response. IM 0/1: 13 T to 0x0038. IM 2: 19 T through the vector table.
    fn irq<B: Bus + ?Sized>(&mut self, bus: &mut B, vector: u8) {
        self.leave_halt();
        self.iff1 = false;
        self.iff2 = false;
        if self.p {
            // Accepted right after LD A,I / LD A,R: P/V reads as reset.
            self.regs.f &= !(Flag::PV as u8);
        }
        self.p = false;
        self.prev_q = self.q;
        self.q = 0;
        // Acknowledge cycle: M1 with two wait states, not contended.
        self.tacts += 7;
        self.regs.refresh();
        let pc = self.regs.pc;
        self.push_word(bus, pc);
        let target = if self.im == 2 {
            let table = ((self.regs.i as u16) << 8) | vector as u16;
            let lo = self.read_mem(bus, table) as u16;
            let hi = self.read_mem(bus, table.wrapping_add(1)) as u16;
            (hi << 8) | lo
        } else {
            0x0038
        };
        self.regs.pc = target;
        self.regs.wz = target;
        self.flow = FlowEvent::Call { return_addr: pc };
    }
}

impl CpuStateTrait for Z80 {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            regs: self.regs.clone(),
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            signals: self.signals,
            tacts: self.tacts,
            p: self.p,
            q: self.q,
            last_opcode: self.last_opcode,
            prefix: self.prefix,
        }
    }
}
