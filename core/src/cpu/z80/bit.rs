use crate::core::Bus;
use crate::cpu::z80::tables::{INDEXED_CB, Op, OpDescriptor, Prefix};
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    /// Perform CB rotate/shift operation on a value.
    /// op: 0=RLC, 1=RRC, 2=RL, 3=RR, 4=SLA, 5=SRA, 6=SLL(undoc), 7=SRL.
    /// Returns (result, new_flags). Flags: S, Z, PV(parity), C from shifted bit. H=0, N=0.
    fn do_cb_rotate_shift(&self, op: u8, val: u8) -> (u8, u8) {
        let old_c = self.flag(Flag::C) as u8;
        let (result, carry) = match op {
            0 => (val.rotate_left(1), val >> 7),
            1 => (val.rotate_right(1), val & 1),
            2 => ((val << 1) | old_c, val >> 7),
            3 => ((val >> 1) | (old_c << 7), val & 1),
            4 => (val << 1, val >> 7),
            5 => (((val as i8) >> 1) as u8, val & 1),
            6 => ((val << 1) | 1, val >> 7),
            _ => (val >> 1, val & 1),
        };

        let mut f = Self::szp_flags(result);
        if carry != 0 {
            f |= Flag::C as u8;
        }
        (result, f)
    }

    /// BIT b flags. X/Y come from `xy_source`: the register for BIT b,r and
    /// the high byte of WZ for the memory forms.
    fn bit_flags(&mut self, bit: u8, val: u8, xy_source: u8) {
        let tested = val & (1 << bit);
        let mut f = (self.regs.f & Flag::C as u8) | Flag::H as u8;
        f |= xy_source & (Flag::X as u8 | Flag::Y as u8);
        if tested == 0 {
            f |= Flag::Z as u8 | Flag::PV as u8;
        }
        if tested & 0x80 != 0 {
            f |= Flag::S as u8;
        }
        self.set_flags(f);
    }

    /// Rotate/shift, RES or SET on `val`; BIT is handled separately.
    fn cb_result(&mut self, op: Op, y: u8, val: u8) -> u8 {
        match op {
            Op::Rot | Op::RotMem => {
                let (result, f) = self.do_cb_rotate_shift(y, val);
                self.set_flags(f);
                result
            }
            Op::Res | Op::ResMem => val & !(1 << y),
            _ => val | (1 << y),
        }
    }

    /// CB-prefixed instructions.
    /// Register forms: 8 T. BIT b,(HL): 12 T (hl:3, hl:1).
    /// Rotate/shift/SET/RES (HL): 15 T (hl:3, hl:1, hl:3).
    pub(crate) fn execute_cb<B: Bus + ?Sized>(&mut self, desc: &OpDescriptor, opcode: u8, bus: &mut B) {
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        match desc.op {
            Op::Bit => {
                let val = self.get_reg8(z);
                self.bit_flags(y, val, val);
            }
            Op::BitMem => {
                let addr = self.regs.get_hl();
                let val = self.read_mem(bus, addr);
                self.internal(bus, addr, 1);
                self.bit_flags(y, val, (self.regs.wz >> 8) as u8);
            }
            Op::Rot | Op::Res | Op::Set => {
                let val = self.get_reg8(z);
                let result = self.cb_result(desc.op, y, val);
                self.set_reg8(z, result);
            }
            _ => {
                let addr = self.regs.get_hl();
                let val = self.read_mem(bus, addr);
                self.internal(bus, addr, 1);
                let result = self.cb_result(desc.op, y, val);
                self.write_mem(bus, addr, result);
            }
        }
    }

    /// DD CB d op / FD CB d op.
    /// pc+2:3 (d), pc+3:3 (op, not an M1), pc+3:1 ×2, then the memory operation.
    /// BIT: 20 T. Others: 23 T, with the result also copied to register z when z != 6.
    pub(crate) fn execute_index_cb<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let d = self.fetch_byte(bus) as i8;
        let opcode = self.fetch_byte(bus);
        self.internal(bus, self.regs.pc.wrapping_sub(1), 2);
        let addr = self.index_reg().wrapping_add(d as i16 as u16);
        self.regs.wz = addr;
        self.last_opcode = opcode;
        self.prefix = if self.index_mode == IndexMode::IX { Prefix::DdCb } else { Prefix::FdCb };

        let desc = &INDEXED_CB[opcode as usize];
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let val = self.read_mem(bus, addr);
        self.internal(bus, addr, 1);
        if desc.op == Op::BitMem {
            self.bit_flags(y, val, (addr >> 8) as u8);
            return;
        }
        let result = self.cb_result(desc.op, y, val);
        self.write_mem(bus, addr, result);
        if z != 6 {
            self.set_reg8(z, result);
        }
    }

    /// RRD / RLD: 18 T: hl:3, hl:1 ×4, hl:3.
    /// Rotate the BCD digits of A's low nibble and (HL).
    pub(crate) fn op_rrd_rld<B: Bus + ?Sized>(&mut self, left: bool, bus: &mut B) {
        let addr = self.regs.get_hl();
        let mem = self.read_mem(bus, addr);
        self.internal(bus, addr, 4);
        let a = self.regs.a;
        let (new_a, new_mem) = if left {
            ((a & 0xF0) | (mem >> 4), (mem << 4) | (a & 0x0F))
        } else {
            ((a & 0xF0) | (mem & 0x0F), (mem >> 4) | (a << 4))
        };
        self.write_mem(bus, addr, new_mem);
        self.regs.a = new_a;
        self.regs.wz = addr.wrapping_add(1);
        let f = Self::szp_flags(new_a) | (self.regs.f & Flag::C as u8);
        self.set_flags(f);
    }
}
