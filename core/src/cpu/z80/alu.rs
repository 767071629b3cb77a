use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

const XY: u8 = Flag::X as u8 | Flag::Y as u8;
const SZP: u8 = Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8;

impl Z80 {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    /// S, Z, P/V (parity) and X/Y of `val`, everything else clear.
    pub(crate) fn szp_flags(val: u8) -> u8 {
        let mut f = val & (Flag::S as u8 | XY);
        if val == 0 { f |= Flag::Z as u8; }
        if Self::get_parity(val) { f |= Flag::PV as u8; }
        f
    }

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
        let mut f = Self::szp_flags(result);
        if is_and { f |= Flag::H as u8; } // AND sets H, others clear it
        self.set_flags(f);
    }

    fn do_add(&mut self, val: u8, carry_in: bool) {
        let a = self.regs.a;
        let c_val = if carry_in && self.flag(Flag::C) { 1 } else { 0 };
        let result_u16 = (a as u16) + (val as u16) + (c_val as u16);
        let result = result_u16 as u8;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if ((a & 0xF) + (val & 0xF) + c_val) > 0xF { f |= Flag::H as u8; }
        if ((a ^ result) & (val ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & XY;
        self.regs.a = result;
        self.set_flags(f);
    }

    /// A - val (- carry). Returns the result and flags without storing A.
    fn sub_flags(&self, a: u8, val: u8, carry_in: bool) -> (u8, u8) {
        let c_val = if carry_in && self.flag(Flag::C) { 1 } else { 0 };
        let result_u16 = (a as u16).wrapping_sub(val as u16).wrapping_sub(c_val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0xF) < ((val & 0xF) + c_val) { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }
        (result, f)
    }

    fn do_sub(&mut self, val: u8, carry_in: bool) {
        let (result, f) = self.sub_flags(self.regs.a, val, carry_in);
        self.regs.a = result;
        self.set_flags(f | (result & XY));
    }

    fn do_cp(&mut self, val: u8) {
        let (_, f) = self.sub_flags(self.regs.a, val, false);
        // X/Y come from the operand for CP, not the result
        self.set_flags(f | (val & XY));
    }

    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP selected by opcode bits 5-3.
    pub(crate) fn perform_alu_op(&mut self, op: u8, val: u8) {
        match op {
            0 => self.do_add(val, false),
            1 => self.do_add(val, true),
            2 => self.do_sub(val, false),
            3 => self.do_sub(val, true),
            4 => { self.regs.a &= val; self.update_flags_logic(self.regs.a, true); }
            5 => { self.regs.a ^= val; self.update_flags_logic(self.regs.a, false); }
            6 => { self.regs.a |= val; self.update_flags_logic(self.regs.a, false); }
            _ => self.do_cp(val),
        }
    }

    fn calc_inc_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.regs.f & Flag::C as u8; // Preserve C
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0xF { f |= Flag::H as u8; }
        if val == 0x7F { f |= Flag::PV as u8; } // Overflow 7F -> 80
        f |= result & XY;
        self.set_flags(f);
        result
    }

    fn calc_dec_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.regs.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0x0 { f |= Flag::H as u8; } // Borrow from bit 4
        if val == 0x80 { f |= Flag::PV as u8; } // Overflow 80 -> 7F
        f |= result & XY;
        self.set_flags(f);
        result
    }

    // --- Instructions ---

    /// INC r / DEC r: 4 T
    pub(crate) fn op_inc_dec_r(&mut self, r: u8, inc: bool) {
        let val = self.get_reg8_ix(r);
        let result = if inc { self.calc_inc_flags(val) } else { self.calc_dec_flags(val) };
        self.set_reg8_ix(r, result);
    }

    /// INC/DEC (HL): 11 T: hl:3, hl:1, hl:3. Indexed: 23 T.
    pub(crate) fn op_inc_dec_mem<B: Bus + ?Sized>(&mut self, inc: bool, bus: &mut B) {
        let addr = self.memory_operand(bus);
        let val = self.read_mem(bus, addr);
        self.internal(bus, addr, 1);
        let result = if inc { self.calc_inc_flags(val) } else { self.calc_dec_flags(val) };
        self.write_mem(bus, addr, result);
    }

    // --- 16-bit ALU ---

    /// INC rr / DEC rr: 6 T: M1(4) + ir:1 ×2. No flags affected.
    pub(crate) fn op_inc_dec_rp<B: Bus + ?Sized>(&mut self, rp: u8, inc: bool, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 2);
        let val = self.get_rp(rp);
        self.set_rp(rp, if inc { val.wrapping_add(1) } else { val.wrapping_sub(1) });
    }

    /// ADD HL,rr: 11 T: M1(4) + ir:1 ×7
    /// H = carry from bit 11, C = carry from bit 15, N = 0. S, Z, PV preserved.
    /// X/Y from high byte of result.
    pub(crate) fn op_add_hl_rp<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 7);
        let hl = self.index_reg();
        let rr = self.get_rp(rp);
        let result = (hl as u32) + (rr as u32);
        self.regs.wz = hl.wrapping_add(1);

        let mut f = self.regs.f & SZP;
        if ((hl & 0x0FFF) + (rr & 0x0FFF)) > 0x0FFF { f |= Flag::H as u8; }
        if result > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result >> 8) as u8) & XY;
        self.set_flags(f);
        self.set_index_reg(result as u16);
    }

    /// ADC HL,rr: 15 T
    pub(crate) fn op_adc_hl<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 7);
        let hl = self.regs.get_hl();
        let rr = self.get_rp(rp);
        let c = self.flag(Flag::C) as u32;
        let result = hl as u32 + rr as u32 + c;
        let res16 = result as u16;
        self.regs.wz = hl.wrapping_add(1);

        let mut f = ((res16 >> 8) as u8) & (Flag::S as u8 | XY);
        if res16 == 0 { f |= Flag::Z as u8; }
        if ((hl & 0x0FFF) as u32 + (rr & 0x0FFF) as u32 + c) > 0x0FFF { f |= Flag::H as u8; }
        if ((hl ^ res16) & (rr ^ res16) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result > 0xFFFF { f |= Flag::C as u8; }
        self.set_flags(f);
        self.regs.set_hl(res16);
    }

    /// SBC HL,rr: 15 T
    pub(crate) fn op_sbc_hl<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 7);
        let hl = self.regs.get_hl();
        let rr = self.get_rp(rp);
        let c = self.flag(Flag::C) as u32;
        let result = (hl as u32).wrapping_sub(rr as u32).wrapping_sub(c);
        let res16 = result as u16;
        self.regs.wz = hl.wrapping_add(1);

        let mut f = Flag::N as u8 | (((res16 >> 8) as u8) & (Flag::S as u8 | XY));
        if res16 == 0 { f |= Flag::Z as u8; }
        if ((hl & 0x0FFF) as u32) < (rr & 0x0FFF) as u32 + c { f |= Flag::H as u8; }
        if ((hl ^ rr) & (hl ^ res16) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result > 0xFFFF { f |= Flag::C as u8; }
        self.set_flags(f);
        self.regs.set_hl(res16);
    }

    // --- Accumulator Rotates ---

    /// RLCA / RRCA / RLA / RRA: 4 T, selected by opcode bits 4-3.
    /// C = bit shifted out, H = N = 0, X/Y from A. S, Z, PV preserved.
    pub(crate) fn op_rotate_a(&mut self, y: u8) {
        let a = self.regs.a;
        let carry = self.flag(Flag::C) as u8;
        let (result, out) = match y {
            0 => (a.rotate_left(1), a >> 7),
            1 => (a.rotate_right(1), a & 1),
            2 => ((a << 1) | carry, a >> 7),
            _ => ((a >> 1) | (carry << 7), a & 1),
        };
        self.regs.a = result;
        let mut f = self.regs.f & SZP;
        if out != 0 { f |= Flag::C as u8; }
        f |= result & XY;
        self.set_flags(f);
    }

    // --- Misc ALU ---

    /// DAA: 4 T. Decimal adjust accumulator after BCD add/sub.
    pub(crate) fn op_daa(&mut self) {
        let a = self.regs.a;
        let n = self.flag(Flag::N);
        let old_h = self.flag(Flag::H);
        let old_c = self.flag(Flag::C);

        let mut correction = 0u8;
        let mut new_c = old_c;

        if old_h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if old_c || a > 0x99 {
            correction |= 0x60;
            new_c = true;
        }

        let result = if n { a.wrapping_sub(correction) } else { a.wrapping_add(correction) };

        let new_h = if n { old_h && (a & 0x0F) < 6 } else { (a & 0x0F) > 9 };

        self.regs.a = result;
        let mut f = Self::szp_flags(result);
        if new_c { f |= Flag::C as u8; }
        if n { f |= Flag::N as u8; }
        if new_h { f |= Flag::H as u8; }
        self.set_flags(f);
    }

    /// CPL: 4 T. Sets H and N. X/Y from A. S, Z, PV, C preserved.
    pub(crate) fn op_cpl(&mut self) {
        self.regs.a = !self.regs.a;
        let mut f = self.regs.f & (SZP | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.regs.a & XY;
        self.set_flags(f);
    }

    /// X/Y for SCF/CCF: taken from A when the previous instruction changed
    /// the flags, from A OR F otherwise.
    fn scf_ccf_xy(&self) -> u8 {
        ((self.prev_q ^ self.regs.f) | self.regs.a) & XY
    }

    /// SCF: 4 T. C = 1, H = 0, N = 0.
    pub(crate) fn op_scf(&mut self) {
        let f = (self.regs.f & SZP) | Flag::C as u8 | self.scf_ccf_xy();
        self.set_flags(f);
    }

    /// CCF: 4 T. H = old C, C = !C, N = 0.
    pub(crate) fn op_ccf(&mut self) {
        let old_c = self.flag(Flag::C);
        let mut f = (self.regs.f & SZP) | self.scf_ccf_xy();
        if old_c { f |= Flag::H as u8; } else { f |= Flag::C as u8; }
        self.set_flags(f);
    }

    /// NEG: 8 T. A = 0 - A.
    pub(crate) fn op_neg(&mut self) {
        let (result, f) = self.sub_flags(0, self.regs.a, false);
        self.regs.a = result;
        self.set_flags(f | (result & XY));
    }
}
