use crate::core::Bus;
use crate::cpu::z80::{Flag, Z80};

const XY: u8 = Flag::X as u8 | Flag::Y as u8;

impl Z80 {
    /// Rewind PC onto the ED prefix for another iteration (5 T with `addr` on the bus).
    /// While repeating, X/Y show bits 3 and 5 of PCH.
    fn repeat_block<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) {
        self.internal(bus, addr, 5);
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        let f = (self.regs.f & !XY) | ((self.regs.pc >> 8) as u8 & XY);
        self.set_flags(f);
    }

    fn step(val: u16, dec: bool) -> u16 {
        if dec { val.wrapping_sub(1) } else { val.wrapping_add(1) }
    }

    // --- Block Transfer ---

    /// LDI/LDD: 16 T: hl:3, de:3, de:1 ×2
    /// LDIR/LDDR: 21 T repeating (+ de:1 ×5), 16 T on the final iteration.
    pub(crate) fn op_ldi<B: Bus + ?Sized>(&mut self, dec: bool, repeat: bool, bus: &mut B) {
        let hl = self.regs.get_hl();
        let de = self.regs.get_de();
        let val = self.read_mem(bus, hl);
        self.write_mem(bus, de, val);
        self.internal(bus, de, 2);

        self.regs.set_hl(Self::step(hl, dec));
        self.regs.set_de(Self::step(de, dec));
        let bc = self.regs.get_bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        // Undocumented: X = bit 3 of (val+A), Y = bit 1 of (val+A)
        let n = val.wrapping_add(self.regs.a);
        let mut f = self.regs.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
        if bc != 0 { f |= Flag::PV as u8; }
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.set_flags(f);

        if repeat && bc != 0 {
            self.repeat_block(bus, de);
        }
    }

    // --- Block Compare ---

    /// CPI/CPD: 16 T: hl:3, hl:1 ×5
    /// CPIR/CPDR: 21 T repeating while BC != 0 and no match.
    pub(crate) fn op_cpi<B: Bus + ?Sized>(&mut self, dec: bool, repeat: bool, bus: &mut B) {
        let hl = self.regs.get_hl();
        let val = self.read_mem(bus, hl);
        self.internal(bus, hl, 5);

        let a = self.regs.a;
        let result = a.wrapping_sub(val);
        let h = (a & 0xF) < (val & 0xF);

        self.regs.set_hl(Self::step(hl, dec));
        let bc = self.regs.get_bc().wrapping_sub(1);
        self.regs.set_bc(bc);
        self.regs.wz = Self::step(self.regs.wz, dec);

        let mut f = (self.regs.f & Flag::C as u8) | Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if h { f |= Flag::H as u8; }
        if bc != 0 { f |= Flag::PV as u8; }
        // Undocumented X/Y: n = result - H_flag
        let n = result.wrapping_sub(h as u8);
        if (n & 0x08) != 0 { f |= Flag::X as u8; }
        if (n & 0x02) != 0 { f |= Flag::Y as u8; }
        self.set_flags(f);

        if repeat && bc != 0 && result != 0 {
            self.repeat_block(bus, hl);
        }
    }

    // --- Block I/O ---

    /// Flags shared by INI/IND/OUTI/OUTD. `k` is the data byte plus the
    /// adjusted low byte of the address register used by the variant.
    fn block_io_flags(&mut self, val: u8, k: u16) {
        let b = self.regs.b;
        let mut f = b & (Flag::S as u8 | XY);
        if b == 0 { f |= Flag::Z as u8; }
        if val & 0x80 != 0 { f |= Flag::N as u8; }
        if k > 0xFF { f |= Flag::H as u8 | Flag::C as u8; }
        if Self::get_parity((k as u8 & 0x07) ^ b) { f |= Flag::PV as u8; }
        self.set_flags(f);
    }

    /// Extra P/V and H adjustment applied when INIR/INDR/OTIR/OTDR repeat.
    fn block_io_repeat_flags(&mut self, val: u8) {
        let b = self.regs.b;
        let mut f = self.regs.f;
        let pv = |x: u8| if Self::get_parity(x & 0x07) { 0 } else { Flag::PV as u8 };
        if f & Flag::C as u8 != 0 {
            f &= !(Flag::H as u8);
            if val & 0x80 != 0 {
                f ^= pv(b.wrapping_sub(1));
                if b & 0x0F == 0x00 { f |= Flag::H as u8; }
            } else {
                f ^= pv(b.wrapping_add(1));
                if b & 0x0F == 0x0F { f |= Flag::H as u8; }
            }
        } else {
            f ^= pv(b);
        }
        self.set_flags(f);
    }

    /// INI/IND: 16 T: ir:1, IO(4), hl:3
    /// INIR/INDR: 21 T repeating while B != 0 (+ hl:1 ×5).
    pub(crate) fn op_ini<B: Bus + ?Sized>(&mut self, dec: bool, repeat: bool, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        let bc = self.regs.get_bc();
        let val = self.port_in(bus, bc);
        self.regs.wz = Self::step(bc, dec);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let hl = self.regs.get_hl();
        self.write_mem(bus, hl, val);
        self.regs.set_hl(Self::step(hl, dec));

        let c = if dec { self.regs.c.wrapping_sub(1) } else { self.regs.c.wrapping_add(1) };
        self.block_io_flags(val, val as u16 + c as u16);

        if repeat && self.regs.b != 0 {
            self.repeat_block(bus, hl);
            self.block_io_repeat_flags(val);
        }
    }

    /// OUTI/OUTD: 16 T: ir:1, hl:3, IO(4). B is decremented before the port write.
    /// OTIR/OTDR: 21 T repeating while B != 0 (+ bc:1 ×5).
    pub(crate) fn op_outi<B: Bus + ?Sized>(&mut self, dec: bool, repeat: bool, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        let hl = self.regs.get_hl();
        let val = self.read_mem(bus, hl);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let bc = self.regs.get_bc();
        self.port_out(bus, bc, val);
        self.regs.wz = Self::step(bc, dec);
        self.regs.set_hl(Self::step(hl, dec));

        let l = self.regs.l;
        self.block_io_flags(val, val as u16 + l as u16);

        if repeat && self.regs.b != 0 {
            self.repeat_block(bus, bc);
            self.block_io_repeat_flags(val);
        }
    }
}
