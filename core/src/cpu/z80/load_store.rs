use crate::core::Bus;
use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    /// LD r, n: 7 T: M1(4) + MR(3)
    pub(crate) fn op_ld_r_n<B: Bus + ?Sized>(&mut self, r: u8, bus: &mut B) {
        let n = self.fetch_byte(bus);
        self.set_reg8_ix(r, n);
    }

    /// LD (HL), n: 10 T: M1(4) + MR(3) + MW(3)
    /// LD (IX+d), n: 19 T: DD M1(4) + M1(4) + MR(3) + MR(3) + pc:1 ×2 + MW(3)
    pub(crate) fn op_ld_mem_n<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        if self.index_mode == IndexMode::HL {
            let n = self.fetch_byte(bus);
            let addr = self.regs.get_hl();
            self.write_mem(bus, addr, n);
            return;
        }
        let d = self.fetch_byte(bus) as i8;
        let n = self.fetch_byte(bus);
        self.internal(bus, self.regs.pc.wrapping_sub(1), 2);
        let addr = self.index_reg().wrapping_add(d as i16 as u16);
        self.regs.wz = addr;
        self.write_mem(bus, addr, n);
    }

    /// LD r, r': 4 T. Under DD/FD, H and L on both sides become the index halves.
    pub(crate) fn op_ld_r_r(&mut self, dst: u8, src: u8) {
        let val = self.get_reg8_ix(src);
        self.set_reg8_ix(dst, val);
    }

    /// LD r, (HL): 7 T; LD r, (IX+d): 19 T. The destination is always the plain register.
    pub(crate) fn op_ld_r_mem<B: Bus + ?Sized>(&mut self, dst: u8, bus: &mut B) {
        let addr = self.memory_operand(bus);
        let val = self.read_mem(bus, addr);
        self.set_reg8(dst, val);
    }

    /// LD (HL), r: 7 T; LD (IX+d), r: 19 T.
    pub(crate) fn op_ld_mem_r<B: Bus + ?Sized>(&mut self, src: u8, bus: &mut B) {
        let addr = self.memory_operand(bus);
        let val = self.get_reg8(src);
        self.write_mem(bus, addr, val);
    }

    /// LD rr, nn: 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_ld_rp_nn<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let nn = self.fetch_word(bus);
        self.set_rp(rp, nn);
    }

    /// LD (BC),A / LD (DE),A: 7 T. WZ = (A << 8) | ((addr + 1) & 0xFF).
    pub(crate) fn op_ld_ind_a<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let addr = if rp == 0 { self.regs.get_bc() } else { self.regs.get_de() };
        let a = self.regs.a;
        self.write_mem(bus, addr, a);
        self.regs.wz = ((a as u16) << 8) | (addr.wrapping_add(1) & 0xFF);
    }

    /// LD A,(BC) / LD A,(DE): 7 T. WZ = addr + 1.
    pub(crate) fn op_ld_a_ind<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let addr = if rp == 0 { self.regs.get_bc() } else { self.regs.get_de() };
        self.regs.a = self.read_mem(bus, addr);
        self.regs.wz = addr.wrapping_add(1);
    }

    /// LD (nn), A: 13 T
    pub(crate) fn op_ld_nn_a<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let nn = self.fetch_word(bus);
        let a = self.regs.a;
        self.write_mem(bus, nn, a);
        self.regs.wz = ((a as u16) << 8) | (nn.wrapping_add(1) & 0xFF);
    }

    /// LD A, (nn): 13 T
    pub(crate) fn op_ld_a_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let nn = self.fetch_word(bus);
        self.regs.a = self.read_mem(bus, nn);
        self.regs.wz = nn.wrapping_add(1);
    }

    fn store_word<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, val: u16) {
        self.write_mem(bus, addr, val as u8);
        self.write_mem(bus, addr.wrapping_add(1), (val >> 8) as u8);
        self.regs.wz = addr.wrapping_add(1);
    }

    fn load_word<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = self.read_mem(bus, addr) as u16;
        let hi = self.read_mem(bus, addr.wrapping_add(1)) as u16;
        self.regs.wz = addr.wrapping_add(1);
        (hi << 8) | lo
    }

    /// LD (nn), HL: 16 T (20 T for IX/IY)
    pub(crate) fn op_ld_nn_hl<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let nn = self.fetch_word(bus);
        let val = self.index_reg();
        self.store_word(bus, nn, val);
    }

    /// LD HL, (nn): 16 T (20 T for IX/IY)
    pub(crate) fn op_ld_hl_nn<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let nn = self.fetch_word(bus);
        let val = self.load_word(bus, nn);
        self.set_index_reg(val);
    }

    /// ED: LD (nn), rr: 20 T
    pub(crate) fn op_ld_nn_rp<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let nn = self.fetch_word(bus);
        let val = self.get_rp(rp);
        self.store_word(bus, nn, val);
    }

    /// ED: LD rr, (nn): 20 T
    pub(crate) fn op_ld_rp_ind_nn<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let nn = self.fetch_word(bus);
        let val = self.load_word(bus, nn);
        self.set_rp(rp, val);
    }

    /// LD A,I / LD A,R: 9 T. P/V = IFF2. Arms the interrupt P/V quirk.
    pub(crate) fn op_ld_a_ir<B: Bus + ?Sized>(&mut self, from_i: bool, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        let val = if from_i { self.regs.i } else { self.regs.r };
        self.regs.a = val;
        let mut f = self.regs.f & Flag::C as u8;
        f |= val & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
        if val == 0 { f |= Flag::Z as u8; }
        if self.iff2 { f |= Flag::PV as u8; }
        self.set_flags(f);
        self.p = true;
    }

    // --- I/O ---

    /// OUT (n), A: 11 T. Port = (A << 8) | n.
    pub(crate) fn op_out_n_a<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let n = self.fetch_byte(bus);
        let a = self.regs.a;
        let port = ((a as u16) << 8) | n as u16;
        self.port_out(bus, port, a);
        self.regs.wz = ((a as u16) << 8) | n.wrapping_add(1) as u16;
    }

    /// IN A, (n): 11 T. No flags affected.
    pub(crate) fn op_in_a_n<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let n = self.fetch_byte(bus);
        let port = ((self.regs.a as u16) << 8) | n as u16;
        self.regs.a = self.port_in(bus, port);
        self.regs.wz = port.wrapping_add(1);
    }

    /// IN r, (C): 12 T. `IN F,(C)` (r = 6) only sets flags.
    pub(crate) fn op_in_r_c<B: Bus + ?Sized>(&mut self, r: u8, bus: &mut B) {
        let port = self.regs.get_bc();
        let val = self.port_in(bus, port);
        self.regs.wz = port.wrapping_add(1);
        let f = Self::szp_flags(val) | (self.regs.f & Flag::C as u8);
        self.set_flags(f);
        if r != 6 {
            self.set_reg8(r, val);
        }
    }

    /// OUT (C), r: 12 T. `OUT (C),0` for r = 6.
    pub(crate) fn op_out_c_r<B: Bus + ?Sized>(&mut self, r: u8, bus: &mut B) {
        let port = self.regs.get_bc();
        let val = if r == 6 { 0 } else { self.get_reg8(r) };
        self.port_out(bus, port, val);
        self.regs.wz = port.wrapping_add(1);
    }
}
