use crate::core::Bus;
use crate::cpu::z80::Z80;

impl Z80 {
    /// Two write cycles, high byte first.
    pub(crate) fn push_word<B: Bus + ?Sized>(&mut self, bus: &mut B, val: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        let sp = self.regs.sp;
        self.write_mem(bus, sp, (val >> 8) as u8);
        self.regs.sp = sp.wrapping_sub(1);
        self.write_mem(bus, sp.wrapping_sub(1), val as u8);
    }

    pub(crate) fn pop_word<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let sp = self.regs.sp;
        let lo = self.read_mem(bus, sp) as u16;
        let hi = self.read_mem(bus, sp.wrapping_add(1)) as u16;
        self.regs.sp = sp.wrapping_add(2);
        (hi << 8) | lo
    }

    /// PUSH rr: 11 T: M1(4) + ir:1 + MW(3) + MW(3)
    /// Opcode mask: 11 rr0 101 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=AF)
    pub(crate) fn op_push<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        let val = self.get_rp_af(rp);
        self.push_word(bus, val);
    }

    /// POP rr: 10 T: M1(4) + MR(3) + MR(3). POP AF does not count as a flag update.
    pub(crate) fn op_pop<B: Bus + ?Sized>(&mut self, rp: u8, bus: &mut B) {
        let val = self.pop_word(bus);
        self.set_rp_af(rp, val);
    }

    /// EX (SP), HL: 19 T: M1(4) + sp:3 + sp+1:3 + sp+1:1 + sp+1:3 + sp:3 + sp:1 ×2
    pub(crate) fn op_ex_sp_hl<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let sp = self.regs.sp;
        let sp1 = sp.wrapping_add(1);
        let lo = self.read_mem(bus, sp) as u16;
        let hi = self.read_mem(bus, sp1) as u16;
        self.internal(bus, sp1, 1);
        let old = self.index_reg();
        self.write_mem(bus, sp1, (old >> 8) as u8);
        self.write_mem(bus, sp, old as u8);
        self.internal(bus, sp, 2);
        let val = (hi << 8) | lo;
        self.set_index_reg(val);
        self.regs.wz = val;
    }
}
