use crate::core::Bus;
use crate::cpu::z80::{Flag, FlowEvent, Z80};

impl Z80 {
    /// Evaluate a condition code (3 bits from opcode bits 5-3).
    /// 0=NZ, 1=Z, 2=NC, 3=C, 4=PO, 5=PE, 6=P, 7=M
    pub(crate) fn eval_condition(&self, cc: u8) -> bool {
        match cc {
            0 => !self.flag(Flag::Z),  // NZ
            1 => self.flag(Flag::Z),   // Z
            2 => !self.flag(Flag::C),  // NC
            3 => self.flag(Flag::C),   // C
            4 => !self.flag(Flag::PV), // PO (parity odd)
            5 => self.flag(Flag::PV),  // PE (parity even)
            6 => !self.flag(Flag::S),  // P (positive)
            _ => self.flag(Flag::S),   // M (minus)
        }
    }

    /// JP nn: 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_jp<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let nn = self.fetch_word(bus);
        self.regs.pc = nn;
        self.regs.wz = nn;
    }

    /// JP cc, nn: 10 T whether taken or not. WZ = nn in both cases.
    pub(crate) fn op_jp_cc<B: Bus + ?Sized>(&mut self, cc: u8, bus: &mut B) {
        let nn = self.fetch_word(bus);
        self.regs.wz = nn;
        if self.eval_condition(cc) {
            self.regs.pc = nn;
        }
    }

    /// Spend the 5 T of a taken relative jump and apply the offset.
    fn relative_jump<B: Bus + ?Sized>(&mut self, bus: &mut B, e: i8) {
        let at = self.regs.pc.wrapping_sub(1);
        self.internal(bus, at, 5);
        self.regs.pc = self.regs.pc.wrapping_add(e as i16 as u16);
        self.regs.wz = self.regs.pc;
    }

    /// JR e: 12 T: M1(4) + MR(3) + pc+1:1 ×5
    pub(crate) fn op_jr<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let e = self.fetch_byte(bus) as i8;
        self.relative_jump(bus, e);
    }

    /// JR cc, e: 12 T taken, 7 T not taken. Only NZ, Z, NC, C exist.
    pub(crate) fn op_jr_cc<B: Bus + ?Sized>(&mut self, cc: u8, bus: &mut B) {
        let e = self.fetch_byte(bus) as i8;
        if self.eval_condition(cc) {
            self.relative_jump(bus, e);
        }
    }

    /// DJNZ e: 13 T taken, 8 T not taken: M1(4) + ir:1 + MR(3) [+ pc+1:1 ×5]
    pub(crate) fn op_djnz<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let e = self.fetch_byte(bus) as i8;
        if self.regs.b != 0 {
            self.relative_jump(bus, e);
        }
    }

    fn call_to<B: Bus + ?Sized>(&mut self, bus: &mut B, target: u16) {
        let at = self.regs.pc.wrapping_sub(1);
        self.internal(bus, at, 1);
        let ret = self.regs.pc;
        self.push_word(bus, ret);
        self.regs.pc = target;
        self.flow = FlowEvent::Call { return_addr: ret };
    }

    /// CALL nn: 17 T: M1(4) + MR(3) + MR(3) + pc+2:1 + MW(3) + MW(3)
    pub(crate) fn op_call<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let nn = self.fetch_word(bus);
        self.regs.wz = nn;
        self.call_to(bus, nn);
    }

    /// CALL cc, nn: 17 T taken, 10 T not taken.
    pub(crate) fn op_call_cc<B: Bus + ?Sized>(&mut self, cc: u8, bus: &mut B) {
        let nn = self.fetch_word(bus);
        self.regs.wz = nn;
        if self.eval_condition(cc) {
            self.call_to(bus, nn);
        }
    }

    /// RET: 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_ret<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.pop_word(bus);
        self.regs.pc = addr;
        self.regs.wz = addr;
        self.flow = FlowEvent::Return;
    }

    /// RET cc: 11 T taken, 5 T not taken: M1(4) + ir:1 [+ MR(3) + MR(3)]
    pub(crate) fn op_ret_cc<B: Bus + ?Sized>(&mut self, cc: u8, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        if self.eval_condition(cc) {
            self.op_ret(bus);
        }
    }

    /// RST p: 11 T: M1(4) + ir:1 + MW(3) + MW(3)
    pub(crate) fn op_rst<B: Bus + ?Sized>(&mut self, y: u8, bus: &mut B) {
        let ir = self.regs.get_ir();
        self.internal(bus, ir, 1);
        let ret = self.regs.pc;
        self.push_word(bus, ret);
        let target = (y as u16) * 8;
        self.regs.pc = target;
        self.regs.wz = target;
        self.flow = FlowEvent::Call { return_addr: ret };
    }
}
