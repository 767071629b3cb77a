/// Z80 register file.
///
/// 8-bit registers are stored individually; every 16-bit pair accessor is
/// composed from (and decomposed into) its two halves, so a pair write is
/// always visible through the halves and vice versa.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow set
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & special registers
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    /// Hidden WZ scratch register (MEMPTR).
    pub wz: u16,
}

#[inline]
fn pair(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

impl Registers {
    pub fn get_af(&self) -> u16 { pair(self.a, self.f) }
    pub fn set_af(&mut self, val: u16) { self.a = (val >> 8) as u8; self.f = val as u8; }

    pub fn get_bc(&self) -> u16 { pair(self.b, self.c) }
    pub fn set_bc(&mut self, val: u16) { self.b = (val >> 8) as u8; self.c = val as u8; }

    pub fn get_de(&self) -> u16 { pair(self.d, self.e) }
    pub fn set_de(&mut self, val: u16) { self.d = (val >> 8) as u8; self.e = val as u8; }

    pub fn get_hl(&self) -> u16 { pair(self.h, self.l) }
    pub fn set_hl(&mut self, val: u16) { self.h = (val >> 8) as u8; self.l = val as u8; }

    pub fn get_af_prime(&self) -> u16 { pair(self.a_prime, self.f_prime) }
    pub fn set_af_prime(&mut self, val: u16) { self.a_prime = (val >> 8) as u8; self.f_prime = val as u8; }

    pub fn get_bc_prime(&self) -> u16 { pair(self.b_prime, self.c_prime) }
    pub fn set_bc_prime(&mut self, val: u16) { self.b_prime = (val >> 8) as u8; self.c_prime = val as u8; }

    pub fn get_de_prime(&self) -> u16 { pair(self.d_prime, self.e_prime) }
    pub fn set_de_prime(&mut self, val: u16) { self.d_prime = (val >> 8) as u8; self.e_prime = val as u8; }

    pub fn get_hl_prime(&self) -> u16 { pair(self.h_prime, self.l_prime) }
    pub fn set_hl_prime(&mut self, val: u16) { self.h_prime = (val >> 8) as u8; self.l_prime = val as u8; }

    pub fn ixh(&self) -> u8 { (self.ix >> 8) as u8 }
    pub fn set_ixh(&mut self, val: u8) { self.ix = (self.ix & 0x00FF) | ((val as u16) << 8); }
    pub fn ixl(&self) -> u8 { self.ix as u8 }
    pub fn set_ixl(&mut self, val: u8) { self.ix = (self.ix & 0xFF00) | val as u16; }

    pub fn iyh(&self) -> u8 { (self.iy >> 8) as u8 }
    pub fn set_iyh(&mut self, val: u8) { self.iy = (self.iy & 0x00FF) | ((val as u16) << 8); }
    pub fn iyl(&self) -> u8 { self.iy as u8 }
    pub fn set_iyl(&mut self, val: u8) { self.iy = (self.iy & 0xFF00) | val as u16; }

    /// Combined interrupt vector / refresh register as seen on the address bus
    /// during refresh and internal cycles.
    pub fn get_ir(&self) -> u16 { pair(self.i, self.r) }

    /// Increment the 7 low bits of R, keeping bit 7.
    pub fn refresh(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    /// EX AF,AF'
    pub fn exchange_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
    }

    /// EXX
    pub fn exchange_main(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_write_is_visible_in_halves() {
        let mut regs = Registers::default();
        for val in [0x0000u16, 0x00FF, 0xFF00, 0x1234, 0xBEEF, 0xFFFF] {
            regs.set_bc(val);
            assert_eq!(regs.b, (val >> 8) as u8);
            assert_eq!(regs.c, val as u8);
            regs.set_hl_prime(val);
            assert_eq!(regs.h_prime, (val >> 8) as u8);
            assert_eq!(regs.l_prime, val as u8);
            regs.ix = val;
            assert_eq!(regs.ixh(), (val >> 8) as u8);
            assert_eq!(regs.ixl(), val as u8);
        }
    }

    #[test]
    fn half_write_only_changes_that_half() {
        let mut regs = Registers::default();
        regs.set_de(0x1234);
        regs.e = 0xCD;
        assert_eq!(regs.get_de(), 0x12CD);
        regs.d = 0xAB;
        assert_eq!(regs.get_de(), 0xABCD);

        regs.iy = 0x1234;
        regs.set_iyl(0x99);
        assert_eq!(regs.iy, 0x1299);
        regs.set_iyh(0x77);
        assert_eq!(regs.iy, 0x7799);
    }

    #[test]
    fn refresh_preserves_bit7() {
        let mut regs = Registers { r: 0xFF, ..Default::default() };
        regs.refresh();
        assert_eq!(regs.r, 0x80);
        regs.r = 0x7F;
        regs.refresh();
        assert_eq!(regs.r, 0x00);
    }
}
