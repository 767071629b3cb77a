use spectra_core::cpu::z80::{Prefix, Signal, Z80};
mod common;
use common::{TestBus, cpu_at, run_instruction};

#[test]
fn test_hard_reset_state() {
    let mut cpu = Z80::new();
    cpu.regs.set_bc(0x1234);
    cpu.regs.set_hl_prime(0x5678);
    cpu.regs.ix = 0x9ABC;
    cpu.regs.pc = 0x4000;
    cpu.tacts = 1000;
    cpu.iff1 = true;
    cpu.im = 2;

    cpu.hard_reset();
    assert_eq!(cpu.regs.get_af(), 0xFFFF);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.regs.get_bc(), 0);
    assert_eq!(cpu.regs.get_hl_prime(), 0);
    assert_eq!(cpu.regs.ix, 0);
    assert_eq!(cpu.tacts, 0);
    assert!(!cpu.iff1);
    assert_eq!(cpu.im, 0);
}

#[test]
fn test_soft_reset_keeps_general_registers() {
    let mut cpu = Z80::new();
    cpu.regs.set_af(0x1234);
    cpu.regs.set_bc(0x1111);
    cpu.regs.set_de(0x2222);
    cpu.regs.set_hl(0x3333);
    cpu.regs.ix = 0x4444;
    cpu.regs.iy = 0x5555;
    cpu.regs.set_bc_prime(0x6666);
    cpu.regs.sp = 0x8000;
    cpu.regs.pc = 0x9000;
    cpu.tacts = 500;

    cpu.soft_reset();
    assert_eq!(cpu.regs.get_af(), 0xFFFF);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.tacts, 0);
    assert_eq!(cpu.regs.get_bc(), 0x1111);
    assert_eq!(cpu.regs.get_de(), 0x2222);
    assert_eq!(cpu.regs.get_hl(), 0x3333);
    assert_eq!(cpu.regs.ix, 0x4444);
    assert_eq!(cpu.regs.iy, 0x5555);
    assert_eq!(cpu.regs.get_bc_prime(), 0x6666);
}

#[test]
fn test_reset_signal_applies_on_next_cycle() {
    let mut cpu = cpu_at(0x1234);
    let mut bus = TestBus::new();
    cpu.regs.set_hl(0xBEEF);
    cpu.request_reset();
    assert!(cpu.has_signal(Signal::Reset));
    cpu.tacts = 700;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.tacts, 703, "the RESET pin does not stop the clock");
    assert!(!cpu.has_signal(Signal::Reset));
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.regs.get_hl(), 0xBEEF);
}

#[test]
fn test_pair_halves_alias() {
    let mut cpu = Z80::new();
    for value in [0x0000u16, 0x00FF, 0xFF00, 0x1234, 0xFFFF] {
        cpu.regs.set_de(value);
        assert_eq!(cpu.regs.d, (value >> 8) as u8);
        assert_eq!(cpu.regs.e, value as u8);
        cpu.regs.ix = value;
        assert_eq!(cpu.regs.ixh(), (value >> 8) as u8);
        assert_eq!(cpu.regs.ixl(), value as u8);
    }
    cpu.regs.set_de(0x1234);
    cpu.regs.e = 0xAB;
    assert_eq!(cpu.regs.get_de(), 0x12AB);
    cpu.regs.set_iyh(0x56);
    cpu.regs.set_iyl(0x78);
    assert_eq!(cpu.regs.iy, 0x5678);
}

#[test]
fn test_ld_a_n() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0x3E, 0x42]); // LD A, 0x42

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.pc, 2);
}

#[test]
fn test_nop_refreshes_r() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.r = 0x7F | 0x80;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    // Only the low seven bits count; bit 7 is kept.
    assert_eq!(cpu.regs.r, 0x80);
}

#[test]
fn test_undefined_ed_opcode_is_nop() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0xED, 0x00, 0xED, 0xFF]);
    let before = cpu.regs.clone();

    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.pc, 4);
    assert_eq!(cpu.regs.a, before.a);
    assert_eq!(cpu.regs.f, before.f);
    assert_eq!(cpu.prefix, Prefix::Ed);
}

#[test]
fn test_chained_index_prefixes() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    // DD FD 21 34 12: the DD is a 4 T no-op, LD IY,0x1234 follows.
    // The first cycle consumes both prefixes and stops mid-instruction.
    bus.load(0, &[0xDD, 0xFD, 0x21, 0x34, 0x12]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert!(!cpu.at_instruction_boundary());
    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert!(cpu.at_instruction_boundary());
    assert_eq!(cpu.regs.iy, 0x1234);
    assert_eq!(cpu.regs.ix, 0);
    assert_eq!(cpu.regs.pc, 5);
}

#[test]
fn test_index_prefix_on_plain_instruction() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    // DD 47: LD B,A with a useless prefix, 8 T.
    bus.load(0, &[0xDD, 0x47]);
    cpu.regs.a = 0x99;
    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.b, 0x99);
}

#[test]
fn test_address_space_wraps() {
    let mut cpu = cpu_at(0xFFFF);
    let mut bus = TestBus::new();
    // LD A,n straddling the top of memory.
    bus.load(0xFFFF, &[0x3E]);
    bus.load(0x0000, &[0x5A]);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x5A);
    assert_eq!(cpu.regs.pc, 0x0001);
}

#[test]
fn test_exx_and_ex_af() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0xD9, 0x08]); // EXX; EX AF,AF'
    cpu.regs.set_bc(0x1111);
    cpu.regs.set_bc_prime(0x2222);
    cpu.regs.set_af(0x3344);
    cpu.regs.set_af_prime(0x5566);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.get_bc(), 0x2222);
    assert_eq!(cpu.regs.get_bc_prime(), 0x1111);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.get_af(), 0x5566);
    assert_eq!(cpu.regs.get_af_prime(), 0x3344);
}
