mod common;
use common::{TestBus, cpu_at, run_instruction};

#[test]
fn test_ld_ix_nn() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0xDD, 0x21, 0x34, 0x12]); // LD IX,0x1234

    assert_eq!(run_instruction(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.regs.ix, 0x1234);
    assert_eq!(cpu.regs.get_hl(), 0);
}

#[test]
fn test_ld_a_ix_d() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.ix = 0x9000;
    bus.memory[0x9005] = 0x42;
    bus.load(0, &[0xDD, 0x7E, 0x05]); // LD A,(IX+5)

    assert_eq!(run_instruction(&mut cpu, &mut bus), 19);
    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.wz, 0x9005);
    assert_eq!(cpu.regs.pc, 3);
}

#[test]
fn test_ld_iy_d_n_negative_displacement() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.iy = 0x9000;
    bus.load(0, &[0xFD, 0x36, 0xFE, 0x99]); // LD (IY-2),0x99

    assert_eq!(run_instruction(&mut cpu, &mut bus), 19);
    assert_eq!(bus.memory[0x8FFE], 0x99);
    assert_eq!(cpu.regs.pc, 4);
}

#[test]
fn test_memory_form_uses_plain_h() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.ix = 0x9000;
    bus.memory[0x9001] = 0x77;
    bus.load(0, &[0xDD, 0x66, 0x01]); // LD H,(IX+1)

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.h, 0x77);
    assert_eq!(cpu.regs.ix, 0x9000);
}

#[test]
fn test_index_halves() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.a = 0x01;
    // LD IXH,0x12; LD IXL,0x34; ADD A,IXL
    bus.load(0, &[0xDD, 0x26, 0x12, 0xDD, 0x2E, 0x34, 0xDD, 0x85]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.regs.ix, 0x1234);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.a, 0x35);
    assert_eq!(cpu.regs.get_hl(), 0, "H and L untouched");
}

#[test]
fn test_add_ix_ix() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.ix = 0x4000;
    bus.load(0, &[0xDD, 0x29]); // ADD IX,IX

    assert_eq!(run_instruction(&mut cpu, &mut bus), 15);
    assert_eq!(cpu.regs.ix, 0x8000);
}

#[test]
fn test_inc_ix_d() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.ix = 0x9000;
    bus.memory[0x9003] = 0x7F;
    bus.load(0, &[0xDD, 0x34, 0x03]); // INC (IX+3)

    assert_eq!(run_instruction(&mut cpu, &mut bus), 23);
    assert_eq!(bus.memory[0x9003], 0x80);
}

#[test]
fn test_push_pop_index() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.ix = 0xBEEF;
    bus.load(0, &[0xDD, 0xE5, 0xFD, 0xE1]); // PUSH IX; POP IY

    assert_eq!(run_instruction(&mut cpu, &mut bus), 15);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.regs.iy, 0xBEEF);
}

#[test]
fn test_jp_ix_and_ld_sp_iy() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.ix = 0x0100;
    cpu.regs.iy = 0x7000;
    bus.load(0, &[0xDD, 0xE9]); // JP (IX)
    bus.load(0x100, &[0xFD, 0xF9]); // LD SP,IY

    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.pc, 0x0100);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.sp, 0x7000);
}

#[test]
fn test_ex_sp_ix() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.sp = 0xE000;
    cpu.regs.ix = 0x1122;
    bus.load(0xE000, &[0x33, 0x44]);
    bus.load(0, &[0xDD, 0xE3]); // EX (SP),IX

    assert_eq!(run_instruction(&mut cpu, &mut bus), 23);
    assert_eq!(cpu.regs.ix, 0x4433);
    assert_eq!(&bus.memory[0xE000..0xE002], &[0x22, 0x11]);
}

#[test]
fn test_ex_de_hl_ignores_prefix() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.set_de(0x1111);
    cpu.regs.set_hl(0x2222);
    cpu.regs.ix = 0x3333;
    bus.load(0, &[0xDD, 0xEB]); // EX DE,HL

    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.get_de(), 0x2222);
    assert_eq!(cpu.regs.get_hl(), 0x1111);
    assert_eq!(cpu.regs.ix, 0x3333);
}
