use spectra_core::cpu::z80::FlowEvent;
mod common;
use common::{TestBus, cpu_at, run_instruction};

// --- Jumps ---

#[test]
fn test_jp_nn() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0xC3, 0x34, 0x12]); // JP 0x1234

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.regs.wz, 0x1234);
    assert_eq!(cpu.flow, FlowEvent::None);
}

#[test]
fn test_jp_cc_not_taken_still_sets_memptr() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0xCA, 0x34, 0x12]); // JP Z,0x1234 with Z clear

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 3);
    assert_eq!(cpu.regs.wz, 0x1234);
}

#[test]
fn test_jr_to_itself() {
    let mut cpu = cpu_at(0x8000);
    let mut bus = TestBus::new();
    bus.load(0x8000, &[0x18, 0xFE]); // JR -2

    assert_eq!(run_instruction(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.regs.pc, 0x8000);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.regs.pc, 0x8000);
}

#[test]
fn test_jr_cc_timing() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    bus.load(0, &[0x20, 0x10, 0x28, 0x10]); // JR NZ,+16; JR Z,+16

    cpu.regs.f = 0x40; // Z set: first not taken, second taken
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.regs.pc, 2);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 12);
    assert_eq!(cpu.regs.pc, 0x14);
}

#[test]
fn test_djnz_loop() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.b = 2;
    bus.load(0, &[0x10, 0xFE]); // DJNZ -2

    assert_eq!(run_instruction(&mut cpu, &mut bus), 13);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
    assert_eq!(cpu.regs.pc, 2);
    assert_eq!(cpu.regs.b, 0);
}

#[test]
fn test_jp_hl() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.set_hl(0x4567);
    bus.load(0, &[0xE9]); // JP (HL)

    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.regs.pc, 0x4567);
}

// --- Calls and returns ---

#[test]
fn test_call_and_ret() {
    let mut cpu = cpu_at(0x8000);
    let mut bus = TestBus::new();
    bus.load(0x8000, &[0xCD, 0x00, 0x90]); // CALL 0x9000
    bus.load(0x9000, &[0xC9]); // RET

    assert_eq!(run_instruction(&mut cpu, &mut bus), 17);
    assert_eq!(cpu.regs.pc, 0x9000);
    assert_eq!(cpu.regs.sp, 0xEFFE);
    assert_eq!(bus.memory[0xEFFE], 0x03);
    assert_eq!(bus.memory[0xEFFF], 0x80);
    assert_eq!(cpu.flow, FlowEvent::Call { return_addr: 0x8003 });

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 0x8003);
    assert_eq!(cpu.regs.sp, 0xF000);
    assert!(cpu.ret_executed());
}

#[test]
fn test_call_cc_not_taken_is_not_a_call() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.f = 0x01;
    bus.load(0, &[0xD4, 0x00, 0x90]); // CALL NC,0x9000

    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.pc, 3);
    assert_eq!(cpu.regs.sp, 0xF000);
    assert_eq!(cpu.flow, FlowEvent::None);
}

#[test]
fn test_ret_cc_timing() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.sp = 0xE000;
    bus.load(0xE000, &[0x00, 0x70]);
    bus.load(0, &[0xC8, 0xC0]); // RET Z; RET NZ

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.flow, FlowEvent::None);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x7000);
    assert_eq!(cpu.flow, FlowEvent::Return);
}

#[test]
fn test_rst() {
    let mut cpu = cpu_at(0x1234);
    let mut bus = TestBus::new();
    bus.load(0x1234, &[0xEF]); // RST 28h

    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x0028);
    assert_eq!(cpu.flow, FlowEvent::Call { return_addr: 0x1235 });
}

#[test]
fn test_reti_and_retn() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.sp = 0xE000;
    bus.load(0xE000, &[0x00, 0x40, 0x00, 0x50]);
    bus.load(0, &[0xED, 0x45]); // RETN
    bus.load(0x4000, &[0xED, 0x4D]); // RETI
    cpu.iff1 = false;
    cpu.iff2 = true;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.regs.pc, 0x4000);
    assert!(cpu.iff1, "RETN restores IFF1 from IFF2");
    assert_eq!(cpu.flow, FlowEvent::Return);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 14);
    assert_eq!(cpu.regs.pc, 0x5000);
    assert_eq!(cpu.flow, FlowEvent::Return);
}

// --- Stack ---

#[test]
fn test_push_pop() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.set_bc(0x1234);
    bus.load(0, &[0xC5, 0xD1]); // PUSH BC; POP DE

    assert_eq!(run_instruction(&mut cpu, &mut bus), 11);
    assert_eq!(bus.memory[0xEFFF], 0x12);
    assert_eq!(bus.memory[0xEFFE], 0x34);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 10);
    assert_eq!(cpu.regs.get_de(), 0x1234);
    assert_eq!(cpu.regs.sp, 0xF000);
}

#[test]
fn test_push_pop_af() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.set_af(0xABCD);
    bus.load(0, &[0xF5, 0xAF, 0xF1]); // PUSH AF; XOR A; POP AF

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.get_af(), 0xABCD);
}

#[test]
fn test_ex_sp_hl() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.sp = 0xE000;
    cpu.regs.set_hl(0x1122);
    bus.load(0xE000, &[0x33, 0x44]);
    bus.load(0, &[0xE3]); // EX (SP),HL

    assert_eq!(run_instruction(&mut cpu, &mut bus), 19);
    assert_eq!(cpu.regs.get_hl(), 0x4433);
    assert_eq!(bus.memory[0xE000], 0x22);
    assert_eq!(bus.memory[0xE001], 0x11);
    assert_eq!(cpu.regs.wz, 0x4433);
}

#[test]
fn test_stack_wraps() {
    let mut cpu = cpu_at(0);
    let mut bus = TestBus::new();
    cpu.regs.sp = 0x0001;
    cpu.regs.set_hl(0xA1B2);
    bus.load(0x100, &[0xE5]); // PUSH HL
    cpu.regs.pc = 0x100;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert_eq!(bus.memory[0x0000], 0xA1);
    assert_eq!(bus.memory[0xFFFF], 0xB2);
}
