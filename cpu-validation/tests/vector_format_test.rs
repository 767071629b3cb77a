use spectra_core::core::Bus;
use spectra_core::cpu::z80::Z80;
use spectra_cpu_validation::{
    BusCycle, BusOp, TracingBus, Z80TestCase, capture_state, default_port_value, run_test_case,
};

fn state(pc: u16, a: u8, r: u8, wz: u16, ram: &str) -> String {
    format!(
        r#"{{"pc":{pc},"sp":65280,"a":{a},"b":1,"c":2,"d":3,"e":4,"f":197,"h":5,"l":6,
        "i":7,"r":{r},"ei":0,"wz":{wz},"ix":4660,"iy":22136,"af_":1,"bc_":2,"de_":3,"hl_":4,
        "im":1,"p":0,"q":0,"iff1":1,"iff2":1,"ram":{ram}}}"#
    )
}

fn case(name: &str, initial: String, final_state: String, tacts: usize, ports: &str) -> Z80TestCase {
    let cycles = vec![r#"[0,null,"----"]"#; tacts].join(",");
    let json = format!(
        r#"{{"name":"{name}","initial":{initial},"final":{final_state},"cycles":[{cycles}],"ports":{ports}}}"#
    );
    serde_json::from_str(&json).expect("vector should parse")
}

#[test]
fn test_nop_vector_passes() {
    let tc = case(
        "00",
        state(0x8000, 0x11, 0xFF, 0, "[[32768,0]]"),
        state(0x8001, 0x11, 0x80, 0, "[[32768,0]]"),
        4,
        "[]",
    );
    assert_eq!(tc.initial.af_prime, 1);
    run_test_case(&tc).unwrap();
}

#[test]
fn test_out_vector_checks_port_writes() {
    let ram = "[[32768,211],[32769,254]]";
    let tc = case(
        "d3 fe",
        state(0x8000, 0x12, 0x00, 0, ram),
        state(0x8002, 0x12, 0x01, 0x12FF, ram),
        11,
        r#"[[4862,18,"w"]]"#,
    );
    run_test_case(&tc).unwrap();

    let wrong = case(
        "d3 fe",
        state(0x8000, 0x12, 0x00, 0, ram),
        state(0x8002, 0x12, 0x01, 0x12FF, ram),
        11,
        r#"[[4862,19,"w"]]"#,
    );
    assert!(run_test_case(&wrong).unwrap_err().contains("missing port"));
}

#[test]
fn test_in_vector_uses_scripted_port_value() {
    let ram = "[[32768,219],[32769,254]]";
    let tc = case(
        "db fe",
        state(0x8000, 0x12, 0x00, 0, ram),
        state(0x8002, 0x5A, 0x01, 0x12FF, ram),
        11,
        r#"[[4862,90,"r"]]"#,
    );
    run_test_case(&tc).unwrap();
}

#[test]
fn test_mismatch_reports_tacts() {
    let tc = case(
        "00",
        state(0x8000, 0x11, 0x00, 0, "[[32768,0]]"),
        state(0x8001, 0x11, 0x01, 0, "[[32768,0]]"),
        5,
        "[]",
    );
    assert!(run_test_case(&tc).unwrap_err().contains("tacts"));
}

#[test]
fn test_tracing_bus_records_accesses() {
    let mut cpu = Z80::new();
    let mut bus = TracingBus::new();
    // LD (HL),A; OUT (C),A via ED 79; IN A,(C) via ED 78
    bus.load(0x0000, &[0x77, 0xED, 0x79, 0xED, 0x78]);
    cpu.regs.set_hl(0x9000);
    cpu.regs.set_bc(0x1234);
    cpu.regs.a = 0x42;

    cpu.execute_cycle(&mut bus);
    assert_eq!(bus.memory[0x9000], 0x42);
    assert_eq!(
        bus.cycles,
        vec![
            BusCycle { addr: 0x0000, data: 0x77, op: BusOp::Read },
            BusCycle { addr: 0x9000, data: 0x42, op: BusOp::Write },
        ]
    );

    bus.clear_cycles();
    cpu.execute_cycle(&mut bus);
    cpu.execute_cycle(&mut bus);
    assert_eq!(cpu.regs.a, default_port_value(0x1234));
    assert_eq!(
        bus.port_log(),
        vec![
            (0x1234, 0x42, "w".to_string()),
            (0x1234, default_port_value(0x1234), "r".to_string()),
        ]
    );

    let snapshot = capture_state(&cpu);
    assert_eq!(snapshot.pc, 5);
    assert!(snapshot.ram.is_empty());

    let mut scripted = TracingBus::new();
    scripted.script_port_reads([0x01, 0x02]);
    assert_eq!(scripted.io_read(0xFFFE), 0x01);
    assert_eq!(scripted.io_read(0xFFFE), 0x02);
    assert_eq!(scripted.io_read(0xFFFE), default_port_value(0xFFFE));
}
