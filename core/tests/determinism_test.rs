use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spectra_core::core::{DebugStepMode, ExecutionContext, FrameEngine, TerminationMode};
use spectra_core::cpu::CpuStateTrait;
mod common;
use common::{TestBus, cpu_at};

fn random_bus(seed: u64) -> TestBus {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bus = TestBus::new();
    rng.fill(&mut bus.memory[..]);
    bus.port_value = rng.gen_range(0..=255);
    bus
}

#[test]
fn test_same_program_same_result() {
    for seed in [1u64, 7, 42] {
        let mut bus_a = random_bus(seed);
        let mut bus_b = random_bus(seed);
        let mut cpu_a = cpu_at(0);
        let mut cpu_b = cpu_at(0);

        for _ in 0..20_000 {
            cpu_a.execute_cycle(&mut bus_a);
            cpu_b.execute_cycle(&mut bus_b);
        }
        assert_eq!(cpu_a.snapshot(), cpu_b.snapshot(), "seed {seed}");
        assert_eq!(bus_a.memory, bus_b.memory);
        assert_eq!(bus_a.io_writes, bus_b.io_writes);
    }
}

#[test]
fn test_frame_boundaries_conserve_tacts() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut bus = random_bus(99);
    bus.frame_tacts = 1_000;
    let mut cpu = cpu_at(0);
    let mut engine = FrameEngine::new();
    let mut ctx = ExecutionContext::new();
    ctx.prepare(TerminationMode::Normal, DebugStepMode::NoDebug);

    for frame in 1..=50u64 {
        if rng.gen_bool(0.1) {
            engine.set_clock_multiplier(rng.gen_range(1..=3));
        }
        let before = engine.frame_start();
        assert!(engine.execute_frame(&mut cpu, &mut bus, &mut ctx));
        let len = 1_000 * engine.clock_multiplier() as u64;
        assert_eq!(engine.frame_start(), before + len);
        assert_eq!(cpu.tacts, engine.frame_start() + engine.frame_overflow());
        // No instruction is longer than 23 T plus a block repeat.
        assert!(engine.frame_overflow() < 32, "frame {frame}");
    }
    assert_eq!(engine.frame_count(), 50);
}
