use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use rand::Rng;
use spectra_core::cpu::z80::Z80;
use spectra_cpu_validation::{
    BusOp, TracingBus, Z80CpuState, Z80TestCase, capture_state, load_state,
};

const NUM_TESTS: usize = 50;

/// One opcode within a prefix group.
struct InstrDef {
    prefix: &'static [u8],
    opcode: u8,
}

impl InstrDef {
    fn indexed_bit(&self) -> bool {
        self.prefix.len() == 2
    }

    fn file_stem(&self) -> String {
        let mut stem: String = self.prefix.iter().map(|b| format!("{b:02x}")).collect();
        if !stem.is_empty() {
            stem.push('_');
        }
        stem.push_str(&format!("{:02x}", self.opcode));
        stem
    }

    /// Instruction bytes; `disp` fills the DDCB/FDCB displacement slot.
    fn bytes(&self, disp: u8) -> Vec<u8> {
        let mut bytes = self.prefix.to_vec();
        if self.indexed_bit() {
            bytes.push(disp);
        }
        bytes.push(self.opcode);
        bytes
    }
}

const GROUPS: &[&[u8]] = &[&[], &[0xCB], &[0xED], &[0xDD], &[0xFD], &[0xDD, 0xCB], &[0xFD, 0xCB]];

fn all_instructions() -> Vec<InstrDef> {
    let mut v = Vec::new();
    for &prefix in GROUPS {
        for opcode in 0..=0xFFu8 {
            // Prefix bytes are only meaningful in front of another opcode.
            let is_prefix = matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD);
            if is_prefix && (prefix.is_empty() || prefix == [0xDD] || prefix == [0xFD]) {
                continue;
            }
            v.push(InstrDef { prefix, opcode });
        }
    }
    v
}

fn random_state(rng: &mut impl Rng) -> Z80CpuState {
    Z80CpuState {
        pc: rng.r#gen(),
        sp: rng.r#gen(),
        a: rng.r#gen(),
        b: rng.r#gen(),
        c: rng.r#gen(),
        d: rng.r#gen(),
        e: rng.r#gen(),
        f: rng.r#gen(),
        h: rng.r#gen(),
        l: rng.r#gen(),
        i: rng.r#gen(),
        r: rng.r#gen(),
        wz: rng.r#gen(),
        ix: rng.r#gen(),
        iy: rng.r#gen(),
        af_prime: rng.r#gen(),
        bc_prime: rng.r#gen(),
        de_prime: rng.r#gen(),
        hl_prime: rng.r#gen(),
        im: rng.gen_range(0..=2),
        iff1: rng.gen_range(0..=1),
        iff2: rng.gen_range(0..=1),
        ..Z80CpuState::default()
    }
}

fn pin_activity(op: BusOp) -> &'static str {
    match op {
        BusOp::Read => "r-m-",
        BusOp::Write => "-wm-",
        BusOp::IoRead => "r--i",
        BusOp::IoWrite => "-w-i",
    }
}

fn generate_opcode(rng: &mut impl Rng, instr: &InstrDef) -> Vec<Z80TestCase> {
    let mut tests = Vec::with_capacity(NUM_TESTS);

    for _ in 0..NUM_TESTS {
        let mut cpu = Z80::new();
        let mut bus = TracingBus::new();
        rng.fill(&mut bus.memory[..]);

        let mut initial = random_state(rng);
        let bytes = instr.bytes(rng.r#gen());
        bus.load(initial.pc, &bytes);
        load_state(&mut cpu, &initial);

        let pre_memory = bus.memory.clone();
        let start = cpu.tacts;
        cpu.execute_cycle(&mut bus);
        let tacts = (cpu.tacts - start) as usize;

        let mut final_state = capture_state(&cpu);

        let mut addresses: Vec<u16> = bus
            .cycles
            .iter()
            .filter(|c| matches!(c.op, BusOp::Read | BusOp::Write))
            .map(|c| c.addr)
            .collect();
        addresses.sort_unstable();
        addresses.dedup();
        initial.ram = addresses.iter().map(|&a| (a, pre_memory[a as usize])).collect();
        final_state.ram = addresses.iter().map(|&a| (a, bus.memory[a as usize])).collect();

        // Only bus accesses are traced; the rest of the T-states are idle.
        let mut cycles: Vec<(u16, Option<u8>, String)> = bus
            .cycles
            .iter()
            .map(|c| (c.addr, Some(c.data), pin_activity(c.op).to_string()))
            .collect();
        cycles.resize(tacts.max(cycles.len()), (0, None, "----".to_string()));

        let name = bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");

        tests.push(Z80TestCase {
            name,
            initial,
            final_state,
            cycles,
            ports: bus.port_log(),
        });
    }

    tests
}

fn generate_and_write(rng: &mut impl Rng, instr: &InstrDef, out_dir: &Path) {
    let tests = generate_opcode(rng, instr);
    let out_path = out_dir.join(format!("{}.json.gz", instr.file_stem()));
    let json = serde_json::to_string(&tests).expect("Failed to serialize test cases");
    let file = File::create(&out_path).expect("Failed to create output file");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(json.as_bytes())
        .expect("Failed to write output file");
    encoder.finish().expect("Failed to finish gzip stream");
    println!("Generated {} tests -> {}", tests.len(), out_path.display());
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: gen_z80_vectors <stem | all>");
        eprintln!("Examples:");
        eprintln!("  gen_z80_vectors 3e        # LD A,n");
        eprintln!("  gen_z80_vectors ddcb_06   # RLC (IX+d)");
        eprintln!("  gen_z80_vectors all");
        std::process::exit(1);
    }

    let out_dir = Path::new("test_data/spectra");
    fs::create_dir_all(out_dir).expect("Failed to create output directory");

    let all = all_instructions();
    let mut rng = rand::thread_rng();

    if args[1] == "all" {
        for instr in &all {
            generate_and_write(&mut rng, instr, out_dir);
        }
        println!("Generated vectors for {} opcodes", all.len());
    } else {
        let stem = args[1].to_lowercase();
        let instr = all.iter().find(|i| i.file_stem() == stem).unwrap_or_else(|| {
            eprintln!("No instruction with stem {stem}");
            std::process::exit(1);
        });
        generate_and_write(&mut rng, instr, out_dir);
    }
}
