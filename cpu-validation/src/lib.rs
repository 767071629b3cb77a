use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use spectra_core::core::Bus;
use spectra_core::cpu::z80::Z80;

// --- TracingBus: flat 64KB memory with access recording ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusOp {
    Read,
    Write,
    IoRead,
    IoWrite,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

/// Port reads not scripted by the test return a value derived from the port
/// address, so generated vectors replay identically.
pub fn default_port_value(port: u16) -> u8 {
    ((port >> 8) as u8) ^ (port as u8) ^ 0x5A
}

pub struct TracingBus {
    pub memory: Box<[u8; 0x10000]>,
    pub cycles: Vec<BusCycle>,
    scripted: VecDeque<u8>,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            cycles: Vec::new(),
            scripted: VecDeque::new(),
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.memory[addr.wrapping_add(i as u16) as usize] = byte;
        }
    }

    /// Values returned by the next port reads, in order.
    pub fn script_port_reads(&mut self, values: impl IntoIterator<Item = u8>) {
        self.scripted.extend(values);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }

    /// Port accesses in the SingleStepTests `ports` format.
    pub fn port_log(&self) -> Vec<(u16, u8, String)> {
        self.cycles
            .iter()
            .filter_map(|c| match c.op {
                BusOp::IoRead => Some((c.addr, c.data, "r".to_string())),
                BusOp::IoWrite => Some((c.addr, c.data, "w".to_string())),
                _ => None,
            })
            .collect()
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TracingBus {
    fn read(&mut self, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Read,
        });
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        self.cycles.push(BusCycle {
            addr,
            data,
            op: BusOp::Write,
        });
    }

    fn io_read(&mut self, port: u16) -> u8 {
        let data = self
            .scripted
            .pop_front()
            .unwrap_or_else(|| default_port_value(port));
        self.cycles.push(BusCycle {
            addr: port,
            data,
            op: BusOp::IoRead,
        });
        data
    }

    fn io_write(&mut self, port: u16, data: u8) {
        self.cycles.push(BusCycle {
            addr: port,
            data,
            op: BusOp::IoWrite,
        });
    }
}

// --- Z80 JSON test vector types (SingleStepTests/z80 v1 format) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80TestCase {
    pub name: String,
    pub initial: Z80CpuState,
    #[serde(rename = "final")]
    pub final_state: Z80CpuState,
    /// One entry per T-state: address, data bus (if driven), pin activity.
    pub cycles: Vec<(u16, Option<u8>, String)>,
    #[serde(default)]
    pub ports: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Z80CpuState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub h: u8,
    pub l: u8,
    pub i: u8,
    pub r: u8,
    #[serde(default)]
    pub ei: u8,
    pub wz: u16,
    pub ix: u16,
    pub iy: u16,
    #[serde(rename = "af_")]
    pub af_prime: u16,
    #[serde(rename = "bc_")]
    pub bc_prime: u16,
    #[serde(rename = "de_")]
    pub de_prime: u16,
    #[serde(rename = "hl_")]
    pub hl_prime: u16,
    pub im: u8,
    #[serde(default)]
    pub p: u8,
    #[serde(default)]
    pub q: u8,
    pub iff1: u8,
    pub iff2: u8,
    pub ram: Vec<(u16, u8)>,
}

pub fn load_state(cpu: &mut Z80, s: &Z80CpuState) {
    let regs = &mut cpu.regs;
    regs.a = s.a;
    regs.f = s.f;
    regs.b = s.b;
    regs.c = s.c;
    regs.d = s.d;
    regs.e = s.e;
    regs.h = s.h;
    regs.l = s.l;
    regs.i = s.i;
    regs.r = s.r;
    regs.ix = s.ix;
    regs.iy = s.iy;
    regs.sp = s.sp;
    regs.pc = s.pc;
    regs.wz = s.wz;
    regs.set_af_prime(s.af_prime);
    regs.set_bc_prime(s.bc_prime);
    regs.set_de_prime(s.de_prime);
    regs.set_hl_prime(s.hl_prime);
    cpu.iff1 = s.iff1 != 0;
    cpu.iff2 = s.iff2 != 0;
    cpu.im = s.im;
    cpu.ei_delay = s.ei != 0;
    cpu.p = s.p != 0;
    cpu.q = s.q;
}

/// Register state of `cpu`; `ram` is left empty.
pub fn capture_state(cpu: &Z80) -> Z80CpuState {
    let regs = &cpu.regs;
    Z80CpuState {
        pc: regs.pc,
        sp: regs.sp,
        a: regs.a,
        b: regs.b,
        c: regs.c,
        d: regs.d,
        e: regs.e,
        f: regs.f,
        h: regs.h,
        l: regs.l,
        i: regs.i,
        r: regs.r,
        ei: cpu.ei_delay as u8,
        wz: regs.wz,
        ix: regs.ix,
        iy: regs.iy,
        af_prime: regs.get_af_prime(),
        bc_prime: regs.get_bc_prime(),
        de_prime: regs.get_de_prime(),
        hl_prime: regs.get_hl_prime(),
        im: cpu.im,
        p: cpu.p as u8,
        q: cpu.q,
        iff1: cpu.iff1 as u8,
        iff2: cpu.iff2 as u8,
        ram: Vec::new(),
    }
}

/// Execute one instruction from `tc.initial` and compare against `tc.final_state`.
/// Returns the first mismatch.
pub fn run_test_case(tc: &Z80TestCase) -> Result<(), String> {
    let mut cpu = Z80::new();
    let mut bus = TracingBus::new();
    load_state(&mut cpu, &tc.initial);
    for &(addr, value) in &tc.initial.ram {
        bus.memory[addr as usize] = value;
    }
    bus.script_port_reads(
        tc.ports
            .iter()
            .filter(|(_, _, dir)| dir == "r")
            .map(|&(_, data, _)| data),
    );

    let start = cpu.tacts;
    cpu.execute_cycle(&mut bus);
    let tacts = (cpu.tacts - start) as usize;

    let mut got = capture_state(&cpu);
    got.ram = tc
        .final_state
        .ram
        .iter()
        .map(|&(addr, _)| (addr, bus.memory[addr as usize]))
        .collect();
    if got != tc.final_state {
        return Err(format!(
            "{}: state mismatch\n  got: {got:?}\n  exp: {:?}",
            tc.name, tc.final_state
        ));
    }

    if tacts != tc.cycles.len() {
        return Err(format!(
            "{}: tacts (got {tacts} exp {})",
            tc.name,
            tc.cycles.len()
        ));
    }

    for (port, data, dir) in tc.ports.iter().filter(|(_, _, dir)| dir == "w") {
        let written = bus
            .cycles
            .iter()
            .any(|c| c.op == BusOp::IoWrite && c.addr == *port && c.data == *data);
        if !written {
            return Err(format!("{}: missing port {dir} {port:04X}={data:02X}", tc.name));
        }
    }
    Ok(())
}

/// Read a vector file, transparently decompressing `.gz`.
pub fn load_test_file(path: &Path) -> io::Result<Vec<Z80TestCase>> {
    let file = BufReader::new(File::open(path)?);
    let mut json = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file).read_to_string(&mut json)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut json)?;
    }
    Ok(serde_json::from_str(&json)?)
}

/// Vector files (`.json` or `.json.gz`) in `dir`, sorted by name.
/// `None` when the directory does not exist.
pub fn vector_files(dir: &Path) -> io::Result<Option<Vec<std::path::PathBuf>>> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            let name = p.to_string_lossy();
            name.ends_with(".json") || name.ends_with(".json.gz")
        })
        .collect();
    files.sort();
    Ok(Some(files))
}
