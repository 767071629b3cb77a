//! Opcode dispatch tables.
//!
//! Every opcode of every prefix group maps to a small plain descriptor: the
//! operation kind the engine executes, the operand bytes it fetches after the
//! opcode, its documented uncontended T-state cost, and its control-flow class.
//! The tables are built at compile time from the opcode bit fields
//! (`xx yyy zzz`, with `y = pp q`).

/// Operation kinds. Register and condition operands are decoded from the
/// opcode bits by the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    // --- Unprefixed ---
    Nop,
    LdRpNn,
    LdIndA,
    LdAInd,
    LdNnHl,
    LdHlNn,
    LdNnA,
    LdANn,
    IncRp,
    DecRp,
    IncR,
    DecR,
    IncMem,
    DecMem,
    LdRN,
    LdMemN,
    Rlca,
    Rrca,
    Rla,
    Rra,
    ExAf,
    AddHlRp,
    Djnz,
    Jr,
    JrCc,
    Daa,
    Cpl,
    Scf,
    Ccf,
    LdRR,
    LdRMem,
    LdMemR,
    Halt,
    AluR,
    AluMem,
    AluN,
    RetCc,
    Pop,
    JpCc,
    Jp,
    CallCc,
    Call,
    Push,
    Rst,
    Ret,
    Exx,
    JpHl,
    LdSpHl,
    ExSpHl,
    ExDeHl,
    OutNA,
    InAN,
    Di,
    Ei,
    PrefixCb,
    PrefixDd,
    PrefixEd,
    PrefixFd,

    // --- CB ---
    Rot,
    RotMem,
    Bit,
    BitMem,
    Res,
    ResMem,
    Set,
    SetMem,

    // --- ED ---
    InRC,
    OutCR,
    SbcHl,
    AdcHl,
    LdNnRp,
    LdRpInd,
    Neg,
    Retn,
    Im,
    LdIA,
    LdRA,
    LdAI,
    LdAR,
    Rrd,
    Rld,
    Ldi,
    Cpi,
    Ini,
    Outi,
    Ldir,
    Cpir,
    Inir,
    Otir,
    /// Undefined ED opcode: 8 T no-op.
    EdNop,
}

/// Operand bytes fetched after the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetch {
    None,
    /// 8-bit immediate.
    Byte,
    /// 16-bit immediate, little-endian.
    Word,
    /// Signed relative branch offset.
    Relative,
    /// Signed index displacement (DD/FD memory operands).
    Displacement,
    /// Displacement followed by an 8-bit immediate: `LD (IX+d),n`.
    DisplacementByte,
}

impl Fetch {
    pub const fn len(self) -> u8 {
        match self {
            Fetch::None => 0,
            Fetch::Byte | Fetch::Relative | Fetch::Displacement => 1,
            Fetch::Word | Fetch::DisplacementByte => 2,
        }
    }
}

/// Control-flow class, used by the debugger for step-over and step-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Sequential,
    Jump,
    Call,
    Restart,
    Return,
    /// DJNZ: may branch back on itself.
    Loop,
    /// Repeating block instruction (LDIR, CPIR, INIR, OTIR and decrementing forms).
    Repeat,
    Halt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpDescriptor {
    pub op: Op,
    pub fetch: Fetch,
    /// Uncontended T-states. For conditional flow this is the not-taken / final-iteration cost.
    pub tacts: u8,
    /// Uncontended T-states when the branch is taken or the block repeats; 0 when not applicable.
    pub alt_tacts: u8,
    pub flow: Flow,
}

impl OpDescriptor {
    const fn new(op: Op, tacts: u8) -> Self {
        Self { op, fetch: Fetch::None, tacts, alt_tacts: 0, flow: Flow::Sequential }
    }

    const fn fetch(mut self, fetch: Fetch) -> Self {
        self.fetch = fetch;
        self
    }

    const fn alt(mut self, alt_tacts: u8) -> Self {
        self.alt_tacts = alt_tacts;
        self
    }

    const fn flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    /// True for the prefix bytes that select another table.
    pub const fn is_prefix(&self) -> bool {
        matches!(self.op, Op::PrefixCb | Op::PrefixDd | Op::PrefixEd | Op::PrefixFd)
    }

    /// True when the operation addresses `(HL)`, which becomes `(IX+d)`/`(IY+d)` under DD/FD.
    pub const fn uses_memory_operand(&self) -> bool {
        matches!(
            self.op,
            Op::IncMem | Op::DecMem | Op::LdMemN | Op::LdRMem | Op::LdMemR | Op::AluMem
        )
    }
}

/// Instruction prefix currently being executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Prefix {
    #[default]
    None,
    Cb,
    Ed,
    Dd,
    Fd,
    DdCb,
    FdCb,
}

// ---------------------------------------------------------------------------
// Table construction
// ---------------------------------------------------------------------------

const fn main_entry(opcode: u8) -> OpDescriptor {
    use Op::*;
    let x = opcode >> 6;
    let y = (opcode >> 3) & 0x07;
    let z = opcode & 0x07;
    let p = y >> 1;
    let q = y & 1;
    let d = OpDescriptor::new;

    match x {
        0 => match z {
            0 => match y {
                0 => d(Nop, 4),
                1 => d(ExAf, 4),
                2 => d(Djnz, 8).fetch(Fetch::Relative).alt(13).flow(Flow::Loop),
                3 => d(Jr, 12).fetch(Fetch::Relative).flow(Flow::Jump),
                _ => d(JrCc, 7).fetch(Fetch::Relative).alt(12).flow(Flow::Jump),
            },
            1 => {
                if q == 0 {
                    d(LdRpNn, 10).fetch(Fetch::Word)
                } else {
                    d(AddHlRp, 11)
                }
            }
            2 => match (q, p) {
                (0, 0) | (0, 1) => d(LdIndA, 7),
                (0, 2) => d(LdNnHl, 16).fetch(Fetch::Word),
                (0, _) => d(LdNnA, 13).fetch(Fetch::Word),
                (_, 0) | (_, 1) => d(LdAInd, 7),
                (_, 2) => d(LdHlNn, 16).fetch(Fetch::Word),
                _ => d(LdANn, 13).fetch(Fetch::Word),
            },
            3 => {
                if q == 0 {
                    d(IncRp, 6)
                } else {
                    d(DecRp, 6)
                }
            }
            4 => {
                if y == 6 {
                    d(IncMem, 11)
                } else {
                    d(IncR, 4)
                }
            }
            5 => {
                if y == 6 {
                    d(DecMem, 11)
                } else {
                    d(DecR, 4)
                }
            }
            6 => {
                if y == 6 {
                    d(LdMemN, 10).fetch(Fetch::Byte)
                } else {
                    d(LdRN, 7).fetch(Fetch::Byte)
                }
            }
            _ => match y {
                0 => d(Rlca, 4),
                1 => d(Rrca, 4),
                2 => d(Rla, 4),
                3 => d(Rra, 4),
                4 => d(Daa, 4),
                5 => d(Cpl, 4),
                6 => d(Scf, 4),
                _ => d(Ccf, 4),
            },
        },
        1 => {
            if opcode == 0x76 {
                d(Halt, 4).flow(Flow::Halt)
            } else if z == 6 {
                d(LdRMem, 7)
            } else if y == 6 {
                d(LdMemR, 7)
            } else {
                d(LdRR, 4)
            }
        }
        2 => {
            if z == 6 {
                d(AluMem, 7)
            } else {
                d(AluR, 4)
            }
        }
        _ => match z {
            0 => d(RetCc, 5).alt(11).flow(Flow::Return),
            1 => {
                if q == 0 {
                    d(Pop, 10)
                } else {
                    match p {
                        0 => d(Ret, 10).flow(Flow::Return),
                        1 => d(Exx, 4),
                        2 => d(JpHl, 4).flow(Flow::Jump),
                        _ => d(LdSpHl, 6),
                    }
                }
            }
            2 => d(JpCc, 10).fetch(Fetch::Word).flow(Flow::Jump),
            3 => match y {
                0 => d(Jp, 10).fetch(Fetch::Word).flow(Flow::Jump),
                1 => d(PrefixCb, 4),
                2 => d(OutNA, 11).fetch(Fetch::Byte),
                3 => d(InAN, 11).fetch(Fetch::Byte),
                4 => d(ExSpHl, 19),
                5 => d(ExDeHl, 4),
                6 => d(Di, 4),
                _ => d(Ei, 4),
            },
            4 => d(CallCc, 10).fetch(Fetch::Word).alt(17).flow(Flow::Call),
            5 => {
                if q == 0 {
                    d(Push, 11)
                } else {
                    match p {
                        0 => d(Call, 17).fetch(Fetch::Word).flow(Flow::Call),
                        1 => d(PrefixDd, 4),
                        2 => d(PrefixEd, 4),
                        _ => d(PrefixFd, 4),
                    }
                }
            }
            6 => d(AluN, 7).fetch(Fetch::Byte),
            _ => d(Rst, 11).flow(Flow::Restart),
        },
    }
}

/// CB table costs include the CB prefix M1.
const fn cb_entry(opcode: u8) -> OpDescriptor {
    use Op::*;
    let mem = (opcode & 0x07) == 6;
    let d = OpDescriptor::new;
    match (opcode >> 6, mem) {
        (0, false) => d(Rot, 8),
        (0, true) => d(RotMem, 15),
        (1, false) => d(Bit, 8),
        (1, true) => d(BitMem, 12),
        (2, false) => d(Res, 8),
        (2, true) => d(ResMem, 15),
        (_, false) => d(Set, 8),
        (_, true) => d(SetMem, 15),
    }
}

/// DD CB d op / FD CB d op. The displacement precedes the opcode, so no fetch
/// follows it. Every form addresses memory, whatever the low three bits say.
const fn index_cb_entry(opcode: u8) -> OpDescriptor {
    use Op::*;
    let d = OpDescriptor::new;
    match opcode >> 6 {
        0 => d(RotMem, 23),
        1 => d(BitMem, 20),
        2 => d(ResMem, 23),
        _ => d(SetMem, 23),
    }
}

/// ED table costs include the ED prefix M1.
const fn ed_entry(opcode: u8) -> OpDescriptor {
    use Op::*;
    let x = opcode >> 6;
    let y = (opcode >> 3) & 0x07;
    let z = opcode & 0x07;
    let q = y & 1;
    let d = OpDescriptor::new;

    if x == 1 {
        match z {
            0 => d(InRC, 12),
            1 => d(OutCR, 12),
            2 => {
                if q == 0 {
                    d(SbcHl, 15)
                } else {
                    d(AdcHl, 15)
                }
            }
            3 => {
                if q == 0 {
                    d(LdNnRp, 20).fetch(Fetch::Word)
                } else {
                    d(LdRpInd, 20).fetch(Fetch::Word)
                }
            }
            4 => d(Neg, 8),
            5 => d(Retn, 14).flow(Flow::Return),
            6 => d(Im, 8),
            _ => match y {
                0 => d(LdIA, 9),
                1 => d(LdRA, 9),
                2 => d(LdAI, 9),
                3 => d(LdAR, 9),
                4 => d(Rrd, 18),
                5 => d(Rld, 18),
                _ => d(EdNop, 8),
            },
        }
    } else if x == 2 && z <= 3 && y >= 4 {
        let repeat = y >= 6;
        let base = match z {
            0 => if repeat { Ldir } else { Ldi },
            1 => if repeat { Cpir } else { Cpi },
            2 => if repeat { Inir } else { Ini },
            _ => if repeat { Otir } else { Outi },
        };
        if repeat {
            d(base, 16).alt(21).flow(Flow::Repeat)
        } else {
            d(base, 16)
        }
    } else {
        d(EdNop, 8)
    }
}

/// DD/FD variant of a main-table entry. Costs include the index prefix M1:
/// memory operands gain the displacement fetch and address computation,
/// everything else just the extra 4 T of the prefix.
const fn indexed_entry(opcode: u8) -> OpDescriptor {
    let mut desc = main_entry(opcode);
    if desc.is_prefix() {
        return desc;
    }
    if desc.uses_memory_operand() {
        if matches!(desc.op, Op::LdMemN) {
            desc.fetch = Fetch::DisplacementByte;
            desc.tacts += 9;
        } else {
            desc.fetch = Fetch::Displacement;
            desc.tacts += 12;
        }
    } else {
        desc.tacts += 4;
        if desc.alt_tacts != 0 {
            desc.alt_tacts += 4;
        }
    }
    desc
}

macro_rules! build_table {
    ($entry:ident) => {{
        let mut table = [OpDescriptor::new(Op::Nop, 4); 256];
        let mut i = 0;
        while i < 256 {
            table[i] = $entry(i as u8);
            i += 1;
        }
        table
    }};
}

pub static MAIN: [OpDescriptor; 256] = build_table!(main_entry);
pub static CB: [OpDescriptor; 256] = build_table!(cb_entry);
pub static ED: [OpDescriptor; 256] = build_table!(ed_entry);
pub static INDEXED: [OpDescriptor; 256] = build_table!(indexed_entry);
pub static INDEXED_CB: [OpDescriptor; 256] = build_table!(index_cb_entry);

// ---------------------------------------------------------------------------
// Decoding helpers for tools (debugger, disassembly views)
// ---------------------------------------------------------------------------

/// A decoded instruction: its descriptor, prefix group and total length in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub descriptor: &'static OpDescriptor,
    pub prefix: Prefix,
    pub length: u8,
}

/// Decode the instruction whose first bytes are `bytes`.
///
/// A DD/FD prefix followed by another prefix byte (other than CB) acts as a
/// 4 T no-op on its own and decodes as a one-byte instruction.
pub fn decode(bytes: [u8; 4]) -> Decoded {
    let [b0, b1, _, b3] = bytes;
    match b0 {
        0xCB => Decoded { descriptor: &CB[b1 as usize], prefix: Prefix::Cb, length: 2 },
        0xED => {
            let descriptor = &ED[b1 as usize];
            Decoded { descriptor, prefix: Prefix::Ed, length: 2 + descriptor.fetch.len() }
        }
        0xDD | 0xFD => {
            let ix = b0 == 0xDD;
            match b1 {
                0xCB => Decoded {
                    descriptor: &INDEXED_CB[b3 as usize],
                    prefix: if ix { Prefix::DdCb } else { Prefix::FdCb },
                    length: 4,
                },
                0xDD | 0xED | 0xFD => Decoded {
                    descriptor: &MAIN[0],
                    prefix: if ix { Prefix::Dd } else { Prefix::Fd },
                    length: 1,
                },
                _ => {
                    let descriptor = &INDEXED[b1 as usize];
                    Decoded {
                        descriptor,
                        prefix: if ix { Prefix::Dd } else { Prefix::Fd },
                        length: 2 + descriptor.fetch.len(),
                    }
                }
            }
        }
        _ => {
            let descriptor = &MAIN[b0 as usize];
            Decoded { descriptor, prefix: Prefix::None, length: 1 + descriptor.fetch.len() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_costs() {
        assert_eq!(MAIN[0x00].tacts, 4);
        assert_eq!(MAIN[0x18].tacts, 12);
        assert_eq!((MAIN[0x20].tacts, MAIN[0x20].alt_tacts), (7, 12));
        assert_eq!((MAIN[0x10].tacts, MAIN[0x10].alt_tacts), (8, 13));
        assert_eq!(MAIN[0xCD].tacts, 17);
        assert_eq!((MAIN[0xC4].tacts, MAIN[0xC4].alt_tacts), (10, 17));
        assert_eq!((MAIN[0xC0].tacts, MAIN[0xC0].alt_tacts), (5, 11));
        assert_eq!(MAIN[0xE3].tacts, 19);
        assert_eq!(MAIN[0x34].tacts, 11);
        assert_eq!(CB[0x46].tacts, 12);
        assert_eq!(CB[0x06].tacts, 15);
        assert_eq!(ED[0x57].tacts, 9);
        assert_eq!(ED[0x67].tacts, 18);
        assert_eq!((ED[0xB0].tacts, ED[0xB0].alt_tacts), (16, 21));
        assert_eq!(ED[0x00].op, Op::EdNop);
        assert_eq!(ED[0x00].tacts, 8);
    }

    #[test]
    fn indexed_costs() {
        assert_eq!(INDEXED[0x7E].tacts, 19); // LD A,(IX+d)
        assert_eq!(INDEXED[0x77].tacts, 19); // LD (IX+d),A
        assert_eq!(INDEXED[0x36].tacts, 19); // LD (IX+d),n
        assert_eq!(INDEXED[0x36].fetch, Fetch::DisplacementByte);
        assert_eq!(INDEXED[0x34].tacts, 23); // INC (IX+d)
        assert_eq!(INDEXED[0x86].tacts, 19); // ADD A,(IX+d)
        assert_eq!(INDEXED[0x21].tacts, 14); // LD IX,nn
        assert_eq!(INDEXED[0xE9].tacts, 8); // JP (IX)
        assert_eq!(INDEXED[0xE3].tacts, 23); // EX (SP),IX
        assert_eq!(INDEXED_CB[0x46].tacts, 20);
        assert_eq!(INDEXED_CB[0x06].tacts, 23);
    }

    #[test]
    fn flow_classes() {
        assert_eq!(MAIN[0xCD].flow, Flow::Call);
        assert_eq!(MAIN[0xDC].flow, Flow::Call);
        assert_eq!(MAIN[0xFF].flow, Flow::Restart);
        assert_eq!(MAIN[0xC9].flow, Flow::Return);
        assert_eq!(MAIN[0xD8].flow, Flow::Return);
        assert_eq!(ED[0x4D].flow, Flow::Return);
        assert_eq!(ED[0xB8].flow, Flow::Repeat);
        assert_eq!(MAIN[0x76].flow, Flow::Halt);
        assert_eq!(MAIN[0x10].flow, Flow::Loop);
        assert_eq!(MAIN[0x3E].flow, Flow::Sequential);
    }

    #[test]
    fn decode_lengths() {
        assert_eq!(decode([0x00, 0, 0, 0]).length, 1);
        assert_eq!(decode([0x3E, 0x12, 0, 0]).length, 2);
        assert_eq!(decode([0xCD, 0x00, 0x80, 0]).length, 3);
        assert_eq!(decode([0xCB, 0x47, 0, 0]).length, 2);
        assert_eq!(decode([0xED, 0xB0, 0, 0]).length, 2);
        assert_eq!(decode([0xED, 0x43, 0x00, 0x80]).length, 4);
        assert_eq!(decode([0xDD, 0x21, 0x00, 0x80]).length, 4);
        assert_eq!(decode([0xDD, 0x7E, 0x05, 0]).length, 3);
        assert_eq!(decode([0xFD, 0x36, 0x05, 0x99]).length, 4);
        assert_eq!(decode([0xDD, 0xCB, 0x05, 0x46]).length, 4);
        assert_eq!(decode([0xDD, 0xCB, 0x05, 0x46]).prefix, Prefix::DdCb);
        assert_eq!(decode([0xDD, 0xFD, 0x21, 0]).length, 1);
    }
}
