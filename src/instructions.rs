use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::decoder::OperandKind;
use crate::isa::mcs51;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mnemonic {
    Acall,
    Add,
    Addc,
    Ajmp,
    Anl,
    Cjne,
    Clr,
    Cpl,
    Da,
    Dec,
    Div,
    Djnz,
    Inc,
    Jb,
    Jbc,
    Jc,
    Jmp,
    Jnb,
    Jnc,
    Jnz,
    Jz,
    Lcall,
    Ljmp,
    Mov,
    Movc,
    Movx,
    Mul,
    Nop,
    Orl,
    Pop,
    Push,
    Ret,
    Reti,
    Rl,
    Rlc,
    Rr,
    Rrc,
    Setb,
    Sjmp,
    Subb,
    Swap,
    Xch,
    Xchd,
    Xrl,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        match self {
            Mnemonic::Acall => "acall",
            Mnemonic::Add => "add",
            Mnemonic::Addc => "addc",
            Mnemonic::Ajmp => "ajmp",
            Mnemonic::Anl => "anl",
            Mnemonic::Cjne => "cjne",
            Mnemonic::Clr => "clr",
            Mnemonic::Cpl => "cpl",
            Mnemonic::Da => "da",
            Mnemonic::Dec => "dec",
            Mnemonic::Div => "div",
            Mnemonic::Djnz => "djnz",
            Mnemonic::Inc => "inc",
            Mnemonic::Jb => "jb",
            Mnemonic::Jbc => "jbc",
            Mnemonic::Jc => "jc",
            Mnemonic::Jmp => "jmp",
            Mnemonic::Jnb => "jnb",
            Mnemonic::Jnc => "jnc",
            Mnemonic::Jnz => "jnz",
            Mnemonic::Jz => "jz",
            Mnemonic::Lcall => "lcall",
            Mnemonic::Ljmp => "ljmp",
            Mnemonic::Mov => "mov",
            Mnemonic::Movc => "movc",
            Mnemonic::Movx => "movx",
            Mnemonic::Mul => "mul",
            Mnemonic::Nop => "nop",
            Mnemonic::Orl => "orl",
            Mnemonic::Pop => "pop",
            Mnemonic::Push => "push",
            Mnemonic::Ret => "ret",
            Mnemonic::Reti => "reti",
            Mnemonic::Rl => "rl",
            Mnemonic::Rlc => "rlc",
            Mnemonic::Rr => "rr",
            Mnemonic::Rrc => "rrc",
            Mnemonic::Setb => "setb",
            Mnemonic::Sjmp => "sjmp",
            Mnemonic::Subb => "subb",
            Mnemonic::Swap => "swap",
            Mnemonic::Xch => "xch",
            Mnemonic::Xchd => "xchd",
            Mnemonic::Xrl => "xrl",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One token of an instruction's argument list.
///
/// Fixed registers render as themselves; the slot variants refer to the
/// decoded operand with that index, which need not follow encoding order
/// (`mov dst, src` stores `src` first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arg {
    A,
    C,
    AB,
    Dptr,
    /// `Rn`
    Reg(u8),
    /// `@Ri`
    IndReg(u8),
    IndDptr,
    IndADptr,
    IndAPc,
    /// Operand as is.
    Slot(u8),
    /// Operand prefixed with `#`.
    Imm(u8),
    /// Bit operand prefixed with `/`.
    NotBit(u8),
}

impl Arg {
    pub fn slot(self) -> Option<usize> {
        match self {
            Arg::Slot(i) | Arg::Imm(i) | Arg::NotBit(i) => Some(usize::from(i)),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Flow: u8 {
        const EXITS = 1 << 0; // execution never falls through to the next instruction
        const POINTER_LOAD = 1 << 1; // label operand is data, not a control transfer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub opcode: u8,
    pub length: u8,
    pub mnemonic: Mnemonic,
    pub args: Vec<Arg>,
    pub operands: &'static [OperandKind],
    pub flow: Flow,
}

impl Descriptor {
    pub fn new(
        opcode: u8,
        length: u8,
        mnemonic: Mnemonic,
        args: Vec<Arg>,
        operands: &'static [OperandKind],
    ) -> Self {
        Self { opcode, length, mnemonic, args, operands, flow: Flow::empty() }
    }

    pub fn exits(mut self) -> Self {
        self.flow |= Flow::EXITS;
        self
    }

    pub fn pointer_load(mut self) -> Self {
        self.flow |= Flow::POINTER_LOAD;
        self
    }

    pub fn exits_flow(&self) -> bool {
        self.flow.contains(Flow::EXITS)
    }

    pub fn is_pointer_load(&self) -> bool {
        self.flow.contains(Flow::POINTER_LOAD)
    }

    /// Render `mnemonic args`, asking `operand` for the text of each slot.
    pub fn render_with<F: FnMut(usize) -> String>(&self, mut operand: F) -> String {
        let mut out = String::from(self.mnemonic.as_str());
        for (i, arg) in self.args.iter().enumerate() {
            out.push_str(if i == 0 { " " } else { ", " });
            match *arg {
                Arg::A => out.push('A'),
                Arg::C => out.push('C'),
                Arg::AB => out.push_str("AB"),
                Arg::Dptr => out.push_str("DPTR"),
                Arg::Reg(n) => out.push_str(&format!("R{n}")),
                Arg::IndReg(n) => out.push_str(&format!("@R{n}")),
                Arg::IndDptr => out.push_str("@DPTR"),
                Arg::IndADptr => out.push_str("@A + DPTR"),
                Arg::IndAPc => out.push_str("@A + PC"),
                Arg::Slot(n) => out.push_str(&operand(usize::from(n))),
                Arg::Imm(n) => {
                    out.push('#');
                    out.push_str(&operand(usize::from(n)));
                }
                Arg::NotBit(n) => {
                    out.push('/');
                    out.push_str(&operand(usize::from(n)));
                }
            }
        }
        out
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.render_with(|i| {
            self.operands.get(i).map_or_else(|| "?".to_string(), |k| format!("<{}>", k.placeholder()))
        });
        write!(f, "{:02X} ({}) {}", self.opcode, self.length, text)
    }
}

/// Descriptor table for all 256 opcodes, indexed by opcode byte.
#[derive(Debug, Clone)]
pub struct Catalog {
    table: Vec<Descriptor>,
}

impl Catalog {
    /// Builds the table and checks it for internal consistency.
    ///
    /// Panics if a descriptor is filed under the wrong opcode, if its length
    /// disagrees with the bytes its operands consume, or if its template does
    /// not reference every operand exactly once. These are defects in the
    /// table itself, never a property of the input image.
    pub fn new() -> Self {
        let table: Vec<Descriptor> = (0..=u8::MAX).map(mcs51::describe).collect();
        assert_eq!(table.len(), 256, "catalog must cover every opcode");
        for (index, desc) in table.iter().enumerate() {
            assert_eq!(
                usize::from(desc.opcode),
                index,
                "descriptor for {index:02X}h claims opcode {:02X}h",
                desc.opcode
            );
            let encoded = 1 + desc.operands.iter().map(|k| k.width()).sum::<u8>();
            assert_eq!(desc.length, encoded, "length mismatch for {desc}");
            let mut used = vec![0u8; desc.operands.len()];
            for slot in desc.args.iter().filter_map(|a| a.slot()) {
                assert!(slot < used.len(), "template slot {slot} out of range for {desc}");
                used[slot] += 1;
            }
            assert!(used.iter().all(|&n| n == 1), "operand used more or less than once in {desc}");
        }
        Self { table }
    }

    pub fn lookup(&self, opcode: u8) -> &Descriptor {
        &self.table[usize::from(opcode)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.table.iter()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
