use crate::decoder::OperandKind as K;
use crate::instructions::Arg::{self, *};
use crate::instructions::{Descriptor, Mnemonic as M};

/// MCS-51 (8051/8052) opcode map.
///
/// The match has no wildcard arm, so the compiler rejects a table that
/// misses an opcode, and an opcode listed twice is an unreachable pattern.
#[deny(unreachable_patterns)]
pub fn describe(opcode: u8) -> Descriptor {
    match opcode {
        0x01 | 0x21 | 0x41 | 0x61 | 0x81 | 0xA1 | 0xC1 | 0xE1 => {
            op(opcode, 2, M::Ajmp, vec![Slot(0)], &[K::PageLabel]).exits()
        }
        0x11 | 0x31 | 0x51 | 0x71 | 0x91 | 0xB1 | 0xD1 | 0xF1 => {
            op(opcode, 2, M::Acall, vec![Slot(0)], &[K::PageLabel])
        }

        0x00 => op(opcode, 1, M::Nop, vec![], &[]),
        0x02 => op(opcode, 3, M::Ljmp, vec![Slot(0)], &[K::LongLabel]).exits(),
        0x03 => op(opcode, 1, M::Rr, vec![A], &[]),
        0x04 => op(opcode, 1, M::Inc, vec![A], &[]),
        0x05 => op(opcode, 2, M::Inc, vec![Slot(0)], &[K::Direct]),
        0x06..=0x0F => register_form(opcode, M::Inc, Form::Single),

        0x10 => op(opcode, 3, M::Jbc, vec![Slot(0), Slot(1)], &[K::Bit, K::RelLabel]),
        0x12 => op(opcode, 3, M::Lcall, vec![Slot(0)], &[K::LongLabel]),
        0x13 => op(opcode, 1, M::Rrc, vec![A], &[]),
        0x14 => op(opcode, 1, M::Dec, vec![A], &[]),
        0x15 => op(opcode, 2, M::Dec, vec![Slot(0)], &[K::Direct]),
        0x16..=0x1F => register_form(opcode, M::Dec, Form::Single),

        0x20 => op(opcode, 3, M::Jb, vec![Slot(0), Slot(1)], &[K::Bit, K::RelLabel]),
        0x22 => op(opcode, 1, M::Ret, vec![], &[]).exits(),
        0x23 => op(opcode, 1, M::Rl, vec![A], &[]),
        0x24 => op(opcode, 2, M::Add, vec![A, Imm(0)], &[K::Immediate]),
        0x25 => op(opcode, 2, M::Add, vec![A, Slot(0)], &[K::Direct]),
        0x26..=0x2F => register_form(opcode, M::Add, Form::IntoA),

        0x30 => op(opcode, 3, M::Jnb, vec![Slot(0), Slot(1)], &[K::Bit, K::RelLabel]),
        0x32 => op(opcode, 1, M::Reti, vec![], &[]).exits(),
        0x33 => op(opcode, 1, M::Rlc, vec![A], &[]),
        0x34 => op(opcode, 2, M::Addc, vec![A, Imm(0)], &[K::Immediate]),
        0x35 => op(opcode, 2, M::Addc, vec![A, Slot(0)], &[K::Direct]),
        0x36..=0x3F => register_form(opcode, M::Addc, Form::IntoA),

        0x40 => op(opcode, 2, M::Jc, vec![Slot(0)], &[K::RelLabel]),
        0x42 => op(opcode, 2, M::Orl, vec![Slot(0), A], &[K::Direct]),
        0x43 => op(opcode, 3, M::Orl, vec![Slot(0), Imm(1)], &[K::Direct, K::Immediate]),
        0x44 => op(opcode, 2, M::Orl, vec![A, Imm(0)], &[K::Immediate]),
        0x45 => op(opcode, 2, M::Orl, vec![A, Slot(0)], &[K::Direct]),
        0x46..=0x4F => register_form(opcode, M::Orl, Form::IntoA),

        0x50 => op(opcode, 2, M::Jnc, vec![Slot(0)], &[K::RelLabel]),
        0x52 => op(opcode, 2, M::Anl, vec![Slot(0), A], &[K::Direct]),
        0x53 => op(opcode, 3, M::Anl, vec![Slot(0), Imm(1)], &[K::Direct, K::Immediate]),
        0x54 => op(opcode, 2, M::Anl, vec![A, Imm(0)], &[K::Immediate]),
        0x55 => op(opcode, 2, M::Anl, vec![A, Slot(0)], &[K::Direct]),
        0x56..=0x5F => register_form(opcode, M::Anl, Form::IntoA),

        0x60 => op(opcode, 2, M::Jz, vec![Slot(0)], &[K::RelLabel]),
        0x62 => op(opcode, 2, M::Xrl, vec![Slot(0), A], &[K::Direct]),
        0x63 => op(opcode, 3, M::Xrl, vec![Slot(0), Imm(1)], &[K::Direct, K::Immediate]),
        0x64 => op(opcode, 2, M::Xrl, vec![A, Imm(0)], &[K::Immediate]),
        0x65 => op(opcode, 2, M::Xrl, vec![A, Slot(0)], &[K::Direct]),
        0x66..=0x6F => register_form(opcode, M::Xrl, Form::IntoA),

        0x70 => op(opcode, 2, M::Jnz, vec![Slot(0)], &[K::RelLabel]),
        0x72 => op(opcode, 2, M::Orl, vec![C, Slot(0)], &[K::Bit]),
        0x73 => op(opcode, 1, M::Jmp, vec![IndADptr], &[]).exits(),
        0x74 => op(opcode, 2, M::Mov, vec![A, Imm(0)], &[K::Immediate]),
        0x75 => op(opcode, 3, M::Mov, vec![Slot(0), Imm(1)], &[K::Direct, K::Immediate]),
        0x76..=0x7F => op(opcode, 2, M::Mov, vec![reg(opcode), Imm(0)], &[K::Immediate]),

        0x80 => op(opcode, 2, M::Sjmp, vec![Slot(0)], &[K::RelLabel]).exits(),
        0x82 => op(opcode, 2, M::Anl, vec![C, Slot(0)], &[K::Bit]),
        0x83 => op(opcode, 1, M::Movc, vec![A, IndAPc], &[]),
        0x84 => op(opcode, 1, M::Div, vec![AB], &[]),
        // source byte comes first in the encoding
        0x85 => op(opcode, 3, M::Mov, vec![Slot(1), Slot(0)], &[K::Direct, K::Direct]),
        0x86..=0x8F => op(opcode, 2, M::Mov, vec![Slot(0), reg(opcode)], &[K::Direct]),

        0x90 => op(opcode, 3, M::Mov, vec![Dptr, Imm(0)], &[K::LongLabel]).pointer_load(),
        0x92 => op(opcode, 2, M::Mov, vec![Slot(0), C], &[K::Bit]),
        0x93 => op(opcode, 1, M::Movc, vec![A, IndADptr], &[]),
        0x94 => op(opcode, 2, M::Subb, vec![A, Imm(0)], &[K::Immediate]),
        0x95 => op(opcode, 2, M::Subb, vec![A, Slot(0)], &[K::Direct]),
        0x96..=0x9F => register_form(opcode, M::Subb, Form::IntoA),

        0xA0 => op(opcode, 2, M::Orl, vec![C, NotBit(0)], &[K::Bit]),
        0xA2 => op(opcode, 2, M::Mov, vec![C, Slot(0)], &[K::Bit]),
        0xA3 => op(opcode, 1, M::Inc, vec![Dptr], &[]),
        0xA4 => op(opcode, 1, M::Mul, vec![AB], &[]),
        0xA5 => op(opcode, 1, M::Dec, vec![Dptr], &[]),
        0xA6..=0xAF => op(opcode, 2, M::Mov, vec![reg(opcode), Slot(0)], &[K::Direct]),

        0xB0 => op(opcode, 2, M::Anl, vec![C, NotBit(0)], &[K::Bit]),
        0xB2 => op(opcode, 2, M::Cpl, vec![Slot(0)], &[K::Bit]),
        0xB3 => op(opcode, 1, M::Cpl, vec![C], &[]),
        0xB4 => op(opcode, 3, M::Cjne, vec![A, Imm(0), Slot(1)], &[K::Immediate, K::RelLabel]),
        0xB5 => op(opcode, 3, M::Cjne, vec![A, Slot(0), Slot(1)], &[K::Direct, K::RelLabel]),
        0xB6..=0xBF => {
            op(opcode, 3, M::Cjne, vec![reg(opcode), Imm(0), Slot(1)], &[K::Immediate, K::RelLabel])
        }

        0xC0 => op(opcode, 2, M::Push, vec![Slot(0)], &[K::Direct]),
        0xC2 => op(opcode, 2, M::Clr, vec![Slot(0)], &[K::Bit]),
        0xC3 => op(opcode, 1, M::Clr, vec![C], &[]),
        0xC4 => op(opcode, 1, M::Swap, vec![A], &[]),
        0xC5 => op(opcode, 2, M::Xch, vec![A, Slot(0)], &[K::Direct]),
        0xC6..=0xCF => register_form(opcode, M::Xch, Form::IntoA),

        0xD0 => op(opcode, 2, M::Pop, vec![Slot(0)], &[K::Direct]),
        0xD2 => op(opcode, 2, M::Setb, vec![Slot(0)], &[K::Bit]),
        0xD3 => op(opcode, 1, M::Setb, vec![C], &[]),
        0xD4 => op(opcode, 1, M::Da, vec![A], &[]),
        0xD5 => op(opcode, 3, M::Djnz, vec![Slot(0), Slot(1)], &[K::Direct, K::RelLabel]),
        0xD6..=0xD7 => register_form(opcode, M::Xchd, Form::IntoA),
        0xD8..=0xDF => op(opcode, 2, M::Djnz, vec![reg(opcode), Slot(0)], &[K::RelLabel]),

        0xE0 => op(opcode, 1, M::Movx, vec![A, IndDptr], &[]),
        0xE2..=0xE3 => register_form(opcode, M::Movx, Form::IntoA),
        0xE4 => op(opcode, 1, M::Clr, vec![A], &[]),
        0xE5 => op(opcode, 2, M::Mov, vec![A, Slot(0)], &[K::Direct]),
        0xE6..=0xEF => register_form(opcode, M::Mov, Form::IntoA),

        0xF0 => op(opcode, 1, M::Movx, vec![IndDptr, A], &[]),
        0xF2..=0xF3 => register_form(opcode, M::Movx, Form::FromA),
        0xF4 => op(opcode, 1, M::Cpl, vec![A], &[]),
        0xF5 => op(opcode, 2, M::Mov, vec![Slot(0), A], &[K::Direct]),
        0xF6..=0xFF => register_form(opcode, M::Mov, Form::FromA),
    }
}

fn op(opcode: u8, length: u8, mnemonic: M, args: Vec<Arg>, operands: &'static [K]) -> Descriptor {
    Descriptor::new(opcode, length, mnemonic, args, operands)
}

enum Form {
    Single,
    IntoA,
    FromA,
}

/// Register encoded in the low bits: `x6`/`x7` select `@R0`/`@R1`,
/// `x8`..`xF` select `R0`..`R7`.
fn reg(opcode: u8) -> Arg {
    if opcode & 0x08 != 0 {
        Reg(opcode & 0x07)
    } else {
        IndReg(opcode & 0x01)
    }
}

fn register_form(opcode: u8, mnemonic: M, form: Form) -> Descriptor {
    let r = reg(opcode);
    let args = match form {
        Form::Single => vec![r],
        Form::IntoA => vec![A, r],
        Form::FromA => vec![r, A],
    };
    op(opcode, 1, mnemonic, args, &[])
}
