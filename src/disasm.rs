//! Assembler text for decoded instructions and raw data.

use crate::decoder::{Decoded, Operand};

/// Name lookups used when rendering operands.
pub trait SymbolNames {
    fn direct(&self, addr: u8) -> Option<&str>;
    fn bit(&self, addr: u8) -> Option<&str>;
    fn label(&self, addr: u16) -> Option<&str>;
}

/// Renders every operand numerically.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl SymbolNames for NoNames {
    fn direct(&self, _addr: u8) -> Option<&str> {
        None
    }
    fn bit(&self, _addr: u8) -> Option<&str> {
        None
    }
    fn label(&self, _addr: u16) -> Option<&str> {
        None
    }
}

/// Assembler hex literal: `12h`, `0FFh`, `1234h`.
pub fn hex(value: u32) -> String {
    let s = format!("{value:02X}h");
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        s
    } else {
        format!("0{s}")
    }
}

fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E | 0xA1..=0xAC | 0xAE..=0xFF)
}

/// Decimal reading of a byte: unsigned, signed when negative, and the
/// character it encodes if printable.
pub fn binary_hint(byte: u8) -> String {
    let mut s = format!("{byte:3}");
    if byte >= 0x80 {
        s.push_str(&format!(" {:4}", i16::from(byte) - 0x100));
    }
    if is_printable(byte) {
        s.push_str(&format!(" '{}'", char::from(byte)));
    }
    s
}

pub fn db_line(byte: u8, pc: usize) -> String {
    format!("\tdb {}\t; [{pc:04X}h] {}", hex(byte.into()), binary_hint(byte))
}

pub fn dw_line(word: u16, pc: usize) -> String {
    format!("\tdw {}\t; [{pc:04X}h]", hex(word.into()))
}

pub fn auto_label(prefix: &str, addr: u16) -> String {
    format!("{prefix}_{addr:04X}")
}

/// Split a bit address into its byte address and bit number.
///
/// Bits 00h..7Fh live in RAM bytes 20h..2Fh; bits 80h..FFh belong to the
/// bit-addressable SFRs whose addresses are multiples of 8.
pub fn bit_location(bit: u8) -> (u8, u8) {
    let byte = if bit >= 0x80 { bit & 0xF8 } else { 0x20 | (bit >> 3) };
    (byte, bit & 7)
}

fn direct_name(addr: u8, names: &impl SymbolNames) -> String {
    names.direct(addr).map_or_else(|| hex(addr.into()), str::to_string)
}

/// Text of one operand of the instruction at `pc`.
pub fn fmt_operand(op: Operand, pc: usize, names: &impl SymbolNames) -> String {
    match op {
        Operand::Immediate(v) => hex(v.into()),
        Operand::Direct(addr) => direct_name(addr, names),
        Operand::Bit(bit) => match names.bit(bit) {
            Some(name) => name.to_string(),
            None => {
                let (byte, n) = bit_location(bit);
                format!("{}.{n}", direct_name(byte, names))
            }
        },
        // jump to self reads better than any name
        Operand::Label(addr) if usize::from(addr) == pc => "$".to_string(),
        Operand::Label(addr) => names.label(addr).map_or_else(|| hex(addr.into()), str::to_string),
    }
}

/// Tab-indented instruction line with immediate hints appended as a comment.
pub fn fmt_decoded(d: &Decoded<'_>, names: &impl SymbolNames) -> String {
    let text = d.desc.render_with(|i| {
        d.operands.get(i).map_or_else(String::new, |&op| fmt_operand(op, d.pc, names))
    });
    let hints = d.hints();
    if hints.is_empty() {
        format!("\t{text}")
    } else {
        format!("\t{text}\t; {hints}")
    }
}
