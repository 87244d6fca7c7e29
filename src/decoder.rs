use serde::{Deserialize, Serialize};

use crate::disasm::binary_hint;
use crate::instructions::{Catalog, Descriptor};

/// How an operand is encoded in the bytes following the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    /// `#data`, one byte.
    Immediate,
    /// Internal RAM or SFR address, one byte.
    Direct,
    /// Bit address, one byte.
    Bit,
    /// 16-bit absolute code address, big-endian.
    LongLabel,
    /// Signed 8-bit displacement from the next instruction.
    RelLabel,
    /// Low 8 bits of an 11-bit in-page address; bits 8..10 live in the opcode.
    PageLabel,
}

impl OperandKind {
    /// Bytes consumed after the opcode.
    pub fn width(self) -> u8 {
        match self {
            OperandKind::LongLabel => 2,
            _ => 1,
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            OperandKind::Immediate => "imm",
            OperandKind::Direct => "direct",
            OperandKind::Bit => "bit",
            OperandKind::LongLabel => "addr16",
            OperandKind::RelLabel => "rel",
            OperandKind::PageLabel => "addr11",
        }
    }
}

/// A resolved operand. All three label encodings collapse into `Label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Immediate(u8),
    Direct(u8),
    Bit(u8),
    Label(u16),
}

impl Operand {
    pub fn hint(&self) -> Option<String> {
        match *self {
            Operand::Immediate(v) => Some(binary_hint(v)),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<u16> {
        match *self {
            Operand::Label(addr) => Some(addr),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("instruction at {pc:#06x} runs past the end of the image")]
    Truncated { pc: usize },
    #[error("relative target {target} of instruction at {pc:#06x} is outside the code space")]
    TargetOutOfRange { pc: usize, target: i64 },
}

/// Walks the operand bytes of one instruction.
pub struct OperandDecoder<'a> {
    rom: &'a [u8],
    pc: usize,
    pc_next: usize,
    offset: u16,
    cursor: usize,
}

impl<'a> OperandDecoder<'a> {
    /// `pc` is the opcode address, `pc_next` the address of the following
    /// instruction, `offset` the load bias subtracted from absolute labels.
    pub fn new(rom: &'a [u8], pc: usize, pc_next: usize, offset: u16) -> Self {
        Self { rom, pc, pc_next, offset, cursor: pc + 1 }
    }

    fn take(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.rom.get(self.cursor).ok_or(DecodeError::Truncated { pc: self.pc })?;
        self.cursor += 1;
        Ok(byte)
    }

    pub fn next_operand(&mut self, kind: OperandKind) -> Result<Operand, DecodeError> {
        match kind {
            OperandKind::Immediate => Ok(Operand::Immediate(self.take()?)),
            OperandKind::Direct => Ok(Operand::Direct(self.take()?)),
            OperandKind::Bit => Ok(Operand::Bit(self.take()?)),
            OperandKind::LongLabel => {
                let hi = self.take()?;
                let lo = self.take()?;
                Ok(Operand::Label(u16::from_be_bytes([hi, lo]).wrapping_sub(self.offset)))
            }
            OperandKind::RelLabel => {
                let disp = self.take()? as i8;
                let target = self.pc_next as i64 + i64::from(disp);
                // past 0FFFFh is as unreachable as below 0
                u16::try_from(target)
                    .map(Operand::Label)
                    .map_err(|_| DecodeError::TargetOutOfRange { pc: self.pc, target })
            }
            OperandKind::PageLabel => {
                let low = usize::from(self.take()?);
                let opcode = usize::from(*self.rom.get(self.pc).ok_or(DecodeError::Truncated { pc: self.pc })?);
                let target = (self.pc_next & 0xF800) | low | ((opcode << 3) & 0x700);
                Ok(Operand::Label((target & 0xFFFF) as u16))
            }
        }
    }

    /// Decode `kinds` in order; the first failure abandons the rest.
    pub fn decode_all(&mut self, kinds: &[OperandKind]) -> Result<Vec<Operand>, DecodeError> {
        kinds.iter().map(|&k| self.next_operand(k)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<'c> {
    pub pc: usize,
    pub desc: &'c Descriptor,
    pub operands: Vec<Operand>,
}

impl Decoded<'_> {
    pub fn next_pc(&self) -> usize {
        self.pc + usize::from(self.desc.length)
    }

    /// Concatenated hints of all immediate operands.
    pub fn hints(&self) -> String {
        self.operands.iter().filter_map(Operand::hint).collect()
    }
}

pub trait Decoder<'c> {
    fn decode(&self, rom: &[u8], pc: usize) -> Result<Decoded<'c>, DecodeError>;
}

#[derive(Debug, Clone, Copy)]
pub struct Mcs51Decoder<'c> {
    catalog: &'c Catalog,
    offset: u16,
}

impl<'c> Mcs51Decoder<'c> {
    pub fn new(catalog: &'c Catalog, offset: u16) -> Self {
        Self { catalog, offset }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }
}

impl<'c> Decoder<'c> for Mcs51Decoder<'c> {
    fn decode(&self, rom: &[u8], pc: usize) -> Result<Decoded<'c>, DecodeError> {
        let opcode = *rom.get(pc).ok_or(DecodeError::Truncated { pc })?;
        let desc = self.catalog.lookup(opcode);
        let pc_next = pc + usize::from(desc.length);
        let operands = OperandDecoder::new(rom, pc, pc_next, self.offset).decode_all(desc.operands)?;
        Ok(Decoded { pc, desc, operands })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_wraps_backwards() {
        // djnz R0 at 0x10 jumping back to 0x08
        let mut rom = vec![0u8; 0x12];
        rom[0x10] = 0xD8;
        rom[0x11] = 0xF6;
        let mut dec = OperandDecoder::new(&rom, 0x10, 0x12, 0);
        assert_eq!(dec.next_operand(OperandKind::RelLabel), Ok(Operand::Label(0x08)));
    }

    #[test]
    fn relative_before_zero_fails() {
        let rom = [0x80, 0xF0];
        let mut dec = OperandDecoder::new(&rom, 0, 2, 0);
        assert_eq!(
            dec.next_operand(OperandKind::RelLabel),
            Err(DecodeError::TargetOutOfRange { pc: 0, target: -14 })
        );
    }

    #[test]
    fn relative_past_code_space_fails() {
        let mut rom = vec![0u8; 0x1_0000];
        rom[0xFFFE] = 0x80;
        rom[0xFFFF] = 0x10;
        let mut dec = OperandDecoder::new(&rom, 0xFFFE, 0x1_0000, 0);
        assert_eq!(
            dec.next_operand(OperandKind::RelLabel),
            Err(DecodeError::TargetOutOfRange { pc: 0xFFFE, target: 0x1_0010 })
        );
    }

    #[test]
    fn long_label_subtracts_bias() {
        let rom = [0x02, 0x80, 0x10];
        let mut dec = OperandDecoder::new(&rom, 0, 3, 0x8000);
        assert_eq!(dec.next_operand(OperandKind::LongLabel), Ok(Operand::Label(0x0010)));
    }

    #[test]
    fn page_label_keeps_upper_page_bits() {
        // ajmp with opcode bits 101 at 0x1234
        let mut rom = vec![0u8; 0x1236];
        rom[0x1234] = 0xA1;
        rom[0x1235] = 0x56;
        let mut dec = OperandDecoder::new(&rom, 0x1234, 0x1236, 0);
        assert_eq!(dec.next_operand(OperandKind::PageLabel), Ok(Operand::Label(0x1556)));
    }

    #[test]
    fn truncated_operand_is_an_error() {
        let rom = [0x02, 0x12];
        let mut dec = OperandDecoder::new(&rom, 0, 3, 0);
        assert_eq!(dec.next_operand(OperandKind::LongLabel), Err(DecodeError::Truncated { pc: 0 }));
    }

    #[test]
    fn immediate_carries_hint() {
        assert_eq!(Operand::Immediate(0x41).hint().as_deref(), Some(" 65 'A'"));
        assert_eq!(Operand::Direct(0x41).hint(), None);
    }
}
