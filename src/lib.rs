pub mod decoder;
pub mod disasm;
pub mod instructions;
pub mod memory;

pub mod isa {
    pub mod mcs51; // 8051/8052 opcode map
}

pub use decoder::{DecodeError, Decoded, Decoder, Mcs51Decoder, Operand, OperandDecoder, OperandKind};
pub use instructions::{Arg, Catalog, Descriptor, Flow, Mnemonic};
pub use memory::{Rom, RomError, CODE_SPACE};
