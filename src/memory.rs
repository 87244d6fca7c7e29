/// Largest image the 16-bit program counter can address.
pub const CODE_SPACE: usize = 0x1_0000;

#[derive(thiserror::Error, Debug)]
pub enum RomError {
    #[error("image is {len} bytes, the code space holds at most {CODE_SPACE}")]
    TooLarge { len: usize },
}

/// Immutable program memory image starting at address 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    pub fn new(bytes: Vec<u8>) -> Result<Self, RomError> {
        if bytes.len() > CODE_SPACE {
            return Err(RomError::TooLarge { len: bytes.len() });
        }
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read_u8(&self, addr: usize) -> Option<u8> {
        self.bytes.get(addr).copied()
    }

    /// Big-endian word, the byte order of 8051 address tables.
    pub fn read_be16(&self, addr: usize) -> Option<u16> {
        let hi = self.read_u8(addr)?;
        let lo = self.read_u8(addr.checked_add(1)?)?;
        Some(u16::from_be_bytes([hi, lo]))
    }
}

impl TryFrom<Vec<u8>> for Rom {
    type Error = RomError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}
