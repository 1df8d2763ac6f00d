//! The bytecode a script is stored as.
//!
//! Layout: `[u16 LE length][opcode stream]`, where each opcode is one byte
//! followed by its operands:
//!
//! | opcode     | operands                                  |
//! |------------|-------------------------------------------|
//! | `NOP` 0    | one ignored byte                          |
//! | `KEY` 1    | key type, modifier byte, value            |
//! | `DELAY` 2  | u16 LE milliseconds                       |
//! | `STRING` 3 | u16 LE length, then that many ASCII bytes |
//!
//! Multi-byte integers are little endian. The length prefix is the number of
//! bytes in the opcode stream; playback stops once the read position (which
//! counts the prefix too) reaches it.

pub const OP_NOP: u8 = 0;
pub const OP_KEY: u8 = 1;
pub const OP_DELAY: u8 = 2;
pub const OP_STRING: u8 = 3;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    Nop,
    Key,
    Delay,
    String,
}

impl Opcode {
    /// Number of operand bytes following the opcode. STRING's body is not
    /// counted.
    pub fn operand_len(self) -> usize {
        match self {
            Opcode::Nop => 1,
            Opcode::Key => 3,
            Opcode::Delay | Opcode::String => 2,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            OP_NOP => Opcode::Nop,
            OP_KEY => Opcode::Key,
            OP_DELAY => Opcode::Delay,
            OP_STRING => Opcode::String,
            other => return Err(other),
        })
    }
}

/// Something wrong with the bytecode itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// A read at `position` would go past the `len` bytes we actually have.
    OutOfBounds { position: usize, len: usize },
    /// The byte at `position` is not an opcode we know.
    UnknownOpcode { opcode: u8, position: usize },
}

/// A borrowed, read-only script buffer.
///
/// Every read is checked against the physical buffer. A declared length that
/// is larger than the buffer is not rejected up front (scripts are trusted),
/// but reading past the end reports [`Fault::OutOfBounds`] instead of
/// wandering off into whatever follows in flash.
#[derive(Copy, Clone, Debug)]
pub struct Script<'a> {
    bytes: &'a [u8],
}

impl<'a> Script<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Script { bytes }
    }

    /// The length prefix.
    pub fn declared_len(&self) -> Result<u16, Fault> {
        self.read_u16(0)
    }

    pub fn read_u8(&self, position: usize) -> Result<u8, Fault> {
        self.bytes
            .get(position)
            .copied()
            .ok_or(Fault::OutOfBounds {
                position,
                len: self.bytes.len(),
            })
    }

    /// Read a little endian word: low byte at `position`, high byte after it.
    pub fn read_u16(&self, position: usize) -> Result<u16, Fault> {
        let low = self.read_u8(position)?;
        let high = self.read_u8(position + 1)?;
        Ok(u16::from_le_bytes([low, high]))
    }
}

/// Builds scripts for tests.
#[cfg(test)]
pub(crate) struct Builder {
    stream: std::vec::Vec<u8>,
}

#[cfg(test)]
impl Builder {
    pub fn new() -> Self {
        Builder {
            stream: std::vec::Vec::new(),
        }
    }

    pub fn nop(mut self) -> Self {
        self.stream.extend_from_slice(&[OP_NOP, 0]);
        self
    }

    pub fn key(mut self, kind: crate::hid::KeyKind, modifier: u8, value: u8) -> Self {
        self.stream
            .extend_from_slice(&[OP_KEY, kind as u8, modifier, value]);
        self
    }

    pub fn delay(mut self, ms: u16) -> Self {
        self.stream.push(OP_DELAY);
        self.stream.extend_from_slice(&ms.to_le_bytes());
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.stream.push(OP_STRING);
        self.stream
            .extend_from_slice(&(s.len() as u16).to_le_bytes());
        self.stream.extend_from_slice(s.as_bytes());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.stream.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> std::vec::Vec<u8> {
        let mut script = (self.stream.len() as u16).to_le_bytes().to_vec();
        script.extend(self.stream);
        script
    }
}
