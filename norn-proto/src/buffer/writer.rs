use std::fmt::Display;

use super::BytePacketBuffer;
use crate::name::MAX_LABEL;

#[derive(Debug, PartialEq, Eq)]
pub enum WriterError {
    EndOfBuffer,
    LabelTooLong,
}

impl Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfBuffer => write!(f, "writing out of buffer"),
            Self::LabelTooLong => write!(f, "single label too long when writing"),
        }
    }
}

impl std::error::Error for WriterError {}

impl From<WriterError> for std::io::Error {
    fn from(value: WriterError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, value.to_string())
    }
}

impl BytePacketBuffer {
    /// Patch a length field at an absolute position, after the fact.
    pub fn set_u16(&mut self, pos: usize, val: u16) -> Result<(), WriterError> {
        let Some(slot) = self.buf.get_mut(pos..pos + 2) else {
            return Err(WriterError::EndOfBuffer);
        };
        slot.copy_from_slice(&val.to_be_bytes());
        Ok(())
    }

    pub fn write_u8(&mut self, val: u8) -> Result<(), WriterError> {
        if self.pos >= self.buf.len() {
            return Err(WriterError::EndOfBuffer);
        }
        self.buf[self.pos] = val;
        self.pos += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, val: u16) -> Result<(), WriterError> {
        self.write_bytes(&val.to_be_bytes())
    }

    pub fn write_u32(&mut self, val: u32) -> Result<(), WriterError> {
        self.write_bytes(&val.to_be_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriterError> {
        let Some(slot) = self.buf.get_mut(self.pos..self.pos + bytes.len()) else {
            return Err(WriterError::EndOfBuffer);
        };
        slot.copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    fn write_label(&mut self, label: &str) -> Result<(), WriterError> {
        if label.len() > MAX_LABEL {
            return Err(WriterError::LabelTooLong);
        }
        self.write_u8(label.len() as u8)?;
        self.write_bytes(label.as_bytes())
    }

    /// Write a fully qualified name in wire form, compressing against
    /// names already in the packet.
    ///
    /// The name is peeled one label at a time. Each remaining suffix is
    /// looked up in `name_offsets`: a hit becomes a two-byte pointer to
    /// the earlier occurrence and ends the name, a miss records where
    /// this suffix starts and emits the leading label. A name that never
    /// hits ends with the zero octet of the root.
    pub fn write_qname(&mut self, qname: &str) -> Result<(), WriterError> {
        let mut suffix = qname;

        while suffix != "." && !suffix.is_empty() {
            if let Some(offset) = self.name_offsets.get(suffix) {
                return self.write_u16(0xC000 | (*offset as u16));
            }
            self.name_offsets.insert(suffix.to_string(), self.pos);

            let (label, rest) = suffix.split_once('.').unwrap_or((suffix, ""));
            self.write_label(label)?;
            suffix = rest;
        }

        self.write_u8(0)
    }

    /// Write a fully qualified name without compression. RDATA names are
    /// written this way so that signed records hash the same on both ends.
    pub fn write_qname_raw(&mut self, qname: &str) -> Result<(), WriterError> {
        for label in qname.split('.').filter(|part| !part.is_empty()) {
            self.write_label(label)?;
        }
        self.write_u8(0)
    }
}
