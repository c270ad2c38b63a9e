use std::io::{self, Read};

use super::error::SuperblockError;
use crate::FieldValue;

/// Forward-only field reader over a byte stream, tracking the absolute
/// stream offset so errors can point at the failing field.
///
/// Each `read_*` call consumes exactly the width of the requested kind and
/// returns the bytes as a tagged [`FieldValue`]; there is no lookahead and
/// no backtracking.
pub struct FieldReader<R> {
    input: R,
    position: u64,
}

impl<R: Read> FieldReader<R> {
    pub fn new(input: R) -> Self {
        Self { input, position: 0 }
    }

    /// Absolute offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), SuperblockError> {
        let start = self.position;
        let mut filled = 0;
        while filled < buf.len() {
            match self.input.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(SuperblockError::UnexpectedEndOfStream {
                        needed: buf.len() as u64,
                        offset: start,
                        actual: filled as u64,
                    });
                }
                Ok(read) => {
                    filled += read;
                    self.position += read as u64;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(SuperblockError::Io(err)),
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<Vec<u8>, SuperblockError> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn byte(&mut self) -> Result<u8, SuperblockError> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    pub(super) fn le_u32(&mut self) -> Result<u32, SuperblockError> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub(super) fn le_u64(&mut self) -> Result<u64, SuperblockError> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub(super) fn le_i32(&mut self) -> Result<i32, SuperblockError> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Little-endian unsigned 32-bit read, tagged `U32`.
    pub fn read_u32(&mut self) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::U32(self.le_u32()?))
    }

    /// Little-endian unsigned 64-bit read, tagged `U64`.
    pub fn read_u64(&mut self) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::U64(self.le_u64()?))
    }

    /// Little-endian signed 32-bit read, tagged `I32`.
    pub fn read_i32(&mut self) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::I32(self.le_i32()?))
    }

    /// Same wire layout as [`Self::read_u32`], tagged `Bits32`.
    pub fn read_bits32(&mut self) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::Bits32(self.le_u32()?))
    }

    /// Single-byte read, tagged `Bits8`.
    pub fn read_bits8(&mut self) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::Bits8(self.byte()?))
    }

    /// `len` bytes, tagged `Raw`.
    pub fn read_raw(&mut self, len: usize) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::Raw(self.take(len)?))
    }

    /// `len` bytes, tagged `Text`; neither validated nor trimmed.
    pub fn read_text(&mut self, len: usize) -> Result<FieldValue, SuperblockError> {
        Ok(FieldValue::Text(self.take(len)?))
    }

    /// Discard `len` bytes without retaining them.
    pub fn skip(&mut self, len: u64) -> Result<(), SuperblockError> {
        let start = self.position;
        let copied = io::copy(&mut self.input.by_ref().take(len), &mut io::sink())?;
        self.position += copied;
        if copied < len {
            return Err(SuperblockError::UnexpectedEndOfStream {
                needed: len,
                offset: start,
                actual: copied,
            });
        }
        Ok(())
    }
}
