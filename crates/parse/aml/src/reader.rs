//! Byte cursor over AML bytecode.
//!
//! [`AmlReader`] is a bounds-checked little-endian cursor with the AML
//! specific decoders layered on top: `PkgLength`, `NameString` and
//! null-terminated `String` constants. Every read that would run past the
//! end of the stream fails with [`AmlError::ExecutionFailure`], which is how
//! a truncated opcode surfaces to the evaluator.

use alloc::string::String;
use alloc::vec::Vec;

use crate::AmlError;
use crate::name::{AmlName, NameSeg, is_lead_char};

/// `DualNamePrefix`.
const DUAL_NAME_PREFIX: u8 = 0x2E;
/// `MultiNamePrefix`.
const MULTI_NAME_PREFIX: u8 = 0x2F;
/// `RootChar`.
const ROOT_CHAR: u8 = b'\\';
/// `ParentPrefixChar`.
const PARENT_PREFIX_CHAR: u8 = b'^';

/// A cursor over an AML byte stream.
#[derive(Clone)]
pub struct AmlReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AmlReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a reader positioned at `pos`.
    #[must_use]
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current byte offset into the stream.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to `pos` (clamped to the stream length).
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Total stream length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the cursor is at (or past) the end.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The whole underlying stream.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Returns the byte `offset` positions ahead without consuming anything.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] at end of stream.
    pub fn read_u8(&mut self) -> Result<u8, AmlError> {
        let v = *self.data.get(self.pos).ok_or(AmlError::ExecutionFailure)?;
        self.pos += 1;
        Ok(v)
    }

    /// Reads a little-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] at end of stream.
    pub fn read_u16(&mut self) -> Result<u16, AmlError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] at end of stream.
    pub fn read_u32(&mut self) -> Result<u32, AmlError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] at end of stream.
    pub fn read_u64(&mut self) -> Result<u64, AmlError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], AmlError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], AmlError> {
        let end = self.pos.checked_add(len).ok_or(AmlError::ExecutionFailure)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(AmlError::ExecutionFailure)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Skips `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<(), AmlError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Decodes a `PkgLength` and returns the absolute end offset of the
    /// package it describes.
    ///
    /// The encoded length counts the `PkgLength` bytes themselves, so the
    /// end is computed from the offset of the lead byte.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] if the encoding is truncated,
    /// malformed, or the package extends past the end of the stream.
    pub fn pkg_length(&mut self) -> Result<usize, AmlError> {
        let start = self.pos;
        let length = self.pkg_length_value()?;
        let encoded = self.pos - start;

        if length < encoded {
            return Err(AmlError::ExecutionFailure);
        }
        let end = start + length;
        if end > self.data.len() {
            return Err(AmlError::ExecutionFailure);
        }
        Ok(end)
    }

    /// Decodes a `PkgLength` encoding and returns the raw value.
    ///
    /// Field lists reuse this encoding for bit widths, where the value is
    /// not a package extent.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] if the encoding is truncated
    /// or malformed.
    pub fn pkg_length_value(&mut self) -> Result<usize, AmlError> {
        let lead = self.read_u8()?;
        let follow = usize::from(lead >> 6);
        if follow == 0 {
            return Ok(usize::from(lead & 0x3F));
        }
        // Bits 4-5 of a multi-byte lead must be zero.
        if lead & 0x30 != 0 {
            return Err(AmlError::ExecutionFailure);
        }
        let mut length = usize::from(lead & 0x0F);
        for i in 0..follow {
            length |= usize::from(self.read_u8()?) << (4 + i * 8);
        }
        Ok(length)
    }

    /// Decodes a `NameString`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] on truncated or malformed
    /// names.
    pub fn name_string(&mut self) -> Result<AmlName, AmlError> {
        let mut name = AmlName::default();

        match self.peek() {
            Some(ROOT_CHAR) => {
                self.pos += 1;
                name.root = true;
            }
            Some(PARENT_PREFIX_CHAR) => {
                while self.peek() == Some(PARENT_PREFIX_CHAR) {
                    self.pos += 1;
                    name.parents = name
                        .parents
                        .checked_add(1)
                        .ok_or(AmlError::ExecutionFailure)?;
                }
            }
            _ => {}
        }

        let count = match self.read_u8()? {
            0x00 => 0,
            DUAL_NAME_PREFIX => 2,
            MULTI_NAME_PREFIX => usize::from(self.read_u8()?),
            c if is_lead_char(c) => {
                // Single NameSeg: un-read the lead character.
                self.pos -= 1;
                1
            }
            _ => return Err(AmlError::ExecutionFailure),
        };

        name.segments.reserve(count);
        for _ in 0..count {
            let bytes = self.read_bytes(4)?;
            let seg = NameSeg::from_bytes(bytes).ok_or(AmlError::ExecutionFailure)?;
            name.segments.push(seg);
        }
        Ok(name)
    }

    /// Reads a null-terminated ASCII string constant.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] if the terminator is missing.
    pub fn string(&mut self) -> Result<String, AmlError> {
        let rest = self.data.get(self.pos..).unwrap_or(&[]);
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(AmlError::ExecutionFailure)?;
        let bytes: Vec<u8> = rest[..len].to_vec();
        self.pos += len + 1;
        // AML strings are 7-bit ASCII; anything else is replaced rather than
        // rejected since real firmware occasionally embeds Latin-1.
        Ok(bytes
            .into_iter()
            .map(|b| if b.is_ascii() { char::from(b) } else { '?' })
            .collect())
    }
}

/// Returns `true` if `byte` can start a `NameString`.
#[must_use]
pub const fn starts_name_string(byte: u8) -> bool {
    is_lead_char(byte)
        || matches!(
            byte,
            ROOT_CHAR | PARENT_PREFIX_CHAR | DUAL_NAME_PREFIX | MULTI_NAME_PREFIX
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_pkg_length() {
        // PkgLength 0x05: package spans 5 bytes starting at the lead.
        let data = [0x05, 0, 0, 0, 0];
        let mut r = AmlReader::new(&data);
        assert_eq!(r.pkg_length(), Ok(5));
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn two_byte_pkg_length() {
        // Lead 0x42 (1 follow byte, low nibble 2), follow 0x01 -> 0x12 = 18.
        let mut data = [0u8; 18];
        data[0] = 0x42;
        data[1] = 0x01;
        let mut r = AmlReader::new(&data);
        assert_eq!(r.pkg_length(), Ok(18));
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn pkg_length_past_end_fails() {
        let data = [0x10, 0x00];
        let mut r = AmlReader::new(&data);
        assert_eq!(r.pkg_length(), Err(AmlError::ExecutionFailure));
    }

    #[test]
    fn name_string_forms() {
        let data = *b"\\/\x03_SB_PCI0_CRS";
        let mut r = AmlReader::new(&data);
        let name = r.name_string().unwrap();
        assert!(name.root);
        assert_eq!(name.segments.len(), 3);
        assert_eq!(name.segments[2], NameSeg(*b"_CRS"));

        let data = *b"^^.ABCDEFGH";
        let mut r = AmlReader::new(&data);
        let name = r.name_string().unwrap();
        assert_eq!(name.parents, 2);
        assert_eq!(name.segments, [NameSeg(*b"ABCD"), NameSeg(*b"EFGH")]);

        let data = [0x00];
        let mut r = AmlReader::new(&data);
        assert!(r.name_string().unwrap().is_null());
    }

    #[test]
    fn truncated_name_fails() {
        let data = *b"AB";
        let mut r = AmlReader::new(&data);
        assert_eq!(r.name_string(), Err(AmlError::ExecutionFailure));
    }

    #[test]
    fn string_constant() {
        let data = *b"Hello\0rest";
        let mut r = AmlReader::new(&data);
        assert_eq!(r.string().unwrap(), "Hello");
        assert_eq!(r.position(), 6);
    }
}
