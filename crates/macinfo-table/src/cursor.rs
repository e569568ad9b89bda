//! Bounds-checked cursor over section bytes
//!
//! Reads the primitive encodings used by `.debug_macinfo`: single opcode
//! bytes, unsigned LEB128 operands and NUL-terminated strings.

use macinfo_core::{Error, Result};

/// Cursor-based reader over a byte slice
pub struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at `offset`
    pub fn at(data: &'a [u8], offset: u64) -> Result<Self> {
        let position = usize::try_from(offset)
            .ok()
            .filter(|&pos| pos <= data.len())
            .ok_or(Error::OutOfBounds {
                offset,
                len: data.len() as u64,
            })?;
        Ok(Self { data, position })
    }

    /// Current offset within the section
    pub fn pos(&self) -> u64 {
        self.position as u64
    }

    /// Whether unread bytes remain
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Peek at the next byte without advancing
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self
            .peek_u8()
            .ok_or_else(|| Error::malformed(self.pos(), "unexpected end of section"))?;
        self.position += 1;
        Ok(byte)
    }

    /// Read an unsigned LEB128 value
    pub fn read_uleb128(&mut self) -> Result<u64> {
        let start = self.pos();
        let mut value = 0u64;
        let mut shift = 0u32;

        loop {
            let byte = self.read_u8()?;

            if (shift == 63 && (byte & 0x7e) != 0) || shift > 63 {
                return Err(Error::malformed(start, "ULEB128 value exceeds 64 bits"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            shift += 7;

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }

    /// Read an unsigned LEB128 value that must fit in 32 bits
    pub fn read_uleb128_u32(&mut self) -> Result<u32> {
        let start = self.pos();
        let value = self.read_uleb128()?;
        u32::try_from(value).map_err(|_| {
            Error::malformed(start, format!("value {} does not fit in 32 bits", value))
        })
    }

    /// Read a NUL-terminated string, replacing invalid UTF-8
    pub fn read_cstr(&mut self) -> Result<String> {
        let start = self.position;
        let len = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed(start as u64, "unterminated string"))?;

        let text = String::from_utf8_lossy(&self.data[start..start + len]).into_owned();
        self.position = start + len + 1;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uleb128() {
        let data = [0x02, 0x7f, 0x80, 0x01, 0xe5, 0x8e, 0x26];
        let mut cursor = Cursor::at(&data, 0).unwrap();
        assert_eq!(cursor.read_uleb128().unwrap(), 2);
        assert_eq!(cursor.read_uleb128().unwrap(), 127);
        assert_eq!(cursor.read_uleb128().unwrap(), 128);
        assert_eq!(cursor.read_uleb128().unwrap(), 624485);
        assert!(!cursor.has_more_data());
    }

    #[test]
    fn test_uleb128_truncated() {
        let data = [0x80, 0x80];
        let mut cursor = Cursor::at(&data, 0).unwrap();
        assert!(matches!(cursor.read_uleb128(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_uleb128_u32_overflow() {
        let data = [0x80, 0x80, 0x80, 0x80, 0x10];
        let mut cursor = Cursor::at(&data, 0).unwrap();
        assert!(matches!(cursor.read_uleb128_u32(), Err(Error::Malformed { offset: 0, .. })));
    }

    #[test]
    fn test_cstr() {
        let data = b"FOO 1\0BAR\0";
        let mut cursor = Cursor::at(data, 0).unwrap();
        assert_eq!(cursor.read_cstr().unwrap(), "FOO 1");
        assert_eq!(cursor.pos(), 6);
        assert_eq!(cursor.read_cstr().unwrap(), "BAR");
        assert!(!cursor.has_more_data());
    }

    #[test]
    fn test_cstr_unterminated() {
        let data = b"FOO";
        let mut cursor = Cursor::at(data, 0).unwrap();
        assert!(cursor.read_cstr().is_err());
    }

    #[test]
    fn test_offset_bounds() {
        let data = [0u8; 4];
        assert!(Cursor::at(&data, 4).is_ok());
        assert!(matches!(
            Cursor::at(&data, 5),
            Err(Error::OutOfBounds { offset: 5, len: 4 })
        ));
    }
}
