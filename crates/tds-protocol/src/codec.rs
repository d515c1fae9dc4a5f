//! Codec utilities for TDS protocol encoding and decoding.
//!
//! Length-prefixed UTF-16LE strings (`B_VARCHAR`, `US_VARCHAR`) appear in
//! CEK tables, column names and crypto metadata.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Read a length-prefixed UTF-16LE string.
///
/// The format is: 1-byte length (in characters) followed by UTF-16LE bytes.
pub fn read_b_varchar(src: &mut impl Buf) -> Result<String, ProtocolError> {
    if src.remaining() < 1 {
        return Err(ProtocolError::UnexpectedEof);
    }
    let len = src.get_u8() as usize;
    read_utf16_string(src, len)
}

/// Read a length-prefixed UTF-16LE string with 2-byte length.
///
/// The format is: 2-byte length (in characters) followed by UTF-16LE bytes.
pub fn read_us_varchar(src: &mut impl Buf) -> Result<String, ProtocolError> {
    if src.remaining() < 2 {
        return Err(ProtocolError::UnexpectedEof);
    }
    let len = src.get_u16_le() as usize;
    read_utf16_string(src, len)
}

/// Read a UTF-16LE string of specified character length.
pub fn read_utf16_string(src: &mut impl Buf, char_count: usize) -> Result<String, ProtocolError> {
    let byte_count = char_count * 2;
    if src.remaining() < byte_count {
        return Err(ProtocolError::IncompletePacket {
            expected: byte_count,
            actual: src.remaining(),
        });
    }

    let mut chars = Vec::with_capacity(char_count);
    for _ in 0..char_count {
        chars.push(src.get_u16_le());
    }

    String::from_utf16(&chars).map_err(|_| ProtocolError::StringEncoding("UTF-16 string"))
}

/// Write a length-prefixed UTF-16LE string (1-byte length).
pub fn write_b_varchar(dst: &mut impl BufMut, s: &str) {
    let chars: Vec<u16> = s.encode_utf16().collect();
    let len = chars.len().min(255) as u8;
    dst.put_u8(len);
    for &c in &chars[..len as usize] {
        dst.put_u16_le(c);
    }
}

/// Write a length-prefixed UTF-16LE string (2-byte length).
pub fn write_us_varchar(dst: &mut impl BufMut, s: &str) {
    let chars: Vec<u16> = s.encode_utf16().collect();
    let len = chars.len().min(65535) as u16;
    dst.put_u16_le(len);
    for &c in &chars[..len as usize] {
        dst.put_u16_le(c);
    }
}

/// Write a UTF-16LE string without length prefix.
pub fn write_utf16_string(dst: &mut impl BufMut, s: &str) {
    for c in s.encode_utf16() {
        dst.put_u16_le(c);
    }
}

/// Encode a string as UTF-16LE bytes.
#[must_use]
pub fn utf16le_bytes(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(utf16_byte_len(s));
    write_utf16_string(&mut out, s);
    out
}

/// Calculate the byte length of a UTF-16 encoded string.
#[must_use]
pub fn utf16_byte_len(s: &str) -> usize {
    s.encode_utf16().count() * 2
}
