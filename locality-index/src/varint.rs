//! LEB128 variable-length integer encoding and zigzag signed encoding.

use crate::error::{LocalityError, Result};
use std::io::{self, Read, Write};

/// Encode an unsigned 64-bit integer as LEB128 into `buf`.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Write an unsigned LEB128 integer to a writer.
pub fn write_varint<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    let mut buf = Vec::with_capacity(10);
    encode_varint(value, &mut buf);
    writer.write_all(&buf)
}

/// Decode a LEB128 unsigned 64-bit integer from `buf` starting at `*pos`.
/// Advances `*pos` past the consumed bytes.
pub fn decode_varint(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if *pos >= buf.len() {
            return Err(LocalityError::FormatError("varint: unexpected end of buffer".into()));
        }
        let byte = buf[*pos];
        *pos += 1;

        let payload = (byte & 0x7F) as u64;
        if shift >= 63 && payload > 1 {
            return Err(LocalityError::FormatError("varint overflow".into()));
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Read a LEB128 integer from a stream.
///
/// Returns `Ok(None)` on a clean EOF before the first byte; EOF in the middle
/// of a varint is an `UnexpectedEof` error.
pub fn read_varint<R: Read>(reader: &mut R) -> io::Result<Option<u64>> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) if shift == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated varint",
                ))
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
        let payload = (byte[0] & 0x7F) as u64;
        if shift >= 63 && payload > 1 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "varint overflow"));
        }
        result |= payload << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(result));
        }
        shift += 7;
    }
}

/// Zigzag-encode a signed i64 into an unsigned u64.
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Zigzag-decode an unsigned u64 back to a signed i64.
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_byte_lengths() {
        let mut buf = Vec::new();
        encode_varint(127, &mut buf);
        assert_eq!(buf.len(), 1);

        buf.clear();
        encode_varint(128, &mut buf);
        assert_eq!(buf.len(), 2);

        buf.clear();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(buf.len(), 10);
        let mut pos = 0;
        assert_eq!(decode_varint(&buf, &mut pos).unwrap(), u64::MAX);
    }

    #[test]
    fn test_varint_multiple_in_buffer() {
        let mut buf = Vec::new();
        encode_varint(100, &mut buf);
        encode_varint(200, &mut buf);
        encode_varint(300, &mut buf);

        let mut pos = 0;
        assert_eq!(decode_varint(&buf, &mut pos).unwrap(), 100);
        assert_eq!(decode_varint(&buf, &mut pos).unwrap(), 200);
        assert_eq!(decode_varint(&buf, &mut pos).unwrap(), 300);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn test_read_varint_stream() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 1000).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_varint(&mut cursor).unwrap(), Some(1000));
        assert_eq!(read_varint(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_read_varint_truncated() {
        let mut cursor = std::io::Cursor::new(vec![0x80u8]);
        let err = read_varint(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_decode_varint_eof() {
        let buf = [];
        let mut pos = 0;
        assert!(decode_varint(&buf, &mut pos).is_err());
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        for v in [i64::MIN, -100, 0, 100, i64::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }
}
