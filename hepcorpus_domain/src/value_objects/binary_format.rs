// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Binary Record Encoding
//!
//! Byte-level primitives for the corpus record format. All integers are
//! little-endian; sizes and ids use an LEB128-style varint.
//!
//! ## Grammar
//!
//! ```text
//! varint   - least-significant 7-bit groups, high bit set on every byte
//!            except the last; 600 encodes as D8 04, 123456 as C0 C4 07
//! size     - varint
//! string   - varint byte-length, then the UTF-8 bytes
//! float    - IEEE-754 32-bit little-endian
//! ```
//!
//! Record files are a plain concatenation of groups; there is no length
//! prefix at the group level and termination is by end-of-file only, so
//! every encoder here has a matching decoder and readers detect a clean
//! stream boundary via [`try_decode_varint`].

use std::io::Read;

use crate::error::CorpusError;

/// Appends the varint encoding of `value` to `buf`.
///
/// Negative input is a codec overflow: the format has no sign bit and a
/// negative id or count always indicates a corrupted upstream computation.
pub fn encode_varint(value: i64, buf: &mut Vec<u8>) -> Result<(), CorpusError> {
    if value < 0 {
        return Err(CorpusError::CodecOverflow(format!(
            "cannot varint-encode negative value {}",
            value
        )));
    }
    let mut n = value as u64;
    loop {
        let part = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            buf.push(part);
            return Ok(());
        }
        buf.push(part | 0x80);
    }
}

/// Appends a size field (varint) to `buf`.
pub fn encode_size(len: usize, buf: &mut Vec<u8>) -> Result<(), CorpusError> {
    encode_varint(len as i64, buf)
}

/// Appends a length-prefixed UTF-8 string to `buf`.
pub fn encode_string(s: &str, buf: &mut Vec<u8>) -> Result<(), CorpusError> {
    encode_size(s.len(), buf)?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Appends a 32-bit little-endian float to `buf`.
pub fn encode_f32(value: f32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Decodes a varint, failing if the stream ends mid-value.
pub fn decode_varint(reader: &mut impl Read) -> Result<u64, CorpusError> {
    match try_decode_varint(reader)? {
        Some(value) => Ok(value),
        None => Err(CorpusError::CodecError(
            "unexpected end of stream while reading varint".to_string(),
        )),
    }
}

/// Decodes a varint, returning `None` when the stream is already at EOF.
///
/// This is the group-boundary probe: a record file is a concatenation of
/// groups terminated by EOF, so EOF is only legal before the first byte of
/// a group header.
pub fn try_decode_varint(reader: &mut impl Read) -> Result<Option<u64>, CorpusError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    let mut first = true;
    loop {
        let mut byte = [0u8; 1];
        let n = reader
            .read(&mut byte)
            .map_err(|e| CorpusError::CodecError(e.to_string()))?;
        if n == 0 {
            if first {
                return Ok(None);
            }
            return Err(CorpusError::CodecError(
                "unexpected end of stream inside varint".to_string(),
            ));
        }
        first = false;
        if shift > 63 {
            return Err(CorpusError::CodecError(
                "varint longer than 64 bits".to_string(),
            ));
        }
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
    }
}

/// Decodes a 32-bit little-endian float.
pub fn decode_f32(reader: &mut impl Read) -> Result<f32, CorpusError> {
    let mut bytes = [0u8; 4];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| CorpusError::CodecError(format!("truncated float: {}", e)))?;
    Ok(f32::from_le_bytes(bytes))
}

/// Decodes a length-prefixed UTF-8 string.
pub fn decode_string(reader: &mut impl Read) -> Result<String, CorpusError> {
    let len = decode_varint(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| CorpusError::CodecError(format!("truncated string: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| CorpusError::CodecError(format!("string is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn varint_bytes(value: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_varint_literals() {
        assert_eq!(varint_bytes(0), [0x00]);
        assert_eq!(varint_bytes(127), [0x7F]);
        assert_eq!(varint_bytes(128), [0x80, 0x01]);
        assert_eq!(varint_bytes(600), [0xD8, 0x04]);
        assert_eq!(varint_bytes(123_456), [0xC0, 0xC4, 0x07]);
    }

    #[test]
    fn test_varint_rejects_negative() {
        let mut buf = Vec::new();
        let err = encode_varint(-1, &mut buf).unwrap_err();
        assert_eq!(err.category(), "codec");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_varint_eof_probe() {
        let mut empty = Cursor::new(Vec::new());
        assert_eq!(try_decode_varint(&mut empty).unwrap(), None);

        // A continuation bit with no following byte is corruption, not EOF.
        let mut truncated = Cursor::new(vec![0x80]);
        assert!(try_decode_varint(&mut truncated).is_err());
    }

    #[test]
    fn test_string_round_trip() {
        let mut buf = Vec::new();
        encode_string("SQRT(S)/NUCLEON", &mut buf).unwrap();
        assert_eq!(buf.len(), 1 + "SQRT(S)/NUCLEON".len());

        let mut cursor = Cursor::new(buf);
        assert_eq!(decode_string(&mut cursor).unwrap(), "SQRT(S)/NUCLEON");
    }

    #[test]
    fn test_f32_round_trip() {
        let mut buf = Vec::new();
        encode_f32(1.5, &mut buf);
        assert_eq!(buf, 1.5f32.to_le_bytes());
        let mut cursor = Cursor::new(buf);
        assert_eq!(decode_f32(&mut cursor).unwrap(), 1.5);
    }

    proptest! {
        #[test]
        fn prop_varint_round_trip(n in 0u32..u32::MAX) {
            let mut buf = Vec::new();
            encode_varint(i64::from(n), &mut buf).unwrap();

            // Encoded length is ceil(bits/7), one byte for zero.
            let bits = 32 - n.leading_zeros();
            let expected_len = std::cmp::max(1, bits.div_ceil(7)) as usize;
            prop_assert_eq!(buf.len(), expected_len);

            let mut cursor = Cursor::new(buf);
            prop_assert_eq!(decode_varint(&mut cursor).unwrap(), u64::from(n));
        }

        #[test]
        fn prop_string_round_trip(s in ".{0,64}") {
            let mut buf = Vec::new();
            encode_string(&s, &mut buf).unwrap();
            let mut cursor = Cursor::new(buf);
            prop_assert_eq!(decode_string(&mut cursor).unwrap(), s);
        }
    }
}
