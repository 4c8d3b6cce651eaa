//! AMF3 29-bit variable-length integers (U29).
//!
//! ```text
//! 0x00000000 - 0x0000007F : 0xxxxxxx
//! 0x00000080 - 0x00003FFF : 1xxxxxxx 0xxxxxxx
//! 0x00004000 - 0x001FFFFF : 1xxxxxxx 1xxxxxxx 0xxxxxxx
//! 0x00200000 - 0x1FFFFFFF : 1xxxxxxx 1xxxxxxx 1xxxxxxx xxxxxxxx
//! ```
//!
//! Values are signed: bit 28 of the decoded value is the sign bit.

use crate::error::ProtocolError;
use bytes::BufMut;

/// Smallest integer representable as an AMF3 integer.
pub const INT29_MIN: i32 = -(1 << 28);

/// Largest integer representable as an AMF3 integer.
pub const INT29_MAX: i32 = (1 << 28) - 1;

const MASK: u32 = 0x1fff_ffff;

/// Returns whether `value` fits the AMF3 integer range.
pub fn fits(value: i64) -> bool {
    value >= INT29_MIN as i64 && value <= INT29_MAX as i64
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: i32) -> usize {
    let v = value as u32 & MASK;
    if v < 0x80 {
        1
    } else if v < 0x4000 {
        2
    } else if v < 0x20_0000 {
        3
    } else {
        4
    }
}

/// Encodes the low 29 bits of `value`.
pub fn encode(buf: &mut impl BufMut, value: i32) {
    let v = value as u32 & MASK;
    if v < 0x80 {
        buf.put_u8(v as u8);
    } else if v < 0x4000 {
        buf.put_u8(((v >> 7) & 0x7f) as u8 | 0x80);
        buf.put_u8((v & 0x7f) as u8);
    } else if v < 0x20_0000 {
        buf.put_u8(((v >> 14) & 0x7f) as u8 | 0x80);
        buf.put_u8(((v >> 7) & 0x7f) as u8 | 0x80);
        buf.put_u8((v & 0x7f) as u8);
    } else {
        buf.put_u8(((v >> 22) & 0x7f) as u8 | 0x80);
        buf.put_u8(((v >> 15) & 0x7f) as u8 | 0x80);
        buf.put_u8(((v >> 8) & 0x7f) as u8 | 0x80);
        buf.put_u8((v & 0xff) as u8);
    }
}

/// Decodes a varint from the front of `data`, returning the sign-extended
/// value and the number of bytes consumed.
pub fn decode(data: &[u8]) -> Result<(i32, usize), ProtocolError> {
    let mut acc: u32 = 0;
    for i in 0..4 {
        let Some(&byte) = data.get(i) else {
            return Err(ProtocolError::UnexpectedEof {
                needed: i + 1,
                remaining: data.len(),
            });
        };
        if i == 3 {
            acc = (acc << 8) | byte as u32;
            return Ok((sign_extend(acc), 4));
        }
        acc = (acc << 7) | (byte & 0x7f) as u32;
        if byte & 0x80 == 0 {
            return Ok((sign_extend(acc), i + 1));
        }
    }
    unreachable!("the fourth byte always terminates the loop")
}

fn sign_extend(acc: u32) -> i32 {
    ((acc << 3) as i32) >> 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use proptest::prelude::*;

    fn encode_to_vec(value: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn test_boundary_lengths() {
        let cases = [
            (0, 1),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (2097151, 3),
            (2097152, 4),
            (INT29_MAX, 4),
            (INT29_MIN, 4),
        ];
        for (value, len) in cases {
            let bytes = encode_to_vec(value);
            assert_eq!(bytes.len(), len, "length of {}", value);
            assert_eq!(encoded_len(value), len);
            assert_eq!(decode(&bytes).unwrap(), (value, len), "decode of {}", value);
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode_to_vec(0), vec![0x00]);
        assert_eq!(encode_to_vec(128), vec![0x81, 0x00]);
        assert_eq!(encode_to_vec(INT29_MAX), vec![0xbf, 0xff, 0xff, 0xff]);
        assert_eq!(encode_to_vec(-1), vec![0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_sign_extension() {
        assert_eq!(decode(&[0xff, 0xff, 0xff, 0xff]).unwrap(), (-1, 4));
        assert_eq!(decode(&[0xc0, 0x80, 0x80, 0x00]).unwrap(), (INT29_MIN, 4));
    }

    #[test]
    fn test_truncated_input() {
        let err = decode(&[0x81]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof { needed: 2, remaining: 1 }));
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_fits() {
        assert!(fits(INT29_MAX as i64));
        assert!(fits(INT29_MIN as i64));
        assert!(!fits(INT29_MAX as i64 + 1));
        assert!(!fits(INT29_MIN as i64 - 1));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(value in INT29_MIN..=INT29_MAX) {
            let bytes = encode_to_vec(value);
            prop_assert_eq!(bytes.len(), encoded_len(value));
            prop_assert_eq!(decode(&bytes).unwrap(), (value, bytes.len()));
        }
    }
}
