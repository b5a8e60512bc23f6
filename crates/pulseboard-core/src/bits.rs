//! Fixed-width bit serialization for diagnostics.
//!
//! Flag and mask bytes are printed most-significant byte first, and within
//! each byte most-significant bit first, so that bit `i` of the run appears
//! `i` characters from the right, as the number would be written down.

use crate::BITS_PER_BYTE;

/// Render `bytes` as a string of `'0'`/`'1'`, 8 characters per byte.
///
/// Byte 0 occupies the rightmost eight characters.
pub fn serialize_bits(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * BITS_PER_BYTE);
    for &byte in bytes.iter().rev() {
        for bit in (0..BITS_PER_BYTE).rev() {
            out.push(if byte & (1 << bit) != 0 { '1' } else { '0' });
        }
    }
    out
}

/// Render a slice of booleans in index order (`bits[0]` first).
pub fn serialize_bools(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Test bit `index` of a little-endian bit run.
///
/// # Panics
///
/// Panics if `index / 8` is out of bounds for `bytes`.
pub fn bit_at(bytes: &[u8], index: usize) -> bool {
    bytes[index / BITS_PER_BYTE] & (1 << (index % BITS_PER_BYTE)) != 0
}

/// Set bit `index` of a little-endian bit run.
///
/// # Panics
///
/// Panics if `index / 8` is out of bounds for `bytes`.
pub fn set_bit(bytes: &mut [u8], index: usize) {
    bytes[index / BITS_PER_BYTE] |= 1 << (index % BITS_PER_BYTE);
}

/// Clear bit `index` of a little-endian bit run.
///
/// # Panics
///
/// Panics if `index / 8` is out of bounds for `bytes`.
pub fn clear_bit(bytes: &mut [u8], index: usize) {
    bytes[index / BITS_PER_BYTE] &= !(1 << (index % BITS_PER_BYTE));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_single_byte() {
        assert_eq!(serialize_bits(&[0b0000_0101]), "00000101");
        assert_eq!(serialize_bits(&[0x80]), "10000000");
    }

    #[test]
    fn serialize_puts_first_byte_rightmost() {
        assert_eq!(serialize_bits(&[0x01, 0x80]), "1000000000000001");
    }

    #[test]
    fn serialize_empty() {
        assert_eq!(serialize_bits(&[]), "");
    }

    #[test]
    fn serialize_bools_in_index_order() {
        assert_eq!(serialize_bools(&[true, false, true]), "101");
    }

    #[test]
    fn set_and_clear_bits() {
        let mut bytes = [0u8; 2];
        set_bit(&mut bytes, 0);
        set_bit(&mut bytes, 9);
        assert_eq!(bytes, [0x01, 0x02]);
        assert!(bit_at(&bytes, 9));
        clear_bit(&mut bytes, 9);
        assert!(!bit_at(&bytes, 9));
        assert!(bit_at(&bytes, 0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serialized_char_matches_bit(bytes in proptest::collection::vec(any::<u8>(), 1..8)) {
                let s = serialize_bits(&bytes);
                let width = bytes.len() * BITS_PER_BYTE;
                prop_assert_eq!(s.len(), width);
                for (pos, ch) in s.chars().enumerate() {
                    let index = width - 1 - pos;
                    prop_assert_eq!(ch == '1', bit_at(&bytes, index));
                }
            }
        }
    }
}
