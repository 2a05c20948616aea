//! Multi-byte NOP synthesis for alignment padding.

use crate::api::CodeSink;

/// Return the canonical padding sequence of exactly `len` bytes.
///
/// The 1-byte form is the plain `nop`; the 2-byte form is a REX-prefixed
/// `xchg %eax, %eax`; 3 through 9 bytes come from the documented `0F 1F /0`
/// long-NOP family with 0/1/4-byte displacements and `66` operand-size
/// prefixes; 10 through 15 bytes prepend `66` and `66 2E` sequences to the
/// 9-byte form. These exact sequences are also the ones accepted by the
/// Native Client validator, so they must not drift.
///
/// # Panics
///
/// Panics if `len` is outside `1..=15`.
#[must_use]
pub fn nop_bytes(len: u8) -> &'static [u8] {
    match len {
        1 => &[0x90],
        2 => &[0x40, 0x90],
        3 => &[0x0F, 0x1F, 0x00],
        4 => &[0x0F, 0x1F, 0x40, 0x00],
        5 => &[0x0F, 0x1F, 0x44, 0x00, 0x00],
        6 => &[0x66, 0x0F, 0x1F, 0x44, 0x00, 0x00],
        7 => &[0x0F, 0x1F, 0x80, 0x00, 0x00, 0x00, 0x00],
        8 => &[0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
        9 => &[0x66, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
        10 => &[0x66, 0x2E, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00],
        11 => &[
            0x66, 0x66, 0x2E, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        12 => &[
            0x66, 0x66, 0x66, 0x2E, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        13 => &[
            0x66, 0x66, 0x66, 0x66, 0x2E, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        14 => &[
            0x66, 0x66, 0x66, 0x66, 0x66, 0x2E, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        15 => &[
            0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x2E, 0x0F, 0x1F, 0x84, 0x00, 0x00, 0x00, 0x00,
            0x00,
        ],
        _ => panic!("nop length must be in 1..=15, got {len}"),
    }
}

/// Emit the canonical `len`-byte NOP into the code sink.
///
/// # Panics
///
/// Panics if `len` is outside `1..=15`.
pub fn emit_nop(sink: &mut impl CodeSink, len: u8) {
    for byte in nop_bytes(len) {
        sink.put1(*byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_are_exact() {
        for len in 1..=15u8 {
            assert_eq!(nop_bytes(len).len(), usize::from(len));
        }
    }

    #[test]
    fn five_byte_form() {
        let mut sink = vec![];
        emit_nop(&mut sink, 5);
        assert_eq!(sink, vec![0x0F, 0x1F, 0x44, 0x00, 0x00]);
    }

    #[test]
    fn short_forms() {
        assert_eq!(nop_bytes(1), [0x90]);
        assert_eq!(nop_bytes(2), [0x40, 0x90]);
        assert_eq!(nop_bytes(3), [0x0F, 0x1F, 0x00]);
    }

    #[test]
    fn long_forms_prepend_prefixes() {
        // 10..=15 are the 9-byte form behind a growing 66 ... 66 2E run.
        for len in 10..=15u8 {
            let bytes = nop_bytes(len);
            let extra = usize::from(len) - 9;
            for byte in &bytes[..extra] {
                assert_eq!(*byte, 0x66);
            }
            assert_eq!(bytes[extra], 0x2E);
            assert_eq!(&bytes[extra + 1..], &nop_bytes(9)[1..]);
        }
    }

    #[test]
    #[should_panic(expected = "nop length")]
    fn zero_length_is_rejected() {
        let _ = nop_bytes(0);
    }

    #[test]
    #[should_panic(expected = "nop length")]
    fn oversized_length_is_rejected() {
        let _ = nop_bytes(16);
    }
}
