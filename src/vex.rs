//! Encoding logic for VEX- and XOP-prefixed instructions.

use crate::api::CodeSink;

/// The VEX escape byte introducing the 3-byte form.
pub const VEX3_ESCAPE: u8 = 0xC4;
/// The XOP escape byte; XOP prefixes share the 3-byte VEX layout.
pub const XOP_ESCAPE: u8 = 0x8F;

/// Construct and emit the VEX/XOP prefix bytes.
///
/// R, X, B, and vvvv are all stored inverted relative to their logical
/// values, as the hardware expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VexPrefix {
    TwoByte(u8),
    ThreeByte(u8, u8, u8),
}

/// The VEX prefix only ever uses the top bit (bit 3--the fourth bit) of any
/// HW-encoded register.
#[inline(always)]
fn invert_top_bit(enc: u8) -> u8 {
    (!(enc >> 3)) & 1
}

impl VexPrefix {
    /// Construct the shortest legal prefix for an opcode-map-0F, W=0
    /// instruction.
    ///
    /// - `lpp` packs the vector length and SIMD prefix selector into three
    ///   bits (L | pp), the way instruction databases store it.
    /// - `enc_g` and `vvvv` hold HW-encoded registers (the ModRM.reg operand
    ///   and the non-destructive source).
    /// - `(b, x)` hold the (optional) HW-encoded registers of the `rm`
    ///   operand; see [`crate::Amode::encoded_bx`].
    ///
    /// The 2-byte form is used iff the logical X and B bits are both zero
    /// and `force_three_byte` is false; the 3-byte fallback (escape 0xC4,
    /// `mmmmm = 0b00001`, W = 0) encodes the same logical prefix.
    #[inline]
    #[must_use]
    pub fn two_byte(
        lpp: u8,
        enc_g: u8,
        (b, x): (Option<u8>, Option<u8>),
        vvvv: u8,
        force_three_byte: bool,
    ) -> Self {
        debug_assert!(lpp <= 0b111);
        debug_assert!(vvvv <= 0b1111);
        let r = invert_top_bit(enc_g);
        let b = invert_top_bit(b.unwrap_or(0));
        let x = invert_top_bit(x.unwrap_or(0));

        if b == 1 && x == 1 && !force_three_byte {
            // 2-byte VEX prefix.
            //
            // +-----+ +-------------------+
            // | C5h | | R | vvvv | L | pp |
            // +-----+ +-------------------+
            let last_byte = r << 7 | (!vvvv & 0b1111) << 3 | (lpp & 0b111);

            Self::TwoByte(last_byte)
        } else {
            // 3-byte VEX prefix.
            //
            // +-----+ +--------------+ +-------------------+
            // | C4h | | RXB | m-mmmm | | W | vvvv | L | pp |
            // +-----+ +--------------+ +-------------------+
            let second_byte = r << 7 | x << 6 | b << 5 | 0b00001;
            let last_byte = (!vvvv & 0b1111) << 3 | (lpp & 0b111);

            Self::ThreeByte(VEX3_ESCAPE, second_byte, last_byte)
        }
    }

    /// Construct a 3-byte VEX or XOP prefix.
    ///
    /// `w_lpp` packs W into bit 7 and Lpp into bits 0-2, leaving bits 3-6
    /// zero; `mmmmm` selects the opcode map. `enc_g`, `vvvv`, and `(b, x)`
    /// are HW-encoded registers as in [`VexPrefix::two_byte`].
    ///
    /// # Panics
    ///
    /// Panics if `escape` is neither the VEX (0xC4) nor the XOP (0x8F)
    /// escape byte.
    #[inline]
    #[must_use]
    pub fn three_byte(
        escape: u8,
        mmmmm: u8,
        w_lpp: u8,
        enc_g: u8,
        (b, x): (Option<u8>, Option<u8>),
        vvvv: u8,
    ) -> Self {
        assert!(
            escape == VEX3_ESCAPE || escape == XOP_ESCAPE,
            "escape must be a 3-byte VEX (0xC4) or XOP (0x8F) prefix"
        );
        debug_assert!(mmmmm <= 0b11111);
        debug_assert_eq!(w_lpp & 0b0111_1000, 0);
        debug_assert!(vvvv <= 0b1111);
        let r = invert_top_bit(enc_g);
        let b = invert_top_bit(b.unwrap_or(0));
        let x = invert_top_bit(x.unwrap_or(0));

        let second_byte = r << 7 | x << 6 | b << 5 | mmmmm;
        let last_byte = (w_lpp & 0x80) | (!vvvv & 0b1111) << 3 | (w_lpp & 0b111);

        Self::ThreeByte(escape, second_byte, last_byte)
    }

    /// Emit the prefix into the code sink: 2 or 3 bytes.
    pub fn encode(&self, sink: &mut impl CodeSink) {
        match self {
            VexPrefix::TwoByte(last_byte) => {
                sink.put1(0xC5);
                sink.put1(*last_byte);
            }
            VexPrefix::ThreeByte(escape, second_byte, last_byte) => {
                sink.put1(*escape);
                sink.put1(*second_byte);
                sink.put1(*last_byte);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(prefix: VexPrefix) -> Vec<u8> {
        let mut sink = vec![];
        prefix.encode(&mut sink);
        sink
    }

    #[test]
    fn two_byte_all_logical_zeros() {
        // No extension bits, vvvv unused: the classic 0xC5 0xF8.
        let prefix = VexPrefix::two_byte(0, 0, (None, None), 0, false);
        assert_eq!(encode(prefix), vec![0xC5, 0xF8]);
    }

    #[test]
    fn two_byte_packs_inverted_fields() {
        // lpp = 001, vvvv = xmm12, rm = xmm1 (no extension bits).
        let prefix = VexPrefix::two_byte(0b001, 0, (Some(1), None), 0b1100, false);
        assert_eq!(encode(prefix), vec![0xC5, 0x99]);
    }

    #[test]
    fn two_byte_falls_back_on_extended_rm() {
        // A base of %r9 sets logical B, which has no home in the 2-byte form.
        let prefix = VexPrefix::two_byte(0, 0, (Some(9), None), 0, false);
        let bytes = encode(prefix);
        assert_eq!(bytes.len(), 3);
        assert_eq!(bytes[0], 0xC4);
        // ~R=1, ~X=1, ~B=0, mmmmm=00001.
        assert_eq!(bytes[1], 0b1100_0001);
        assert_eq!(bytes[2], 0x78);
    }

    #[test]
    fn forced_three_byte_matches_explicit_vex3() {
        for vvvv in [0b0000, 0b0101, 0b1111] {
            for lpp in 0..8 {
                let forced = VexPrefix::two_byte(lpp, 8, (Some(2), Some(3)), vvvv, true);
                let explicit =
                    VexPrefix::three_byte(VEX3_ESCAPE, 0b00001, lpp, 8, (Some(2), Some(3)), vvvv);
                assert_eq!(forced, explicit);
            }
        }
    }

    #[test]
    fn three_byte_w_bit() {
        let prefix = VexPrefix::three_byte(VEX3_ESCAPE, 0b00010, 0x80 | 0b001, 0, (None, None), 0);
        let bytes = encode(prefix);
        assert_eq!(bytes, vec![0xC4, 0xE2, 0xF9]);
    }

    #[test]
    fn xop_escape() {
        let prefix = VexPrefix::three_byte(XOP_ESCAPE, 0b01001, 0, 0, (None, None), 0);
        let bytes = encode(prefix);
        assert_eq!(bytes, vec![0x8F, 0xE9, 0x78]);
    }

    #[test]
    #[should_panic(expected = "escape")]
    fn rejects_unknown_escape() {
        let _ = VexPrefix::three_byte(0xC6, 0b00001, 0, 0, (None, None), 0);
    }
}
