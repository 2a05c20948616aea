//! Bitmask vocabularies shared with the outer assembler.

use crate::rex::DispSize;
use bitflags::bitflags;

bitflags! {
    /// Per-form template bits: how an instruction form is put together.
    ///
    /// These summarize an instruction database entry so the outer assembler
    /// can drive the encoder without re-deriving the form's shape on every
    /// call.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FormFlags: u8 {
        /// Operand 0 is the implicit accumulator.
        const ACCUMULATOR_OP0 = 0x01;
        /// Operand 1 is the implicit accumulator.
        const ACCUMULATOR_OP1 = 0x02;
        /// The form ends in an 8-bit label-relative offset.
        const REL8_LABEL = 0x04;
        /// The form ends in a 32-bit label-relative offset.
        const REL32_LABEL = 0x08;
        /// The form carries a ModRM/SIB/displacement operand.
        const MODRM_SIB_DISP = 0x10;
        /// The form takes an optional REX prefix.
        const OPTIONAL_REX = 0x20;
        /// The form takes a 2-byte VEX prefix.
        const VEX2 = 0x40;
    }
}

bitflags! {
    /// Per-call overrides selecting longer but byte-equivalent encodings,
    /// useful for alignment, testing, and downstream patching.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EncodingOptions: u8 {
        /// Emit at least an 8-bit displacement.
        const DISP8 = 0x01;
        /// Emit a full 32-bit displacement.
        const DISP32 = 0x02;
        /// Emit a SIB byte even where a bare ModRM would do.
        const SIB = 0x04;
        /// Emit a REX prefix even when all of its bits are zero.
        const REX = 0x08;
        /// Emit the 3-byte VEX prefix even when the 2-byte form fits.
        const VEX3 = 0x10;
    }
}

impl EncodingOptions {
    /// Translate the displacement bits into the encoder's minimum-width
    /// request; `DISP32` wins over `DISP8` when both are set.
    #[must_use]
    pub fn min_disp(self) -> DispSize {
        if self.contains(Self::DISP32) {
            DispSize::Disp32
        } else if self.contains(Self::DISP8) {
            DispSize::Disp8
        } else {
            DispSize::Any
        }
    }

    /// True if a SIB byte is requested unconditionally.
    #[must_use]
    pub fn force_sib(self) -> bool {
        self.contains(Self::SIB)
    }

    /// True if a REX prefix is requested unconditionally.
    #[must_use]
    pub fn force_rex(self) -> bool {
        self.contains(Self::REX)
    }

    /// True if the 3-byte VEX form is requested unconditionally.
    #[must_use]
    pub fn force_vex3(self) -> bool {
        self.contains(Self::VEX3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_override_precedence() {
        assert_eq!(EncodingOptions::empty().min_disp(), DispSize::Any);
        assert_eq!(EncodingOptions::DISP8.min_disp(), DispSize::Disp8);
        assert_eq!(EncodingOptions::DISP32.min_disp(), DispSize::Disp32);
        assert_eq!(
            (EncodingOptions::DISP8 | EncodingOptions::DISP32).min_disp(),
            DispSize::Disp32
        );
    }

    #[test]
    fn bit_values_are_stable() {
        // The outer assembler serializes these; the values are a contract.
        assert_eq!(FormFlags::VEX2.bits(), 0x40);
        assert_eq!(FormFlags::OPTIONAL_REX.bits(), 0x20);
        assert_eq!(EncodingOptions::VEX3.bits(), 0x10);
        assert_eq!(EncodingOptions::REX.bits(), 0x08);
    }
}
