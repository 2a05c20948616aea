//! Encoding logic for REX-prefixed instructions.

#![allow(clippy::bool_to_int_with_if)]

use crate::api::CodeSink;

/// Encode the ModR/M byte.
#[inline]
#[must_use]
pub fn encode_modrm(m0d: u8, enc_reg_g: u8, rm_e: u8) -> u8 {
    debug_assert!(m0d < 4);
    debug_assert!(enc_reg_g < 8);
    debug_assert!(rm_e < 8);
    ((m0d & 3) << 6) | ((enc_reg_g & 7) << 3) | (rm_e & 7)
}

/// Encode the SIB byte (scale-index-base).
#[inline]
#[must_use]
pub fn encode_sib(scale: u8, enc_index: u8, enc_base: u8) -> u8 {
    debug_assert!(scale < 4);
    debug_assert!(enc_index < 8);
    debug_assert!(enc_base < 8);
    ((scale & 3) << 6) | ((enc_index & 7) << 3) | (enc_base & 7)
}

/// A small bit field to record a REX prefix specification:
/// - bit 0 set to 1 indicates REX.W must be 1 (set).
/// - bit 1 set to 1 indicates the REX prefix must always be emitted.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct RexFlags(u8);

impl RexFlags {
    /// Create a REX prefix specification with the REX.W bit cleared; the
    /// prefix is then omitted whenever R, X, and B are all zero.
    #[inline]
    #[must_use]
    pub fn clear_w() -> Self {
        Self(0)
    }

    /// Create a REX prefix specification with the REX.W bit set (64-bit
    /// operand size); such a prefix is never `0x40`, so it is always emitted.
    #[inline]
    #[must_use]
    pub fn set_w() -> Self {
        Self(1)
    }

    /// True if 64-bit operands are used.
    #[inline]
    #[must_use]
    pub fn must_set_w(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Require that the REX prefix is emitted even when all of its bits are
    /// zero; the longer encoding is byte-equivalent and occasionally wanted
    /// for alignment or later patching.
    #[inline]
    pub fn always_emit(&mut self) -> &mut Self {
        self.0 |= 2;
        self
    }

    /// True if the REX prefix must always be emitted.
    #[inline]
    #[must_use]
    pub fn must_always_emit(self) -> bool {
        (self.0 & 2) != 0
    }

    /// Emit the prefix for a register-register instruction.
    ///
    /// `enc_g` and `enc_e` are the 4-bit hardware encodings of the ModRM.reg
    /// and ModRM.rm registers; only their top bits reach the prefix. REX.X
    /// is unused in this shape.
    #[inline]
    pub fn emit_two_op(self, sink: &mut impl CodeSink, enc_g: u8, enc_e: u8) {
        let w = if self.must_set_w() { 1 } else { 0 };
        let r = (enc_g >> 3) & 1;
        let x = 0;
        let b = (enc_e >> 3) & 1;
        let rex = 0x40 | (w << 3) | (r << 2) | (x << 1) | b;
        if rex != 0x40 || self.must_always_emit() {
            sink.put1(rex);
        }
    }

    /// Emit the prefix for an instruction with a scaled-index memory operand:
    /// REX.X extends the index and REX.B the base.
    #[inline]
    pub fn emit_three_op(self, sink: &mut impl CodeSink, enc_g: u8, enc_index: u8, enc_base: u8) {
        let w = if self.must_set_w() { 1 } else { 0 };
        let r = (enc_g >> 3) & 1;
        let x = (enc_index >> 3) & 1;
        let b = (enc_base >> 3) & 1;
        let rex = 0x40 | (w << 3) | (r << 2) | (x << 1) | b;
        if rex != 0x40 || self.must_always_emit() {
            sink.put1(rex);
        }
    }
}

/// Lower bound on the width of an emitted displacement.
///
/// The shortest legal encoding is the default; the wider ones are
/// byte-equivalent alternatives a caller may force for alignment, testing,
/// or downstream patching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispSize {
    /// Use the shortest displacement the addressing form allows, including
    /// none at all.
    #[default]
    Any,
    /// Emit at least an 8-bit displacement.
    Disp8,
    /// Emit a full 32-bit displacement, even for a value of zero.
    Disp32,
}

/// A classified displacement, as it will appear after the ModRM/SIB bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disp {
    None,
    Disp8(i8),
    Disp32(i32),
}

impl Disp {
    /// Classify the 32-bit displacement `val` under the minimum-width
    /// request `min`.
    #[must_use]
    pub fn new(val: i32, min: DispSize) -> Disp {
        match min {
            DispSize::Disp32 => Disp::Disp32(val),
            DispSize::Disp8 => match i8::try_from(val) {
                Ok(val) => Disp::Disp8(val),
                Err(_) => Disp::Disp32(val),
            },
            DispSize::Any => {
                if val == 0 {
                    return Disp::None;
                }
                match i8::try_from(val) {
                    Ok(val) => Disp::Disp8(val),
                    Err(_) => Disp::Disp32(val),
                }
            }
        }
    }

    /// Force `Disp::None` to become `Disp::Disp8(0)`, used for base
    /// registers whose mode-00 encoding means something else (`%rbp`/`%r13`
    /// decode as disp32-with-no-base).
    pub fn force_disp8(&mut self) {
        if let Disp::None = self {
            *self = Disp::Disp8(0);
        }
    }

    /// Return the two "mod" bits present at the upper bits of the mod/rm
    /// byte.
    #[must_use]
    pub fn m0d(self) -> u8 {
        match self {
            Disp::None => 0b00,
            Disp::Disp8(_) => 0b01,
            Disp::Disp32(_) => 0b10,
        }
    }

    /// Emit the displacement bytes, if any, into the code sink.
    #[allow(clippy::cast_sign_loss)]
    pub fn emit(self, sink: &mut impl CodeSink) {
        match self {
            Disp::None => {}
            Disp::Disp8(n) => sink.put1(n as u8),
            Disp::Disp32(n) => sink.put4(n as u32),
        }
    }
}
