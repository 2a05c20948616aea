//! Memory operands to instructions.

use crate::api::{AsReg, CodeSink};
use crate::reg::{self, NonRspGpr};
use crate::rex::{Disp, DispSize, RexFlags, encode_modrm, encode_sib};
use crate::xmm;

/// x64 memory addressing modes.
///
/// At least one of base and index is always present; absolute and
/// RIP-relative addressing are not expressible here.
#[derive(Clone, Debug)]
pub enum Amode<R: AsReg> {
    ImmReg {
        base: R,
        simm32: AmodeOffset,
    },
    ImmRegRegShift {
        base: R,
        index: NonRspGpr<R>,
        scale: Scale,
        simm32: AmodeOffset,
    },
    ImmRegShift {
        index: NonRspGpr<R>,
        scale: Scale,
        simm32: AmodeOffset,
    },
}

impl<R: AsReg> Amode<R> {
    /// Emit the REX prefix `rex` for this operand, extracting the X and B
    /// extension bits from the index and base registers (absent registers
    /// contribute zero bits).
    pub fn emit_rex_prefix(&self, rex: RexFlags, enc_g: u8, sink: &mut impl CodeSink) {
        match self {
            Amode::ImmReg { base, .. } => {
                let enc_e = base.enc();
                rex.emit_two_op(sink, enc_g, enc_e);
            }
            Amode::ImmRegRegShift { base, index, .. } => {
                let enc_base = base.enc();
                let enc_index = index.enc();
                rex.emit_three_op(sink, enc_g, enc_index, enc_base);
            }
            Amode::ImmRegShift { index, .. } => {
                // note REX.B = 0.
                let enc_index = index.enc();
                rex.emit_three_op(sink, enc_g, enc_index, 0);
            }
        }
    }

    /// Return the `(base, index)` hardware encodings feeding the VEX/XOP
    /// B and X bits; see [`crate::VexPrefix`].
    pub fn encoded_bx(&self) -> (Option<u8>, Option<u8>) {
        match self {
            Amode::ImmReg { base, .. } => (Some(base.enc()), None),
            Amode::ImmRegRegShift { base, index, .. } => (Some(base.enc()), Some(index.enc())),
            Amode::ImmRegShift { index, .. } => (None, Some(index.enc())),
        }
    }
}

/// A 32-bit immediate for address offsets.
#[derive(Clone, Copy, Debug)]
pub struct AmodeOffset(i32);

impl AmodeOffset {
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for AmodeOffset {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl std::fmt::LowerHex for AmodeOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Match `capstone`'s pretty-printing of memory offsets: nothing at
        // all for zero, a minus sign ahead of the `0x` prefix, and no `0x`
        // prefix for single-digit magnitudes. Widening to i64 keeps the
        // negation of i32::MIN in range.
        let value = i64::from(self.0);
        if value == 0 {
            return Ok(());
        }
        let sign = if value < 0 { "-" } else { "" };
        let abs = value.abs();
        if abs < 10 {
            write!(f, "{sign}{abs:x}")
        } else {
            write!(f, "{sign}0x{abs:x}")
        }
    }
}

impl<R: AsReg> std::fmt::Display for Amode<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amode::ImmReg { simm32, base } => {
                let base = reg::enc::to_string(base.enc());
                write!(f, "{simm32:x}({base})")
            }
            Amode::ImmRegRegShift {
                simm32,
                base,
                index,
                scale,
            } => {
                let base = reg::enc::to_string(base.enc());
                let index = index.to_string();
                let shift = scale.shift();
                if shift > 1 {
                    write!(f, "{simm32:x}({base}, {index}, {shift})")
                } else {
                    write!(f, "{simm32:x}({base}, {index})")
                }
            }
            Amode::ImmRegShift {
                simm32,
                index,
                scale,
            } => {
                let index = index.to_string();
                let shift = scale.shift();
                write!(f, "{simm32:x}(, {index}, {shift})")
            }
        }
    }
}

/// The scaling factor for the index register in certain [`Amode`]s.
#[derive(Clone, Copy, Debug)]
pub enum Scale {
    One,
    Two,
    Four,
    Eight,
}

impl Scale {
    /// Create a new [`Scale`] from its hardware encoding.
    ///
    /// # Panics
    ///
    /// Panics if `enc` is not a valid encoding for a scale (0-3).
    #[must_use]
    pub fn new(enc: u8) -> Self {
        match enc {
            0b00 => Scale::One,
            0b01 => Scale::Two,
            0b10 => Scale::Four,
            0b11 => Scale::Eight,
            _ => panic!("invalid scale encoding: {enc}"),
        }
    }

    /// Create a new [`Scale`] from a multiplier value.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not 1, 2, 4, or 8.
    #[must_use]
    pub fn from_value(value: u8) -> Self {
        match value {
            1 => Scale::One,
            2 => Scale::Two,
            4 => Scale::Four,
            8 => Scale::Eight,
            _ => panic!("invalid scale multiplier: {value}"),
        }
    }

    /// Return the hardware encoding of this [`Scale`].
    fn enc(&self) -> u8 {
        match self {
            Scale::One => 0b00,
            Scale::Two => 0b01,
            Scale::Four => 0b10,
            Scale::Eight => 0b11,
        }
    }

    /// Return how much this [`Scale`] will shift the value in the index
    /// register of the SIB byte.
    ///
    /// This is useful for pretty-printing; when encoding, one usually needs
    /// [`Scale::enc`].
    fn shift(&self) -> u8 {
        1 << self.enc()
    }
}

/// A general-purpose register or memory operand.
#[derive(Clone, Debug)]
#[allow(
    clippy::module_name_repetitions,
    reason = "'GprMem' indicates this has GPR and memory variants"
)]
pub enum GprMem<R: AsReg, M: AsReg> {
    Gpr(R),
    Mem(Amode<M>),
}

impl<R: AsReg, M: AsReg> GprMem<R, M> {
    /// Emit the REX prefix `rex` for this operand: a register contributes
    /// its top bit via REX.B, a memory operand via its base/index registers.
    pub fn emit_rex_prefix(&self, rex: RexFlags, enc_g: u8, sink: &mut impl CodeSink) {
        match self {
            GprMem::Gpr(gpr) => rex.emit_two_op(sink, enc_g, gpr.enc()),
            GprMem::Mem(amode) => amode.emit_rex_prefix(rex, enc_g, sink),
        }
    }

    /// See [`Amode::encoded_bx`].
    pub fn encoded_bx(&self) -> (Option<u8>, Option<u8>) {
        match self {
            GprMem::Gpr(gpr) => (Some(gpr.enc()), None),
            GprMem::Mem(amode) => amode.encoded_bx(),
        }
    }
}

impl<R: AsReg, M: AsReg> std::fmt::Display for GprMem<R, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GprMem::Gpr(gpr) => write!(f, "{}", reg::enc::to_string(gpr.enc())),
            GprMem::Mem(amode) => write!(f, "{amode}"),
        }
    }
}

/// An XMM register or memory operand.
#[derive(Clone, Debug)]
#[allow(
    clippy::module_name_repetitions,
    reason = "'XmmMem' indicates this has Xmm and memory variants"
)]
pub enum XmmMem<R: AsReg, M: AsReg> {
    Xmm(R),
    Mem(Amode<M>),
}

impl<R: AsReg, M: AsReg> XmmMem<R, M> {
    /// See [`GprMem::emit_rex_prefix`].
    pub fn emit_rex_prefix(&self, rex: RexFlags, enc_g: u8, sink: &mut impl CodeSink) {
        match self {
            XmmMem::Xmm(reg) => rex.emit_two_op(sink, enc_g, reg.enc()),
            XmmMem::Mem(amode) => amode.emit_rex_prefix(rex, enc_g, sink),
        }
    }

    /// See [`Amode::encoded_bx`].
    pub fn encoded_bx(&self) -> (Option<u8>, Option<u8>) {
        match self {
            XmmMem::Xmm(reg) => (Some(reg.enc()), None),
            XmmMem::Mem(amode) => amode.encoded_bx(),
        }
    }
}

impl<R: AsReg, M: AsReg> std::fmt::Display for XmmMem<R, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XmmMem::Xmm(reg) => write!(f, "{}", xmm::enc::to_string(reg.enc())),
            XmmMem::Mem(amode) => write!(f, "{amode}"),
        }
    }
}

/// Emit the ModRM/SIB/displacement sequence for a memory operand.
///
/// `enc_g` is the register (or opcode-extension digit) destined for the
/// ModRM.reg field; only its low three bits are used here, the fourth bit
/// travels in the REX/VEX prefix. `force_sib` requests the byte-equivalent
/// SIB form even where a bare ModRM would do; `min_disp` widens the
/// displacement beyond the shortest legal encoding.
pub fn emit_modrm_sib_disp<R: AsReg>(
    sink: &mut impl CodeSink,
    enc_g: u8,
    mem_e: &Amode<R>,
    force_sib: bool,
    min_disp: DispSize,
) {
    match *mem_e {
        Amode::ImmReg { simm32, ref base } => {
            let enc_e = base.enc();
            let mut disp = Disp::new(simm32.value(), min_disp);

            // If the base register is rbp/r13 and there's no displacement
            // then force a 1-byte zero displacement since otherwise the
            // encoding would be invalid (mod=00 with rm=101 decodes as
            // disp32 with no base).
            if enc_e & 7 == reg::enc::RBP {
                disp.force_disp8();
            }

            // Most base registers allow for a single ModRM byte plus an
            // optional displacement. If rsp is the base register, however,
            // then a SIB byte must be used: rm=100 announces it. The SIB's
            // index of 0b100 means "no index" and the base is 0b100 with or
            // without a REX-encoded 4th bit (e.g. rsp or r12).
            if force_sib || enc_e & 7 == reg::enc::RSP {
                sink.put1(encode_modrm(disp.m0d(), enc_g & 7, 0b100));
                sink.put1(encode_sib(0, 0b100, enc_e & 7));
                disp.emit(sink);
            } else {
                sink.put1(encode_modrm(disp.m0d(), enc_g & 7, enc_e & 7));
                disp.emit(sink);
            }
        }

        Amode::ImmRegRegShift {
            simm32,
            ref base,
            ref index,
            ref scale,
        } => {
            let enc_base = base.enc();
            let enc_index = index.enc();

            // If the offset is zero then there is no displacement. Note,
            // though, that if the base register's lower three bits are `101`
            // then a displacement must be present. This is a special case in
            // the encoding of the SIB byte and requires an explicit
            // displacement with rbp/r13.
            let mut disp = Disp::new(simm32.value(), min_disp);
            if enc_base & 7 == reg::enc::RBP {
                disp.force_disp8();
            }

            // With the above determined encode the ModRM byte, then the SIB
            // byte, then any displacement as necessary.
            sink.put1(encode_modrm(disp.m0d(), enc_g & 7, 0b100));
            sink.put1(encode_sib(scale.enc(), enc_index & 7, enc_base & 7));
            disp.emit(sink);
        }

        Amode::ImmRegShift {
            simm32,
            ref index,
            ref scale,
        } => {
            let enc_index = index.enc();

            // SIB.base = 101 with mod=00 is the no-base encoding; it always
            // carries a 32-bit displacement, whatever its value.
            #[allow(clippy::cast_sign_loss)]
            {
                sink.put1(encode_modrm(0b00, enc_g & 7, 0b100));
                sink.put1(encode_sib(scale.enc(), enc_index & 7, 0b101));
                sink.put4(simm32.value() as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::enc;

    fn imm_reg(base: u8, disp: i32) -> Amode<u8> {
        Amode::ImmReg {
            base,
            simm32: disp.into(),
        }
    }

    fn imm_reg_reg_shift(base: u8, index: u8, scale: u8, disp: i32) -> Amode<u8> {
        Amode::ImmRegRegShift {
            base,
            index: NonRspGpr::new(index),
            scale: Scale::from_value(scale),
            simm32: disp.into(),
        }
    }

    fn encode(amode: &Amode<u8>, enc_g: u8, force_sib: bool, min_disp: DispSize) -> Vec<u8> {
        let mut sink = vec![];
        emit_modrm_sib_disp(&mut sink, enc_g, amode, force_sib, min_disp);
        sink
    }

    #[test]
    fn plain_base() {
        let bytes = encode(&imm_reg(enc::RAX, 0), 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x00]);
    }

    #[test]
    fn plain_base_disp8_and_disp32() {
        let bytes = encode(&imm_reg(enc::RCX, -16), 2, false, DispSize::Any);
        assert_eq!(bytes, vec![0x51, 0xF0]);

        let bytes = encode(&imm_reg(enc::RCX, 0x1000), 2, false, DispSize::Any);
        assert_eq!(bytes, vec![0x91, 0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn rsp_base_forces_sib() {
        // [rsp] decodes only through a SIB byte with "no index".
        let bytes = encode(&imm_reg(enc::RSP, 0), 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x04, 0x24]);
    }

    #[test]
    fn r12_base_forces_sib() {
        // r12 shares rsp's low bits; REX.B makes the difference elsewhere.
        let bytes = encode(&imm_reg(enc::R12, 0), 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x04, 0x24]);
    }

    #[test]
    fn rbp_base_needs_zero_disp8() {
        // [rbp] in mod=00 would decode as disp32-with-no-base.
        let bytes = encode(&imm_reg(enc::RBP, 0), 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x45, 0x00]);
    }

    #[test]
    fn r13_base_needs_zero_disp8() {
        let bytes = encode(&imm_reg(enc::R13, 0), 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x45, 0x00]);
    }

    #[test]
    fn forced_sib_keeps_byte_equivalence() {
        let bytes = encode(&imm_reg(enc::RAX, 0), 0, true, DispSize::Any);
        assert_eq!(bytes, vec![0x04, 0x20]);
    }

    #[test]
    fn forced_sib_with_rbp_base_still_needs_disp8() {
        let bytes = encode(&imm_reg(enc::RBP, 0), 0, true, DispSize::Any);
        assert_eq!(bytes, vec![0x44, 0x25, 0x00]);
    }

    #[test]
    fn forced_minimum_displacements() {
        let bytes = encode(&imm_reg(enc::RAX, 0), 0, false, DispSize::Disp8);
        assert_eq!(bytes, vec![0x40, 0x00]);

        let bytes = encode(&imm_reg(enc::RAX, 0), 0, false, DispSize::Disp32);
        assert_eq!(bytes, vec![0x80, 0x00, 0x00, 0x00, 0x00]);

        // A disp8-sized value is widened on request too.
        let bytes = encode(&imm_reg(enc::RAX, 7), 0, false, DispSize::Disp32);
        assert_eq!(bytes, vec![0x80, 0x07, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn base_index_scale() {
        // mov rax, [r11 + rdx*8 - 88] encodes its operand as 44 D3 A8.
        let bytes = encode(
            &imm_reg_reg_shift(enc::R11, enc::RDX, 8, -88),
            0,
            false,
            DispSize::Any,
        );
        assert_eq!(bytes, vec![0x44, 0xD3, 0xA8]);
    }

    #[test]
    fn base_index_scale_disp8_boundary() {
        let bytes = encode(
            &imm_reg_reg_shift(enc::R15, enc::RSI, 8, -128),
            3,
            false,
            DispSize::Any,
        );
        assert_eq!(bytes, vec![0x5C, 0xF7, 0x80]);
    }

    #[test]
    fn base_index_no_disp() {
        let bytes = encode(
            &imm_reg_reg_shift(enc::RBX, enc::RCX, 4, 0),
            1,
            false,
            DispSize::Any,
        );
        assert_eq!(bytes, vec![0x0C, 0x8B]);
    }

    #[test]
    fn rbp_base_with_index_needs_disp8() {
        let bytes = encode(
            &imm_reg_reg_shift(enc::RBP, enc::RDI, 1, 0),
            0,
            false,
            DispSize::Any,
        );
        assert_eq!(bytes, vec![0x44, 0x3D, 0x00]);
    }

    #[test]
    fn index_without_base_always_disp32() {
        // mov rax, [rsi*4 + 0x10] encodes its operand as 04 B5 10 00 00 00.
        let amode = Amode::ImmRegShift {
            index: NonRspGpr::new(enc::RSI),
            scale: Scale::Four,
            simm32: 0x10.into(),
        };
        let bytes = encode(&amode, 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x04, 0xB5, 0x10, 0x00, 0x00, 0x00]);

        let amode = Amode::ImmRegShift {
            index: NonRspGpr::new(enc::RSI),
            scale: Scale::Four,
            simm32: 0.into(),
        };
        let bytes = encode(&amode, 0, false, DispSize::Any);
        assert_eq!(bytes, vec![0x04, 0xB5, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    #[should_panic(expected = "%rsp")]
    fn rsp_index_is_rejected() {
        let bytes = encode(
            &imm_reg_reg_shift(enc::RAX, enc::RSP, 2, 0),
            0,
            false,
            DispSize::Any,
        );
        drop(bytes);
    }

    #[test]
    fn display_matches_att_syntax() {
        assert_eq!(imm_reg(enc::R11, -16).to_string(), "-0x10(%r11)");
        assert_eq!(imm_reg(enc::RAX, 0).to_string(), "(%rax)");
        assert_eq!(
            imm_reg_reg_shift(enc::RBX, enc::RCX, 4, 5).to_string(),
            "5(%rbx, %rcx, 4)"
        );
        assert_eq!(
            imm_reg_reg_shift(enc::RBX, enc::RCX, 1, 0).to_string(),
            "(%rbx, %rcx)"
        );
    }
}
