//! Pure register operands; see [`Gpr`].

use crate::AsReg;

/// A general purpose x64 register (e.g., `%rax`).
///
/// This container wraps a true register type `R` to allow users to specify
/// their own; by default this will use `u8`.
#[derive(Clone, Copy, Debug)]
pub struct Gpr<R: AsReg = u8>(pub(crate) R);

impl<R: AsReg> Gpr<R> {
    /// Create a new [`Gpr`].
    pub fn new(reg: R) -> Self {
        Self(reg)
    }

    /// Return the register's hardware encoding.
    ///
    /// # Panics
    ///
    /// Panics if the register is not a valid x64 register.
    pub fn enc(&self) -> u8 {
        let enc = self.0.enc();
        assert!(enc < 16, "invalid register: {enc}");
        enc
    }

    /// Return the register name.
    pub fn to_string(&self) -> &str {
        enc::to_string(self.enc())
    }
}

/// Like [`Gpr`], but with `%rsp` disallowed.
///
/// An index register encoded as `%rsp` decodes as "no index" (Intel SDM
/// Vol. 2A, table 2-5), so this type keeps it out of the SIB index field.
/// Note that `%r12` shares the low three bits of `%rsp`'s encoding but is
/// explicitly allowed as an index by the REX.X extension.
#[derive(Clone, Copy, Debug)]
pub struct NonRspGpr<R: AsReg>(R);

impl<R: AsReg> NonRspGpr<R> {
    /// See [`Gpr::new`].
    pub fn new(reg: R) -> Self {
        Self(reg)
    }

    /// See [`Gpr::enc`].
    ///
    /// # Panics
    ///
    /// Panics if the register is invalid or `%rsp`.
    pub fn enc(&self) -> u8 {
        let enc = self.0.enc();
        assert!(enc < 16, "invalid register: {enc}");
        assert_ne!(enc, enc::RSP, "invalid register: %rsp");
        enc
    }

    /// Return the register name.
    pub fn to_string(&self) -> &str {
        enc::to_string(self.enc())
    }
}

/// Encode x64 registers.
pub mod enc {
    pub const RAX: u8 = 0;
    pub const RCX: u8 = 1;
    pub const RDX: u8 = 2;
    pub const RBX: u8 = 3;
    pub const RSP: u8 = 4;
    pub const RBP: u8 = 5;
    pub const RSI: u8 = 6;
    pub const RDI: u8 = 7;
    pub const R8: u8 = 8;
    pub const R9: u8 = 9;
    pub const R10: u8 = 10;
    pub const R11: u8 = 11;
    pub const R12: u8 = 12;
    pub const R13: u8 = 13;
    pub const R14: u8 = 14;
    pub const R15: u8 = 15;

    /// Return the quadword name of a GPR encoding (`enc`); addresses are
    /// always 64 bits wide, even when the addressed operand is smaller.
    ///
    /// # Panics
    ///
    /// This function will panic if the encoding is not a valid x64 register.
    pub fn to_string(enc: u8) -> &'static str {
        match enc {
            RAX => "%rax",
            RCX => "%rcx",
            RDX => "%rdx",
            RBX => "%rbx",
            RSP => "%rsp",
            RBP => "%rbp",
            RSI => "%rsi",
            RDI => "%rdi",
            R8 => "%r8",
            R9 => "%r9",
            R10 => "%r10",
            R11 => "%r11",
            R12 => "%r12",
            R13 => "%r13",
            R14 => "%r14",
            R15 => "%r15",
            _ => panic!("%invalid{enc}"),
        }
    }
}
