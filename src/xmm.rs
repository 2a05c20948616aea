//! Xmm register operands; see [`Xmm`].

use crate::AsReg;

/// An x64 SSE register (e.g., `%xmm0`).
///
/// Unlike general-purpose registers, an SSE register has a single name per
/// encoding here: vector width is selected by the instruction form (the
/// VEX.L bit), not by the register operand, so there is no width-indexed
/// naming to carry.
#[derive(Clone, Copy, Debug)]
pub struct Xmm<R: AsReg = u8>(pub(crate) R);

impl<R: AsReg> Xmm<R> {
    /// Create a new [`Xmm`] register.
    pub fn new(reg: R) -> Self {
        Self(reg)
    }

    /// Return the register's hardware encoding.
    ///
    /// # Panics
    ///
    /// Panics if the register is not a valid Xmm register.
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

/// Encode xmm registers.
pub mod enc {
    const NAMES: [&str; 16] = [
        "%xmm0", "%xmm1", "%xmm2", "%xmm3", "%xmm4", "%xmm5", "%xmm6", "%xmm7", "%xmm8", "%xmm9",
        "%xmm10", "%xmm11", "%xmm12", "%xmm13", "%xmm14", "%xmm15",
    ];

    /// Return the name of a XMM encoding (`enc`).
    ///
    /// # Panics
    ///
    /// This function will panic if the encoding is not a valid x64 register.
    pub fn to_string(enc: u8) -> &'static str {
        match NAMES.get(usize::from(enc)) {
            Some(name) => *name,
            None => panic!("%invalid{enc}"),
        }
    }
}
