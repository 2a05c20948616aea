//! Manual impls of the `Arbitrary` trait for types throughout this crate.

use crate::{Amode, AmodeOffset, AsReg, EncodingOptions, Gpr, GprMem, NonRspGpr, Scale, Xmm, XmmMem};
use arbitrary::{Arbitrary, Result, Unstructured};

impl<'a, R: AsReg> Arbitrary<'a> for Gpr<R> {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(Self(R::new(u.int_in_range(0..=15)?)))
    }
}

impl<'a, R: AsReg> Arbitrary<'a> for Xmm<R> {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(Self(R::new(u.int_in_range(0..=15)?)))
    }
}

impl<R: AsReg> Arbitrary<'_> for NonRspGpr<R> {
    fn arbitrary(u: &mut Unstructured<'_>) -> Result<Self> {
        use crate::reg::enc::*;
        let gpr = u.choose(&[
            RAX, RCX, RDX, RBX, RBP, RSI, RDI, R8, R9, R10, R11, R12, R13, R14, R15,
        ])?;
        Ok(Self::new(R::new(*gpr)))
    }
}

impl Arbitrary<'_> for AmodeOffset {
    fn arbitrary(u: &mut Unstructured<'_>) -> Result<Self> {
        Ok(Self::new(i32::arbitrary(u)?))
    }
}

impl Arbitrary<'_> for Scale {
    fn arbitrary(u: &mut Unstructured<'_>) -> Result<Self> {
        Ok(*u.choose(&[Scale::One, Scale::Two, Scale::Four, Scale::Eight])?)
    }
}

impl<'a, R: AsReg> Arbitrary<'a> for Amode<R> {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(match u.int_in_range(0..=2)? {
            0 => Amode::ImmReg {
                base: R::new(u.int_in_range(0..=15)?),
                simm32: AmodeOffset::arbitrary(u)?,
            },
            1 => Amode::ImmRegRegShift {
                base: R::new(u.int_in_range(0..=15)?),
                index: NonRspGpr::arbitrary(u)?,
                scale: Scale::arbitrary(u)?,
                simm32: AmodeOffset::arbitrary(u)?,
            },
            _ => Amode::ImmRegShift {
                index: NonRspGpr::arbitrary(u)?,
                scale: Scale::arbitrary(u)?,
                simm32: AmodeOffset::arbitrary(u)?,
            },
        })
    }
}

impl<'a, R: AsReg, M: AsReg> Arbitrary<'a> for GprMem<R, M> {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(if bool::arbitrary(u)? {
            GprMem::Gpr(R::new(u.int_in_range(0..=15)?))
        } else {
            GprMem::Mem(Amode::arbitrary(u)?)
        })
    }
}

impl<'a, R: AsReg, M: AsReg> Arbitrary<'a> for XmmMem<R, M> {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(if bool::arbitrary(u)? {
            XmmMem::Xmm(R::new(u.int_in_range(0..=15)?))
        } else {
            XmmMem::Mem(Amode::arbitrary(u)?)
        })
    }
}

impl Arbitrary<'_> for EncodingOptions {
    fn arbitrary(u: &mut Unstructured<'_>) -> Result<Self> {
        Ok(Self::from_bits_truncate(u8::arbitrary(u)?))
    }
}
