//! A fuzz testing oracle for roundtrip assembly-disassembly.
//!
//! The encoder's output is only a fragment of an instruction, so the oracle
//! wraps it in real instructions (`movq` for the REX/ModRM paths, `vmovups`
//! for the VEX paths) and checks the bytes against a known-good
//! disassembler.

use crate::{
    Amode, AsReg, CodeSink, EncodingOptions, Gpr, GprMem, RexFlags, VexPrefix, Xmm, XmmMem,
    emit_modrm_sib_disp, encode_modrm,
};
use arbitrary::{Arbitrary, Result, Unstructured};
use capstone::{Capstone, arch::BuildsCapstone, arch::BuildsCapstoneSyntax, arch::x86};

/// Assemble `movq rm, dst` and check the encoding against a known-good
/// disassembler.
///
/// The `options` only select among byte-equivalent encodings, so the
/// disassembly must come out the same whatever they say.
///
/// # Panics
///
/// This function panics to express failure as expected by the `arbitrary`
/// fuzzer infrastructure. It may fail during disassembly or when comparing
/// the disassembled strings.
pub fn roundtrip_mov(dst: &Gpr<FuzzReg>, rm: &GprMem<FuzzReg, FuzzReg>, options: EncodingOptions) {
    let assembled = assemble_mov(dst, rm, options);
    let context = format!("movq {rm}, {dst} ({options:?})", dst = dst.to_string());
    let expected = disassemble(&assembled, &context);

    // The pretty-printing of no-base address modes is not canonicalized
    // against capstone; for those, decoding as a single full-length
    // instruction (checked above) is the whole contract.
    if matches!(rm, GprMem::Mem(Amode::ImmRegShift { .. })) {
        return;
    }

    // Check that our pretty-printed operands match the known-good output.
    // Trim off the instruction offset first.
    let expected = expected.split_once(' ').unwrap().1;
    let actual = format!("movq {rm}, {dst}", dst = dst.to_string());
    if expected != actual {
        println!("> {context}");
        println!("  assembled: {}", pretty_print_hexadecimal(&assembled));
        println!("  expected (capstone): {expected}");
        println!("  actual (ours):       {actual}");
        assert_eq!(expected, actual);
    }
}

/// Assemble `vmovups rm, dst` twice, with the shortest VEX prefix and with
/// the 3-byte form forced, and check both encodings against a known-good
/// disassembler.
///
/// # Panics
///
/// See [`roundtrip_mov`].
pub fn roundtrip_vmovups(
    dst: &Xmm<FuzzReg>,
    rm: &XmmMem<FuzzReg, FuzzReg>,
    options: EncodingOptions,
) {
    let short = assemble_vmovups(dst, rm, options, false);
    let long = assemble_vmovups(dst, rm, options, true);
    assert!(long.len() >= short.len());

    let context = format!("vmovups {rm}, {dst} ({options:?})", dst = dst.to_string());
    let dis_short = disassemble(&short, &context);
    let dis_long = disassemble(&long, &context);

    // The forced 3-byte prefix is a byte-equivalent alternative: both
    // encodings must decode to the same logical instruction.
    assert_eq!(dis_short, dis_long, "2-byte and 3-byte VEX forms diverged");

    if matches!(rm, XmmMem::Mem(Amode::ImmRegShift { .. })) {
        return;
    }

    let expected = dis_short.split_once(' ').unwrap().1;
    let actual = format!("vmovups {rm}, {dst}", dst = dst.to_string());
    if expected != actual {
        println!("> {context}");
        println!("  assembled: {}", pretty_print_hexadecimal(&short));
        println!("  expected (capstone): {expected}");
        println!("  actual (ours):       {actual}");
        assert_eq!(expected, actual);
    }
}

/// Use the encoder to emit `movq rm, dst` (REX.W + 0x8B /r).
fn assemble_mov(
    dst: &Gpr<FuzzReg>,
    rm: &GprMem<FuzzReg, FuzzReg>,
    options: EncodingOptions,
) -> Vec<u8> {
    let mut sink = vec![];
    let mut rex = RexFlags::set_w();
    if options.force_rex() {
        rex.always_emit();
    }
    rm.emit_rex_prefix(rex, dst.enc(), &mut sink);
    sink.put1(0x8B);
    match rm {
        GprMem::Gpr(gpr) => sink.put1(encode_modrm(0b11, dst.enc() & 7, gpr.enc() & 7)),
        GprMem::Mem(amode) => emit_modrm_sib_disp(
            &mut sink,
            dst.enc(),
            amode,
            options.force_sib(),
            options.min_disp(),
        ),
    }
    sink
}

/// Use the encoder to emit `vmovups rm, dst` (VEX.128.0F.WIG 0x10 /r).
fn assemble_vmovups(
    dst: &Xmm<FuzzReg>,
    rm: &XmmMem<FuzzReg, FuzzReg>,
    options: EncodingOptions,
    force_three_byte: bool,
) -> Vec<u8> {
    let mut sink = vec![];
    let prefix = VexPrefix::two_byte(0, dst.enc(), rm.encoded_bx(), 0, force_three_byte);
    prefix.encode(&mut sink);
    sink.put1(0x10);
    match rm {
        XmmMem::Xmm(reg) => sink.put1(encode_modrm(0b11, dst.enc() & 7, reg.enc() & 7)),
        XmmMem::Mem(amode) => emit_modrm_sib_disp(
            &mut sink,
            dst.enc(),
            amode,
            options.force_sib(),
            options.min_disp(),
        ),
    }
    sink
}

/// Building a new `Capstone` each time is suboptimal (TODO).
fn disassemble(assembled: &[u8], context: &str) -> String {
    let cs = Capstone::new()
        .x86()
        .mode(x86::ArchMode::Mode64)
        .syntax(x86::ArchSyntax::Att)
        .detail(true)
        .build()
        .expect("failed to create Capstone object");
    let insts = cs.disasm_all(assembled, 0x0).expect("failed to disassemble");

    if insts.len() != 1 {
        println!("> {context}");
        println!("  assembled: {}", pretty_print_hexadecimal(assembled));
        assert_eq!(insts.len(), 1, "not a single instruction");
    }

    let inst = insts.first().expect("at least one instruction");
    if assembled.len() != inst.len() {
        println!("> {context}");
        println!("  assembled: {}", pretty_print_hexadecimal(assembled));
        println!(
            "  capstone-assembled: {}",
            pretty_print_hexadecimal(inst.bytes())
        );
        assert_eq!(assembled.len(), inst.len(), "extra bytes not disassembled");
    }

    inst.to_string()
}

fn pretty_print_hexadecimal(hex: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(hex.len() * 2);
    for b in hex {
        write!(&mut s, "{b:02X}").unwrap();
    }
    s
}

/// A simple `u8` register type for fuzzing only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuzzReg(u8);

impl<'a> Arbitrary<'a> for FuzzReg {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Ok(Self(u.int_in_range(0..=15)?))
    }
}

impl AsReg for FuzzReg {
    fn new(enc: u8) -> Self {
        Self(enc)
    }
    fn enc(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use arbtest::arbtest;

    #[test]
    fn mov_smoke() {
        arbtest(|u| {
            let dst: Gpr<FuzzReg> = u.arbitrary()?;
            let rm: GprMem<FuzzReg, FuzzReg> = u.arbitrary()?;
            let options: EncodingOptions = u.arbitrary()?;
            roundtrip_mov(&dst, &rm, options);
            Ok(())
        })
        .budget_ms(1_000);

        // This will run the `roundtrip_mov` oracle for one second. To
        // repeatably test a single input, append `.seed(0x<failing seed>)`.
    }

    #[test]
    fn vmovups_smoke() {
        arbtest(|u| {
            let dst: Xmm<FuzzReg> = u.arbitrary()?;
            let rm: XmmMem<FuzzReg, FuzzReg> = u.arbitrary()?;
            let options: EncodingOptions = u.arbitrary()?;
            roundtrip_vmovups(&dst, &rm, options);
            Ok(())
        })
        .budget_ms(1_000);
    }
}
