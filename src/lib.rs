//! x86-64 machine-code encoding primitives.
//!
//! This crate is the encoder core of a binary assembler: given typed
//! operands (registers and memory addresses) and the template constants of
//! an instruction form, it emits the exact prefix, ModRM/SIB, displacement,
//! and padding bytes the CPU decodes. The instruction database, operand
//! parsing, label resolution, and object emission all live in the outer
//! assembler; this crate only knows how to turn one resolved form into
//! bytes.
//!
//! All encoders write into a [`CodeSink`] (`Vec<u8>` works out of the box)
//! and are parameterized over a register type via [`AsReg`] (`u8` works out
//! of the box), so outer assemblers can plug in their own register
//! representations.
//!
//! ```
//! use x64_encoding::{Amode, DispSize, NonRspGpr, RexFlags, Scale, emit_modrm_sib_disp, reg};
//!
//! // Encode `mov rax, [r11 + rdx*8 - 88]`: a REX.W prefix, the 0x8B
//! // opcode, and a ModRM/SIB/disp8 operand.
//! let amode: Amode<u8> = Amode::ImmRegRegShift {
//!     base: reg::enc::R11,
//!     index: NonRspGpr::new(reg::enc::RDX),
//!     scale: Scale::Eight,
//!     simm32: (-88).into(),
//! };
//! let mut sink = vec![];
//! amode.emit_rex_prefix(RexFlags::set_w(), reg::enc::RAX, &mut sink);
//! sink.push(0x8B);
//! emit_modrm_sib_disp(&mut sink, reg::enc::RAX, &amode, false, DispSize::Any);
//! assert_eq!(sink, vec![0x49, 0x8B, 0x44, 0xD3, 0xA8]);
//! ```

mod api;
pub mod mem;
pub mod nop;
pub mod options;
pub mod reg;
pub mod rex;
pub mod vex;
pub mod xmm;

#[cfg(any(test, feature = "fuzz"))]
mod arbitrary_impls;
#[cfg(any(test, feature = "fuzz"))]
pub mod fuzz;

pub use api::{AsReg, CodeSink};
pub use mem::{Amode, AmodeOffset, GprMem, Scale, XmmMem, emit_modrm_sib_disp};
pub use nop::{emit_nop, nop_bytes};
pub use options::{EncodingOptions, FormFlags};
pub use reg::{Gpr, NonRspGpr};
pub use rex::{Disp, DispSize, RexFlags, encode_modrm, encode_sib};
pub use vex::{VEX3_ESCAPE, VexPrefix, XOP_ESCAPE};
pub use xmm::Xmm;
