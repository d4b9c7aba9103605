//! Code Generation
//!
//! Lowers allocated IR to Jasmin assembly text.

pub mod insn;
pub mod jasmin;

pub use insn::{Insn, StackTracker};
pub use jasmin::JasminEmitter;

use crate::error::CompileResult;
use crate::ir::IrClass;

/// Emit the Jasmin text of an allocated class
pub fn emit_class(class: &IrClass) -> CompileResult<String> {
    JasminEmitter::new(class).emit()
}
