//! Intermediate Representation (IR)
//!
//! A three-address code IR with flat, label-based control flow. Each method
//! is a single instruction list plus a variable table that register
//! allocation fills in.

pub mod class;
pub mod instr;
pub mod method;
pub mod pretty;
pub mod value;
pub mod verify;

pub use class::{IrClass, IrField};
pub use instr::{ArithOp, Call, CallKind, Condition, IrInstr, Label, RelOp, Rvalue, UnaryOp};
pub use method::{IrMethod, IrParam, VarDescriptor, VarKind, VarTable};
pub use pretty::PrettyPrint;
pub use value::{FieldRef, IrType, Operand, TempId, VarKey};
pub use verify::{verify_class, verify_method};
