//! Emitted instructions
//!
//! One value per Jasmin line, each with its net operand-stack effect.

use crate::ir::{ArithOp, IrType, Label, RelOp};
use std::fmt;

/// Local slot flavor: `i` for int and boolean, `a` for references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Int,
    Ref,
}

impl SlotKind {
    pub fn of(ty: &IrType) -> Self {
        if ty.is_reference() {
            SlotKind::Ref
        } else {
            SlotKind::Int
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            SlotKind::Int => "i",
            SlotKind::Ref => "a",
        }
    }
}

/// Array element flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Int,
    Bool,
    Ref,
}

impl ArrayKind {
    pub fn of(elem: &IrType) -> Self {
        match elem {
            IrType::Boolean => ArrayKind::Bool,
            IrType::Int32 => ArrayKind::Int,
            _ => ArrayKind::Ref,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            ArrayKind::Int => "ia",
            ArrayKind::Bool => "ba",
            ArrayKind::Ref => "aa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Static,
    Special,
}

impl InvokeKind {
    fn has_receiver(&self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    /// Integer immediate; the cheapest form is picked when printed
    Push(i32),
    Load(SlotKind, u16),
    Store(SlotKind, u16),
    Arith(ArithOp),
    Ixor,
    ArrayLoad(ArrayKind),
    ArrayStore(ArrayKind),
    /// `newarray int|boolean`
    NewArray(&'static str),
    /// `anewarray`, operand is the element's class name or array descriptor
    ANewArray(String),
    ArrayLength,
    GetField {
        owner: String,
        name: String,
        desc: String,
    },
    PutField {
        owner: String,
        name: String,
        desc: String,
    },
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        desc: String,
        args: usize,
        returns_value: bool,
    },
    New(String),
    Dup,
    Pop,
    /// `if_icmp<cc>` or `if_acmp<cc>`
    IfCmp {
        op: RelOp,
        reference: bool,
        target: Label,
    },
    Ifne(Label),
    Goto(Label),
    Return(Option<SlotKind>),
    Label(Label),
}

impl Insn {
    /// Net change in operand-stack height
    pub fn stack_delta(&self) -> i32 {
        match self {
            Insn::Push(_) | Insn::Load(..) | Insn::New(_) | Insn::Dup => 1,
            Insn::Store(..)
            | Insn::Arith(_)
            | Insn::Ixor
            | Insn::ArrayLoad(_)
            | Insn::Pop
            | Insn::Ifne(_)
            | Insn::Return(Some(_)) => -1,
            Insn::PutField { .. } | Insn::IfCmp { .. } => -2,
            Insn::ArrayStore(_) => -3,
            Insn::NewArray(_)
            | Insn::ANewArray(_)
            | Insn::ArrayLength
            | Insn::GetField { .. }
            | Insn::Goto(_)
            | Insn::Return(None)
            | Insn::Label(_) => 0,
            Insn::Invoke {
                kind,
                args,
                returns_value,
                ..
            } => {
                let pushed = i32::from(*returns_value);
                let receiver = i32::from(kind.has_receiver());
                pushed - *args as i32 - receiver
            }
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Insn::Label(_))
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insn::Push(value) => match *value {
                -1 => write!(f, "iconst_m1"),
                0..=5 => write!(f, "iconst_{}", value),
                -128..=127 => write!(f, "bipush {}", value),
                -32768..=32767 => write!(f, "sipush {}", value),
                _ => write!(f, "ldc {}", value),
            },
            Insn::Load(kind, slot) => write_slot(f, kind.prefix(), "load", *slot),
            Insn::Store(kind, slot) => write_slot(f, kind.prefix(), "store", *slot),
            Insn::Arith(op) => {
                let name = match op {
                    ArithOp::Add => "iadd",
                    ArithOp::Sub => "isub",
                    ArithOp::Mul => "imul",
                    ArithOp::Div => "idiv",
                };
                write!(f, "{}", name)
            }
            Insn::Ixor => write!(f, "ixor"),
            Insn::ArrayLoad(kind) => write!(f, "{}load", kind.prefix()),
            Insn::ArrayStore(kind) => write!(f, "{}store", kind.prefix()),
            Insn::NewArray(elem) => write!(f, "newarray {}", elem),
            Insn::ANewArray(elem) => write!(f, "anewarray {}", elem),
            Insn::ArrayLength => write!(f, "arraylength"),
            Insn::GetField { owner, name, desc } => write!(f, "getfield {}/{} {}", owner, name, desc),
            Insn::PutField { owner, name, desc } => write!(f, "putfield {}/{} {}", owner, name, desc),
            Insn::Invoke {
                kind,
                owner,
                name,
                desc,
                ..
            } => {
                let op = match kind {
                    InvokeKind::Virtual => "invokevirtual",
                    InvokeKind::Static => "invokestatic",
                    InvokeKind::Special => "invokespecial",
                };
                write!(f, "{} {}/{}{}", op, owner, name, desc)
            }
            Insn::New(class) => write!(f, "new {}", class),
            Insn::Dup => write!(f, "dup"),
            Insn::Pop => write!(f, "pop"),
            Insn::IfCmp {
                op,
                reference,
                target,
            } => {
                let prefix = if *reference { "if_acmp" } else { "if_icmp" };
                write!(f, "{}{} {}", prefix, op.mnemonic(), target)
            }
            Insn::Ifne(target) => write!(f, "ifne {}", target),
            Insn::Goto(target) => write!(f, "goto {}", target),
            Insn::Return(Some(kind)) => write!(f, "{}return", kind.prefix()),
            Insn::Return(None) => write!(f, "return"),
            Insn::Label(label) => write!(f, "{}:", label),
        }
    }
}

/// `iload_2` for slots 0..=3, `iload 7` otherwise
fn write_slot(f: &mut fmt::Formatter<'_>, prefix: &str, op: &str, slot: u16) -> fmt::Result {
    if slot <= 3 {
        write!(f, "{}{}_{}", prefix, op, slot)
    } else {
        write!(f, "{}{} {}", prefix, op, slot)
    }
}

/// Running operand-stack height of one method
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StackTracker {
    current: i32,
    max: i32,
}

impl StackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `delta`; `false` if the height would go negative
    pub fn apply(&mut self, delta: i32) -> bool {
        let next = self.current + delta;
        if next < 0 {
            return false;
        }
        self.current = next;
        self.max = self.max.max(next);
        true
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}
