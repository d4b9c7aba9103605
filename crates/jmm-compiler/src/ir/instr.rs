//! IR Instructions
//!
//! Three-address code instructions for the IR. Control flow is flat: labels
//! are pseudo-instructions and jumps name them.

use super::value::{FieldRef, IrType, Operand};
use std::fmt;

/// Jump target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub String);

impl Label {
    pub fn new(prefix: &str, suffix: u32) -> Self {
        Label(format!("{}_{}", prefix, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Relation tested by a comparing branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl RelOp {
    /// Condition-code suffix shared by `if_icmp<cc>` and `if_acmp<cc>`
    pub fn mnemonic(&self) -> &'static str {
        match self {
            RelOp::Lt => "lt",
            RelOp::Le => "le",
            RelOp::Gt => "gt",
            RelOp::Ge => "ge",
            RelOp::Eq => "eq",
            RelOp::Ne => "ne",
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
        };
        write!(f, "{}", s)
    }
}

/// Dispatch kind of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Instance dispatch on the target
    Virtual,
    /// Target is a `ClassRef`
    Static,
    /// Constructor invocation on a freshly allocated instance
    Special,
    /// Instance allocation; the target is the `ClassRef` being allocated
    New,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallKind::Virtual => "invokevirtual",
            CallKind::Static => "invokestatic",
            CallKind::Special => "invokespecial",
            CallKind::New => "new",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub target: Operand,
    pub method: String,
    pub args: Vec<Operand>,
    pub return_ty: IrType,
}

/// Right-hand side of an assignment, or a raw expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rvalue {
    Operand(Operand),
    Binary {
        op: ArithOp,
        left: Operand,
        right: Operand,
    },
    Unary {
        op: UnaryOp,
        operand: Operand,
    },
    GetField {
        object: Operand,
        field: FieldRef,
    },
    Call(Call),
    NewArray {
        elem: IrType,
        len: Operand,
    },
    ArrayLength(Operand),
}

impl Rvalue {
    /// Type of the value this form produces
    pub fn ty(&self) -> IrType {
        match self {
            Rvalue::Operand(op) => op.ty(),
            Rvalue::Binary { .. } | Rvalue::ArrayLength(_) => IrType::Int32,
            Rvalue::Unary { .. } => IrType::Boolean,
            Rvalue::GetField { field, .. } => field.ty.clone(),
            Rvalue::Call(call) => call.return_ty.clone(),
            Rvalue::NewArray { elem, .. } => IrType::array_of(elem.clone()),
        }
    }

    /// Operands read by this form, in evaluation order
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Rvalue::Operand(op) | Rvalue::ArrayLength(op) => vec![op],
            Rvalue::Binary { left, right, .. } => vec![left, right],
            Rvalue::Unary { operand, .. } => vec![operand],
            Rvalue::GetField { object, .. } => vec![object],
            Rvalue::Call(call) => std::iter::once(&call.target).chain(&call.args).collect(),
            Rvalue::NewArray { len, .. } => vec![len],
        }
    }
}

/// Branch condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// A single materialized boolean; taken when non-zero
    Operand(Operand),
    /// Direct comparison, used only to materialize relations
    Compare {
        op: RelOp,
        left: Operand,
        right: Operand,
    },
}

/// IR instruction (Three-Address Code)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrInstr {
    /// dest = value; `dest` is a variable, temporary or array element
    Assign { dest: Operand, value: Rvalue },
    /// Evaluated for its side effects only
    Expr(Rvalue),
    PutField {
        object: Operand,
        field: FieldRef,
        value: Operand,
    },
    Goto(Label),
    Branch { cond: Condition, target: Label },
    Label(Label),
    Return { value: Option<Operand>, ty: IrType },
}

impl IrInstr {
    /// Label this instruction may transfer control to
    pub fn jump_target(&self) -> Option<&Label> {
        match self {
            IrInstr::Goto(label) | IrInstr::Branch { target: label, .. } => Some(label),
            _ => None,
        }
    }

    /// Every operand mentioned, destination first
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            IrInstr::Assign { dest, value } => {
                let mut ops = vec![dest];
                ops.extend(value.operands());
                ops
            }
            IrInstr::Expr(value) => value.operands(),
            IrInstr::PutField { object, value, .. } => vec![object, value],
            IrInstr::Branch { cond, .. } => match cond {
                Condition::Operand(op) => vec![op],
                Condition::Compare { left, right, .. } => vec![left, right],
            },
            IrInstr::Return { value, .. } => value.iter().collect(),
            IrInstr::Goto(_) | IrInstr::Label(_) => Vec::new(),
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, IrInstr::Return { .. })
    }
}
