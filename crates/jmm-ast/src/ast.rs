//! Typed AST
//!
//! The tree produced by the parser and annotated by semantic analysis. The
//! backend only ever reads it; optimization passes build new trees instead of
//! editing this one.

use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A whole compilation unit: imports followed by exactly one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub imports: Vec<ImportDecl>,
    pub class: ClassDecl,
}

/// `import a.b.C;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: Vec<String>,
}

impl ImportDecl {
    pub fn new<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// Name the import is referred to by in source (last path segment)
    pub fn alias(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    /// Dotted, fully qualified name
    pub fn qualified_name(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
}

/// Field or local variable declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Access modifier of a method or field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Access {
    #[default]
    Default,
    Public,
    Private,
    Protected,
}

impl Access {
    /// Keyword as written in source and in assembler directives
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Access::Default => None,
            Access::Public => Some("public"),
            Access::Private => Some("private"),
            Access::Protected => Some("protected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    /// `int... xs`; the declared type is then the array type
    #[serde(default)]
    pub is_varargs: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_varargs: false,
        }
    }

    pub fn varargs(name: impl Into<String>, elem: Type) -> Self {
        Self {
            name: name.into(),
            ty: Type::array_of(elem),
            is_varargs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub is_static: bool,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
}

impl MethodDecl {
    /// Last parameter is declared `T...`
    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_varargs)
    }
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Block(Vec<Stmt>),
    /// Both branches are always present; a missing source `else` is an empty block
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// Expression evaluated for its side effects
    Expr(Expr),
    Assign {
        target: String,
        value: Expr,
    },
    ArrayAssign {
        target: String,
        index: Expr,
        value: Expr,
    },
    Return(Option<Expr>),
}

impl Stmt {
    pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Stmt) -> Self {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn while_loop(cond: Expr, body: Stmt) -> Self {
        Stmt::While {
            cond,
            body: Box::new(body),
        }
    }

    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            target: target.into(),
            value,
        }
    }

    pub fn array_assign(target: impl Into<String>, index: Expr, value: Expr) -> Self {
        Stmt::ArrayAssign {
            target: target.into(),
            index,
            value,
        }
    }

    /// Short name used in log output
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Block(_) => "block",
            Stmt::If { .. } => "if",
            Stmt::While { .. } => "while",
            Stmt::Expr(_) => "expr",
            Stmt::Assign { .. } => "assign",
            Stmt::ArrayAssign { .. } => "array-assign",
            Stmt::Return(_) => "return",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Type of `a op b` for well-typed operands
    pub fn result_type(&self) -> Type {
        if self.is_arithmetic() {
            Type::Int
        } else {
            Type::Boolean
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

/// An expression together with its resolved type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Int(i32),
    Bool(bool),
    /// Local, parameter, field, or import alias
    Var(String),
    This,
    Paren(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Length(Box<Expr>),
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    NewObject(String),
    NewArray {
        elem: Type,
        len: Box<Expr>,
    },
    ArrayLit {
        elem: Type,
        items: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    pub fn int(value: i32) -> Self {
        Self::new(ExprKind::Int(value), Type::Int)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Bool(value), Type::Boolean)
    }

    pub fn var(name: impl Into<String>, ty: Type) -> Self {
        Self::new(ExprKind::Var(name.into()), ty)
    }

    /// `this`, typed as the enclosing class
    pub fn this(class: impl Into<String>) -> Self {
        Self::new(ExprKind::This, Type::Class(class.into()))
    }

    pub fn paren(inner: Expr) -> Self {
        let ty = inner.ty.clone();
        Self::new(ExprKind::Paren(Box::new(inner)), ty)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            op.result_type(),
        )
    }

    pub fn not(operand: Expr) -> Self {
        Self::new(ExprKind::Not(Box::new(operand)), Type::Boolean)
    }

    pub fn index(array: Expr, index: Expr) -> Self {
        let ty = array.ty.element().cloned().unwrap_or(Type::Int);
        Self::new(
            ExprKind::Index {
                array: Box::new(array),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn length(array: Expr) -> Self {
        Self::new(ExprKind::Length(Box::new(array)), Type::Int)
    }

    /// Method call; `ty` is the type semantic analysis resolved for the call
    pub fn call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>, ty: Type) -> Self {
        Self::new(
            ExprKind::Call {
                receiver: Box::new(receiver),
                method: method.into(),
                args,
            },
            ty,
        )
    }

    pub fn new_object(class: impl Into<String>) -> Self {
        let class = class.into();
        Self::new(ExprKind::NewObject(class.clone()), Type::Class(class))
    }

    pub fn new_array(elem: Type, len: Expr) -> Self {
        Self::new(
            ExprKind::NewArray {
                elem: elem.clone(),
                len: Box::new(len),
            },
            Type::array_of(elem),
        )
    }

    pub fn array_lit(elem: Type, items: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::ArrayLit {
                elem: elem.clone(),
                items,
            },
            Type::array_of(elem),
        )
    }

    /// Literal value as an integer (booleans as 0/1)
    pub fn literal_value(&self) -> Option<i32> {
        match self.kind {
            ExprKind::Int(v) => Some(v),
            ExprKind::Bool(b) => Some(b as i32),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.literal_value().is_some()
    }
}
