//! Java-- typed AST and symbol table
//!
//! The data handed to the compiler backend by the (external) parser and
//! semantic analysis stages. The backend trusts it to be well-typed.

pub mod ast;
pub mod symbols;
pub mod types;

pub use ast::{
    Access, BinaryOp, ClassDecl, Expr, ExprKind, ImportDecl, MethodDecl, Param, Program, Stmt,
    VarDecl,
};
pub use symbols::{MethodSignature, SymbolTable};
pub use types::Type;
