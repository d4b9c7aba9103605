//! Constant Folding
//!
//! Evaluates operators whose operands are all literals. Arithmetic wraps like
//! the target machine; divisions that would trap or overflow are left alone.

use super::map_children;
use jmm_ast::{BinaryOp, Expr, ExprKind, MethodDecl, Program, Stmt};

/// Constant folding pass
#[derive(Debug, Default)]
pub struct ConstantFolder;

impl ConstantFolder {
    pub fn new() -> Self {
        Self
    }

    /// Fold every method body; the flag is set if anything was folded
    pub fn fold_program(&self, program: &Program) -> (Program, bool) {
        let mut changed = false;
        let mut folded = program.clone();
        folded.class.methods = program
            .class
            .methods
            .iter()
            .map(|m| MethodDecl {
                body: m.body.iter().map(|s| self.fold_stmt(s, &mut changed)).collect(),
                ..m.clone()
            })
            .collect();
        (folded, changed)
    }

    fn fold_stmt(&self, stmt: &Stmt, changed: &mut bool) -> Stmt {
        match stmt {
            Stmt::Block(stmts) => {
                Stmt::Block(stmts.iter().map(|s| self.fold_stmt(s, changed)).collect())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => Stmt::if_else(
                self.fold_expr(cond, changed),
                self.fold_stmt(then_branch, changed),
                self.fold_stmt(else_branch, changed),
            ),
            Stmt::While { cond, body } => Stmt::while_loop(
                self.fold_expr(cond, changed),
                self.fold_stmt(body, changed),
            ),
            Stmt::Expr(expr) => Stmt::Expr(self.fold_expr(expr, changed)),
            Stmt::Assign { target, value } => {
                Stmt::assign(target.clone(), self.fold_expr(value, changed))
            }
            Stmt::ArrayAssign {
                target,
                index,
                value,
            } => Stmt::array_assign(
                target.clone(),
                self.fold_expr(index, changed),
                self.fold_expr(value, changed),
            ),
            Stmt::Return(value) => Stmt::Return(value.as_ref().map(|v| self.fold_expr(v, changed))),
        }
    }

    pub fn fold_expr(&self, expr: &Expr, changed: &mut bool) -> Expr {
        let expr = map_children(expr, &mut |child| self.fold_expr(child, changed));
        let folded = match &expr.kind {
            ExprKind::Paren(inner) if inner.is_literal() => Some(inner.as_ref().clone()),
            ExprKind::Not(inner) => match inner.kind {
                ExprKind::Bool(b) => Some(Expr::bool(!b)),
                _ => None,
            },
            ExprKind::Binary { op, lhs, rhs } => fold_binary(*op, lhs, rhs),
            _ => None,
        };
        match folded {
            Some(literal) => {
                *changed = true;
                literal
            }
            None => expr,
        }
    }
}

fn fold_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    match (&lhs.kind, &rhs.kind) {
        (ExprKind::Int(a), ExprKind::Int(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => Some(Expr::int(a.wrapping_add(b))),
                BinaryOp::Sub => Some(Expr::int(a.wrapping_sub(b))),
                BinaryOp::Mul => Some(Expr::int(a.wrapping_mul(b))),
                // None for division by zero and MIN / -1
                BinaryOp::Div => a.checked_div(b).map(Expr::int),
                BinaryOp::Lt => Some(Expr::bool(a < b)),
                BinaryOp::Le => Some(Expr::bool(a <= b)),
                BinaryOp::Gt => Some(Expr::bool(a > b)),
                BinaryOp::Ge => Some(Expr::bool(a >= b)),
                BinaryOp::Eq => Some(Expr::bool(a == b)),
                BinaryOp::Ne => Some(Expr::bool(a != b)),
                BinaryOp::And | BinaryOp::Or => None,
            }
        }
        (ExprKind::Bool(a), ExprKind::Bool(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::And => Some(Expr::bool(a && b)),
                BinaryOp::Or => Some(Expr::bool(a || b)),
                BinaryOp::Eq => Some(Expr::bool(a == b)),
                BinaryOp::Ne => Some(Expr::bool(a != b)),
                _ => None,
            }
        }
        _ => None,
    }
}
