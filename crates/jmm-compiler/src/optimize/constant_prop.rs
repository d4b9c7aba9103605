//! Constant Propagation
//!
//! Replaces reads of locals and parameters that hold a known literal along
//! straight-line code. Fields are never propagated. Assignments stay in
//! place.

use super::map_children;
use jmm_ast::{Expr, ExprKind, MethodDecl, Program, Stmt, SymbolTable};
use rustc_hash::{FxHashMap, FxHashSet};

type Env = FxHashMap<String, Expr>;

/// Constant propagation pass
pub struct ConstantPropagator<'a> {
    table: &'a SymbolTable,
}

impl<'a> ConstantPropagator<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    pub fn propagate_program(&self, program: &Program) -> (Program, bool) {
        let mut changed = false;
        let mut result = program.clone();
        result.class.methods = program
            .class
            .methods
            .iter()
            .map(|m| {
                let mut env = Env::default();
                MethodDecl {
                    body: m
                        .body
                        .iter()
                        .map(|s| self.propagate_stmt(&m.name, s, &mut env, &mut changed))
                        .collect(),
                    ..m.clone()
                }
            })
            .collect();
        (result, changed)
    }

    fn propagate_stmt(&self, method: &str, stmt: &Stmt, env: &mut Env, changed: &mut bool) -> Stmt {
        match stmt {
            Stmt::Block(stmts) => Stmt::Block(
                stmts
                    .iter()
                    .map(|s| self.propagate_stmt(method, s, env, changed))
                    .collect(),
            ),
            Stmt::Expr(expr) => Stmt::Expr(substitute(expr, env, changed)),
            Stmt::Return(value) => Stmt::Return(value.as_ref().map(|v| substitute(v, env, changed))),
            Stmt::Assign { target, value } => {
                let value = substitute(value, env, changed);
                if self.is_variable(method, target) {
                    if value.is_literal() {
                        env.insert(target.clone(), value.clone());
                    } else {
                        env.remove(target);
                    }
                }
                Stmt::assign(target.clone(), value)
            }
            Stmt::ArrayAssign {
                target,
                index,
                value,
            } => Stmt::array_assign(
                target.clone(),
                substitute(index, env, changed),
                substitute(value, env, changed),
            ),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut killed = FxHashSet::default();
                assigned_names(then_branch, &mut killed);
                assigned_names(else_branch, &mut killed);
                kill(env, &killed);

                let cond = substitute(cond, env, changed);
                let then_branch = self.propagate_stmt(method, then_branch, &mut env.clone(), changed);
                let else_branch = self.propagate_stmt(method, else_branch, &mut env.clone(), changed);
                kill(env, &killed);
                Stmt::if_else(cond, then_branch, else_branch)
            }
            Stmt::While { cond, body } => {
                let mut killed = FxHashSet::default();
                assigned_names(body, &mut killed);
                kill(env, &killed);

                let cond = substitute(cond, env, changed);
                let body = self.propagate_stmt(method, body, &mut env.clone(), changed);
                kill(env, &killed);
                Stmt::while_loop(cond, body)
            }
        }
    }

    /// Locals and parameters only; fields can change behind our back
    fn is_variable(&self, method: &str, name: &str) -> bool {
        self.table.is_local(method, name) || self.table.is_param(method, name)
    }
}

fn substitute(expr: &Expr, env: &Env, changed: &mut bool) -> Expr {
    if let ExprKind::Var(name) = &expr.kind {
        if let Some(literal) = env.get(name) {
            *changed = true;
            return literal.clone();
        }
        return expr.clone();
    }
    map_children(expr, &mut |child| substitute(child, env, changed))
}

fn assigned_names(stmt: &Stmt, out: &mut FxHashSet<String>) {
    match stmt {
        Stmt::Assign { target, .. } => {
            out.insert(target.clone());
        }
        Stmt::Block(stmts) => stmts.iter().for_each(|s| assigned_names(s, out)),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            assigned_names(then_branch, out);
            assigned_names(else_branch, out);
        }
        Stmt::While { body, .. } => assigned_names(body, out),
        Stmt::Expr(_) | Stmt::ArrayAssign { .. } | Stmt::Return(_) => {}
    }
}

fn kill(env: &mut Env, names: &FxHashSet<String>) {
    for name in names {
        env.remove(name);
    }
}
