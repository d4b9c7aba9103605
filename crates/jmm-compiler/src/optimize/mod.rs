//! AST Optimization Passes
//!
//! Optional tree-to-tree passes run before lowering. Each pass returns a new
//! tree plus a flag telling whether anything changed; the optimizer alternates
//! them until neither does.

mod constant_fold;
mod constant_prop;

pub use constant_fold::ConstantFolder;
pub use constant_prop::ConstantPropagator;

use jmm_ast::{Expr, ExprKind, Program, SymbolTable};

/// Runs propagation and folding to a fixed point
pub struct Optimizer<'a> {
    table: &'a SymbolTable,
    max_rounds: u32,
}

impl<'a> Optimizer<'a> {
    pub fn new(table: &'a SymbolTable, max_rounds: u32) -> Self {
        Self { table, max_rounds }
    }

    pub fn optimize(&self, program: &Program) -> Program {
        let folder = ConstantFolder::new();
        let propagator = ConstantPropagator::new(self.table);

        let mut current = program.clone();
        for round in 1..=self.max_rounds {
            let (propagated, did_propagate) = propagator.propagate_program(&current);
            let (folded, did_fold) = folder.fold_program(&propagated);
            current = folded;
            log::debug!(
                "optimize round {}: propagated={}, folded={}",
                round,
                did_propagate,
                did_fold
            );
            if !did_propagate && !did_fold {
                break;
            }
        }
        current
    }
}

/// Rebuild `expr` with every direct child replaced by `f(child)`
pub(crate) fn map_children(expr: &Expr, f: &mut dyn FnMut(&Expr) -> Expr) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Paren(inner) => ExprKind::Paren(Box::new(f(inner))),
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: Box::new(f(lhs)),
            rhs: Box::new(f(rhs)),
        },
        ExprKind::Not(inner) => ExprKind::Not(Box::new(f(inner))),
        ExprKind::Index { array, index } => ExprKind::Index {
            array: Box::new(f(array)),
            index: Box::new(f(index)),
        },
        ExprKind::Length(array) => ExprKind::Length(Box::new(f(array))),
        ExprKind::Call {
            receiver,
            method,
            args,
        } => ExprKind::Call {
            receiver: Box::new(f(receiver)),
            method: method.clone(),
            args: args.iter().map(|a| f(a)).collect(),
        },
        ExprKind::NewArray { elem, len } => ExprKind::NewArray {
            elem: elem.clone(),
            len: Box::new(f(len)),
        },
        ExprKind::ArrayLit { elem, items } => ExprKind::ArrayLit {
            elem: elem.clone(),
            items: items.iter().map(|i| f(i)).collect(),
        },
        leaf @ (ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Var(_)
        | ExprKind::This
        | ExprKind::NewObject(_)) => leaf.clone(),
    };
    Expr::new(kind, expr.ty.clone())
}
