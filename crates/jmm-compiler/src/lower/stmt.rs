//! Statement Lowering

use super::{IfLabels, Lowerer, LoweringContext, MethodContext};
use crate::error::{CompileError, CompileResult};
use crate::ir::{Condition, FieldRef, IrInstr, IrType, Label, Operand, Rvalue};
use crate::types::ir_type;
use jmm_ast::{Expr, ExprKind, Stmt};

impl<'a> Lowerer<'a> {
    /// Lower a statement, appending its code to `out`
    pub fn lower_stmt(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        stmt: &Stmt,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        log::trace!("lowering {} statement in {}", stmt.kind_name(), method.name);

        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.lower_stmt(ctx, method, s, out)?;
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.lower_if(ctx, method, cond, then_branch, else_branch, out),
            Stmt::While { cond, body } => self.lower_while(ctx, method, cond, body, out),
            Stmt::Expr(expr) => self.lower_expr_stmt(ctx, method, expr, out),
            Stmt::Assign { target, value } => self.lower_assign(ctx, method, target, value, out),
            Stmt::ArrayAssign {
                target,
                index,
                value,
            } => self.lower_array_assign(ctx, method, target, index, value, out),
            Stmt::Return(value) => self.lower_return(ctx, method, value.as_ref(), out),
        }
    }

    fn lower_expr_stmt(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        expr: &Expr,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        let mut inner = expr;
        while let ExprKind::Paren(e) = &inner.kind {
            inner = e;
        }
        // A bare call gets no destination temp
        if let ExprKind::Call { .. } = inner.kind {
            let (_, code) = self.lower_call(ctx, method, inner, true)?;
            out.extend(code);
        } else {
            out.extend(self.lower_expr(ctx, method, inner)?.code);
        }
        Ok(())
    }

    fn lower_assign(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        target: &str,
        value: &Expr,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        if let Some(ty) = self.local_type(method, target) {
            let dest = Operand::variable(target, ty);
            // Arithmetic stores straight into the target
            if let ExprKind::Binary { op, lhs, rhs } = &value.kind {
                if let Some(arith) = Self::arith_op(*op) {
                    let left = self.lower_expr(ctx, method, lhs)?;
                    let right = self.lower_expr(ctx, method, rhs)?;
                    out.extend(left.code);
                    out.extend(right.code);
                    out.push(IrInstr::Assign {
                        dest,
                        value: Rvalue::Binary {
                            op: arith,
                            left: left.value,
                            right: right.value,
                        },
                    });
                    return Ok(());
                }
            }
            let rhs = self.lower_expr(ctx, method, value)?;
            out.extend(rhs.code);
            out.push(IrInstr::Assign {
                dest,
                value: Rvalue::Operand(rhs.value),
            });
            return Ok(());
        }

        if self.is_field(method, target) {
            let field_ty = self
                .table
                .field(target)
                .map(|f| ir_type(&f.ty))
                .ok_or_else(|| self.unknown_variable(method, target))?;
            let rhs = self.lower_expr(ctx, method, value)?;
            out.extend(rhs.code);
            out.push(IrInstr::PutField {
                object: self.this_value(),
                field: FieldRef::new(target, field_ty),
                value: rhs.value,
            });
            return Ok(());
        }

        Err(self.unknown_variable(method, target))
    }

    fn lower_array_assign(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        target: &str,
        index: &Expr,
        value: &Expr,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        let array = self.lower_name(ctx, method, target)?;
        let elem = array
            .value
            .ty()
            .element()
            .cloned()
            .ok_or_else(|| CompileError::internal(format!("'{}' is not an array", target)))?;
        let index = self.lower_expr(ctx, method, index)?;
        let value = self.lower_expr(ctx, method, value)?;

        out.extend(array.code);
        out.extend(index.code);
        out.extend(value.code);
        out.push(IrInstr::Assign {
            dest: Operand::element(array.value, index.value, elem),
            value: Rvalue::Operand(value.value),
        });
        Ok(())
    }

    /// `cond; if cond goto then; else; goto end; then: then-block; end:`
    fn lower_if(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: &Stmt,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        let labels = IfLabels::new(ctx);
        let cond = self.lower_expr(ctx, method, cond)?;

        out.extend(cond.code);
        out.push(IrInstr::Branch {
            cond: Condition::Operand(cond.value),
            target: labels.then.clone(),
        });
        self.lower_stmt(ctx, method, else_branch, out)?;
        out.push(IrInstr::Goto(labels.end.clone()));
        out.push(IrInstr::Label(labels.then));
        self.lower_stmt(ctx, method, then_branch, out)?;
        out.push(IrInstr::Label(labels.end));
        Ok(())
    }

    /// `goto cond; body: body; cond: cond; if cond goto body`
    fn lower_while(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        cond: &Expr,
        body: &Stmt,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        let suffix = ctx.fresh_label_suffix();
        let cond_label = Label::new("while_cond", suffix);
        let body_label = Label::new("while_body", suffix);

        out.push(IrInstr::Goto(cond_label.clone()));
        out.push(IrInstr::Label(body_label.clone()));
        self.lower_stmt(ctx, method, body, out)?;
        out.push(IrInstr::Label(cond_label));

        let cond = self.lower_expr(ctx, method, cond)?;
        out.extend(cond.code);
        out.push(IrInstr::Branch {
            cond: Condition::Operand(cond.value),
            target: body_label,
        });
        Ok(())
    }

    fn lower_return(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        value: Option<&Expr>,
        out: &mut Vec<IrInstr>,
    ) -> CompileResult<()> {
        match value {
            Some(expr) => {
                let result = self.lower_expr(ctx, method, expr)?;
                out.extend(result.code);
                out.push(IrInstr::Return {
                    value: Some(result.value),
                    ty: method.return_type.clone(),
                });
            }
            None if method.return_type.is_void() => out.push(IrInstr::Return {
                value: None,
                ty: IrType::Void,
            }),
            None => {
                return Err(CompileError::EmptyReturn {
                    method: method.name.to_string(),
                })
            }
        }
        Ok(())
    }

    pub(super) fn unknown_variable(&self, method: &MethodContext<'_>, name: &str) -> CompileError {
        CompileError::UnknownVariable {
            name: name.to_string(),
            method: method.name.to_string(),
        }
    }
}
