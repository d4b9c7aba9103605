//! Expression Lowering
//!
//! Every expression lowers to an operand plus the code that must run once
//! before the operand is read. Booleans produced by relations and logical
//! operators are materialized through branches.

use super::{IfLabels, Lowerer, LoweringContext, MethodContext};
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    ArithOp, Call, CallKind, Condition, FieldRef, IrInstr, IrType, Operand, RelOp, Rvalue,
    UnaryOp,
};
use crate::types::ir_type;
use jmm_ast::{BinaryOp, Expr, ExprKind, MethodSignature, Type};

/// Lowered expression: read `value` after running `code`
#[derive(Debug, Clone)]
pub struct ExprResult {
    pub value: Operand,
    pub code: Vec<IrInstr>,
}

impl ExprResult {
    fn operand(value: Operand) -> Self {
        Self {
            value,
            code: Vec::new(),
        }
    }

    fn with_code(value: Operand, code: Vec<IrInstr>) -> Self {
        Self { value, code }
    }
}

impl<'a> Lowerer<'a> {
    pub fn lower_expr(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        expr: &Expr,
    ) -> CompileResult<ExprResult> {
        match &expr.kind {
            ExprKind::Int(v) => Ok(ExprResult::operand(Operand::int(*v))),
            ExprKind::Bool(b) => Ok(ExprResult::operand(Operand::bool(*b))),
            ExprKind::Var(name) => self.lower_name(ctx, method, name),
            ExprKind::This => Ok(ExprResult::operand(self.this_value())),
            ExprKind::Paren(inner) => self.lower_expr(ctx, method, inner),
            ExprKind::Binary { op, lhs, rhs } => {
                if let Some(arith) = Self::arith_op(*op) {
                    self.lower_arith(ctx, method, arith, lhs, rhs)
                } else if let Some(rel) = Self::rel_op(*op) {
                    self.lower_relation(ctx, method, rel, lhs, rhs)
                } else if *op == BinaryOp::And {
                    self.lower_and(ctx, method, lhs, rhs)
                } else {
                    self.lower_or(ctx, method, lhs, rhs)
                }
            }
            ExprKind::Not(operand) => {
                let inner = self.lower_expr(ctx, method, operand)?;
                let result = ctx.fresh_temp(IrType::Boolean);
                let mut code = inner.code;
                code.push(IrInstr::Assign {
                    dest: result.clone(),
                    value: Rvalue::Unary {
                        op: UnaryOp::Not,
                        operand: inner.value,
                    },
                });
                Ok(ExprResult::with_code(result, code))
            }
            ExprKind::Index { array, index } => self.lower_index(ctx, method, array, index),
            ExprKind::Length(array) => {
                let array = self.lower_expr(ctx, method, array)?;
                let result = ctx.fresh_temp(IrType::Int32);
                let mut code = array.code;
                code.push(IrInstr::Assign {
                    dest: result.clone(),
                    value: Rvalue::ArrayLength(array.value),
                });
                Ok(ExprResult::with_code(result, code))
            }
            ExprKind::Call { method: name, .. } => {
                let (value, code) = self.lower_call(ctx, method, expr, false)?;
                let value = value.ok_or_else(|| {
                    CompileError::internal(format!("void call to '{}' used as a value", name))
                })?;
                Ok(ExprResult::with_code(value, code))
            }
            ExprKind::NewObject(class) => Ok(self.lower_new_object(ctx, class)),
            ExprKind::NewArray { elem, len } => {
                let len = self.lower_expr(ctx, method, len)?;
                let elem = ir_type(elem);
                let result = ctx.fresh_temp(IrType::array_of(elem.clone()));
                let mut code = len.code;
                code.push(IrInstr::Assign {
                    dest: result.clone(),
                    value: Rvalue::NewArray {
                        elem,
                        len: len.value,
                    },
                });
                Ok(ExprResult::with_code(result, code))
            }
            ExprKind::ArrayLit { elem, items } => {
                self.lower_array_items(ctx, method, &ir_type(elem), items.iter())
            }
        }
    }

    /// Local or parameter, field read, or bare class reference
    pub(super) fn lower_name(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        name: &str,
    ) -> CompileResult<ExprResult> {
        if let Some(ty) = self.local_type(method, name) {
            return Ok(ExprResult::operand(Operand::variable(name, ty)));
        }

        if self.is_field(method, name) {
            let ty = self
                .table
                .field(name)
                .map(|f| ir_type(&f.ty))
                .ok_or_else(|| self.unknown_variable(method, name))?;
            let result = ctx.fresh_temp(ty.clone());
            let code = vec![IrInstr::Assign {
                dest: result.clone(),
                value: Rvalue::GetField {
                    object: self.this_value(),
                    field: FieldRef::new(name, ty),
                },
            }];
            return Ok(ExprResult::with_code(result, code));
        }

        if self.is_class_ref(name) {
            return Ok(ExprResult::operand(Operand::ClassRef(name.to_string())));
        }

        Err(self.unknown_variable(method, name))
    }

    fn lower_arith(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        op: ArithOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<ExprResult> {
        let left = self.lower_expr(ctx, method, lhs)?;
        let right = self.lower_expr(ctx, method, rhs)?;
        let result = ctx.fresh_temp(IrType::Int32);

        let mut code = left.code;
        code.extend(right.code);
        code.push(IrInstr::Assign {
            dest: result.clone(),
            value: Rvalue::Binary {
                op,
                left: left.value,
                right: right.value,
            },
        });
        Ok(ExprResult::with_code(result, code))
    }

    /// `if (l op r) goto then; t := 0; goto end; then: t := 1; end:`
    fn lower_relation(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        op: RelOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<ExprResult> {
        let left = self.lower_expr(ctx, method, lhs)?;
        let right = self.lower_expr(ctx, method, rhs)?;
        let labels = IfLabels::new(ctx);
        let result = ctx.fresh_temp(IrType::Boolean);

        let mut code = left.code;
        code.extend(right.code);
        code.push(IrInstr::Branch {
            cond: Condition::Compare {
                op,
                left: left.value,
                right: right.value,
            },
            target: labels.then.clone(),
        });
        code.push(Self::assign(&result, Operand::bool(false)));
        code.push(IrInstr::Goto(labels.end.clone()));
        code.push(IrInstr::Label(labels.then));
        code.push(Self::assign(&result, Operand::bool(true)));
        code.push(IrInstr::Label(labels.end));
        Ok(ExprResult::with_code(result, code))
    }

    /// `l; if l goto then; t := 0; goto end; then: r; t := r; end:`
    fn lower_and(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<ExprResult> {
        let left = self.lower_expr(ctx, method, lhs)?;
        let right = self.lower_expr(ctx, method, rhs)?;
        let labels = IfLabels::new(ctx);
        let result = ctx.fresh_temp(IrType::Boolean);

        let mut code = left.code;
        code.push(IrInstr::Branch {
            cond: Condition::Operand(left.value),
            target: labels.then.clone(),
        });
        code.push(Self::assign(&result, Operand::bool(false)));
        code.push(IrInstr::Goto(labels.end.clone()));
        code.push(IrInstr::Label(labels.then));
        code.extend(right.code);
        code.push(Self::assign(&result, right.value));
        code.push(IrInstr::Label(labels.end));
        Ok(ExprResult::with_code(result, code))
    }

    /// `l; if l goto then; r; t := r; goto end; then: t := 1; end:`
    fn lower_or(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        lhs: &Expr,
        rhs: &Expr,
    ) -> CompileResult<ExprResult> {
        let left = self.lower_expr(ctx, method, lhs)?;
        let right = self.lower_expr(ctx, method, rhs)?;
        let labels = IfLabels::new(ctx);
        let result = ctx.fresh_temp(IrType::Boolean);

        let mut code = left.code;
        code.push(IrInstr::Branch {
            cond: Condition::Operand(left.value),
            target: labels.then.clone(),
        });
        code.extend(right.code);
        code.push(Self::assign(&result, right.value));
        code.push(IrInstr::Goto(labels.end.clone()));
        code.push(IrInstr::Label(labels.then));
        code.push(Self::assign(&result, Operand::bool(true)));
        code.push(IrInstr::Label(labels.end));
        Ok(ExprResult::with_code(result, code))
    }

    fn lower_index(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        array: &Expr,
        index: &Expr,
    ) -> CompileResult<ExprResult> {
        let array = self.lower_expr(ctx, method, array)?;
        let index = self.lower_expr(ctx, method, index)?;
        let elem = array
            .value
            .ty()
            .element()
            .cloned()
            .ok_or_else(|| CompileError::internal(format!("indexing non-array {}", array.value)))?;
        let result = ctx.fresh_temp(elem.clone());

        let mut code = array.code;
        code.extend(index.code);
        code.push(Self::assign(
            &result,
            Operand::element(array.value, index.value, elem),
        ));
        Ok(ExprResult::with_code(result, code))
    }

    /// Allocate an array holding `items` in order
    fn lower_array_items<'e>(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        elem: &IrType,
        items: impl ExactSizeIterator<Item = &'e Expr>,
    ) -> CompileResult<ExprResult> {
        let len = Self::literal_len(items.len())?;
        let result = ctx.fresh_temp(IrType::array_of(elem.clone()));
        let mut code = vec![IrInstr::Assign {
            dest: result.clone(),
            value: Rvalue::NewArray {
                elem: elem.clone(),
                len: Operand::int(len),
            },
        }];
        for (i, item) in items.enumerate() {
            let item = self.lower_expr(ctx, method, item)?;
            code.extend(item.code);
            let slot = Operand::element(result.clone(), Operand::int(Self::literal_len(i)?), elem.clone());
            code.push(IrInstr::Assign {
                dest: slot,
                value: Rvalue::Operand(item.value),
            });
        }
        Ok(ExprResult::with_code(result, code))
    }

    /// `t := new(C); invokespecial(t, "<init>")`
    fn lower_new_object(&self, ctx: &mut LoweringContext, class: &str) -> ExprResult {
        let class_ty = IrType::Class(class.to_string());
        let result = ctx.fresh_temp(class_ty.clone());
        let code = vec![
            IrInstr::Assign {
                dest: result.clone(),
                value: Rvalue::Call(Call {
                    kind: CallKind::New,
                    target: Operand::ClassRef(class.to_string()),
                    method: "<init>".to_string(),
                    args: Vec::new(),
                    return_ty: class_ty,
                }),
            },
            IrInstr::Expr(Rvalue::Call(Call {
                kind: CallKind::Special,
                target: result.clone(),
                method: "<init>".to_string(),
                args: Vec::new(),
                return_ty: IrType::Void,
            })),
        ];
        ExprResult::with_code(result, code)
    }

    /// Lower a call expression
    ///
    /// With `discard` the call is a bare statement and gets no destination;
    /// void calls never do. The returned operand is `None` in both cases.
    pub(super) fn lower_call(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        expr: &Expr,
        discard: bool,
    ) -> CompileResult<(Option<Operand>, Vec<IrInstr>)> {
        let ExprKind::Call {
            receiver,
            method: name,
            args,
        } = &expr.kind
        else {
            return Err(CompileError::internal("call lowering on a non-call expression"));
        };

        let (target, kind, mut code) = self.lower_receiver(ctx, method, receiver, name)?;
        let own_class = target.ty().owner_class() == Some(self.table.class_name.as_str());
        let signature = if own_class { self.table.method(name) } else { None };
        let (args, arg_code) = self.lower_args(ctx, method, signature, args)?;
        code.extend(arg_code);

        let return_ty = ir_type(&expr.ty);
        let call = Rvalue::Call(Call {
            kind,
            target,
            method: name.clone(),
            args,
            return_ty: return_ty.clone(),
        });

        if discard || return_ty.is_void() {
            code.push(IrInstr::Expr(call));
            return Ok((None, code));
        }
        let result = ctx.fresh_temp(return_ty);
        code.push(IrInstr::Assign {
            dest: result.clone(),
            value: call,
        });
        Ok((Some(result), code))
    }

    /// Classify the receiver as a static class reference or an instance target
    fn lower_receiver(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        receiver: &Expr,
        callee: &str,
    ) -> CompileResult<(Operand, CallKind, Vec<IrInstr>)> {
        match &receiver.kind {
            ExprKind::Paren(inner) => self.lower_receiver(ctx, method, inner, callee),
            ExprKind::This => Ok((self.this_receiver(), CallKind::Virtual, Vec::new())),
            ExprKind::Var(name)
                if self.local_type(method, name).is_none()
                    && !self.is_field(method, name)
                    && self.is_class_ref(name) =>
            {
                Ok((Operand::ClassRef(name.clone()), CallKind::Static, Vec::new()))
            }
            _ => {
                let target = self.lower_expr(ctx, method, receiver)?;
                let ty = target.value.ty();
                if ty.owner_class().is_none() {
                    return Err(CompileError::NonObjectReceiver {
                        method: callee.to_string(),
                        ty: ty.to_string(),
                    });
                }
                Ok((target.value, CallKind::Virtual, target.code))
            }
        }
    }

    /// Lower call arguments left to right, packing loose varargs into an array
    fn lower_args(
        &self,
        ctx: &mut LoweringContext,
        method: &MethodContext<'_>,
        signature: Option<&MethodSignature>,
        args: &[Expr],
    ) -> CompileResult<(Vec<Operand>, Vec<IrInstr>)> {
        let mut operands = Vec::with_capacity(args.len());
        let mut code = Vec::new();

        let packed = signature.and_then(|sig| {
            let elem = sig.vararg_element()?;
            let slot = sig.params.last().map(|p| &p.ty)?;
            let passes_array =
                args.len() == sig.params.len() && args.last().map(|a| &a.ty) == Some(slot);
            (!passes_array).then(|| (sig.fixed_param_count().min(args.len()), ir_type(elem)))
        });

        let fixed = packed.as_ref().map_or(args.len(), |(fixed, _)| *fixed);
        for arg in &args[..fixed] {
            let arg = self.lower_expr(ctx, method, arg)?;
            code.extend(arg.code);
            operands.push(arg.value);
        }

        if let Some((fixed, elem)) = packed {
            let array = self.lower_array_items(ctx, method, &elem, args[fixed..].iter())?;
            code.extend(array.code);
            operands.push(array.value);
        }

        Ok((operands, code))
    }

    pub(super) fn arith_op(op: BinaryOp) -> Option<ArithOp> {
        match op {
            BinaryOp::Add => Some(ArithOp::Add),
            BinaryOp::Sub => Some(ArithOp::Sub),
            BinaryOp::Mul => Some(ArithOp::Mul),
            BinaryOp::Div => Some(ArithOp::Div),
            _ => None,
        }
    }

    fn rel_op(op: BinaryOp) -> Option<RelOp> {
        match op {
            BinaryOp::Lt => Some(RelOp::Lt),
            BinaryOp::Le => Some(RelOp::Le),
            BinaryOp::Gt => Some(RelOp::Gt),
            BinaryOp::Ge => Some(RelOp::Ge),
            BinaryOp::Eq => Some(RelOp::Eq),
            BinaryOp::Ne => Some(RelOp::Ne),
            _ => None,
        }
    }

    fn is_class_ref(&self, name: &str) -> bool {
        self.table.is_import(name) || name == self.table.class_name
    }

    fn assign(dest: &Operand, value: Operand) -> IrInstr {
        IrInstr::Assign {
            dest: dest.clone(),
            value: Rvalue::Operand(value),
        }
    }

    fn literal_len(len: usize) -> CompileResult<i32> {
        i32::try_from(len).map_err(|_| CompileError::internal("array literal too large"))
    }
}
