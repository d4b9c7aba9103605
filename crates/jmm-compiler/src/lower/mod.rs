//! AST to IR Lowering
//!
//! Converts the typed AST into the IR. Statement and expression lowering are
//! mutually recursive; both read the symbol table and take the per-compilation
//! counters and the current method explicitly.

mod expr;
mod stmt;

pub use expr::ExprResult;

use crate::error::{CompileError, CompileResult};
use crate::ir::{IrClass, IrField, IrInstr, IrMethod, IrParam, IrType, Label, Operand, TempId};
use crate::types::ir_type;
use jmm_ast::{MethodDecl, MethodSignature, Program, SymbolTable};

/// Counters shared by every method of one compilation
///
/// Temporaries and labels are never reused, even across methods.
#[derive(Debug, Default)]
pub struct LoweringContext {
    next_temp: u32,
    next_label: u32,
}

impl LoweringContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh temporary of type `ty`
    pub fn fresh_temp(&mut self, ty: IrType) -> Operand {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        Operand::Temp { id, ty }
    }

    /// Fresh suffix for a group of related labels
    pub fn fresh_label_suffix(&mut self) -> u32 {
        let suffix = self.next_label;
        self.next_label += 1;
        suffix
    }

    pub fn temps_allocated(&self) -> u32 {
        self.next_temp
    }
}

/// The method being lowered
#[derive(Debug, Clone)]
pub struct MethodContext<'m> {
    pub name: &'m str,
    pub is_static: bool,
    pub is_varargs: bool,
    pub return_type: IrType,
    pub signature: &'m MethodSignature,
}

/// Labels of one if/else or materialization
struct IfLabels {
    then: Label,
    end: Label,
}

impl IfLabels {
    fn new(ctx: &mut LoweringContext) -> Self {
        let suffix = ctx.fresh_label_suffix();
        Self {
            then: Label::new("if_then", suffix),
            end: Label::new("if_end", suffix),
        }
    }
}

/// AST to IR lowerer for one class
pub struct Lowerer<'a> {
    table: &'a SymbolTable,
}

impl<'a> Lowerer<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    /// Lower the class of `program`
    pub fn lower_program(
        &self,
        ctx: &mut LoweringContext,
        program: &Program,
    ) -> CompileResult<IrClass> {
        let decl = &program.class;
        let mut class = IrClass::new(decl.name.clone());
        class.superclass = decl.superclass.clone();
        class.imports = program.imports.iter().map(|i| i.qualified_name()).collect();
        class.fields = decl
            .fields
            .iter()
            .map(|f| IrField {
                name: f.name.clone(),
                ty: ir_type(&f.ty),
                access: jmm_ast::Access::Public,
            })
            .collect();

        for method in &decl.methods {
            class.methods.push(self.lower_method(ctx, method)?);
        }
        Ok(class)
    }

    pub fn lower_method(
        &self,
        ctx: &mut LoweringContext,
        decl: &MethodDecl,
    ) -> CompileResult<IrMethod> {
        log::debug!("lowering method {}.{}", self.table.class_name, decl.name);

        let signature = self
            .table
            .method(&decl.name)
            .ok_or_else(|| CompileError::UnknownMethod {
                name: decl.name.clone(),
            })?;
        let method_ctx = MethodContext {
            name: &decl.name,
            is_static: decl.is_static,
            is_varargs: decl.is_varargs(),
            return_type: ir_type(&decl.return_type),
            signature,
        };

        let mut method = IrMethod::new(decl.name.clone(), method_ctx.return_type.clone());
        method.access = decl.access;
        method.is_static = decl.is_static;
        method.is_varargs = method_ctx.is_varargs;
        method.params = decl
            .params
            .iter()
            .map(|p| IrParam::new(p.name.clone(), ir_type(&p.ty)))
            .collect();
        method.locals = decl
            .locals
            .iter()
            .map(|l| IrParam::new(l.name.clone(), ir_type(&l.ty)))
            .collect();

        for stmt in &decl.body {
            self.lower_stmt(ctx, &method_ctx, stmt, &mut method.instructions)?;
        }

        // Falling off the end of a void body returns
        if method_ctx.return_type.is_void() && !method.ends_with_return() {
            method.push(IrInstr::Return {
                value: None,
                ty: IrType::Void,
            });
        }

        Ok(method)
    }

    /// Declared type of a local or parameter of the current method
    fn local_type(&self, method: &MethodContext<'_>, name: &str) -> Option<IrType> {
        let sig = method.signature;
        sig.local(name)
            .map(|l| ir_type(&l.ty))
            .or_else(|| sig.param(name).map(|p| ir_type(&p.ty)))
    }

    fn is_field(&self, method: &MethodContext<'_>, name: &str) -> bool {
        self.table.is_field(method.name, name)
    }

    fn this_value(&self) -> Operand {
        Operand::This(IrType::Class(self.table.class_name.clone()))
    }

    fn this_receiver(&self) -> Operand {
        Operand::This(IrType::This(self.table.class_name.clone()))
    }
}

/// Lower a whole program with fresh counters
pub fn lower_program(program: &Program, table: &SymbolTable) -> CompileResult<IrClass> {
    let mut ctx = LoweringContext::new();
    Lowerer::new(table).lower_program(&mut ctx, program)
}
