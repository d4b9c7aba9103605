//! Jasmin emission
//!
//! Walks an allocated IR class and prints Jasmin assembly. Every emitted
//! instruction goes through a stack tracker, so the `.limit stack` of each
//! method is the exact peak height of its linear instruction sequence.

use super::insn::{ArrayKind, Insn, InvokeKind, SlotKind, StackTracker};
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    Call, CallKind, Condition, FieldRef, IrClass, IrInstr, IrMethod, IrType, Operand, Rvalue,
    UnaryOp, VarKey,
};
use crate::types::ImportResolver;

const INDENT: &str = "   ";

pub struct JasminEmitter<'a> {
    class: &'a IrClass,
    resolver: ImportResolver<'a>,
}

impl<'a> JasminEmitter<'a> {
    pub fn new(class: &'a IrClass) -> Self {
        Self {
            class,
            resolver: ImportResolver::new(&class.imports),
        }
    }

    pub fn emit(&self) -> CompileResult<String> {
        let superclass = self.resolver.superclass(self.class.superclass.as_deref());
        let mut out = String::new();

        out.push_str(&format!(".class public {}\n", self.class.name));
        out.push_str(&format!(".super {}\n", superclass));
        if !self.class.fields.is_empty() {
            out.push('\n');
        }
        for field in &self.class.fields {
            let access = field
                .access
                .keyword()
                .map(|kw| format!("{} ", kw))
                .unwrap_or_default();
            let desc = self.resolver.descriptor(&field.ty)?;
            out.push_str(&format!(".field {}{} {}\n", access, field.name, desc));
        }

        out.push('\n');
        out.push_str(&Self::default_constructor(&superclass));

        for method in &self.class.methods {
            out.push('\n');
            out.push_str(&self.emit_method(method)?);
        }
        Ok(out)
    }

    /// No-argument constructor forwarding to the superclass
    fn default_constructor(superclass: &str) -> String {
        let mut out = String::from(".method public <init>()V\n");
        out.push_str(&format!("{}aload_0\n", INDENT));
        out.push_str(&format!("{}invokespecial {}/<init>()V\n", INDENT, superclass));
        out.push_str(&format!("{}return\n", INDENT));
        out.push_str(".end method\n");
        out
    }

    pub fn emit_method(&self, method: &IrMethod) -> CompileResult<String> {
        let mut body = MethodEmitter {
            resolver: self.resolver,
            class_name: &self.class.name,
            method,
            insns: Vec::new(),
            stack: StackTracker::new(),
        };
        for instr in &method.instructions {
            body.emit_instr(instr)?;
        }
        if method.return_type.is_void() && !method.ends_with_return() {
            body.push(Insn::Return(None))?;
        }
        if body.stack.current() != 0 {
            return Err(CompileError::invalid_ir(
                &method.name,
                format!("stack height {} at end of method", body.stack.current()),
            ));
        }

        log::debug!(
            "emitted {}.{}: stack {}, locals {}",
            self.class.name,
            method.name,
            body.stack.max(),
            method.locals_limit
        );

        let params: Vec<IrType> = method.params.iter().map(|p| p.ty.clone()).collect();
        let desc = self
            .resolver
            .method_descriptor(&params, &method.return_type)?;

        let mut modifiers = String::new();
        if let Some(kw) = method.access.keyword() {
            modifiers.push_str(kw);
            modifiers.push(' ');
        }
        if method.is_static {
            modifiers.push_str("static ");
        }
        if method.is_varargs {
            modifiers.push_str("varargs ");
        }

        let mut out = format!(".method {}{}{}\n", modifiers, method.name, desc);
        out.push_str(&format!("{}.limit stack {}\n", INDENT, body.stack.max()));
        out.push_str(&format!("{}.limit locals {}\n", INDENT, method.locals_limit));
        for insn in &body.insns {
            if insn.is_label() {
                out.push_str(&format!("{}\n", insn));
            } else {
                out.push_str(&format!("{}{}\n", INDENT, insn));
            }
        }
        out.push_str(".end method\n");
        Ok(out)
    }
}

/// Instruction selection for one method
struct MethodEmitter<'a> {
    resolver: ImportResolver<'a>,
    class_name: &'a str,
    method: &'a IrMethod,
    insns: Vec<Insn>,
    stack: StackTracker,
}

impl MethodEmitter<'_> {
    fn push(&mut self, insn: Insn) -> CompileResult<()> {
        if !self.stack.apply(insn.stack_delta()) {
            return Err(CompileError::StackUnderflow {
                method: self.method.name.clone(),
            });
        }
        self.insns.push(insn);
        Ok(())
    }

    fn register(&self, key: &VarKey) -> CompileResult<u16> {
        self.method
            .register_of(key)
            .ok_or_else(|| CompileError::MissingRegister {
                name: key.to_string(),
                method: self.method.name.clone(),
            })
    }

    fn emit_instr(&mut self, instr: &IrInstr) -> CompileResult<()> {
        match instr {
            IrInstr::Assign { dest, value } => self.store(dest, value),
            IrInstr::Expr(value) => {
                self.emit_rvalue(value)?;
                // Unused results are dropped right away
                if !value.ty().is_void() {
                    self.push(Insn::Pop)?;
                }
                Ok(())
            }
            IrInstr::PutField {
                object,
                field,
                value,
            } => {
                self.load(object)?;
                self.load(value)?;
                let (owner, name, desc) = self.field_ref(field)?;
                self.push(Insn::PutField { owner, name, desc })
            }
            IrInstr::Goto(label) => self.push(Insn::Goto(label.clone())),
            IrInstr::Branch { cond, target } => match cond {
                Condition::Operand(op) => {
                    self.load(op)?;
                    self.push(Insn::Ifne(target.clone()))
                }
                Condition::Compare { op, left, right } => {
                    self.load(left)?;
                    self.load(right)?;
                    self.push(Insn::IfCmp {
                        op: *op,
                        reference: left.ty().is_reference(),
                        target: target.clone(),
                    })
                }
            },
            IrInstr::Label(label) => self.push(Insn::Label(label.clone())),
            IrInstr::Return { value, ty } => match value {
                Some(v) => {
                    self.load(v)?;
                    self.push(Insn::Return(Some(SlotKind::of(ty))))
                }
                None => self.push(Insn::Return(None)),
            },
        }
    }

    /// Push the value of `op`
    fn load(&mut self, op: &Operand) -> CompileResult<()> {
        match op {
            Operand::Literal { value, .. } => self.push(Insn::Push(*value)),
            Operand::Variable { ty, .. } | Operand::Temp { ty, .. } => {
                let key = op
                    .key()
                    .ok_or_else(|| CompileError::internal("storage operand without a key"))?;
                let slot = self.register(&key)?;
                self.push(Insn::Load(SlotKind::of(ty), slot))
            }
            Operand::This(_) => {
                let slot = self.register(&VarKey::This)?;
                self.push(Insn::Load(SlotKind::Ref, slot))
            }
            Operand::Element { array, index, ty } => {
                self.load(array)?;
                self.load(index)?;
                self.push(Insn::ArrayLoad(ArrayKind::of(ty)))
            }
            Operand::ClassRef(name) => Err(CompileError::internal(format!(
                "class reference {} used as a value",
                name
            ))),
        }
    }

    fn store(&mut self, dest: &Operand, value: &Rvalue) -> CompileResult<()> {
        match dest {
            Operand::Element { array, index, ty } => {
                self.load(array)?;
                self.load(index)?;
                self.emit_rvalue(value)?;
                self.push(Insn::ArrayStore(ArrayKind::of(ty)))
            }
            Operand::Variable { ty, .. } | Operand::Temp { ty, .. } => {
                let key = dest
                    .key()
                    .ok_or_else(|| CompileError::internal("storage operand without a key"))?;
                let slot = self.register(&key)?;
                self.emit_rvalue(value)?;
                self.push(Insn::Store(SlotKind::of(ty), slot))
            }
            other => Err(CompileError::invalid_ir(
                &self.method.name,
                format!("cannot assign to {}", other),
            )),
        }
    }

    /// Push the value `value` produces
    fn emit_rvalue(&mut self, value: &Rvalue) -> CompileResult<()> {
        match value {
            Rvalue::Operand(op) => self.load(op),
            Rvalue::Binary { op, left, right } => {
                self.load(left)?;
                self.load(right)?;
                self.push(Insn::Arith(*op))
            }
            Rvalue::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                self.load(operand)?;
                self.push(Insn::Push(1))?;
                self.push(Insn::Ixor)
            }
            Rvalue::GetField { object, field } => {
                self.load(object)?;
                let (owner, name, desc) = self.field_ref(field)?;
                self.push(Insn::GetField { owner, name, desc })
            }
            Rvalue::Call(call) => self.emit_call(call),
            Rvalue::NewArray { elem, len } => {
                self.load(len)?;
                let insn = match elem {
                    IrType::Int32 => Insn::NewArray("int"),
                    IrType::Boolean => Insn::NewArray("boolean"),
                    IrType::String => Insn::ANewArray(self.resolver.qualify("String")),
                    IrType::Class(name) => Insn::ANewArray(self.resolver.qualify(name)),
                    IrType::Array(_) => Insn::ANewArray(self.resolver.descriptor(elem)?),
                    IrType::Void | IrType::This(_) => {
                        return Err(CompileError::UnresolvedDescriptor {
                            ty: elem.to_string(),
                        })
                    }
                };
                self.push(insn)
            }
            Rvalue::ArrayLength(array) => {
                self.load(array)?;
                self.push(Insn::ArrayLength)
            }
        }
    }

    fn emit_call(&mut self, call: &Call) -> CompileResult<()> {
        let owner = match &call.target {
            Operand::ClassRef(name) => self.resolver.qualify(name),
            target => {
                let ty = target.ty();
                let class = ty.owner_class().ok_or_else(|| CompileError::NonObjectReceiver {
                    method: call.method.clone(),
                    ty: ty.to_string(),
                })?;
                self.resolver.qualify(class)
            }
        };

        let kind = match call.kind {
            // The reference stays on the stack for the constructor call
            CallKind::New => {
                self.push(Insn::New(owner))?;
                return self.push(Insn::Dup);
            }
            // Consumes the reference duplicated by `new`
            CallKind::Special => InvokeKind::Special,
            CallKind::Virtual => {
                self.load(&call.target)?;
                InvokeKind::Virtual
            }
            CallKind::Static => InvokeKind::Static,
        };

        for arg in &call.args {
            self.load(arg)?;
        }
        let arg_types: Vec<IrType> = call.args.iter().map(Operand::ty).collect();
        let desc = self.resolver.method_descriptor(&arg_types, &call.return_ty)?;
        self.push(Insn::Invoke {
            kind,
            owner,
            name: call.method.clone(),
            desc,
            args: call.args.len(),
            returns_value: !call.return_ty.is_void(),
        })
    }

    fn field_ref(&self, field: &FieldRef) -> CompileResult<(String, String, String)> {
        Ok((
            self.resolver.qualify(self.class_name),
            field.name.clone(),
            self.resolver.descriptor(&field.ty)?,
        ))
    }
}
