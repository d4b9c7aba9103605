//! Register allocation
//!
//! Gives every name of a method its own local-variable slot: the receiver at
//! 0 for instance methods, then parameters, declared locals and temporaries
//! in order of first appearance. Slots are never shared.

use crate::error::{CompileError, CompileResult};
use crate::ir::{IrClass, IrMethod, IrType, Operand, VarDescriptor, VarKey, VarKind, VarTable};

pub fn allocate_registers(class: &mut IrClass) -> CompileResult<()> {
    let class_name = class.name.clone();
    for method in &mut class.methods {
        allocate_method(method, &class_name)?;
    }
    Ok(())
}

pub fn allocate_method(method: &mut IrMethod, class_name: &str) -> CompileResult<()> {
    let mut allocator = Allocator {
        method: &method.name,
        table: VarTable::new(),
        next: 0,
    };

    if !method.is_static {
        allocator.assign(VarKey::This, IrType::Class(class_name.to_string()), VarKind::Receiver)?;
    }
    for param in &method.params {
        allocator.assign(VarKey::Named(param.name.clone()), param.ty.clone(), VarKind::Param)?;
    }
    for local in &method.locals {
        allocator.assign(VarKey::Named(local.name.clone()), local.ty.clone(), VarKind::Local)?;
    }
    for instr in &method.instructions {
        for operand in instr.operands() {
            allocator.assign_temps(operand)?;
        }
    }

    let table = allocator.table;
    method.locals_limit = match table.max_register() {
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| CompileError::internal("too many local variables"))?,
        None => 0,
    };
    method.var_table = table;
    Ok(())
}

struct Allocator<'m> {
    method: &'m str,
    table: VarTable,
    next: u16,
}

impl Allocator<'_> {
    /// First assignment of a key wins
    fn assign(&mut self, key: VarKey, ty: IrType, kind: VarKind) -> CompileResult<()> {
        if self.table.contains(&key) {
            return Ok(());
        }
        let register = self.next;
        self.next = self
            .next
            .checked_add(1)
            .ok_or_else(|| CompileError::internal("too many local variables"))?;
        log::trace!("{}: {} -> slot {}", self.method, key, register);
        self.table.insert(key, VarDescriptor { register, ty, kind });
        Ok(())
    }

    fn assign_temps(&mut self, operand: &Operand) -> CompileResult<()> {
        match operand {
            Operand::Temp { id, ty } => self.assign(VarKey::Temp(*id), ty.clone(), VarKind::Temp),
            Operand::Element { array, index, .. } => {
                self.assign_temps(array)?;
                self.assign_temps(index)
            }
            _ => Ok(()),
        }
    }
}
