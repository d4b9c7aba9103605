//! IR verification
//!
//! Structural checks run after register allocation. Any failure is a backend
//! bug, reported as `CompileError::InvalidIr`.

use super::class::IrClass;
use super::instr::IrInstr;
use super::method::IrMethod;
use super::value::{Operand, VarKey};
use crate::error::{CompileError, CompileResult};
use rustc_hash::FxHashMap;

pub fn verify_class(class: &IrClass) -> CompileResult<()> {
    for method in &class.methods {
        verify_method(method)?;
    }
    Ok(())
}

pub fn verify_method(method: &IrMethod) -> CompileResult<()> {
    verify_labels(method)?;
    verify_registers(method)?;
    for instr in &method.instructions {
        for operand in instr.operands() {
            verify_operand(method, operand)?;
        }
    }
    Ok(())
}

fn verify_labels(method: &IrMethod) -> CompileResult<()> {
    let mut defined: FxHashMap<&str, usize> = FxHashMap::default();
    for instr in &method.instructions {
        if let IrInstr::Label(label) = instr {
            *defined.entry(label.as_str()).or_default() += 1;
        }
    }
    if let Some((label, _)) = defined.iter().find(|(_, &count)| count > 1) {
        return Err(CompileError::invalid_ir(
            &method.name,
            format!("label {} defined more than once", label),
        ));
    }
    for target in method.instructions.iter().filter_map(IrInstr::jump_target) {
        if !defined.contains_key(target.as_str()) {
            return Err(CompileError::invalid_ir(
                &method.name,
                format!("jump to undefined label {}", target),
            ));
        }
    }
    Ok(())
}

fn verify_registers(method: &IrMethod) -> CompileResult<()> {
    let mut owners: FxHashMap<u16, &VarKey> = FxHashMap::default();
    for (key, desc) in method.var_table.sorted() {
        if let Some(previous) = owners.insert(desc.register, key) {
            return Err(CompileError::invalid_ir(
                &method.name,
                format!("{} and {} share register {}", previous, key, desc.register),
            ));
        }
        if !method.is_static && desc.register == 0 && *key != VarKey::This {
            return Err(CompileError::invalid_ir(
                &method.name,
                format!("{} occupies the receiver register", key),
            ));
        }
    }
    if let Some(max) = method.var_table.max_register() {
        if u32::from(method.locals_limit) != u32::from(max) + 1 {
            return Err(CompileError::invalid_ir(
                &method.name,
                format!("locals limit {} but highest register {}", method.locals_limit, max),
            ));
        }
    }
    Ok(())
}

fn verify_operand(method: &IrMethod, operand: &Operand) -> CompileResult<()> {
    match operand {
        Operand::Literal { .. } | Operand::ClassRef(_) => Ok(()),
        Operand::This(_) => {
            if method.is_static {
                return Err(CompileError::invalid_ir(
                    &method.name,
                    "receiver used in a static method",
                ));
            }
            Ok(())
        }
        Operand::Element { array, index, ty } => {
            verify_operand(method, array)?;
            verify_operand(method, index)?;
            if array.ty().element() != Some(ty) {
                return Err(CompileError::invalid_ir(
                    &method.name,
                    format!("element {} does not match array type {}", operand, array.ty()),
                ));
            }
            Ok(())
        }
        Operand::Variable { ty, .. } | Operand::Temp { ty, .. } => {
            let key = operand
                .key()
                .ok_or_else(|| CompileError::internal("storage operand without a key"))?;
            let desc = method.var_table.get(&key).ok_or_else(|| {
                CompileError::invalid_ir(&method.name, format!("{} has no register", key))
            })?;
            if desc.ty != *ty {
                return Err(CompileError::invalid_ir(
                    &method.name,
                    format!("{} used as {} but declared {}", key, ty, desc.ty),
                ));
            }
            Ok(())
        }
    }
}
