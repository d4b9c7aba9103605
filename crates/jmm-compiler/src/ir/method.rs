//! IR Methods and Variable Tables

use super::instr::{IrInstr, Label};
use super::value::{IrType, VarKey};
use jmm_ast::Access;
use rustc_hash::{FxHashMap, FxHashSet};

/// Where a var-table entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Receiver,
    Param,
    Local,
    Temp,
}

/// Register assigned to one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDescriptor {
    pub register: u16,
    pub ty: IrType,
    pub kind: VarKind,
}

/// Name to register mapping of one method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarTable {
    entries: FxHashMap<VarKey, VarDescriptor>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: VarKey, descriptor: VarDescriptor) {
        self.entries.insert(key, descriptor);
    }

    pub fn get(&self, key: &VarKey) -> Option<&VarDescriptor> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &VarKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest assigned register, if any
    pub fn max_register(&self) -> Option<u16> {
        self.entries.values().map(|d| d.register).max()
    }

    /// Entries ordered by register
    pub fn sorted(&self) -> Vec<(&VarKey, &VarDescriptor)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(_, d)| d.register);
        entries
    }
}

/// Typed parameter or declared local
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrParam {
    pub name: String,
    pub ty: IrType,
}

impl IrParam {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrMethod {
    pub name: String,
    pub access: Access,
    pub is_static: bool,
    pub is_varargs: bool,
    pub params: Vec<IrParam>,
    pub return_type: IrType,
    /// Declared locals, in declaration order
    pub locals: Vec<IrParam>,
    pub instructions: Vec<IrInstr>,
    /// Filled in by register allocation
    pub var_table: VarTable,
    pub locals_limit: u16,
}

impl IrMethod {
    pub fn new(name: impl Into<String>, return_type: IrType) -> Self {
        Self {
            name: name.into(),
            access: Access::Public,
            is_static: false,
            is_varargs: false,
            params: Vec::new(),
            return_type,
            locals: Vec::new(),
            instructions: Vec::new(),
            var_table: VarTable::new(),
            locals_limit: 0,
        }
    }

    pub fn push(&mut self, instr: IrInstr) {
        self.instructions.push(instr);
    }

    /// Labels defined in the body
    pub fn labels(&self) -> FxHashSet<&Label> {
        self.instructions
            .iter()
            .filter_map(|i| match i {
                IrInstr::Label(label) => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn ends_with_return(&self) -> bool {
        self.instructions.last().is_some_and(IrInstr::is_return)
    }

    /// Register of `key`, once allocated
    pub fn register_of(&self, key: &VarKey) -> Option<u16> {
        self.var_table.get(key).map(|d| d.register)
    }
}
