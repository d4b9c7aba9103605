//! Symbol table
//!
//! Static signatures for the compiled class: imports, fields and every method's
//! parameters, locals and return type. Built once by semantic analysis (or by
//! [`SymbolTable::from_program`]) and read by every later stage.

use crate::ast::{Access, Param, Program, VarDecl};
use crate::types::Type;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Signature of one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub access: Access,
    pub is_static: bool,
    pub is_varargs: bool,
    pub params: Vec<Param>,
    pub locals: Vec<VarDecl>,
    pub return_type: Type,
}

impl MethodSignature {
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn local(&self, name: &str) -> Option<&VarDecl> {
        self.locals.iter().find(|l| l.name == name)
    }

    /// Number of parameters before the vararg slot
    pub fn fixed_param_count(&self) -> usize {
        if self.is_varargs {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    /// Element type of the vararg slot, if any
    pub fn vararg_element(&self) -> Option<&Type> {
        if !self.is_varargs {
            return None;
        }
        self.params.last().and_then(|p| p.ty.element())
    }
}

/// Class-level symbol table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub class_name: String,
    pub superclass: Option<String>,
    /// Fully qualified, dot-separated import names
    pub imports: Vec<String>,
    pub fields: Vec<VarDecl>,
    methods: Vec<MethodSignature>,
    #[serde(skip)]
    method_index: FxHashMap<String, usize>,
}

impl SymbolTable {
    pub fn new(class_name: impl Into<String>, superclass: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            superclass,
            ..Self::default()
        }
    }

    /// Derive the table from a typed program
    pub fn from_program(program: &Program) -> Self {
        let class = &program.class;
        let mut table = SymbolTable::new(class.name.clone(), class.superclass.clone());
        table.imports = program.imports.iter().map(|i| i.qualified_name()).collect();
        table.fields = class.fields.clone();
        for method in &class.methods {
            table.add_method(MethodSignature {
                name: method.name.clone(),
                access: method.access,
                is_static: method.is_static,
                is_varargs: method.is_varargs(),
                params: method.params.clone(),
                locals: method.locals.clone(),
                return_type: method.return_type.clone(),
            });
        }
        table
    }

    pub fn add_import(&mut self, qualified: impl Into<String>) {
        self.imports.push(qualified.into());
    }

    pub fn add_field(&mut self, field: VarDecl) {
        self.fields.push(field);
    }

    /// Register a method; a later signature with the same name replaces the earlier one
    pub fn add_method(&mut self, signature: MethodSignature) {
        if let Some(&idx) = self.method_index.get(&signature.name) {
            self.methods[idx] = signature;
            return;
        }
        self.method_index
            .insert(signature.name.clone(), self.methods.len());
        self.methods.push(signature);
    }

    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        match self.method_index.get(name) {
            Some(&idx) => self.methods.get(idx),
            // Deserialized tables have no index yet
            None => self.methods.iter().find(|m| m.name == name),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.iter()
    }

    pub fn field(&self, name: &str) -> Option<&VarDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_local(&self, method: &str, name: &str) -> bool {
        self.method(method).is_some_and(|m| m.local(name).is_some())
    }

    pub fn is_param(&self, method: &str, name: &str) -> bool {
        self.method(method).is_some_and(|m| m.param(name).is_some())
    }

    /// A field shadowed by a local or parameter of `method` is not a field there
    pub fn is_field(&self, method: &str, name: &str) -> bool {
        !self.is_local(method, name) && !self.is_param(method, name) && self.field(name).is_some()
    }

    /// `name` is the alias of some import
    pub fn is_import(&self, name: &str) -> bool {
        self.imports
            .iter()
            .any(|i| i.rsplit('.').next() == Some(name))
    }

    /// Declared type of a local, parameter or field as seen from `method`
    pub fn variable_type(&self, method: &str, name: &str) -> Option<&Type> {
        let sig = self.method(method);
        sig.and_then(|m| m.local(name).map(|l| &l.ty))
            .or_else(|| sig.and_then(|m| m.param(name).map(|p| &p.ty)))
            .or_else(|| self.field(name).map(|f| &f.ty))
    }
}
