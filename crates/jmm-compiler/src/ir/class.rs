//! IR Class Unit

use super::method::IrMethod;
use super::value::IrType;
use jmm_ast::Access;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrField {
    pub name: String,
    pub ty: IrType,
    pub access: Access,
}

/// One compiled class: header, fields and lowered methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrClass {
    pub name: String,
    pub superclass: Option<String>,
    /// Fully qualified, dot-separated import names
    pub imports: Vec<String>,
    pub fields: Vec<IrField>,
    pub methods: Vec<IrMethod>,
}

impl IrClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            imports: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&IrMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&IrField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
