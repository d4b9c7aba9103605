//! Type and descriptor resolution
//!
//! Maps semantic types to IR type tags and IR types to JVM descriptors.
//! Short class names are qualified through the import list by suffix match.

use crate::error::{CompileError, CompileResult};
use crate::ir::IrType;
use jmm_ast::Type;

/// Root of every class hierarchy
pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";

/// IR tag of a semantic type
pub fn ir_type(ty: &Type) -> IrType {
    match ty {
        Type::Int => IrType::Int32,
        Type::Boolean => IrType::Boolean,
        Type::Void => IrType::Void,
        Type::String => IrType::String,
        Type::Class(name) => IrType::Class(name.clone()),
        Type::Array(elem) => IrType::array_of(ir_type(elem)),
    }
}

/// Qualifies class names against the imports of one class
#[derive(Debug, Clone, Copy)]
pub struct ImportResolver<'a> {
    imports: &'a [String],
}

impl<'a> ImportResolver<'a> {
    /// `imports` are dot-separated qualified names
    pub fn new(imports: &'a [String]) -> Self {
        Self { imports }
    }

    /// Internal (slash-separated) name of `name`
    ///
    /// The first import equal to `name` or ending in `.name` wins; names
    /// without a matching import are used as written.
    pub fn qualify(&self, name: &str) -> String {
        if name == "String" {
            return STRING_CLASS.to_string();
        }
        let suffix = format!(".{}", name);
        self.imports
            .iter()
            .find(|import| import.as_str() == name || import.ends_with(&suffix))
            .map(|import| import.replace('.', "/"))
            .unwrap_or_else(|| name.replace('.', "/"))
    }

    /// Superclass for the class header, defaulting to the root object type
    pub fn superclass(&self, superclass: Option<&str>) -> String {
        match superclass {
            Some(name) if !name.is_empty() => self.qualify(name),
            _ => OBJECT_CLASS.to_string(),
        }
    }

    /// Field or parameter descriptor of `ty`
    pub fn descriptor(&self, ty: &IrType) -> CompileResult<String> {
        match ty {
            IrType::Int32 => Ok("I".to_string()),
            IrType::Boolean => Ok("Z".to_string()),
            IrType::Void => Ok("V".to_string()),
            IrType::String => Ok(format!("L{};", STRING_CLASS)),
            IrType::Class(name) => Ok(format!("L{};", self.qualify(name))),
            IrType::Array(elem) => Ok(format!("[{}", self.descriptor(elem)?)),
            IrType::This(_) => Err(CompileError::UnresolvedDescriptor { ty: ty.to_string() }),
        }
    }

    /// `(params)ret` method descriptor
    pub fn method_descriptor<'t>(
        &self,
        params: impl IntoIterator<Item = &'t IrType>,
        ret: &IrType,
    ) -> CompileResult<String> {
        let mut desc = String::from("(");
        for param in params {
            desc.push_str(&self.descriptor(param)?);
        }
        desc.push(')');
        desc.push_str(&self.descriptor(ret)?);
        Ok(desc)
    }
}
