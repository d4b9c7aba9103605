//! Semantic types
//!
//! The resolved type attached to every expression by semantic analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved source-level type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Boolean,
    Void,
    String,
    /// A user class, an imported class, or the enclosing class
    Class(String),
    /// Array of some element type
    Array(Box<Type>),
}

impl Type {
    /// Build an array type over `elem`
    pub fn array_of(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    /// `int[]`, the only array type most programs use
    pub fn int_array() -> Self {
        Type::array_of(Type::Int)
    }

    /// Build a class type
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// Element type of an array, `None` for scalars
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Values of this type live in reference slots
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::String | Type::Class(_) | Type::Array(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Class name for class types
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Boolean => write!(f, "boolean"),
            Type::Void => write!(f, "void"),
            Type::String => write!(f, "String"),
            Type::Class(name) => write!(f, "{}", name),
            Type::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}
