//! Compilation errors
//!
//! The backend runs on a well-typed tree, so every error here is fatal and
//! points at a bug upstream or in the backend itself.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unknown variable '{name}' in method {method}")]
    UnknownVariable { name: String, method: String },

    #[error("No register assigned to '{name}' in method {method}")]
    MissingRegister { name: String, method: String },

    #[error("Receiver of call to '{method}' has no object type (found {ty})")]
    NonObjectReceiver { method: String, ty: String },

    #[error("Type {ty} has no descriptor")]
    UnresolvedDescriptor { ty: String },

    #[error("Empty return in non-void method {method}")]
    EmptyReturn { method: String },

    #[error("Method {name} not found in symbol table")]
    UnknownMethod { name: String },

    #[error("Operand stack underflow in method {method}")]
    StackUnderflow { method: String },

    #[error("Invalid IR in method {method}: {message}")]
    InvalidIr { method: String, message: String },

    #[error("Invalid compiler options: {message}")]
    InvalidOptions { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    pub fn invalid_ir(method: &str, message: impl Into<String>) -> Self {
        CompileError::InvalidIr {
            method: method.to_string(),
            message: message.into(),
        }
    }
}
