//! IR Types and Operands
//!
//! Defines the operand forms named by IR instructions.

use std::fmt;

/// Type tag attached to every operand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Int32,
    Boolean,
    Void,
    String,
    Class(String),
    Array(Box<IrType>),
    /// Receiver sentinel for `this` in call-target position
    This(String),
}

impl IrType {
    pub fn array_of(elem: IrType) -> Self {
        IrType::Array(Box::new(elem))
    }

    /// Values of this type live in reference slots
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            IrType::String | IrType::Class(_) | IrType::Array(_) | IrType::This(_)
        )
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    pub fn element(&self) -> Option<&IrType> {
        match self {
            IrType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Class a call on a value of this type dispatches to
    pub fn owner_class(&self) -> Option<&str> {
        match self {
            IrType::Class(name) | IrType::This(name) => Some(name),
            IrType::String => Some("String"),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Int32 => write!(f, ".i32"),
            IrType::Boolean => write!(f, ".bool"),
            IrType::Void => write!(f, ".V"),
            IrType::String => write!(f, ".String"),
            IrType::Class(name) => write!(f, ".{}", name),
            IrType::Array(elem) => write!(f, ".array{}", elem),
            IrType::This(name) => write!(f, ".this.{}", name),
        }
    }
}

/// Compilation-unique temporary identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

impl TempId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp{}", self.0)
    }
}

/// Field of the compiled class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub name: String,
    pub ty: IrType,
}

impl FieldRef {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.ty)
    }
}

/// Key of a var-table entry
///
/// Temporaries have their own key space so they can never collide with a
/// source name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarKey {
    This,
    Named(String),
    Temp(TempId),
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKey::This => write!(f, "this"),
            VarKey::Named(name) => write!(f, "{}", name),
            VarKey::Temp(id) => write!(f, "{}", id),
        }
    }
}

/// IR operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Immediate; booleans are 0/1
    Literal { value: i32, ty: IrType },
    /// Local variable or parameter
    Variable { name: String, ty: IrType },
    Temp { id: TempId, ty: IrType },
    /// `array[index]`, typed by the element type
    Element {
        array: Box<Operand>,
        index: Box<Operand>,
        ty: IrType,
    },
    /// The receiver; `IrType::Class` as a value, `IrType::This` as a call target
    This(IrType),
    /// Bare class name or import alias, valid only as a static call target
    ClassRef(String),
}

impl Operand {
    pub fn int(value: i32) -> Self {
        Operand::Literal {
            value,
            ty: IrType::Int32,
        }
    }

    pub fn bool(value: bool) -> Self {
        Operand::Literal {
            value: value as i32,
            ty: IrType::Boolean,
        }
    }

    pub fn variable(name: impl Into<String>, ty: IrType) -> Self {
        Operand::Variable {
            name: name.into(),
            ty,
        }
    }

    pub fn element(array: Operand, index: Operand, ty: IrType) -> Self {
        Operand::Element {
            array: Box::new(array),
            index: Box::new(index),
            ty,
        }
    }

    pub fn ty(&self) -> IrType {
        match self {
            Operand::Literal { ty, .. }
            | Operand::Variable { ty, .. }
            | Operand::Temp { ty, .. }
            | Operand::Element { ty, .. }
            | Operand::This(ty) => ty.clone(),
            Operand::ClassRef(name) => IrType::Class(name.clone()),
        }
    }

    /// Var-table key of the storage this operand reads or writes
    pub fn key(&self) -> Option<VarKey> {
        match self {
            Operand::Variable { name, .. } => Some(VarKey::Named(name.clone())),
            Operand::Temp { id, .. } => Some(VarKey::Temp(*id)),
            Operand::Element { array, .. } => array.key(),
            Operand::This(_) => Some(VarKey::This),
            Operand::Literal { .. } | Operand::ClassRef(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal { .. })
    }

    /// Can be the destination of an assignment
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Operand::Variable { .. } | Operand::Temp { .. } | Operand::Element { .. }
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal { value, ty } => write!(f, "{}{}", value, ty),
            Operand::Variable { name, ty } => write!(f, "{}{}", name, ty),
            Operand::Temp { id, ty } => write!(f, "{}{}", id, ty),
            Operand::Element { array, index, ty } => {
                let base = match array.as_ref() {
                    Operand::Variable { name, .. } => name.clone(),
                    Operand::Temp { id, .. } => id.to_string(),
                    other => other.to_string(),
                };
                write!(f, "{}[{}]{}", base, index, ty)
            }
            Operand::This(IrType::This(_)) => write!(f, "this"),
            Operand::This(ty) => write!(f, "this{}", ty),
            Operand::ClassRef(name) => write!(f, "{}", name),
        }
    }
}
