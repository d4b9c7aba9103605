//! Pretty-printing for IR
//!
//! Renders IR in an OLLIR-like text form for debugging and tests.

use super::class::IrClass;
use super::instr::{Call, CallKind, Condition, IrInstr, Rvalue};
use super::method::IrMethod;
use super::value::IrType;
use std::fmt;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == CallKind::New {
            return write!(f, "new({}){}", self.target, self.return_ty);
        }
        write!(f, "{}({}, \"{}\"", self.kind, self.target, self.method)?;
        for arg in &self.args {
            write!(f, ", {}", arg)?;
        }
        write!(f, "){}", self.return_ty)
    }
}

impl fmt::Display for Rvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Operand(op) => write!(f, "{}", op),
            Rvalue::Binary { op, left, right } => {
                write!(f, "{} {}{} {}", left, op, IrType::Int32, right)
            }
            Rvalue::Unary { op, operand } => write!(f, "{}{} {}", op, IrType::Boolean, operand),
            Rvalue::GetField { object, field } => {
                write!(f, "getfield({}, {}){}", object, field, field.ty)
            }
            Rvalue::Call(call) => write!(f, "{}", call),
            Rvalue::NewArray { elem, len } => {
                write!(f, "new(array, {}){}", len, IrType::array_of(elem.clone()))
            }
            Rvalue::ArrayLength(array) => {
                write!(f, "arraylength({}){}", array, IrType::Int32)
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Operand(op) => write!(f, "{}", op),
            Condition::Compare { op, left, right } => {
                write!(f, "{} {}{} {}", left, op, IrType::Boolean, right)
            }
        }
    }
}

impl fmt::Display for IrInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrInstr::Assign { dest, value } => write!(f, "{} :={} {};", dest, dest.ty(), value),
            IrInstr::Expr(value) => write!(f, "{};", value),
            IrInstr::PutField {
                object,
                field,
                value,
            } => write!(f, "putfield({}, {}, {}){};", object, field, value, IrType::Void),
            IrInstr::Goto(label) => write!(f, "goto {};", label),
            IrInstr::Branch { cond, target } => write!(f, "if ({}) goto {};", cond, target),
            IrInstr::Label(label) => write!(f, "{}:", label),
            IrInstr::Return { value: Some(v), ty } => write!(f, "ret{} {};", ty, v),
            IrInstr::Return { value: None, ty } => write!(f, "ret{};", ty),
        }
    }
}

impl PrettyPrint for IrMethod {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        let mut modifiers = String::new();
        if let Some(kw) = self.access.keyword() {
            modifiers.push_str(kw);
            modifiers.push(' ');
        }
        if self.is_static {
            modifiers.push_str("static ");
        }
        if self.is_varargs {
            modifiers.push_str("varargs ");
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}{}", p.name, p.ty))
            .collect();
        output.push_str(&format!(
            ".method {}{}({}){} {{\n",
            modifiers,
            self.name,
            params.join(", "),
            self.return_type
        ));

        for instr in &self.instructions {
            match instr {
                IrInstr::Label(_) => output.push_str(&format!("{}\n", instr)),
                _ => output.push_str(&format!("    {}\n", instr)),
            }
        }

        output.push_str("}\n");
        output
    }
}

impl PrettyPrint for IrClass {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        for import in &self.imports {
            output.push_str(&format!("import {};\n", import));
        }
        if !self.imports.is_empty() {
            output.push('\n');
        }

        match &self.superclass {
            Some(sup) => output.push_str(&format!("{} extends {} {{\n", self.name, sup)),
            None => output.push_str(&format!("{} {{\n", self.name)),
        }

        for field in &self.fields {
            let access = field.access.keyword().unwrap_or("public");
            output.push_str(&format!(".field {} {}{};\n", access, field.name, field.ty));
        }

        for method in &self.methods {
            output.push('\n');
            output.push_str(&method.pretty_print());
        }

        output.push_str("}\n");
        output
    }
}
