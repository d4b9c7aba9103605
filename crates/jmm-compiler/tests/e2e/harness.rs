//! Test harness for end-to-end compilation and execution
//!
//! Compiles typed Java-- programs to Jasmin text, then assembles and runs the
//! text on a small stack machine. The machine enforces the declared
//! `.limit stack` / `.limit locals` and requires an empty operand stack at
//! every return, so each run also checks the emitter's stack accounting.

#![allow(dead_code)]

use jmm_ast::{
    Access, BinaryOp, ClassDecl, Expr, ImportDecl, MethodDecl, Param, Program, Stmt, SymbolTable,
    Type, VarDecl,
};
use jmm_compiler::{CompileError, Compiler, CompilerOptions};
use std::collections::HashMap;

pub const CLASS: &str = "Prog";

/// Error type for e2e tests
#[derive(Debug)]
pub enum E2EError {
    /// Compilation error
    Compile(CompileError),
    /// Malformed assembly text
    Assemble(String),
    /// Runtime fault in the stack machine
    Exec(String),
}

impl std::fmt::Display for E2EError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            E2EError::Compile(e) => write!(f, "Compile error: {}", e),
            E2EError::Assemble(e) => write!(f, "Assemble error: {}", e),
            E2EError::Exec(e) => write!(f, "Execution error: {}", e),
        }
    }
}

impl std::error::Error for E2EError {}

/// Result type for e2e tests
pub type E2EResult<T> = Result<T, E2EError>;

// ============================================================================
// Program builders
// ============================================================================

pub fn int(v: i32) -> Expr {
    Expr::int(v)
}

pub fn var(name: &str, ty: Type) -> Expr {
    Expr::var(name, ty)
}

pub fn ivar(name: &str) -> Expr {
    Expr::var(name, Type::Int)
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(op, lhs, rhs)
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return(Some(value))
}

pub fn local(name: &str, ty: Type) -> VarDecl {
    VarDecl::new(name, ty)
}

pub fn param(name: &str, ty: Type) -> Param {
    Param::new(name, ty)
}

/// `io.name(args)`, a static call into the imported `io` class
pub fn call_io(name: &str, args: Vec<Expr>, ret: Type) -> Expr {
    Expr::call(Expr::var("io", Type::class("io")), name, args, ret)
}

/// `this.name(args)`
pub fn call_this(name: &str, args: Vec<Expr>, ret: Type) -> Expr {
    Expr::call(Expr::this(CLASS), name, args, ret)
}

pub fn method(
    name: &str,
    params: Vec<Param>,
    return_type: Type,
    locals: Vec<VarDecl>,
    body: Vec<Stmt>,
) -> MethodDecl {
    MethodDecl {
        name: name.into(),
        access: Access::Public,
        is_static: false,
        params,
        return_type,
        locals,
        body,
    }
}

pub fn static_method(
    name: &str,
    params: Vec<Param>,
    return_type: Type,
    locals: Vec<VarDecl>,
    body: Vec<Stmt>,
) -> MethodDecl {
    MethodDecl {
        is_static: true,
        ..method(name, params, return_type, locals, body)
    }
}

/// Class `Prog` importing `io`
pub fn program(fields: Vec<VarDecl>, methods: Vec<MethodDecl>) -> Program {
    Program {
        imports: vec![ImportDecl::new(["io"])],
        class: ClassDecl {
            name: CLASS.into(),
            superclass: None,
            fields,
            methods,
        },
    }
}

// ============================================================================
// Compilation
// ============================================================================

pub fn compile(program: &Program) -> E2EResult<String> {
    compile_with(program, CompilerOptions::default())
}

pub fn compile_optimized(program: &Program) -> E2EResult<String> {
    compile_with(program, CompilerOptions::default().with_optimize(true))
}

fn compile_with(program: &Program, options: CompilerOptions) -> E2EResult<String> {
    let table = SymbolTable::from_program(program);
    Compiler::new(options)
        .compile(program, &table)
        .map_err(E2EError::Compile)
}

/// Compile, then run `method` on a fresh instance
pub fn compile_and_run(program: &Program, method: &str, args: &[Value]) -> E2EResult<Run> {
    let text = compile(program)?;
    run(&text, method, args)
}

/// Compile and run, expecting an int result
pub fn expect_i32(program: &Program, method: &str, args: &[i32], expected: i32) {
    let args: Vec<Value> = args.iter().map(|v| Value::Int(*v)).collect();
    match compile_and_run(program, method, &args) {
        Ok(run) => assert_eq!(run.int(), expected, "wrong result from {}", method),
        Err(e) => panic!("Compilation/execution failed: {}", e),
    }
}

// ============================================================================
// Stack machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Ref(usize),
    Null,
}

impl Value {
    pub fn as_int(&self) -> E2EResult<i32> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(E2EError::Exec(format!("expected int, found {:?}", other))),
        }
    }

    pub fn as_addr(&self) -> E2EResult<usize> {
        match self {
            Value::Ref(r) => Ok(*r),
            other => Err(E2EError::Exec(format!("expected reference, found {:?}", other))),
        }
    }
}

#[derive(Debug)]
enum HeapObject {
    Object {
        class: String,
        fields: HashMap<String, Value>,
    },
    Array(Vec<Value>),
}

#[derive(Debug, Clone)]
struct Instr {
    op: String,
    operands: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AsmMethod {
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
    pub max_stack: usize,
    pub max_locals: usize,
    code: Vec<Instr>,
    labels: HashMap<String, usize>,
}

/// A parsed Jasmin class
#[derive(Debug, Clone)]
pub struct Assembled {
    pub name: String,
    pub superclass: String,
    pub fields: Vec<(String, String)>,
    pub methods: Vec<AsmMethod>,
}

impl Assembled {
    pub fn method(&self, name: &str) -> Option<&AsmMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

pub fn assemble(text: &str) -> E2EResult<Assembled> {
    let mut class = Assembled {
        name: String::new(),
        superclass: String::new(),
        fields: Vec::new(),
        methods: Vec::new(),
    };
    let mut current: Option<AsmMethod> = None;
    let err = |line: &str| E2EError::Assemble(format!("bad line: {}", line));

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            ".class" => class.name = tokens.last().ok_or_else(|| err(line))?.to_string(),
            ".super" => class.superclass = tokens.last().ok_or_else(|| err(line))?.to_string(),
            ".field" if tokens.len() >= 3 => {
                let n = tokens.len();
                class
                    .fields
                    .push((tokens[n - 2].to_string(), tokens[n - 1].to_string()));
            }
            ".method" => {
                let signature = tokens.last().ok_or_else(|| err(line))?;
                let paren = signature.find('(').ok_or_else(|| err(line))?;
                current = Some(AsmMethod {
                    name: signature[..paren].to_string(),
                    descriptor: signature[paren..].to_string(),
                    is_static: tokens.contains(&"static"),
                    max_stack: 0,
                    max_locals: 0,
                    code: Vec::new(),
                    labels: HashMap::new(),
                });
            }
            ".limit" if tokens.len() == 3 => {
                let method = current.as_mut().ok_or_else(|| err(line))?;
                let value: usize = tokens[2].parse().map_err(|_| err(line))?;
                match tokens[1] {
                    "stack" => method.max_stack = value,
                    "locals" => method.max_locals = value,
                    _ => return Err(err(line)),
                }
            }
            ".end" => {
                let method = current.take().ok_or_else(|| err(line))?;
                class.methods.push(method);
            }
            label if label.ends_with(':') && tokens.len() == 1 => {
                let method = current.as_mut().ok_or_else(|| err(line))?;
                let name = label.trim_end_matches(':').to_string();
                if method.labels.insert(name, method.code.len()).is_some() {
                    return Err(E2EError::Assemble(format!("duplicate label {}", label)));
                }
            }
            op => {
                let method = current.as_mut().ok_or_else(|| err(line))?;
                method.code.push(Instr {
                    op: op.to_string(),
                    operands: tokens[1..].iter().map(|t| t.to_string()).collect(),
                });
            }
        }
    }

    // Every jump must land on a defined label
    for method in &class.methods {
        for instr in &method.code {
            if instr.op.starts_with("if") || instr.op == "goto" {
                let target = instr.operands.first().ok_or_else(|| err(&instr.op))?;
                if !method.labels.contains_key(target) {
                    return Err(E2EError::Assemble(format!(
                        "{}: undefined label {}",
                        method.name, target
                    )));
                }
            }
        }
    }
    Ok(class)
}

/// Argument count and whether a value is returned, from `(..)R`
fn parse_descriptor(desc: &str) -> E2EResult<(usize, bool)> {
    let close = desc
        .find(')')
        .ok_or_else(|| E2EError::Assemble(format!("bad descriptor {}", desc)))?;
    let mut count = 0;
    let mut chars = desc[1..close].chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => continue,
            'L' => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                count += 1;
            }
            _ => count += 1,
        }
    }
    Ok((count, &desc[close + 1..] != "V"))
}

/// `Owner/name(desc)R` into its parts
fn split_member(member: &str) -> E2EResult<(String, String, String)> {
    let (path, desc) = match member.find('(') {
        Some(i) => (&member[..i], &member[i..]),
        None => (member, ""),
    };
    let (owner, name) = path
        .rsplit_once('/')
        .ok_or_else(|| E2EError::Assemble(format!("bad member {}", member)))?;
    Ok((owner.to_string(), name.to_string(), desc.to_string()))
}

/// Outcome of one top-level call
pub struct Run {
    pub result: Option<Value>,
    pub this: Value,
    pub machine: Machine,
}

impl Run {
    pub fn int(&self) -> i32 {
        match self.result {
            Some(Value::Int(v)) => v,
            other => panic!("expected int result, found {:?}", other),
        }
    }

    /// Field of the receiver the call ran on
    pub fn field(&self, name: &str) -> Value {
        self.machine
            .field(self.this, name)
            .unwrap_or_else(|e| panic!("{}", e))
    }
}

/// Assemble `text` and call `method` on a fresh instance
pub fn run(text: &str, method: &str, args: &[Value]) -> E2EResult<Run> {
    let class = assemble(text)?;
    let mut machine = Machine::new(class);
    let this = machine.alloc_object(CLASS);
    let result = machine.invoke(method, Some(this), args.to_vec())?;
    Ok(Run {
        result,
        this,
        machine,
    })
}

/// Interpreter for the instructions the emitter produces
pub struct Machine {
    class: Assembled,
    heap: Vec<HeapObject>,
    /// Calls that left the class: `Owner/name` and the arguments
    pub external_calls: Vec<(String, Vec<Value>)>,
    /// Highest operand-stack height seen per method
    pub peak_stack: HashMap<String, usize>,
    steps: usize,
}

const STEP_LIMIT: usize = 1_000_000;

impl Machine {
    pub fn new(class: Assembled) -> Self {
        Self {
            class,
            heap: Vec::new(),
            external_calls: Vec::new(),
            peak_stack: HashMap::new(),
            steps: 0,
        }
    }

    pub fn alloc_object(&mut self, class: &str) -> Value {
        self.heap.push(HeapObject::Object {
            class: class.to_string(),
            fields: HashMap::new(),
        });
        Value::Ref(self.heap.len() - 1)
    }

    fn alloc_array(&mut self, len: i32, fill: Value) -> E2EResult<Value> {
        if len < 0 {
            return Err(E2EError::Exec("NegativeArraySizeException".into()));
        }
        self.heap.push(HeapObject::Array(vec![fill; len as usize]));
        Ok(Value::Ref(self.heap.len() - 1))
    }

    pub fn field(&self, obj: Value, name: &str) -> E2EResult<Value> {
        match self.heap.get(obj.as_addr()?) {
            Some(HeapObject::Object { fields, .. }) => Ok(fields
                .get(name)
                .copied()
                .unwrap_or_else(|| self.default_field(name))),
            _ => Err(E2EError::Exec(format!("{:?} is not an object", obj))),
        }
    }

    fn default_field(&self, name: &str) -> Value {
        match self.class.fields.iter().find(|(n, _)| n == name) {
            Some((_, desc)) if desc == "I" || desc == "Z" => Value::Int(0),
            _ => Value::Null,
        }
    }

    fn array(&mut self, array: Value) -> E2EResult<&mut Vec<Value>> {
        match self.heap.get_mut(array.as_addr()?) {
            Some(HeapObject::Array(items)) => Ok(items),
            _ => Err(E2EError::Exec(format!("{:?} is not an array", array))),
        }
    }

    pub fn invoke(
        &mut self,
        name: &str,
        this: Option<Value>,
        args: Vec<Value>,
    ) -> E2EResult<Option<Value>> {
        let method = self
            .class
            .method(name)
            .cloned()
            .ok_or_else(|| E2EError::Exec(format!("no method {}", name)))?;

        let mut locals = vec![Value::Null; method.max_locals];
        let mut slot = 0;
        if !method.is_static {
            let this = this.ok_or_else(|| E2EError::Exec("missing receiver".into()))?;
            *locals
                .get_mut(0)
                .ok_or_else(|| E2EError::Exec(format!("{}: no slot for this", name)))? = this;
            slot = 1;
        }
        for arg in args {
            *locals
                .get_mut(slot)
                .ok_or_else(|| E2EError::Exec(format!("{}: too few locals", name)))? = arg;
            slot += 1;
        }

        let mut frame = Frame {
            method: &method,
            stack: Vec::new(),
            locals,
            peak: 0,
        };
        let result = self.execute(&mut frame);
        let peak = self.peak_stack.entry(name.to_string()).or_default();
        *peak = (*peak).max(frame.peak);
        result
    }

    fn execute(&mut self, frame: &mut Frame<'_>) -> E2EResult<Option<Value>> {
        let method = frame.method;
        let mut pc = 0;
        loop {
            self.steps += 1;
            if self.steps > STEP_LIMIT {
                return Err(E2EError::Exec("step limit exceeded".into()));
            }
            let instr = method
                .code
                .get(pc)
                .ok_or_else(|| E2EError::Exec(format!("{}: fell off the end", method.name)))?;
            pc += 1;
            let operand = instr.operands.first().map(String::as_str).unwrap_or("");

            match instr.op.as_str() {
                "iconst_m1" => frame.push(Value::Int(-1))?,
                op if op.starts_with("iconst_") => {
                    frame.push(Value::Int(parse_int(&op[7..])?))?
                }
                "bipush" | "sipush" | "ldc" => frame.push(Value::Int(parse_int(operand)?))?,
                op if op.starts_with("iload") || op.starts_with("aload") => {
                    let slot = slot_of(op, operand)?;
                    let value = frame.local(slot)?;
                    frame.push(value)?;
                }
                op if op.starts_with("istore") || op.starts_with("astore") => {
                    let slot = slot_of(op, operand)?;
                    let value = frame.pop()?;
                    frame.set_local(slot, value)?;
                }
                "iadd" | "isub" | "imul" | "idiv" | "ixor" => {
                    let b = frame.pop()?.as_int()?;
                    let a = frame.pop()?.as_int()?;
                    let value = match instr.op.as_str() {
                        "iadd" => a.wrapping_add(b),
                        "isub" => a.wrapping_sub(b),
                        "imul" => a.wrapping_mul(b),
                        "ixor" => a ^ b,
                        _ if b == 0 => return Err(E2EError::Exec("ArithmeticException".into())),
                        _ => a.wrapping_div(b),
                    };
                    frame.push(Value::Int(value))?;
                }
                "iaload" | "baload" | "aaload" => {
                    let index = frame.pop()?.as_int()?;
                    let array = frame.pop()?;
                    let value = *self
                        .array(array)?
                        .get(index as usize)
                        .ok_or_else(|| E2EError::Exec("ArrayIndexOutOfBounds".into()))?;
                    frame.push(value)?;
                }
                "iastore" | "bastore" | "aastore" => {
                    let value = frame.pop()?;
                    let index = frame.pop()?.as_int()?;
                    let array = frame.pop()?;
                    let slot = self
                        .array(array)?
                        .get_mut(index as usize)
                        .ok_or_else(|| E2EError::Exec("ArrayIndexOutOfBounds".into()))?;
                    *slot = value;
                }
                "newarray" => {
                    let len = frame.pop()?.as_int()?;
                    let array = self.alloc_array(len, Value::Int(0))?;
                    frame.push(array)?;
                }
                "anewarray" => {
                    let len = frame.pop()?.as_int()?;
                    let array = self.alloc_array(len, Value::Null)?;
                    frame.push(array)?;
                }
                "arraylength" => {
                    let array = frame.pop()?;
                    let len = self.array(array)?.len() as i32;
                    frame.push(Value::Int(len))?;
                }
                "new" => {
                    let obj = self.alloc_object(operand);
                    frame.push(obj)?;
                }
                "dup" => {
                    let top = frame.pop()?;
                    frame.push(top)?;
                    frame.push(top)?;
                }
                "pop" => {
                    frame.pop()?;
                }
                "getfield" => {
                    let (_, name, _) = split_member(operand)?;
                    let obj = frame.pop()?;
                    let value = self.field(obj, &name)?;
                    frame.push(value)?;
                }
                "putfield" => {
                    let (_, name, _) = split_member(operand)?;
                    let value = frame.pop()?;
                    let obj = frame.pop()?;
                    match self.heap.get_mut(obj.as_addr()?) {
                        Some(HeapObject::Object { fields, .. }) => {
                            fields.insert(name, value);
                        }
                        _ => return Err(E2EError::Exec("putfield on non-object".into())),
                    }
                }
                "invokevirtual" | "invokestatic" | "invokespecial" => {
                    let (owner, name, desc) = split_member(operand)?;
                    let (argc, returns) = parse_descriptor(&desc)?;
                    let mut args = Vec::with_capacity(argc);
                    for _ in 0..argc {
                        args.push(frame.pop()?);
                    }
                    args.reverse();
                    let receiver = if instr.op == "invokestatic" {
                        None
                    } else {
                        Some(frame.pop()?)
                    };

                    let result = if name == "<init>" {
                        None
                    } else if owner == self.class.name {
                        self.invoke(&name, receiver, args)?
                    } else {
                        self.external_calls
                            .push((format!("{}/{}", owner, name), args));
                        returns.then_some(Value::Int(0))
                    };

                    match (result, returns) {
                        (Some(value), true) => frame.push(value)?,
                        (None, false) => {}
                        _ => return Err(E2EError::Exec(format!("bad return from {}", name))),
                    }
                }
                op if op.starts_with("if_icmp") || op.starts_with("if_acmp") => {
                    let b = frame.pop()?;
                    let a = frame.pop()?;
                    let taken = match (&op[7..], a, b) {
                        ("eq", a, b) => a == b,
                        ("ne", a, b) => a != b,
                        (cc, Value::Int(a), Value::Int(b)) => match cc {
                            "lt" => a < b,
                            "le" => a <= b,
                            "gt" => a > b,
                            "ge" => a >= b,
                            _ => return Err(E2EError::Exec(format!("bad branch {}", op))),
                        },
                        _ => return Err(E2EError::Exec(format!("bad operands for {}", op))),
                    };
                    if taken {
                        pc = frame.target(operand)?;
                    }
                }
                "ifne" => {
                    if frame.pop()?.as_int()? != 0 {
                        pc = frame.target(operand)?;
                    }
                }
                "goto" => pc = frame.target(operand)?,
                "ireturn" | "areturn" => {
                    let value = frame.pop()?;
                    frame.expect_empty()?;
                    return Ok(Some(value));
                }
                "return" => {
                    frame.expect_empty()?;
                    return Ok(None);
                }
                other => return Err(E2EError::Exec(format!("unsupported instruction {}", other))),
            }
        }
    }
}

struct Frame<'m> {
    method: &'m AsmMethod,
    stack: Vec<Value>,
    locals: Vec<Value>,
    peak: usize,
}

impl Frame<'_> {
    fn push(&mut self, value: Value) -> E2EResult<()> {
        if self.stack.len() >= self.method.max_stack {
            return Err(E2EError::Exec(format!(
                "{}: stack exceeds .limit stack {}",
                self.method.name, self.method.max_stack
            )));
        }
        self.stack.push(value);
        self.peak = self.peak.max(self.stack.len());
        Ok(())
    }

    fn pop(&mut self) -> E2EResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| E2EError::Exec(format!("{}: stack underflow", self.method.name)))
    }

    fn local(&self, slot: usize) -> E2EResult<Value> {
        self.locals.get(slot).copied().ok_or_else(|| {
            E2EError::Exec(format!(
                "{}: slot {} beyond .limit locals",
                self.method.name, slot
            ))
        })
    }

    fn set_local(&mut self, slot: usize, value: Value) -> E2EResult<()> {
        let name = &self.method.name;
        let cell = self
            .locals
            .get_mut(slot)
            .ok_or_else(|| E2EError::Exec(format!("{}: slot {} beyond .limit locals", name, slot)))?;
        *cell = value;
        Ok(())
    }

    fn target(&self, label: &str) -> E2EResult<usize> {
        self.method
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| E2EError::Exec(format!("undefined label {}", label)))
    }

    fn expect_empty(&self) -> E2EResult<()> {
        if self.stack.is_empty() {
            Ok(())
        } else {
            Err(E2EError::Exec(format!(
                "{}: {} values left on the stack at return",
                self.method.name,
                self.stack.len()
            )))
        }
    }
}

fn parse_int(text: &str) -> E2EResult<i32> {
    text.parse()
        .map_err(|_| E2EError::Assemble(format!("bad integer {}", text)))
}

/// Slot of `iload_2` or `iload 7`
fn slot_of(op: &str, operand: &str) -> E2EResult<usize> {
    let text = match op.split_once('_') {
        Some((_, n)) => n,
        None => operand,
    };
    text.parse()
        .map_err(|_| E2EError::Assemble(format!("bad slot in {} {}", op, operand)))
}
