//! Java-- Compiler Backend - typed AST to Jasmin
//!
//! Lowers a well-typed Java-- class to a three-address IR, assigns local
//! variable slots and emits Jasmin assembly with exact stack limits.
//!
//! ```text
//! Program + SymbolTable -> [optimize] -> lower -> allocate -> [verify] -> emit
//! ```

pub mod codegen;
pub mod error;
pub mod ir;
pub mod lower;
pub mod optimize;
pub mod options;
pub mod regalloc;
pub mod types;

pub use codegen::{emit_class, JasminEmitter};
pub use error::{CompileError, CompileResult};
pub use ir::{IrClass, IrMethod, PrettyPrint};
pub use lower::{lower_program, Lowerer, LoweringContext};
pub use optimize::Optimizer;
pub use options::CompilerOptions;
pub use regalloc::allocate_registers;

use jmm_ast::{Program, SymbolTable};

/// Main compiler entry point
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a program into Jasmin assembly text
    pub fn compile(&self, program: &Program, table: &SymbolTable) -> CompileResult<String> {
        let class = self.lower(program, table)?;
        emit_class(&class)
    }

    /// Lower and allocate without emitting
    pub fn lower(&self, program: &Program, table: &SymbolTable) -> CompileResult<IrClass> {
        self.options.validate()?;

        let optimized;
        let program = if self.options.optimize {
            optimized = Optimizer::new(table, self.options.max_optimize_rounds).optimize(program);
            &optimized
        } else {
            program
        };

        let mut class = lower_program(program, table)?;
        allocate_registers(&mut class)?;
        if self.options.verify_ir {
            ir::verify_class(&class)?;
        }
        Ok(class)
    }
}
