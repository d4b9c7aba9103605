//! Compiler options
//!
//! Read from the `[compiler]` table of a TOML file by the driver, or built
//! directly.

use crate::error::{CompileError, CompileResult};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CompilerOptions {
    /// Run constant propagation and folding before lowering
    pub optimize: bool,
    /// Check IR invariants after register allocation
    pub verify_ir: bool,
    /// Upper bound on optimization rounds
    pub max_optimize_rounds: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            optimize: false,
            verify_ir: true,
            max_optimize_rounds: 32,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OptionsFile {
    #[serde(default)]
    compiler: CompilerOptions,
}

impl CompilerOptions {
    /// Parse the `[compiler]` table of a TOML document; other tables are ignored
    pub fn from_toml_str(source: &str) -> CompileResult<Self> {
        let file: OptionsFile = toml::from_str(source).map_err(|e| CompileError::InvalidOptions {
            message: e.to_string(),
        })?;
        file.compiler.validate()?;
        Ok(file.compiler)
    }

    pub fn validate(&self) -> CompileResult<()> {
        if self.max_optimize_rounds == 0 {
            return Err(CompileError::InvalidOptions {
                message: "maxOptimizeRounds must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }
}
