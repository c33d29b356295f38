//! JIT driver: expression tree in, callable native code out.

use tracing::{debug, warn};

use super::assembler;
use super::codebuf::{CodeBuffer, ExecutableCode};
use super::codegen;
use super::ops::Operation;
use crate::ast::Expr;
use crate::config::JitConfig;
use crate::error::JitError;

/// Native code compiled from one expression.
pub struct CompiledExpr {
    code: ExecutableCode,
    operations: Vec<Operation>,
}

impl CompiledExpr {
    /// Run the generated function and return its value.
    pub fn invoke(&self) -> Result<i64, JitError> {
        // SAFETY: the code comes from `codegen::generate`, which emits a
        // balanced stack, restores RBX and ends in RET.
        unsafe { self.code.invoke() }
    }

    /// Encoded machine code.
    pub fn code(&self) -> &[u8] {
        self.code.code()
    }

    /// The operation sequence the code was encoded from.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

/// Compiles expression trees to x86-64 machine code.
pub struct JitCompiler {
    config: JitConfig,
}

impl JitCompiler {
    pub fn new(config: JitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JitConfig {
        &self.config
    }

    /// Compile `expr` to a callable function.
    ///
    /// With arithmetic checking on, trees the reference evaluator rejects are
    /// refused here. Such trees would otherwise fault in `idiv` at run time.
    pub fn compile(&self, expr: &Expr) -> Result<CompiledExpr, JitError> {
        if self.config.check_arithmetic {
            expr.evaluate()?;
        }

        let operations = codegen::generate(expr);
        let needed = assembler::encoded_len(&operations);
        debug!(
            nodes = expr.node_count(),
            depth = expr.depth(),
            operations = operations.len(),
            bytes = needed,
            "generated code for {}",
            expr
        );

        let capacity = if needed > self.config.code_capacity {
            warn!(
                configured = self.config.code_capacity,
                needed, "code capacity too small, growing buffer"
            );
            needed
        } else {
            self.config.code_capacity
        };

        let mut buf = CodeBuffer::allocate(capacity)?;
        buf.emit_all(&operations)?;
        let code = buf.finalize()?;
        debug!(bytes = code.len(), "compiled expression");

        Ok(CompiledExpr { code, operations })
    }

    /// Encode `expr` without allocating executable memory.
    pub fn assemble(&self, expr: &Expr) -> Result<Vec<u8>, JitError> {
        let operations = codegen::generate(expr);
        let mut bytes = vec![0u8; assembler::encoded_len(&operations)];
        let mut offset = 0;
        for op in &operations {
            offset = assembler::encode_operation(op, &mut bytes, offset)?;
        }
        debug_assert_eq!(offset, bytes.len());
        Ok(bytes)
    }
}

impl Default for JitCompiler {
    fn default() -> Self {
        Self::new(JitConfig::default())
    }
}
