//! Error types shared by the evaluator, the encoder and the JIT driver.

use thiserror::Error;

/// Failure of integer arithmetic on a concrete tree.
///
/// Raised by the reference evaluator and, when arithmetic checking is enabled,
/// by the compiler before any code is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
    /// `i64::MIN / -1`, which faults on x86-64 like a zero divisor.
    #[error("integer overflow in division")]
    Overflow,
}

/// Error type for executable memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory allocation failed")]
    AllocationFailed,
    #[error("memory protection change failed")]
    ProtectionFailed,
    #[error("invalid memory size")]
    InvalidSize,
}

/// Errors produced while compiling or running an expression.
#[derive(Debug, Error)]
pub enum JitError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("unsupported operation code {code}")]
    UnsupportedOperation { code: u8 },

    #[error("code buffer overflow: {needed} bytes at offset {offset} exceed capacity {capacity}")]
    BufferOverflow {
        offset: usize,
        needed: usize,
        capacity: usize,
    },

    #[error("executable memory: {0}")]
    Memory(#[from] MemoryError),

    #[error("generated code can only run on x86-64 hosts")]
    UnsupportedTarget,

    #[error("{0}")]
    Config(String),
}

impl JitError {
    /// Whether the error means generated code can no longer be trusted.
    ///
    /// Fatal errors come from codegen contract violations. The binary aborts on
    /// them; library callers decide for themselves.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JitError::UnsupportedOperation { .. } | JitError::BufferOverflow { .. }
        )
    }
}
