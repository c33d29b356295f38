//! exprjit - a minimal JIT for integer arithmetic expressions
//!
//! Build an [`Expr`] tree, compile it with [`jit::JitCompiler`] and call the
//! resulting native code. [`Expr::evaluate`] is the reference semantics the
//! generated code agrees with.

pub mod ast;
pub mod config;
pub mod dump;
pub mod error;
#[cfg(feature = "jit")]
pub mod jit;

// Re-export commonly used types
pub use ast::{BinaryOp, Expr, NodeKind};
pub use config::JitConfig;
pub use error::{ArithmeticError, JitError, MemoryError};
