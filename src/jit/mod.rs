//! JIT compilation of expression trees to x86-64.
//!
//! - `ops`: the abstract operation set
//! - `x86_64`: the instruction descriptor table
//! - `assembler`: table-driven encoder
//! - `codegen`: tree to operation sequence
//! - `codebuf` / `memory`: executable buffers
//! - `compiler`: the driver tying them together
//!
//! This module is only compiled when the `jit` feature is enabled.

pub mod assembler;
pub mod codebuf;
pub mod codegen;
pub mod compiler;
mod memory;
pub mod ops;
pub mod x86_64;

pub use codebuf::{CodeBuffer, ExecutableCode};
pub use compiler::{CompiledExpr, JitCompiler};
pub use memory::ExecutableMemory;
pub use ops::Operation;
