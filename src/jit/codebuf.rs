//! Code buffer backed by executable memory.
//!
//! Bytes are encoded straight into an mmap region. The buffer has a fixed
//! capacity and a write cursor that never moves past it. `finalize` seals the
//! region and hands back something that can be called.

use super::assembler;
use super::memory::ExecutableMemory;
use super::ops::Operation;
use super::x86_64::Instruction;
use crate::error::JitError;

/// A writable region receiving machine code.
pub struct CodeBuffer {
    memory: ExecutableMemory,
    capacity: usize,
    cursor: usize,
}

impl CodeBuffer {
    /// Allocate a buffer that accepts up to `capacity` bytes.
    pub fn allocate(capacity: usize) -> Result<Self, JitError> {
        let memory = ExecutableMemory::new(capacity)?;
        Ok(Self {
            memory,
            capacity,
            cursor: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current write offset.
    pub fn offset(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Bytes written so far.
    pub fn code(&self) -> &[u8] {
        &self.memory.as_slice()[..self.cursor]
    }

    /// Encode an abstract operation at the cursor.
    pub fn emit(&mut self, operation: &Operation) -> Result<usize, JitError> {
        let cursor = self.cursor;
        self.cursor = assembler::encode_operation(operation, self.writable()?, cursor)?;
        Ok(self.cursor)
    }

    pub fn emit_all(&mut self, operations: &[Operation]) -> Result<usize, JitError> {
        for op in operations {
            self.emit(op)?;
        }
        Ok(self.cursor)
    }

    /// Encode one concrete instruction at the cursor.
    pub fn emit_instruction(
        &mut self,
        instruction: Instruction,
        payload: u64,
    ) -> Result<usize, JitError> {
        let cursor = self.cursor;
        self.cursor = assembler::encode(instruction, payload, self.writable()?, cursor)?;
        Ok(self.cursor)
    }

    /// Make the region executable. No further writes are possible.
    pub fn finalize(mut self) -> Result<ExecutableCode, JitError> {
        self.memory.make_executable()?;
        Ok(ExecutableCode {
            memory: self.memory,
            len: self.cursor,
        })
    }

    /// The region limited to `capacity`, so the encoder's bound is ours and
    /// not the page-rounded mapping size.
    fn writable(&mut self) -> Result<&mut [u8], JitError> {
        let capacity = self.capacity;
        self.memory
            .as_mut_slice()
            .map(|slice| &mut slice[..capacity])
            .ok_or(JitError::Memory(crate::error::MemoryError::ProtectionFailed))
    }
}

/// Sealed machine code.
pub struct ExecutableCode {
    memory: ExecutableMemory,
    len: usize,
}

impl ExecutableCode {
    pub fn code(&self) -> &[u8] {
        &self.memory.as_slice()[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the start of the code as a function pointer.
    ///
    /// # Safety
    /// `F` must be an `extern "C"` function pointer type matching what the
    /// code expects and returns.
    pub unsafe fn entry_point<F: Copy>(&self) -> F {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
        let ptr = self.memory.as_ptr();
        unsafe { std::mem::transmute_copy(&ptr) }
    }

    /// Call the code as `extern "C" fn() -> i64`.
    ///
    /// # Safety
    /// The buffer must hold a complete function that keeps the native stack
    /// balanced, preserves callee-saved registers and ends in a return.
    #[cfg(target_arch = "x86_64")]
    pub unsafe fn invoke(&self) -> Result<i64, JitError> {
        let func: extern "C" fn() -> i64 = unsafe { self.entry_point() };
        Ok(func())
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub unsafe fn invoke(&self) -> Result<i64, JitError> {
        Err(JitError::UnsupportedTarget)
    }

    /// Call the code with two arguments in the parameter registers.
    ///
    /// # Safety
    /// Same requirements as [`ExecutableCode::invoke`].
    #[cfg(target_arch = "x86_64")]
    pub unsafe fn invoke_with(&self, first: i64, second: i64) -> Result<i64, JitError> {
        let func: extern "C" fn(i64, i64) -> i64 = unsafe { self.entry_point() };
        Ok(func(first, second))
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub unsafe fn invoke_with(&self, _first: i64, _second: i64) -> Result<i64, JitError> {
        Err(JitError::UnsupportedTarget)
    }
}
