//! Abstract operations emitted by the code generator.
//!
//! The set is closed. Each operation is lowered to one or more concrete
//! instructions by the assembler.

use std::fmt;

use crate::error::JitError;

/// A machine-independent operation with its payload, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A = A + B
    Add,
    /// A = A - B
    Sub,
    /// A = A * B
    Mult,
    /// A = A / B
    Div,
    /// Push a literal onto the native stack.
    PushImmediate(i64),
    /// Push an absolute address onto the native stack.
    PushAddress(usize),
    PushAccumA,
    PushAccumB,
    PopAccumA,
    PopAccumB,
    /// Pop into the first argument register.
    PopParam1,
    /// Pop into the second argument register.
    PopParam2,
    /// Call the native function at an absolute address.
    Call(usize),
    /// Return accumulator A.
    Return,
}

impl Operation {
    /// Numeric tag of the operation.
    pub fn code(&self) -> u8 {
        match self {
            Operation::Add => 0,
            Operation::Sub => 1,
            Operation::Mult => 2,
            Operation::Div => 3,
            Operation::PushImmediate(_) => 4,
            Operation::PushAddress(_) => 5,
            Operation::PushAccumA => 6,
            Operation::PushAccumB => 7,
            Operation::PopAccumA => 8,
            Operation::PopAccumB => 9,
            Operation::PopParam1 => 10,
            Operation::PopParam2 => 11,
            Operation::Call(_) => 12,
            Operation::Return => 13,
        }
    }

    /// Rebuild an operation from its numeric tag and a raw 64-bit payload.
    ///
    /// The payload is ignored by operations that carry none. An unknown tag is
    /// a codegen contract violation and reported as `UnsupportedOperation`.
    pub fn decode(code: u8, payload: u64) -> Result<Self, JitError> {
        let op = match code {
            0 => Operation::Add,
            1 => Operation::Sub,
            2 => Operation::Mult,
            3 => Operation::Div,
            4 => Operation::PushImmediate(payload as i64),
            5 => Operation::PushAddress(payload as usize),
            6 => Operation::PushAccumA,
            7 => Operation::PushAccumB,
            8 => Operation::PopAccumA,
            9 => Operation::PopAccumB,
            10 => Operation::PopParam1,
            11 => Operation::PopParam2,
            12 => Operation::Call(payload as usize),
            13 => Operation::Return,
            _ => return Err(JitError::UnsupportedOperation { code }),
        };
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "ADD"),
            Operation::Sub => write!(f, "SUB"),
            Operation::Mult => write!(f, "MULT"),
            Operation::Div => write!(f, "DIV"),
            Operation::PushImmediate(value) => write!(f, "PUSH_IMMEDIATE {}", value),
            Operation::PushAddress(addr) => write!(f, "PUSH_ADDRESS {:#x}", addr),
            Operation::PushAccumA => write!(f, "PUSH_ACCUM_A"),
            Operation::PushAccumB => write!(f, "PUSH_ACCUM_B"),
            Operation::PopAccumA => write!(f, "POP_ACCUM_A"),
            Operation::PopAccumB => write!(f, "POP_ACCUM_B"),
            Operation::PopParam1 => write!(f, "POP_PARAM_1"),
            Operation::PopParam2 => write!(f, "POP_PARAM_2"),
            Operation::Call(addr) => write!(f, "CALL {:#x}", addr),
            Operation::Return => write!(f, "RETURN"),
        }
    }
}
