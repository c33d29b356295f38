//! Table-driven encoder.
//!
//! `encode` writes one concrete instruction described by the descriptor
//! table. `encode_operation` lowers an abstract operation to its instruction
//! sequence and encodes each of them. Both write into a caller-supplied byte
//! slice at a caller-supplied offset and return the offset past the written
//! bytes. Nothing is written unless everything fits.

use tracing::trace;

use super::ops::Operation;
use super::x86_64::{ADDRESS_WIDTH, Instruction, Payload};
use crate::error::JitError;

/// One concrete instruction and the raw payload it is encoded with.
type Step = (Instruction, u64);

/// Encode a single instruction at `offset`.
///
/// Address payloads are written at pointer width and immediates at their
/// declared width, both little-endian. Instructions without a payload ignore
/// `payload`.
pub fn encode(
    instruction: Instruction,
    payload: u64,
    buf: &mut [u8],
    offset: usize,
) -> Result<usize, JitError> {
    let desc = instruction.descriptor();
    ensure_capacity(buf, offset, desc.encoded_len())?;

    let mut offset = write_bytes(buf, offset, desc.opcode())?;
    offset = match desc.payload {
        Payload::None => offset,
        Payload::Address => write_le(buf, offset, payload, ADDRESS_WIDTH)?,
        Payload::Immediate { width } => write_le(buf, offset, payload, width)?,
    };
    Ok(offset)
}

/// Encode an abstract operation at `offset`.
pub fn encode_operation(
    operation: &Operation,
    buf: &mut [u8],
    offset: usize,
) -> Result<usize, JitError> {
    let (first, second) = lower(operation);
    ensure_capacity(buf, offset, operation_len(operation))?;
    trace!(offset, op = %operation, "encode");

    let mut offset = encode(first.0, first.1, buf, offset)?;
    if let Some((instruction, payload)) = second {
        offset = encode(instruction, payload, buf, offset)?;
    }
    Ok(offset)
}

/// Encode an operation given by its numeric tag.
///
/// Unknown tags fail with `UnsupportedOperation` before anything is written.
pub fn encode_raw(code: u8, payload: u64, buf: &mut [u8], offset: usize) -> Result<usize, JitError> {
    let operation = Operation::decode(code, payload)?;
    encode_operation(&operation, buf, offset)
}

/// Number of bytes `encode_operation` writes for `operation`.
pub fn operation_len(operation: &Operation) -> usize {
    let (first, second) = lower(operation);
    let mut len = first.0.descriptor().encoded_len();
    if let Some((instruction, _)) = second {
        len += instruction.descriptor().encoded_len();
    }
    len
}

/// Total encoded size of an operation sequence.
pub fn encoded_len(operations: &[Operation]) -> usize {
    operations.iter().map(operation_len).sum()
}

/// Concrete instructions realizing an operation, in emission order.
fn lower(operation: &Operation) -> (Step, Option<Step>) {
    match *operation {
        Operation::Add => ((Instruction::AddRaxRbx, 0), None),
        Operation::Sub => ((Instruction::SubRaxRbx, 0), None),
        Operation::Mult => ((Instruction::ImulRbx, 0), None),
        // RDX:RAX / RBX, so RDX must hold the sign extension of RAX first.
        Operation::Div => ((Instruction::Cqo, 0), Some((Instruction::IdivRbx, 0))),
        Operation::PushImmediate(value) => (
            (Instruction::MovRcxImm64, value as u64),
            Some((Instruction::PushRcx, 0)),
        ),
        Operation::PushAddress(addr) => (
            (Instruction::MovRcxAddr, addr as u64),
            Some((Instruction::PushRcx, 0)),
        ),
        Operation::PushAccumA => ((Instruction::PushRax, 0), None),
        Operation::PushAccumB => ((Instruction::PushRbx, 0), None),
        Operation::PopAccumA => ((Instruction::PopRax, 0), None),
        Operation::PopAccumB => ((Instruction::PopRbx, 0), None),
        Operation::PopParam1 => ((Instruction::PopRdi, 0), None),
        Operation::PopParam2 => ((Instruction::PopRsi, 0), None),
        Operation::Call(addr) => (
            (Instruction::MovRcxAddr, addr as u64),
            Some((Instruction::CallRcx, 0)),
        ),
        Operation::Return => ((Instruction::Ret, 0), None),
    }
}

fn ensure_capacity(buf: &[u8], offset: usize, needed: usize) -> Result<(), JitError> {
    match offset.checked_add(needed) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(JitError::BufferOverflow {
            offset,
            needed,
            capacity: buf.len(),
        }),
    }
}

fn write_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<usize, JitError> {
    ensure_capacity(buf, offset, bytes.len())?;
    let end = offset + bytes.len();
    buf[offset..end].copy_from_slice(bytes);
    Ok(end)
}

/// Write the low `width` bytes of `value`, little-endian.
fn write_le(buf: &mut [u8], offset: usize, value: u64, width: usize) -> Result<usize, JitError> {
    let bytes = value.to_le_bytes();
    write_bytes(buf, offset, &bytes[..width.min(bytes.len())])
}
