//! x86-64 instruction descriptors.
//!
//! Every concrete instruction the encoder can emit is described here: its
//! opcode bytes and the shape of the payload that follows them. Accumulator A
//! is RAX, accumulator B is RBX, the parameter slots are RDI and RSI (System V
//! AMD64), and RCX is the scratch register for 64-bit loads.

/// Longest legal x86-64 instruction.
pub const MAX_OPCODE_LEN: usize = 15;

/// Width of an absolute address payload.
pub const ADDRESS_WIDTH: usize = std::mem::size_of::<usize>();

/// What follows the opcode bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    None,
    /// Little-endian immediate of `width` bytes.
    Immediate { width: usize },
    /// Absolute pointer-width address, written verbatim.
    Address,
}

/// Byte layout of one concrete instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDescriptor {
    pub name: &'static str,
    opcode: [u8; MAX_OPCODE_LEN],
    opcode_len: usize,
    pub payload: Payload,
}

impl InstructionDescriptor {
    const fn new(name: &'static str, bytes: &[u8], payload: Payload) -> Self {
        let mut opcode = [0u8; MAX_OPCODE_LEN];
        let mut i = 0;
        while i < bytes.len() {
            opcode[i] = bytes[i];
            i += 1;
        }
        Self {
            name,
            opcode,
            opcode_len: bytes.len(),
            payload,
        }
    }

    pub fn opcode(&self) -> &[u8] {
        &self.opcode[..self.opcode_len]
    }

    pub fn opcode_len(&self) -> usize {
        self.opcode_len
    }

    pub fn carries_address(&self) -> bool {
        matches!(self.payload, Payload::Address)
    }

    pub fn carries_immediate(&self) -> bool {
        matches!(self.payload, Payload::Immediate { .. })
    }

    pub fn payload_width(&self) -> usize {
        match self.payload {
            Payload::None => 0,
            Payload::Immediate { width } => width,
            Payload::Address => ADDRESS_WIDTH,
        }
    }

    /// Total encoded size.
    pub fn encoded_len(&self) -> usize {
        self.opcode_len + self.payload_width()
    }
}

/// Concrete instructions, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Instruction {
    /// ADD RAX, RBX
    AddRaxRbx = 0,
    /// SUB RAX, RBX
    SubRaxRbx,
    /// IMUL RBX (RDX:RAX = RAX * RBX)
    ImulRbx,
    /// CQO, sign-extends RAX into RDX before a signed divide
    Cqo,
    /// IDIV RBX (RAX = RDX:RAX / RBX)
    IdivRbx,
    PushRax,
    PushRbx,
    PushRcx,
    PushRdi,
    PushRsi,
    PopRax,
    PopRbx,
    PopRdi,
    PopRsi,
    /// MOV RDI, RAX
    MovRdiRax,
    /// MOV RAX, imm32 (sign-extended)
    MovRaxImm32,
    /// MOV RCX, imm64 with a literal payload
    MovRcxImm64,
    /// MOV RCX, imm64 with an address payload
    MovRcxAddr,
    /// CALL RCX
    CallRcx,
    Ret,
}

impl Instruction {
    pub const COUNT: usize = 20;

    pub const ALL: [Instruction; Instruction::COUNT] = [
        Instruction::AddRaxRbx,
        Instruction::SubRaxRbx,
        Instruction::ImulRbx,
        Instruction::Cqo,
        Instruction::IdivRbx,
        Instruction::PushRax,
        Instruction::PushRbx,
        Instruction::PushRcx,
        Instruction::PushRdi,
        Instruction::PushRsi,
        Instruction::PopRax,
        Instruction::PopRbx,
        Instruction::PopRdi,
        Instruction::PopRsi,
        Instruction::MovRdiRax,
        Instruction::MovRaxImm32,
        Instruction::MovRcxImm64,
        Instruction::MovRcxAddr,
        Instruction::CallRcx,
        Instruction::Ret,
    ];

    pub fn descriptor(self) -> &'static InstructionDescriptor {
        &DESCRIPTORS[self as usize]
    }
}

/// The instruction table, indexed by `Instruction`.
pub static DESCRIPTORS: [InstructionDescriptor; Instruction::COUNT] = [
    InstructionDescriptor::new("add rax, rbx", &[0x48, 0x01, 0xD8], Payload::None),
    InstructionDescriptor::new("sub rax, rbx", &[0x48, 0x29, 0xD8], Payload::None),
    InstructionDescriptor::new("imul rbx", &[0x48, 0xF7, 0xEB], Payload::None),
    InstructionDescriptor::new("cqo", &[0x48, 0x99], Payload::None),
    InstructionDescriptor::new("idiv rbx", &[0x48, 0xF7, 0xFB], Payload::None),
    InstructionDescriptor::new("push rax", &[0x50], Payload::None),
    InstructionDescriptor::new("push rbx", &[0x53], Payload::None),
    InstructionDescriptor::new("push rcx", &[0x51], Payload::None),
    InstructionDescriptor::new("push rdi", &[0x57], Payload::None),
    InstructionDescriptor::new("push rsi", &[0x56], Payload::None),
    InstructionDescriptor::new("pop rax", &[0x58], Payload::None),
    InstructionDescriptor::new("pop rbx", &[0x5B], Payload::None),
    InstructionDescriptor::new("pop rdi", &[0x5F], Payload::None),
    InstructionDescriptor::new("pop rsi", &[0x5E], Payload::None),
    InstructionDescriptor::new("mov rdi, rax", &[0x48, 0x89, 0xC7], Payload::None),
    InstructionDescriptor::new("mov rax, imm32", &[0x48, 0xC7, 0xC0], Payload::Immediate { width: 4 }),
    InstructionDescriptor::new("mov rcx, imm64", &[0x48, 0xB9], Payload::Immediate { width: 8 }),
    InstructionDescriptor::new("mov rcx, addr", &[0x48, 0xB9], Payload::Address),
    InstructionDescriptor::new("call rcx", &[0xFF, 0xD1], Payload::None),
    InstructionDescriptor::new("ret", &[0xC3], Payload::None),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for (index, instr) in Instruction::ALL.iter().enumerate() {
            assert_eq!(*instr as usize, index);
        }
    }

    #[test]
    fn test_opcode_lengths_in_range() {
        for instr in Instruction::ALL {
            let desc = instr.descriptor();
            assert!(desc.opcode_len() >= 1);
            assert!(desc.opcode_len() <= MAX_OPCODE_LEN);
            assert_eq!(desc.opcode().len(), desc.opcode_len());
        }
    }

    #[test]
    fn test_payload_shapes() {
        let imm32 = Instruction::MovRaxImm32.descriptor();
        assert!(imm32.carries_immediate());
        assert!(!imm32.carries_address());
        assert_eq!(imm32.payload_width(), 4);
        assert_eq!(imm32.encoded_len(), 7);

        let imm64 = Instruction::MovRcxImm64.descriptor();
        assert_eq!(imm64.payload_width(), 8);
        assert_eq!(imm64.encoded_len(), 10);

        let addr = Instruction::MovRcxAddr.descriptor();
        assert!(addr.carries_address());
        assert_eq!(addr.payload_width(), ADDRESS_WIDTH);
        // Same opcode bytes; only the payload source differs.
        assert_eq!(addr.opcode(), imm64.opcode());

        let ret = Instruction::Ret.descriptor();
        assert_eq!(ret.payload, Payload::None);
        assert_eq!(ret.encoded_len(), 1);
    }

    #[test]
    fn test_known_encodings() {
        // ModR/M 0xD8: mod=11, reg=RBX, rm=RAX
        assert_eq!(Instruction::AddRaxRbx.descriptor().opcode(), &[0x48, 0x01, 0xD8]);
        assert_eq!(Instruction::SubRaxRbx.descriptor().opcode(), &[0x48, 0x29, 0xD8]);
        // /5 and /7 extensions of F7 with rm=RBX
        assert_eq!(Instruction::ImulRbx.descriptor().opcode(), &[0x48, 0xF7, 0xEB]);
        assert_eq!(Instruction::IdivRbx.descriptor().opcode(), &[0x48, 0xF7, 0xFB]);
        assert_eq!(Instruction::CallRcx.descriptor().opcode(), &[0xFF, 0xD1]);
    }
}
