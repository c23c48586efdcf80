//! Decoded Thumb instruction representation.
//!
//! Provides the `Instruction` enum produced by the decoder and consumed by the execute
//! stage, together with the operand sub-enums shared between instruction classes.

/// Shift operation of the immediate-shift encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOp {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
}

/// Operation of the register data-processing group (`0100 00xx xx`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    /// Bitwise AND.
    And,
    /// Bitwise exclusive OR.
    Eor,
    /// Logical shift left by register.
    Lsl,
    /// Logical shift right by register.
    Lsr,
    /// Arithmetic shift right by register.
    Asr,
    /// Add with carry.
    Adc,
    /// Subtract with carry.
    Sbc,
    /// Rotate right by register.
    Ror,
    /// Test (AND, flags only).
    Tst,
    /// Reverse subtract from zero (NEG).
    Rsb,
    /// Compare.
    Cmp,
    /// Compare negative.
    Cmn,
    /// Bitwise OR.
    Orr,
    /// Multiply.
    Mul,
    /// Bit clear.
    Bic,
    /// Bitwise NOT.
    Mvn,
}

/// Sign/zero extension operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendOp {
    /// Sign-extend halfword.
    Sxth,
    /// Sign-extend byte.
    Sxtb,
    /// Zero-extend halfword.
    Uxth,
    /// Zero-extend byte.
    Uxtb,
}

/// Byte-reversal operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReverseOp {
    /// Reverse all four bytes.
    Rev,
    /// Reverse bytes within each halfword.
    Rev16,
    /// Reverse the low halfword and sign-extend.
    Revsh,
}

/// Width and signedness of a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadWidth {
    /// 32-bit.
    Word,
    /// Zero-extended 16-bit.
    Half,
    /// Zero-extended 8-bit.
    Byte,
    /// Sign-extended 16-bit.
    SignedHalf,
    /// Sign-extended 8-bit.
    SignedByte,
}

/// Width of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreWidth {
    /// 32-bit.
    Word,
    /// 16-bit.
    Half,
    /// 8-bit.
    Byte,
}

/// Effective-address form of a load or store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Address {
    /// `[Rn, #offset]` (including SP-relative forms with `rn == 13`).
    Imm {
        /// Base register.
        rn: u8,
        /// Byte offset, already scaled.
        offset: u32,
    },
    /// `[Rn, Rm]`.
    Reg {
        /// Base register.
        rn: u8,
        /// Offset register.
        rm: u8,
    },
    /// `[PC, #offset]` relative to the word-aligned PC.
    Literal {
        /// Byte offset, already scaled.
        offset: u32,
    },
}

/// Hint instructions of the `1011 1111 xxxx 0000` group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hint {
    /// No operation.
    Nop,
    /// Yield.
    Yield,
    /// Wait for event.
    Wfe,
    /// Wait for interrupt.
    Wfi,
    /// Send event.
    Sev,
}

/// Memory barrier flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Barrier {
    /// Data synchronisation barrier.
    Dsb,
    /// Data memory barrier.
    Dmb,
    /// Instruction synchronisation barrier.
    Isb,
}

/// A decoded ARMv6-M instruction.
///
/// Register fields are raw 0-15 indices. Immediates are stored already scaled and
/// sign-extended so the execute stage never re-derives them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `LSLS/LSRS/ASRS Rd, Rm, #imm5` (`MOVS Rd, Rm` when LSL #0).
    ShiftImm {
        /// Shift type.
        op: ShiftOp,
        /// Destination.
        rd: u8,
        /// Source.
        rm: u8,
        /// Encoded shift amount (0 means 32 for LSR/ASR).
        imm5: u8,
    },
    /// `ADDS Rd, Rn, Rm`.
    AddReg {
        /// Destination.
        rd: u8,
        /// First operand.
        rn: u8,
        /// Second operand.
        rm: u8,
    },
    /// `SUBS Rd, Rn, Rm`.
    SubReg {
        /// Destination.
        rd: u8,
        /// First operand.
        rn: u8,
        /// Second operand.
        rm: u8,
    },
    /// `ADDS Rd, Rn, #imm3`, and `ADDS Rdn, #imm8` with `rd == rn`.
    AddImm {
        /// Destination.
        rd: u8,
        /// First operand.
        rn: u8,
        /// Immediate.
        imm: u32,
    },
    /// `SUBS Rd, Rn, #imm3`, and `SUBS Rdn, #imm8` with `rd == rn`.
    SubImm {
        /// Destination.
        rd: u8,
        /// First operand.
        rn: u8,
        /// Immediate.
        imm: u32,
    },
    /// `MOVS Rd, #imm8`.
    MovImm {
        /// Destination.
        rd: u8,
        /// Immediate.
        imm: u32,
    },
    /// `CMP Rn, #imm8`.
    CmpImm {
        /// Operand.
        rn: u8,
        /// Immediate.
        imm: u32,
    },
    /// Register data-processing group, `<op>S Rdn, Rm`.
    Alu {
        /// Operation.
        op: AluOp,
        /// Destination and first operand.
        rdn: u8,
        /// Second operand.
        rm: u8,
    },
    /// `ADD Rdn, Rm` with high registers, no flags.
    AddHigh {
        /// Destination and first operand.
        rdn: u8,
        /// Second operand.
        rm: u8,
    },
    /// `CMP Rn, Rm` with high registers.
    CmpHigh {
        /// First operand.
        rn: u8,
        /// Second operand.
        rm: u8,
    },
    /// `MOV Rd, Rm` with high registers, no flags.
    MovHigh {
        /// Destination.
        rd: u8,
        /// Source.
        rm: u8,
    },
    /// `BX Rm`.
    Bx {
        /// Target register.
        rm: u8,
    },
    /// `BLX Rm`.
    Blx {
        /// Target register.
        rm: u8,
    },
    /// Loads of every width and addressing form.
    Load {
        /// Access width.
        width: LoadWidth,
        /// Destination.
        rt: u8,
        /// Effective address.
        addr: Address,
    },
    /// Stores of every width and addressing form.
    Store {
        /// Access width.
        width: StoreWidth,
        /// Source.
        rt: u8,
        /// Effective address.
        addr: Address,
    },
    /// `ADR Rd, label`.
    Adr {
        /// Destination.
        rd: u8,
        /// Offset from the word-aligned PC.
        imm: u32,
    },
    /// `ADD Rd, SP, #imm8`.
    AddSpImm {
        /// Destination.
        rd: u8,
        /// Scaled immediate.
        imm: u32,
    },
    /// `ADD SP, #imm7` / `SUB SP, #imm7`.
    AdjustSp {
        /// Scaled immediate.
        imm: u32,
        /// Subtract instead of add.
        subtract: bool,
    },
    /// `SXTH/SXTB/UXTH/UXTB Rd, Rm`.
    Extend {
        /// Operation.
        op: ExtendOp,
        /// Destination.
        rd: u8,
        /// Source.
        rm: u8,
    },
    /// `REV/REV16/REVSH Rd, Rm`.
    Reverse {
        /// Operation.
        op: ReverseOp,
        /// Destination.
        rd: u8,
        /// Source.
        rm: u8,
    },
    /// `PUSH {list}`; bit 14 of the mask is LR.
    Push {
        /// Register mask.
        registers: u16,
    },
    /// `POP {list}`; bit 15 of the mask is PC.
    Pop {
        /// Register mask.
        registers: u16,
    },
    /// `STM Rn!, {list}`.
    Stm {
        /// Base register.
        rn: u8,
        /// Low-register mask.
        registers: u8,
    },
    /// `LDM Rn{!}, {list}`; writeback unless `rn` is in the list.
    Ldm {
        /// Base register.
        rn: u8,
        /// Low-register mask.
        registers: u8,
    },
    /// `CPSIE i` / `CPSID i`.
    Cps {
        /// `true` for CPSID.
        disable: bool,
    },
    /// `BKPT #imm8`.
    Bkpt {
        /// Immediate.
        imm: u8,
    },
    /// NOP-class hints.
    Hint(Hint),
    /// `B<cond> label`.
    BranchCond {
        /// Condition code 0-13.
        cond: u8,
        /// Signed offset from PC+4.
        offset: i32,
    },
    /// `B label`.
    Branch {
        /// Signed offset from PC+4.
        offset: i32,
    },
    /// `SVC #imm8`.
    Svc {
        /// Immediate.
        imm: u8,
    },
    /// `UDF #imm` (16- or 32-bit). Always undefined.
    Udf {
        /// Immediate.
        imm: u16,
        /// 32-bit encoding.
        wide: bool,
    },
    /// `BL label` (32-bit).
    Bl {
        /// Signed offset from PC+4.
        offset: i32,
    },
    /// `MSR <spec_reg>, Rn` (32-bit).
    Msr {
        /// Special register number.
        sysm: u8,
        /// Source.
        rn: u8,
    },
    /// `MRS Rd, <spec_reg>` (32-bit).
    Mrs {
        /// Destination.
        rd: u8,
        /// Special register number.
        sysm: u8,
    },
    /// `DSB/DMB/ISB` (32-bit).
    Barrier(Barrier),
}

impl Instruction {
    /// Encoded size in bytes.
    pub const fn size(&self) -> u32 {
        match self {
            Self::Bl { .. } | Self::Msr { .. } | Self::Mrs { .. } | Self::Barrier(_) => 4,
            Self::Udf { wide: true, .. } => 4,
            _ => 2,
        }
    }
}
