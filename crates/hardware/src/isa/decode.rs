//! Thumb instruction decoder.
//!
//! This module decodes ARMv6-M Thumb encodings into [`Instruction`] values. It handles:
//! 1. **16-bit Encodings:** The full Thumb-1 instruction space, dispatched on bits 15:11.
//! 2. **32-bit Encodings:** `BL`, `MSR`, `MRS`, the barriers and `UDF.W`.
//! 3. **Immediates:** Scaling and sign extension so execute never re-derives them.
//!
//! Encodings with no ARMv6-M meaning, and UNPREDICTABLE forms such as empty register
//! lists, decode to `None`; the core turns that into a hard error.

use crate::isa::instruction::{
    Address, AluOp, Barrier, ExtendOp, Hint, Instruction, LoadWidth, ReverseOp, ShiftOp,
    StoreWidth,
};

/// Register data-processing opcodes indexed by bits 9:6.
const ALU_OPS: [AluOp; 16] = [
    AluOp::And,
    AluOp::Eor,
    AluOp::Lsl,
    AluOp::Lsr,
    AluOp::Asr,
    AluOp::Adc,
    AluOp::Sbc,
    AluOp::Ror,
    AluOp::Tst,
    AluOp::Rsb,
    AluOp::Cmp,
    AluOp::Cmn,
    AluOp::Orr,
    AluOp::Mul,
    AluOp::Bic,
    AluOp::Mvn,
];

/// Index of SP when used as an implicit base register.
const SP: u8 = 13;

/// Whether a halfword is the first half of a 32-bit encoding.
#[inline(always)]
pub const fn is_wide(first: u16) -> bool {
    (first >> 11) >= 0b11101
}

/// Sign-extends the low `bits` bits of `value`.
#[inline(always)]
pub const fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Decodes one instruction.
///
/// # Arguments
///
/// * `first` - The halfword at PC.
/// * `second` - The halfword at PC+2; ignored unless `first` starts a 32-bit encoding.
///
/// # Returns
///
/// The decoded instruction, or `None` if the encoding is undefined.
pub fn decode(first: u16, second: u16) -> Option<Instruction> {
    if is_wide(first) {
        decode_wide(first, second)
    } else {
        decode_narrow(first)
    }
}

#[inline(always)]
const fn reg(op: u16, shift: u32) -> u8 {
    ((op >> shift) & 7) as u8
}

fn decode_narrow(op: u16) -> Option<Instruction> {
    let imm5 = u32::from((op >> 6) & 0x1F);
    let imm8 = u32::from(op & 0xFF);
    let inst = match op >> 11 {
        0b00000..=0b00010 => {
            let kind = match op >> 11 {
                0b00000 => ShiftOp::Lsl,
                0b00001 => ShiftOp::Lsr,
                _ => ShiftOp::Asr,
            };
            Instruction::ShiftImm {
                op: kind,
                rd: reg(op, 0),
                rm: reg(op, 3),
                imm5: imm5 as u8,
            }
        }
        0b00011 => {
            let (rd, rn) = (reg(op, 0), reg(op, 3));
            match (op >> 9) & 3 {
                0 => Instruction::AddReg { rd, rn, rm: reg(op, 6) },
                1 => Instruction::SubReg { rd, rn, rm: reg(op, 6) },
                2 => Instruction::AddImm { rd, rn, imm: u32::from((op >> 6) & 7) },
                _ => Instruction::SubImm { rd, rn, imm: u32::from((op >> 6) & 7) },
            }
        }
        0b00100 => Instruction::MovImm { rd: reg(op, 8), imm: imm8 },
        0b00101 => Instruction::CmpImm { rn: reg(op, 8), imm: imm8 },
        0b00110 => Instruction::AddImm { rd: reg(op, 8), rn: reg(op, 8), imm: imm8 },
        0b00111 => Instruction::SubImm { rd: reg(op, 8), rn: reg(op, 8), imm: imm8 },
        0b01000 => return Some(decode_data_processing(op)),
        0b01001 => Instruction::Load {
            width: LoadWidth::Word,
            rt: reg(op, 8),
            addr: Address::Literal { offset: imm8 << 2 },
        },
        0b01010 | 0b01011 => {
            let rt = reg(op, 0);
            let addr = Address::Reg { rn: reg(op, 3), rm: reg(op, 6) };
            match (op >> 9) & 7 {
                0 => Instruction::Store { width: StoreWidth::Word, rt, addr },
                1 => Instruction::Store { width: StoreWidth::Half, rt, addr },
                2 => Instruction::Store { width: StoreWidth::Byte, rt, addr },
                3 => Instruction::Load { width: LoadWidth::SignedByte, rt, addr },
                4 => Instruction::Load { width: LoadWidth::Word, rt, addr },
                5 => Instruction::Load { width: LoadWidth::Half, rt, addr },
                6 => Instruction::Load { width: LoadWidth::Byte, rt, addr },
                _ => Instruction::Load { width: LoadWidth::SignedHalf, rt, addr },
            }
        }
        0b01100..=0b10001 => {
            let rt = reg(op, 0);
            let rn = reg(op, 3);
            let load = op & 0x0800 != 0;
            let (store_width, load_width, scale) = match op >> 12 {
                0b0110 => (StoreWidth::Word, LoadWidth::Word, 2),
                0b0111 => (StoreWidth::Byte, LoadWidth::Byte, 0),
                _ => (StoreWidth::Half, LoadWidth::Half, 1),
            };
            let addr = Address::Imm { rn, offset: imm5 << scale };
            if load {
                Instruction::Load { width: load_width, rt, addr }
            } else {
                Instruction::Store { width: store_width, rt, addr }
            }
        }
        0b10010 => Instruction::Store {
            width: StoreWidth::Word,
            rt: reg(op, 8),
            addr: Address::Imm { rn: SP, offset: imm8 << 2 },
        },
        0b10011 => Instruction::Load {
            width: LoadWidth::Word,
            rt: reg(op, 8),
            addr: Address::Imm { rn: SP, offset: imm8 << 2 },
        },
        0b10100 => Instruction::Adr { rd: reg(op, 8), imm: imm8 << 2 },
        0b10101 => Instruction::AddSpImm { rd: reg(op, 8), imm: imm8 << 2 },
        0b10110 | 0b10111 => return decode_misc(op),
        0b11000 | 0b11001 => {
            let registers = op as u8;
            if registers == 0 {
                return None;
            }
            let rn = reg(op, 8);
            if op & 0x0800 == 0 {
                Instruction::Stm { rn, registers }
            } else {
                Instruction::Ldm { rn, registers }
            }
        }
        0b11010 | 0b11011 => match (op >> 8) & 0xF {
            0xE => Instruction::Udf { imm: op & 0xFF, wide: false },
            0xF => Instruction::Svc { imm: op as u8 },
            cond => Instruction::BranchCond {
                cond: cond as u8,
                offset: sign_extend(imm8 << 1, 9),
            },
        },
        0b11100 => Instruction::Branch {
            offset: sign_extend(u32::from(op & 0x7FF) << 1, 12),
        },
        _ => return None,
    };
    Some(inst)
}

fn decode_data_processing(op: u16) -> Instruction {
    if op & 0x0400 == 0 {
        return Instruction::Alu {
            op: ALU_OPS[usize::from((op >> 6) & 0xF)],
            rdn: reg(op, 0),
            rm: reg(op, 3),
        };
    }
    let rdn = (((op >> 4) & 8) | (op & 7)) as u8;
    let rm = ((op >> 3) & 0xF) as u8;
    match (op >> 8) & 3 {
        0 => Instruction::AddHigh { rdn, rm },
        1 => Instruction::CmpHigh { rn: rdn, rm },
        2 => Instruction::MovHigh { rd: rdn, rm },
        _ if op & 0x80 == 0 => Instruction::Bx { rm },
        _ => Instruction::Blx { rm },
    }
}

fn decode_misc(op: u16) -> Option<Instruction> {
    let inst = match (op >> 8) & 0xF {
        0b0000 => Instruction::AdjustSp {
            imm: u32::from(op & 0x7F) << 2,
            subtract: op & 0x80 != 0,
        },
        0b0010 => {
            let kind = match (op >> 6) & 3 {
                0 => ExtendOp::Sxth,
                1 => ExtendOp::Sxtb,
                2 => ExtendOp::Uxth,
                _ => ExtendOp::Uxtb,
            };
            Instruction::Extend { op: kind, rd: reg(op, 0), rm: reg(op, 3) }
        }
        0b0100 | 0b0101 => {
            let registers = (op & 0xFF) | ((op & 0x100) << 6);
            if registers == 0 {
                return None;
            }
            Instruction::Push { registers }
        }
        0b0110 if op & 0xFFEF == 0xB662 => Instruction::Cps { disable: op & 0x10 != 0 },
        0b1010 => {
            let kind = match (op >> 6) & 3 {
                0 => ReverseOp::Rev,
                1 => ReverseOp::Rev16,
                3 => ReverseOp::Revsh,
                _ => return None,
            };
            Instruction::Reverse { op: kind, rd: reg(op, 0), rm: reg(op, 3) }
        }
        0b1100 | 0b1101 => {
            let registers = (op & 0xFF) | ((op & 0x100) << 7);
            if registers == 0 {
                return None;
            }
            Instruction::Pop { registers }
        }
        0b1110 => Instruction::Bkpt { imm: op as u8 },
        // IT blocks do not exist in ARMv6-M.
        0b1111 if op & 0xF != 0 => return None,
        0b1111 => Instruction::Hint(match (op >> 4) & 0xF {
            1 => Hint::Yield,
            2 => Hint::Wfe,
            3 => Hint::Wfi,
            4 => Hint::Sev,
            _ => Hint::Nop,
        }),
        _ => return None,
    };
    Some(inst)
}

fn decode_wide(first: u16, second: u16) -> Option<Instruction> {
    let first32 = u32::from(first);
    let second32 = u32::from(second);
    if first & 0xF800 == 0xF000 && second & 0xD000 == 0xD000 {
        let s = (first32 >> 10) & 1;
        let j1 = (second32 >> 13) & 1;
        let j2 = (second32 >> 11) & 1;
        let i1 = !(j1 ^ s) & 1;
        let i2 = !(j2 ^ s) & 1;
        let imm = s << 24 | i1 << 23 | i2 << 22 | (first32 & 0x3FF) << 12 | (second32 & 0x7FF) << 1;
        return Some(Instruction::Bl { offset: sign_extend(imm, 25) });
    }
    if first & 0xFFF0 == 0xF380 && second & 0xFF00 == 0x8800 {
        return Some(Instruction::Msr { sysm: second as u8, rn: (first & 0xF) as u8 });
    }
    if first == 0xF3EF && second & 0xF000 == 0x8000 {
        return Some(Instruction::Mrs { rd: ((second >> 8) & 0xF) as u8, sysm: second as u8 });
    }
    if first == 0xF3BF && second & 0xFF00 == 0x8F00 {
        return match (second >> 4) & 0xF {
            4 => Some(Instruction::Barrier(Barrier::Dsb)),
            5 => Some(Instruction::Barrier(Barrier::Dmb)),
            6 => Some(Instruction::Barrier(Barrier::Isb)),
            _ => None,
        };
    }
    if first & 0xFFF0 == 0xF7F0 && second & 0xF000 == 0xA000 {
        return Some(Instruction::Udf {
            imm: (first & 0xF) << 12 | (second & 0xFFF),
            wide: true,
        });
    }
    None
}
