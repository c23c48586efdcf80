//! Instruction disassembler for debug tracing.
//!
//! Renders a decoded [`Instruction`] in unified assembler syntax for trace logs and test
//! diagnostics. Branch targets are shown as signed offsets since the decoder does not
//! know the instruction address.

use std::fmt;

use crate::isa::instruction::{
    Address, AluOp, Barrier, ExtendOp, Hint, Instruction, LoadWidth, ReverseOp, ShiftOp,
    StoreWidth,
};

/// Register names r0-r12, sp, lr, pc.
const REG_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr",
    "pc",
];

/// Condition code suffixes.
const COND_NAMES: [&str; 14] = [
    "eq", "ne", "cs", "cc", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt", "le",
];

#[inline]
fn r(idx: u8) -> &'static str {
    REG_NAMES[usize::from(idx & 0xF)]
}

fn reg_list(mask: u16) -> String {
    let names: Vec<&str> = (0u8..16).filter(|&i| mask & (1u16 << i) != 0).map(r).collect();
    format!("{{{}}}", names.join(", "))
}

const fn alu_name(op: AluOp) -> &'static str {
    match op {
        AluOp::And => "ands",
        AluOp::Eor => "eors",
        AluOp::Lsl => "lsls",
        AluOp::Lsr => "lsrs",
        AluOp::Asr => "asrs",
        AluOp::Adc => "adcs",
        AluOp::Sbc => "sbcs",
        AluOp::Ror => "rors",
        AluOp::Tst => "tst",
        AluOp::Rsb => "rsbs",
        AluOp::Cmp => "cmp",
        AluOp::Cmn => "cmn",
        AluOp::Orr => "orrs",
        AluOp::Mul => "muls",
        AluOp::Bic => "bics",
        AluOp::Mvn => "mvns",
    }
}

fn address(addr: Address) -> String {
    match addr {
        Address::Imm { rn, offset: 0 } => format!("[{}]", r(rn)),
        Address::Imm { rn, offset } => format!("[{}, #{offset}]", r(rn)),
        Address::Reg { rn, rm } => format!("[{}, {}]", r(rn), r(rm)),
        Address::Literal { offset } => format!("[pc, #{offset}]"),
    }
}

const fn sysm_name(sysm: u8) -> &'static str {
    match sysm {
        0 => "apsr",
        1 => "iapsr",
        2 => "eapsr",
        3 => "xpsr",
        5 => "ipsr",
        6 => "epsr",
        7 => "iepsr",
        8 => "msp",
        9 => "psp",
        16 => "primask",
        20 => "control",
        _ => "?",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ShiftImm { op: ShiftOp::Lsl, rd, rm, imm5: 0 } => {
                write!(f, "movs {}, {}", r(rd), r(rm))
            }
            Self::ShiftImm { op, rd, rm, imm5 } => {
                let name = match op {
                    ShiftOp::Lsl => "lsls",
                    ShiftOp::Lsr => "lsrs",
                    ShiftOp::Asr => "asrs",
                };
                let amount = if imm5 == 0 { 32 } else { u32::from(imm5) };
                write!(f, "{name} {}, {}, #{amount}", r(rd), r(rm))
            }
            Self::AddReg { rd, rn, rm } => write!(f, "adds {}, {}, {}", r(rd), r(rn), r(rm)),
            Self::SubReg { rd, rn, rm } => write!(f, "subs {}, {}, {}", r(rd), r(rn), r(rm)),
            Self::AddImm { rd, rn, imm } if rd == rn && imm > 7 => {
                write!(f, "adds {}, #{imm}", r(rd))
            }
            Self::AddImm { rd, rn, imm } => write!(f, "adds {}, {}, #{imm}", r(rd), r(rn)),
            Self::SubImm { rd, rn, imm } if rd == rn && imm > 7 => {
                write!(f, "subs {}, #{imm}", r(rd))
            }
            Self::SubImm { rd, rn, imm } => write!(f, "subs {}, {}, #{imm}", r(rd), r(rn)),
            Self::MovImm { rd, imm } => write!(f, "movs {}, #{imm}", r(rd)),
            Self::CmpImm { rn, imm } => write!(f, "cmp {}, #{imm}", r(rn)),
            Self::Alu { op: AluOp::Rsb, rdn, rm } => write!(f, "rsbs {}, {}, #0", r(rdn), r(rm)),
            Self::Alu { op, rdn, rm } => write!(f, "{} {}, {}", alu_name(op), r(rdn), r(rm)),
            Self::AddHigh { rdn, rm } => write!(f, "add {}, {}", r(rdn), r(rm)),
            Self::CmpHigh { rn, rm } => write!(f, "cmp {}, {}", r(rn), r(rm)),
            Self::MovHigh { rd, rm } => write!(f, "mov {}, {}", r(rd), r(rm)),
            Self::Bx { rm } => write!(f, "bx {}", r(rm)),
            Self::Blx { rm } => write!(f, "blx {}", r(rm)),
            Self::Load { width, rt, addr } => {
                let name = match width {
                    LoadWidth::Word => "ldr",
                    LoadWidth::Half => "ldrh",
                    LoadWidth::Byte => "ldrb",
                    LoadWidth::SignedHalf => "ldrsh",
                    LoadWidth::SignedByte => "ldrsb",
                };
                write!(f, "{name} {}, {}", r(rt), address(addr))
            }
            Self::Store { width, rt, addr } => {
                let name = match width {
                    StoreWidth::Word => "str",
                    StoreWidth::Half => "strh",
                    StoreWidth::Byte => "strb",
                };
                write!(f, "{name} {}, {}", r(rt), address(addr))
            }
            Self::Adr { rd, imm } => write!(f, "adr {}, #{imm}", r(rd)),
            Self::AddSpImm { rd, imm } => write!(f, "add {}, sp, #{imm}", r(rd)),
            Self::AdjustSp { imm, subtract } => {
                write!(f, "{} sp, #{imm}", if subtract { "sub" } else { "add" })
            }
            Self::Extend { op, rd, rm } => {
                let name = match op {
                    ExtendOp::Sxth => "sxth",
                    ExtendOp::Sxtb => "sxtb",
                    ExtendOp::Uxth => "uxth",
                    ExtendOp::Uxtb => "uxtb",
                };
                write!(f, "{name} {}, {}", r(rd), r(rm))
            }
            Self::Reverse { op, rd, rm } => {
                let name = match op {
                    ReverseOp::Rev => "rev",
                    ReverseOp::Rev16 => "rev16",
                    ReverseOp::Revsh => "revsh",
                };
                write!(f, "{name} {}, {}", r(rd), r(rm))
            }
            Self::Push { registers } => write!(f, "push {}", reg_list(registers)),
            Self::Pop { registers } => write!(f, "pop {}", reg_list(registers)),
            Self::Stm { rn, registers } => {
                write!(f, "stm {}!, {}", r(rn), reg_list(u16::from(registers)))
            }
            Self::Ldm { rn, registers } => {
                let wb = if registers & (1 << rn) == 0 { "!" } else { "" };
                write!(f, "ldm {}{wb}, {}", r(rn), reg_list(u16::from(registers)))
            }
            Self::Cps { disable } => f.write_str(if disable { "cpsid i" } else { "cpsie i" }),
            Self::Bkpt { imm } => write!(f, "bkpt #{imm}"),
            Self::Hint(hint) => f.write_str(match hint {
                Hint::Nop => "nop",
                Hint::Yield => "yield",
                Hint::Wfe => "wfe",
                Hint::Wfi => "wfi",
                Hint::Sev => "sev",
            }),
            Self::BranchCond { cond, offset } => {
                let name = COND_NAMES.get(usize::from(cond)).copied().unwrap_or("?");
                write!(f, "b{name} {offset:+}")
            }
            Self::Branch { offset } => write!(f, "b {offset:+}"),
            Self::Svc { imm } => write!(f, "svc #{imm}"),
            Self::Udf { imm, .. } => write!(f, "udf #{imm}"),
            Self::Bl { offset } => write!(f, "bl {offset:+}"),
            Self::Msr { sysm, rn } => write!(f, "msr {}, {}", sysm_name(sysm), r(rn)),
            Self::Mrs { rd, sysm } => write!(f, "mrs {}, {}", r(rd), sysm_name(sysm)),
            Self::Barrier(b) => f.write_str(match b {
                Barrier::Dsb => "dsb sy",
                Barrier::Dmb => "dmb sy",
                Barrier::Isb => "isb sy",
            }),
        }
    }
}
