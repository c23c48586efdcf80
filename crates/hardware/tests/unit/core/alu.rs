//! ALU Tests.
//!
//! Checks `AddWithCarry`, the shifter carry-out rules and the flag behaviour of the
//! register data-processing group.

use picosim_core::common::reg::Flags;
use picosim_core::core::units::alu::arithmetic::{add_with_carry, sub_flags};
use picosim_core::core::units::alu::shifts::{asr_c, lsl_c, lsr_c, ror_c, shift_imm};
use picosim_core::core::units::alu::Alu;
use picosim_core::isa::instruction::{AluOp, ShiftOp};
use pretty_assertions::assert_eq;
use rstest::rstest;

const fn flags(n: bool, z: bool, c: bool, v: bool) -> Flags {
    Flags { n, z, c, v }
}

// ─── AddWithCarry ────────────────────────────────────────────────────────────

#[rstest]
#[case(1, 2, false, (3, false, false))]
#[case(1, 2, true, (4, false, false))]
#[case(0xFFFF_FFFF, 1, false, (0, true, false))]
#[case(0x7FFF_FFFF, 1, false, (0x8000_0000, false, true))]
#[case(0x8000_0000, 0x8000_0000, false, (0, true, true))]
#[case(0xFFFF_FFFF, 0xFFFF_FFFF, true, (0xFFFF_FFFF, true, false))]
fn add_with_carry_cases(
    #[case] x: u32,
    #[case] y: u32,
    #[case] carry: bool,
    #[case] expected: (u32, bool, bool),
) {
    assert_eq!(add_with_carry(x, y, carry), expected);
}

#[rstest]
#[case(5, 5, 0, flags(false, true, true, false))]
#[case(3, 5, 0xFFFF_FFFE, flags(true, false, false, false))]
#[case(0x8000_0000, 1, 0x7FFF_FFFF, flags(false, false, true, true))]
#[case(0, 0, 0, flags(false, true, true, false))]
fn subtraction_carry_is_not_borrow(
    #[case] x: u32,
    #[case] y: u32,
    #[case] value: u32,
    #[case] expected: Flags,
) {
    assert_eq!(sub_flags(x, y), (value, expected));
}

// ─── Shifter ─────────────────────────────────────────────────────────────────

#[rstest]
#[case(0x8000_0001, 1, (2, true))]
#[case(1, 31, (0x8000_0000, false))]
#[case(1, 32, (0, true))]
#[case(0xFFFF_FFFF, 33, (0, false))]
fn lsl_carry_out(#[case] x: u32, #[case] n: u32, #[case] expected: (u32, bool)) {
    assert_eq!(lsl_c(x, n, false), expected);
}

#[rstest]
#[case(1, 1, (0, true))]
#[case(0x8000_0000, 31, (1, false))]
#[case(0x8000_0000, 32, (0, true))]
#[case(0xFFFF_FFFF, 40, (0, false))]
fn lsr_carry_out(#[case] x: u32, #[case] n: u32, #[case] expected: (u32, bool)) {
    assert_eq!(lsr_c(x, n, false), expected);
}

#[rstest]
#[case(0x8000_0000, 4, (0xF800_0000, false))]
#[case(0x8000_0008, 4, (0xF800_0000, true))]
#[case(0x8000_0000, 40, (0xFFFF_FFFF, true))]
#[case(0x7FFF_FFFF, 32, (0, false))]
fn asr_replicates_sign(#[case] x: u32, #[case] n: u32, #[case] expected: (u32, bool)) {
    assert_eq!(asr_c(x, n, false), expected);
}

#[test]
fn ror_carry_is_result_msb() {
    assert_eq!(ror_c(1, 1, false), (0x8000_0000, true));
    assert_eq!(ror_c(0x10, 4, true), (1, false));
    assert_eq!(ror_c(0x8000_0000, 32, false), (0x8000_0000, true));
}

#[test]
fn zero_shift_keeps_carry() {
    assert_eq!(lsl_c(0x1234, 0, true), (0x1234, true));
    assert_eq!(lsr_c(0x1234, 0, true), (0x1234, true));
    assert_eq!(asr_c(0x1234, 0, true), (0x1234, true));
    assert_eq!(ror_c(0x1234, 0, true), (0x1234, true));
}

#[test]
fn immediate_shift_of_zero_means_32_for_right_shifts() {
    let (value, f) = shift_imm(ShiftOp::Lsr, 0x8000_0000, 0, Flags::default());
    assert_eq!(value, 0);
    assert!(f.z && f.c);

    let (value, f) = shift_imm(ShiftOp::Asr, 0x8000_0000, 0, Flags::default());
    assert_eq!(value, 0xFFFF_FFFF);
    assert!(f.n && f.c);

    let carry_in = flags(false, false, true, true);
    let (value, f) = shift_imm(ShiftOp::Lsl, 7, 0, carry_in);
    assert_eq!(value, 7);
    assert!(f.c && f.v);
}

// ─── Data Processing ─────────────────────────────────────────────────────────

#[test]
fn logical_ops_preserve_carry_and_overflow() {
    let incoming = flags(false, false, true, true);
    let r = Alu::execute(AluOp::And, 0xF0, 0x0F, incoming);
    assert_eq!(r.value, 0);
    assert_eq!(r.flags, flags(false, true, true, true));
    assert!(r.writeback);

    let r = Alu::execute(AluOp::Bic, 0xFF, 0x0F, incoming);
    assert_eq!(r.value, 0xF0);

    let r = Alu::execute(AluOp::Mvn, 0, 0, incoming);
    assert_eq!(r.value, 0xFFFF_FFFF);
    assert!(r.flags.n);
}

#[test]
fn compare_ops_do_not_write_back() {
    for op in [AluOp::Tst, AluOp::Cmp, AluOp::Cmn] {
        assert!(!Alu::execute(op, 1, 1, Flags::default()).writeback, "{op:?}");
    }
    let r = Alu::execute(AluOp::Cmn, 0xFFFF_FFFF, 1, Flags::default());
    assert!(r.flags.z && r.flags.c);
}

#[test]
fn adc_and_sbc_consume_carry() {
    let carry = flags(false, false, true, false);
    assert_eq!(Alu::execute(AluOp::Adc, 10, 20, carry).value, 31);
    assert_eq!(Alu::execute(AluOp::Adc, 10, 20, Flags::default()).value, 30);
    assert_eq!(Alu::execute(AluOp::Sbc, 10, 3, carry).value, 7);
    assert_eq!(Alu::execute(AluOp::Sbc, 10, 3, Flags::default()).value, 6);
}

#[test]
fn rsb_negates_second_operand() {
    let r = Alu::execute(AluOp::Rsb, 0xDEAD, 5, Flags::default());
    assert_eq!(r.value, (-5i32) as u32);
    assert!(r.flags.n && !r.flags.c);
}

#[test]
fn mul_keeps_carry_and_overflow() {
    let incoming = flags(false, false, true, true);
    let r = Alu::execute(AluOp::Mul, 0x1_0000, 0x1_0000, incoming);
    assert_eq!(r.value, 0);
    assert_eq!(r.flags, flags(false, true, true, true));
}

#[test]
fn register_shift_uses_bottom_byte() {
    let r = Alu::execute(AluOp::Lsl, 1, 0x104, Flags::default());
    assert_eq!(r.value, 0x10);
    let r = Alu::execute(AluOp::Ror, 0x8000_0001, 1, Flags::default());
    assert_eq!(r.value, 0xC000_0000);
    assert!(r.flags.c && r.flags.n);
}
