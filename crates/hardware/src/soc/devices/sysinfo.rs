//! Chip identification blocks (SYSINFO and TBMAN).
//!
//! Both are read-only. SYSINFO reports an RP2040-B2 running on an ASIC; TBMAN reports
//! the same platform to code that reads it instead.

use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const CHIP_ID: u32 = 0x00;
const PLATFORM: u32 = 0x04;
const GITREF_RP2040: u32 = 0x40;

/// Manufacturer 0x927, part 0x0002, revision 1 (B2).
const CHIP_ID_VALUE: u32 = 0x1000_2927;
/// PLATFORM.ASIC.
const PLATFORM_ASIC: u32 = 1 << 1;
const GITREF_VALUE: u32 = 0xE0C9_12E8;

/// TBMAN.PLATFORM.ASIC.
const TBMAN_ASIC: u32 = 1 << 0;

/// The SYSINFO block.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysInfo;

impl Peripheral for SysInfo {
    fn name(&self) -> &str {
        "SYSINFO"
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            CHIP_ID => CHIP_ID_VALUE,
            PLATFORM => PLATFORM_ASIC,
            GITREF_RP2040 => GITREF_VALUE,
            _ => unknown_read("SYSINFO", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        unknown_write("SYSINFO", offset, value);
    }
}

/// The TBMAN (testbench manager) block.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tbman;

impl Peripheral for Tbman {
    fn name(&self) -> &str {
        "TBMAN"
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            0x0 => TBMAN_ASIC,
            _ => unknown_read("TBMAN", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        unknown_write("TBMAN", offset, value);
    }
}
