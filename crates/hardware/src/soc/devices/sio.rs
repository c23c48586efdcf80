//! Single-cycle I/O block (SIO).
//!
//! The core-local register block at `0xD000_0000`. It provides:
//! 1. **GPIO:** Output and output-enable registers for bank 0 and the QSPI bank, each
//!    with set/clear/xor aliases, plus input registers driven by the host.
//! 2. **Hardware Divider:** 32-bit signed and unsigned division, complete on the next
//!    read.
//! 3. **Spinlocks:** 32 hardware locks claimed by reading and released by writing.
//! 4. **Interpolators:** Two [`Interpolator`] instances.
//! 5. **Inter-core FIFO:** Only core 0 is emulated, so the FIFO is always empty and ready.
//!
//! SIO is not behind the atomic alias decoder; the bus hands it plain accesses.

use super::interpolator::{self, Interpolator};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const CPUID: u32 = 0x000;
const GPIO_IN: u32 = 0x004;
const GPIO_HI_IN: u32 = 0x008;
const GPIO_OUT: u32 = 0x010;
const GPIO_OUT_SET: u32 = 0x014;
const GPIO_OUT_CLR: u32 = 0x018;
const GPIO_OUT_XOR: u32 = 0x01C;
const GPIO_OE: u32 = 0x020;
const GPIO_OE_SET: u32 = 0x024;
const GPIO_OE_CLR: u32 = 0x028;
const GPIO_OE_XOR: u32 = 0x02C;
const GPIO_HI_OUT: u32 = 0x030;
const GPIO_HI_OUT_SET: u32 = 0x034;
const GPIO_HI_OUT_CLR: u32 = 0x038;
const GPIO_HI_OUT_XOR: u32 = 0x03C;
const GPIO_HI_OE: u32 = 0x040;
const GPIO_HI_OE_SET: u32 = 0x044;
const GPIO_HI_OE_CLR: u32 = 0x048;
const GPIO_HI_OE_XOR: u32 = 0x04C;
const FIFO_ST: u32 = 0x050;
const FIFO_WR: u32 = 0x054;
const FIFO_RD: u32 = 0x058;
const SPINLOCK_ST: u32 = 0x05C;
const DIV_UDIVIDEND: u32 = 0x060;
const DIV_UDIVISOR: u32 = 0x064;
const DIV_SDIVIDEND: u32 = 0x068;
const DIV_SDIVISOR: u32 = 0x06C;
const DIV_QUOTIENT: u32 = 0x070;
const DIV_REMAINDER: u32 = 0x074;
const DIV_CSR: u32 = 0x078;
const INTERP0: u32 = 0x080;
const INTERP1: u32 = INTERP0 + interpolator::BLOCK_SIZE;
const SPINLOCK0: u32 = 0x100;
const SPINLOCK31: u32 = 0x17C;

/// 30 user GPIOs in bank 0.
const GPIO_MASK: u32 = 0x3FFF_FFFF;
/// Six QSPI pins.
const GPIO_HI_MASK: u32 = 0x3F;

const FIFO_ST_RDY: u32 = 1 << 1;

const DIV_CSR_READY: u32 = 1 << 0;
const DIV_CSR_DIRTY: u32 = 1 << 1;

/// Hardware divider state.
#[derive(Clone, Copy, Debug, Default)]
struct Divider {
    dividend: u32,
    divisor: u32,
    quotient: u32,
    remainder: u32,
    dirty: bool,
}

impl Divider {
    fn divide_unsigned(&mut self) {
        (self.quotient, self.remainder) = match self.divisor {
            0 => (u32::MAX, self.dividend),
            d => (self.dividend / d, self.dividend % d),
        };
        self.dirty = true;
    }

    fn divide_signed(&mut self) {
        let dividend = self.dividend as i32;
        let divisor = self.divisor as i32;
        (self.quotient, self.remainder) = if divisor == 0 {
            (if dividend < 0 { 1 } else { u32::MAX }, self.dividend)
        } else {
            (
                dividend.wrapping_div(divisor) as u32,
                dividend.wrapping_rem(divisor) as u32,
            )
        };
        self.dirty = true;
    }
}

/// The SIO block of core 0.
#[derive(Debug)]
pub struct Sio {
    gpio_in: u32,
    gpio_hi_in: u32,
    gpio_out: u32,
    gpio_oe: u32,
    gpio_hi_out: u32,
    gpio_hi_oe: u32,
    spinlocks: u32,
    divider: Divider,
    interp: [Interpolator; 2],
}

impl Default for Sio {
    fn default() -> Self {
        Self::new()
    }
}

impl Sio {
    /// Creates the block in its reset state.
    pub fn new() -> Self {
        Self {
            gpio_in: 0,
            gpio_hi_in: 0,
            gpio_out: 0,
            gpio_oe: 0,
            gpio_hi_out: 0,
            gpio_hi_oe: 0,
            spinlocks: 0,
            divider: Divider::default(),
            interp: [Interpolator::new(0), Interpolator::new(1)],
        }
    }

    /// GPIO output levels of bank 0.
    pub const fn gpio_out(&self) -> u32 {
        self.gpio_out
    }

    /// GPIO output enables of bank 0.
    pub const fn gpio_oe(&self) -> u32 {
        self.gpio_oe
    }

    /// Drives a bank 0 input pin from the host.
    pub fn set_gpio_input(&mut self, pin: u32, level: bool) {
        if pin >= 30 {
            tracing::warn!(target: "sio", pin, "set_gpio_input on invalid pin");
            return;
        }
        if level {
            self.gpio_in |= 1 << pin;
        } else {
            self.gpio_in &= !(1 << pin);
        }
    }

    /// Bitmap of claimed spinlocks.
    pub const fn spinlocks(&self) -> u32 {
        self.spinlocks
    }

    /// Mutable access to an interpolator.
    pub fn interpolator_mut(&mut self, index: usize) -> Option<&mut Interpolator> {
        self.interp.get_mut(index)
    }

    fn divider_csr(&self) -> u32 {
        DIV_CSR_READY | if self.divider.dirty { DIV_CSR_DIRTY } else { 0 }
    }
}

/// Applies one of the SIO set/clear/xor aliases at `offset - base` (0, 4, 8 or 0xC).
fn apply_alias(reg: &mut u32, offset: u32, base: u32, value: u32, mask: u32) {
    let value = value & mask;
    match offset - base {
        0x0 => *reg = value,
        0x4 => *reg |= value,
        0x8 => *reg &= !value,
        _ => *reg ^= value,
    }
}

impl Peripheral for Sio {
    fn name(&self) -> &str {
        "SIO"
    }

    fn read_u32(&mut self, offset: u32, _ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            CPUID => 0,
            GPIO_IN => self.gpio_in,
            GPIO_HI_IN => self.gpio_hi_in,
            GPIO_OUT => self.gpio_out,
            GPIO_OE => self.gpio_oe,
            GPIO_HI_OUT => self.gpio_hi_out,
            GPIO_HI_OE => self.gpio_hi_oe,
            // Aliases read back as zero.
            GPIO_OUT_SET..=GPIO_OUT_XOR
            | GPIO_OE_SET..=GPIO_OE_XOR
            | GPIO_HI_OUT_SET..=GPIO_HI_OUT_XOR
            | GPIO_HI_OE_SET..=GPIO_HI_OE_XOR => 0,
            FIFO_ST => FIFO_ST_RDY,
            FIFO_RD => {
                tracing::debug!(target: "sio", "read from empty inter-core FIFO");
                0
            }
            SPINLOCK_ST => self.spinlocks,
            DIV_UDIVIDEND | DIV_SDIVIDEND => self.divider.dividend,
            DIV_UDIVISOR | DIV_SDIVISOR => self.divider.divisor,
            DIV_QUOTIENT => {
                self.divider.dirty = false;
                self.divider.quotient
            }
            DIV_REMAINDER => self.divider.remainder,
            DIV_CSR => self.divider_csr(),
            INTERP0..INTERP1 => self.interp[0].read(offset - INTERP0),
            INTERP1..SPINLOCK0 => self.interp[1].read(offset - INTERP1),
            SPINLOCK0..=SPINLOCK31 => {
                let bit = 1 << ((offset - SPINLOCK0) >> 2);
                if self.spinlocks & bit != 0 {
                    0
                } else {
                    self.spinlocks |= bit;
                    bit
                }
            }
            _ => unknown_read("SIO", offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, _ctx: &mut PeripheralContext<'_>) {
        match offset {
            GPIO_OUT..=GPIO_OUT_XOR => {
                apply_alias(&mut self.gpio_out, offset, GPIO_OUT, value, GPIO_MASK);
            }
            GPIO_OE..=GPIO_OE_XOR => {
                apply_alias(&mut self.gpio_oe, offset, GPIO_OE, value, GPIO_MASK);
            }
            GPIO_HI_OUT..=GPIO_HI_OUT_XOR => {
                apply_alias(&mut self.gpio_hi_out, offset, GPIO_HI_OUT, value, GPIO_HI_MASK);
            }
            GPIO_HI_OE..=GPIO_HI_OE_XOR => {
                apply_alias(&mut self.gpio_hi_oe, offset, GPIO_HI_OE, value, GPIO_HI_MASK);
            }
            FIFO_ST => {}
            FIFO_WR => tracing::debug!(target: "sio", value, "inter-core FIFO write dropped"),
            DIV_UDIVIDEND => {
                self.divider.dividend = value;
                self.divider.divide_unsigned();
            }
            DIV_UDIVISOR => {
                self.divider.divisor = value;
                self.divider.divide_unsigned();
            }
            DIV_SDIVIDEND => {
                self.divider.dividend = value;
                self.divider.divide_signed();
            }
            DIV_SDIVISOR => {
                self.divider.divisor = value;
                self.divider.divide_signed();
            }
            DIV_QUOTIENT => {
                self.divider.quotient = value;
                self.divider.dirty = true;
            }
            DIV_REMAINDER => {
                self.divider.remainder = value;
                self.divider.dirty = true;
            }
            INTERP0..INTERP1 => self.interp[0].write(offset - INTERP0, value),
            INTERP1..SPINLOCK0 => self.interp[1].write(offset - INTERP1, value),
            SPINLOCK0..=SPINLOCK31 => self.spinlocks &= !(1 << ((offset - SPINLOCK0) >> 2)),
            _ => unknown_write("SIO", offset, value),
        }
    }

    fn reset(&mut self, _ctx: &mut PeripheralContext<'_>) {
        let gpio_in = self.gpio_in;
        *self = Self::new();
        self.gpio_in = gpio_in;
    }
}
