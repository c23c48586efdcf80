//! System-on-Chip construction and top-level `System` type.
//!
//! This module builds the complete RP2040 from configuration. It performs:
//! 1. **Bus setup:** Creates the interconnect, its memories and the virtual clock.
//! 2. **Device registration:** Instantiates every modelled peripheral at its fixed base
//!    address and fills the rest of the peripheral map with storage or stub blocks.
//! 3. **Host access:** Typed accessors for the peripherals a host talks to (UART input,
//!    GPIO and PWM pins, the watchdog's debugger flag).

use crate::common::constants::{IRQ_PWM_WRAP, IRQ_SPI0, IRQ_SPI1, IRQ_TIMER_0, IRQ_UART0, IRQ_UART1};
use crate::config::Config;
use crate::soc::devices::{
    Clocks, Pwm, RegisterBank, Resets, Spi, Ssi, SysInfo, Tbman, Timer, Uart, Unimplemented,
    Watchdog,
};
use crate::soc::interconnect::Bus;

/// XIP flash controller SSI.
pub const SSI_BASE: u32 = 0x1800_0000;
/// SYSINFO.
pub const SYSINFO_BASE: u32 = 0x4000_0000;
/// SYSCFG.
pub const SYSCFG_BASE: u32 = 0x4000_4000;
/// CLOCKS.
pub const CLOCKS_BASE: u32 = 0x4000_8000;
/// RESETS.
pub const RESETS_BASE: u32 = 0x4000_c000;
/// IO_BANK0.
pub const IO_BANK0_BASE: u32 = 0x4001_4000;
/// PADS_BANK0.
pub const PADS_BANK0_BASE: u32 = 0x4001_c000;
/// PADS_QSPI.
pub const PADS_QSPI_BASE: u32 = 0x4002_0000;
/// BUSCTRL.
pub const BUSCTRL_BASE: u32 = 0x4003_0000;
/// UART0.
pub const UART0_BASE: u32 = 0x4003_4000;
/// UART1.
pub const UART1_BASE: u32 = 0x4003_8000;
/// SPI0.
pub const SPI0_BASE: u32 = 0x4003_c000;
/// SPI1.
pub const SPI1_BASE: u32 = 0x4004_0000;
/// PWM.
pub const PWM_BASE: u32 = 0x4005_0000;
/// TIMER.
pub const TIMER_BASE: u32 = 0x4005_4000;
/// WATCHDOG.
pub const WATCHDOG_BASE: u32 = 0x4005_8000;
/// TBMAN.
pub const TBMAN_BASE: u32 = 0x4006_c000;

/// Blocks with no model, and the value their registers read as.
const UNIMPLEMENTED: [(u32, &str, u32); 17] = [
    (0x1400_0000, "XIP_CTRL", 0),
    (0x4001_0000, "PSM", 0),
    (0x4001_8000, "IO_QSPI", 0),
    (0x4002_4000, "XOSC", 0xFFFF_FFFF),
    (0x4002_8000, "PLL_SYS", 0xFFFF_FFFF),
    (0x4002_c000, "PLL_USB", 0xFFFF_FFFF),
    (0x4004_4000, "I2C0", 0),
    (0x4004_8000, "I2C1", 0),
    (0x4004_c000, "ADC", 0),
    (0x4005_c000, "RTC", 0),
    (0x4006_0000, "ROSC", 0xFFFF_FFFF),
    (0x4006_4000, "VREG_AND_CHIP_RESET", 0),
    (0x5000_0000, "DMA", 0),
    (0x5011_0000, "USBCTRL_REGS", 0),
    (0x5020_0000, "PIO0", 0),
    (0x5030_0000, "PIO1", 0),
    (0x5040_0000, "XIP_AUX", 0),
];

/// Top-level system instance: the bus with every peripheral attached.
#[derive(Debug)]
pub struct System {
    /// System interconnect; owns memories, peripherals and the clock.
    pub bus: Bus,
}

impl System {
    /// Builds the RP2040 from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Clock frequencies for the timed peripherals.
    ///
    /// # Returns
    ///
    /// A system with erased flash, zeroed SRAM and every peripheral in reset.
    pub fn new(config: &Config) -> Self {
        let clocks = &config.clocks;
        let mut bus = Bus::new(clocks.sys_hz);

        let uart0 = Uart::new(&mut bus.clock, "UART0", IRQ_UART0, clocks.peri_hz);
        let uart1 = Uart::new(&mut bus.clock, "UART1", IRQ_UART1, clocks.peri_hz);
        let spi0 = Spi::new(&mut bus.clock, "SPI0", IRQ_SPI0, clocks.peri_hz);
        let spi1 = Spi::new(&mut bus.clock, "SPI1", IRQ_SPI1, clocks.peri_hz);
        let pwm = Pwm::new(&mut bus.clock, IRQ_PWM_WRAP, clocks.sys_hz);
        let timer = Timer::new(&mut bus.clock, IRQ_TIMER_0);
        let watchdog = Watchdog::new(&mut bus.clock, clocks.ref_hz);

        bus.attach(SSI_BASE, Box::new(Ssi::new()));
        bus.attach(SYSINFO_BASE, Box::new(SysInfo));
        bus.attach(SYSCFG_BASE, Box::new(RegisterBank::new("SYSCFG")));
        bus.attach(CLOCKS_BASE, Box::new(Clocks::new()));
        bus.attach(RESETS_BASE, Box::new(Resets::new()));
        bus.attach(IO_BANK0_BASE, Box::new(RegisterBank::new("IO_BANK0")));
        bus.attach(PADS_BANK0_BASE, Box::new(RegisterBank::new("PADS_BANK0")));
        bus.attach(PADS_QSPI_BASE, Box::new(RegisterBank::new("PADS_QSPI")));
        bus.attach(BUSCTRL_BASE, Box::new(RegisterBank::new("BUSCTRL")));
        bus.attach(UART0_BASE, Box::new(uart0));
        bus.attach(UART1_BASE, Box::new(uart1));
        bus.attach(SPI0_BASE, Box::new(spi0));
        bus.attach(SPI1_BASE, Box::new(spi1));
        bus.attach(PWM_BASE, Box::new(pwm));
        bus.attach(TIMER_BASE, Box::new(timer));
        bus.attach(WATCHDOG_BASE, Box::new(watchdog));
        bus.attach(TBMAN_BASE, Box::new(Tbman));
        for (base, name, fill) in UNIMPLEMENTED {
            bus.attach(base, Box::new(Unimplemented::new(name, fill)));
        }

        Self { bus }
    }

    /// UART `index` (0 or 1).
    pub fn uart_mut(&mut self, index: usize) -> Option<&mut Uart> {
        let base = [UART0_BASE, UART1_BASE].get(index).copied()?;
        self.bus.peripheral_mut(base)?.as_uart_mut()
    }

    /// SPI controller `index` (0 or 1).
    pub fn spi_mut(&mut self, index: usize) -> Option<&mut Spi> {
        let base = [SPI0_BASE, SPI1_BASE].get(index).copied()?;
        self.bus.peripheral_mut(base)?.as_spi_mut()
    }

    /// The PWM block.
    pub fn pwm_mut(&mut self) -> Option<&mut Pwm> {
        self.bus.peripheral_mut(PWM_BASE)?.as_pwm_mut()
    }

    /// The watchdog.
    pub fn watchdog_mut(&mut self) -> Option<&mut Watchdog> {
        self.bus.peripheral_mut(WATCHDOG_BASE)?.as_watchdog_mut()
    }

    /// The microsecond timer.
    pub fn timer_mut(&mut self) -> Option<&mut Timer> {
        self.bus.peripheral_mut(TIMER_BASE)?.as_timer_mut()
    }

    /// Delivers a byte from the host to UART `index`.
    ///
    /// Bytes for a nonexistent UART are dropped with a warning.
    pub fn feed_uart(&mut self, index: usize, byte: u8) {
        let base = [UART0_BASE, UART1_BASE].get(index).copied();
        let delivered = base.and_then(|base| {
            self.bus.with_peripheral(base, |p, ctx| {
                p.as_uart_mut().map(|uart| uart.feed_byte(byte, ctx))
            })
        });
        if delivered.flatten().is_none() {
            tracing::warn!(target: "soc", index, "byte for missing UART dropped");
        }
    }

    /// Drives a GPIO input pin.
    pub fn set_gpio_input(&mut self, pin: u32, level: bool) {
        self.bus.sio_mut().set_gpio_input(pin, level);
    }

    /// Drives the B pin of a PWM slice.
    pub fn set_pwm_input(&mut self, slice: usize, level: bool) {
        let _ = self.bus.with_peripheral(PWM_BASE, |p, ctx| {
            if let Some(pwm) = p.as_pwm_mut() {
                pwm.set_input_b(slice, level, ctx);
            }
        });
    }

    /// Tells the watchdog whether a debugger is attached.
    pub fn set_debugger_attached(&mut self, attached: bool) {
        let _ = self.bus.with_peripheral(WATCHDOG_BASE, |p, ctx| {
            if let Some(watchdog) = p.as_watchdog_mut() {
                watchdog.set_debugger_attached(attached, ctx.clock);
            }
        });
    }

    /// Resets every peripheral. Memories keep their contents.
    pub fn reset(&mut self) {
        self.bus.reset_peripherals();
    }
}
