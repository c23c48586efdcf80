//! Synchronous Serial Port (SPI).
//!
//! Implements the ARM PL022 SSP controller in master mode. Frames written to the
//! transmit FIFO are shifted out one at a time at the programmed bit rate. When a frame
//! completes, the `on_transfer` callback supplies the word clocked in from the device
//! (or the frame itself in loopback mode), which lands in the receive FIFO.

use std::collections::VecDeque;

use crate::clock::{AlarmHandle, VirtualClock};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

const SSPCR0: u32 = 0x000;
const SSPCR1: u32 = 0x004;
const SSPDR: u32 = 0x008;
const SSPSR: u32 = 0x00C;
const SSPCPSR: u32 = 0x010;
const SSPIMSC: u32 = 0x014;
const SSPRIS: u32 = 0x018;
const SSPMIS: u32 = 0x01C;
const SSPICR: u32 = 0x020;
const SSPDMACR: u32 = 0x024;

/// PrimeCell identification registers (0xFE0..=0xFFC).
const PERIPH_ID: [u32; 8] = [0x22, 0x10, 0x34, 0x00, 0x0D, 0xF0, 0x05, 0xB1];

const CR1_LBM: u32 = 1 << 0;
const CR1_SSE: u32 = 1 << 1;
const CR1_MS: u32 = 1 << 2;

const SR_TFE: u32 = 1 << 0;
const SR_TNF: u32 = 1 << 1;
const SR_RNE: u32 = 1 << 2;
const SR_RFF: u32 = 1 << 3;
const SR_BSY: u32 = 1 << 4;

/// Interrupt: receive overrun.
pub const INT_ROR: u32 = 1 << 0;
/// Interrupt: receive timeout.
pub const INT_RT: u32 = 1 << 1;
/// Interrupt: receive FIFO half full.
pub const INT_RX: u32 = 1 << 2;
/// Interrupt: transmit FIFO half empty.
pub const INT_TX: u32 = 1 << 3;

/// FIFO depth in frames.
pub const FIFO_DEPTH: usize = 8;

/// Callback exchanging one frame with the attached device.
pub type TransferHandler = Box<dyn FnMut(u16) -> u16 + Send>;

/// PL022 SPI controller.
pub struct Spi {
    name: &'static str,
    irq: u32,
    clock_hz: f64,
    rx_fifo: VecDeque<u16>,
    tx_fifo: VecDeque<u16>,
    in_flight: Option<u16>,
    transfer_alarm: AlarmHandle,
    cr0: u32,
    cr1: u32,
    cpsr: u32,
    imsc: u32,
    ris: u32,
    dmacr: u32,
    on_transfer: Option<TransferHandler>,
}

impl std::fmt::Debug for Spi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spi")
            .field("name", &self.name)
            .field("cr0", &self.cr0)
            .field("cr1", &self.cr1)
            .field("rx_fifo", &self.rx_fifo.len())
            .field("tx_fifo", &self.tx_fifo.len())
            .finish_non_exhaustive()
    }
}

impl Spi {
    /// Creates a SPI controller in its reset state.
    pub fn new(clock: &mut VirtualClock, name: &'static str, irq: u32, clock_hz: f64) -> Self {
        Self {
            name,
            irq,
            clock_hz,
            rx_fifo: VecDeque::with_capacity(FIFO_DEPTH),
            tx_fifo: VecDeque::with_capacity(FIFO_DEPTH),
            in_flight: None,
            transfer_alarm: clock.create_alarm(),
            cr0: 0,
            cr1: 0,
            cpsr: 0,
            imsc: 0,
            ris: INT_TX,
            dmacr: 0,
            on_transfer: None,
        }
    }

    /// Installs the device-side handler for completed frames.
    pub fn set_on_transfer(&mut self, handler: TransferHandler) {
        self.on_transfer = Some(handler);
    }

    /// Whether the port is enabled (CR1.SSE).
    pub const fn enabled(&self) -> bool {
        self.cr1 & CR1_SSE != 0
    }

    /// Whether internal loopback is selected.
    pub const fn loopback(&self) -> bool {
        self.cr1 & CR1_LBM != 0
    }

    /// Bits per frame (4-16). The reserved sizes below 4 bits run as 4-bit frames.
    pub const fn data_bits(&self) -> u32 {
        let bits = (self.cr0 & 0xF) + 1;
        if bits < 4 { 4 } else { bits }
    }

    /// SPI mode 0-3 from clock polarity (SPO) and phase (SPH).
    pub const fn mode(&self) -> u32 {
        (((self.cr0 >> 6) & 1) << 1) | ((self.cr0 >> 7) & 1)
    }

    /// Serial clock rate in bits per second, or 0 when unprogrammed.
    pub fn bit_rate(&self) -> f64 {
        let scr = f64::from((self.cr0 >> 8) & 0xFF);
        let cpsdvsr = f64::from(self.cpsr & 0xFE);
        if cpsdvsr == 0.0 { 0.0 } else { self.clock_hz / (cpsdvsr * (1.0 + scr)) }
    }

    /// Whether a frame is in flight or queued.
    pub fn busy(&self) -> bool {
        self.in_flight.is_some() || !self.tx_fifo.is_empty()
    }

    /// Current status register value.
    pub fn status(&self) -> u32 {
        let mut sr = 0;
        if self.tx_fifo.is_empty() {
            sr |= SR_TFE;
        }
        if self.tx_fifo.len() < FIFO_DEPTH {
            sr |= SR_TNF;
        }
        if !self.rx_fifo.is_empty() {
            sr |= SR_RNE;
        }
        if self.rx_fifo.len() >= FIFO_DEPTH {
            sr |= SR_RFF;
        }
        if self.busy() {
            sr |= SR_BSY;
        }
        sr
    }

    fn update_fifo_interrupts(&mut self) {
        if self.tx_fifo.len() <= FIFO_DEPTH / 2 {
            self.ris |= INT_TX;
        } else {
            self.ris &= !INT_TX;
        }
        if self.rx_fifo.len() >= FIFO_DEPTH / 2 {
            self.ris |= INT_RX;
        } else {
            self.ris &= !INT_RX;
        }
        if self.rx_fifo.is_empty() {
            self.ris &= !INT_RT;
        }
    }

    fn check_interrupts(&self, ctx: &mut PeripheralContext<'_>) {
        ctx.irq.set_interrupt(self.irq, self.ris & self.imsc != 0);
    }

    fn frame_nanos(&self) -> Option<u64> {
        let rate = self.bit_rate();
        if rate <= 0.0 {
            return None;
        }
        Some((f64::from(self.data_bits()) * 1e9 / rate).round() as u64)
    }

    fn start_transfer(&mut self, clock: &mut VirtualClock) {
        if self.in_flight.is_some() || !self.enabled() {
            return;
        }
        let Some(frame) = self.tx_fifo.pop_front() else {
            return;
        };
        self.in_flight = Some(frame);
        // Unclocked ports complete on the next clock advance.
        clock.schedule(self.transfer_alarm, self.frame_nanos().unwrap_or(0));
    }

    fn complete_transfer(&mut self, frame: u16) {
        let mask = ((1u32 << self.data_bits()) - 1) as u16;
        let rx = if self.loopback() {
            frame
        } else {
            self.on_transfer.as_mut().map_or(0, |handler| handler(frame & mask))
        };
        tracing::trace!(target: "spi", "{}: TX {frame:#06x} RX {rx:#06x}", self.name);
        if self.rx_fifo.len() >= FIFO_DEPTH {
            self.ris |= INT_ROR;
        } else {
            self.rx_fifo.push_back(rx & mask);
            self.ris |= INT_RT;
        }
    }
}

impl Peripheral for Spi {
    fn name(&self) -> &str {
        self.name
    }

    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            SSPCR0 => self.cr0,
            SSPCR1 => self.cr1,
            SSPDR => {
                let value = self.rx_fifo.pop_front().map_or(0, u32::from);
                self.update_fifo_interrupts();
                self.check_interrupts(ctx);
                value
            }
            SSPSR => self.status(),
            SSPCPSR => self.cpsr,
            SSPIMSC => self.imsc,
            SSPRIS => self.ris,
            SSPMIS => self.ris & self.imsc,
            SSPDMACR => self.dmacr,
            0xFE0..=0xFFC => PERIPH_ID[((offset - 0xFE0) >> 2) as usize],
            _ => unknown_read(self.name, offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        match offset {
            SSPCR0 => {
                self.cr0 = value & 0xFFFF;
                if self.cr0 & 0xF < 3 {
                    tracing::warn!(target: "spi", "{}: reserved DSS {}", self.name, self.cr0 & 0xF);
                }
                if (self.cr0 >> 4) & 3 != 0 {
                    tracing::warn!(
                        target: "spi",
                        "{}: only Motorola frame format is modelled",
                        self.name
                    );
                }
            }
            SSPCR1 => {
                self.cr1 = value & 0xF;
                if self.cr1 & CR1_MS != 0 {
                    tracing::warn!(target: "spi", "{}: slave mode is not supported", self.name);
                }
                if self.enabled() {
                    tracing::debug!(
                        target: "spi",
                        "{}: enabled, mode {}, {} bits, {:.0} bit/s",
                        self.name,
                        self.mode(),
                        self.data_bits(),
                        self.bit_rate()
                    );
                }
                self.start_transfer(ctx.clock);
            }
            SSPDR => {
                if self.tx_fifo.len() < FIFO_DEPTH {
                    self.tx_fifo.push_back(value as u16);
                    self.start_transfer(ctx.clock);
                } else {
                    tracing::debug!(target: "spi", "{}: TX FIFO full", self.name);
                }
                self.update_fifo_interrupts();
            }
            SSPCPSR => self.cpsr = value & 0xFE,
            SSPIMSC => self.imsc = value & 0xF,
            SSPICR => self.ris &= !(value & (INT_ROR | INT_RT)),
            SSPDMACR => self.dmacr = value & 0x3,
            _ => unknown_write(self.name, offset, value),
        }
        self.check_interrupts(ctx);
    }

    fn reset(&mut self, ctx: &mut PeripheralContext<'_>) {
        ctx.clock.cancel(self.transfer_alarm);
        self.rx_fifo.clear();
        self.tx_fifo.clear();
        self.in_flight = None;
        self.cr0 = 0;
        self.cr1 = 0;
        self.cpsr = 0;
        self.imsc = 0;
        self.ris = INT_TX;
        self.dmacr = 0;
        self.check_interrupts(ctx);
    }

    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        vec![self.transfer_alarm]
    }

    fn on_alarm(&mut self, handle: AlarmHandle, ctx: &mut PeripheralContext<'_>) {
        if handle != self.transfer_alarm {
            return;
        }
        if let Some(frame) = self.in_flight.take() {
            self.complete_transfer(frame);
        }
        self.start_transfer(ctx.clock);
        self.update_fifo_interrupts();
        self.check_interrupts(ctx);
    }

    fn as_spi_mut(&mut self) -> Option<&mut Spi> {
        Some(self)
    }
}
