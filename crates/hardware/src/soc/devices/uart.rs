//! Universal Asynchronous Receiver-Transmitter (UART).
//!
//! Implements the ARM PL011 UART found twice on the RP2040. It provides:
//! 1. **Receive:** A FIFO filled by the host through [`Uart::feed_byte`], with overrun
//!    detection when the guest does not drain it.
//! 2. **Transmit:** A FIFO shifted out at the programmed baud rate; each completed
//!    character is handed to the host through the `on_byte` callback.
//! 3. **Interrupts:** RX, RX timeout, TX and overrun conditions masked by UARTIMSC and
//!    driven onto the UART's NVIC line.

use std::collections::VecDeque;

use crate::clock::{AlarmHandle, VirtualClock};
use crate::soc::traits::{Peripheral, PeripheralContext, unknown_read, unknown_write};

/// Data register.
const UARTDR: u32 = 0x000;
/// Receive status / error clear register.
const UARTRSR: u32 = 0x004;
/// Flag register.
const UARTFR: u32 = 0x018;
/// IrDA low-power counter register.
const UARTILPR: u32 = 0x020;
/// Integer baud rate divisor.
const UARTIBRD: u32 = 0x024;
/// Fractional baud rate divisor (6 bits).
const UARTFBRD: u32 = 0x028;
/// Line control register.
const UARTLCR_H: u32 = 0x02C;
/// Control register.
const UARTCR: u32 = 0x030;
/// Interrupt FIFO level select.
const UARTIFLS: u32 = 0x034;
/// Interrupt mask set/clear.
const UARTIMSC: u32 = 0x038;
/// Raw interrupt status.
const UARTRIS: u32 = 0x03C;
/// Masked interrupt status.
const UARTMIS: u32 = 0x040;
/// Interrupt clear.
const UARTICR: u32 = 0x044;
/// DMA control.
const UARTDMACR: u32 = 0x048;

/// PrimeCell peripheral and cell identification registers (0xFE0..=0xFFC).
const PERIPH_ID: [u32; 8] = [0x11, 0x10, 0x34, 0x00, 0x0D, 0xF0, 0x05, 0xB1];

/// FR: transmit FIFO empty.
const FR_TXFE: u32 = 1 << 7;
/// FR: receive FIFO full.
const FR_RXFF: u32 = 1 << 6;
/// FR: transmit FIFO full.
const FR_TXFF: u32 = 1 << 5;
/// FR: receive FIFO empty.
const FR_RXFE: u32 = 1 << 4;
/// FR: transmitter busy.
const FR_BUSY: u32 = 1 << 3;

/// LCR_H: FIFO enable.
const LCR_FEN: u32 = 1 << 4;
/// LCR_H: two stop bits.
const LCR_STP2: u32 = 1 << 3;
/// LCR_H: parity enable.
const LCR_PEN: u32 = 1 << 1;

/// CR: UART enable.
const CR_UARTEN: u32 = 1 << 0;
/// CR: transmit enable.
const CR_TXE: u32 = 1 << 8;
/// CR: receive enable.
const CR_RXE: u32 = 1 << 9;

/// Interrupt: overrun error.
pub const INT_OE: u32 = 1 << 10;
/// Interrupt: receive timeout.
pub const INT_RT: u32 = 1 << 6;
/// Interrupt: transmit.
pub const INT_TX: u32 = 1 << 5;
/// Interrupt: receive.
pub const INT_RX: u32 = 1 << 4;

/// RSR / DR: overrun error bit.
const RSR_OE: u32 = 1 << 3;

/// Hardware FIFO depth of the PL011.
pub const FIFO_DEPTH: usize = 32;

/// Fill-level thresholds selected by IFLS (1/8, 1/4, 1/2, 3/4, 7/8 of the FIFO).
const FIFO_LEVELS: [usize; 5] = [4, 8, 16, 24, 28];

/// Callback receiving every transmitted character.
pub type ByteSink = Box<dyn FnMut(u8) + Send>;

/// PL011 UART.
pub struct Uart {
    name: &'static str,
    irq: u32,
    clock_hz: f64,
    rx_fifo: VecDeque<u8>,
    tx_fifo: VecDeque<u8>,
    tx_alarm: AlarmHandle,
    tx_shifting: Option<u8>,
    rsr: u32,
    ilpr: u32,
    ibrd: u32,
    fbrd: u32,
    lcr_h: u32,
    cr: u32,
    ifls: u32,
    imsc: u32,
    ris: u32,
    dmacr: u32,
    on_byte: Option<ByteSink>,
}

impl std::fmt::Debug for Uart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uart")
            .field("name", &self.name)
            .field("rx_fifo", &self.rx_fifo.len())
            .field("tx_fifo", &self.tx_fifo.len())
            .field("cr", &self.cr)
            .field("ris", &self.ris)
            .finish_non_exhaustive()
    }
}

impl Uart {
    /// Creates a UART in its reset state.
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock used to time character transmission.
    /// * `name` - Instance name (`"UART0"` / `"UART1"`).
    /// * `irq` - NVIC line of this instance.
    /// * `clock_hz` - Peripheral clock (`clk_peri`) frequency.
    pub fn new(clock: &mut VirtualClock, name: &'static str, irq: u32, clock_hz: f64) -> Self {
        Self {
            name,
            irq,
            clock_hz,
            rx_fifo: VecDeque::with_capacity(FIFO_DEPTH),
            tx_fifo: VecDeque::with_capacity(FIFO_DEPTH),
            tx_alarm: clock.create_alarm(),
            tx_shifting: None,
            rsr: 0,
            ilpr: 0,
            ibrd: 0,
            fbrd: 0,
            lcr_h: 0,
            cr: CR_RXE | CR_TXE,
            ifls: 0x12,
            imsc: 0,
            ris: 0,
            dmacr: 0,
            on_byte: None,
        }
    }

    /// Installs the host callback for transmitted characters.
    pub fn set_on_byte(&mut self, sink: ByteSink) {
        self.on_byte = Some(sink);
    }

    /// Whether the UART is enabled.
    pub const fn enabled(&self) -> bool {
        self.cr & CR_UARTEN != 0
    }

    /// Whether the transmitter is enabled.
    pub const fn tx_enabled(&self) -> bool {
        self.enabled() && self.cr & CR_TXE != 0
    }

    /// Whether the receiver is enabled.
    pub const fn rx_enabled(&self) -> bool {
        self.enabled() && self.cr & CR_RXE != 0
    }

    /// Whether the FIFOs are enabled (otherwise each direction holds one character).
    pub const fn fifos_enabled(&self) -> bool {
        self.lcr_h & LCR_FEN != 0
    }

    /// Bits per character (5-8).
    pub const fn word_length(&self) -> u32 {
        5 + ((self.lcr_h >> 5) & 3)
    }

    /// Baud rate divisor (integer part plus 6-bit fraction).
    pub fn baud_divisor(&self) -> f64 {
        f64::from(self.ibrd) + f64::from(self.fbrd & 0x3F) / 64.0
    }

    /// Programmed baud rate, or 0 if the divisor is unset.
    pub fn baud_rate(&self) -> f64 {
        let divisor = self.baud_divisor();
        if divisor == 0.0 { 0.0 } else { self.clock_hz / (16.0 * divisor) }
    }

    const fn fifo_capacity(&self) -> usize {
        if self.fifos_enabled() { FIFO_DEPTH } else { 1 }
    }

    /// Nanoseconds needed to shift out one complete character frame.
    fn frame_nanos(&self) -> Option<u64> {
        let baud = self.baud_rate();
        if baud <= 0.0 {
            return None;
        }
        let parity = u32::from(self.lcr_h & LCR_PEN != 0);
        let stop = if self.lcr_h & LCR_STP2 != 0 { 2 } else { 1 };
        let bits = 1 + self.word_length() + parity + stop;
        Some((f64::from(bits) * 1e9 / baud).round() as u64)
    }

    /// Current flag register value.
    pub fn flags(&self) -> u32 {
        let capacity = self.fifo_capacity();
        let mut fr = 0;
        if self.tx_fifo.is_empty() {
            fr |= FR_TXFE;
        }
        if self.tx_fifo.len() >= capacity {
            fr |= FR_TXFF;
        }
        if self.rx_fifo.is_empty() {
            fr |= FR_RXFE;
        }
        if self.rx_fifo.len() >= capacity {
            fr |= FR_RXFF;
        }
        if self.tx_shifting.is_some() || !self.tx_fifo.is_empty() {
            fr |= FR_BUSY;
        }
        fr
    }

    /// Raw interrupt status.
    pub const fn raw_interrupts(&self) -> u32 {
        self.ris
    }

    /// Number of characters waiting in the receive FIFO.
    pub fn rx_level(&self) -> usize {
        self.rx_fifo.len()
    }

    fn rx_trigger(&self) -> usize {
        FIFO_LEVELS.get(((self.ifls >> 3) & 7) as usize).copied().unwrap_or(16)
    }

    fn tx_trigger(&self) -> usize {
        FIFO_LEVELS.get((self.ifls & 7) as usize).copied().unwrap_or(16)
    }

    fn update_tx_interrupt(&mut self) {
        let threshold = if self.fifos_enabled() { self.tx_trigger() } else { 0 };
        if self.tx_fifo.len() <= threshold {
            self.ris |= INT_TX;
        } else {
            self.ris &= !INT_TX;
        }
    }

    /// Drives the NVIC line from the masked interrupt status.
    pub fn check_interrupts(&self, ctx: &mut PeripheralContext<'_>) {
        ctx.irq.set_interrupt(self.irq, self.ris & self.imsc != 0);
    }

    /// Delivers one character from the host to the receiver.
    ///
    /// The byte is dropped with an overrun error if the FIFO is already full.
    pub fn feed_byte(&mut self, value: u8, ctx: &mut PeripheralContext<'_>) {
        if self.rx_fifo.len() >= self.fifo_capacity() {
            tracing::debug!(target: "uart", "{}: RX overrun, dropping {value:#04x}", self.name);
            self.rsr |= RSR_OE;
            self.ris |= INT_OE;
        } else {
            self.rx_fifo.push_back(value);
            self.ris |= INT_RT;
            if !self.fifos_enabled() || self.rx_fifo.len() >= self.rx_trigger() {
                self.ris |= INT_RX;
            }
        }
        self.check_interrupts(ctx);
    }

    fn read_dr(&mut self) -> u32 {
        let value = self.rx_fifo.pop_front().map_or(0, u32::from);
        let level = self.rx_fifo.len();
        if level == 0 {
            self.ris &= !(INT_RX | INT_RT);
        } else if self.fifos_enabled() && level < self.rx_trigger() {
            self.ris &= !INT_RX;
        }
        value | if self.rsr & RSR_OE != 0 { 1 << 11 } else { 0 }
    }

    fn write_dr(&mut self, value: u8, ctx: &mut PeripheralContext<'_>) {
        if self.tx_fifo.len() >= self.fifo_capacity() {
            tracing::debug!(target: "uart", "{}: TX FIFO full, dropping {value:#04x}", self.name);
            return;
        }
        self.tx_fifo.push_back(value);
        self.update_tx_interrupt();
        self.start_transmit(ctx.clock);
    }

    fn start_transmit(&mut self, clock: &mut VirtualClock) {
        if self.tx_shifting.is_some() {
            return;
        }
        let Some(byte) = self.tx_fifo.pop_front() else {
            return;
        };
        match self.frame_nanos().filter(|_| self.tx_enabled()) {
            Some(nanos) => {
                self.tx_shifting = Some(byte);
                clock.schedule(self.tx_alarm, nanos);
            }
            None => {
                // Unclocked or disabled transmitter: hand the byte over at once.
                self.emit(byte);
                self.start_transmit(clock);
            }
        }
    }

    fn emit(&mut self, byte: u8) {
        tracing::trace!(target: "uart", "{}: TX {byte:#04x}", self.name);
        if let Some(sink) = self.on_byte.as_mut() {
            sink(byte);
        }
    }
}

impl Peripheral for Uart {
    fn name(&self) -> &str {
        self.name
    }

    fn read_u32(&mut self, offset: u32, ctx: &mut PeripheralContext<'_>) -> u32 {
        match offset {
            UARTDR => {
                let value = self.read_dr();
                self.check_interrupts(ctx);
                value
            }
            UARTRSR => self.rsr,
            UARTFR => self.flags(),
            UARTILPR => self.ilpr,
            UARTIBRD => self.ibrd,
            UARTFBRD => self.fbrd,
            UARTLCR_H => self.lcr_h,
            UARTCR => self.cr,
            UARTIFLS => self.ifls,
            UARTIMSC => self.imsc,
            UARTRIS => self.ris,
            UARTMIS => self.ris & self.imsc,
            UARTDMACR => self.dmacr,
            0xFE0..=0xFFC => PERIPH_ID[((offset - 0xFE0) >> 2) as usize],
            _ => unknown_read(self.name, offset),
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32, ctx: &mut PeripheralContext<'_>) {
        match offset {
            UARTDR => self.write_dr(value as u8, ctx),
            UARTRSR => {
                self.rsr = 0;
                self.ris &= !INT_OE;
            }
            UARTILPR => self.ilpr = value & 0xFF,
            UARTIBRD => self.ibrd = value & 0xFFFF,
            UARTFBRD => self.fbrd = value & 0x3F,
            UARTLCR_H => {
                self.lcr_h = value & 0xFF;
                tracing::debug!(
                    target: "uart",
                    "{}: baud {:.0}, {} data bits, fifo {}",
                    self.name,
                    self.baud_rate(),
                    self.word_length(),
                    self.fifos_enabled()
                );
                self.update_tx_interrupt();
            }
            UARTCR => {
                self.cr = value & 0xFF87;
                self.update_tx_interrupt();
                self.start_transmit(ctx.clock);
            }
            UARTIFLS => self.ifls = value & 0x3F,
            UARTIMSC => self.imsc = value & 0x7FF,
            UARTICR => self.ris &= !value,
            UARTDMACR => self.dmacr = value & 0x7,
            _ => unknown_write(self.name, offset, value),
        }
        self.check_interrupts(ctx);
    }

    fn reset(&mut self, ctx: &mut PeripheralContext<'_>) {
        ctx.clock.cancel(self.tx_alarm);
        self.rx_fifo.clear();
        self.tx_fifo.clear();
        self.tx_shifting = None;
        self.rsr = 0;
        self.ilpr = 0;
        self.ibrd = 0;
        self.fbrd = 0;
        self.lcr_h = 0;
        self.cr = CR_RXE | CR_TXE;
        self.ifls = 0x12;
        self.imsc = 0;
        self.ris = 0;
        self.dmacr = 0;
        self.check_interrupts(ctx);
    }

    fn alarm_handles(&self) -> Vec<AlarmHandle> {
        vec![self.tx_alarm]
    }

    fn on_alarm(&mut self, handle: AlarmHandle, ctx: &mut PeripheralContext<'_>) {
        if handle != self.tx_alarm {
            return;
        }
        if let Some(byte) = self.tx_shifting.take() {
            self.emit(byte);
        }
        self.update_tx_interrupt();
        self.start_transmit(ctx.clock);
        self.check_interrupts(ctx);
    }

    fn as_uart_mut(&mut self) -> Option<&mut Uart> {
        Some(self)
    }
}
