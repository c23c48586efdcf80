//! System interconnect (bus) for memory and MMIO access.
//!
//! This module implements the address-space router between the core and everything it
//! can reach. It provides:
//! 1. **Memory Regions:** Boot ROM, the four mirrored flash windows, SRAM and USB DPRAM,
//!    serviced directly from their backing arrays.
//! 2. **Core-Local Blocks:** The private peripheral bus (NVIC, SCB, SysTick) and SIO.
//! 3. **Peripheral Registry:** A sparse map from 16 KiB-aligned base address to a boxed
//!    [`Peripheral`], with address bits 13:12 selecting the atomic write alias.
//! 4. **Time:** Ownership of the [`VirtualClock`], dispatching fired alarms back to the
//!    peripheral that created them.
//! 5. **Timing:** Wait states charged for loads and stores that cross onto the APB/AHB.
//!
//! Accesses that match no region are logged; reads return all ones and writes are dropped.

use std::collections::{BTreeMap, HashMap};

use crate::clock::{AlarmHandle, VirtualClock};
use crate::common::constants::{
    DPRAM_BASE, DPRAM_SIZE, FLASH_BASE, FLASH_END, FLASH_SIZE, PERIPHERAL_WINDOW, PPB_BASE,
    RAM_BASE, RAM_SIZE, ROM_SIZE, SIO_BASE,
};
use crate::soc::devices::{Ppb, Sio};
use crate::soc::memory::Memory;
use crate::soc::nvic::InterruptController;
use crate::soc::traits::{AtomicKind, Peripheral, PeripheralContext, SystemEvents};

/// Host hook invoked after every write into USB DPRAM with `(offset, word)`.
pub type DpramHook = Box<dyn FnMut(u32, u32) + Send>;

/// Owner of a clock alarm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AlarmRoute {
    Ppb,
    Peripheral(u32),
}

/// Decoded target of a bus address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Rom(u32),
    Flash(u32),
    Sram(u32),
    Dpram(u32),
    Ppb(u32),
    Sio(u32),
    Peripheral { base: u32, offset: u32, kind: AtomicKind },
}

/// The RP2040 system bus.
pub struct Bus {
    /// Virtual time base of the whole machine.
    pub clock: VirtualClock,
    /// Interrupt lines and exception pending state.
    pub irq: InterruptController,
    /// Reset and watchdog requests raised by peripherals.
    pub events: SystemEvents,
    /// Boot ROM.
    pub rom: Memory,
    /// External QSPI flash, shared by the four XIP windows.
    pub flash: Memory,
    /// Main SRAM.
    pub sram: Memory,
    /// USB controller dual-port RAM.
    pub dpram: Memory,
    dpram_hook: Option<DpramHook>,
    ppb: Ppb,
    sio: Sio,
    peripherals: BTreeMap<u32, Box<dyn Peripheral>>,
    alarm_routes: HashMap<AlarmHandle, AlarmRoute>,
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<(String, &str)> = self
            .peripherals
            .iter()
            .map(|(base, p)| (format!("{base:#010x}"), p.name()))
            .collect();
        f.debug_struct("Bus")
            .field("now", &self.clock.now())
            .field("irq", &self.irq)
            .field("peripherals", &names)
            .finish_non_exhaustive()
    }
}

impl Bus {
    /// Creates a bus with empty memories and no peripherals attached.
    ///
    /// Flash starts erased (all ones).
    ///
    /// # Arguments
    ///
    /// * `sys_hz` - Processor clock, used by SysTick.
    pub fn new(sys_hz: f64) -> Self {
        let mut clock = VirtualClock::new();
        let ppb = Ppb::new(&mut clock, sys_hz);
        let mut flash = Memory::new("flash", FLASH_SIZE);
        flash.fill(0xFF);
        let mut bus = Self {
            clock,
            irq: InterruptController::new(),
            events: SystemEvents::default(),
            rom: Memory::new("rom", ROM_SIZE),
            flash,
            sram: Memory::new("sram", RAM_SIZE),
            dpram: Memory::new("dpram", DPRAM_SIZE),
            dpram_hook: None,
            ppb,
            sio: Sio::new(),
            peripherals: BTreeMap::new(),
            alarm_routes: HashMap::new(),
        };
        for handle in bus.ppb.alarm_handles() {
            let _ = bus.alarm_routes.insert(handle, AlarmRoute::Ppb);
        }
        bus
    }

    /// Registers a peripheral at a 16 KiB-aligned base address.
    ///
    /// An existing peripheral at the same base is replaced.
    pub fn attach(&mut self, base: u32, peripheral: Box<dyn Peripheral>) {
        let base = base & !(PERIPHERAL_WINDOW - 1);
        for handle in peripheral.alarm_handles() {
            let _ = self.alarm_routes.insert(handle, AlarmRoute::Peripheral(base));
        }
        tracing::debug!(target: "bus", "attached {} at {base:#010x}", peripheral.name());
        if let Some(old) = self.peripherals.insert(base, peripheral) {
            tracing::warn!(target: "bus", "{} at {base:#010x} replaced", old.name());
        }
    }

    /// Installs the DPRAM write hook.
    pub fn set_dpram_hook(&mut self, hook: DpramHook) {
        self.dpram_hook = Some(hook);
    }

    /// Runs `f` against the peripheral at `base` with a live context.
    ///
    /// # Returns
    ///
    /// The closure result, or `None` if nothing is attached at `base`.
    pub fn with_peripheral<R>(
        &mut self,
        base: u32,
        f: impl FnOnce(&mut dyn Peripheral, &mut PeripheralContext<'_>) -> R,
    ) -> Option<R> {
        let peripheral = self.peripherals.get_mut(&base)?;
        let mut ctx = PeripheralContext {
            clock: &mut self.clock,
            irq: &mut self.irq,
            events: &mut self.events,
        };
        Some(f(&mut **peripheral, &mut ctx))
    }

    /// Mutable access to the peripheral attached at `base`.
    pub fn peripheral_mut(&mut self, base: u32) -> Option<&mut (dyn Peripheral + 'static)> {
        self.peripherals.get_mut(&base).map(|p| &mut **p)
    }

    /// The SIO block.
    pub const fn sio(&self) -> &Sio {
        &self.sio
    }

    /// Mutable access to the SIO block.
    pub const fn sio_mut(&mut self) -> &mut Sio {
        &mut self.sio
    }

    /// The private peripheral bus.
    pub const fn ppb(&self) -> &Ppb {
        &self.ppb
    }

    fn decode(address: u32) -> Region {
        if (address as usize) < ROM_SIZE {
            return Region::Rom(address);
        }
        if (FLASH_BASE..FLASH_END).contains(&address) {
            return Region::Flash((address - FLASH_BASE) & (FLASH_SIZE as u32 - 1));
        }
        if (RAM_BASE..RAM_BASE + RAM_SIZE as u32).contains(&address) {
            return Region::Sram(address - RAM_BASE);
        }
        if (DPRAM_BASE..DPRAM_BASE + DPRAM_SIZE as u32).contains(&address) {
            return Region::Dpram(address - DPRAM_BASE);
        }
        if address >> 12 == PPB_BASE >> 12 {
            return Region::Ppb(address & 0xFFF);
        }
        if address >> 28 == SIO_BASE >> 28 {
            return Region::Sio(address & 0xFFF);
        }
        Region::Peripheral {
            base: address & !(PERIPHERAL_WINDOW - 1),
            offset: address & 0xFFF,
            kind: AtomicKind::from_address(address),
        }
    }

    /// Reads a 32-bit word.
    ///
    /// Unaligned addresses are logged and rounded down.
    pub fn read32(&mut self, address: u32) -> u32 {
        if address & 3 != 0 {
            tracing::warn!(target: "bus", "unaligned 32-bit read at {address:#010x}");
        }
        let address = address & !3;
        let mut ctx = PeripheralContext {
            clock: &mut self.clock,
            irq: &mut self.irq,
            events: &mut self.events,
        };
        match Self::decode(address) {
            Region::Rom(offset) => self.rom.read_u32(offset),
            Region::Flash(offset) => self.flash.read_u32(offset),
            Region::Sram(offset) => self.sram.read_u32(offset),
            Region::Dpram(offset) => self.dpram.read_u32(offset),
            Region::Ppb(offset) => self.ppb.read_u32(offset, &mut ctx),
            Region::Sio(offset) => self.sio.read_u32(offset, &mut ctx),
            Region::Peripheral { base, offset, .. } => match self.peripherals.get_mut(&base) {
                Some(peripheral) => peripheral.read_u32(offset, &mut ctx),
                None => Self::unmapped_read(address),
            },
        }
    }

    /// Reads a halfword. Register blocks are read as a whole word.
    pub fn read16(&mut self, address: u32) -> u16 {
        if address & 1 != 0 {
            tracing::warn!(target: "bus", "unaligned 16-bit read at {address:#010x}");
        }
        let address = address & !1;
        match Self::decode(address) {
            Region::Rom(offset) => self.rom.read_u16(offset),
            Region::Flash(offset) => self.flash.read_u16(offset),
            Region::Sram(offset) => self.sram.read_u16(offset),
            Region::Dpram(offset) => self.dpram.read_u16(offset),
            _ => (self.read32(address & !3) >> ((address & 2) * 8)) as u16,
        }
    }

    /// Reads a byte. Register blocks are read as a whole word.
    pub fn read8(&mut self, address: u32) -> u8 {
        match Self::decode(address) {
            Region::Rom(offset) => self.rom.read_u8(offset),
            Region::Flash(offset) => self.flash.read_u8(offset),
            Region::Sram(offset) => self.sram.read_u8(offset),
            Region::Dpram(offset) => self.dpram.read_u8(offset),
            _ => (self.read32(address & !3) >> ((address & 3) * 8)) as u8,
        }
    }

    /// Writes a 32-bit word.
    ///
    /// Unaligned addresses are logged and rounded down.
    pub fn write32(&mut self, address: u32, value: u32) {
        if address & 3 != 0 {
            tracing::warn!(target: "bus", "unaligned 32-bit write at {address:#010x}");
        }
        let address = address & !3;
        let mut ctx = PeripheralContext {
            clock: &mut self.clock,
            irq: &mut self.irq,
            events: &mut self.events,
        };
        match Self::decode(address) {
            Region::Rom(offset) => self.rom.write_u32(offset, value),
            Region::Flash(offset) => self.flash.write_u32(offset, value),
            Region::Sram(offset) => self.sram.write_u32(offset, value),
            Region::Dpram(offset) => {
                self.dpram.write_u32(offset, value);
                if let Some(hook) = self.dpram_hook.as_mut() {
                    hook(offset, value);
                }
            }
            Region::Ppb(offset) => self.ppb.write_u32(offset, value, &mut ctx),
            Region::Sio(offset) => self.sio.write_u32(offset, value, &mut ctx),
            Region::Peripheral { base, offset, kind } => match self.peripherals.get_mut(&base) {
                Some(peripheral) => peripheral.write_u32_atomic(offset, value, kind, &mut ctx),
                None => Self::unmapped_write(address, value),
            },
        }
    }

    /// Writes a halfword.
    ///
    /// Register blocks only decode whole words; the halfword is replicated into both
    /// lanes, as the APB bridge does.
    pub fn write16(&mut self, address: u32, value: u16) {
        if address & 1 != 0 {
            tracing::warn!(target: "bus", "unaligned 16-bit write at {address:#010x}");
        }
        let address = address & !1;
        match Self::decode(address) {
            Region::Rom(offset) => self.rom.write_u16(offset, value),
            Region::Flash(offset) => self.flash.write_u16(offset, value),
            Region::Sram(offset) => self.sram.write_u16(offset, value),
            Region::Dpram(offset) => {
                self.dpram.write_u16(offset, value);
                self.notify_dpram(offset);
            }
            _ => self.write32(address & !3, u32::from(value) * 0x0001_0001),
        }
    }

    /// Writes a byte.
    ///
    /// Register blocks receive the byte replicated into all four lanes.
    pub fn write8(&mut self, address: u32, value: u8) {
        match Self::decode(address) {
            Region::Rom(offset) => self.rom.write_u8(offset, value),
            Region::Flash(offset) => self.flash.write_u8(offset, value),
            Region::Sram(offset) => self.sram.write_u8(offset, value),
            Region::Dpram(offset) => {
                self.dpram.write_u8(offset, value);
                self.notify_dpram(offset);
            }
            _ => self.write32(address & !3, u32::from(value) * 0x0101_0101),
        }
    }

    fn notify_dpram(&mut self, offset: u32) {
        if let Some(hook) = self.dpram_hook.as_mut() {
            let word_offset = offset & !3;
            hook(word_offset, self.dpram.read_u32(word_offset));
        }
    }

    fn unmapped_read(address: u32) -> u32 {
        tracing::warn!(target: "bus", "read from unmapped address {address:#010x}");
        0xFFFF_FFFF
    }

    fn unmapped_write(address: u32, value: u32) {
        tracing::warn!(target: "bus", "write {value:#010x} to unmapped address {address:#010x}");
    }

    /// Extra cycles a load or store to `address` costs over a zero-wait-state access.
    pub const fn cycles_io(address: u32, is_write: bool) -> u64 {
        match address >> 28 {
            0x4 => {
                if is_write { 4 } else { 3 }
            }
            0x5 => 1,
            _ => 0,
        }
    }

    /// Advances virtual time, dispatching every alarm that falls due to its owner.
    pub fn advance_clock(&mut self, delta_nanos: u64) {
        let Self { clock, irq, events, ppb, peripherals, alarm_routes, .. } = self;
        clock.advance(delta_nanos, |clk, handle| {
            let mut ctx = PeripheralContext {
                clock: clk,
                irq: &mut *irq,
                events: &mut *events,
            };
            match alarm_routes.get(&handle) {
                Some(AlarmRoute::Ppb) => ppb.on_alarm(handle, &mut ctx),
                Some(AlarmRoute::Peripheral(base)) => {
                    if let Some(peripheral) = peripherals.get_mut(base) {
                        peripheral.on_alarm(handle, &mut ctx);
                    }
                }
                None => {
                    tracing::warn!(target: "bus", alarm = handle.index(), "unowned alarm fired");
                }
            }
        });
    }

    /// Returns every register block to its reset state.
    ///
    /// Memories are left untouched; pending alarms are dropped.
    pub fn reset_peripherals(&mut self) {
        self.clock.cancel_all();
        self.events = SystemEvents::default();
        let mut ctx = PeripheralContext {
            clock: &mut self.clock,
            irq: &mut self.irq,
            events: &mut self.events,
        };
        self.ppb.reset(&mut ctx);
        self.sio.reset(&mut ctx);
        for peripheral in self.peripherals.values_mut() {
            peripheral.reset(&mut ctx);
        }
    }
}
