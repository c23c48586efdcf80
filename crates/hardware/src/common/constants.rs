//! RP2040 memory map and interrupt numbers.
//!
//! This module defines the fixed address map of the chip. It includes:
//! 1. **Memory Regions:** Boot ROM, flash (XIP), SRAM, USB DPRAM.
//! 2. **Bus Blocks:** APB/AHB peripheral windows, SIO and the core-private PPB.
//! 3. **Interrupts:** External IRQ line numbers used by the modelled peripherals.
//! 4. **Exceptions:** Cortex-M0+ system exception numbers and EXC_RETURN encoding.

/// Base address of the boot ROM.
pub const ROM_BASE: u32 = 0x0000_0000;

/// Size of the boot ROM in bytes (16 KiB).
pub const ROM_SIZE: usize = 16 * 1024;

/// Base address of the first flash (XIP) window.
pub const FLASH_BASE: u32 = 0x1000_0000;

/// End of the four mirrored XIP windows (exclusive).
pub const FLASH_END: u32 = 0x1400_0000;

/// Size of the flash backing array in bytes (16 MiB).
pub const FLASH_SIZE: usize = 16 * 1024 * 1024;

/// Stride between the mirrored flash windows.
pub const FLASH_WINDOW_STRIDE: u32 = 0x0100_0000;

/// Base address of main SRAM.
pub const RAM_BASE: u32 = 0x2000_0000;

/// Size of main SRAM in bytes (264 KiB).
pub const RAM_SIZE: usize = 264 * 1024;

/// Base address of the APB peripheral window.
pub const APB_BASE: u32 = 0x4000_0000;

/// Base address of the AHB-Lite peripheral window.
pub const AHB_BASE: u32 = 0x5000_0000;

/// Base address of the USB controller dual-port RAM.
pub const DPRAM_BASE: u32 = 0x5010_0000;

/// Size of the USB dual-port RAM in bytes (4 KiB).
pub const DPRAM_SIZE: usize = 4 * 1024;

/// Base address of the single-cycle I/O block.
pub const SIO_BASE: u32 = 0xd000_0000;

/// Base address of the Cortex-M0+ private peripheral bus (NVIC, SCB, SysTick).
pub const PPB_BASE: u32 = 0xe000_e000;

/// Size of the peripheral registry window per device (16 KiB).
pub const PERIPHERAL_WINDOW: u32 = 0x4000;

/// Boot stage 2 occupies the first 256 bytes of flash; the vector table follows.
pub const FLASH_VECTOR_TABLE: u32 = FLASH_BASE + 0x100;

/// TIMER alarm IRQs occupy lines 0..=3.
pub const IRQ_TIMER_0: u32 = 0;
/// PWM wrap interrupt.
pub const IRQ_PWM_WRAP: u32 = 4;
/// SPI0 combined interrupt.
pub const IRQ_SPI0: u32 = 18;
/// SPI1 combined interrupt.
pub const IRQ_SPI1: u32 = 19;
/// UART0 combined interrupt.
pub const IRQ_UART0: u32 = 20;
/// UART1 combined interrupt.
pub const IRQ_UART1: u32 = 21;

/// Number of external interrupt lines wired to the NVIC.
pub const NUM_IRQS: usize = 32;

/// Exception number of Reset.
pub const EXC_RESET: u32 = 1;
/// Exception number of NMI.
pub const EXC_NMI: u32 = 2;
/// Exception number of HardFault.
pub const EXC_HARDFAULT: u32 = 3;
/// Exception number of SVCall.
pub const EXC_SVCALL: u32 = 11;
/// Exception number of PendSV.
pub const EXC_PENDSV: u32 = 14;
/// Exception number of SysTick.
pub const EXC_SYSTICK: u32 = 15;
/// Exception number of external IRQ 0.
pub const EXC_IRQ0: u32 = 16;

/// EXC_RETURN: return to Handler mode, main stack.
pub const EXC_RETURN_HANDLER: u32 = 0xFFFF_FFF1;
/// EXC_RETURN: return to Thread mode, main stack.
pub const EXC_RETURN_THREAD_MSP: u32 = 0xFFFF_FFF9;
/// EXC_RETURN: return to Thread mode, process stack.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;
