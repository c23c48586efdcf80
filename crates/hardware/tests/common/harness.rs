use picosim_core::Simulator;
use picosim_core::common::reg::PC;
use picosim_core::config::Config;
use picosim_core::core::Cpu;
use picosim_core::soc::{Bus, System};

/// Where test programs are loaded.
pub const CODE_BASE: u32 = 0x2000_0000;
/// Vector table used by tests that take exceptions.
pub const VECTOR_BASE: u32 = 0x2000_4000;
/// Initial main stack pointer.
pub const STACK_TOP: u32 = 0x2004_0000;

/// A complete RP2040 with the core pointed at SRAM.
pub struct TestContext {
    /// The simulator under test.
    pub sim: Simulator,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Builds a machine from the default configuration.
    ///
    /// Flash is erased, so the reset vectors are meaningless; the harness overrides
    /// SP, PC and VTOR directly.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Builds a machine from `config`.
    pub fn with_config(config: &Config) -> Self {
        super::init_tracing();
        let system = System::new(config);
        let mut sim = Simulator::new(system, config);
        sim.cpu.bus.bus.irq.vtor = VECTOR_BASE;
        sim.cpu.regs.set_msp(STACK_TOP);
        sim.cpu.regs.set_pc(CODE_BASE);
        Self { sim }
    }

    /// Convenience accessor for the CPU.
    pub fn cpu(&self) -> &Cpu {
        &self.sim.cpu
    }

    /// Mutable convenience accessor for the CPU.
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.sim.cpu
    }

    /// The system bus.
    pub fn bus(&mut self) -> &mut Bus {
        &mut self.sim.cpu.bus.bus
    }

    /// Loads Thumb halfwords at `CODE_BASE` and points PC at them.
    pub fn load_program(self, halfwords: &[u16]) -> Self {
        self.load_at(CODE_BASE, halfwords)
    }

    /// Loads Thumb halfwords at `addr` without touching PC.
    pub fn load_at(mut self, addr: u32, halfwords: &[u16]) -> Self {
        for (i, hw) in halfwords.iter().enumerate() {
            self.bus().write16(addr + 2 * i as u32, *hw);
        }
        self
    }

    /// Points vector `exception` at `handler` (the Thumb bit is added).
    pub fn with_vector(mut self, exception: u32, handler: u32) -> Self {
        self.bus().write32(VECTOR_BASE + 4 * exception, handler | 1);
        self
    }

    /// Sets a general register.
    pub fn set_reg(&mut self, reg: usize, val: u32) {
        self.sim.cpu.regs.write(reg, val);
    }

    /// Reads a general register.
    pub fn get_reg(&self, reg: usize) -> u32 {
        self.sim.cpu.regs.read(reg)
    }

    /// Current program counter.
    pub fn pc(&self) -> u32 {
        self.sim.cpu.regs.read(PC)
    }

    /// Executes one instruction and returns its cycle count.
    pub fn step(&mut self) -> u32 {
        match self.sim.step() {
            Ok(cycles) => cycles,
            Err(e) => panic!("step failed at {:#010x}: {e}", self.pc()),
        }
    }

    /// Executes `n` instructions.
    pub fn run(&mut self, n: usize) {
        for _ in 0..n {
            let _ = self.step();
        }
    }
}
