//! Simulation statistics collection and reporting.
//!
//! This module tracks execution metrics for the emulator. It provides:
//! 1. **Cycles and Throughput:** Core cycles, retired instructions and derived CPI/MIPS.
//! 2. **Instruction Mix:** Counts by category (ALU, load, store, branch, system).
//! 3. **Exceptions:** Exception entries taken by the core.
//! 4. **Idle Time:** Virtual time spent sleeping in WFI/WFE.

use std::fmt;
use std::time::Instant;

/// Simulation statistics structure tracking all execution metrics.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// Total core cycles elapsed.
    pub cycles: u64,
    /// Number of instructions retired.
    pub instructions_retired: u64,

    /// Count of load instructions retired (including POP and LDM).
    pub inst_load: u64,
    /// Count of store instructions retired (including PUSH and STM).
    pub inst_store: u64,
    /// Count of branch instructions retired.
    pub inst_branch: u64,
    /// Count of data-processing instructions retired.
    pub inst_alu: u64,
    /// Count of system instructions retired (MSR, MRS, CPS, SVC, hints, barriers).
    pub inst_system: u64,

    /// Number of exception entries.
    pub exceptions_taken: u64,
    /// Virtual nanoseconds spent with the core asleep.
    pub wait_nanos: u64,
    /// Number of machine resets after the initial one.
    pub resets: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            instructions_retired: 0,
            inst_load: 0,
            inst_store: 0,
            inst_branch: 0,
            inst_alu: 0,
            inst_system: 0,
            exceptions_taken: 0,
            wait_nanos: 0,
            resets: 0,
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"instruction_mix"`, `"exceptions"`.
/// Pass an empty slice to [`SimStats::render_sections`] to render all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "instruction_mix", "exceptions"];

impl SimStats {
    /// Host time elapsed since the statistics were created.
    pub fn host_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Renders the requested sections.
    ///
    /// # Arguments
    ///
    /// * `sections` - Section names to include, or empty for all.
    pub fn render_sections(&self, sections: &[String]) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.host_seconds().max(f64::MIN_POSITIVE);
        let cyc = self.cycles.max(1) as f64;
        let instr = self.instructions_retired.max(1) as f64;
        let pct = |n: u64| n as f64 / instr * 100.0;
        let mut out = String::new();

        out.push_str("==========================================================\n");
        out.push_str("RP2040 SIMULATION STATISTICS\n");
        out.push_str("==========================================================\n");
        if want("summary") {
            let mips = self.instructions_retired as f64 / seconds / 1_000_000.0;
            out.push_str(&format!("host_seconds             {seconds:.4} s\n"));
            out.push_str(&format!("sim_cycles               {}\n", self.cycles));
            out.push_str(&format!("sim_insts                {}\n", self.instructions_retired));
            out.push_str(&format!("sim_cpi                  {:.4}\n", cyc / instr));
            out.push_str(&format!("sim_mips                 {mips:.2}\n"));
            out.push_str("----------------------------------------------------------\n");
        }
        if want("instruction_mix") {
            out.push_str("INSTRUCTION MIX\n");
            for (name, n) in [
                ("op.alu", self.inst_alu),
                ("op.load", self.inst_load),
                ("op.store", self.inst_store),
                ("op.branch", self.inst_branch),
                ("op.system", self.inst_system),
            ] {
                out.push_str(&format!("  {name:<22} {n} ({:.2}%)\n", pct(n)));
            }
            out.push_str("----------------------------------------------------------\n");
        }
        if want("exceptions") {
            out.push_str("EXCEPTIONS\n");
            out.push_str(&format!("  exceptions.taken       {}\n", self.exceptions_taken));
            out.push_str(&format!("  resets                 {}\n", self.resets));
            out.push_str(&format!(
                "  wait.virtual_ms        {:.3}\n",
                self.wait_nanos as f64 / 1_000_000.0
            ));
        }
        out.push_str("==========================================================");
        out
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_sections(&[]))
    }
}
