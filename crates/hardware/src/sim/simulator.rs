//! Simulator: owns the CPU and drives it against the virtual clock.
//!
//! The driver turns instruction cycle counts into clock advances, skips idle time while
//! the core sleeps, and applies machine resets requested by the watchdog or
//! AIRCR.SYSRESETREQ.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::error::Result;
use crate::config::Config;
use crate::core::Cpu;
use crate::soc::System;

/// Steps run between deadline checks in [`Simulator::run_until`].
const DEADLINE_SLICE: u64 = 1024;

/// Why a call to [`Simulator::run_batch`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The step budget of the batch was used up.
    BatchComplete,
    /// The stop flag was raised.
    Stopped,
    /// The core is asleep and no alarm is scheduled, so only host input can wake it.
    Idle,
    /// The watchdog fired and the machine was reset.
    WatchdogReset,
    /// Firmware requested a system reset and the machine was reset.
    SystemReset,
}

/// Top-level simulator: CPU plus the policy for time, sleep and resets.
#[derive(Debug)]
pub struct Simulator {
    /// CPU architectural state, bus and stats.
    pub cpu: Cpu,
    stop: Arc<AtomicBool>,
    batch_steps: u64,
    watchdog_reset: bool,
    vector_base: u32,
    nanos_per_cycle: f64,
    fraction: f64,
}

impl Simulator {
    /// Creates a new simulator with the given system and configuration.
    ///
    /// Load firmware into `system` before calling this, or call [`Simulator::reset`]
    /// afterwards, so the reset vector is read from the image.
    pub fn new(system: System, config: &Config) -> Self {
        let cpu = Cpu::new(system, config);
        let sys_hz = config.clocks.sys_hz;
        Self {
            cpu,
            stop: Arc::new(AtomicBool::new(false)),
            batch_steps: config.simulation.batch_steps.max(1),
            watchdog_reset: config.simulation.watchdog_reset,
            vector_base: config.boot.vector_base(),
            nanos_per_cycle: if sys_hz > 0.0 { 1e9 / sys_hz } else { 0.0 },
            fraction: 0.0,
        }
    }

    /// Shared stop flag; storing `true` ends the current batch at the next step.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Requests the current batch to stop.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Current virtual time in nanoseconds.
    pub const fn now(&self) -> u64 {
        self.cpu.bus.bus.clock.now()
    }

    /// Resets the whole machine: peripherals, then the core through the vector table.
    ///
    /// Flash and SRAM keep their contents.
    pub fn reset(&mut self) {
        tracing::info!(target: "sim", now = self.now(), "machine reset");
        self.cpu.bus.reset();
        self.cpu.reset(self.vector_base);
        self.fraction = 0.0;
        self.cpu.stats.resets += 1;
    }

    /// Executes one instruction and advances the clock by its duration.
    ///
    /// # Errors
    ///
    /// Propagates decode errors and breakpoints from [`Cpu::step`].
    pub fn step(&mut self) -> Result<u32> {
        let cycles = self.cpu.step()?;
        self.advance_cycles(u64::from(cycles));
        Ok(cycles)
    }

    fn advance_cycles(&mut self, cycles: u64) {
        let exact = cycles as f64 * self.nanos_per_cycle + self.fraction;
        let whole = exact.floor();
        self.fraction = exact - whole;
        self.cpu.bus.bus.advance_clock(whole as u64);
    }

    /// Runs up to `batch_steps` iterations.
    ///
    /// Each iteration either executes one instruction, or, while the core sleeps, jumps
    /// the clock straight to the next alarm.
    ///
    /// # Errors
    ///
    /// Propagates decode errors and breakpoints; the machine stays at the faulting PC.
    pub fn run_batch(&mut self) -> Result<RunOutcome> {
        self.run_steps(self.batch_steps)
    }

    fn run_steps(&mut self, steps: u64) -> Result<RunOutcome> {
        for _ in 0..steps {
            if self.stop.swap(false, Ordering::AcqRel) {
                return Ok(RunOutcome::Stopped);
            }

            if self.cpu.is_waiting() {
                let cycles = self.cpu.step()?;
                if self.cpu.is_waiting() {
                    let clock = &self.cpu.bus.bus.clock;
                    if !clock.has_pending() {
                        return Ok(RunOutcome::Idle);
                    }
                    let delta = clock.time_to_next_alarm();
                    self.cpu.bus.bus.advance_clock(delta);
                    self.cpu.stats.wait_nanos += delta;
                } else {
                    self.advance_cycles(u64::from(cycles));
                }
            } else {
                let _ = self.step()?;
            }

            if let Some(outcome) = self.handle_events() {
                return Ok(outcome);
            }
        }
        Ok(RunOutcome::BatchComplete)
    }

    /// Runs batches until virtual time reaches `deadline` nanoseconds.
    ///
    /// # Returns
    ///
    /// [`RunOutcome::BatchComplete`] once the deadline passes, or the first outcome
    /// that interrupts a batch.
    ///
    /// # Errors
    ///
    /// Propagates decode errors and breakpoints.
    pub fn run_until(&mut self, deadline: u64) -> Result<RunOutcome> {
        while self.now() < deadline {
            match self.run_steps(self.batch_steps.min(DEADLINE_SLICE))? {
                RunOutcome::BatchComplete => {}
                other => return Ok(other),
            }
        }
        Ok(RunOutcome::BatchComplete)
    }

    fn handle_events(&mut self) -> Option<RunOutcome> {
        let events = &mut self.cpu.bus.bus.events;
        if events.watchdog_fired {
            events.watchdog_fired = false;
            if self.watchdog_reset {
                tracing::info!(target: "sim", "watchdog reset");
                self.reset();
                return Some(RunOutcome::WatchdogReset);
            }
        }
        if events.reset_requested {
            events.reset_requested = false;
            tracing::info!(target: "sim", "system reset requested");
            self.reset();
            return Some(RunOutcome::SystemReset);
        }
        None
    }
}
