//! RP2040 emulator CLI.
//!
//! This binary runs firmware headlessly. It performs:
//! 1. **Loading:** Reads a UF2, ELF or raw image (and optionally a boot ROM) into the machine.
//! 2. **Execution:** Drives the simulator in batches until a time limit, an idle core with
//!    no input, or a fatal error.
//! 3. **Serial I/O:** UART0 output goes to stdout; stdin bytes are fed into UART0 between
//!    batches.
//! 4. **Reporting:** Logs via `tracing` on stderr (`RUST_LOG`, default `warn`) and optional
//!    statistics on exit.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use picosim_core::common::{LoadError, SimError};
use picosim_core::config::{BootMode, Config};
use picosim_core::sim::loader;
use picosim_core::{RunOutcome, Simulator, System};

/// How long an idle core waits for host input before checking again.
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(
    name = "picosim",
    author,
    version,
    about = "Deterministic headless RP2040 emulator",
    long_about = "Run RP2040 firmware without hardware.\n\nUART0 is connected to stdin/stdout; logs go to stderr (set RUST_LOG, e.g. RUST_LOG=cpu=trace).\n\nExamples:\n  picosim run blink.uf2\n  picosim run firmware.elf --max-ms 500 --stats\n  picosim run app.bin --bootrom bootrom.bin --config sim.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a firmware image.
    Run {
        /// Firmware image (UF2, ELF or raw flash binary).
        image: PathBuf,

        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Boot ROM image; boots through the ROM instead of straight into flash.
        #[arg(long)]
        bootrom: Option<PathBuf>,

        /// Stop after this many milliseconds of virtual time.
        #[arg(long)]
        max_ms: Option<u64>,

        /// Print execution statistics on exit.
        #[arg(long)]
        stats: bool,
    },
}

/// Failures that end the CLI with a non-zero status.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration or execution failure.
    #[error(transparent)]
    Sim(#[from] SimError),
    /// Image could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cli = Cli::parse();
    let Commands::Run { image, config, bootrom, max_ms, stats } = cli.command;
    if let Err(e) = cmd_run(&image, config, bootrom, max_ms, stats) {
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

/// Spawns a thread forwarding stdin bytes; the channel closes at end of input.
fn spawn_stdin_reader() -> Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    let _ = thread::spawn(move || {
        let mut byte = [0u8; 1];
        let mut stdin = io::stdin().lock();
        while let Ok(1) = stdin.read(&mut byte) {
            if tx.send(byte[0]).is_err() {
                break;
            }
        }
    });
    rx
}

/// Loads the image, runs it and reports.
fn cmd_run(
    image: &Path,
    config_path: Option<PathBuf>,
    bootrom: Option<PathBuf>,
    max_ms: Option<u64>,
    stats: bool,
) -> Result<(), CliError> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if bootrom.is_some() {
        config.boot.mode = BootMode::Bootrom;
    }

    let mut system = System::new(&config);
    let bytes = loader::load_binary(image)?;
    let format = loader::load_image(&mut system.bus, &bytes)?;
    tracing::info!("loaded {} as {format:?}", image.display());
    if let Some(path) = bootrom {
        loader::load_bootrom(&mut system.bus, &loader::load_binary(path)?)?;
    }
    if let Some(uart) = system.uart_mut(0) {
        uart.set_on_byte(Box::new(|byte| {
            let mut out = io::stdout().lock();
            let _ = out.write_all(&[byte]);
            let _ = out.flush();
        }));
    }

    let mut sim = Simulator::new(system, &config);
    let deadline = max_ms.map(|ms| ms.saturating_mul(1_000_000));
    let input = spawn_stdin_reader();
    let mut input_open = true;

    let result = loop {
        while let Ok(byte) = input.try_recv() {
            sim.cpu.bus.feed_uart(0, byte);
        }
        let outcome = match deadline {
            Some(limit) if sim.now() >= limit => break Ok(()),
            Some(limit) => sim.run_until(limit),
            None => sim.run_batch(),
        };
        match outcome {
            Ok(RunOutcome::Idle) => {
                if !input_open {
                    eprintln!("\n[*] Core idle with no pending events; stopping");
                    break Ok(());
                }
                match input.recv_timeout(IDLE_POLL) {
                    Ok(byte) => sim.cpu.bus.feed_uart(0, byte),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => input_open = false,
                }
            }
            Ok(RunOutcome::WatchdogReset) => eprintln!("\n[*] Watchdog reset"),
            Ok(RunOutcome::SystemReset) => eprintln!("\n[*] System reset"),
            Ok(RunOutcome::BatchComplete | RunOutcome::Stopped) => {}
            Err(e) => {
                eprintln!("\n[!] {}", sim.cpu.regs.dump());
                break Err(e);
            }
        }
    };

    let _ = io::stdout().flush();
    if stats {
        eprintln!("\n{}", sim.cpu.stats);
        eprintln!("virtual time             {:.3} ms", sim.now() as f64 / 1_000_000.0);
    }
    result.map_err(CliError::from)
}
