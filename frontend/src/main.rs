use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use slog::{Drain, Level, Logger, o};
use spectra_core::controller::MachineController;
use spectra_machines::registry;

mod config;
mod emulator;
mod rom_path;
mod screenshot;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "spectra")]
#[command(about = "Headless ZX Spectrum runner", long_about = None)]
struct Cli {
    /// Machine to emulate (see --list-machines)
    #[arg(long)]
    machine: Option<String>,

    /// Directory of ROM files, a directory holding <rom-name>.zip, or a ZIP file
    #[arg(long)]
    rom_path: Option<PathBuf>,

    /// Whole frames to run before stopping
    #[arg(long)]
    frames: Option<u64>,

    /// Integer CPU clock multiplier
    #[arg(long)]
    clock_multiplier: Option<u32>,

    /// Run unpaced, stopping at breakpoints
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Execution breakpoint (hex with 0x or $ prefix, or decimal); repeatable
    #[arg(long = "break", value_parser = parse_address)]
    breakpoints: Vec<u16>,

    /// Write the final frame to this PNG file
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Config file (default: <config dir>/spectra/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// List available machines and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_machines: bool,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            machine: self.machine.clone(),
            rom_path: self.rom_path.clone(),
            clock_multiplier: self.clock_multiplier,
            frames: self.frames,
            debug: self.debug,
            breakpoints: self.breakpoints.clone(),
            screenshot: self.screenshot.clone(),
        }
    }
}

fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|e| format!("invalid address {text:?}: {e}"))
}

fn build_logger(verbose: u8) -> Logger {
    let level = match verbose {
        0 => Level::Warning,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build();
    let drain = Mutex::new(drain).fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    Logger::root(drain, o!())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let logger = build_logger(cli.verbose);

    if cli.list_machines {
        for entry in registry::all() {
            println!("{:<8} {:<10} {}", entry.name, entry.rom_name, entry.description);
        }
        return Ok(());
    }

    let settings = Config::load_or_default(cli.config.as_deref())?
        .overridden_by(cli.overrides())
        .into_settings()?;

    let entry = registry::find(&settings.machine).with_context(|| {
        let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
        format!(
            "unknown machine {:?} (available: {})",
            settings.machine,
            names.join(", ")
        )
    })?;

    let rom_set = rom_path::load_rom_set(entry.rom_name, &settings.rom_path)
        .with_context(|| format!("loading ROMs from {}", settings.rom_path.display()))?;
    let machine = (entry.create)(&rom_set, logger.new(o!("component" => "machine")))
        .with_context(|| format!("initializing {}", entry.description))?;

    let mut controller = MachineController::new(machine, logger.new(o!("component" => "controller")));
    let summary = emulator::run(&mut controller, &settings, &logger)?;

    println!("machine:    {}", entry.description);
    println!("frames:     {}", summary.frames);
    println!("stopped:    {:?}", summary.reason);
    println!("pc:         {:04X}", summary.pc);
    println!("contention: {} tacts", summary.contention_total);
    println!(
        "frame time: cpu {:?} avg {:?}, total {:?} avg {:?}",
        summary.stats.last_cpu_time,
        summary.stats.average_cpu_time,
        summary.stats.last_frame_time,
        summary.stats.average_frame_time
    );

    if let Some(path) = &settings.screenshot {
        let machine = controller
            .machine()
            .context("machine unavailable for screenshot")?;
        screenshot::save(machine, path)?;
        println!("screenshot: {}", path.display());
    }

    Ok(())
}
