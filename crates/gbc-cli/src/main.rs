mod config;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gbc_core::{EmulationMode, GameBoy, cartridge::Cartridge};
use log::{LevelFilter, error, info};

#[derive(Parser)]
#[command(name = "gbc", about = "Headless Game Boy / Game Boy Color emulator")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Force DMG mode
    #[arg(long, conflicts_with = "cgb")]
    dmg: bool,

    /// Force CGB mode
    #[arg(long, conflicts_with = "dmg")]
    cgb: bool,

    /// Path to DMG boot ROM file
    #[arg(long)]
    dmg_boot_rom: Option<PathBuf>,

    /// Path to CGB boot ROM file
    #[arg(long)]
    cgb_boot_rom: Option<PathBuf>,

    /// TOML settings file; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long)]
    frames: Option<u64>,

    /// Number of CPU cycles to run
    #[arg(long, conflicts_with = "frames")]
    cycles: Option<u64>,

    /// Log filter level (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<LevelFilter>,

    /// Log every executed instruction at trace level
    #[arg(long)]
    trace: bool,

    /// Do not write battery-backed RAM back on exit
    #[arg(long)]
    no_save: bool,
}

fn init_logging(level: Option<LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.init();
}

fn build_config(args: &Args) -> gbc_core::EmuConfig {
    let mut cfg = args
        .config
        .as_deref()
        .map(config::load_from_file)
        .unwrap_or_default()
        .into_emu_config();

    if args.dmg {
        cfg.mode = EmulationMode::ForceDmg;
    } else if args.cgb {
        cfg.mode = EmulationMode::ForceCgb;
    }
    if let Some(path) = &args.dmg_boot_rom {
        cfg.dmg_boot_rom = Some(path.clone());
    }
    if let Some(path) = &args.cgb_boot_rom {
        cfg.cgb_boot_rom = Some(path.clone());
    }
    cfg.trace_instructions |= args.trace;
    if args.no_save {
        cfg.save_on_exit = false;
    }
    cfg
}

fn flush_serial(gb: &mut GameBoy) -> Result<()> {
    let out = gb.take_serial_output();
    if !out.is_empty() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&out)?;
        stdout.flush()?;
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let cfg = build_config(&args);

    let cart = Cartridge::from_file(&args.rom)
        .with_context(|| format!("failed to load ROM {}", args.rom.display()))?;
    let mut gb = GameBoy::new(cfg);
    gb.insert_from_config(cart)
        .context("failed to start emulation")?;

    info!("Emulator initialized in {} mode", gb.model().name());

    if let Some(cycles) = args.cycles {
        let mut elapsed = 0u64;
        while elapsed < cycles {
            elapsed += gb.step().with_context(|| gb.cpu.debug_state())? as u64;
            flush_serial(&mut gb)?;
        }
        info!("ran {elapsed} cycles");
    } else {
        let mut frames = 0u64;
        while args.frames.is_none_or(|limit| frames < limit) {
            gb.emulate().with_context(|| gb.cpu.debug_state())?;
            flush_serial(&mut gb)?;
            frames += 1;
        }
        info!("ran {frames} frames");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            log::logger().flush();
            ExitCode::FAILURE
        }
    }
}
