use std::cell::Cell;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{debug, error, info};

use dmg_emu_core::{GameBoy, RunState, StepOutcome, input::Button, savestate::SaveState};

mod config;
mod snapshot;

#[derive(Parser)]
#[command(name = "dmg-emu", about = "Headless original Game Boy emulator")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Number of frames to run (runs until killed if neither this nor
    /// --seconds is set)
    #[arg(long)]
    frames: Option<u64>,

    /// Number of wall-clock seconds to run
    #[arg(long)]
    seconds: Option<u64>,

    /// Config file (defaults to ~/.config/dmg-emu/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restore this save state before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Write a save state here after running
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Write the last frame as a grayscale PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Buttons held for the whole run, comma separated
    /// (a, b, select, start, up, down, left, right)
    #[arg(long, value_delimiter = ',', value_parser = parse_button)]
    press: Vec<Button>,

    /// Discard audio samples
    #[arg(long)]
    mute: bool,

    /// Enable debug logging of CPU state and serial output
    #[arg(long)]
    debug: bool,
}

fn parse_button(s: &str) -> Result<Button, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "a" => Ok(Button::A),
        "b" => Ok(Button::B),
        "select" => Ok(Button::Select),
        "start" => Ok(Button::Start),
        "up" => Ok(Button::Up),
        "down" => Ok(Button::Down),
        "left" => Ok(Button::Left),
        "right" => Ok(Button::Right),
        other => Err(format!("unknown button '{other}'")),
    }
}

fn print_serial(serial: &[u8]) {
    if serial.is_empty() {
        return;
    }
    print!("[SERIAL] ");
    for b in serial {
        if b.is_ascii_graphic() || *b == b' ' {
            print!("{}", *b as char);
        } else if *b == b'\n' {
            println!();
        } else {
            print!("\\x{b:02X}");
        }
    }
    println!();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let cfg = config::load_from_file(&config_path);
    debug!("Using config {cfg:?} from {}", config_path.display());

    let samples = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&samples);
    let mut gb = GameBoy::with_sinks(
        cfg.emulator_config(args.mute),
        None,
        Some(Box::new(move |chunk: &[i16]| {
            counter.set(counter.get() + chunk.len() as u64)
        })),
    );
    gb.load_rom_file(&args.rom)?;

    if let Some(path) = &args.load_state {
        let state = SaveState::read_from_file(path)?;
        gb.load_state(&state)?;
    }

    for &button in &args.press {
        gb.press(button);
    }

    let frame_limit = args.frames.or(cfg.frames);
    let time_limit = args.seconds.or(cfg.seconds).map(Duration::from_secs);
    let interval = cfg.debug_interval.max(1);

    info!("Starting emulator");
    let start = Instant::now();
    let mut frames = 0u64;
    let mut completed = 0u64;
    gb.start();
    while gb.state() == RunState::Running {
        if frame_limit.is_some_and(|max| frames >= max)
            || time_limit.is_some_and(|limit| start.elapsed() >= limit)
        {
            break;
        }
        if gb.step() == StepOutcome::FrameCompleted {
            completed += 1;
        }
        frames += 1;

        if args.debug && frames.is_multiple_of(interval) {
            print_serial(&gb.take_serial());
            println!("{}", gb.cpu.debug_state());
        }
    }
    gb.stop();
    info!(
        "Ran {frames} frames ({completed} completed, {} samples) in {:.2?}",
        samples.get(),
        start.elapsed()
    );

    print_serial(&gb.take_serial());

    if let Some(path) = &args.snapshot {
        snapshot::write_png(path, gb.frame(), cfg.palette)?;
        info!("Wrote snapshot to {}", path.display());
    }

    if let Some(path) = &args.save_state {
        gb.save_state().write_to_file(path)?;
        info!("Wrote save state to {}", path.display());
    }

    gb.save_cart_ram();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
