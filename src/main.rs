// Two timing domains drive the machine: instruction execution at a target
// rate (700/s by default) and the delay/sound timers at 60/s. The host
// window refreshes at ~60 fps, so each frame runs every cycle that has come
// due in both domains since the previous frame.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use display::Screen;
use emulator::Emulator;
use sound::Beeper;
use timer::Cadence;

mod decode;
mod display;
mod emulator;
mod error;
mod keyboard;
mod memory;
mod registers;
mod sound;
mod timer;

const DEFAULT_IPS: u64 = 700;
const TIMER_RATE: u64 = 60;

#[derive(Parser, Debug)]
#[command(version, about = "A CHIP-8 virtual machine")]
struct Args {
    #[arg(help = "Path to the ROM image to run")]
    rom: PathBuf,

    #[arg(short, long, default_value_t = DEFAULT_IPS, help = "Instructions per second")]
    ips: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let image = fs::read(&args.rom).with_context(|| format!("reading {}", args.rom.display()))?;
    let mut emu = Emulator::new();
    emu.load_program(&image)?;
    info!("loaded {} ({} bytes)", args.rom.display(), image.len());

    let mut screen = Screen::open()?;
    let beeper = match Beeper::new() {
        Ok(beeper) => Some(beeper),
        Err(err) => {
            warn!("audio disabled: {err:#}");
            None
        }
    };
    let mut cpu_clock = Cadence::new(args.ips);
    let mut timer_clock = Cadence::new(TIMER_RATE);

    // One pass per host frame: input, then the due instruction cycles, then
    // the due timer ticks, then presentation and the sound gate.
    while screen.is_running() {
        emu.set_keys(keyboard::sample(screen.window()));

        for _ in 0..cpu_clock.due() {
            if let Err(fault) = emu.step() {
                error!("{fault}");
                return Err(fault.into());
            }
        }
        for _ in 0..timer_clock.due() {
            emu.tick_timers();
        }

        if emu.take_dirty() {
            screen.present(emu.framebuffer())?;
        } else {
            screen.pump();
        }
        if let Some(beeper) = &beeper {
            beeper.set_active(emu.sound_active());
        }
    }
    Ok(())
}
