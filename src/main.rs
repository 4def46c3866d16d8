#[macro_use]
extern crate log;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use nesgym::ppu::palette::Palette;
use nesgym::{Config, Error, HeadlessMode, IllegalOpcodes, NesEnv, Result};

/// Run a ROM headless and write what it produced.
#[derive(Parser, Debug)]
#[command(name = "nesgym", version)]
struct Args {
    /// iNES or NES 2.0 image
    rom: PathBuf,

    /// Frames to run after the reset
    #[arg(short, long, default_value_t = 600)]
    frames: u64,

    /// Lines of "repeat action", action in decimal or 0x hex. '#' starts a comment
    #[arg(short, long)]
    actions: Option<PathBuf>,

    /// PNG of the last frame
    #[arg(long)]
    png: Option<PathBuf>,

    /// Per frame "frame time_ms" rows
    #[arg(long)]
    frame_log: Option<PathBuf>,

    /// Per frame "frame buffer_fill pitch" rows
    #[arg(long)]
    audio_log: Option<PathBuf>,

    /// Skip audio synthesis
    #[arg(long)]
    no_audio: bool,

    /// Stop on the first unofficial opcode
    #[arg(long)]
    halt_on_illegal: bool,

    /// 64 or 512 color .pal file
    #[arg(long)]
    palette: Option<PathBuf>,

    /// Game Genie code, 6 or 8 letters. Can be repeated
    #[arg(long = "genie")]
    genie_codes: Vec<String>,

    /// Save state to load after the reset
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Where to write a save state of the last frame
    #[arg(long)]
    save_state: Option<PathBuf>,
}

fn main() {
    nesgym::init_logger(false);
    let args = Args::parse();
    if let Err(err) = run(&args) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let rom = read(&args.rom)?;

    let mut config = Config::default().headless(HeadlessMode::NO_VIDEO);
    if args.png.is_some() {
        config = config.headless(HeadlessMode::empty());
    }
    if args.no_audio {
        config.headless |= HeadlessMode::NO_AUDIO;
    }
    if args.halt_on_illegal {
        config = config.illegal_opcodes(IllegalOpcodes::Halt);
    }
    if let Some(path) = &args.frame_log {
        config = config.frame_log(path);
    }
    if let Some(path) = &args.audio_log {
        config = config.audio_log(path);
    }

    let mut env = NesEnv::with_config(&rom, config)?;
    if let Some(path) = &args.palette {
        env.set_palette(Palette::from_file(path)?);
    }
    for code in &args.genie_codes {
        env.add_genie_code(code)?;
    }

    env.reset()?;
    if let Some(path) = &args.load_state {
        env.load_state_from(path)?;
    }

    let script = match &args.actions {
        Some(path) => parse_script(&String::from_utf8_lossy(&read(path)?))?,
        None => vec![],
    };
    let mut actions = script.iter().flat_map(|&(repeat, action)| std::iter::repeat(action).take(repeat as usize));

    for _ in 0..args.frames {
        let action = actions.next().unwrap_or(0);
        env.step(action)?;
        // Nothing consumes the samples here.
        env.drain_audio();
    }

    let info = env.info();
    info!("frames: {}, cycles: {}, jammed: {}", info.frame, info.cycles, info.jammed);

    if let Some(path) = &args.png {
        env.frame_rgb().save(path)?;
    }
    if let Some(path) = &args.save_state {
        env.save_state_to(path)?;
    }
    env.close()
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| Error::io(err, format!("reading {}", path.display())))
}

// "repeat action" pairs.
fn parse_script(text: &str) -> Result<Vec<(u64, u8)>> {
    let mut script = vec![];
    for (number, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let invalid = || Error::io(
            std::io::Error::new(std::io::ErrorKind::InvalidData, line.to_string()),
            format!("action script line {}", number + 1),
        );
        let mut fields = line.split_whitespace();
        let repeat = fields.next().and_then(|field| field.parse::<u64>().ok()).ok_or_else(invalid)?;
        let action = fields.next().and_then(parse_byte).ok_or_else(invalid)?;
        script.push((repeat, action));
    }
    Ok(script)
}

fn parse_byte(field: &str) -> Option<u8> {
    match field.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => field.parse().ok(),
    }
}
