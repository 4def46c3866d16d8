use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;

use bitflags::bitflags;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::bus::genie::GenieCode;
use crate::config::Config;
use crate::console::Console;
use crate::diag::{DiagLog, FrameTimer};
use crate::error::{Error, Result};
use crate::ppu::palette::Palette;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::state;

bitflags! {
    // Controller bits in the order the console shifts them out.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A = 0x01;
        const B = 0x02;
        const SELECT = 0x04;
        const START = 0x08;
        const UP = 0x10;
        const DOWN = 0x20;
        const LEFT = 0x40;
        const RIGHT = 0x80;
    }
}

// region Strategies

// Reward after each step, computed from the console state.
pub trait RewardStrategy: Send {
    fn reward(&mut self, console: &Console) -> f64;

    fn reset(&mut self, _console: &Console) {}

    // Extra values reported in `Info`.
    fn info(&self, _extra: &mut BTreeMap<String, f64>) {}
}

impl<F> RewardStrategy for F where F: FnMut(&Console) -> f64 + Send {
    fn reward(&mut self, console: &Console) -> f64 { self(console) }
}

pub struct NoReward;

impl RewardStrategy for NoReward {
    fn reward(&mut self, _console: &Console) -> f64 { 0.0 }
}

// Episode end condition, checked after each step.
pub trait Termination: Send {
    fn done(&mut self, console: &Console) -> bool;

    fn reset(&mut self, _console: &Console) {}
}

impl<F> Termination for F where F: FnMut(&Console) -> bool + Send {
    fn done(&mut self, console: &Console) -> bool { self(console) }
}

pub struct Never;

impl Termination for Never {
    fn done(&mut self, _console: &Console) -> bool { false }
}

// Done after a number of steps since the last reset.
pub struct FrameLimit {
    limit: u64,
    steps: u64,
}

impl FrameLimit {
    pub fn new(limit: u64) -> Self { Self { limit, steps: 0 } }
}

impl Termination for FrameLimit {
    fn done(&mut self, _console: &Console) -> bool {
        self.steps += 1;
        self.steps >= self.limit
    }

    fn reset(&mut self, _console: &Console) { self.steps = 0 }
}

// endregion

// region Observation

// Row major, height x width x channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl Observation {
    pub fn shape(&self) -> (u32, u32, u32) { (self.height, self.width, self.channels) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// Applied in order: crop, nearest neighbour resize, grayscale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationTransform {
    pub crop: Option<Crop>,
    pub resize: Option<(u32, u32)>,
    pub grayscale: bool,
}

impl ObservationTransform {
    pub fn crop(mut self, x: u32, y: u32, width: u32, height: u32) -> Self {
        self.crop = Some(Crop { x, y, width, height });
        self
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.resize = Some((width, height));
        self
    }

    pub fn grayscale(mut self) -> Self {
        self.grayscale = true;
        self
    }

    pub fn apply(&self, frame: RgbImage) -> Observation {
        let mut frame = frame;
        if let Some(crop) = self.crop {
            frame = imageops::crop_imm(&frame, crop.x, crop.y, crop.width, crop.height).to_image();
        }
        if let Some((width, height)) = self.resize {
            frame = imageops::resize(&frame, width, height, FilterType::Nearest);
        }

        let (width, height) = frame.dimensions();
        if self.grayscale {
            let gray = imageops::grayscale(&frame);
            Observation { width, height, channels: 1, data: gray.into_raw() }
        } else {
            Observation { width, height, channels: 3, data: frame.into_raw() }
        }
    }
}

// endregion

#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub frame: u64,
    pub cycles: u64,
    pub jammed: bool,
    pub extra: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: Info,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResetKind {
    // Reset button: RAM survives.
    Soft,
    // Power cycle. Battery backed RAM survives.
    Hard,
}

// One console as a reinforcement learning environment. Every step is one frame.
pub struct NesEnv {
    rom: Vec<u8>,
    config: Config,
    console: Console,
    palette: Palette,
    transform: ObservationTransform,
    reward: Box<dyn RewardStrategy>,
    termination: Box<dyn Termination>,
    frame_log: Option<DiagLog>,
    audio_log: Option<DiagLog>,

    // Save states, newest first, and frames since the last one.
    rewind: VecDeque<Vec<u8>>,
    rewind_frames: u32,
}

impl NesEnv {
    pub fn new(rom: &[u8]) -> Result<Self> { Self::with_config(rom, Config::default()) }

    pub fn with_config(rom: &[u8], config: Config) -> Result<Self> {
        let console = Console::new(rom, &config)?;
        let frame_log = config.frame_log.as_ref().map(DiagLog::frame_time).transpose()?;
        let audio_log = config.audio_log.as_ref().map(DiagLog::audio_stats).transpose()?;

        Ok(Self {
            rom: rom.to_vec(),
            config,
            console,
            palette: Palette::default(),
            transform: ObservationTransform::default(),
            reward: Box::new(NoReward),
            termination: Box::new(Never),
            frame_log,
            audio_log,
            rewind: VecDeque::new(),
            rewind_frames: 0,
        })
    }

    pub fn set_reward(&mut self, reward: impl RewardStrategy + 'static) { self.reward = Box::new(reward) }

    pub fn set_termination(&mut self, termination: impl Termination + 'static) {
        self.termination = Box::new(termination)
    }

    pub fn set_transform(&mut self, transform: ObservationTransform) { self.transform = transform }

    pub fn set_palette(&mut self, palette: Palette) { self.palette = palette }

    pub fn config(&self) -> &Config { &self.config }
    pub fn console(&self) -> &Console { &self.console }
    pub fn console_mut(&mut self) -> &mut Console { &mut self.console }
    pub fn frame(&self) -> u64 { self.console.frame() }

    // region Episode

    // Power cycle, then run up to the first vblank.
    pub fn reset(&mut self) -> Result<Observation> { self.reset_kind(ResetKind::Hard) }

    pub fn reset_kind(&mut self, kind: ResetKind) -> Result<Observation> {
        match kind {
            ResetKind::Soft => self.console.reset(),
            ResetKind::Hard => {
                let battery = self.sram().map(|ram| ram.to_vec());
                let codes = self.console.bus.genie_codes().to_vec();
                self.console = Console::new(&self.rom, &self.config)?;
                if let Some(ram) = battery {
                    self.console.bus.cartridge.load_prg_ram(&ram)?;
                }
                self.console.bus.set_genie_codes(codes);
            }
        }
        info!("{:?} reset", kind);
        self.rewind.clear();
        self.rewind_frames = 0;

        self.console.step_frame()?;
        self.reward.reset(&self.console);
        self.termination.reset(&self.console);
        Ok(self.observation())
    }

    pub fn step(&mut self, action: u8) -> Result<StepResult> { self.step_with_players(action, 0) }

    pub fn step_with_players(&mut self, player1: u8, player2: u8) -> Result<StepResult> {
        let timer = FrameTimer::start();

        self.console.bus.controllers[0].set_buttons(player1);
        self.console.bus.controllers[1].set_buttons(player2);
        self.console.step_frame()?;

        let frame = self.console.frame();
        if !self.config.no_audio() {
            let pitch = self.console.bus.apu.adjust_pitch(self.config.dynamic_rate_delta);
            if let Some(log) = &mut self.audio_log {
                log.write_audio(frame, self.console.bus.apu.buffer_fill(), pitch)?;
            }
        }

        self.record_rewind()?;

        let reward = self.reward.reward(&self.console);
        let done = self.termination.done(&self.console);
        let observation = self.observation();

        if let Some(log) = &mut self.frame_log {
            log.write_time(frame, timer.elapsed_ms())?;
        }

        Ok(StepResult { observation, reward, done, info: self.info() })
    }

    pub fn info(&self) -> Info {
        let mut extra = BTreeMap::new();
        self.reward.info(&mut extra);
        Info {
            frame: self.console.frame(),
            cycles: self.console.cycles(),
            jammed: self.console.jammed(),
            extra,
        }
    }

    // endregion

    // region Video

    // Current frame buffer through the palette, before any transform.
    pub fn frame_rgb(&self) -> RgbImage {
        let pixels = self.console.bus.ppu.frame_buffer();
        RgbImage::from_fn(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, |x, y| {
            Rgb(self.palette.rgb(pixels[y as usize * SCREEN_WIDTH + x as usize]))
        })
    }

    pub fn observation(&self) -> Observation { self.transform.apply(self.frame_rgb()) }

    // endregion

    // region Audio

    pub fn audio_samples(&self) -> usize { self.console.bus.apu.buffered() }

    pub fn buffer_fill(&self) -> f64 { self.console.bus.apu.buffer_fill() }

    pub fn drain_audio(&mut self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.audio_samples());
        self.console.bus.apu.drain_samples(&mut samples);
        samples
    }

    // endregion

    // region Memory

    pub fn read_ram(&self, addr: u16) -> u8 { self.console.read_ram(addr) }

    pub fn peek(&self, addr: u16) -> u8 { self.console.peek(addr) }

    // Battery backed PRG RAM, when the cartridge has a battery.
    pub fn sram(&self) -> Option<&[u8]> {
        let cartridge = &self.console.bus.cartridge;
        if cartridge.header.battery { Some(cartridge.prg_ram()) } else { None }
    }

    pub fn load_sram(&mut self, data: &[u8]) -> Result<()> { self.console.bus.cartridge.load_prg_ram(data) }

    // endregion

    // region Rewind

    fn record_rewind(&mut self) -> Result<()> {
        if self.config.rewind_interval == 0 {
            return Ok(());
        }
        self.rewind_frames += 1;
        if self.rewind_frames < self.config.rewind_interval {
            return Ok(());
        }
        self.rewind_frames = 0;
        self.rewind.push_front(state::save(&self.console)?);
        self.rewind.truncate(self.config.rewind_capacity.max(1));
        Ok(())
    }

    // Go back to the newest rewind snapshot and drop it. False when none is left.
    pub fn rewind(&mut self) -> Result<bool> {
        let data = match self.rewind.pop_front() {
            Some(data) => data,
            None => return Ok(false),
        };
        self.load_state(&data)?;
        self.rewind_frames = 0;
        debug!("rewound to frame {}, {} snapshots left", self.console.frame(), self.rewind.len());
        Ok(true)
    }

    pub fn rewind_len(&self) -> usize { self.rewind.len() }

    // endregion

    // region Game Genie

    // Patches CPU reads from cartridge space. Codes survive resets and save state loads.
    pub fn add_genie_code(&mut self, code: &str) -> Result<()> {
        let code = GenieCode::parse(code)?;
        info!("genie code {}: 0x{:04x} reads 0x{:02x}", code.code(), code.addr(), code.data());
        self.console.bus.add_genie_code(code);
        Ok(())
    }

    pub fn clear_genie_codes(&mut self) { self.console.bus.set_genie_codes(vec![]) }

    pub fn genie_codes(&self) -> &[GenieCode] { self.console.bus.genie_codes() }

    // endregion

    // region Save states

    pub fn save_state(&self) -> Result<Vec<u8>> { state::save(&self.console) }

    pub fn load_state(&mut self, data: &[u8]) -> Result<()> { state::load(&mut self.console, data) }

    pub fn save_state_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = self.save_state()?;
        fs::write(path, data).map_err(|err| Error::io(err, format!("writing {}", path.display())))
    }

    pub fn load_state_from<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|err| Error::io(err, format!("reading {}", path.display())))?;
        self.load_state(&data)
    }

    // endregion

    // Flush the diagnostic logs. Dropping the env flushes too, but can only warn on failure.
    pub fn close(&mut self) -> Result<()> {
        for log in self.frame_log.iter_mut().chain(self.audio_log.iter_mut()) {
            log.flush()?;
        }
        Ok(())
    }
}

impl Drop for NesEnv {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("{}", err);
        }
    }
}
