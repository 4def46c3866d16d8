use std::path::PathBuf;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::apu::{DEFAULT_CAPACITY, DEFAULT_SAMPLE_RATE};
use crate::cpu::IllegalOpcodes;

bitflags! {
    // Output the caller does not need. Timing and side effects stay the same.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct HeadlessMode: u8 {
        const NO_AUDIO = 0b01;
        const NO_VIDEO = 0b10;
    }
}

impl Default for HeadlessMode {
    fn default() -> Self { HeadlessMode::empty() }
}

// Internal RAM contents at power on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RamState {
    AllZeros,
    AllOnes,
}

impl Default for RamState {
    fn default() -> Self { RamState::AllZeros }
}

impl RamState {
    pub fn fill(self) -> u8 {
        match self {
            RamState::AllZeros => 0x00,
            RamState::AllOnes => 0xff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub headless: HeadlessMode,
    pub sample_rate: u32,
    pub audio_capacity: usize,
    pub illegal_opcodes: IllegalOpcodes,
    pub ram_state: RamState,
    // Maximum pitch deviation of the dynamic rate control.
    pub dynamic_rate_delta: f64,
    // Per frame "frame time_ms" rows.
    pub frame_log: Option<PathBuf>,
    // Per frame "frame buffer_fill pitch" rows.
    pub audio_log: Option<PathBuf>,
    // Frames between rewind snapshots. 0 disables rewind.
    pub rewind_interval: u32,
    // Snapshots kept, the oldest goes first.
    pub rewind_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            headless: HeadlessMode::empty(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            audio_capacity: DEFAULT_CAPACITY,
            illegal_opcodes: IllegalOpcodes::Emulate,
            ram_state: RamState::AllZeros,
            dynamic_rate_delta: 0.005,
            frame_log: None,
            audio_log: None,
            rewind_interval: 0,
            rewind_capacity: 64,
        }
    }
}

impl Config {
    pub fn headless(mut self, headless: HeadlessMode) -> Self {
        self.headless = headless;
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn audio_capacity(mut self, audio_capacity: usize) -> Self {
        self.audio_capacity = audio_capacity;
        self
    }

    pub fn illegal_opcodes(mut self, illegal_opcodes: IllegalOpcodes) -> Self {
        self.illegal_opcodes = illegal_opcodes;
        self
    }

    pub fn ram_state(mut self, ram_state: RamState) -> Self {
        self.ram_state = ram_state;
        self
    }

    pub fn dynamic_rate_delta(mut self, delta: f64) -> Self {
        self.dynamic_rate_delta = delta;
        self
    }

    pub fn frame_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.frame_log = Some(path.into());
        self
    }

    pub fn audio_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio_log = Some(path.into());
        self
    }

    pub fn rewind(mut self, interval: u32, capacity: usize) -> Self {
        self.rewind_interval = interval;
        self.rewind_capacity = capacity;
        self
    }

    pub fn no_audio(&self) -> bool { self.headless.contains(HeadlessMode::NO_AUDIO) }
    pub fn no_video(&self) -> bool { self.headless.contains(HeadlessMode::NO_VIDEO) }
}
