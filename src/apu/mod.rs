use std::fmt;

use serde::{Deserialize, Serialize};

use crate::apu::buffer::SampleBuffer;
use crate::apu::dmc::Dmc;
use crate::apu::filter::Resampler;
use crate::apu::frame_counter::{Clock, FrameCounter};
use crate::apu::mixer::Mixer;
use crate::apu::noise::Noise;
use crate::apu::pulse::{Channel, Pulse};
use crate::apu::triangle::Triangle;
use crate::cpu::CLOCK_RATE;
use crate::error::Result;

pub mod buffer;
pub mod dmc;
pub mod envelope;
pub mod filter;
pub mod frame_counter;
pub mod length;
pub mod mixer;
pub mod noise;
pub mod pulse;
pub mod triangle;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Clone, Serialize, Deserialize)]
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_counter: FrameCounter,
    cycles: u64,
    resampler: Resampler,
    buffer: SampleBuffer,
    pub no_audio: bool,

    #[serde(skip)]
    mixer: Mixer,
}

impl Apu {
    pub fn new(sample_rate: u32, capacity: usize) -> Self {
        Self {
            pulse1: Pulse::new(Channel::One),
            pulse2: Pulse::new(Channel::Two),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame_counter: FrameCounter::default(),
            cycles: 0,
            resampler: Resampler::new(CLOCK_RATE, sample_rate),
            buffer: SampleBuffer::new(capacity),
            no_audio: false,
            mixer: Mixer::new(),
        }
    }

    // Reset silences every channel. The frame counter keeps its mode but restarts.
    pub fn reset(&mut self) {
        self.write_register(0x4015, 0x00);
        let mode = match self.frame_counter.mode() {
            frame_counter::Mode::FourStep => 0x00,
            frame_counter::Mode::FiveStep => 0x80,
        };
        self.frame_counter = FrameCounter::default();
        self.frame_counter.write(mode, self.cycles & 1 == 1);
    }

    pub fn cycles(&self) -> u64 { self.cycles }

    // Range checks for a deserialized APU.
    pub fn validate(&self) -> Result<()> {
        self.pulse1.validate()?;
        self.pulse2.validate()?;
        self.triangle.validate()?;
        self.noise.validate()?;
        self.dmc.validate()?;
        self.frame_counter.validate()?;
        self.resampler.validate()?;
        self.buffer.validate()
    }

    // One CPU cycle.
    pub fn step(&mut self) {
        self.cycles += 1;

        match self.frame_counter.step() {
            Clock::Quarter => self.quarter_frame(),
            Clock::Half => {
                self.quarter_frame();
                self.half_frame();
            }
            Clock::None => {}
        }

        // Pulse timers tick at half the CPU rate.
        if self.cycles & 1 == 0 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
        }
        self.triangle.clock_timer();
        self.noise.clock_timer();
        self.dmc.clock_timer();

        if self.no_audio {
            return;
        }

        let sample = self.mixer.mix(
            self.pulse1.output(),
            self.pulse2.output(),
            self.triangle.output(),
            self.noise.output(),
            self.dmc.output(),
        );
        if let Some(sample) = self.resampler.push(sample) {
            self.buffer.push(sample);
        }
    }

    fn quarter_frame(&mut self) {
        self.pulse1.envelope.clock();
        self.pulse2.envelope.clock();
        self.noise.envelope.clock();
        self.triangle.clock_linear();
    }

    fn half_frame(&mut self) {
        self.pulse1.length.clock();
        self.pulse2.length.clock();
        self.triangle.length.clock();
        self.noise.length.clock();
        self.pulse1.clock_sweep();
        self.pulse2.clock_sweep();
    }

    // region Registers

    pub fn write_register(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse1.write(addr - 0x4000, data),
            0x4004..=0x4007 => self.pulse2.write(addr - 0x4004, data),
            0x4008..=0x400b => self.triangle.write(addr - 0x4008, data),
            0x400c..=0x400f => self.noise.write(addr - 0x400c, data),
            0x4010..=0x4013 => self.dmc.write(addr - 0x4010, data),
            // ---D NT21
            0x4015 => {
                self.pulse1.length.set_enabled(data & 0x01 != 0);
                self.pulse2.length.set_enabled(data & 0x02 != 0);
                self.triangle.length.set_enabled(data & 0x04 != 0);
                self.noise.length.set_enabled(data & 0x08 != 0);
                self.dmc.set_enabled(data & 0x10 != 0);
            }
            0x4017 => self.frame_counter.write(data, self.cycles & 1 == 1),
            _ => debug!(target: "apu", "write to unmapped apu register. 0x{:04x}, 0x{:02x}", addr, data),
        }
    }

    // IF-D NT21. Bit 5 is open bus and left to the caller.
    pub fn peek_status(&self) -> u8 {
        (self.pulse1.length.active() as u8)
            | (self.pulse2.length.active() as u8) << 1
            | (self.triangle.length.active() as u8) << 2
            | (self.noise.length.active() as u8) << 3
            | (self.dmc.active() as u8) << 4
            | (self.frame_counter.irq as u8) << 6
            | (self.dmc.irq as u8) << 7
    }

    // Reading $4015 acknowledges the frame interrupt.
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_counter.irq = false;
        status
    }

    // endregion

    pub fn irq_line(&self) -> bool { self.frame_counter.irq || self.dmc.irq }

    pub fn take_dmc_dma(&mut self) -> Option<u16> { self.dmc.dma_request() }

    pub fn finish_dmc_dma(&mut self, data: u8) { self.dmc.dma_fill(data) }

    // region Samples

    pub fn buffer_fill(&self) -> f64 { self.buffer.fill() }

    pub fn buffered(&self) -> usize { self.buffer.len() }

    pub fn capacity(&self) -> usize { self.buffer.capacity() }

    pub fn dropped_samples(&self) -> u64 { self.buffer.dropped() }

    pub fn drain_samples(&mut self, out: &mut Vec<f32>) { self.buffer.drain_into(out) }

    pub fn pitch(&self) -> f64 { self.resampler.pitch() }

    // Recompute the resampler pitch from the buffer fill.
    pub fn adjust_pitch(&mut self, delta: f64) -> f64 {
        let pitch = self.buffer.pitch(delta);
        self.resampler.set_pitch(pitch);
        pitch
    }

    // endregion
}

impl Default for Apu {
    fn default() -> Self { Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_CAPACITY) }
}

impl fmt::Debug for Apu {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "Apu | cycles: {}, status: 0x{:02x}, samples: {}/{}, pitch: {:.4}",
               self.cycles, self.peek_status(), self.buffer.len(), self.buffer.capacity(), self.pitch())
    }
}
