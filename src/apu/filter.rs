use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_state, Result};

// First order IIR filters at the output sample rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighPass {
    alpha: f32,
    prev_in: f32,
    prev_out: f32,
}

impl HighPass {
    pub fn new(cutoff: f64, sample_rate: f64) -> Self {
        let rc = 1.0 / (2.0 * PI * cutoff);
        let dt = 1.0 / sample_rate;
        Self { alpha: (rc / (rc + dt)) as f32, prev_in: 0.0, prev_out: 0.0 }
    }

    pub fn apply(&mut self, sample: f32) -> f32 {
        let out = self.alpha * (self.prev_out + sample - self.prev_in);
        self.prev_in = sample;
        self.prev_out = out;
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowPass {
    alpha: f32,
    prev_out: f32,
}

impl LowPass {
    pub fn new(cutoff: f64, sample_rate: f64) -> Self {
        let rc = 1.0 / (2.0 * PI * cutoff);
        let dt = 1.0 / sample_rate;
        Self { alpha: (dt / (rc + dt)) as f32, prev_out: 0.0 }
    }

    pub fn apply(&mut self, sample: f32) -> f32 {
        self.prev_out += self.alpha * (sample - self.prev_out);
        self.prev_out
    }
}

// Averages CPU rate samples into buckets of (clock rate / sample rate / pitch) cycles.
// The fractional part carries over so the long run rate is exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resampler {
    cycles_per_sample: f64,
    pitch: f64,
    phase: f64,
    sum: f32,
    count: u32,
    high: HighPass,
    low: LowPass,
}

impl Resampler {
    pub fn new(clock_rate: f64, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1) as f64;
        Self {
            cycles_per_sample: clock_rate / sample_rate,
            pitch: 1.0,
            phase: 0.0,
            sum: 0.0,
            count: 0,
            high: HighPass::new(90.0, sample_rate),
            low: LowPass::new(14_000.0, sample_rate),
        }
    }

    // Above 1 produces samples faster.
    pub fn set_pitch(&mut self, pitch: f64) {
        if pitch > 0.0 {
            self.pitch = pitch;
        }
    }

    pub fn pitch(&self) -> f64 { self.pitch }

    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        ensure_state(positive(self.cycles_per_sample) && positive(self.pitch) && self.phase.is_finite(), "resampler")
    }

    // One CPU cycle worth of mixer output. Returns a filtered sample when a bucket closes.
    pub fn push(&mut self, sample: f32) -> Option<f32> {
        self.sum += sample;
        self.count += 1;
        self.phase += 1.0;

        let bucket = self.cycles_per_sample / self.pitch;
        if self.phase < bucket {
            return None;
        }

        self.phase -= bucket;
        let average = self.sum / self.count as f32;
        self.sum = 0.0;
        self.count = 0;
        Some(self.low.apply(self.high.apply(average)))
    }
}
