use serde::{Deserialize, Serialize};

use crate::apu::envelope::Envelope;
use crate::apu::length::LengthCounter;
use crate::error::{ensure_state, Result};

// NTSC periods in CPU cycles.
const PERIODS: [u16; 16] = [4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Noise {
    shift: u16,
    mode: bool,
    timer: u16,
    period: u16,
    pub envelope: Envelope,
    pub length: LengthCounter,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            shift: 1,
            mode: false,
            timer: 0,
            period: PERIODS[0],
            envelope: Envelope::default(),
            length: LengthCounter::default(),
        }
    }
}

impl Noise {
    // Register offset from 0x400c. 0x400d is unused.
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            0 => {
                self.length.halt = data & 0x20 != 0;
                self.envelope.write(data);
            }
            // M--- PPPP
            2 => {
                self.mode = data & 0x80 != 0;
                self.period = PERIODS[(data & 0x0f) as usize];
            }
            3 => {
                self.length.load(data >> 3);
                self.envelope.restart();
            }
            _ => {}
        }
    }

    // Clocked every CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.period - 1;
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift ^ (self.shift >> tap)) & 0x01;
            self.shift = (self.shift >> 1) | (feedback << 14);
        } else {
            self.timer -= 1;
        }
    }

    pub fn output(&self) -> u8 {
        if self.shift & 0x01 != 0 || !self.length.active() {
            0
        } else {
            self.envelope.output()
        }
    }

    // A zero period would underflow the timer reload.
    pub fn validate(&self) -> Result<()> {
        ensure_state(PERIODS.contains(&self.period), "noise period")?;
        self.envelope.validate()
    }
}
