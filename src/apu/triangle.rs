use serde::{Deserialize, Serialize};

use crate::error::{ensure_state, Result};

use crate::apu::length::LengthCounter;

const SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0,
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Triangle {
    step: u8,
    timer: u16,
    period: u16,
    control: bool,
    linear_reload: u8,
    linear: u8,
    reload: bool,
    pub length: LengthCounter,
}

impl Triangle {
    // Register offset from 0x4008. 0x4009 is unused.
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            // CRRR RRRR
            0 => {
                self.control = data & 0x80 != 0;
                self.length.halt = self.control;
                self.linear_reload = data & 0x7f;
            }
            2 => self.period = (self.period & 0x0700) | data as u16,
            3 => {
                self.period = (self.period & 0x00ff) | ((data as u16 & 0x07) << 8);
                self.length.load(data >> 3);
                self.reload = true;
            }
            _ => {}
        }
    }

    // Clocked every CPU cycle. The sequencer only moves while both counters are running.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.period;
            if self.linear > 0 && self.length.active() {
                self.step = (self.step + 1) & 0x1f;
            }
        } else {
            self.timer -= 1;
        }
    }

    // Quarter frame
    pub fn clock_linear(&mut self) {
        if self.reload {
            self.linear = self.linear_reload;
        } else if self.linear > 0 {
            self.linear -= 1;
        }
        if !self.control {
            self.reload = false;
        }
    }

    // Holds its last value when silenced.
    pub fn output(&self) -> u8 { SEQUENCE[self.step as usize] }

    pub fn validate(&self) -> Result<()> {
        ensure_state((self.step as usize) < SEQUENCE.len() && self.period <= 0x7ff, "triangle")
    }
}
