use serde::{Deserialize, Serialize};

use crate::error::{ensure_state, Result};

// Volume envelope shared by the pulse and noise channels.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Envelope {
    start: bool,
    looping: bool,
    constant: bool,
    volume: u8,
    divider: u8,
    decay: u8,
}

impl Envelope {
    // Low 6 bits of the channel's first register: --LC VVVV
    pub fn write(&mut self, data: u8) {
        self.looping = data & 0x20 != 0;
        self.constant = data & 0x10 != 0;
        self.volume = data & 0x0f;
    }

    pub fn restart(&mut self) { self.start = true }

    // Quarter frame
    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider == 0 {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        } else {
            self.divider -= 1;
        }
    }

    pub fn output(&self) -> u8 {
        if self.constant { self.volume } else { self.decay }
    }

    pub fn validate(&self) -> Result<()> { ensure_state(self.volume <= 15 && self.decay <= 15, "envelope") }
}
