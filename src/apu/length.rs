use serde::{Deserialize, Serialize};

const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14,
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

// Silences a channel after a number of half frames.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LengthCounter {
    enabled: bool,
    pub halt: bool,
    counter: u8,
}

impl LengthCounter {
    // $4015 enable bit. Disabling clears the counter right away.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }

    // Index comes from the top 5 bits of the channel's last register.
    pub fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[(index & 0x1f) as usize];
        }
    }

    // Half frame
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    pub fn active(&self) -> bool { self.counter > 0 }
    pub fn counter(&self) -> u8 { self.counter }
}
