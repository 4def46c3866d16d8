use serde::{Deserialize, Serialize};

// Standard controller. Reports A, B, Select, Start, Up, Down, Left, Right, then 1s.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Controller {
    buttons: u8,
    shift: u8,
    strobe: bool,
}

impl Controller {
    pub fn set_buttons(&mut self, buttons: u8) {
        self.buttons = buttons;
        if self.strobe {
            self.shift = buttons;
        }
    }

    pub fn buttons(&self) -> u8 { self.buttons }

    // $4016 bit 0. While high the register keeps reloading.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 0x01 != 0;
        if self.strobe {
            self.shift = self.buttons;
        }
    }

    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons & 0x01;
        }
        let bit = self.shift & 0x01;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }

    pub fn peek(&self) -> u8 {
        if self.strobe { self.buttons & 0x01 } else { self.shift & 0x01 }
    }
}
