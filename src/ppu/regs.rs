use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    // PPUCTRL
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Ctrl: u8 {
        const NAMETABLE_X = 0b0000_0001;
        const NAMETABLE_Y = 0b0000_0010;
        const INCREMENT_32 = 0b0000_0100;
        const SPRITE_TABLE = 0b0000_1000;
        const BACKGROUND_TABLE = 0b0001_0000;
        const SPRITE_16 = 0b0010_0000;
        const SLAVE = 0b0100_0000;
        const NMI = 0b1000_0000;
    }
}

bitflags! {
    // PPUMASK
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Mask: u8 {
        const GREYSCALE = 0b0000_0001;
        const BACKGROUND_LEFT = 0b0000_0010;
        const SPRITES_LEFT = 0b0000_0100;
        const BACKGROUND = 0b0000_1000;
        const SPRITES = 0b0001_0000;
        const EMPHASIZE_RED = 0b0010_0000;
        const EMPHASIZE_GREEN = 0b0100_0000;
        const EMPHASIZE_BLUE = 0b1000_0000;
    }
}

bitflags! {
    // PPUSTATUS. The low 5 bits come from the I/O latch.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Status: u8 {
        const OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO = 0b0100_0000;
        const VBLANK = 0b1000_0000;
    }
}

impl Ctrl {
    pub fn increment(self) -> u16 { if self.contains(Ctrl::INCREMENT_32) { 32 } else { 1 } }

    pub fn sprite_height(self) -> u16 { if self.contains(Ctrl::SPRITE_16) { 16 } else { 8 } }

    pub fn sprite_table(self) -> u16 { if self.contains(Ctrl::SPRITE_TABLE) { 0x1000 } else { 0 } }

    pub fn background_table(self) -> u16 { if self.contains(Ctrl::BACKGROUND_TABLE) { 0x1000 } else { 0 } }
}

impl Mask {
    // Forced blank when neither layer is enabled.
    pub fn rendering(self) -> bool { self.intersects(Mask::BACKGROUND | Mask::SPRITES) }

    // Emphasis bits shifted to the low 3 bits.
    pub fn emphasis(self) -> u16 { (self.bits() >> 5) as u16 }
}

// T and V are composed this way during rendering:
// yyy NN YYYYY XXXXX
// ||| || ||||| +++++-- coarse X scroll
// ||| || +++++-------- coarse Y scroll
// ||| ++-------------- nametable select
// +++----------------- fine Y scroll
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VRamAddr {
    pub coarse_x: u16,
    pub coarse_y: u16,
    pub horizontal_nametable: bool,
    pub vertical_nametable: bool,
    pub fine_y: u16,
}

impl VRamAddr {
    pub fn new(value: u16) -> Self {
        Self {
            coarse_x: (value & 0b000_00_00000_11111),
            coarse_y: (value & 0b000_00_11111_00000) >> 5,
            horizontal_nametable: (value & 0b000_01_00000_00000) != 0,
            vertical_nametable: (value & 0b000_10_00000_00000) != 0,
            fine_y: (value & 0b111_00_00000_00000) >> 12,
        }
    }

    pub fn as_u16(&self) -> u16 {
        debug_assert!(self.coarse_x <= 0b11111);
        debug_assert!(self.coarse_y <= 0b11111);
        debug_assert!(self.fine_y <= 0b111);

        self.coarse_x
            | self.coarse_y << 5
            | (u16::from(self.horizontal_nametable)) << 10
            | (u16::from(self.vertical_nametable)) << 11
            | self.fine_y << 12
    }

    pub fn inc_coarse_x(&mut self) {
        if self.coarse_x < 31 {
            self.coarse_x += 1;
            return;
        }

        self.coarse_x = 0;
        self.horizontal_nametable = !self.horizontal_nametable;
    }

    pub fn inc_fine_y(&mut self) {
        if self.fine_y < 7 {
            self.fine_y += 1;
            return;
        }

        self.fine_y = 0;

        // Row 29 is the last one of a nametable. 30 and 31 wrap without switching.
        if self.coarse_y == 29 {
            self.coarse_y = 0;
            self.vertical_nametable = !self.vertical_nametable;
        } else if self.coarse_y == 31 {
            self.coarse_y = 0;
        } else {
            self.coarse_y += 1;
        }
    }

    pub fn copy_horizontal(&mut self, t: VRamAddr) {
        self.coarse_x = t.coarse_x;
        self.horizontal_nametable = t.horizontal_nametable;
    }

    pub fn copy_vertical(&mut self, t: VRamAddr) {
        self.coarse_y = t.coarse_y;
        self.vertical_nametable = t.vertical_nametable;
        self.fine_y = t.fine_y;
    }

    // Address of the tile byte in the nametable.
    pub fn nametable_addr(&self) -> u16 { 0x2000 | (self.as_u16() & 0x0fff) }

    // Address of the attribute byte for the tile:
    // NN 1111 YYY XXX
    // || |||| ||| +++-- high 3 bits of coarse X (x/4)
    // || |||| +++------ high 3 bits of coarse Y (y/4)
    // || ++++---------- attribute offset (960 bytes)
    // ++--------------- nametable select
    pub fn attribute_addr(&self) -> u16 {
        0x23c0
            | (u16::from(self.vertical_nametable) << 11)
            | (u16::from(self.horizontal_nametable) << 10)
            | ((self.coarse_y >> 2) << 3)
            | (self.coarse_x >> 2)
    }

    // Two bit palette of the tile inside its attribute byte.
    pub fn attribute_shift(&self) -> u8 { (((self.coarse_y & 2) << 1) | (self.coarse_x & 2)) as u8 }
}
