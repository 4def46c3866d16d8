use std::fmt;

use pretty_hex::*;
use serde::{Deserialize, Serialize};

use crate::cartridge::Cartridge;
use crate::error::{ensure_state, Result};
use crate::ppu::regs::{Ctrl, Mask, Status, VRamAddr};
use crate::utils::bits;

pub mod palette;
pub mod regs;

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES: u16 = 262;
pub const DOTS_PER_FRAME: u64 = DOTS_PER_SCANLINE as u64 * SCANLINES as u64;

pub const POST_RENDER_SCANLINE: u16 = 240;
pub const VBLANK_SCANLINE: u16 = 241;
pub const PRE_RENDER_SCANLINE: u16 = 261;

const NAMETABLE_CAPACITY: usize = 0x1000;
const PALETTE_CAPACITY: usize = 0x20;
const OAM_CAPACITY: usize = 0x100;
const SECONDARY_OAM_CAPACITY: usize = 0x20;
const SPRITE_UNITS: usize = 8;

// Pattern data of a sprite picked for the current scanline.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize)]
struct SpriteUnit {
    x: u8,
    attr: u8,
    low: u8,
    high: u8,
    zero: bool,
}

struct SpritePixel {
    color: u8,
    palette: u8,
    behind: bool,
    zero: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Ppu {
    // Registers
    ctrl: Ctrl,
    mask: Mask,
    status: Status,
    oam_addr: u8,

    // Current and temporary VRAM address, fine X scroll and the write toggle.
    v: u16,
    t: u16,
    x: u8,
    w: bool,

    // PPUDATA read buffer.
    read_buffer: u8,

    // Internal PPU bus. Any read or write to its registers fills it.
    io_latch: u8,

    // Memory
    nametables: Vec<u8>,
    palette: [u8; PALETTE_CAPACITY],
    oam: Vec<u8>,
    secondary_oam: [u8; SECONDARY_OAM_CAPACITY],

    // Background fetch latches and shift registers.
    next_tile: u8,
    next_attribute: u8,
    next_low: u8,
    next_high: u8,
    pattern_low: u16,
    pattern_high: u16,
    attribute_low: u16,
    attribute_high: u16,

    // Sprites found by evaluation and the ones drawn on the current scanline.
    secondary_count: usize,
    secondary_has_zero: bool,
    sprites: [SpriteUnit; SPRITE_UNITS],
    sprite_count: usize,

    // Timing
    scanline: u16,
    dot: u16,
    frame: u64,
    odd_frame: bool,
    dots: u64,
    suppress_vblank: bool,

    // Skip pixel output. Sprite zero and overflow still run.
    pub no_video: bool,

    // 6 bit palette index and 3 emphasis bits per pixel.
    frame_buffer: Vec<u16>,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            ctrl: Ctrl::empty(),
            mask: Mask::empty(),
            status: Status::empty(),
            oam_addr: 0,
            v: 0,
            t: 0,
            x: 0,
            w: false,
            read_buffer: 0,
            io_latch: 0,
            nametables: vec![0; NAMETABLE_CAPACITY],
            palette: [0; PALETTE_CAPACITY],
            oam: vec![0; OAM_CAPACITY],
            secondary_oam: [0xff; SECONDARY_OAM_CAPACITY],
            next_tile: 0,
            next_attribute: 0,
            next_low: 0,
            next_high: 0,
            pattern_low: 0,
            pattern_high: 0,
            attribute_low: 0,
            attribute_high: 0,
            secondary_count: 0,
            secondary_has_zero: false,
            sprites: [SpriteUnit::default(); SPRITE_UNITS],
            sprite_count: 0,
            scanline: 0,
            dot: 0,
            frame: 0,
            odd_frame: false,
            dots: 0,
            suppress_vblank: false,
            no_video: false,
            frame_buffer: vec![0; SCREEN_SIZE],
        }
    }

    // Reset line. Memory and the current address survive.
    pub fn reset(&mut self) {
        self.ctrl = Ctrl::empty();
        self.mask = Mask::empty();
        self.t = 0;
        self.x = 0;
        self.w = false;
        self.read_buffer = 0;
        self.odd_frame = false;
    }

    pub fn frame_buffer(&self) -> &[u16] { &self.frame_buffer }
    pub fn frame(&self) -> u64 { self.frame }
    pub fn scanline(&self) -> u16 { self.scanline }
    pub fn dot(&self) -> u16 { self.dot }
    pub fn dots(&self) -> u64 { self.dots }
    pub fn oam(&self) -> &[u8] { &self.oam }
    pub fn palette_ram(&self) -> &[u8] { &self.palette }
    pub fn rendering(&self) -> bool { self.mask.rendering() }

    // Range checks for a deserialized PPU.
    pub fn validate(&self) -> Result<()> {
        ensure_state(self.nametables.len() == NAMETABLE_CAPACITY, "nametables")?;
        ensure_state(self.oam.len() == OAM_CAPACITY, "OAM")?;
        ensure_state(self.frame_buffer.len() == SCREEN_SIZE, "frame buffer")?;
        ensure_state(self.secondary_count <= SPRITE_UNITS && self.sprite_count <= SPRITE_UNITS, "sprite count")?;
        ensure_state(self.scanline <= PRE_RENDER_SCANLINE && self.dot < DOTS_PER_SCANLINE, "PPU position")?;
        ensure_state(self.x <= 0x07 && self.v <= 0x7fff && self.t <= 0x7fff, "scroll registers")
    }

    // NMI output of the PPU. The CPU detects its rising edge.
    pub fn nmi_line(&self) -> bool { self.status.contains(Status::VBLANK) && self.ctrl.contains(Ctrl::NMI) }

    // region Registers

    // CPU read of 0x2000..=0x2007.
    pub fn read_register(&mut self, addr: u16, cart: &mut Cartridge) -> u8 {
        let data = match addr & 0x0007 {
            0x0002 => {
                let data = self.status.bits() | (self.io_latch & 0x1f);
                // Reading on the dot the flag would be set hides it for the whole frame.
                if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
                    self.suppress_vblank = true;
                }
                self.status.remove(Status::VBLANK);
                self.w = false;
                data
            }
            0x0004 => {
                if self.clearing_secondary_oam() { 0xff } else { self.oam[self.oam_addr as usize] }
            }
            0x0007 => {
                let addr = self.v & 0x3fff;
                let data = if addr >= 0x3f00 {
                    // Palette reads are not buffered. The buffer gets the nametable underneath.
                    self.read_buffer = self.read_vram(cart, addr - 0x1000);
                    (self.palette[Self::palette_index(addr)] & 0x3f) | (self.io_latch & 0xc0)
                } else {
                    let data = self.read_buffer;
                    self.read_buffer = self.read_vram(cart, addr);
                    data
                };
                self.increment_v(cart);
                data
            }
            // Write only registers answer with the latch.
            _ => self.io_latch,
        };

        self.io_latch = data;
        data
    }

    // Same as reading the register without touching any state.
    pub fn peek_register(&self, addr: u16) -> u8 {
        match addr & 0x0007 {
            0x0002 => self.status.bits() | (self.io_latch & 0x1f),
            0x0004 => self.oam[self.oam_addr as usize],
            0x0007 => {
                let addr = self.v & 0x3fff;
                if addr >= 0x3f00 { self.palette[Self::palette_index(addr)] } else { self.read_buffer }
            }
            _ => self.io_latch,
        }
    }

    // CPU write to 0x2000..=0x2007.
    pub fn write_register(&mut self, addr: u16, data: u8, cart: &mut Cartridge) {
        self.io_latch = data;

        match addr & 0x0007 {
            0x0000 => {
                self.ctrl = Ctrl::from_bits_retain(data);
                self.t = (self.t & !0x0c00) | (((data & 0x03) as u16) << 10);
            }
            0x0001 => self.mask = Mask::from_bits_retain(data),
            0x0002 => debug!(target: "ppu", "write to PPUSTATUS ignored. 0x{:02x}", data),
            0x0003 => self.oam_addr = data,
            0x0004 => {
                if self.rendering() && self.on_render_line() {
                    // The write is lost and only the sprite index moves.
                    self.oam_addr = self.oam_addr.wrapping_add(4);
                } else {
                    // Attribute bits 2 to 4 don't exist.
                    let data = if self.oam_addr & 0x03 == 0x02 { data & 0xe3 } else { data };
                    self.oam[self.oam_addr as usize] = data;
                    self.oam_addr = self.oam_addr.wrapping_add(1);
                }
            }
            0x0005 => {
                if !self.w {
                    self.t = (self.t & !0x001f) | (data >> 3) as u16;
                    self.x = data & 0x07;
                } else {
                    self.t = (self.t & !0x73e0) | (((data & 0x07) as u16) << 12) | (((data >> 3) as u16) << 5);
                }
                self.w = !self.w;
            }
            0x0006 => {
                if !self.w {
                    self.t = (self.t & 0x00ff) | (((data & 0x3f) as u16) << 8);
                } else {
                    self.t = bits::set_low(self.t, data);
                    self.v = self.t;
                    // The new address shows up on the PPU bus.
                    cart.observe_ppu_address(self.v & 0x3fff, self.dots);
                }
                self.w = !self.w;
            }
            _ => {
                let addr = self.v & 0x3fff;
                self.write_vram(cart, addr, data);
                self.increment_v(cart);
            }
        }
    }

    fn increment_v(&mut self, cart: &mut Cartridge) {
        self.v = self.v.wrapping_add(self.ctrl.increment()) & 0x7fff;
        cart.observe_ppu_address(self.v & 0x3fff, self.dots);
    }

    fn on_render_line(&self) -> bool {
        self.scanline < POST_RENDER_SCANLINE || self.scanline == PRE_RENDER_SCANLINE
    }

    fn clearing_secondary_oam(&self) -> bool {
        self.rendering() && self.scanline < POST_RENDER_SCANLINE && (1..=64).contains(&self.dot)
    }

    // endregion

    // region Memory

    // 0x3f10, 0x3f14, 0x3f18 and 0x3f1c mirror the background entries.
    fn palette_index(addr: u16) -> usize {
        let index = (addr & 0x1f) as usize;
        if index & 0x13 == 0x10 { index & 0x0f } else { index }
    }

    fn read_vram(&mut self, cart: &mut Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.read_chr(addr, self.dots),
            0x2000..=0x3eff => {
                cart.observe_ppu_address(addr, self.dots);
                self.nametables[cart.mirroring().nametable_offset(addr)]
            }
            _ => self.palette[Self::palette_index(addr)],
        }
    }

    fn write_vram(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.write_chr(addr, data, self.dots),
            0x2000..=0x3eff => {
                cart.observe_ppu_address(addr, self.dots);
                let offset = cart.mirroring().nametable_offset(addr);
                self.nametables[offset] = data;
            }
            _ => self.palette[Self::palette_index(addr)] = data & 0x3f,
        }
    }

    // Side effect free view of the PPU address space.
    pub fn peek_vram(&self, cart: &Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.peek_chr(addr),
            0x2000..=0x3eff => self.nametables[cart.mirroring().nametable_offset(addr)],
            _ => self.palette[Self::palette_index(addr)],
        }
    }

    // OAM DMA writes go through OAMDATA.
    pub fn write_oam(&mut self, data: u8, cart: &mut Cartridge) { self.write_register(0x2004, data, cart) }

    // endregion

    // region Rendering

    // Run one dot. Returns true on the dot vblank starts.
    pub fn step(&mut self, cart: &mut Cartridge) -> bool {
        let rendering = self.rendering();
        let visible = self.scanline < POST_RENDER_SCANLINE;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;
        let mut vblank_started = false;

        if rendering && (visible || pre_render) {
            self.render_dot(cart, visible, pre_render);
        }

        if self.dot == 1 {
            if self.scanline == VBLANK_SCANLINE {
                if !self.suppress_vblank {
                    self.status.insert(Status::VBLANK);
                }
                self.suppress_vblank = false;
                self.frame += 1;
                vblank_started = true;
                trace!(target: "ppu", "vblank, frame: {}", self.frame);
            } else if pre_render {
                self.status.remove(Status::VBLANK | Status::SPRITE_ZERO | Status::OVERFLOW);
            }
        }

        self.dots += 1;

        // Odd frames are one dot shorter while rendering.
        if pre_render && self.dot == 339 && rendering && self.odd_frame {
            self.dot = 340;
        }

        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
            }
        }

        vblank_started
    }

    fn render_dot(&mut self, cart: &mut Cartridge, visible: bool, pre_render: bool) {
        let dot = self.dot;

        // Background
        if (2..=257).contains(&dot) || (322..=337).contains(&dot) {
            self.shift_background();
        }

        if (1..=257).contains(&dot) || (321..=337).contains(&dot) {
            let v = VRamAddr::new(self.v);
            match (dot - 1) % 8 {
                0 => {
                    self.load_background();
                    self.next_tile = self.read_vram(cart, v.nametable_addr());
                }
                2 => {
                    let attribute = self.read_vram(cart, v.attribute_addr());
                    self.next_attribute = (attribute >> v.attribute_shift()) & 0x03;
                }
                4 => {
                    let addr = self.background_pattern_addr(v);
                    self.next_low = self.read_vram(cart, addr);
                }
                6 => {
                    let addr = self.background_pattern_addr(v) + 8;
                    self.next_high = self.read_vram(cart, addr);
                }
                7 => self.update_v(|v| v.inc_coarse_x()),
                _ => {}
            }
        }

        if dot == 339 {
            let v = VRamAddr::new(self.v);
            self.read_vram(cart, v.nametable_addr());
        }

        if dot == 256 {
            self.update_v(|v| v.inc_fine_y());
        }
        if dot == 257 {
            let t = VRamAddr::new(self.t);
            self.update_v(|v| v.copy_horizontal(t));
        }
        if pre_render && (280..=304).contains(&dot) {
            let t = VRamAddr::new(self.t);
            self.update_v(|v| v.copy_vertical(t));
        }

        // Sprites
        if dot == 256 {
            if visible {
                self.evaluate_sprites();
            } else {
                // Nothing is drawn on the first line.
                self.secondary_count = 0;
                self.secondary_has_zero = false;
            }
        }
        if (257..=320).contains(&dot) {
            self.oam_addr = 0;
            self.fetch_sprite(cart, dot);
        }

        if visible && (1..=256).contains(&dot) {
            self.output_pixel(dot - 1);
        }
    }

    fn update_v<F: FnOnce(&mut VRamAddr)>(&mut self, update: F) {
        let mut v = VRamAddr::new(self.v);
        update(&mut v);
        self.v = v.as_u16();
    }

    fn background_pattern_addr(&self, v: VRamAddr) -> u16 {
        self.ctrl.background_table() + self.next_tile as u16 * 16 + v.fine_y
    }

    fn shift_background(&mut self) {
        self.pattern_low <<= 1;
        self.pattern_high <<= 1;
        self.attribute_low <<= 1;
        self.attribute_high <<= 1;
    }

    fn load_background(&mut self) {
        self.pattern_low = (self.pattern_low & 0xff00) | self.next_low as u16;
        self.pattern_high = (self.pattern_high & 0xff00) | self.next_high as u16;
        let low = if bits::is_set(self.next_attribute, 0) { 0xff } else { 0x00 };
        let high = if bits::is_set(self.next_attribute, 1) { 0xff } else { 0x00 };
        self.attribute_low = (self.attribute_low & 0xff00) | low;
        self.attribute_high = (self.attribute_high & 0xff00) | high;
    }

    // Primary OAM scan for the next scanline, with the overflow bug.
    fn evaluate_sprites(&mut self) {
        let line = self.scanline;
        let height = self.ctrl.sprite_height();
        let in_range = move |y: u8| line.wrapping_sub(y as u16) < height;

        self.secondary_oam = [0xff; SECONDARY_OAM_CAPACITY];
        let mut count = 0;
        let mut has_zero = false;
        let mut n = 0;

        while n < 64 && count < SPRITE_UNITS {
            if in_range(self.oam[n * 4]) {
                self.secondary_oam[count * 4..count * 4 + 4].copy_from_slice(&self.oam[n * 4..n * 4 + 4]);
                has_zero |= n == 0;
                count += 1;
            }
            n += 1;
        }

        // With eight sprites found the byte index also advances, so tiles and attributes are checked as Y.
        let mut m = 0;
        while n < 64 && count == SPRITE_UNITS {
            if in_range(self.oam[n * 4 + m]) {
                self.status.insert(Status::OVERFLOW);
                break;
            }
            n += 1;
            m = (m + 1) & 0x03;
        }

        self.secondary_count = count;
        self.secondary_has_zero = has_zero;
    }

    // Eight dots per sprite unit. Empty units still fetch tile 0xff.
    fn fetch_sprite(&mut self, cart: &mut Cartridge, dot: u16) {
        let slot = ((dot - 257) / 8) as usize;
        let step = (dot - 257) % 8;
        if step == 0 && slot == 0 {
            self.sprite_count = self.secondary_count;
        }
        if step != 4 && step != 6 {
            return;
        }

        let height = self.ctrl.sprite_height();
        let used = slot < self.secondary_count;
        let (tile, attr, x, mut row) = if used {
            let sprite = &self.secondary_oam[slot * 4..slot * 4 + 4];
            (sprite[1], sprite[2], sprite[3], self.scanline.wrapping_sub(sprite[0] as u16) & (height - 1))
        } else {
            (0xff, 0, 0xff, 0)
        };

        if used && bits::is_set(attr, 7) {
            row = height - 1 - row;
        }

        let addr = if height == 16 {
            let table = if bits::is_set(tile, 0) { 0x1000 } else { 0 };
            let tile = (tile & 0xfe) as u16 + (row >> 3);
            table + tile * 16 + (row & 0x07)
        } else {
            self.ctrl.sprite_table() + tile as u16 * 16 + row
        };

        if step == 4 {
            let low = self.read_vram(cart, addr);
            self.sprites[slot].low = low;
            return;
        }

        let high = self.read_vram(cart, addr + 8);
        let sprite = &mut self.sprites[slot];
        sprite.high = high;
        sprite.x = x;
        sprite.attr = attr;
        sprite.zero = used && slot == 0 && self.secondary_has_zero;

        if bits::is_set(attr, 6) {
            sprite.low = sprite.low.reverse_bits();
            sprite.high = sprite.high.reverse_bits();
        }
    }

    fn sprite_pixel(&self, x: u16) -> Option<SpritePixel> {
        self.sprites[..self.sprite_count].iter()
            .filter_map(|sprite| {
                let column = x.wrapping_sub(sprite.x as u16);
                if column >= 8 {
                    return None;
                }
                let color = bits::pattern_pixel(sprite.low, sprite.high, column as u8);
                if color == 0 {
                    return None;
                }
                Some(SpritePixel {
                    color,
                    palette: sprite.attr & 0x03,
                    behind: bits::is_set(sprite.attr, 5),
                    zero: sprite.zero,
                })
            })
            .next()
    }

    fn output_pixel(&mut self, x: u16) {
        let left = x < 8;

        let (background, background_palette) =
            if self.mask.contains(Mask::BACKGROUND) && (!left || self.mask.contains(Mask::BACKGROUND_LEFT)) {
                let mux = 0x8000 >> self.x;
                let color = (((self.pattern_high & mux) != 0) as u8) << 1 | ((self.pattern_low & mux) != 0) as u8;
                let palette = (((self.attribute_high & mux) != 0) as u8) << 1 | ((self.attribute_low & mux) != 0) as u8;
                (color, palette)
            } else {
                (0, 0)
            };

        let sprite = if self.mask.contains(Mask::SPRITES) && (!left || self.mask.contains(Mask::SPRITES_LEFT)) {
            self.sprite_pixel(x)
        } else {
            None
        };

        let index = match sprite {
            None if background == 0 => 0,
            None => background_palette * 4 + background,
            Some(sprite) if background == 0 => 0x10 + sprite.palette * 4 + sprite.color,
            Some(sprite) => {
                if sprite.zero && x != 255 {
                    self.status.insert(Status::SPRITE_ZERO);
                }
                if sprite.behind {
                    background_palette * 4 + background
                } else {
                    0x10 + sprite.palette * 4 + sprite.color
                }
            }
        };

        if self.no_video {
            return;
        }

        let mut color = self.palette[Self::palette_index(index as u16)];
        if self.mask.contains(Mask::GREYSCALE) {
            color &= 0x30;
        }
        let pixel = (color & 0x3f) as u16 | (self.mask.emphasis() << 6);
        self.frame_buffer[self.scanline as usize * SCREEN_WIDTH + x as usize] = pixel;
    }

    // endregion
}

impl Default for Ppu {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Ppu {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "Ppu | frame: {}, scanline: {}, dot: {}, v: {:04x}, t: {:04x}, x: {}, w: {}, {:?}, {:?}, {:?}",
                 self.frame, self.scanline, self.dot, self.v, self.t, self.x, self.w, self.ctrl, self.mask, self.status)?;
        writeln!(formatter, "Palette | {:?}", (&self.palette[..]).hex_dump())?;
        write!(formatter, "OAM     | {:?}", (&self.oam[..]).hex_dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::image;

    fn cartridge() -> Cartridge {
        // Vertical mirroring, CHR RAM.
        Cartridge::new(&image(2, 0, 0x01, 0)).unwrap()
    }

    fn run_to(ppu: &mut Ppu, cart: &mut Cartridge, scanline: u16, dot: u16) {
        while ppu.scanline() != scanline || ppu.dot() != dot {
            ppu.step(cart);
        }
    }

    fn set_addr(ppu: &mut Ppu, cart: &mut Cartridge, addr: u16) {
        ppu.write_register(0x2006, (addr >> 8) as u8, cart);
        ppu.write_register(0x2006, addr as u8, cart);
    }

    #[test]
    fn vblank_flag_and_nmi() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.write_register(0x2000, 0x80, &mut cart);

        run_to(&mut ppu, &mut cart, VBLANK_SCANLINE, 1);
        assert!(!ppu.nmi_line());
        assert!(ppu.step(&mut cart));
        assert!(ppu.nmi_line());

        // Reading the status clears the flag and the line.
        assert_eq!(ppu.read_register(0x2002, &mut cart) & 0x80, 0x80);
        assert_eq!(ppu.read_register(0x2002, &mut cart) & 0x80, 0x00);
        assert!(!ppu.nmi_line());
    }

    #[test]
    fn status_read_on_the_vblank_dot_suppresses_it() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.write_register(0x2000, 0x80, &mut cart);

        run_to(&mut ppu, &mut cart, VBLANK_SCANLINE, 1);
        assert_eq!(ppu.read_register(0x2002, &mut cart) & 0x80, 0x00);
        ppu.step(&mut cart);
        assert!(!ppu.nmi_line());
        assert_eq!(ppu.read_register(0x2002, &mut cart) & 0x80, 0x00);
    }

    #[test]
    fn enabling_nmi_during_vblank_raises_the_line() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        run_to(&mut ppu, &mut cart, VBLANK_SCANLINE + 1, 0);
        assert!(!ppu.nmi_line());
        ppu.write_register(0x2000, 0x80, &mut cart);
        assert!(ppu.nmi_line());
    }

    #[test]
    fn pre_render_clears_flags() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        run_to(&mut ppu, &mut cart, PRE_RENDER_SCANLINE, 2);
        assert_eq!(ppu.peek_register(0x2002) & 0xe0, 0);
    }

    // Dots until the next vblank start.
    fn next_vblank(ppu: &mut Ppu, cart: &mut Cartridge) -> u64 {
        let start = ppu.dots();
        while !ppu.step(cart) {}
        ppu.dots() - start
    }

    #[test]
    fn frame_length() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        next_vblank(&mut ppu, &mut cart);
        assert_eq!(next_vblank(&mut ppu, &mut cart), DOTS_PER_FRAME);
        assert_eq!(next_vblank(&mut ppu, &mut cart), DOTS_PER_FRAME);

        // Rendering on: one dot shorter every other frame.
        ppu.write_register(0x2001, 0x08, &mut cart);
        let mut lengths = vec![next_vblank(&mut ppu, &mut cart), next_vblank(&mut ppu, &mut cart)];
        lengths.sort();
        assert_eq!(lengths, vec![DOTS_PER_FRAME - 1, DOTS_PER_FRAME]);
    }

    #[test]
    fn ppudata_reads_are_buffered() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.write_register(0x2007, 0x11, &mut cart);
        ppu.write_register(0x2007, 0x22, &mut cart);

        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.read_register(0x2007, &mut cart);
        assert_eq!(ppu.read_register(0x2007, &mut cart), 0x11);
        assert_eq!(ppu.read_register(0x2007, &mut cart), 0x22);
    }

    #[test]
    fn palette_reads_are_immediate_and_mirrored() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut cart, 0x3f10);
        ppu.write_register(0x2007, 0x2c, &mut cart);

        set_addr(&mut ppu, &mut cart, 0x3f00);
        assert_eq!(ppu.read_register(0x2007, &mut cart) & 0x3f, 0x2c);
    }

    #[test]
    fn increment_by_32() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.write_register(0x2000, 0x04, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.write_register(0x2007, 0xaa, &mut cart);
        ppu.write_register(0x2007, 0xbb, &mut cart);
        assert_eq!(ppu.peek_vram(&cart, 0x2020), 0xbb);
    }

    #[test]
    fn vertical_mirroring_through_ppudata() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut cart, 0x2005);
        ppu.write_register(0x2007, 0x5a, &mut cart);
        assert_eq!(ppu.peek_vram(&cart, 0x2805), 0x5a);
        assert_eq!(ppu.peek_vram(&cart, 0x2405), 0x00);
    }

    #[test]
    fn status_low_bits_come_from_latch() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.write_register(0x2003, 0x1f, &mut cart);
        assert_eq!(ppu.read_register(0x2002, &mut cart), 0x1f);
    }

    #[test]
    fn oamdata_write_increments() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.write_register(0x2003, 0x02, &mut cart);
        ppu.write_register(0x2004, 0xff, &mut cart);
        ppu.write_register(0x2004, 0x33, &mut cart);
        assert_eq!(ppu.oam()[2], 0xe3);
        assert_eq!(ppu.oam()[3], 0x33);
    }

    #[test]
    fn scroll_writes_fill_t_and_x() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.write_register(0x2005, 0b0111_1101, &mut cart);
        ppu.write_register(0x2005, 0b0101_1110, &mut cart);
        assert_eq!(ppu.x, 0b101);
        assert_eq!(ppu.t, 0b110_00_01011_01111);
    }

    #[test]
    fn forced_blank_keeps_the_frame_buffer() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        ppu.frame_buffer[0] = 0x1ff;
        run_to(&mut ppu, &mut cart, VBLANK_SCANLINE, 2);
        assert_eq!(ppu.frame_buffer()[0], 0x1ff);
    }

    // Solid tile 1 everywhere, sprite 0 over it.
    fn sprite_zero_scene(ppu: &mut Ppu, cart: &mut Cartridge, sprite_x: u8) {
        set_addr(ppu, cart, 0x0010);
        for _ in 0..16 {
            ppu.write_register(0x2007, 0xff, cart);
        }
        set_addr(ppu, cart, 0x2000);
        for _ in 0..960 {
            ppu.write_register(0x2007, 0x01, cart);
        }
        ppu.oam[0] = 20;
        ppu.oam[1] = 0x01;
        ppu.oam[2] = 0x00;
        ppu.oam[3] = sprite_x;
        set_addr(ppu, cart, 0x0000);
        ppu.write_register(0x2005, 0, cart);
        ppu.write_register(0x2005, 0, cart);
    }

    #[test]
    fn sprite_zero_hit() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        sprite_zero_scene(&mut ppu, &mut cart, 40);
        ppu.write_register(0x2001, 0x1e, &mut cart);

        run_to(&mut ppu, &mut cart, PRE_RENDER_SCANLINE, 0);
        run_to(&mut ppu, &mut cart, 21, 0);
        assert_eq!(ppu.peek_register(0x2002) & 0x40, 0);
        run_to(&mut ppu, &mut cart, 22, 0);
        assert_eq!(ppu.peek_register(0x2002) & 0x40, 0x40);
    }

    #[test]
    fn no_sprite_zero_hit_at_x_255() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        sprite_zero_scene(&mut ppu, &mut cart, 255);
        ppu.write_register(0x2001, 0x1e, &mut cart);

        run_to(&mut ppu, &mut cart, PRE_RENDER_SCANLINE, 0);
        run_to(&mut ppu, &mut cart, 40, 0);
        assert_eq!(ppu.peek_register(0x2002) & 0x40, 0);
    }

    #[test]
    fn no_sprite_zero_hit_in_clipped_column() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        sprite_zero_scene(&mut ppu, &mut cart, 0);
        // Left column hidden for sprites.
        ppu.write_register(0x2001, 0x1a, &mut cart);

        run_to(&mut ppu, &mut cart, PRE_RENDER_SCANLINE, 0);
        run_to(&mut ppu, &mut cart, 40, 0);
        assert_eq!(ppu.peek_register(0x2002) & 0x40, 0);
    }

    #[test]
    fn sprite_overflow() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        // Nine sprites on line 50.
        for n in 0..64 {
            ppu.oam[n * 4] = if n < 9 { 50 } else { 0xf0 };
        }
        ppu.write_register(0x2001, 0x18, &mut cart);

        run_to(&mut ppu, &mut cart, PRE_RENDER_SCANLINE, 0);
        run_to(&mut ppu, &mut cart, 50, 0);
        assert_eq!(ppu.peek_register(0x2002) & 0x20, 0);
        run_to(&mut ppu, &mut cart, 51, 0);
        assert_eq!(ppu.peek_register(0x2002) & 0x20, 0x20);
    }

    #[test]
    fn background_pixels_reach_the_frame_buffer() {
        let mut cart = cartridge();
        let mut ppu = Ppu::new();
        sprite_zero_scene(&mut ppu, &mut cart, 0);
        ppu.oam[0] = 0xf0;
        set_addr(&mut ppu, &mut cart, 0x3f00);
        ppu.write_register(0x2007, 0x0f, &mut cart);
        ppu.write_register(0x2007, 0x01, &mut cart);
        ppu.write_register(0x2007, 0x02, &mut cart);
        ppu.write_register(0x2007, 0x16, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x0000);
        ppu.write_register(0x2001, 0x0a, &mut cart);

        run_to(&mut ppu, &mut cart, PRE_RENDER_SCANLINE, 0);
        run_to(&mut ppu, &mut cart, VBLANK_SCANLINE, 0);
        assert!(ppu.frame_buffer().iter().all(|&pixel| pixel == 0x16));
    }

    #[test]
    fn validate_memory_sizes() {
        let mut ppu = Ppu::new();
        assert!(ppu.validate().is_ok());

        ppu.oam.pop();
        assert!(ppu.validate().is_err());
        ppu.oam.push(0);

        ppu.frame_buffer.clear();
        assert!(ppu.validate().is_err());
        ppu.frame_buffer.resize(SCREEN_SIZE, 0);

        ppu.dot = DOTS_PER_SCANLINE;
        assert!(ppu.validate().is_err());
    }
}
