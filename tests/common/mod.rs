#![allow(dead_code)]

use image::RgbImage;

use nesgym::{Config, Console};

pub const NMI: u16 = 0xfffa;
pub const RESET: u16 = 0xfffc;
pub const IRQ: u16 = 0xfffe;

// Assembles an iNES image in memory.
#[derive(Clone)]
pub struct Rom {
    mapper: u16,
    flags6: u8,
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl Rom {
    // 32KB PRG, 8KB CHR ROM.
    pub fn nrom() -> Self { Self::new(0, 2, 1) }

    // `prg` 16KB banks, `chr` 8KB banks. Every PRG byte is its 16KB bank number.
    pub fn new(mapper: u16, prg: usize, chr: usize) -> Self {
        let prg = (0..prg).flat_map(|bank| std::iter::repeat(bank as u8).take(0x4000)).collect();
        Self { mapper, flags6: 0, prg, chr: vec![0; chr * 0x2000] }
    }

    pub fn vertical(mut self) -> Self {
        self.flags6 |= 0x01;
        self
    }

    pub fn battery(mut self) -> Self {
        self.flags6 |= 0x02;
        self
    }

    // CPU address to PRG offset, with the last 16KB at 0xc000.
    fn offset(&self, addr: u16) -> usize {
        let len = self.prg.len();
        if len <= 0x8000 {
            (addr as usize - 0x8000) % len
        } else {
            len - 0x10000 + addr as usize
        }
    }

    pub fn code(mut self, addr: u16, bytes: &[u8]) -> Self {
        let start = self.offset(addr);
        self.prg[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    // Same bytes at the same offset in every 16KB bank, for boards that boot on any bank.
    pub fn everywhere(mut self, addr: u16, bytes: &[u8]) -> Self {
        let offset = addr as usize & 0x3fff;
        for bank in self.prg.chunks_mut(0x4000) {
            bank[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self
    }

    pub fn vector(self, vector: u16, target: u16) -> Self {
        self.everywhere(vector, &[target as u8, (target >> 8) as u8])
    }

    // Code at 0x8000 (mirrored for 16KB banks) plus every vector pointing to `nmi` or the code.
    pub fn program(self, code: &[u8], nmi: &[u8]) -> Self {
        self.everywhere(0x8000, code)
            .everywhere(0x8100, nmi)
            .vector(NMI, 0x8100)
            .vector(RESET, 0x8000)
            .vector(IRQ, 0x8100)
    }

    pub fn chr(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.chr[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut file = vec![
            0x4e, 0x45, 0x53, 0x1a,
            (self.prg.len() / 0x4000) as u8,
            (self.chr.len() / 0x2000) as u8,
            self.flags6 | ((self.mapper as u8 & 0x0f) << 4),
            self.mapper as u8 & 0xf0,
            0, 0, 0, 0, 0, 0, 0, 0,
        ];
        file.extend_from_slice(&self.prg);
        file.extend_from_slice(&self.chr);
        file
    }
}

pub fn init() { nesgym::init_logger(true) }

pub fn console(rom: &Rom) -> Console {
    init();
    Console::new(&rom.build(), &Config::default()).unwrap()
}

// FNV-1a over the pixels.
pub fn hash(image: &RgbImage) -> u64 {
    image.as_raw().iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, &byte| (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3))
}

// An endless loop, nothing else.
pub const SPIN: [u8; 3] = [0x4c, 0x00, 0x80];

// Increments $10 and returns.
pub const COUNT_NMI: [u8; 3] = [0xe6, 0x10, 0x40];

// Enables NMI and background rendering, then spins.
pub const RENDER: [u8; 13] = [
    0xa9, 0x80,       // LDA #$80
    0x8d, 0x00, 0x20, // STA $2000
    0xa9, 0x08,       // LDA #$08
    0x8d, 0x01, 0x20, // STA $2001
    0x4c, 0x0a, 0x80, // JMP $800a
];
