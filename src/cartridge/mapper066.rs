use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};

const PRG_BANK: usize = 0x8000;
const CHR_BANK: usize = 0x2000;

// GxROM: PRG in bits 4-5, CHR in bits 0-1 of one register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gxrom {
    register: u8,
    prg_banks: usize,
    chr_banks: usize,
    mirroring: Mirroring,
}

impl Gxrom {
    pub fn new(header: &Header) -> Self {
        Self {
            register: 0,
            prg_banks: (header.prg_rom_size / PRG_BANK).max(1),
            chr_banks: (header.chr_rom_size / CHR_BANK).max(1),
            mirroring: header.mirroring,
        }
    }
}

impl Mapper for Gxrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x8000..=0xffff => Location::PrgRom(mapper::bank_offset(((self.register >> 4) & 0x03) as usize, self.prg_banks, PRG_BANK, addr)),
            _ => Location::Nowhere,
        }
    }

    fn map_chr(&self, addr: u16) -> Location {
        Location::Chr(mapper::bank_offset((self.register & 0x03) as usize, self.chr_banks, CHR_BANK, addr))
    }

    fn on_write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.register = data;
        }
    }

    fn mirroring(&self) -> Mirroring { self.mirroring }

    fn bus_conflicts(&self) -> bool { true }
}
