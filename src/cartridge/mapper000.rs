use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};

// NROM: no bank switching. 16KB PRG is mirrored into 0xc000.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nrom {
    prg_rom_size: usize,
    mirroring: Mirroring,
}

impl Nrom {
    pub fn new(header: &Header) -> Self {
        Self { prg_rom_size: header.prg_rom_size, mirroring: header.mirroring }
    }
}

impl Mapper for Nrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x8000..=0xffff => Location::PrgRom((addr - 0x8000) as usize % self.prg_rom_size.max(1)),
            _ => mapper::prg_ram_location(addr),
        }
    }

    fn map_chr(&self, addr: u16) -> Location { Location::Chr(addr as usize & 0x1fff) }

    fn on_write(&mut self, _addr: u16, _data: u8) {}

    fn mirroring(&self) -> Mirroring { self.mirroring }
}
