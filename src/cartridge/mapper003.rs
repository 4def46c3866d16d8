use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};

const CHR_BANK: usize = 0x2000;

// CNROM: fixed PRG, 8KB CHR bank select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cnrom {
    bank: u8,
    prg_rom_size: usize,
    chr_banks: usize,
    mirroring: Mirroring,
    conflicts: bool,
}

impl Cnrom {
    pub fn new(header: &Header) -> Self {
        Self {
            bank: 0,
            prg_rom_size: header.prg_rom_size,
            chr_banks: (header.chr_rom_size / CHR_BANK).max(1),
            mirroring: header.mirroring,
            conflicts: header.submapper == 2,
        }
    }
}

impl Mapper for Cnrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x8000..=0xffff => Location::PrgRom((addr - 0x8000) as usize % self.prg_rom_size.max(1)),
            _ => mapper::prg_ram_location(addr),
        }
    }

    fn map_chr(&self, addr: u16) -> Location {
        Location::Chr(mapper::bank_offset(self.bank as usize, self.chr_banks, CHR_BANK, addr))
    }

    fn on_write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.bank = data;
        }
    }

    fn mirroring(&self) -> Mirroring { self.mirroring }

    fn bus_conflicts(&self) -> bool { self.conflicts }
}
