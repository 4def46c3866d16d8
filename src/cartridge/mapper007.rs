use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};
use crate::utils::bits;

const PRG_BANK: usize = 0x8000;

// AxROM: 32KB PRG switching and one screen mirroring select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axrom {
    bank: u8,
    prg_banks: usize,
    conflicts: bool,
}

impl Axrom {
    pub fn new(header: &Header) -> Self {
        Self {
            bank: 0,
            prg_banks: (header.prg_rom_size / PRG_BANK).max(1),
            conflicts: header.submapper == 2,
        }
    }
}

impl Mapper for Axrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x8000..=0xffff => Location::PrgRom(mapper::bank_offset((self.bank & 0x0f) as usize, self.prg_banks, PRG_BANK, addr)),
            _ => Location::Nowhere,
        }
    }

    fn map_chr(&self, addr: u16) -> Location { Location::Chr(addr as usize & 0x1fff) }

    fn on_write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.bank = data;
        }
    }

    fn mirroring(&self) -> Mirroring {
        if bits::is_set(self.bank, 4) { Mirroring::SingleScreenHigh } else { Mirroring::SingleScreenLow }
    }

    fn bus_conflicts(&self) -> bool { self.conflicts }
}
