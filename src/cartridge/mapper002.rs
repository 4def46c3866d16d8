use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};

const PRG_BANK: usize = 0x4000;

// UxROM: 16KB switchable at 0x8000, last bank fixed at 0xc000.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uxrom {
    bank: u8,
    prg_banks: usize,
    mirroring: Mirroring,
    conflicts: bool,
}

impl Uxrom {
    pub fn new(header: &Header) -> Self {
        Self {
            bank: 0,
            prg_banks: header.prg_rom_size / PRG_BANK,
            mirroring: header.mirroring,
            conflicts: header.submapper == 2,
        }
    }
}

impl Mapper for Uxrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x8000..=0xbfff => Location::PrgRom(mapper::bank_offset(self.bank as usize, self.prg_banks, PRG_BANK, addr)),
            0xc000..=0xffff => Location::PrgRom(mapper::bank_offset(self.prg_banks.saturating_sub(1), self.prg_banks, PRG_BANK, addr)),
            _ => mapper::prg_ram_location(addr),
        }
    }

    fn map_chr(&self, addr: u16) -> Location { Location::Chr(addr as usize & 0x1fff) }

    fn on_write(&mut self, addr: u16, data: u8) {
        if addr >= 0x8000 {
            self.bank = data;
        }
    }

    fn mirroring(&self) -> Mirroring { self.mirroring }

    fn bus_conflicts(&self) -> bool { self.conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::image;

    #[test]
    fn switch_low_bank_keep_last() {
        let mut board = Uxrom::new(&Header::parse(&image(4, 0, 0x20, 0)).unwrap());
        assert_eq!(board.map_prg(0xc000), Location::PrgRom(3 * PRG_BANK));
        board.on_write(0x8000, 2);
        assert_eq!(board.map_prg(0x8005), Location::PrgRom(2 * PRG_BANK + 5));
        assert_eq!(board.map_prg(0xc000), Location::PrgRom(3 * PRG_BANK));
    }
}
