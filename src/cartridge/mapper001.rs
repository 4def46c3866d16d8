use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};
use crate::utils::bits;

const PRG_BANK: usize = 0x4000;
const CHR_BANK: usize = 0x1000;

// Marks the end of the five bit serial load.
const SHIFT_RESET: u8 = 0b1_0000;

// MMC1. Registers are loaded serially, one bit per write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sxrom {
    shift: u8,
    control: u8,
    chr0: u8,
    chr1: u8,
    prg: u8,
    prg_banks: usize,
    chr_banks: usize,
}

impl Sxrom {
    pub fn new(header: &Header) -> Self {
        let chr_size = if header.chr_rom_size == 0 { header.chr_ram_size.max(0x2000) } else { header.chr_rom_size };
        Self {
            shift: SHIFT_RESET,
            control: 0x0c,
            chr0: 0,
            chr1: 0,
            prg: 0,
            prg_banks: header.prg_rom_size / PRG_BANK,
            chr_banks: chr_size / CHR_BANK,
        }
    }

    fn prg_mode(&self) -> u8 { (self.control >> 2) & 0x03 }

    fn chr_4k(&self) -> bool { bits::is_set(self.control, 4) }

    // SUROM uses the CHR register bit 4 to pick a 256KB PRG half.
    fn prg_outer(&self) -> usize {
        if self.prg_banks > 16 { self.chr0 as usize & 0x10 } else { 0 }
    }

    fn prg_bank(&self, addr: u16) -> usize {
        let outer = self.prg_outer();
        let bank = self.prg as usize & 0x0f;
        let last = (self.prg_banks.min(16)).saturating_sub(1);
        match (self.prg_mode(), addr) {
            (0, _) | (1, _) => outer | (bank & 0x0e) | ((addr as usize >> 14) & 0x01),
            (2, 0x8000..=0xbfff) => outer,
            (2, _) => outer | bank,
            (_, 0x8000..=0xbfff) => outer | bank,
            (_, _) => outer | last,
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0x9fff => self.control = value,
            0xa000..=0xbfff => self.chr0 = value,
            0xc000..=0xdfff => self.chr1 = value,
            _ => self.prg = value,
        }
        trace!(target: "mapper", "mmc1 register 0x{:04x} = 0x{:02x}", addr, value);
    }
}

impl Mapper for Sxrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x6000..=0x7fff if bits::is_set(self.prg, 4) => Location::Nowhere,
            0x8000..=0xffff => Location::PrgRom(mapper::bank_offset(self.prg_bank(addr), self.prg_banks, PRG_BANK, addr)),
            _ => mapper::prg_ram_location(addr),
        }
    }

    fn map_chr(&self, addr: u16) -> Location {
        let bank = if self.chr_4k() {
            if addr < 0x1000 { self.chr0 as usize } else { self.chr1 as usize }
        } else {
            (self.chr0 as usize & 0x1e) | ((addr as usize >> 12) & 0x01)
        };
        Location::Chr(mapper::bank_offset(bank, self.chr_banks, CHR_BANK, addr))
    }

    fn on_write(&mut self, addr: u16, data: u8) {
        if addr < 0x8000 {
            return;
        }

        if bits::is_set(data, 7) {
            self.shift = SHIFT_RESET;
            self.control |= 0x0c;
            return;
        }

        let complete = bits::is_set(self.shift, 0);
        self.shift = (self.shift >> 1) | ((data & 0x01) << 4);
        if complete {
            let value = self.shift;
            self.write_register(addr, value);
            self.shift = SHIFT_RESET;
        }
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLow,
            1 => Mirroring::SingleScreenHigh,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn reset(&mut self) {
        self.shift = SHIFT_RESET;
        self.control |= 0x0c;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Header;
    use crate::cartridge::tests::image;

    fn board() -> Sxrom {
        Sxrom::new(&Header::parse(&image(8, 2, 0x10, 0)).unwrap())
    }

    fn load(board: &mut Sxrom, addr: u16, value: u8) {
        for bit in 0..5 {
            board.on_write(addr, (value >> bit) & 0x01);
        }
    }

    #[test]
    fn power_on_fixes_last_bank() {
        let board = board();
        assert_eq!(board.map_prg(0xc000), Location::PrgRom(7 * PRG_BANK));
        assert_eq!(board.map_prg(0x8000), Location::PrgRom(0));
    }

    #[test]
    fn serial_prg_switch() {
        let mut board = board();
        load(&mut board, 0xe000, 3);
        assert_eq!(board.map_prg(0x8000), Location::PrgRom(3 * PRG_BANK));
        assert_eq!(board.map_prg(0xffff), Location::PrgRom(8 * PRG_BANK - 1));
    }

    #[test]
    fn reset_bit_aborts_load() {
        let mut board = board();
        board.on_write(0xe000, 1);
        board.on_write(0xe000, 0x80);
        load(&mut board, 0xe000, 2);
        assert_eq!(board.map_prg(0x8000), Location::PrgRom(2 * PRG_BANK));
    }

    #[test]
    fn mode_32k_ignores_low_bit() {
        let mut board = board();
        load(&mut board, 0x8000, 0x00);
        load(&mut board, 0xe000, 5);
        assert_eq!(board.map_prg(0x8000), Location::PrgRom(4 * PRG_BANK));
        assert_eq!(board.map_prg(0xc000), Location::PrgRom(5 * PRG_BANK));
        assert_eq!(board.mirroring(), Mirroring::SingleScreenLow);
    }

    #[test]
    fn chr_4k_banks() {
        let mut board = board();
        load(&mut board, 0x8000, 0x1f);
        load(&mut board, 0xa000, 2);
        load(&mut board, 0xc000, 3);
        assert_eq!(board.map_chr(0x0000), Location::Chr(2 * CHR_BANK));
        assert_eq!(board.map_chr(0x1001), Location::Chr(3 * CHR_BANK + 1));
        assert_eq!(board.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn prg_ram_disable() {
        let mut board = board();
        load(&mut board, 0xe000, 0x10);
        assert_eq!(board.map_prg(0x6000), Location::Nowhere);
    }
}
