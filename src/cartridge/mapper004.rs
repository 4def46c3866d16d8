use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper::{self, Mapper, Mirroring};
use crate::utils::bits;

const PRG_BANK: usize = 0x2000;
const CHR_BANK: usize = 0x0400;

// A12 must stay low this many PPU cycles before a rise clocks the counter.
const A12_FILTER: u64 = 10;

// MMC3. Eight bank registers and a scanline counter clocked by PPU A12.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Txrom {
    select: u8,
    banks: [u8; 8],
    mirroring: Mirroring,
    four_screen: bool,
    ram_enabled: bool,
    ram_protected: bool,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq: bool,

    // PPU cycle when A12 last went low. None while A12 is high.
    a12_low_since: Option<u64>,

    prg_banks: usize,
    chr_banks: usize,
}

impl Txrom {
    pub fn new(header: &Header) -> Self {
        let chr_size = if header.chr_rom_size == 0 { header.chr_ram_size.max(0x2000) } else { header.chr_rom_size };
        Self {
            select: 0,
            banks: [0, 2, 4, 5, 6, 7, 0, 1],
            mirroring: if header.mirroring == Mirroring::FourScreen { Mirroring::FourScreen } else { Mirroring::Vertical },
            four_screen: header.mirroring == Mirroring::FourScreen,
            ram_enabled: true,
            ram_protected: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq: false,
            a12_low_since: None,
            prg_banks: header.prg_rom_size / PRG_BANK,
            chr_banks: chr_size / CHR_BANK,
        }
    }

    fn prg_bank(&self, addr: u16) -> usize {
        let second_last = self.prg_banks.saturating_sub(2);
        let last = self.prg_banks.saturating_sub(1);
        let swap = bits::is_set(self.select, 6);
        match (addr, swap) {
            (0x8000..=0x9fff, false) | (0xc000..=0xdfff, true) => (self.banks[6] & 0x3f) as usize,
            (0xa000..=0xbfff, _) => (self.banks[7] & 0x3f) as usize,
            (0x8000..=0x9fff, true) | (0xc000..=0xdfff, false) => second_last,
            _ => last,
        }
    }

    fn chr_bank(&self, addr: u16) -> usize {
        // Inversion swaps the 2KB and 1KB halves.
        let addr = if bits::is_set(self.select, 7) { addr ^ 0x1000 } else { addr };
        match addr {
            0x0000..=0x07ff => (self.banks[0] & 0xfe) as usize | ((addr as usize >> 10) & 0x01),
            0x0800..=0x0fff => (self.banks[1] & 0xfe) as usize | ((addr as usize >> 10) & 0x01),
            0x1000..=0x13ff => self.banks[2] as usize,
            0x1400..=0x17ff => self.banks[3] as usize,
            0x1800..=0x1bff => self.banks[4] as usize,
            _ => self.banks[5] as usize,
        }
    }

    fn clock_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enabled {
            trace!(target: "mapper", "mmc3 irq");
            self.irq = true;
        }
    }
}

impl Mapper for Txrom {
    fn map_prg(&self, addr: u16) -> Location {
        match addr {
            0x6000..=0x7fff if !self.ram_enabled => Location::Nowhere,
            0x8000..=0xffff => Location::PrgRom(mapper::bank_offset(self.prg_bank(addr), self.prg_banks, PRG_BANK, addr)),
            _ => mapper::prg_ram_location(addr),
        }
    }

    fn map_chr(&self, addr: u16) -> Location {
        Location::Chr(mapper::bank_offset(self.chr_bank(addr), self.chr_banks, CHR_BANK, addr))
    }

    fn on_write(&mut self, addr: u16, data: u8) {
        let even = addr & 0x01 == 0;
        match (addr, even) {
            (0x8000..=0x9fff, true) => self.select = data,
            (0x8000..=0x9fff, false) => self.banks[(self.select & 0x07) as usize] = data,
            (0xa000..=0xbfff, true) => {
                if !self.four_screen {
                    self.mirroring = if bits::is_set(data, 0) { Mirroring::Horizontal } else { Mirroring::Vertical };
                }
            }
            (0xa000..=0xbfff, false) => {
                self.ram_enabled = bits::is_set(data, 7);
                self.ram_protected = bits::is_set(data, 6);
            }
            (0xc000..=0xdfff, true) => self.irq_latch = data,
            (0xc000..=0xdfff, false) => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            (0xe000..=0xffff, true) => {
                self.irq_enabled = false;
                self.irq = false;
            }
            (0xe000..=0xffff, false) => self.irq_enabled = true,
            _ => {}
        }
    }

    fn mirroring(&self) -> Mirroring { self.mirroring }

    fn irq_pending(&self) -> bool { self.irq }

    fn on_ppu_address(&mut self, addr: u16, ppu_cycle: u64) {
        if bits::is_set(bits::high(addr), 4) {
            if let Some(since) = self.a12_low_since.take() {
                if ppu_cycle.saturating_sub(since) >= A12_FILTER {
                    self.clock_counter();
                }
            }
        } else if self.a12_low_since.is_none() {
            self.a12_low_since = Some(ppu_cycle);
        }
    }

    fn prg_ram_writable(&self) -> bool { self.ram_enabled && !self.ram_protected }
}
