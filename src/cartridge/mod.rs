use std::fmt;
use std::mem;

use pretty_hex::PrettyHex;
use serde::{Deserialize, Serialize};

use crate::cartridge::location::Location;
use crate::cartridge::mapper::{Board, Mapper, Mirroring};
use crate::error::{ensure_state, Error, Result};
use crate::utils::bits;

pub mod location;
pub mod mapper;
pub mod mapper000;
pub mod mapper001;
pub mod mapper002;
pub mod mapper003;
pub mod mapper004;
pub mod mapper007;
pub mod mapper011;
pub mod mapper066;

pub const HEADER_SIZE: usize = 0x10;
const TRAINER_SIZE: usize = 0x200;
const EIGHT_KBYTES: usize = 0x2000;
const SIXTEEN_KBYTES: usize = 2 * EIGHT_KBYTES;

// Decoded iNES or NES 2.0 header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub mapper: u16,
    pub submapper: u8,
    pub prg_rom_size: usize,
    pub chr_rom_size: usize,
    pub prg_ram_size: usize,
    pub chr_ram_size: usize,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
    pub nes2: bool,
}

impl Header {
    pub fn parse(file: &[u8]) -> Result<Self> {
        if file.get(0..4) != Some(&b"NES\x1a"[..]) {
            return Err(Error::InvalidHeader("missing NES magic"));
        }
        if file.len() < HEADER_SIZE {
            return Err(Error::TruncatedRom { section: "header", expected: HEADER_SIZE, actual: file.len() });
        }

        let flags6 = file[6];
        let flags7 = file[7];
        let nes2 = flags7 & 0x0c == 0x08;

        let mirroring = if bits::is_set(flags6, 3) {
            Mirroring::FourScreen
        } else if bits::is_set(flags6, 0) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mut header = Self {
            mapper: (flags6 >> 4) as u16,
            submapper: 0,
            prg_rom_size: file[4] as usize * SIXTEEN_KBYTES,
            chr_rom_size: file[5] as usize * EIGHT_KBYTES,
            prg_ram_size: 0,
            chr_ram_size: 0,
            mirroring,
            battery: bits::is_set(flags6, 1),
            trainer: bits::is_set(flags6, 2),
            nes2,
        };

        if nes2 {
            header.mapper |= ((flags7 & 0xf0) as u16) | (((file[8] & 0x0f) as u16) << 8);
            header.submapper = file[8] >> 4;
            header.prg_rom_size = Self::nes2_rom_size(file[4], file[9] & 0x0f, SIXTEEN_KBYTES)
                .ok_or(Error::InvalidHeader("PRG ROM size out of range"))?;
            header.chr_rom_size = Self::nes2_rom_size(file[5], file[9] >> 4, EIGHT_KBYTES)
                .ok_or(Error::InvalidHeader("CHR ROM size out of range"))?;
            header.prg_ram_size = Self::shift_size(file[10] & 0x0f) + Self::shift_size(file[10] >> 4);
            header.chr_ram_size = Self::shift_size(file[11] & 0x0f) + Self::shift_size(file[11] >> 4);
        } else {
            // Dumps with garbage in bytes 7..16 ("DiskDude!") only carry the low mapper nibble.
            if file[12..16].iter().all(|&b| b == 0) {
                header.mapper |= (flags7 & 0xf0) as u16;
            }
            header.prg_ram_size = EIGHT_KBYTES * (file[8] as usize).max(1);
            if header.chr_rom_size == 0 {
                header.chr_ram_size = EIGHT_KBYTES;
            }
        }

        if header.prg_rom_size == 0 {
            return Err(Error::InvalidHeader("cartridge has no PRG ROM"));
        }

        Ok(header)
    }

    // NES 2.0 sizes. An MSB nibble of 0xf selects the exponent-multiplier form.
    // None when the size does not fit in memory.
    fn nes2_rom_size(lsb: u8, msb: u8, unit: usize) -> Option<usize> {
        if msb == 0x0f {
            let exponent = (lsb >> 2) as u32;
            let multiplier = ((lsb & 0x03) * 2 + 1) as usize;
            2usize.checked_pow(exponent)?.checked_mul(multiplier)
        } else {
            ((((msb as usize) << 8) | lsb as usize)).checked_mul(unit)
        }
    }

    fn shift_size(shift: u8) -> usize {
        if shift == 0 { 0 } else { 64 << shift }
    }
}

// Cartridge contents plus the board that maps them.
// ROM is not serialized. Save states restore it from the loaded cartridge.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cartridge {
    pub header: Header,
    #[serde(skip)]
    prg_rom: Vec<u8>,
    #[serde(skip)]
    chr_rom: Vec<u8>,
    chr_ram: Vec<u8>,
    prg_ram: Vec<u8>,
    pub board: Board,
}

impl Cartridge {
    pub fn new(file: &[u8]) -> Result<Self> {
        let header = Header::parse(file)?;

        let mut start = HEADER_SIZE;
        if header.trainer {
            start += TRAINER_SIZE;
        }

        let prg_rom = Self::section(file, "PRG ROM", start, header.prg_rom_size)?;
        start += prg_rom.len();
        let chr_rom = Self::section(file, "CHR ROM", start, header.chr_rom_size)?;

        let board = Board::new(&header)?;

        let chr_ram_size = if chr_rom.is_empty() { header.chr_ram_size.max(EIGHT_KBYTES) } else { header.chr_ram_size };
        // Boards can decode PRG RAM even when a NES 2.0 header reports none.
        let prg_ram_size = if header.nes2 && header.prg_ram_size == 0 { 0 } else { header.prg_ram_size.max(EIGHT_KBYTES) };

        info!(target: "mapper", "loaded cartridge: mapper {}, prg {}KB, chr {}KB, {:?}",
              header.mapper, header.prg_rom_size / 1024, header.chr_rom_size / 1024, header.mirroring);

        Ok(Self {
            header,
            prg_rom,
            chr_rom,
            chr_ram: vec![0; chr_ram_size],
            prg_ram: vec![0; prg_ram_size],
            board,
        })
    }

    fn section(file: &[u8], section: &'static str, start: usize, size: usize) -> Result<Vec<u8>> {
        start.checked_add(size)
            .and_then(|end| file.get(start..end))
            .map(|bytes| bytes.to_vec())
            .ok_or(Error::TruncatedRom { section, expected: size, actual: file.len().saturating_sub(start) })
    }

    // Take the ROM of another instance of the same cartridge. Used after deserializing,
    // so the board and memory sizes are checked against the running cartridge first.
    pub fn restore_rom(&mut self, from: &Cartridge) -> Result<()> {
        ensure_state(self.header == from.header, "cartridge header")?;
        ensure_state(mem::discriminant(&self.board) == mem::discriminant(&from.board), "board")?;
        ensure_state(self.prg_ram.len() == from.prg_ram.len(), "PRG RAM")?;
        ensure_state(self.chr_ram.len() == from.chr_ram.len(), "CHR RAM")?;
        self.prg_rom = from.prg_rom.clone();
        self.chr_rom = from.chr_rom.clone();
        Ok(())
    }

    // FNV-1a over the ROM contents, used to match save states with cartridges.
    pub fn fingerprint(&self) -> u64 {
        self.prg_rom.iter().chain(self.chr_rom.iter())
            .fold(0xcbf2_9ce4_8422_2325u64, |hash, &byte| (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3))
    }

    pub fn mirroring(&self) -> Mirroring { self.board.mirroring() }

    pub fn irq_pending(&self) -> bool { self.board.irq_pending() }

    pub fn prg_ram(&self) -> &[u8] { &self.prg_ram }

    pub fn load_prg_ram(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.prg_ram.len() {
            return Err(Error::SramSize { expected: self.prg_ram.len(), actual: data.len() });
        }
        self.prg_ram.copy_from_slice(data);
        Ok(())
    }

    pub fn reset(&mut self) { self.board.reset() }

    // CPU side, 0x4020..=0xffff. None means nothing answered and the bus stays open.
    pub fn read_prg(&self, addr: u16) -> Option<u8> {
        match self.board.map_prg(addr) {
            Location::PrgRom(offset) => Some(Self::fetch(&self.prg_rom, offset)),
            Location::PrgRam(offset) if !self.prg_ram.is_empty() => Some(Self::fetch(&self.prg_ram, offset)),
            _ => None,
        }
    }

    pub fn write_prg(&mut self, addr: u16, data: u8) {
        let data = match self.board.map_prg(addr) {
            Location::PrgRam(offset) => {
                if !self.prg_ram.is_empty() && self.board.prg_ram_writable() {
                    let len = self.prg_ram.len();
                    self.prg_ram[offset % len] = data;
                }
                data
            }
            // Discrete boards see the ROM drive the bus at the same time as the CPU.
            Location::PrgRom(offset) if self.board.bus_conflicts() => data & Self::fetch(&self.prg_rom, offset),
            _ => data,
        };
        self.board.on_write(addr, data);
    }

    // PPU side, 0x0000..=0x1fff. The ppu cycle feeds boards that watch the address bus.
    pub fn read_chr(&mut self, addr: u16, ppu_cycle: u64) -> u8 {
        self.board.on_ppu_address(addr, ppu_cycle);
        self.peek_chr(addr)
    }

    pub fn peek_chr(&self, addr: u16) -> u8 {
        match self.board.map_chr(addr) {
            Location::Chr(offset) if self.chr_rom.is_empty() => Self::fetch(&self.chr_ram, offset),
            Location::Chr(offset) => Self::fetch(&self.chr_rom, offset),
            _ => 0,
        }
    }

    pub fn write_chr(&mut self, addr: u16, data: u8, ppu_cycle: u64) {
        self.board.on_ppu_address(addr, ppu_cycle);
        if let Location::Chr(offset) = self.board.map_chr(addr) {
            if self.chr_rom.is_empty() {
                let len = self.chr_ram.len();
                self.chr_ram[offset % len] = data;
            } else {
                debug!(target: "mapper", "write to CHR ROM ignored. 0x{:04x}, 0x{:02x}", addr, data);
            }
        }
    }

    // Nametable fetches also drive the PPU address bus.
    pub fn observe_ppu_address(&mut self, addr: u16, ppu_cycle: u64) {
        self.board.on_ppu_address(addr, ppu_cycle);
    }

    fn fetch(memory: &[u8], offset: usize) -> u8 {
        if memory.is_empty() { 0 } else { memory[offset % memory.len()] }
    }
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "Header  | {:?}", self.header)?;
        writeln!(formatter, "Board   | {:?}", self.board)?;
        write!(formatter, "PRG RAM | {:?}", (&self.prg_ram[..]).hex_dump())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    // A minimal iNES image: `prg` 16KB banks, `chr` 8KB banks, flags 6 and 7 as given.
    pub fn image(prg: u8, chr: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut file = vec![0x4e, 0x45, 0x53, 0x1a, prg, chr, flags6, flags7, 0, 0, 0, 0, 0, 0, 0, 0];
        for bank in 0..prg as usize * 2 {
            file.extend(std::iter::repeat(bank as u8).take(EIGHT_KBYTES));
        }
        for bank in 0..chr as usize * 8 {
            file.extend(std::iter::repeat(0x80 | bank as u8).take(0x400));
        }
        file
    }

    #[test]
    fn invalid_header() {
        let cartridge = Cartridge::new(b"666");
        assert!(matches!(cartridge, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn truncated_prg_rom() {
        let mut file = image(2, 1, 0, 0);
        file.truncate(HEADER_SIZE + 0x100);
        let cartridge = Cartridge::new(&file);
        assert!(matches!(cartridge, Err(Error::TruncatedRom { section: "PRG ROM", .. })));
    }

    #[test]
    fn truncated_chr_rom() {
        let mut file = image(1, 1, 0, 0);
        file.pop();
        let cartridge = Cartridge::new(&file);
        assert!(matches!(cartridge, Err(Error::TruncatedRom { section: "CHR ROM", .. })));
    }

    #[test]
    fn unsupported_mapper() {
        let file = image(1, 1, 0xf0, 0xf0);
        assert!(matches!(Cartridge::new(&file), Err(Error::UnsupportedMapper(255))));
    }

    #[test]
    fn header_fields() {
        let header = Header::parse(&image(2, 1, 0x13, 0x00)).unwrap();
        assert_eq!(header.mapper, 1);
        assert_eq!(header.prg_rom_size, 0x8000);
        assert_eq!(header.chr_rom_size, 0x2000);
        assert_eq!(header.mirroring, Mirroring::Vertical);
        assert!(header.battery);
        assert!(!header.nes2);
    }

    #[test]
    fn nes2_header() {
        let mut file = image(1, 0, 0x40, 0x08);
        file[8] = 0x21;
        file[10] = 0x07;
        file[11] = 0x07;
        let header = Header::parse(&file).unwrap();
        assert!(header.nes2);
        assert_eq!(header.mapper, 0x104);
        assert_eq!(header.submapper, 2);
        assert_eq!(header.prg_ram_size, 0x2000);
        assert_eq!(header.chr_ram_size, 0x2000);
    }

    #[test]
    fn nes2_exponent_sizes() {
        // 2^2 * 3 bytes of PRG, 2^3 * 1 bytes of CHR.
        let mut file = image(0, 0, 0x00, 0x08);
        file[4] = 0b0000_1001;
        file[5] = 0b0000_1100;
        file[9] = 0xff;
        file.extend_from_slice(&[0xaa; 12]);
        file.extend_from_slice(&[0x55; 8]);
        let header = Header::parse(&file).unwrap();
        assert_eq!(header.prg_rom_size, 12);
        assert_eq!(header.chr_rom_size, 8);
        let cartridge = Cartridge::new(&file).unwrap();
        assert_eq!(cartridge.read_prg(0x8000), Some(0xaa));
        assert_eq!(cartridge.peek_chr(0x0000), 0x55);
    }

    #[test]
    fn nes2_size_out_of_range() {
        // Exponent 63, multiplier 7.
        let mut file = image(2, 0, 0x00, 0x08);
        file[4] = 0xff;
        file[9] = 0x0f;
        assert!(matches!(Cartridge::new(&file), Err(Error::InvalidHeader(_))));

        // Exponent 28, multiplier 1 fits but the file is far shorter.
        file[4] = 0x70;
        assert!(matches!(Cartridge::new(&file), Err(Error::TruncatedRom { section: "PRG ROM", .. })));
    }

    #[test]
    fn archaic_header_ignores_high_nibble() {
        let mut file = image(1, 1, 0x00, 0x40);
        file[7..16].copy_from_slice(b"DiskDude!");
        assert_eq!(Header::parse(&file).unwrap().mapper, 0);
    }

    #[test]
    fn restore_rom_needs_the_same_board() {
        let running = Cartridge::new(&image(2, 1, 0x00, 0)).unwrap();

        let mut restored = running.clone();
        restored.prg_rom.clear();
        restored.restore_rom(&running).unwrap();
        assert_eq!(restored.fingerprint(), running.fingerprint());

        // Same sizes, UxROM instead of NROM.
        let mut other = Cartridge::new(&image(2, 1, 0x20, 0)).unwrap();
        assert!(matches!(other.restore_rom(&running), Err(Error::InvalidSaveState(_))));

        let mut restored = running.clone();
        restored.chr_ram.clear();
        restored.chr_ram.push(0);
        assert!(matches!(restored.restore_rom(&running), Err(Error::InvalidSaveState(_))));
    }

    #[test]
    fn trainer_is_skipped() {
        let mut file = image(1, 1, 0x04, 0);
        let trainer = vec![0xee; TRAINER_SIZE];
        file.splice(HEADER_SIZE..HEADER_SIZE, trainer);
        let cartridge = Cartridge::new(&file).unwrap();
        assert_eq!(cartridge.read_prg(0x8000), Some(0));
    }

    #[test]
    fn nrom_128_is_mirrored() {
        let cartridge = Cartridge::new(&image(1, 1, 0, 0)).unwrap();
        assert_eq!(cartridge.read_prg(0x8000), Some(0));
        assert_eq!(cartridge.read_prg(0xa000), Some(1));
        assert_eq!(cartridge.read_prg(0xc000), Some(0));
        assert_eq!(cartridge.read_prg(0xe000), Some(1));
    }

    #[test]
    fn chr_ram_is_writable() {
        let mut cartridge = Cartridge::new(&image(1, 0, 0, 0)).unwrap();
        cartridge.write_chr(0x0123, 0x42, 0);
        assert_eq!(cartridge.peek_chr(0x0123), 0x42);
    }

    #[test]
    fn chr_rom_is_read_only() {
        let mut cartridge = Cartridge::new(&image(1, 1, 0, 0)).unwrap();
        cartridge.write_chr(0x0000, 0x42, 0);
        assert_eq!(cartridge.peek_chr(0x0000), 0x80);
    }

    #[test]
    fn prg_ram() {
        let mut cartridge = Cartridge::new(&image(1, 1, 0, 0)).unwrap();
        cartridge.write_prg(0x6000, 0x99);
        assert_eq!(cartridge.read_prg(0x6000), Some(0x99));
        assert_eq!(cartridge.prg_ram()[0], 0x99);
        assert!(cartridge.load_prg_ram(&[0; 3]).is_err());
    }

    #[test]
    fn fingerprint_depends_on_rom() {
        let a = Cartridge::new(&image(1, 1, 0, 0)).unwrap();
        let mut file = image(1, 1, 0, 0);
        file[HEADER_SIZE] = 0xff;
        let b = Cartridge::new(&file).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
