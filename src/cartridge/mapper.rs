use serde::{Deserialize, Serialize};

use crate::cartridge::Header;
use crate::cartridge::location::Location;
use crate::cartridge::mapper000::Nrom;
use crate::cartridge::mapper001::Sxrom;
use crate::cartridge::mapper002::Uxrom;
use crate::cartridge::mapper003::Cnrom;
use crate::cartridge::mapper004::Txrom;
use crate::cartridge::mapper007::Axrom;
use crate::cartridge::mapper011::ColorDreams;
use crate::cartridge::mapper066::Gxrom;
use crate::error::{Error, Result};

// Nametable arrangement seen by the PPU.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLow,
    SingleScreenHigh,
    FourScreen,
}

impl Mirroring {
    // Translate a nametable address (0x2000..=0x3eff) to an offset in the 4KB nametable memory.
    pub fn nametable_offset(self, addr: u16) -> usize {
        let addr = (addr as usize - 0x2000) & 0x0fff;
        let table = addr / 0x400;
        let physical = match self {
            Mirroring::Horizontal => [0, 0, 1, 1][table],
            Mirroring::Vertical => [0, 1, 0, 1][table],
            Mirroring::SingleScreenLow => 0,
            Mirroring::SingleScreenHigh => 1,
            Mirroring::FourScreen => table,
        };
        physical * 0x400 + (addr & 0x3ff)
    }
}

// Bank switching contract every board implements.
pub trait Mapper {
    // CPU 0x4020..=0xffff to PRG ROM or PRG RAM.
    fn map_prg(&self, addr: u16) -> Location;

    // PPU 0x0000..=0x1fff to CHR memory.
    fn map_chr(&self, addr: u16) -> Location;

    // Register writes. Receives every CPU write to cartridge space.
    fn on_write(&mut self, addr: u16, data: u8);

    fn mirroring(&self) -> Mirroring;

    fn irq_pending(&self) -> bool { false }

    // Every address the PPU puts on its bus, stamped with the PPU cycle.
    fn on_ppu_address(&mut self, _addr: u16, _ppu_cycle: u64) {}

    fn prg_ram_writable(&self) -> bool { true }

    fn bus_conflicts(&self) -> bool { false }

    fn reset(&mut self) {}
}

// The board selected at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Board {
    Nrom(Nrom),
    Sxrom(Sxrom),
    Uxrom(Uxrom),
    Cnrom(Cnrom),
    Txrom(Txrom),
    Axrom(Axrom),
    ColorDreams(ColorDreams),
    Gxrom(Gxrom),
}

impl Board {
    pub fn new(header: &Header) -> Result<Self> {
        let board = match header.mapper {
            0 => Board::Nrom(Nrom::new(header)),
            1 => Board::Sxrom(Sxrom::new(header)),
            2 => Board::Uxrom(Uxrom::new(header)),
            3 => Board::Cnrom(Cnrom::new(header)),
            4 => Board::Txrom(Txrom::new(header)),
            7 => Board::Axrom(Axrom::new(header)),
            11 => Board::ColorDreams(ColorDreams::new(header)),
            66 => Board::Gxrom(Gxrom::new(header)),
            id => return Err(Error::UnsupportedMapper(id)),
        };
        Ok(board)
    }
}

macro_rules! dispatch {
    ($self:ident, $board:ident => $call:expr) => {
        match $self {
            Board::Nrom($board) => $call,
            Board::Sxrom($board) => $call,
            Board::Uxrom($board) => $call,
            Board::Cnrom($board) => $call,
            Board::Txrom($board) => $call,
            Board::Axrom($board) => $call,
            Board::ColorDreams($board) => $call,
            Board::Gxrom($board) => $call,
        }
    };
}

impl Mapper for Board {
    fn map_prg(&self, addr: u16) -> Location { dispatch!(self, board => board.map_prg(addr)) }
    fn map_chr(&self, addr: u16) -> Location { dispatch!(self, board => board.map_chr(addr)) }
    fn on_write(&mut self, addr: u16, data: u8) { dispatch!(self, board => board.on_write(addr, data)) }
    fn mirroring(&self) -> Mirroring { dispatch!(self, board => board.mirroring()) }
    fn irq_pending(&self) -> bool { dispatch!(self, board => board.irq_pending()) }
    fn on_ppu_address(&mut self, addr: u16, ppu_cycle: u64) {
        dispatch!(self, board => board.on_ppu_address(addr, ppu_cycle))
    }
    fn prg_ram_writable(&self) -> bool { dispatch!(self, board => board.prg_ram_writable()) }
    fn bus_conflicts(&self) -> bool { dispatch!(self, board => board.bus_conflicts()) }
    fn reset(&mut self) { dispatch!(self, board => board.reset()) }
}

// Offset of `addr` inside a bank of `size` bytes, for bank number `bank` out of `count` banks.
pub fn bank_offset(bank: usize, count: usize, size: usize, addr: u16) -> usize {
    (bank % count.max(1)) * size + (addr as usize & (size - 1))
}

// PRG RAM window shared by most boards.
pub fn prg_ram_location(addr: u16) -> Location {
    match addr {
        0x6000..=0x7fff => Location::PrgRam((addr - 0x6000) as usize),
        _ => Location::Nowhere,
    }
}
