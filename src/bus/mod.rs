use std::fmt;

use serde::{Deserialize, Serialize};

use crate::apu::Apu;
use crate::bus::controller::Controller;
use crate::bus::genie::GenieCode;
use crate::bus::ram::Ram;
use crate::cartridge::Cartridge;
use crate::config::Config;
use crate::cpu::bus::CpuBus;
use crate::error::Result;
use crate::ppu::Ppu;

pub mod controller;
pub mod genie;
pub mod ram;

pub const OAM_DMA: u16 = 0x4014;
const APU_STATUS: u16 = 0x4015;
const JOYPAD1: u16 = 0x4016;
const JOYPAD2: u16 = 0x4017;

// Everything the CPU can reach. The console owns it and lends it to the CPU every cycle.
#[derive(Clone, Serialize, Deserialize)]
pub struct Bus {
    pub ram: Ram,
    pub ppu: Ppu,
    pub apu: Apu,
    pub cartridge: Cartridge,
    pub controllers: [Controller; 2],

    // Last value driven on the data bus.
    open_bus: u8,
    oam_dma: Option<u8>,

    // Patches on cartridge reads. Not part of the machine, so not saved.
    #[serde(skip)]
    genie_codes: Vec<GenieCode>,
}

impl Bus {
    pub fn new(cartridge: Cartridge, config: &Config) -> Self {
        let mut ppu = Ppu::new();
        ppu.no_video = config.no_video();
        let mut apu = Apu::new(config.sample_rate, config.audio_capacity);
        apu.no_audio = config.no_audio();

        Self {
            ram: Ram::new(config.ram_state),
            ppu,
            apu,
            cartridge,
            controllers: [Controller::default(), Controller::default()],
            open_bus: 0,
            oam_dma: None,
            genie_codes: vec![],
        }
    }

    // Reset line of the console. RAM is kept.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.cartridge.reset();
        self.oam_dma = None;
    }

    pub fn open_bus(&self) -> u8 { self.open_bus }

    pub fn genie_codes(&self) -> &[GenieCode] { &self.genie_codes }

    // A later code for the same address replaces the earlier one.
    pub fn add_genie_code(&mut self, code: GenieCode) {
        self.genie_codes.retain(|other| other.addr() != code.addr());
        self.genie_codes.push(code);
    }

    pub fn set_genie_codes(&mut self, codes: Vec<GenieCode>) { self.genie_codes = codes }

    fn read_cartridge(&self, addr: u16) -> u8 {
        let data = self.cartridge.read_prg(addr).unwrap_or(self.open_bus);
        match self.genie_codes.iter().find(|code| code.addr() == addr) {
            Some(code) => code.apply(data),
            None => data,
        }
    }

    // Range checks for a deserialized bus. The cartridge is checked when its ROM is restored.
    pub fn validate(&self) -> Result<()> {
        self.ram.validate()?;
        self.ppu.validate()?;
        self.apu.validate()
    }

    // One PPU dot. True when vblank starts.
    pub fn step_ppu(&mut self) -> bool { self.ppu.step(&mut self.cartridge) }
}

impl CpuBus for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        let data = match addr {
            0x0000..=0x1fff => self.ram.read(addr),
            0x2000..=0x3fff => self.ppu.read_register(addr, &mut self.cartridge),
            // Internal to the 2A03, the external bus keeps its value.
            APU_STATUS => return (self.apu.read_status() & !0x20) | (self.open_bus & 0x20),
            JOYPAD1 => self.controllers[0].read() | (self.open_bus & 0xe0),
            JOYPAD2 => self.controllers[1].read() | (self.open_bus & 0xe0),
            0x4000..=0x401f => {
                trace!(target: "bus", "read from write only register 0x{:04x}", addr);
                self.open_bus
            }
            _ => self.read_cartridge(addr),
        };
        self.open_bus = data;
        data
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.open_bus = data;
        match addr {
            0x0000..=0x1fff => self.ram.write(addr, data),
            0x2000..=0x3fff => self.ppu.write_register(addr, data, &mut self.cartridge),
            OAM_DMA => self.oam_dma = Some(data),
            JOYPAD1 => {
                self.controllers[0].write(data);
                self.controllers[1].write(data);
            }
            0x4000..=0x4013 | APU_STATUS | JOYPAD2 => self.apu.write_register(addr, data),
            0x4018..=0x401f => debug!(target: "bus", "write to disabled test register 0x{:04x}, 0x{:02x}", addr, data),
            _ => self.cartridge.write_prg(addr, data),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1fff => self.ram.read(addr),
            0x2000..=0x3fff => self.ppu.peek_register(addr),
            APU_STATUS => (self.apu.peek_status() & !0x20) | (self.open_bus & 0x20),
            JOYPAD1 => self.controllers[0].peek() | (self.open_bus & 0xe0),
            JOYPAD2 => self.controllers[1].peek() | (self.open_bus & 0xe0),
            0x4000..=0x401f => self.open_bus,
            _ => self.read_cartridge(addr),
        }
    }

    fn nmi_line(&self) -> bool { self.ppu.nmi_line() }

    fn irq_line(&self) -> bool { self.apu.irq_line() || self.cartridge.irq_pending() }

    fn take_oam_dma(&mut self) -> Option<u8> { self.oam_dma.take() }

    fn take_dmc_dma(&mut self) -> Option<u16> { self.apu.take_dmc_dma() }

    fn finish_dmc_dma(&mut self, data: u8) { self.apu.finish_dmc_dma(data) }
}

impl fmt::Debug for Bus {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "{:?}", self.ram)?;
        writeln!(formatter, "{:?}", self.ppu)?;
        writeln!(formatter, "{:?}", self.apu)?;
        write!(formatter, "{:?}", self.cartridge)
    }
}
