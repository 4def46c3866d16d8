use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::config::Config;
use crate::cpu::bus::CpuBus;
use crate::cpu::Cpu;
use crate::error::{ensure_state, Result};

// PPU dots per CPU cycle.
const DOTS_PER_CYCLE: u8 = 3;

// The whole machine. Steps the CPU, PPU and APU in their fixed 1:3:1 ratio.
#[derive(Clone, Serialize, Deserialize)]
pub struct Console {
    pub cpu: Cpu,
    pub bus: Bus,

    // Dot inside the current CPU cycle. The CPU and APU run on dot 0.
    phase: u8,
}

impl Console {
    pub fn new(rom: &[u8], config: &Config) -> Result<Self> {
        let cartridge = Cartridge::new(rom)?;
        Ok(Self::with_cartridge(cartridge, config))
    }

    pub fn with_cartridge(cartridge: Cartridge, config: &Config) -> Self {
        Self {
            cpu: Cpu::new(config.illegal_opcodes),
            bus: Bus::new(cartridge, config),
            phase: 0,
        }
    }

    // Reset button. RAM and cartridge memory survive.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.reset();
    }

    // region Counters

    pub fn frame(&self) -> u64 { self.bus.ppu.frame() }
    pub fn cycles(&self) -> u64 { self.cpu.cycles() }

    // Range checks for a deserialized console. Everything the emulator indexes or divides with.
    pub fn validate(&self) -> Result<()> {
        ensure_state(self.phase < DOTS_PER_CYCLE, "dot phase")?;
        self.cpu.validate()?;
        self.bus.validate()
    }
    pub fn dots(&self) -> u64 { self.bus.ppu.dots() }
    pub fn jammed(&self) -> bool { self.cpu.jammed() }

    // Side effect free view of the CPU address space.
    pub fn peek(&self, addr: u16) -> u8 { self.bus.peek(addr) }

    // Internal RAM, 0x0000..=0x07ff.
    pub fn read_ram(&self, addr: u16) -> u8 { self.bus.ram.read(addr & 0x07ff) }

    // endregion

    // region Stepping

    // One PPU dot, preceded by a CPU and an APU cycle every third dot. True when vblank starts.
    pub fn step_dot(&mut self) -> Result<bool> {
        let cpu = if self.phase == 0 {
            let res = self.cpu.step(&mut self.bus);
            self.bus.apu.step();
            res
        } else {
            Ok(())
        };

        self.phase = (self.phase + 1) % DOTS_PER_CYCLE;
        let vblank = self.bus.step_ppu();
        cpu.map(|_| vblank)
    }

    // Up to the end of the current CPU cycle. True when vblank started on the way.
    pub fn step_cycle(&mut self) -> Result<bool> {
        let mut vblank = self.step_dot()?;
        while self.phase != 0 {
            vblank |= self.step_dot()?;
        }
        Ok(vblank)
    }

    // Stops on the dot that sets the vblank flag, scanline 241 dot 1.
    pub fn step_frame(&mut self) -> Result<()> {
        while !self.step_dot()? {}
        Ok(())
    }

    // Runs the current instruction, or interrupt sequence, to completion.
    pub fn step_instruction(&mut self) -> Result<u64> {
        let start = self.cycles();
        loop {
            self.step_cycle()?;
            if self.cpu.at_boundary() {
                break;
            }
        }
        Ok(self.cycles() - start)
    }

    pub fn step_scanline(&mut self) -> Result<()> {
        let scanline = self.bus.ppu.scanline();
        while self.bus.ppu.scanline() == scanline {
            self.step_dot()?;
        }
        Ok(())
    }

    // Runs whole CPU cycles until the condition holds.
    pub fn run_until(&mut self, mut condition: impl FnMut(&Console) -> bool) -> Result<()> {
        while !condition(self) {
            self.step_cycle()?;
        }
        Ok(())
    }

    pub fn run_frames(&mut self, frames: u64) -> Result<()> {
        for _ in 0..frames {
            self.step_frame()?;
        }
        Ok(())
    }

    // endregion
}

impl fmt::Debug for Console {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "{:?}", self.cpu)?;
        write!(formatter, "{:?}", self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::image;
    use crate::ppu::{DOTS_PER_FRAME, VBLANK_SCANLINE};

    // NROM with an endless loop at 0x8000.
    fn console() -> Console {
        let mut rom = image(2, 1, 0x00, 0);
        let prg = 0x10;
        rom[prg..prg + 3].copy_from_slice(&[0x4c, 0x00, 0x80]);
        rom[prg + 0x7ffc] = 0x00;
        rom[prg + 0x7ffd] = 0x80;
        Console::new(&rom, &Config::default()).unwrap()
    }

    #[test]
    fn three_dots_per_cycle() {
        let mut console = console();
        for _ in 0..100 {
            console.step_cycle().unwrap();
        }
        assert_eq!(console.cycles(), 100);
        assert_eq!(console.dots(), 300);
        assert_eq!(console.bus.apu.cycles(), 100);
    }

    #[test]
    fn frame_stops_after_vblank_dot() {
        let mut console = console();
        console.step_frame().unwrap();
        assert_eq!(console.bus.ppu.scanline(), VBLANK_SCANLINE);
        assert_eq!(console.bus.ppu.dot(), 2);
        assert_eq!(console.frame(), 1);

        let dots = console.dots();
        console.step_frame().unwrap();
        // Rendering is off, so no dot is skipped.
        assert_eq!(console.dots() - dots, DOTS_PER_FRAME);
    }

    #[test]
    fn instruction_boundaries() {
        let mut console = console();
        // Reset sequence.
        assert_eq!(console.step_instruction().unwrap(), 7);
        assert_eq!(console.cpu.reg.get_pc(), 0x8000);
        // JMP absolute.
        assert_eq!(console.step_instruction().unwrap(), 3);
        assert_eq!(console.cpu.reg.get_pc(), 0x8000);
    }

    #[test]
    fn scanline_step() {
        let mut console = console();
        console.step_scanline().unwrap();
        assert_eq!(console.bus.ppu.scanline(), 1);
        assert_eq!(console.bus.ppu.dot(), 0);
    }

    #[test]
    fn run_until_condition() {
        let mut console = console();
        console.run_until(|console| console.cycles() >= 1000).unwrap();
        assert_eq!(console.cycles(), 1000);
    }

    #[test]
    fn reset_keeps_ram() {
        let mut console = console();
        console.run_frames(1).unwrap();
        console.bus.write(0x0010, 0xab);
        console.reset();
        console.step_instruction().unwrap();
        assert_eq!(console.read_ram(0x0810), 0xab);
        assert_eq!(console.cpu.reg.get_pc(), 0x8000);
    }
}
