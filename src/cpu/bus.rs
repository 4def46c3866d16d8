#[cfg(test)]
use std::fmt;

#[cfg(test)]
use pretty_hex::*;

// What the CPU sees of the rest of the machine.
// Every read and write is one CPU cycle.
pub trait CpuBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);

    // Read without side effects. Used for tracing.
    fn peek(&self, addr: u16) -> u8;

    fn nmi_line(&self) -> bool { false }
    fn irq_line(&self) -> bool { false }

    // Page written to 0x4014, if any.
    fn take_oam_dma(&mut self) -> Option<u8> { None }

    // Address the DMC wants fetched, if any.
    fn take_dmc_dma(&mut self) -> Option<u16> { None }
    fn finish_dmc_dma(&mut self, _data: u8) {}
}

// Flat 64KB memory with settable interrupt lines. Used to test the CPU alone.
#[cfg(test)]
#[derive(Clone)]
pub struct FlatBus {
    pub mem: Vec<u8>,
    pub nmi: bool,
    pub irq: bool,
    pub writes: Vec<(u16, u8)>,
}

#[cfg(test)]
impl FlatBus {
    pub fn new() -> Self {
        Self { mem: vec![0; 0x10000], nmi: false, irq: false, writes: vec![] }
    }

    // Program at `origin`, reset vector pointing to it.
    pub fn with_program(origin: u16, code: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.load(origin, code);
        bus.mem[0xfffc] = origin as u8;
        bus.mem[0xfffd] = (origin >> 8) as u8;
        bus
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.mem[start..start + data.len()].copy_from_slice(data);
    }
}

#[cfg(test)]
impl Default for FlatBus {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
impl CpuBus for FlatBus {
    fn read(&mut self, addr: u16) -> u8 { self.mem[addr as usize] }

    fn write(&mut self, addr: u16, data: u8) {
        self.writes.push((addr, data));
        self.mem[addr as usize] = data;
    }

    fn peek(&self, addr: u16) -> u8 { self.mem[addr as usize] }

    fn nmi_line(&self) -> bool { self.nmi }
    fn irq_line(&self) -> bool { self.irq }
}

#[cfg(test)]
impl fmt::Debug for FlatBus {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        writeln!(formatter, "Zero page | {:?}", (&self.mem[..0x100]).hex_dump())?;
        write!(formatter, "Stack     | {:?}", (&self.mem[0x100..0x200]).hex_dump())
    }
}
