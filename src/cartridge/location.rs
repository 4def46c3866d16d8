// Physical destination of a cartridge access.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Location {
    // Nothing answers. CPU reads see open bus.
    Nowhere,

    // Offsets into the cartridge memories.
    PrgRom(usize),
    PrgRam(usize),
    Chr(usize),
}
