// Bit manipulation helpers shared by the CPU, PPU and mappers.

// Copy the bits of source selected by mask into dest.
pub fn copy(dest: u8, source: u8, mask: u8) -> u8 {
    (dest & !mask) | (source & mask)
}

// Check if a bit is set
pub fn is_set(byte: u8, index: u8) -> bool {
    (byte & (1 << index)) != 0
}

// Create a word based on the two bytes
pub fn word(high: u8, low: u8) -> u16 { ((high as u16) << 8) | (low as u16) }

// Get the low byte of a word
pub fn low(word: u16) -> u8 { word as u8 }

// Get the high byte of a word
pub fn high(word: u16) -> u8 { (word >> 8) as u8 }

// Set the low byte of a word
pub fn set_low(word: u16, byte: u8) -> u16 {
    (word & 0xff00) | (byte as u16)
}

// Set the high byte of a word
pub fn set_high(word: u16, byte: u8) -> u16 {
    (word & 0x00ff) | ((byte as u16) << 8)
}

// Two addresses are on different pages when their high bytes differ.
pub fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xff00) != (b & 0xff00)
}

// Two bit pixel of a pattern row. Bit 7 is the leftmost pixel.
pub fn pattern_pixel(low: u8, high: u8, column: u8) -> u8 {
    let shift = 7 - column;
    (((high >> shift) & 0x01) << 1) | ((low >> shift) & 0x01)
}
