use crate::error::{Error, Result};

// Letter values of the Game Genie alphabet, in order from 0x0 to 0xf.
const ALPHABET: &[u8; 16] = b"APZLGITYEOXUKSVN";

// A decoded Game Genie code. It replaces the byte the CPU reads at `addr`,
// optionally only when the cartridge returns `compare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenieCode {
    code: String,
    addr: u16,
    data: u8,
    compare: Option<u8>,
}

impl GenieCode {
    // Six letters patch unconditionally, eight letters add a compare value.
    pub fn parse(code: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidGenieCode { code: code.to_string(), reason };

        let code = code.trim();
        if code.len() != 6 && code.len() != 8 {
            return Err(invalid(format!("expected 6 or 8 letters, found {}", code.len())));
        }
        let hex = code.chars()
            .map(|letter| {
                ALPHABET.iter()
                    .position(|&symbol| symbol as char == letter.to_ascii_uppercase())
                    .map(|value| value as u8)
                    .ok_or_else(|| invalid(format!("unknown letter '{}'", letter)))
            })
            .collect::<Result<Vec<u8>>>()?;

        let addr = 0x8000
            | ((hex[3] as u16 & 7) << 12)
            | ((hex[5] as u16 & 7) << 8)
            | ((hex[4] as u16 & 8) << 8)
            | ((hex[2] as u16 & 7) << 4)
            | ((hex[1] as u16 & 8) << 4)
            | (hex[4] as u16 & 7)
            | (hex[3] as u16 & 8);
        let (high_bit, compare) = if hex.len() == 8 {
            let compare = ((hex[7] & 7) << 4) | ((hex[6] & 8) << 4) | (hex[6] & 7) | (hex[5] & 8);
            (hex[7] & 8, Some(compare))
        } else {
            (hex[5] & 8, None)
        };
        let data = ((hex[1] & 7) << 4) | ((hex[0] & 8) << 4) | (hex[0] & 7) | high_bit;

        Ok(Self { code: code.to_ascii_uppercase(), addr, data, compare })
    }

    pub fn code(&self) -> &str { &self.code }
    pub fn addr(&self) -> u16 { self.addr }
    pub fn data(&self) -> u8 { self.data }
    pub fn compare(&self) -> Option<u8> { self.compare }

    // What the CPU sees instead of `value`.
    pub fn apply(&self, value: u8) -> u8 {
        match self.compare {
            Some(compare) if compare != value => value,
            _ => self.data,
        }
    }
}
