use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid iNES header: {0}")]
    InvalidHeader(&'static str),
    #[error("truncated {section}: expected {expected} bytes, found {actual}")]
    TruncatedRom {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported mapper: {0}")]
    UnsupportedMapper(u16),
    #[error("invalid save state: {0}")]
    InvalidSaveState(String),
    #[error("save state was taken from a different cartridge")]
    SaveStateMismatch,
    #[error("illegal opcode 0x{opcode:02x} at 0x{pc:04x}")]
    IllegalOpcode { opcode: u8, pc: u16 },
    #[error("battery ram size mismatch: expected {expected} bytes, found {actual}")]
    SramSize { expected: usize, actual: usize },
    #[error("invalid Game Genie code {code:?}: {reason}")]
    InvalidGenieCode { code: String, reason: String },
    #[error("palette must hold 64 or 512 colors, found {0} bytes")]
    InvalidPalette(usize),
    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to serialize state: {0}")]
    Serialization(#[from] bincode::Error),
}

// Rejects a deserialized save state whose `what` holds a value the emulator never produces.
pub(crate) fn ensure_state(valid: bool, what: &str) -> Result<()> {
    if valid { Ok(()) } else { Err(Error::InvalidSaveState(format!("corrupt {}", what))) }
}

impl Error {
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
