use std::io::{Read, Write};

use bincode::Options;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::console::Console;
use crate::error::{Error, Result};

// Layout: magic, format version (u16 LE), zlib compressed bincode of the snapshot.
// The zlib trailer carries an adler32 of the payload.
const MAGIC: &[u8; 7] = b"NESGYM\x1a";
const VERSION: u16 = 2;
const HEADER_SIZE: usize = MAGIC.len() + 2;

// Upper bound for a decompressed payload. A snapshot is a few hundred KB.
const PAYLOAD_LIMIT: u64 = 16 * 1024 * 1024;

// The ROM itself is not stored, only its fingerprint.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    fingerprint: u64,
    console: &'a Console,
}

#[derive(Deserialize)]
struct Snapshot {
    fingerprint: u64,
    console: Console,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding().with_limit(PAYLOAD_LIMIT)
}

pub fn save(console: &Console) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef { fingerprint: console.bus.cartridge.fingerprint(), console };
    pack(&options().serialize(&snapshot)?)
}

fn pack(payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() / 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());

    let mut encoder = ZlibEncoder::new(out, Compression::default());
    encoder.write_all(payload).map_err(|err| Error::io(err, "compressing save state"))?;
    encoder.finish().map_err(|err| Error::io(err, "compressing save state"))
}

fn unpack(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < HEADER_SIZE || &data[..MAGIC.len()] != MAGIC {
        return Err(Error::InvalidSaveState("missing magic".to_string()));
    }
    let version = u16::from_le_bytes([data[MAGIC.len()], data[MAGIC.len() + 1]]);
    if version != VERSION {
        return Err(Error::InvalidSaveState(format!("unsupported version {}", version)));
    }

    let mut payload = vec![];
    ZlibDecoder::new(&data[HEADER_SIZE..])
        .take(PAYLOAD_LIMIT + 1)
        .read_to_end(&mut payload)
        .map_err(|err| Error::InvalidSaveState(err.to_string()))?;
    if payload.len() as u64 > PAYLOAD_LIMIT {
        return Err(Error::InvalidSaveState("payload too large".to_string()));
    }
    Ok(payload)
}

// Replaces `console` with the saved one. `console` is left untouched on error.
pub fn load(console: &mut Console, data: &[u8]) -> Result<()> {
    let payload = unpack(data)?;
    let snapshot: Snapshot = options().deserialize(&payload)
        .map_err(|err| Error::InvalidSaveState(err.to_string()))?;

    if snapshot.fingerprint != console.bus.cartridge.fingerprint() {
        return Err(Error::SaveStateMismatch);
    }

    let mut restored = snapshot.console;
    restored.validate()?;
    restored.bus.cartridge.restore_rom(&console.bus.cartridge)?;
    restored.bus.set_genie_codes(console.bus.genie_codes().to_vec());
    *console = restored;
    debug!(target: "bus", "save state loaded, frame {}", console.frame());
    Ok(())
}
