use std::fmt;

use pretty_hex::*;
use serde::{Deserialize, Serialize};

use crate::config::RamState;
use crate::error::{ensure_state, Result};

// 2KB, mirrored up to 0x1fff.
pub const RAM_CAPACITY: usize = 0x0800;

#[derive(Clone, Serialize, Deserialize)]
pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    pub fn new(state: RamState) -> Self { Self { data: vec![state.fill(); RAM_CAPACITY] } }

    pub fn read(&self, addr: u16) -> u8 { self.data[addr as usize % RAM_CAPACITY] }

    pub fn write(&mut self, addr: u16, data: u8) { self.data[addr as usize % RAM_CAPACITY] = data }

    pub fn as_slice(&self) -> &[u8] { &self.data }

    pub fn validate(&self) -> Result<()> { ensure_state(self.data.len() == RAM_CAPACITY, "RAM") }
}

impl Default for Ram {
    fn default() -> Self { Self::new(RamState::default()) }
}

impl fmt::Debug for Ram {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "RAM | {:?}", (&self.data[..]).hex_dump())
    }
}
