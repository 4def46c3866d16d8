extern crate env_logger;
#[macro_use]
extern crate log;

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod console;
pub mod cpu;
pub mod diag;
pub mod env;
pub mod error;
pub mod ppu;
pub mod state;
pub mod utils;

pub use crate::config::{Config, HeadlessMode, RamState};
pub use crate::console::Console;
pub use crate::cpu::IllegalOpcodes;
pub use crate::env::{Buttons, NesEnv, ObservationTransform, ResetKind, StepResult};
pub use crate::error::{Error, Result};

// RUST_LOG driven logger. Later calls are ignored.
pub fn init_logger(is_test: bool) {
    let _ = env_logger::builder().is_test(is_test).try_init();
}
