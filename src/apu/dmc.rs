use serde::{Deserialize, Serialize};

use crate::error::{ensure_state, Result};

// NTSC rates in CPU cycles.
const RATES: [u16; 16] = [428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54];

// Delta modulation channel. Sample bytes come from CPU memory through DMA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dmc {
    irq_enabled: bool,
    looping: bool,
    rate: u16,
    timer: u16,
    level: u8,
    sample_addr: u16,
    sample_len: u16,
    addr: u16,
    remaining: u16,
    buffer: Option<u8>,
    shift: u8,
    bits: u8,
    silence: bool,
    fetching: bool,
    pub irq: bool,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            irq_enabled: false,
            looping: false,
            rate: RATES[0],
            timer: 0,
            level: 0,
            sample_addr: 0xc000,
            sample_len: 1,
            addr: 0xc000,
            remaining: 0,
            buffer: None,
            shift: 0,
            bits: 8,
            silence: true,
            fetching: false,
            irq: false,
        }
    }
}

impl Dmc {
    // Register offset from 0x4010.
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            // IL-- RRRR
            0 => {
                self.irq_enabled = data & 0x80 != 0;
                self.looping = data & 0x40 != 0;
                self.rate = RATES[(data & 0x0f) as usize];
                if !self.irq_enabled {
                    self.irq = false;
                }
            }
            // Direct load
            1 => self.level = data & 0x7f,
            // 11AA AAAA AA00 0000
            2 => self.sample_addr = 0xc000 | ((data as u16) << 6),
            // LLLL LLLL 0001
            _ => self.sample_len = ((data as u16) << 4) | 1,
        }
    }

    // $4015 bit 4. Also acknowledges the interrupt.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.irq = false;
        if !enabled {
            self.remaining = 0;
        } else if self.remaining == 0 {
            self.restart();
        }
    }

    fn restart(&mut self) {
        self.addr = self.sample_addr;
        self.remaining = self.sample_len;
    }

    // Clocked every CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.rate - 1;
            self.clock_output();
        } else {
            self.timer -= 1;
        }
    }

    fn clock_output(&mut self) {
        if !self.silence {
            if self.shift & 0x01 != 0 {
                if self.level <= 125 {
                    self.level += 2;
                }
            } else if self.level >= 2 {
                self.level -= 2;
            }
        }
        self.shift >>= 1;

        self.bits -= 1;
        if self.bits == 0 {
            self.bits = 8;
            match self.buffer.take() {
                Some(data) => {
                    self.silence = false;
                    self.shift = data;
                }
                None => self.silence = true,
            }
        }
    }

    // The memory reader wants a byte when the buffer is empty and bytes are left.
    pub fn dma_request(&mut self) -> Option<u16> {
        if self.buffer.is_none() && self.remaining > 0 && !self.fetching {
            self.fetching = true;
            Some(self.addr)
        } else {
            None
        }
    }

    pub fn dma_fill(&mut self, data: u8) {
        self.fetching = false;
        self.buffer = Some(data);
        // The address wraps to 0x8000, not to zero page.
        self.addr = if self.addr == 0xffff { 0x8000 } else { self.addr + 1 };
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            if self.looping {
                self.restart();
            } else if self.irq_enabled {
                self.irq = true;
            }
        }
    }

    pub fn active(&self) -> bool { self.remaining > 0 }
    pub fn output(&self) -> u8 { self.level }

    pub fn validate(&self) -> Result<()> {
        ensure_state(RATES.contains(&self.rate), "dmc rate")?;
        ensure_state((1..=8).contains(&self.bits) && self.level <= 0x7f, "dmc output unit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_address_and_length() {
        let mut dmc = Dmc::default();
        dmc.write(2, 0x01);
        dmc.write(3, 0x01);
        dmc.set_enabled(true);
        assert_eq!(dmc.dma_request(), Some(0xc040));
        // No second request while the first is in flight.
        assert_eq!(dmc.dma_request(), None);
        assert!(dmc.active());
        assert_eq!(dmc.remaining, 17);
    }

    #[test]
    fn irq_at_end_of_sample() {
        let mut dmc = Dmc::default();
        dmc.write(0, 0x80);
        dmc.write(3, 0x00);
        dmc.set_enabled(true);
        assert!(dmc.dma_request().is_some());
        dmc.dma_fill(0xff);
        assert!(dmc.irq);
        assert!(!dmc.active());

        // Writing $4015 acknowledges it.
        dmc.set_enabled(false);
        assert!(!dmc.irq);
    }

    #[test]
    fn loop_restarts() {
        let mut dmc = Dmc::default();
        dmc.write(0, 0xc0);
        dmc.write(3, 0x00);
        dmc.set_enabled(true);
        dmc.dma_request();
        dmc.dma_fill(0x00);
        assert!(!dmc.irq);
        assert!(dmc.active());
        assert_eq!(dmc.addr, 0xc000);
    }

    #[test]
    fn address_wraps_to_8000() {
        let mut dmc = Dmc::default();
        dmc.write(2, 0xff);
        dmc.write(3, 0xff);
        dmc.set_enabled(true);
        dmc.addr = 0xffff;
        dmc.dma_request();
        dmc.dma_fill(0);
        assert_eq!(dmc.addr, 0x8000);
    }

    #[test]
    fn output_follows_sample_bits() {
        let mut dmc = Dmc::default();
        dmc.write(0, 0x0f);
        dmc.write(1, 0x40);
        dmc.write(3, 0x00);
        dmc.set_enabled(true);
        dmc.dma_request();
        dmc.dma_fill(0xff);

        // The first 8 bits play the empty shift register in silence.
        for _ in 0..8 * 54 {
            dmc.clock_timer();
        }
        assert_eq!(dmc.output(), 0x40);

        // Then every set bit adds 2.
        for _ in 0..8 * 54 {
            dmc.clock_timer();
        }
        assert_eq!(dmc.output(), 0x40 + 16);
    }

    #[test]
    fn direct_load() {
        let mut dmc = Dmc::default();
        dmc.write(1, 0xff);
        assert_eq!(dmc.output(), 0x7f);
    }

    #[test]
    fn validate_output_level() {
        let mut dmc = Dmc::default();
        dmc.write(1, 0x7f);
        assert!(dmc.validate().is_ok());
        dmc.level = 0x80;
        assert!(dmc.validate().is_err());
        dmc.level = 0;
        dmc.rate = 0;
        assert!(dmc.validate().is_err());
    }
}
