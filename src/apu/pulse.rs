use serde::{Deserialize, Serialize};

use crate::apu::envelope::Envelope;
use crate::apu::length::LengthCounter;
use crate::error::{ensure_state, Result};

const DUTY: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

// The two pulse channels only differ on how the sweep negates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    One,
    Two,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Sweep {
    enabled: bool,
    period: u8,
    negate: bool,
    shift: u8,
    reload: bool,
    divider: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse {
    channel: Channel,
    duty: u8,
    step: u8,
    timer: u16,
    period: u16,
    sweep: Sweep,
    pub envelope: Envelope,
    pub length: LengthCounter,
}

impl Pulse {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            duty: 0,
            step: 0,
            timer: 0,
            period: 0,
            sweep: Sweep::default(),
            envelope: Envelope::default(),
            length: LengthCounter::default(),
        }
    }

    // Register offset 0..=3 from 0x4000 or 0x4004.
    pub fn write(&mut self, reg: u16, data: u8) {
        match reg {
            // DDLC VVVV
            0 => {
                self.duty = data >> 6;
                self.length.halt = data & 0x20 != 0;
                self.envelope.write(data);
            }
            // EPPP NSSS
            1 => {
                self.sweep.enabled = data & 0x80 != 0;
                self.sweep.period = (data >> 4) & 0x07;
                self.sweep.negate = data & 0x08 != 0;
                self.sweep.shift = data & 0x07;
                self.sweep.reload = true;
            }
            2 => self.period = (self.period & 0x0700) | data as u16,
            // LLLL LHHH
            _ => {
                self.period = (self.period & 0x00ff) | ((data as u16 & 0x07) << 8);
                self.length.load(data >> 3);
                self.envelope.restart();
                self.step = 0;
            }
        }
    }

    // Clocked every other CPU cycle.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.period;
            self.step = (self.step + 1) & 0x07;
        } else {
            self.timer -= 1;
        }
    }

    fn target_period(&self) -> u16 {
        let change = self.period >> self.sweep.shift;
        if !self.sweep.negate {
            return self.period.wrapping_add(change);
        }
        // Pulse 1 adds the ones' complement.
        match self.channel {
            Channel::One => self.period.wrapping_sub(change).wrapping_sub(1),
            Channel::Two => self.period.wrapping_sub(change),
        }
    }

    // The sweep unit mutes the channel even when it is disabled.
    fn muted(&self) -> bool {
        self.period < 8 || (!self.sweep.negate && self.target_period() > 0x07ff)
    }

    // Half frame
    pub fn clock_sweep(&mut self) {
        if self.sweep.divider == 0 && self.sweep.enabled && self.sweep.shift > 0 && !self.muted() {
            self.period = self.target_period();
        }
        if self.sweep.divider == 0 || self.sweep.reload {
            self.sweep.divider = self.sweep.period;
            self.sweep.reload = false;
        } else {
            self.sweep.divider -= 1;
        }
    }

    pub fn output(&self) -> u8 {
        if self.muted() || !self.length.active() || DUTY[self.duty as usize][self.step as usize] == 0 {
            0
        } else {
            self.envelope.output()
        }
    }

    pub fn period(&self) -> u16 { self.period }

    pub fn validate(&self) -> Result<()> {
        ensure_state(self.duty < 4 && self.step < 8 && self.sweep.shift < 8, "pulse")?;
        ensure_state(self.period <= 0x7ff, "pulse period")?;
        self.envelope.validate()
    }
}
